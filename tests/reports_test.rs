// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Reporting engine integration tests.

use chrono::{DateTime, Utc};
use gig_ledger_rs::{
    Caller, Contract, ContractId, ContractStatus, Job, JobId, LedgerError, LedgerStore, Profile,
    ProfileId, ReportWindow, ReportingEngine, Role,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn at(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

fn admin() -> Caller {
    Caller {
        id: ProfileId(100),
        role: Role::Admin,
    }
}

/// Two clients, a musician and a programmer; the musician earned 120 and the
/// programmer 100 inside August 2020.
fn seeded() -> (Arc<LedgerStore>, ReportingEngine) {
    let store = Arc::new(LedgerStore::new());
    store
        .add_profile(
            Profile::new(ProfileId(1), "Harry", "Potter", "Wizard", Role::Client, dec!(0.00))
                .unwrap(),
        )
        .unwrap();
    store
        .add_profile(
            Profile::new(ProfileId(2), "Mr", "Robot", "Hacker", Role::Client, dec!(0.00)).unwrap(),
        )
        .unwrap();
    store
        .add_profile(
            Profile::new(
                ProfileId(3),
                "John",
                "Lenon",
                "Musician",
                Role::Contractor,
                dec!(0.00),
            )
            .unwrap(),
        )
        .unwrap();
    store
        .add_profile(
            Profile::new(
                ProfileId(4),
                "Linus",
                "Mendes",
                "Programmer",
                Role::Contractor,
                dec!(0.00),
            )
            .unwrap(),
        )
        .unwrap();

    store
        .add_contract(
            Contract::new(
                ContractId(1),
                ProfileId(1),
                ProfileId(3),
                "bla bla bla",
                ContractStatus::InProgress,
            )
            .unwrap(),
        )
        .unwrap();
    store
        .add_contract(
            Contract::new(
                ContractId(2),
                ProfileId(2),
                ProfileId(4),
                "bla bla bla",
                ContractStatus::InProgress,
            )
            .unwrap(),
        )
        .unwrap();

    store
        .add_job(
            Job::new_paid(
                JobId(1),
                ContractId(1),
                "play a gig",
                dec!(120.00),
                at("2020-08-10T12:00:00Z"),
            )
            .unwrap(),
        )
        .unwrap();
    store
        .add_job(
            Job::new_paid(
                JobId(2),
                ContractId(2),
                "fix a bug",
                dec!(100.00),
                at("2020-08-12T12:00:00Z"),
            )
            .unwrap(),
        )
        .unwrap();
    // Outside the window: must never count.
    store
        .add_job(
            Job::new_paid(
                JobId(3),
                ContractId(2),
                "ship a feature",
                dec!(999.00),
                at("2020-09-01T00:00:00Z"),
            )
            .unwrap(),
        )
        .unwrap();
    // Unpaid: must never count.
    store
        .add_job(Job::new(JobId(4), ContractId(1), "write a song", dec!(500.00)).unwrap())
        .unwrap();

    let reports = ReportingEngine::new(Arc::clone(&store));
    (store, reports)
}

fn august() -> ReportWindow {
    ReportWindow::parse("2020-08-01T00:00:00Z", "2020-09-01T00:00:00Z").unwrap()
}

// === BestProfession ===

#[test]
fn best_profession_picks_the_top_earner() {
    let (_, reports) = seeded();
    let best = reports.best_profession(&august(), &admin()).unwrap().unwrap();
    assert_eq!(best.profession, "Musician");
    assert_eq!(best.total, dec!(120.00));
}

#[test]
fn best_profession_window_start_is_inclusive_end_exclusive() {
    let (_, reports) = seeded();

    // A window starting exactly at the musician's payment date includes it.
    let from_payment =
        ReportWindow::parse("2020-08-10T12:00:00Z", "2020-08-11T00:00:00Z").unwrap();
    let best = reports.best_profession(&from_payment, &admin()).unwrap().unwrap();
    assert_eq!(best.profession, "Musician");

    // A window ending exactly at the payment date excludes it.
    let until_payment =
        ReportWindow::parse("2020-08-01T00:00:00Z", "2020-08-10T12:00:00Z").unwrap();
    assert!(reports.best_profession(&until_payment, &admin()).unwrap().is_none());
}

#[test]
fn best_profession_empty_window_is_none_not_an_error() {
    let (_, reports) = seeded();
    let empty = ReportWindow::parse("1999-01-01T00:00:00Z", "1999-12-31T00:00:00Z").unwrap();
    assert_eq!(reports.best_profession(&empty, &admin()).unwrap(), None);
}

#[test]
fn best_profession_ties_break_lexicographically() {
    let (store, reports) = seeded();
    // Give the programmer another 20 inside the window to tie at 120.
    store
        .add_job(
            Job::new_paid(
                JobId(5),
                ContractId(2),
                "review a patch",
                dec!(20.00),
                at("2020-08-20T00:00:00Z"),
            )
            .unwrap(),
        )
        .unwrap();

    let best = reports.best_profession(&august(), &admin()).unwrap().unwrap();
    assert_eq!(best.profession, "Musician");
    assert_eq!(best.total, dec!(120.00));
}

#[test]
fn best_profession_requires_admin() {
    let (store, reports) = seeded();
    let client = store.resolve_caller(ProfileId(1)).unwrap();
    assert_eq!(
        reports.best_profession(&august(), &client),
        Err(LedgerError::RoleMismatch)
    );
}

// === BestClients ===

#[test]
fn best_clients_ranked_by_total_descending() {
    let (_, reports) = seeded();
    let clients = reports.best_clients(&august(), 2, &admin()).unwrap();

    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].id, ProfileId(1));
    assert_eq!(clients[0].full_name, "Harry Potter");
    assert_eq!(clients[0].paid, dec!(120.00));
    assert_eq!(clients[1].id, ProfileId(2));
    assert_eq!(clients[1].paid, dec!(100.00));
}

#[test]
fn best_clients_limit_truncates() {
    let (_, reports) = seeded();
    let clients = reports.best_clients(&august(), 1, &admin()).unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, ProfileId(1));
}

#[test]
fn best_clients_ties_break_by_ascending_id() {
    let (store, reports) = seeded();
    // Tie both clients at 120 inside the window.
    store
        .add_job(
            Job::new_paid(
                JobId(5),
                ContractId(2),
                "review a patch",
                dec!(20.00),
                at("2020-08-20T00:00:00Z"),
            )
            .unwrap(),
        )
        .unwrap();

    let clients = reports.best_clients(&august(), 2, &admin()).unwrap();
    assert_eq!(clients[0].id, ProfileId(1));
    assert_eq!(clients[1].id, ProfileId(2));
    assert_eq!(clients[0].paid, clients[1].paid);
}

#[test]
fn best_clients_zero_limit_is_invalid() {
    let (_, reports) = seeded();
    assert_eq!(
        reports.best_clients(&august(), 0, &admin()),
        Err(LedgerError::InvalidLimit)
    );
}

#[test]
fn best_clients_empty_window_is_empty_not_an_error() {
    let (_, reports) = seeded();
    let empty = ReportWindow::parse("1999-01-01T00:00:00Z", "1999-12-31T00:00:00Z").unwrap();
    assert_eq!(reports.best_clients(&empty, 2, &admin()).unwrap(), vec![]);
}

#[test]
fn best_clients_requires_admin() {
    let (store, reports) = seeded();
    let contractor = store.resolve_caller(ProfileId(3)).unwrap();
    assert_eq!(
        reports.best_clients(&august(), 2, &contractor),
        Err(LedgerError::RoleMismatch)
    );
}
