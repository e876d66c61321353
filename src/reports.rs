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

//! Read-only aggregation over paid jobs in a half-open time window.
//!
//! Reports are admin-only and take no row locks beyond the per-row snapshot
//! reads; they never block the transfer engine.
//!
//! Tie-breaks are deterministic: equal profession sums resolve to the
//! lexicographically smallest profession name, equal client sums to the
//! smallest client id. An empty window yields an empty result, never an
//! error.

use crate::base::ProfileId;
use crate::error::LedgerError;
use crate::profile::{Caller, Role};
use crate::store::LedgerStore;
use crate::validate::{parse_timestamp, require_role};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReportWindow {
    /// Creates a window; `start` must be strictly before `end`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidWindow`] otherwise.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, LedgerError> {
        if start >= end {
            return Err(LedgerError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    /// Parses two RFC 3339 timestamps into a window.
    pub fn parse(start: &str, end: &str) -> Result<Self, LedgerError> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True if `at` falls inside the window (start inclusive, end exclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// The profession that earned the most inside a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfessionEarnings {
    pub profession: String,
    pub total: Decimal,
}

/// One entry of the best-clients report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientEarnings {
    pub id: ProfileId,
    pub full_name: String,
    pub paid: Decimal,
}

/// Computes admin reports over paid jobs.
pub struct ReportingEngine {
    store: Arc<LedgerStore>,
}

impl ReportingEngine {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// The profession that earned the most (sum of paid job prices) for work
    /// paid inside the window.
    ///
    /// Returns `Ok(None)` when no job was paid inside the window.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RoleMismatch`] unless the caller is an admin.
    pub fn best_profession(
        &self,
        window: &ReportWindow,
        caller: &Caller,
    ) -> Result<Option<ProfessionEarnings>, LedgerError> {
        require_role(caller, &[Role::Admin])?;

        // BTreeMap iterates professions in lexicographic order, which makes
        // the strict-greater max below deterministic on ties.
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for (price, contractor_id) in self.paid_jobs_in(window) {
            let Some(contractor) = self.store.profile(contractor_id) else {
                continue;
            };
            *totals
                .entry(contractor.profession().to_string())
                .or_default() += price;
        }

        let mut best: Option<ProfessionEarnings> = None;
        for (profession, total) in totals {
            if best.as_ref().is_none_or(|current| total > current.total) {
                best = Some(ProfessionEarnings { profession, total });
            }
        }
        Ok(best)
    }

    /// The clients that paid the most inside the window, descending by total,
    /// ties broken by ascending client id, truncated to `limit`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::RoleMismatch`] unless the caller is an admin.
    /// - [`LedgerError::InvalidLimit`] if `limit` is zero.
    pub fn best_clients(
        &self,
        window: &ReportWindow,
        limit: usize,
        caller: &Caller,
    ) -> Result<Vec<ClientEarnings>, LedgerError> {
        require_role(caller, &[Role::Admin])?;
        if limit == 0 {
            return Err(LedgerError::InvalidLimit);
        }

        let mut totals: HashMap<ProfileId, Decimal> = HashMap::new();
        for job in self.store.jobs() {
            let snapshot = job.snapshot();
            let Some(paid_at) = snapshot.payment_date else {
                continue;
            };
            if !snapshot.paid || !window.contains(paid_at) {
                continue;
            }
            let Some(contract) = self.store.contract(snapshot.contract_id) else {
                continue;
            };
            *totals.entry(contract.client_id()).or_default() += snapshot.price;
        }

        let mut ranked: Vec<_> = totals.into_iter().collect();
        ranked.sort_by(|(a_id, a_total), (b_id, b_total)| {
            b_total.cmp(a_total).then(a_id.cmp(b_id))
        });
        ranked.truncate(limit);

        Ok(ranked
            .into_iter()
            .filter_map(|(id, paid)| {
                self.store.profile(id).map(|profile| ClientEarnings {
                    id,
                    full_name: profile.full_name(),
                    paid,
                })
            })
            .collect())
    }

    /// Prices of jobs paid inside the window, with the contractor id of their
    /// contract.
    fn paid_jobs_in(&self, window: &ReportWindow) -> Vec<(Decimal, ProfileId)> {
        self.store
            .jobs()
            .into_iter()
            .map(|job| job.snapshot())
            .filter(|snapshot| {
                snapshot.paid
                    && snapshot
                        .payment_date
                        .is_some_and(|paid_at| window.contains(paid_at))
            })
            .filter_map(|snapshot| {
                self.store
                    .contract(snapshot.contract_id)
                    .map(|contract| (snapshot.price, contract.contractor_id()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_requires_start_before_end() {
        assert!(ReportWindow::parse("2020-08-10T00:00:00Z", "2020-08-20T00:00:00Z").is_ok());
        assert_eq!(
            ReportWindow::parse("2020-08-20T00:00:00Z", "2020-08-10T00:00:00Z").err(),
            Some(LedgerError::InvalidWindow)
        );
        assert_eq!(
            ReportWindow::parse("2020-08-10T00:00:00Z", "2020-08-10T00:00:00Z").err(),
            Some(LedgerError::InvalidWindow)
        );
    }

    #[test]
    fn window_is_half_open() {
        let window = ReportWindow::parse("2020-08-10T00:00:00Z", "2020-08-20T00:00:00Z").unwrap();
        assert!(window.contains(window.start()));
        assert!(!window.contains(window.end()));
    }

    #[test]
    fn bad_timestamps_are_invalid_input() {
        let err = ReportWindow::parse("soon", "2020-08-20T00:00:00Z").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
