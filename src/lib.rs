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

//! # Gig Ledger
//!
//! A marketplace ledger engine: clients hire contractors under contracts,
//! contractors bill jobs, clients pay jobs from a balance, and admins run
//! time-windowed financial reports.
//!
//! ## Core Components
//!
//! - [`LedgerStore`]: concurrent row store for profiles, contracts and jobs
//! - [`TransferEngine`]: deposits and job payments with row-lock discipline
//! - [`ReportingEngine`]: best-profession and best-clients aggregations
//! - [`LedgerError`]: typed failures with a transport-agnostic [`ErrorKind`]
//!
//! ## Example
//!
//! ```
//! use gig_ledger_rs::{
//!     Contract, ContractId, ContractStatus, Job, JobId, LedgerStore, Profile, ProfileId, Role,
//!     TransferEngine,
//! };
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let store = Arc::new(LedgerStore::new());
//! let client = store
//!     .add_profile(
//!         Profile::new(ProfileId(1), "Harry", "Potter", "Wizard", Role::Client, dec!(300.00))
//!             .unwrap(),
//!     )
//!     .unwrap();
//! store
//!     .add_profile(
//!         Profile::new(ProfileId(2), "Linus", "Mendes", "Programmer", Role::Contractor, dec!(0.00))
//!             .unwrap(),
//!     )
//!     .unwrap();
//! store
//!     .add_contract(
//!         Contract::new(ContractId(1), ProfileId(1), ProfileId(2), "bla bla bla", ContractStatus::InProgress)
//!             .unwrap(),
//!     )
//!     .unwrap();
//! store
//!     .add_job(Job::new(JobId(1), ContractId(1), "fix a bug", dec!(200.00)).unwrap())
//!     .unwrap();
//!
//! let engine = TransferEngine::new(Arc::clone(&store));
//! engine.pay_job(JobId(1), &client.caller()).unwrap();
//!
//! assert_eq!(client.balance(), dec!(100.00));
//! assert!(store.job(JobId(1)).unwrap().paid());
//! ```
//!
//! ## Concurrency
//!
//! Balances and payment state are the only shared mutable rows; every row
//! carries its own exclusive lock and every multi-row operation acquires its
//! lock set in a fixed global order, re-validating all preconditions under
//! the locks before mutating anything.

pub mod audit;
mod base;
mod contract;
mod engine;
pub mod error;
mod job;
mod profile;
mod reports;
mod store;
pub mod validate;

pub use audit::{AuditEntry, AuditLog};
pub use base::{ContractId, JobId, ProfileId};
pub use contract::{Contract, ContractStatus};
pub use engine::TransferEngine;
pub use error::{ErrorKind, LedgerError};
pub use job::{Job, JobSnapshot};
pub use profile::{Caller, Profile, Role};
pub use reports::{ClientEarnings, ProfessionEarnings, ReportWindow, ReportingEngine};
pub use store::LedgerStore;
