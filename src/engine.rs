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

//! Balance transfer engine.
//!
//! The [`TransferEngine`] is the only component that mutates profile balances
//! and job payment state. It executes two operations:
//!
//! - **Deposit**: a client injects money into its own balance, capped at 25%
//!   of its outstanding work.
//! - **PayJob**: a client pays a job; the price moves from the client balance
//!   to the contractor balance and the job becomes paid, exactly once.
//!
//! # Concurrency
//!
//! `pay_job` follows a lock, re-check, act discipline: the job row lock is
//! taken first, then both profile row locks in ascending id order, then every
//! precondition is re-validated under the locks before any mutation. All
//! fallible checks happen before the first write, so the mutation phase is
//! infallible and the whole effect commits or nothing does. Lock acquisition
//! is bounded; a timeout surfaces as a retryable
//! [`LedgerError::LockContention`].
//!
//! Money is conserved: a payment never changes the combined client plus
//! contractor total. Only deposits inject money.

use crate::audit::{AuditEntry, AuditLog};
use crate::base::{JobId, ProfileId};
use crate::error::LedgerError;
use crate::job::Job;
use crate::profile::{Caller, Role};
use crate::store::LedgerStore;
use crate::validate::{require_role, validate_amount};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

/// How long an operation waits for a single row lock before failing as
/// retryable contention.
const LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Fraction of outstanding work a client may deposit in one operation.
const DEPOSIT_CAP: Decimal = dec!(0.25);

/// Executes deposits and job payments against a [`LedgerStore`].
pub struct TransferEngine {
    store: Arc<LedgerStore>,
    audit: AuditLog,
}

impl TransferEngine {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self {
            store,
            audit: AuditLog::new(),
        }
    }

    /// Journal of committed transfers.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Deposits money into a client's own balance.
    ///
    /// The deposit is capped at 25% of the client's outstanding work (unpaid
    /// jobs under in-progress contracts) at the moment of the read. The
    /// outstanding read may be stale relative to concurrent payments; the
    /// balance increment itself is atomic under the profile row lock.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::RoleMismatch`] - caller is not a client.
    /// - [`LedgerError::DepositTargetMismatch`] - target is another profile.
    /// - [`LedgerError::InvalidAmount`] - amount is not positive with at most
    ///   2 decimal places.
    /// - [`LedgerError::DepositCapExceeded`] - no outstanding work, or amount
    ///   above 25% of it.
    pub fn deposit(
        &self,
        target: ProfileId,
        amount: Decimal,
        caller: &Caller,
    ) -> Result<(), LedgerError> {
        require_role(caller, &[Role::Client])?;
        if caller.id != target {
            return Err(LedgerError::DepositTargetMismatch);
        }
        validate_amount(amount)?;

        let profile = self
            .store
            .profile(target)
            .ok_or(LedgerError::ProfileNotFound)?;

        let outstanding = self.store.outstanding_for(target);
        // Equality passes: a deposit of exactly 25% is allowed.
        if outstanding <= Decimal::ZERO || amount > outstanding * DEPOSIT_CAP {
            return Err(LedgerError::DepositCapExceeded);
        }

        profile.credit(amount);
        tracing::info!(profile = %target, %amount, %outstanding, "deposit committed");
        self.audit.record(AuditEntry::Deposit {
            profile: target,
            amount,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Pays a job owned by the caller, moving the price from the client
    /// balance to the contractor balance and marking the job paid.
    ///
    /// A job that does not exist and a job that belongs to another client are
    /// both reported as [`LedgerError::JobNotFound`]; owners of other jobs
    /// learn nothing from the error.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::RoleMismatch`] - caller is not a client.
    /// - [`LedgerError::JobNotFound`] - no such job for this caller.
    /// - [`LedgerError::AlreadyPaid`] - the job was already paid.
    /// - [`LedgerError::InsufficientFunds`] - balance below the job price.
    /// - [`LedgerError::LockContention`] - row locks unavailable; retryable,
    ///   and a retry after a racing payment fails cleanly as `AlreadyPaid`.
    pub fn pay_job(&self, job_id: JobId, caller: &Caller) -> Result<(), LedgerError> {
        require_role(caller, &[Role::Client])?;

        let job = self.store.job(job_id).ok_or(LedgerError::JobNotFound)?;
        let contract = self
            .store
            .contract(job.contract_id())
            .ok_or(LedgerError::JobNotFound)?;
        if contract.client_id() != caller.id {
            return Err(LedgerError::JobNotFound);
        }

        let client = self
            .store
            .profile(contract.client_id())
            .ok_or(LedgerError::ProfileNotFound)?;
        let contractor = self
            .store
            .profile(contract.contractor_id())
            .ok_or(LedgerError::ProfileNotFound)?;
        let price = job.price();

        // Cheap pre-lock reads to fail fast. Decisions are re-made under the
        // locks below; these reads are never trusted for the mutation.
        if job.paid() {
            return Err(LedgerError::AlreadyPaid);
        }
        if client.balance() < price {
            return Err(LedgerError::InsufficientFunds);
        }

        // Lock set: job row first, then both profile rows in ascending id
        // order. Every payment acquires in this order, so overlapping
        // payments cannot form a lock cycle. Guards drop together at scope
        // end on every path, success or failure.
        let mut state = job
            .try_lock_state_for(LOCK_TIMEOUT)
            .ok_or(LedgerError::LockContention)?;

        // The contract invariant guarantees distinct parties, so the two
        // locks are distinct mutexes.
        let (low, high) = if client.id() < contractor.id() {
            (&client, &contractor)
        } else {
            (&contractor, &client)
        };
        let low_guard = low
            .try_lock_balance_for(LOCK_TIMEOUT)
            .ok_or(LedgerError::LockContention)?;
        let high_guard = high
            .try_lock_balance_for(LOCK_TIMEOUT)
            .ok_or(LedgerError::LockContention)?;
        let (mut client_balance, mut contractor_balance) = if client.id() < contractor.id() {
            (low_guard, high_guard)
        } else {
            (high_guard, low_guard)
        };

        // Re-check under the locks: a concurrent payment may have paid the
        // job or drained the balance since the reads above.
        if state.paid {
            return Err(LedgerError::AlreadyPaid);
        }
        if *client_balance < price {
            return Err(LedgerError::InsufficientFunds);
        }

        // Infallible from here on: debit, credit, mark paid as one unit.
        let now = Utc::now();
        *client_balance -= price;
        *contractor_balance += price;
        Job::mark_paid(&mut state, now);

        debug_assert!(
            *client_balance >= Decimal::ZERO,
            "invariant violated: client {} balance went negative: {}",
            client.id(),
            *client_balance
        );

        tracing::info!(
            job = %job_id,
            client = %client.id(),
            contractor = %contractor.id(),
            %price,
            "job payment committed"
        );
        self.audit.record(AuditEntry::JobPayment {
            job: job_id,
            client: client.id(),
            contractor: contractor.id(),
            amount: price,
            at: now,
        });
        Ok(())
    }
}
