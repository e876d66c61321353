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

//! Jobs: billable units of work under a contract.
//!
//! A job's id, contract, description and price are immutable. The payment
//! state is the only mutable part and sits behind the job's row lock. It
//! transitions exactly once, unpaid to paid, and never back.

use crate::base::{ContractId, JobId};
use crate::error::LedgerError;
use crate::validate::validate_amount;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

/// Mutable payment state of a job, owned exclusively by the transfer engine.
///
/// Invariant: `paid` iff `payment_date.is_some()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PaymentState {
    pub(crate) paid: bool,
    pub(crate) payment_date: Option<DateTime<Utc>>,
}

impl PaymentState {
    fn assert_invariants(&self) {
        debug_assert_eq!(
            self.paid,
            self.payment_date.is_some(),
            "invariant violated: paid flag and payment date disagree"
        );
    }
}

/// A priced unit of work under one contract, paid at most once.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    contract_id: ContractId,
    description: String,
    price: Decimal,
    state: Mutex<PaymentState>,
}

impl Job {
    /// Creates an unpaid job.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] if the price is not a positive
    /// value with at most 2 decimal places.
    pub fn new(
        id: JobId,
        contract_id: ContractId,
        description: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amount(price)?;
        Ok(Self {
            id,
            contract_id,
            description: description.into(),
            price,
            state: Mutex::new(PaymentState {
                paid: false,
                payment_date: None,
            }),
        })
    }

    /// Creates a job that was already paid before the store was loaded.
    ///
    /// Historical data arrives this way when the ledger is seeded; live jobs
    /// are only ever paid through the transfer engine.
    pub fn new_paid(
        id: JobId,
        contract_id: ContractId,
        description: impl Into<String>,
        price: Decimal,
        payment_date: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let job = Self::new(id, contract_id, description, price)?;
        {
            let mut state = job.state.lock();
            state.paid = true;
            state.payment_date = Some(payment_date);
            state.assert_invariants();
        }
        Ok(job)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn contract_id(&self) -> ContractId {
        self.contract_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn paid(&self) -> bool {
        self.state.lock().paid
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.state.lock().payment_date
    }

    /// Point-in-time copy of the job, safe to hold without the row lock.
    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.lock();
        JobSnapshot {
            id: self.id,
            contract_id: self.contract_id,
            description: self.description.clone(),
            price: self.price,
            paid: state.paid,
            payment_date: state.payment_date,
        }
    }

    /// Acquires the row lock, waiting at most `timeout`.
    pub(crate) fn try_lock_state_for(
        &self,
        timeout: Duration,
    ) -> Option<MutexGuard<'_, PaymentState>> {
        self.state.try_lock_for(timeout)
    }

    /// Marks the job paid. Caller must hold the row lock and have re-checked
    /// `paid == false` under it.
    pub(crate) fn mark_paid(state: &mut PaymentState, at: DateTime<Utc>) {
        state.paid = true;
        state.payment_date = Some(at);
        state.assert_invariants();
    }
}

/// Serializable point-in-time view of a [`Job`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub contract_id: ContractId,
    pub description: String,
    pub price: Decimal,
    pub paid: bool,
    pub payment_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_job_is_unpaid() {
        let job = Job::new(JobId(1), ContractId(1), "work", dec!(200.00)).unwrap();
        assert!(!job.paid());
        assert_eq!(job.payment_date(), None);
        assert_eq!(job.price(), dec!(200.00));
    }

    #[test]
    fn non_positive_price_rejected() {
        assert_eq!(
            Job::new(JobId(1), ContractId(1), "work", Decimal::ZERO).err(),
            Some(LedgerError::InvalidAmount)
        );
        assert_eq!(
            Job::new(JobId(1), ContractId(1), "work", dec!(-10.00)).err(),
            Some(LedgerError::InvalidAmount)
        );
    }

    #[test]
    fn seeded_paid_job_has_payment_date() {
        let at = "2020-08-15T19:11:26Z".parse::<DateTime<Utc>>().unwrap();
        let job = Job::new_paid(JobId(1), ContractId(1), "work", dec!(21.00), at).unwrap();
        assert!(job.paid());
        assert_eq!(job.payment_date(), Some(at));
    }

    #[test]
    fn snapshot_reflects_state() {
        let job = Job::new(JobId(3), ContractId(2), "work", dec!(42.00)).unwrap();
        let snap = job.snapshot();
        assert_eq!(snap.id, JobId(3));
        assert_eq!(snap.contract_id, ContractId(2));
        assert!(!snap.paid);
        assert_eq!(snap.payment_date, None);
    }
}
