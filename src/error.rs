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

//! Error types for ledger operations.
//!
//! Every business-rule violation is a distinct [`LedgerError`] variant. The
//! coarser [`ErrorKind`] classification is what the transport layer maps to a
//! status code; the core never deals in status codes itself.

use thiserror::Error;

/// Coarse failure classification, translated to a transport status by the
/// caller of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed amount, timestamp, limit or entity definition.
    InvalidInput,
    /// Role mismatch, self-deposit violation, cap exceeded, insufficient funds.
    Forbidden,
    /// Unresolvable profile, contract or job for this caller.
    NotFound,
    /// State already moved on (job already paid, duplicate id).
    Conflict,
    /// Lock contention; the whole operation may be retried.
    Unavailable,
}

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero, negative, or has more than 2 decimal places.
    #[error("amount must be a positive value with at most 2 digits after the period")]
    InvalidAmount,

    /// Timestamp failed to parse as RFC 3339.
    #[error("'{0}' is not a valid timestamp")]
    InvalidTimestamp(String),

    /// Report window start is not strictly before its end.
    #[error("start date must be earlier than end date")]
    InvalidWindow,

    /// Report limit is zero or negative.
    #[error("limit must be a positive integer")]
    InvalidLimit,

    /// Role string did not match any known role.
    #[error("'{0}' is not a valid role")]
    UnknownRole(String),

    /// Status string did not match any known contract status.
    #[error("'{0}' is not a valid contract status")]
    UnknownStatus(String),

    /// Contract names the same profile as client and contractor.
    #[error("contract client and contractor must be different profiles")]
    SelfContract,

    /// Caller's role does not permit the operation.
    #[error("operation not permitted for this role")]
    RoleMismatch,

    /// A client may only deposit into its own balance.
    #[error("a client can only deposit into its own balance")]
    DepositTargetMismatch,

    /// Deposit exceeds 25% of the client's outstanding work.
    #[error("deposit exceeds 25% of outstanding work")]
    DepositCapExceeded,

    /// Client balance is lower than the job price.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Referenced profile does not exist.
    #[error("profile not found")]
    ProfileNotFound,

    /// Referenced contract does not exist or does not belong to the caller.
    #[error("contract not found")]
    ContractNotFound,

    /// Referenced job does not exist or does not belong to the caller.
    #[error("job not found")]
    JobNotFound,

    /// Job has already been paid.
    #[error("job has already been paid")]
    AlreadyPaid,

    /// Provisioning reused an existing id.
    #[error("duplicate id")]
    DuplicateId,

    /// Row locks could not be acquired in time; retry the whole operation.
    #[error("row locks could not be acquired, try again")]
    LockContention,
}

impl LedgerError {
    /// Classifies the error per the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount
            | Self::InvalidTimestamp(_)
            | Self::InvalidWindow
            | Self::InvalidLimit
            | Self::UnknownRole(_)
            | Self::UnknownStatus(_)
            | Self::SelfContract => ErrorKind::InvalidInput,
            Self::RoleMismatch
            | Self::DepositTargetMismatch
            | Self::DepositCapExceeded
            | Self::InsufficientFunds => ErrorKind::Forbidden,
            Self::ProfileNotFound | Self::ContractNotFound | Self::JobNotFound => {
                ErrorKind::NotFound
            }
            Self::AlreadyPaid | Self::DuplicateId => ErrorKind::Conflict,
            Self::LockContention => ErrorKind::Unavailable,
        }
    }

    /// True if retrying the whole operation can succeed without any state
    /// change in between.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}
