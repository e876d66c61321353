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

//! Profiles: the parties of the marketplace.
//!
//! A [`Profile`] is a row in the ledger. Identity fields (name, profession,
//! role) are immutable; the balance is the only mutable field and sits behind
//! a `parking_lot::Mutex` that doubles as the row's exclusive lock.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use gig_ledger_rs::{Profile, ProfileId, Role};
//!
//! let profile = Profile::new(ProfileId(1), "Linus", "Mendes", "Programmer", Role::Client, dec!(100.00)).unwrap();
//! assert_eq!(profile.balance(), dec!(100.00));
//! assert_eq!(profile.full_name(), "Linus Mendes");
//! ```

use crate::base::ProfileId;
use crate::error::LedgerError;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Role of a profile, fixed at provisioning time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Contractor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Client => "client",
            Role::Contractor => "contractor",
            Role::Admin => "admin",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "client" => Ok(Role::Client),
            "contractor" => Ok(Role::Contractor),
            "admin" => Ok(Role::Admin),
            _ => Err(LedgerError::UnknownRole(raw.to_string())),
        }
    }
}

/// Resolved caller identity, supplied by the access guard before any core
/// operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: ProfileId,
    pub role: Role,
}

/// A party in the marketplace with a monetary balance.
///
/// # Invariants
///
/// - `balance >= 0` at all times, observable by any reader.
/// - Only the transfer engine mutates the balance.
#[derive(Debug)]
pub struct Profile {
    id: ProfileId,
    first_name: String,
    last_name: String,
    profession: String,
    role: Role,
    balance: Mutex<Decimal>,
}

impl Profile {
    /// Decimal places kept when a balance leaves the core.
    const DECIMAL_PRECISION: u32 = 2;

    /// Creates a profile with an opening balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] if the opening balance is
    /// negative.
    pub fn new(
        id: ProfileId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        profession: impl Into<String>,
        role: Role,
        balance: Decimal,
    ) -> Result<Self, LedgerError> {
        if balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            profession: profession.into(),
            role,
            balance: Mutex::new(balance),
        })
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn profession(&self) -> &str {
        &self.profession
    }

    /// Trimmed concatenation of first and last name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// The caller identity this profile resolves to.
    pub fn caller(&self) -> Caller {
        Caller {
            id: self.id,
            role: self.role,
        }
    }

    /// Current balance (snapshot read under the row lock).
    pub fn balance(&self) -> Decimal {
        *self.balance.lock()
    }

    /// Atomically increments the balance. Increments commute, so no ordering
    /// with other row locks is required.
    pub(crate) fn credit(&self, amount: Decimal) {
        let mut balance = self.balance.lock();
        *balance += amount;
        debug_assert!(
            *balance >= Decimal::ZERO,
            "invariant violated: balance of profile {} went negative: {}",
            self.id,
            *balance
        );
    }

    /// Acquires the row lock, waiting at most `timeout`.
    ///
    /// Returns `None` on timeout; the caller surfaces that as a retryable
    /// contention failure.
    pub(crate) fn try_lock_balance_for(
        &self,
        timeout: Duration,
    ) -> Option<MutexGuard<'_, Decimal>> {
        self.balance.try_lock_for(timeout)
    }
}

impl Serialize for Profile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let balance = self.balance.lock();
        let mut state = serializer.serialize_struct("Profile", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("first_name", &self.first_name)?;
        state.serialize_field("last_name", &self.last_name)?;
        state.serialize_field("profession", &self.profession)?;
        state.serialize_field("type", &self.role)?;
        state.serialize_field("balance", &balance.round_dp(Profile::DECIMAL_PRECISION))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client(balance: Decimal) -> Profile {
        Profile::new(ProfileId(7), "Mr", "Robot", "Hacker", Role::Client, balance).unwrap()
    }

    #[test]
    fn negative_opening_balance_rejected() {
        let result = Profile::new(
            ProfileId(1),
            "Ash",
            "Kethcum",
            "Pokemon master",
            Role::Client,
            dec!(-1.00),
        );
        assert_eq!(result.err(), Some(LedgerError::InvalidAmount));
    }

    #[test]
    fn credit_increments_balance() {
        let profile = client(dec!(10.00));
        profile.credit(dec!(5.50));
        assert_eq!(profile.balance(), dec!(15.50));
    }

    #[test]
    fn full_name_trims_missing_parts() {
        let profile =
            Profile::new(ProfileId(2), "Cher", "", "Singer", Role::Contractor, Decimal::ZERO)
                .unwrap();
        assert_eq!(profile.full_name(), "Cher");
    }

    #[test]
    fn role_parses_from_str() {
        assert_eq!("client".parse::<Role>().unwrap(), Role::Client);
        assert_eq!("contractor".parse::<Role>().unwrap(), Role::Contractor);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn serializer_rounds_to_two_decimal_places() {
        let profile = client(dec!(123.456));
        let json = serde_json::to_string(&profile).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["id"], 7);
        assert_eq!(parsed["type"], "client");
        // Decimal uses banker's rounding; serde-str keeps the string form.
        assert_eq!(parsed["balance"].as_str().unwrap(), "123.46");
    }
}
