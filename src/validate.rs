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

//! Shared validation helpers for amounts, timestamps, limits and roles.

use crate::error::LedgerError;
use crate::profile::{Caller, Role};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Default number of clients returned by the best-clients report.
pub const DEFAULT_CLIENT_LIMIT: usize = 2;

/// Checks that a monetary amount is positive and expressible with at most 2
/// decimal places.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    // Checked: amounts near Decimal::MAX overflow the cent scaling and are
    // rejected rather than panicking.
    match amount.checked_mul(Decimal::ONE_HUNDRED) {
        Some(cents) if cents.fract().is_zero() => Ok(()),
        _ => Err(LedgerError::InvalidAmount),
    }
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| LedgerError::InvalidTimestamp(raw.to_string()))
}

/// Normalizes an optional report limit: absent means the default, anything
/// non-positive is rejected.
pub fn validate_limit(raw: Option<i64>) -> Result<usize, LedgerError> {
    match raw {
        None => Ok(DEFAULT_CLIENT_LIMIT),
        Some(limit) if limit > 0 => Ok(limit as usize),
        Some(_) => Err(LedgerError::InvalidLimit),
    }
}

/// Checks that the caller's role is one of the allowed roles.
pub(crate) fn require_role(caller: &Caller, allowed: &[Role]) -> Result<(), LedgerError> {
    if allowed.contains(&caller.role) {
        Ok(())
    } else {
        Err(LedgerError::RoleMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::ProfileId;
    use rust_decimal_macros::dec;

    #[test]
    fn amounts_with_two_decimal_places_pass() {
        assert!(validate_amount(dec!(0.01)).is_ok());
        assert!(validate_amount(dec!(175.00)).is_ok());
        assert!(validate_amount(dec!(1000)).is_ok());
        // Trailing zeros beyond 2 places are still the same value.
        assert!(validate_amount(dec!(10.1000)).is_ok());
    }

    #[test]
    fn bad_amounts_rejected() {
        assert_eq!(validate_amount(Decimal::ZERO).err(), Some(LedgerError::InvalidAmount));
        assert_eq!(validate_amount(dec!(-5.00)).err(), Some(LedgerError::InvalidAmount));
        assert_eq!(validate_amount(dec!(10.001)).err(), Some(LedgerError::InvalidAmount));
        // Too large to scale to cents; must be rejected, not panic.
        assert_eq!(validate_amount(Decimal::MAX).err(), Some(LedgerError::InvalidAmount));
    }

    #[test]
    fn timestamps_parse_as_rfc3339() {
        assert!(parse_timestamp("2020-08-10T00:00:00Z").is_ok());
        assert!(parse_timestamp("2020-08-10T00:00:00+02:00").is_ok());
        assert_eq!(
            parse_timestamp("last tuesday").err(),
            Some(LedgerError::InvalidTimestamp("last tuesday".into()))
        );
    }

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(validate_limit(None).unwrap(), DEFAULT_CLIENT_LIMIT);
        assert_eq!(validate_limit(Some(5)).unwrap(), 5);
        assert_eq!(validate_limit(Some(0)).err(), Some(LedgerError::InvalidLimit));
        assert_eq!(validate_limit(Some(-3)).err(), Some(LedgerError::InvalidLimit));
    }

    #[test]
    fn roles_are_enforced() {
        let caller = Caller {
            id: ProfileId(1),
            role: Role::Contractor,
        };
        assert!(require_role(&caller, &[Role::Client, Role::Contractor]).is_ok());
        assert_eq!(
            require_role(&caller, &[Role::Admin]).err(),
            Some(LedgerError::RoleMismatch)
        );
    }
}
