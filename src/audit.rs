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

//! Append-only journal of committed transfers.
//!
//! Entries are recorded only after a mutation has committed, so the journal
//! never contains a transfer that was rolled back. A lock-free [`SegQueue`]
//! keeps recording off the row-lock critical path.

use crate::base::{JobId, ProfileId};
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use rust_decimal::Decimal;
use serde::Serialize;

/// A committed balance mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEntry {
    /// Money injected into a client balance.
    Deposit {
        profile: ProfileId,
        amount: Decimal,
        at: DateTime<Utc>,
    },
    /// Money moved from a client to a contractor for a job.
    JobPayment {
        job: JobId,
        client: ProfileId,
        contractor: ProfileId,
        amount: Decimal,
        at: DateTime<Utc>,
    },
}

/// Thread-safe journal of committed transfers, in commit order per producer.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: SegQueue<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: SegQueue::new(),
        }
    }

    pub(crate) fn record(&self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns all recorded entries.
    pub fn drain(&self) -> Vec<AuditEntry> {
        let mut drained = Vec::with_capacity(self.entries.len());
        while let Some(entry) = self.entries.pop() {
            drained.push(entry);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn drain_empties_the_log() {
        let log = AuditLog::new();
        log.record(AuditEntry::Deposit {
            profile: ProfileId(1),
            amount: dec!(10.00),
            at: Utc::now(),
        });
        log.record(AuditEntry::JobPayment {
            job: JobId(2),
            client: ProfileId(1),
            contractor: ProfileId(5),
            amount: dec!(200.00),
            at: Utc::now(),
        });

        assert_eq!(log.len(), 2);
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn entries_serialize_tagged() {
        let entry = AuditEntry::Deposit {
            profile: ProfileId(1),
            amount: dec!(10.00),
            at: "2020-08-15T19:11:26Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "deposit");
        assert_eq!(json["profile"], 1);
        assert_eq!(json["amount"].as_str().unwrap(), "10.00");
    }
}
