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

//! Contracts: the agreement between one client and one contractor.
//!
//! The engine never drives a contract's lifecycle; status transitions are
//! external. From the engine's viewpoint a contract is a join key plus a
//! status to filter on.

use crate::base::{ContractId, ProfileId};
use crate::error::LedgerError;
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a contract, driven externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    New,
    InProgress,
    Terminated,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractStatus::New => "new",
            ContractStatus::InProgress => "in_progress",
            ContractStatus::Terminated => "terminated",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ContractStatus {
    type Err = LedgerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "new" => Ok(ContractStatus::New),
            "in_progress" => Ok(ContractStatus::InProgress),
            "terminated" => Ok(ContractStatus::Terminated),
            _ => Err(LedgerError::UnknownStatus(raw.to_string())),
        }
    }
}

/// An agreement between exactly one client and one contractor.
///
/// # Invariants
///
/// - `client_id != contractor_id`.
/// - Parties and terms are immutable after creation.
#[derive(Debug)]
pub struct Contract {
    id: ContractId,
    client_id: ProfileId,
    contractor_id: ProfileId,
    terms: String,
    status: Mutex<ContractStatus>,
}

impl Contract {
    /// Creates a contract between a client and a contractor.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SelfContract`] if both parties are the same
    /// profile.
    pub fn new(
        id: ContractId,
        client_id: ProfileId,
        contractor_id: ProfileId,
        terms: impl Into<String>,
        status: ContractStatus,
    ) -> Result<Self, LedgerError> {
        if client_id == contractor_id {
            return Err(LedgerError::SelfContract);
        }
        Ok(Self {
            id,
            client_id,
            contractor_id,
            terms: terms.into(),
            status: Mutex::new(status),
        })
    }

    pub fn id(&self) -> ContractId {
        self.id
    }

    pub fn client_id(&self) -> ProfileId {
        self.client_id
    }

    pub fn contractor_id(&self) -> ProfileId {
        self.contractor_id
    }

    pub fn terms(&self) -> &str {
        &self.terms
    }

    pub fn status(&self) -> ContractStatus {
        *self.status.lock()
    }

    /// Applies an externally-driven status transition.
    pub fn set_status(&self, status: ContractStatus) {
        *self.status.lock() = status;
    }

    /// True if the profile is the client or the contractor of this contract.
    pub fn is_party(&self, profile_id: ProfileId) -> bool {
        self.client_id == profile_id || self.contractor_id == profile_id
    }
}

impl Serialize for Contract {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let status = self.status.lock();
        let mut state = serializer.serialize_struct("Contract", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("client_id", &self.client_id)?;
        state.serialize_field("contractor_id", &self.contractor_id)?;
        state.serialize_field("terms", &self.terms)?;
        state.serialize_field("status", &*status)?;
        state.end()
    }
}
