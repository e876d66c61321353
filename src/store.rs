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

//! In-process ledger store.
//!
//! [`LedgerStore`] plays the role of the transactional relational store: rows
//! live in [`DashMap`]s keyed by id, each row carries its own exclusive lock,
//! and provisioning uses the dashmap entry API so duplicate-id checks are
//! atomic. The store also hosts the caller-scoped read queries (contracts and
//! unpaid jobs for a party) and the caller-resolution seam used by the access
//! guard.

use crate::base::{ContractId, JobId, ProfileId};
use crate::contract::{Contract, ContractStatus};
use crate::error::LedgerError;
use crate::job::{Job, JobSnapshot};
use crate::profile::{Caller, Profile, Role};
use crate::validate::require_role;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Concurrent row store for profiles, contracts and jobs.
pub struct LedgerStore {
    profiles: DashMap<ProfileId, Arc<Profile>>,
    contracts: DashMap<ContractId, Arc<Contract>>,
    jobs: DashMap<JobId, Arc<Job>>,
}

impl LedgerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
            contracts: DashMap::new(),
            jobs: DashMap::new(),
        }
    }

    // === Provisioning ===
    //
    // Entity creation is external to the transfer engine; these methods exist
    // for seeding and for the lifecycle collaborators.

    /// Adds a profile.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateId`] if the id is already taken.
    pub fn add_profile(&self, profile: Profile) -> Result<Arc<Profile>, LedgerError> {
        match self.profiles.entry(profile.id()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateId),
            Entry::Vacant(entry) => {
                let profile = Arc::new(profile);
                entry.insert(Arc::clone(&profile));
                Ok(profile)
            }
        }
    }

    /// Adds a contract. Both parties must already exist.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ProfileNotFound`] if either party is unknown.
    /// - [`LedgerError::DuplicateId`] if the id is already taken.
    pub fn add_contract(&self, contract: Contract) -> Result<Arc<Contract>, LedgerError> {
        if !self.profiles.contains_key(&contract.client_id())
            || !self.profiles.contains_key(&contract.contractor_id())
        {
            return Err(LedgerError::ProfileNotFound);
        }
        match self.contracts.entry(contract.id()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateId),
            Entry::Vacant(entry) => {
                let contract = Arc::new(contract);
                entry.insert(Arc::clone(&contract));
                Ok(contract)
            }
        }
    }

    /// Adds a job. The contract must already exist.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContractNotFound`] if the contract is unknown.
    /// - [`LedgerError::DuplicateId`] if the id is already taken.
    pub fn add_job(&self, job: Job) -> Result<Arc<Job>, LedgerError> {
        if !self.contracts.contains_key(&job.contract_id()) {
            return Err(LedgerError::ContractNotFound);
        }
        match self.jobs.entry(job.id()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateId),
            Entry::Vacant(entry) => {
                let job = Arc::new(job);
                entry.insert(Arc::clone(&job));
                Ok(job)
            }
        }
    }

    // === Row access ===

    pub fn profile(&self, id: ProfileId) -> Option<Arc<Profile>> {
        self.profiles.get(&id).map(|row| Arc::clone(row.value()))
    }

    pub fn contract(&self, id: ContractId) -> Option<Arc<Contract>> {
        self.contracts.get(&id).map(|row| Arc::clone(row.value()))
    }

    pub fn job(&self, id: JobId) -> Option<Arc<Job>> {
        self.jobs.get(&id).map(|row| Arc::clone(row.value()))
    }

    /// All profiles, ordered by id.
    pub fn profiles(&self) -> Vec<Arc<Profile>> {
        let mut rows: Vec<_> = self
            .profiles
            .iter()
            .map(|row| Arc::clone(row.value()))
            .collect();
        rows.sort_by_key(|profile| profile.id());
        rows
    }

    /// All jobs, ordered by id.
    pub fn jobs(&self) -> Vec<Arc<Job>> {
        let mut rows: Vec<_> = self.jobs.iter().map(|row| Arc::clone(row.value())).collect();
        rows.sort_by_key(|job| job.id());
        rows
    }

    // === Access guard seam ===

    /// Resolves a profile id to a caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ProfileNotFound`] if no such profile exists.
    pub fn resolve_caller(&self, id: ProfileId) -> Result<Caller, LedgerError> {
        self.profile(id)
            .map(|profile| profile.caller())
            .ok_or(LedgerError::ProfileNotFound)
    }

    // === Caller-scoped queries ===

    /// Sum of unpaid job prices under the client's in-progress contracts.
    ///
    /// This is the deposit-cap basis. The read is not serialized against
    /// concurrent payments; the cap is a soft business rule and staleness is
    /// acceptable.
    pub fn outstanding_for(&self, client_id: ProfileId) -> Decimal {
        self.jobs
            .iter()
            .filter(|row| !row.value().paid())
            .filter_map(|row| self.contract(row.value().contract_id()).map(|c| (Arc::clone(row.value()), c)))
            .filter(|(_, contract)| {
                contract.status() == ContractStatus::InProgress
                    && contract.client_id() == client_id
            })
            .map(|(job, _)| job.price())
            .sum()
    }

    /// The contract with the given id, only if the caller is a party to it.
    ///
    /// A contract that exists but belongs to someone else is indistinguishable
    /// from one that does not exist.
    pub fn contract_for(
        &self,
        caller: &Caller,
        id: ContractId,
    ) -> Result<Arc<Contract>, LedgerError> {
        require_role(caller, &[Role::Client, Role::Contractor])?;
        self.contract(id)
            .filter(|contract| contract.is_party(caller.id))
            .ok_or(LedgerError::ContractNotFound)
    }

    /// Non-terminated contracts the caller is a party to, ordered by id.
    pub fn contracts_for(&self, caller: &Caller) -> Result<Vec<Arc<Contract>>, LedgerError> {
        require_role(caller, &[Role::Client, Role::Contractor])?;
        let mut rows: Vec<_> = self
            .contracts
            .iter()
            .map(|row| Arc::clone(row.value()))
            .filter(|contract| {
                contract.status() != ContractStatus::Terminated && contract.is_party(caller.id)
            })
            .collect();
        rows.sort_by_key(|contract| contract.id());
        Ok(rows)
    }

    /// Unpaid jobs under in-progress contracts where the caller is a party,
    /// ordered by id.
    pub fn unpaid_jobs_for(&self, caller: &Caller) -> Result<Vec<JobSnapshot>, LedgerError> {
        require_role(caller, &[Role::Client, Role::Contractor])?;
        let mut rows: Vec<_> = self
            .jobs
            .iter()
            .map(|row| row.value().snapshot())
            .filter(|job| !job.paid)
            .filter(|job| {
                self.contract(job.contract_id).is_some_and(|contract| {
                    contract.status() == ContractStatus::InProgress
                        && contract.is_party(caller.id)
                })
            })
            .collect();
        rows.sort_by_key(|job| job.id);
        Ok(rows)
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
