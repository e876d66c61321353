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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use gig_ledger_rs::{
    Caller, Contract, ContractId, ContractStatus, Job, JobId, LedgerStore, Profile, ProfileId,
    ReportWindow, ReportingEngine, Role, TransferEngine,
    validate::{parse_timestamp, validate_limit},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Gig Ledger - Replay marketplace operations from CSV files
///
/// Seeds profiles, contracts and jobs from one CSV, replays deposit/pay
/// operations from another, and prints the final balances to stdout.
/// Admin reports over the resulting ledger are available via flags.
#[derive(Parser, Debug)]
#[command(name = "gig-ledger-rs")]
#[command(about = "A marketplace ledger that replays operation CSVs", long_about = None)]
struct Args {
    /// Path to the seed CSV (profiles, contracts, jobs)
    ///
    /// Expected columns:
    /// kind,id,first_name,last_name,profession,type,balance,client,contractor,status,terms,contract,description,price,paid,payment_date
    #[arg(value_name = "SEED")]
    seed: PathBuf,

    /// Path to the operations CSV
    ///
    /// Expected columns: type,profile,job,amount
    /// Example: deposit,1,,100.00 or pay,1,7,
    #[arg(value_name = "OPS")]
    ops: PathBuf,

    /// Print the journal of committed transfers as JSON lines instead of
    /// balances
    #[arg(long)]
    journal: bool,

    /// Print the best-profession report for [--start, --end) instead of
    /// balances
    #[arg(long)]
    best_profession: bool,

    /// Print the best-clients report for [--start, --end) instead of balances
    #[arg(long)]
    best_clients: bool,

    /// Report window start (RFC 3339)
    #[arg(long)]
    start: Option<String>,

    /// Report window end (RFC 3339)
    #[arg(long)]
    end: Option<String>,

    /// Maximum number of clients in the best-clients report (default 2)
    #[arg(long)]
    limit: Option<i64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let seed_file = match File::open(&args.seed) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening seed file '{}': {}", args.seed.display(), e);
            process::exit(1);
        }
    };
    let ops_file = match File::open(&args.ops) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening ops file '{}': {}", args.ops.display(), e);
            process::exit(1);
        }
    };

    let store = Arc::new(LedgerStore::new());
    if let Err(e) = seed_store(BufReader::new(seed_file), &store) {
        eprintln!("Error seeding ledger: {}", e);
        process::exit(1);
    }

    let engine = TransferEngine::new(Arc::clone(&store));
    if let Err(e) = replay_operations(BufReader::new(ops_file), &store, &engine) {
        eprintln!("Error replaying operations: {}", e);
        process::exit(1);
    }

    let result = if args.best_profession || args.best_clients {
        print_reports(&args, Arc::clone(&store))
    } else if args.journal {
        print_journal(&engine)
    } else {
        write_balances(&store, std::io::stdout())
    };
    if let Err(e) = result {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw seed CSV record. One row per entity; columns that do not apply to the
/// row's kind stay empty.
#[derive(Debug, Deserialize)]
struct SeedRecord {
    kind: String,
    id: u32,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    profession: String,
    #[serde(rename = "type", default)]
    profile_type: String,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    balance: Option<Decimal>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    client: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    contractor: Option<u32>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    terms: String,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    contract: Option<u32>,
    #[serde(default)]
    description: String,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    price: Option<Decimal>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    paid: Option<bool>,
    #[serde(default)]
    payment_date: String,
}

impl SeedRecord {
    /// Loads the record into the store. Unknown kinds and incomplete rows are
    /// reported as `None` and skipped by the caller.
    fn load_into(self, store: &LedgerStore) -> Option<()> {
        match self.kind.as_str() {
            "profile" => {
                let role = self.profile_type.parse::<Role>().ok()?;
                let profile = Profile::new(
                    ProfileId(self.id),
                    self.first_name,
                    self.last_name,
                    self.profession,
                    role,
                    self.balance.unwrap_or(Decimal::ZERO),
                )
                .ok()?;
                store.add_profile(profile).ok()?;
            }
            "contract" => {
                let status = self.status.parse::<ContractStatus>().ok()?;
                let contract = Contract::new(
                    ContractId(self.id),
                    ProfileId(self.client?),
                    ProfileId(self.contractor?),
                    self.terms,
                    status,
                )
                .ok()?;
                store.add_contract(contract).ok()?;
            }
            "job" => {
                let contract_id = ContractId(self.contract?);
                let price = self.price?;
                let job = if self.paid.unwrap_or(false) {
                    let paid_at = parse_timestamp(&self.payment_date).ok()?;
                    Job::new_paid(JobId(self.id), contract_id, self.description, price, paid_at)
                } else {
                    Job::new(JobId(self.id), contract_id, self.description, price)
                }
                .ok()?;
                store.add_job(job).ok()?;
            }
            _ => return None,
        }
        Some(())
    }
}

/// Raw operations CSV record.
///
/// Fields: `type, profile, job, amount`
#[derive(Debug, Deserialize)]
struct OpRecord {
    #[serde(rename = "type")]
    op_type: String,
    profile: u32,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    job: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    amount: Option<Decimal>,
}

/// Seeds the store from a CSV reader. Malformed rows are logged and skipped.
fn seed_store<R: Read>(reader: R, store: &LedgerStore) -> Result<(), csv::Error> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    for result in csv_reader.deserialize::<SeedRecord>() {
        match result {
            Ok(record) => {
                let kind = record.kind.clone();
                let id = record.id;
                if record.load_into(store).is_none() {
                    tracing::warn!(kind = %kind, id, "skipping invalid seed row");
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping malformed seed row"),
        }
    }
    Ok(())
}

/// Replays operations against the engine. Rejected operations are logged and
/// skipped; each failure is scoped to its own row.
fn replay_operations<R: Read>(
    reader: R,
    store: &LedgerStore,
    engine: &TransferEngine,
) -> Result<(), csv::Error> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    for result in csv_reader.deserialize::<OpRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed operation row");
                continue;
            }
        };

        let profile_id = ProfileId(record.profile);
        let caller = match store.resolve_caller(profile_id) {
            Ok(caller) => caller,
            Err(e) => {
                tracing::warn!(profile = %profile_id, error = %e, "unresolvable caller");
                continue;
            }
        };

        let outcome = match (record.op_type.as_str(), record.job, record.amount) {
            ("deposit", _, Some(amount)) => engine.deposit(profile_id, amount, &caller),
            ("pay", Some(job), _) => engine.pay_job(JobId(job), &caller),
            _ => {
                tracing::warn!(op = %record.op_type, "skipping invalid operation row");
                continue;
            }
        };
        if let Err(e) = outcome {
            tracing::warn!(op = %record.op_type, profile = %profile_id, error = %e, "operation rejected");
        }
    }
    Ok(())
}

/// Writes all profile balances as CSV.
fn write_balances<W: Write>(store: &LedgerStore, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = Writer::from_writer(writer);
    for profile in store.profiles() {
        csv_writer.serialize(&*profile)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Prints the journal of committed transfers as JSON lines.
fn print_journal(engine: &TransferEngine) -> Result<(), csv::Error> {
    for entry in engine.audit().drain() {
        match serde_json::to_string(&entry) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "unserializable journal entry"),
        }
    }
    Ok(())
}

/// Runs the requested admin reports and prints them as JSON.
///
/// The CLI is a trusted operator, so reports run under a synthetic admin
/// caller rather than a seeded profile.
fn print_reports(args: &Args, store: Arc<LedgerStore>) -> Result<(), csv::Error> {
    let (Some(start), Some(end)) = (args.start.as_deref(), args.end.as_deref()) else {
        eprintln!("Reports require --start and --end");
        process::exit(1);
    };
    let window = match ReportWindow::parse(start, end) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("Invalid report window: {}", e);
            process::exit(1);
        }
    };
    let admin = Caller {
        id: ProfileId(0),
        role: Role::Admin,
    };
    let reporting = ReportingEngine::new(store);

    if args.best_profession {
        match reporting.best_profession(&window, &admin) {
            Ok(best) => print_json(&best),
            Err(e) => {
                eprintln!("best-profession failed: {}", e);
                process::exit(1);
            }
        }
    }
    if args.best_clients {
        let limit = match validate_limit(args.limit) {
            Ok(limit) => limit,
            Err(e) => {
                eprintln!("Invalid limit: {}", e);
                process::exit(1);
            }
        };
        match reporting.best_clients(&window, limit, &admin) {
            Ok(clients) => print_json(&clients),
            Err(e) => {
                eprintln!("best-clients failed: {}", e);
                process::exit(1);
            }
        }
    }
    Ok(())
}

/// Prints a report as one JSON line, exiting on serialization failure like
/// every other output error in this binary.
fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => {
            eprintln!("Error writing output: {}", e);
            process::exit(1);
        }
    }
}
