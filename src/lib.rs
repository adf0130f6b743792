//! # FEC Operating Model
//!
//! A library for rolling up French statutory accounting exports (FEC,
//! Fichier des Écritures Comptables) into a hierarchical operating-model
//! report with monthly time series.
//!
//! ## Core Concepts
//!
//! - **Ledger entries**: flat FEC lines, grouped by journal entry
//!   (écriture) for double-entry balance checks
//! - **Mapping**: assignment of a chart-of-accounts number to a
//!   `(concept, grand category, sub-category)` taxonomy position, via a
//!   static prefix table plus session-scoped manual overrides
//! - **Report tree**: category → sub-category → concept rows with
//!   account-level detail, each carrying actual and mock-budget monthly
//!   series
//! - **Flow vs stock**: P&L categories show monthly movements; balance-sheet
//!   categories show cumulative balances as of each month
//!
//! ## Example
//!
//! ```rust,ignore
//! use fec_operating_model::*;
//!
//! let entries = parse_fec_str(&std::fs::read_to_string("export.txt")?)?;
//! let table = MappingTable::default();
//! let overrides = SessionOverrides::new();
//!
//! let report = FecReportProcessor::process(&entries, &table, &overrides);
//! for category in &report.rows {
//!     println!("{}: {:.2}", category.name, category.amount);
//! }
//! ```

pub mod accounts;
pub mod budget;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod overrides;
pub mod report;
pub mod resolver;
pub mod schema;
pub mod utils;
pub mod validator;

pub use accounts::{list_all_accounts, list_unmapped};
pub use budget::{round_to_human, synthesize_budget};
pub use engine::build_operating_model;
pub use error::{FecError, Result};
pub use ingestion::{detect_delimiter, parse_fec_reader, parse_fec_str};
pub use overrides::{MappingEdit, SessionOverrides};
pub use report::{flatten, summarize, to_csv, to_markdown, FlatRow, ReportSummary, RowLevel};
pub use resolver::{normalize_account_number, resolve, resolve_static, MappingTable};
pub use schema::*;
pub use utils::*;
pub use validator::{calculate_global_balance, validate_ecritures, BALANCE_TOLERANCE};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered-by-key mapping from "YYYY-MM" month keys to amounts.
pub type MonthlySeries = BTreeMap<String, f64>;

/// Everything the rendering layer needs from one pass over a FEC file:
/// the report tree, both balance checks, and the account inventories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FecReport {
    pub rows: Vec<CategoryRow>,
    pub validation: EcritureValidation,
    pub global_balance: GlobalBalance,
    pub unmapped_accounts: Vec<UnmappedAccount>,
    pub all_accounts: Vec<AccountSummary>,
}

pub struct FecReportProcessor;

impl FecReportProcessor {
    /// Runs the full pipeline over a batch of entries. Infallible by
    /// design: accounting anomalies surface as warnings inside the result,
    /// unmappable accounts as inventory rows, and empty input as an empty
    /// report.
    pub fn process(
        entries: &[LedgerEntry],
        table: &MappingTable,
        overrides: &SessionOverrides,
    ) -> FecReport {
        info!("building operating model from {} ledger entries", entries.len());

        let validation = validator::validate_ecritures(entries);
        if !validation.is_valid {
            debug!(
                "{} unbalanced journal entries",
                validation.unbalanced_entries.len()
            );
        }
        let global_balance = validator::calculate_global_balance(entries);

        let rows = engine::build_operating_model(entries, table, overrides);
        let unmapped_accounts = accounts::list_unmapped(entries, table);
        let all_accounts = accounts::list_all_accounts(entries, table);
        debug!(
            "{} categories, {} accounts unmapped by the static table",
            rows.len(),
            unmapped_accounts.len()
        );

        FecReport {
            rows,
            validation,
            global_balance,
            unmapped_accounts,
            all_accounts,
        }
    }

    /// Shortcut using the built-in Plan Comptable Général table and no
    /// session overrides.
    pub fn process_with_defaults(entries: &[LedgerEntry]) -> FecReport {
        Self::process(entries, &MappingTable::default(), &SessionOverrides::new())
    }
}

pub fn process_fec_report(
    entries: &[LedgerEntry],
    table: &MappingTable,
    overrides: &SessionOverrides,
) -> FecReport {
    FecReportProcessor::process(entries, table, overrides)
}
