use crate::utils::{month_key, parse_amount};
use crate::MonthlySeries;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// One line of a FEC export. Field names bind to the statutory column names
/// so a record deserializes straight out of the upload layer's JSON.
/// Amounts stay raw strings here: French exports use comma decimal
/// separators and parsing is the core's job, not the boundary's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerEntry {
    #[serde(rename = "EcritureNum")]
    pub ecriture_num: String,

    #[serde(rename = "CompteNum")]
    pub compte_num: String,

    #[serde(rename = "CompteLib", default)]
    pub compte_lib: String,

    /// Posting date in `YYYYMMDD` form.
    #[serde(rename = "EcritureDate", default)]
    pub ecriture_date: String,

    #[serde(rename = "Debit", default, deserialize_with = "string_or_number")]
    pub debit: String,

    #[serde(rename = "Credit", default, deserialize_with = "string_or_number")]
    pub credit: String,
}

impl LedgerEntry {
    pub fn new(
        ecriture_num: impl Into<String>,
        compte_num: impl Into<String>,
        compte_lib: impl Into<String>,
        ecriture_date: impl Into<String>,
        debit: impl Into<String>,
        credit: impl Into<String>,
    ) -> Self {
        Self {
            ecriture_num: ecriture_num.into(),
            compte_num: compte_num.into(),
            compte_lib: compte_lib.into(),
            ecriture_date: ecriture_date.into(),
            debit: debit.into(),
            credit: credit.into(),
        }
    }

    pub fn debit_amount(&self) -> f64 {
        parse_amount(&self.debit)
    }

    pub fn credit_amount(&self) -> f64 {
        parse_amount(&self.credit)
    }

    /// Net movement of the line, debit minus credit.
    pub fn net_amount(&self) -> f64 {
        self.debit_amount() - self.credit_amount()
    }

    pub fn month_key(&self) -> String {
        month_key(&self.ecriture_date)
    }
}

// The upload layer sometimes hands amounts through as JSON numbers rather
// than strings. Accept both and normalize to the string representation.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// The taxonomy position assigned to a chart-of-accounts number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AccountMapping {
    #[schemars(description = "Finest taxonomy leaf, e.g. 'Rent & Leasing' or 'Trade Receivables'")]
    pub concept: String,

    #[schemars(
        description = "Top-level operating-model category, e.g. 'Operating Expenses (OPEX)' or 'Current Assets'"
    )]
    pub grand_category: String,

    #[schemars(description = "Grouping between category and concept, e.g. 'General & Administrative'")]
    pub sub_category: String,
}

impl AccountMapping {
    pub fn new(
        concept: impl Into<String>,
        grand_category: impl Into<String>,
        sub_category: impl Into<String>,
    ) -> Self {
        Self {
            concept: concept.into(),
            grand_category: grand_category.into(),
            sub_category: sub_category.into(),
        }
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(AccountMapping);
        serde_json::to_string_pretty(&schema)
    }
}

/// Categories whose monthly values are balances as of the month rather than
/// movements within it. Everything else is a flow (P&L) category.
pub const STOCK_CATEGORIES: [&str; 4] = [
    "Current Assets",
    "Current Liabilities",
    "Equity & Long-term Funding",
    "Non-Current Assets",
];

pub fn is_stock_category(grand_category: &str) -> bool {
    STOCK_CATEGORIES.contains(&grand_category)
}

/// Per-account leaf aggregate under a concept row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDetail {
    pub compte_num: String,
    pub compte_lib: String,
    pub amount: f64,
    pub monthly_amounts: MonthlySeries,
    pub monthly_budgets: MonthlySeries,
}

/// Finest-grained row of the report tree. Carries the account-level detail;
/// concepts never have child rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRow {
    /// Composite identity, `category-subcategory-concept`.
    pub key: String,
    pub name: String,
    pub amount: f64,
    pub monthly_amounts: MonthlySeries,
    pub monthly_budgets: MonthlySeries,
    pub account_numbers: BTreeSet<String>,
    pub is_collapsed: bool,
    pub accounts: Vec<AccountDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategoryRow {
    /// Composite identity, `category-subcategory`.
    pub key: String,
    pub name: String,
    pub amount: f64,
    pub monthly_amounts: MonthlySeries,
    pub monthly_budgets: MonthlySeries,
    pub account_numbers: BTreeSet<String>,
    pub is_collapsed: bool,
    pub concepts: Vec<ConceptRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub key: String,
    pub name: String,
    pub amount: f64,
    pub monthly_amounts: MonthlySeries,
    pub monthly_budgets: MonthlySeries,
    pub account_numbers: BTreeSet<String>,
    pub is_collapsed: bool,
    pub sub_categories: Vec<SubCategoryRow>,
}

/// A journal entry whose lines do not net to zero within tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbalancedEcriture {
    pub ecriture_num: String,
    pub total_debit: f64,
    pub total_credit: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcritureValidation {
    pub is_valid: bool,
    pub unbalanced_entries: Vec<UnbalancedEcriture>,
}

/// Debit/credit totals across the whole file, independent of per-entry
/// balance and of mapping status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalBalance {
    pub total_debit: f64,
    pub total_credit: f64,
    pub net_balance: f64,
    pub is_balanced: bool,
}

/// Aggregate over all entries of one account that the static mapping system
/// cannot place. Surfaced as an operator worksheet, never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappedAccount {
    pub compte_num: String,
    pub compte_lib: String,
    pub total_debit: f64,
    pub total_credit: f64,
    pub entry_count: usize,
    pub net_amount: f64,
}

/// Aggregate over all entries of one account, mapped or not. Drives the
/// manual-mapping review surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub compte_num: String,
    pub compte_lib: String,
    pub total_debit: f64,
    pub total_credit: f64,
    pub entry_count: usize,
    pub net_amount: f64,
    pub is_mapped: bool,
    pub mapping: Option<AccountMapping>,
}
