use crate::overrides::SessionOverrides;
use crate::schema::AccountMapping;
use std::collections::BTreeMap;

/// Right-pads a raw account number with `'0'` to the canonical 9-character
/// width. French chart-of-accounts numbers are hierarchical by prefix, so a
/// uniform width lets prefix matching treat "613" and "61352003" alike.
/// Blank input normalizes to the empty string; input already at or beyond
/// 9 characters is returned unchanged, which makes the operation idempotent.
pub fn normalize_account_number(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{:0<9}", trimmed)
}

/// The static side of account resolution: exact entries keyed by normalized
/// number plus longest-prefix rules. Session overrides live elsewhere
/// ([`SessionOverrides`]) and always win over this table.
#[derive(Debug, Clone)]
pub struct MappingTable {
    exact: BTreeMap<String, AccountMapping>,
    prefixes: Vec<(String, AccountMapping)>,
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::french_pcg()
    }
}

impl MappingTable {
    pub fn empty() -> Self {
        Self {
            exact: BTreeMap::new(),
            prefixes: Vec::new(),
        }
    }

    /// The built-in table, derived from the French Plan Comptable Général:
    /// classes 1-5 land in the balance-sheet (stock) categories, classes
    /// 6-7 in the P&L (flow) categories. Longer prefixes carve exceptions
    /// out of their class, e.g. 4456 (deductible VAT) is an asset inside
    /// the otherwise-liability class 44.
    pub fn french_pcg() -> Self {
        let mut table = Self::empty();
        for (prefix, concept, sub_category, grand_category) in DEFAULT_PCG_RULES {
            table = table.with_prefix(
                *prefix,
                AccountMapping::new(*concept, *grand_category, *sub_category),
            );
        }
        table
    }

    /// Adds an exact entry; the key is normalized on insert.
    pub fn with_exact(mut self, account_number: &str, mapping: AccountMapping) -> Self {
        self.exact
            .insert(normalize_account_number(account_number), mapping);
        self
    }

    /// Adds a prefix rule. Prefixes match against normalized numbers;
    /// the longest matching prefix wins.
    pub fn with_prefix(mut self, prefix: &str, mapping: AccountMapping) -> Self {
        self.prefixes.push((prefix.to_string(), mapping));
        self
    }

    pub fn exact_lookup(&self, normalized: &str) -> Option<&AccountMapping> {
        self.exact.get(normalized)
    }

    /// Opaque fallback resolution over the raw number: normalizes
    /// internally, then picks the longest matching prefix rule.
    pub fn fallback_lookup(&self, raw: &str) -> Option<&AccountMapping> {
        let normalized = normalize_account_number(raw);
        if normalized.is_empty() {
            return None;
        }
        self.prefixes
            .iter()
            .filter(|(prefix, _)| normalized.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, mapping)| mapping)
    }

    pub fn rule_count(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }
}

/// Resolves a raw account number to its taxonomy position. First hit wins:
/// session override by normalized key, then the static table's fallback
/// matching on the raw number, then an exact lookup on the normalized
/// number. `None` means unmapped; that is the signaled outcome, never an
/// error.
pub fn resolve(
    raw: &str,
    table: &MappingTable,
    overrides: &SessionOverrides,
) -> Option<AccountMapping> {
    let normalized = normalize_account_number(raw);
    overrides
        .get(&normalized)
        .cloned()
        .or_else(|| table.fallback_lookup(raw).cloned())
        .or_else(|| table.exact_lookup(&normalized).cloned())
}

/// Resolution against the static system only. The account-inventory views
/// use this so they answer "what is unmapped by the static table",
/// independent of ad hoc session fixes.
pub fn resolve_static(raw: &str, table: &MappingTable) -> Option<AccountMapping> {
    table
        .fallback_lookup(raw)
        .cloned()
        .or_else(|| table.exact_lookup(&normalize_account_number(raw)).cloned())
}

const REVENUE: &str = "Revenue";
const OPEX: &str = "Operating Expenses (OPEX)";
const FINANCIAL: &str = "Financial Result";
const EXCEPTIONAL: &str = "Exceptional Result";
const INCOME_TAX: &str = "Income Tax";
const CURRENT_ASSETS: &str = "Current Assets";
const CURRENT_LIABILITIES: &str = "Current Liabilities";
const EQUITY_LTF: &str = "Equity & Long-term Funding";
const NON_CURRENT_ASSETS: &str = "Non-Current Assets";

/// (prefix, concept, sub-category, grand category)
const DEFAULT_PCG_RULES: &[(&str, &str, &str, &str)] = &[
    // Class 1 - capital & borrowings
    ("10", "Share Capital & Reserves", "Equity", EQUITY_LTF),
    ("11", "Retained Earnings", "Equity", EQUITY_LTF),
    ("12", "Net Result", "Equity", EQUITY_LTF),
    ("13", "Investment Grants", "Equity", EQUITY_LTF),
    ("15", "Provisions", "Long-term Funding", EQUITY_LTF),
    ("16", "Borrowings", "Long-term Funding", EQUITY_LTF),
    // Class 2 - fixed assets
    ("20", "Intangible Assets", "Fixed Assets", NON_CURRENT_ASSETS),
    ("21", "Tangible Assets", "Fixed Assets", NON_CURRENT_ASSETS),
    ("23", "Assets under Construction", "Fixed Assets", NON_CURRENT_ASSETS),
    ("26", "Equity Investments", "Financial Assets", NON_CURRENT_ASSETS),
    ("27", "Other Financial Assets", "Financial Assets", NON_CURRENT_ASSETS),
    ("28", "Accumulated Depreciation", "Fixed Assets", NON_CURRENT_ASSETS),
    // Class 3 - inventories
    ("3", "Inventories", "Inventory", CURRENT_ASSETS),
    // Class 4 - receivables & payables
    ("40", "Trade Payables", "Payables", CURRENT_LIABILITIES),
    ("409", "Supplier Advances", "Receivables", CURRENT_ASSETS),
    ("41", "Trade Receivables", "Receivables", CURRENT_ASSETS),
    ("419", "Customer Advances", "Other Payables", CURRENT_LIABILITIES),
    ("42", "Payroll Liabilities", "Social & Tax Liabilities", CURRENT_LIABILITIES),
    ("43", "Social Security Liabilities", "Social & Tax Liabilities", CURRENT_LIABILITIES),
    ("44", "Tax Liabilities", "Social & Tax Liabilities", CURRENT_LIABILITIES),
    ("4456", "Deductible VAT", "Tax Receivables", CURRENT_ASSETS),
    ("45", "Group & Partners", "Other Payables", CURRENT_LIABILITIES),
    ("46", "Other Receivables", "Receivables", CURRENT_ASSETS),
    ("47", "Suspense Accounts", "Receivables", CURRENT_ASSETS),
    ("48", "Accruals", "Other Payables", CURRENT_LIABILITIES),
    ("486", "Prepaid Expenses", "Receivables", CURRENT_ASSETS),
    ("49", "Receivable Provisions", "Receivables", CURRENT_ASSETS),
    // Class 5 - cash
    ("5", "Cash & Banks", "Cash", CURRENT_ASSETS),
    ("519", "Bank Overdrafts", "Financial Debt", CURRENT_LIABILITIES),
    // Class 6 - expenses
    ("60", "Purchases", "Cost of Goods & Supplies", OPEX),
    ("606", "Non-stored Supplies", "General & Administrative", OPEX),
    ("61", "External Services", "General & Administrative", OPEX),
    ("613", "Rent & Leasing", "General & Administrative", OPEX),
    ("615", "Maintenance & Repairs", "General & Administrative", OPEX),
    ("616", "Insurance", "General & Administrative", OPEX),
    ("62", "Other External Services", "General & Administrative", OPEX),
    ("622", "Professional Fees", "General & Administrative", OPEX),
    ("623", "Marketing & Advertising", "Sales & Marketing", OPEX),
    ("625", "Travel & Entertainment", "General & Administrative", OPEX),
    ("626", "Postal & Telecom", "General & Administrative", OPEX),
    ("627", "Banking Services", "General & Administrative", OPEX),
    ("63", "Taxes & Duties", "Taxes & Duties", OPEX),
    ("64", "Wages & Salaries", "Payroll", OPEX),
    ("645", "Social Charges", "Payroll", OPEX),
    ("65", "Other Operating Expenses", "General & Administrative", OPEX),
    ("66", "Interest Expense", "Financial Expenses", FINANCIAL),
    ("67", "Exceptional Expenses", "Exceptional Items", EXCEPTIONAL),
    ("68", "Depreciation & Provisions", "Depreciation", OPEX),
    ("69", "Income Tax", "Income Tax", INCOME_TAX),
    // Class 7 - income
    ("70", "Sales", "Product Revenue", REVENUE),
    ("706", "Services", "Service Revenue", REVENUE),
    ("708", "Ancillary Revenue", "Other Revenue", REVENUE),
    ("709", "Rebates & Discounts", "Product Revenue", REVENUE),
    ("74", "Operating Subsidies", "Other Revenue", REVENUE),
    ("75", "Other Operating Income", "Other Revenue", REVENUE),
    ("76", "Financial Income", "Financial Income", FINANCIAL),
    ("77", "Exceptional Income", "Exceptional Items", EXCEPTIONAL),
    ("78", "Provision Reversals", "Other Revenue", REVENUE),
    ("79", "Expense Transfers", "Other Revenue", REVENUE),
];
