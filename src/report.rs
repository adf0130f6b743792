use crate::schema::{CategoryRow, LedgerEntry};
use crate::utils::parse_entry_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLevel {
    Category,
    SubCategory,
    Concept,
}

/// One row of the flattened table the rendering layer displays. Emitted
/// for every node regardless of collapse state; the UI toggles
/// `is_collapsed` without re-invoking the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub level: RowLevel,
    pub key: String,
    pub name: String,
    pub amount: f64,
    pub is_collapsed: bool,
}

pub fn flatten(rows: &[CategoryRow]) -> Vec<FlatRow> {
    let mut flat = Vec::new();
    for category in rows {
        flat.push(FlatRow {
            level: RowLevel::Category,
            key: category.key.clone(),
            name: category.name.clone(),
            amount: category.amount,
            is_collapsed: category.is_collapsed,
        });
        for sub in &category.sub_categories {
            flat.push(FlatRow {
                level: RowLevel::SubCategory,
                key: sub.key.clone(),
                name: sub.name.clone(),
                amount: sub.amount,
                is_collapsed: sub.is_collapsed,
            });
            for concept in &sub.concepts {
                flat.push(FlatRow {
                    level: RowLevel::Concept,
                    key: concept.key.clone(),
                    name: concept.name.clone(),
                    amount: concept.amount,
                    is_collapsed: concept.is_collapsed,
                });
            }
        }
    }
    flat
}

/// Projects the category and sub-category levels to CSV for export.
pub fn to_csv(rows: &[CategoryRow]) -> String {
    let mut output = String::new();
    output.push_str("Grande Catégorie,Sous-Catégorie,Montant\n");

    for category in rows {
        output.push_str(&format!("{},,{:.2}\n", category.name, category.amount));
        for sub in &category.sub_categories {
            output.push_str(&format!(
                "{},{},{:.2}\n",
                category.name, sub.name, sub.amount
            ));
        }
    }

    output
}

pub fn to_markdown(rows: &[CategoryRow]) -> String {
    let mut output = String::new();
    output.push_str("# Operating Model\n\n");

    for category in rows {
        output.push_str(&format!("## {}: {:.2}\n\n", category.name, category.amount));
        for sub in &category.sub_categories {
            output.push_str(&format!("- **{}**: {:.2}\n", sub.name, sub.amount));
            for concept in &sub.concepts {
                output.push_str(&format!("  - {}: {:.2}\n", concept.name, concept.amount));
            }
        }
        output.push('\n');
    }

    output
}

/// Headline figures for the report banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub category_count: usize,
    pub sub_category_count: usize,
    pub concept_count: usize,
    pub account_count: usize,
    pub entry_count: usize,
    pub total_amount: f64,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

pub fn summarize(rows: &[CategoryRow], entries: &[LedgerEntry]) -> ReportSummary {
    let mut accounts: BTreeSet<&str> = BTreeSet::new();
    let mut sub_category_count = 0;
    let mut concept_count = 0;
    for category in rows {
        sub_category_count += category.sub_categories.len();
        for sub in &category.sub_categories {
            concept_count += sub.concepts.len();
        }
        accounts.extend(category.account_numbers.iter().map(String::as_str));
    }

    let dates: Vec<NaiveDate> = entries
        .iter()
        .filter_map(|entry| parse_entry_date(&entry.ecriture_date))
        .collect();

    ReportSummary {
        category_count: rows.len(),
        sub_category_count,
        concept_count,
        account_count: accounts.len(),
        entry_count: entries.len(),
        total_amount: rows.iter().map(|category| category.amount).sum(),
        period_start: dates.iter().min().copied(),
        period_end: dates.iter().max().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_operating_model;
    use crate::overrides::SessionOverrides;
    use crate::resolver::MappingTable;

    fn sample_rows() -> (Vec<CategoryRow>, Vec<LedgerEntry>) {
        let entries = vec![
            LedgerEntry::new("1", "61352003", "Locations", "20250115", "100", "0"),
            LedgerEntry::new("1", "70100000", "Ventes", "20250115", "0", "100"),
            LedgerEntry::new("2", "70100000", "Ventes", "20250310", "0", "50"),
            LedgerEntry::new("2", "51200000", "Banque", "20250310", "50", "0"),
        ];
        let rows =
            build_operating_model(&entries, &MappingTable::default(), &SessionOverrides::new());
        (rows, entries)
    }

    #[test]
    fn test_flatten_orders_parents_before_children() {
        let (rows, _) = sample_rows();
        let flat = flatten(&rows);
        assert!(!flat.is_empty());
        assert_eq!(flat[0].level, RowLevel::Category);
        assert_eq!(flat[1].level, RowLevel::SubCategory);

        let category_count = flat.iter().filter(|r| r.level == RowLevel::Category).count();
        assert_eq!(category_count, rows.len());
    }

    #[test]
    fn test_csv_projection() {
        let (rows, _) = sample_rows();
        let csv = to_csv(&rows);
        assert!(csv.starts_with("Grande Catégorie,Sous-Catégorie,Montant\n"));
        assert!(csv.contains("Revenue,Product Revenue,-150.00"));
        assert!(csv.contains("Revenue,,-150.00"));
    }

    #[test]
    fn test_markdown_projection() {
        let (rows, _) = sample_rows();
        let markdown = to_markdown(&rows);
        assert!(markdown.contains("# Operating Model"));
        assert!(markdown.contains("## Revenue"));
        assert!(markdown.contains("**Product Revenue**"));
    }

    #[test]
    fn test_summary_counts_and_period() {
        let (rows, entries) = sample_rows();
        let summary = summarize(&rows, &entries);

        assert_eq!(summary.category_count, rows.len());
        assert_eq!(summary.entry_count, 4);
        assert_eq!(summary.account_count, 3);
        assert_eq!(
            summary.period_start,
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(summary.period_end, NaiveDate::from_ymd_opt(2025, 3, 10));
        // The sample file is balanced, so the tree nets to zero.
        assert!(summary.total_amount.abs() < 1e-9);
    }
}
