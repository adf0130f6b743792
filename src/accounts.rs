use crate::resolver::{normalize_account_number, resolve_static, MappingTable};
use crate::schema::{AccountSummary, LedgerEntry, UnmappedAccount};
use std::collections::BTreeMap;

/// Per-account running totals shared by both inventory views.
#[derive(Default)]
struct AccountTotals {
    compte_lib: String,
    total_debit: f64,
    total_credit: f64,
    entry_count: usize,
}

/// Aggregates entries per account, keyed by normalized number with the raw
/// number as fallback for blank accounts. The label is the first non-empty
/// one seen.
fn aggregate_by_account<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> BTreeMap<String, AccountTotals> {
    let mut totals: BTreeMap<String, AccountTotals> = BTreeMap::new();
    for entry in entries {
        let normalized = normalize_account_number(&entry.compte_num);
        let key = if normalized.is_empty() {
            entry.compte_num.clone()
        } else {
            normalized
        };

        let account = totals.entry(key).or_default();
        if account.compte_lib.is_empty() {
            account.compte_lib = entry.compte_lib.clone();
        }
        account.total_debit += entry.debit_amount();
        account.total_credit += entry.credit_amount();
        account.entry_count += 1;
    }
    totals
}

/// Flat summary of every account the *static* mapping system cannot place,
/// sorted by descending absolute net amount so the operator sees the most
/// material gaps first. Session overrides are deliberately not consulted:
/// this view answers "what is unmapped by the static table", and the
/// caller subtracts session-mapped accounts afterward.
pub fn list_unmapped(entries: &[LedgerEntry], table: &MappingTable) -> Vec<UnmappedAccount> {
    let unresolved = entries
        .iter()
        .filter(|entry| resolve_static(&entry.compte_num, table).is_none());

    let mut accounts: Vec<UnmappedAccount> = aggregate_by_account(unresolved)
        .into_iter()
        .map(|(compte_num, totals)| UnmappedAccount {
            compte_num,
            compte_lib: totals.compte_lib,
            net_amount: totals.total_debit - totals.total_credit,
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            entry_count: totals.entry_count,
        })
        .collect();

    accounts.sort_by(|a, b| {
        b.net_amount
            .abs()
            .partial_cmp(&a.net_amount.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    accounts
}

/// Flat summary of every account in the file, mapped and unmapped alike,
/// sorted ascending by account number. Drives the manual-mapping review
/// surface; as with [`list_unmapped`], session overrides are applied by the
/// caller afterward to decide display status.
pub fn list_all_accounts(entries: &[LedgerEntry], table: &MappingTable) -> Vec<AccountSummary> {
    aggregate_by_account(entries)
        .into_iter()
        .map(|(compte_num, totals)| {
            let mapping = resolve_static(&compte_num, table);
            AccountSummary {
                is_mapped: mapping.is_some(),
                mapping,
                compte_lib: totals.compte_lib,
                net_amount: totals.total_debit - totals.total_credit,
                total_debit: totals.total_debit,
                total_credit: totals.total_credit,
                entry_count: totals.entry_count,
                compte_num,
            }
        })
        .collect()
}
