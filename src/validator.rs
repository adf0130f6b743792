use crate::schema::{EcritureValidation, GlobalBalance, LedgerEntry, UnbalancedEcriture};
use std::collections::BTreeMap;

/// Absolute debit/credit difference beyond which a journal entry (or the
/// whole ledger) is reported as unbalanced.
pub const BALANCE_TOLERANCE: f64 = 0.01;

/// Groups entries by journal-entry id and checks that each group's debits
/// and credits net to zero within [`BALANCE_TOLERANCE`]. Malformed numeric
/// fields count as zero; this never fails, it only reports.
pub fn validate_ecritures(entries: &[LedgerEntry]) -> EcritureValidation {
    let mut groups: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for entry in entries {
        let totals = groups.entry(entry.ecriture_num.as_str()).or_default();
        totals.0 += entry.debit_amount();
        totals.1 += entry.credit_amount();
    }

    let unbalanced_entries: Vec<UnbalancedEcriture> = groups
        .into_iter()
        .filter_map(|(ecriture_num, (total_debit, total_credit))| {
            let difference = (total_debit - total_credit).abs();
            if difference > BALANCE_TOLERANCE {
                Some(UnbalancedEcriture {
                    ecriture_num: ecriture_num.to_string(),
                    total_debit,
                    total_credit,
                    difference,
                })
            } else {
                None
            }
        })
        .collect();

    EcritureValidation {
        is_valid: unbalanced_entries.is_empty(),
        unbalanced_entries,
    }
}

/// Sums debits and credits over all entries, mapped or not. Independent of
/// the per-entry check: a file can balance globally while individual
/// journal entries do not, and vice versa, so both are exposed separately.
pub fn calculate_global_balance(entries: &[LedgerEntry]) -> GlobalBalance {
    let mut total_debit = 0.0;
    let mut total_credit = 0.0;
    for entry in entries {
        total_debit += entry.debit_amount();
        total_credit += entry.credit_amount();
    }

    let net_balance = total_debit - total_credit;
    GlobalBalance {
        total_debit,
        total_credit,
        net_balance,
        is_balanced: net_balance.abs() <= BALANCE_TOLERANCE,
    }
}
