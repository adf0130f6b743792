use crate::error::Result;
use crate::resolver::normalize_account_number;
use crate::schema::AccountMapping;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session-scoped manual mappings, keyed by normalized account number.
/// Always consulted before the static table.
///
/// This is an explicit value threaded through every engine call, never
/// ambient state. Mutation is copy-on-write: each edit produces a new map,
/// so a reader holding the previous value never observes a partial update.
/// The caller owns the lifecycle (created empty, replaced on each manual
/// mapping save, cleared on reset) and serializes edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionOverrides {
    mappings: BTreeMap<String, AccountMapping>,
}

impl SessionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup by already-normalized account number.
    pub fn get(&self, normalized: &str) -> Option<&AccountMapping> {
        self.mappings.get(normalized)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &String> {
        self.mappings.keys()
    }

    /// Returns a copy with the mapping added. The key is normalized on
    /// insert so lookups by normalized number always hit.
    pub fn with_mapping(&self, account_number: &str, mapping: AccountMapping) -> Self {
        let mut next = self.clone();
        next.mappings
            .insert(normalize_account_number(account_number), mapping);
        next
    }

    /// Returns a copy with the mapping removed.
    pub fn without_mapping(&self, account_number: &str) -> Self {
        let mut next = self.clone();
        next.mappings
            .remove(&normalize_account_number(account_number));
        next
    }

    pub fn cleared() -> Self {
        Self::default()
    }

    /// Applies an ordered batch of editor actions, returning the resulting
    /// override set. The receiver is untouched.
    pub fn apply_edits(&self, edits: &[MappingEdit]) -> Self {
        let mut next = self.clone();
        for edit in edits {
            match edit {
                MappingEdit::Set {
                    account_number,
                    mapping,
                } => {
                    next.mappings
                        .insert(normalize_account_number(account_number), mapping.clone());
                }
                MappingEdit::Remove { account_number } => {
                    next.mappings.remove(&normalize_account_number(account_number));
                }
                MappingEdit::Clear => next.mappings.clear(),
            }
        }
        next
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = schemars::schema_for!(SessionOverrides);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

/// One action submitted from the manual-mapping editor. Applied in order by
/// [`SessionOverrides::apply_edits`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MappingEdit {
    /// Assign a taxonomy position to an account, replacing any previous
    /// override for it.
    Set {
        account_number: String,
        mapping: AccountMapping,
    },

    /// Drop the override for an account, falling back to the static table.
    Remove { account_number: String },

    /// Reset the session to an empty override set.
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn software_mapping() -> AccountMapping {
        AccountMapping::new("Software", "Operating Expenses (OPEX)", "R&D Expenses")
    }

    #[test]
    fn test_keys_are_normalized_on_insert() {
        let overrides = SessionOverrides::new().with_mapping("61352003", software_mapping());
        assert!(overrides.get("613520030").is_some());
        assert!(overrides.get("61352003").is_none());
    }

    #[test]
    fn test_copy_on_write() {
        let base = SessionOverrides::new();
        let edited = base.with_mapping("61352003", software_mapping());

        assert!(base.is_empty());
        assert_eq!(edited.len(), 1);

        let removed = edited.without_mapping("613520030");
        assert_eq!(edited.len(), 1);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_apply_edits_in_order() {
        let edits = vec![
            MappingEdit::Set {
                account_number: "61352003".to_string(),
                mapping: software_mapping(),
            },
            MappingEdit::Set {
                account_number: "701".to_string(),
                mapping: AccountMapping::new("Sales", "Revenue", "Product Revenue"),
            },
            MappingEdit::Remove {
                account_number: "613520030".to_string(),
            },
        ];

        let overrides = SessionOverrides::new().apply_edits(&edits);
        assert_eq!(overrides.len(), 1);
        assert!(overrides.get("701000000").is_some());
    }

    #[test]
    fn test_clear_edit_resets() {
        let base = SessionOverrides::new().with_mapping("701", software_mapping());
        let cleared = base.apply_edits(&[MappingEdit::Clear]);
        assert!(cleared.is_empty());
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_json_round_trip() {
        let overrides = SessionOverrides::new().with_mapping("61352003", software_mapping());
        let json = overrides.to_json().unwrap();
        let restored = SessionOverrides::from_json(&json).unwrap();
        assert_eq!(overrides, restored);
    }

    #[test]
    fn test_schema_generation() {
        let schema = SessionOverrides::schema_as_json().unwrap();
        assert!(schema.contains("mappings"));
    }
}
