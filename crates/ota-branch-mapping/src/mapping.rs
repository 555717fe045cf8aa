//! Branch mappings: ordered lists of branch entries
//!
//! Entries are evaluated first-match-wins by producers and consumers of the
//! tree; the last entry of every rollout shape is the fallback.

use crate::error::{to_diagnostic_json, BranchMappingResult, BranchMappingValidationError};
use crate::node::{always_true, is_always_true, BranchMappingNode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The only branch-mapping version currently defined
pub const BRANCH_MAPPING_VERSION: u32 = 0;

/// One branch and the logic selecting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMappingEntry {
    /// Branch selected when the logic matches
    pub branch_id: String,
    /// Expression evaluated against the client
    pub branch_mapping_logic: BranchMappingNode,
}

impl BranchMappingEntry {
    /// Create entry
    #[inline]
    #[must_use]
    pub fn new(branch_id: impl Into<String>, logic: BranchMappingNode) -> Self {
        Self {
            branch_id: branch_id.into(),
            branch_mapping_logic: logic,
        }
    }
}

/// Versioned, ordered routing table of a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMapping {
    /// Schema version, see [`BRANCH_MAPPING_VERSION`]
    pub version: u32,
    /// Entries in evaluation order
    pub data: Vec<BranchMappingEntry>,
}

impl BranchMapping {
    /// Create mapping at the current version
    #[inline]
    #[must_use]
    pub fn new(data: Vec<BranchMappingEntry>) -> Self {
        Self {
            version: BRANCH_MAPPING_VERSION,
            data,
        }
    }

    /// Deserialize from the JSON wire form
    ///
    /// Only checks that the string is a well-formed mapping; the version is
    /// checked separately with [`assert_version`].
    ///
    /// # Errors
    /// Returns [`BranchMappingValidationError::Parse`] on malformed input.
    pub fn parse(raw: &str) -> BranchMappingResult<Self> {
        let mapping: Self =
            serde_json::from_str(raw).map_err(|e| BranchMappingValidationError::Parse {
                message: format!("{e} in {raw}"),
            })?;
        tracing::trace!(entries = mapping.data.len(), "parsed branch mapping");
        Ok(mapping)
    }

    /// Serialize to the JSON wire form
    ///
    /// # Errors
    /// Returns [`BranchMappingValidationError::Serialize`] if an operand is not a
    /// finite number.
    pub fn to_json(&self) -> BranchMappingResult<String> {
        serde_json::to_string(self).map_err(|e| BranchMappingValidationError::Serialize {
            message: e.to_string(),
        })
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check for an empty mapping
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Last entry, the fallback of every rollout shape
    #[inline]
    #[must_use]
    pub fn last_entry(&self) -> Option<&BranchMappingEntry> {
        self.data.last()
    }
}

impl FromStr for BranchMapping {
    type Err = BranchMappingValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Deserialize a mapping from its JSON wire form
///
/// # Errors
/// Returns [`BranchMappingValidationError::Parse`] on malformed input.
#[inline]
pub fn parse_branch_mapping(raw: &str) -> BranchMappingResult<BranchMapping> {
    BranchMapping::parse(raw)
}

/// Require the mapping to be at the expected version
///
/// # Errors
/// Returns [`BranchMappingValidationError::VersionMismatch`] on any other version.
pub fn assert_version(mapping: &BranchMapping, expected: u32) -> BranchMappingResult<()> {
    if mapping.version == expected {
        Ok(())
    } else {
        Err(BranchMappingValidationError::VersionMismatch {
            expected,
            actual: mapping.version,
        })
    }
}

/// Every branch id referenced, in entry order, duplicates included
#[must_use]
pub fn get_branch_ids(mapping: &BranchMapping) -> Vec<&str> {
    mapping.data.iter().map(|e| e.branch_id.as_str()).collect()
}

/// Canonical single-branch mapping routing every client to `branch_id`
#[must_use]
pub fn get_always_true_branch_mapping(branch_id: impl Into<String>) -> BranchMapping {
    BranchMapping::new(vec![BranchMappingEntry::new(branch_id, always_true())])
}

/// Mapping with no entries
#[inline]
#[must_use]
pub fn get_empty_branch_mapping() -> BranchMapping {
    BranchMapping::new(Vec::new())
}

/// Check for a mapping with no entries
#[inline]
#[must_use]
pub fn has_empty_branch_map(mapping: &BranchMapping) -> bool {
    mapping.is_empty()
}

/// Check for exactly one always-true entry
#[must_use]
pub fn has_standard_branch_map(mapping: &BranchMapping) -> bool {
    matches!(mapping.data.as_slice(), [entry] if is_always_true(&entry.branch_mapping_logic))
}

/// Branch id of a standard (single always-true) mapping
///
/// # Errors
/// Returns [`BranchMappingValidationError::UnexpectedShape`] for any other shape.
pub fn get_standard_branch_id(mapping: &BranchMapping) -> BranchMappingResult<&str> {
    match mapping.data.as_slice() {
        [entry] if is_always_true(&entry.branch_mapping_logic) => Ok(&entry.branch_id),
        _ => Err(BranchMappingValidationError::UnexpectedShape {
            expected: "a single always-true entry",
            value: to_diagnostic_json(mapping),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        and_statement, hash_lt_operator, BranchMappingOperator, BranchMappingPredicate,
        ROLLOUT_TOKEN_KEY,
    };
    use pretty_assertions::assert_eq;

    const RTV_ROLLOUT: &str = r#"{"version":0,"data":[
      {"branchId":"B2","branchMappingLogic":["and",
         {"operand":"1.0.0","clientKey":"runtimeVersion","branchMappingOperator":"=="},
         {"operand":0.1,"clientKey":"rolloutToken","branchMappingOperator":"hash_lt"}]},
      {"branchId":"B1","branchMappingLogic":"true"}
    ]}"#;

    #[test]
    fn parses_wire_example() {
        let mapping = BranchMapping::parse(RTV_ROLLOUT).unwrap();
        assert_eq!(mapping.version, 0);
        assert_eq!(mapping.len(), 2);
        assert_eq!(get_branch_ids(&mapping), vec!["B2", "B1"]);
        assert!(is_always_true(
            &mapping.last_entry().unwrap().branch_mapping_logic
        ));
    }

    #[test]
    fn round_trips_through_json() {
        let mapping = BranchMapping::parse(RTV_ROLLOUT).unwrap();
        let reparsed = BranchMapping::parse(&mapping.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, mapping);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = BranchMapping::parse("{\"version\":0,").unwrap_err();
        assert!(matches!(err, BranchMappingValidationError::Parse { .. }));

        let err = "not json".parse::<BranchMapping>().unwrap_err();
        assert!(matches!(err, BranchMappingValidationError::Parse { .. }));
    }

    #[test]
    fn version_is_checked_not_ignored() {
        let mapping = BranchMapping::parse(r#"{"version":1,"data":[]}"#).unwrap();
        assert_eq!(
            assert_version(&mapping, BRANCH_MAPPING_VERSION),
            Err(BranchMappingValidationError::VersionMismatch {
                expected: 0,
                actual: 1
            })
        );
        assert!(assert_version(&get_empty_branch_mapping(), BRANCH_MAPPING_VERSION).is_ok());
    }

    #[test]
    fn always_true_mapping_is_standard() {
        let mapping = get_always_true_branch_mapping("B1");
        assert!(has_standard_branch_map(&mapping));
        assert!(!has_empty_branch_map(&mapping));
        assert_eq!(get_standard_branch_id(&mapping).unwrap(), "B1");
        assert_eq!(
            mapping.to_json().unwrap(),
            r#"{"version":0,"data":[{"branchId":"B1","branchMappingLogic":"true"}]}"#
        );
    }

    #[test]
    fn non_standard_shapes_have_no_standard_branch() {
        let empty = get_empty_branch_mapping();
        assert!(has_empty_branch_map(&empty));
        assert!(get_standard_branch_id(&empty).is_err());

        let rollout = BranchMapping::parse(RTV_ROLLOUT).unwrap();
        assert!(!has_standard_branch_map(&rollout));
        assert!(get_standard_branch_id(&rollout).is_err());
    }

    #[test]
    fn branch_ids_keep_duplicates() {
        let predicate = BranchMappingPredicate::new(ROLLOUT_TOKEN_KEY, hash_lt_operator(), 0.5);
        let mapping = BranchMapping::new(vec![
            BranchMappingEntry::new("B1", and_statement(vec![predicate.into()])),
            BranchMappingEntry::new("B1", always_true()),
        ]);
        assert_eq!(get_branch_ids(&mapping), vec!["B1", "B1"]);
    }

    #[test]
    fn non_finite_operand_cannot_be_serialized() {
        for operand in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let predicate =
                BranchMappingPredicate::new("k", BranchMappingOperator::LessThan, operand);
            let mapping = BranchMapping::new(vec![
                BranchMappingEntry::new("B2", predicate.into()),
                BranchMappingEntry::new("B1", always_true()),
            ]);
            let err = mapping.to_json().unwrap_err();
            assert!(
                matches!(err, BranchMappingValidationError::Serialize { .. }),
                "{operand}: {err}"
            );
        }
    }
}
