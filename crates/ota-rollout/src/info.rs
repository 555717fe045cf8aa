//! Rollout information extracted from a classified mapping

use crate::grammar::{
    constrained_rollout_parts, fallback_entry, is_rollout, unconstrained_rollout_parts,
};
use crate::percent::Percent;
use ota_branch_mapping::{
    assert_number, BranchMapping, BranchMappingPredicate, BranchMappingResult,
    BranchMappingValidationError,
};
use serde::Serialize;

/// Branch ids referenced by a single rollout record
pub trait RolloutRecord {
    /// Branch receiving the rolled-out share of clients
    fn rolled_out_branch_id(&self) -> &str;

    /// Branch receiving every other client
    fn default_branch_id(&self) -> &str;

    /// Share of clients on the rolled-out branch
    fn percent_rolled_out(&self) -> Percent;
}

/// Rollout applying to every runtime version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnconstrainedRolloutInfo {
    /// Branch of the rollout predicate entry
    pub rolled_out_branch_id: String,
    /// Share of clients on the rolled-out branch
    pub percent_rolled_out: Percent,
    /// Branch of the always-true fallback entry
    pub default_branch_id: String,
}

/// Rollout scoped to one runtime version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstrainedRolloutInfo {
    /// Branch of the constrained entry
    pub rolled_out_branch_id: String,
    /// Share of clients on `runtime_version` routed to the rolled-out branch
    pub percent_rolled_out: Percent,
    /// Runtime version the entry is scoped to
    pub runtime_version: String,
    /// Branch of the always-true fallback entry
    pub default_branch_id: String,
}

impl RolloutRecord for UnconstrainedRolloutInfo {
    fn rolled_out_branch_id(&self) -> &str {
        &self.rolled_out_branch_id
    }

    fn default_branch_id(&self) -> &str {
        &self.default_branch_id
    }

    fn percent_rolled_out(&self) -> Percent {
        self.percent_rolled_out
    }
}

impl RolloutRecord for ConstrainedRolloutInfo {
    fn rolled_out_branch_id(&self) -> &str {
        &self.rolled_out_branch_id
    }

    fn default_branch_id(&self) -> &str {
        &self.default_branch_id
    }

    fn percent_rolled_out(&self) -> Percent {
        self.percent_rolled_out
    }
}

/// Rollout information of either dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RolloutInfo {
    /// Single rollout targeting every client
    Unconstrained(UnconstrainedRolloutInfo),
    /// One rollout per targeted runtime version, in mapping order
    Constrained(Vec<ConstrainedRolloutInfo>),
}

impl RolloutInfo {
    /// Check for the runtime-version-constrained dialect
    #[inline]
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        matches!(self, Self::Constrained(_))
    }

    /// Runtime versions targeted; empty for an unconstrained rollout
    #[must_use]
    pub fn runtime_versions(&self) -> Vec<&str> {
        match self {
            Self::Unconstrained(_) => Vec::new(),
            Self::Constrained(infos) => infos.iter().map(|i| i.runtime_version.as_str()).collect(),
        }
    }

    /// Constrained record for one runtime version
    #[must_use]
    pub fn for_runtime_version(&self, runtime_version: &str) -> Option<&ConstrainedRolloutInfo> {
        match self {
            Self::Unconstrained(_) => None,
            Self::Constrained(infos) => infos.iter().find(|i| i.runtime_version == runtime_version),
        }
    }
}

fn percent_of(predicate: &BranchMappingPredicate) -> BranchMappingResult<Percent> {
    Percent::from_operand(assert_number(&predicate.operand)?)
}

/// Extract rollout information from a mapping
///
/// For the constrained dialect, entries that are not constrained rollout
/// nodes (the fallback included) are skipped.
///
/// # Errors
/// Returns [`BranchMappingValidationError::NotARollout`] if the mapping is
/// neither dialect.
pub fn get_rollout_info_from_branch_mapping(
    mapping: &BranchMapping,
) -> BranchMappingResult<RolloutInfo> {
    if let Some((rollout, predicate, default)) = unconstrained_rollout_parts(mapping) {
        return Ok(RolloutInfo::Unconstrained(UnconstrainedRolloutInfo {
            rolled_out_branch_id: rollout.branch_id.clone(),
            percent_rolled_out: percent_of(predicate)?,
            default_branch_id: default.branch_id.clone(),
        }));
    }

    let default = match fallback_entry(mapping) {
        Some(entry) if is_rollout(mapping) => entry,
        _ => return Err(BranchMappingValidationError::not_a_rollout(mapping)),
    };

    let infos = mapping
        .data
        .iter()
        .filter_map(|entry| {
            constrained_rollout_parts(&entry.branch_mapping_logic)
                .map(|(runtime_version, predicate)| (entry, runtime_version, predicate))
        })
        .map(|(entry, runtime_version, predicate)| {
            Ok(ConstrainedRolloutInfo {
                rolled_out_branch_id: entry.branch_id.clone(),
                percent_rolled_out: percent_of(predicate)?,
                runtime_version: runtime_version.to_string(),
                default_branch_id: default.branch_id.clone(),
            })
        })
        .collect::<BranchMappingResult<Vec<_>>>()?;

    Ok(RolloutInfo::Constrained(infos))
}

/// Check whether clients on `runtime_version` are affected by the rollout
///
/// An unconstrained rollout targets every runtime version; a mapping that is
/// not a rollout targets none.
#[must_use]
pub fn does_target_rollout(mapping: &BranchMapping, runtime_version: &str) -> bool {
    match get_rollout_info_from_branch_mapping(mapping) {
        Ok(RolloutInfo::Unconstrained(_)) => true,
        Ok(info) => info.for_runtime_version(runtime_version).is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ota_branch_mapping::{get_always_true_branch_mapping, BranchMapping};
    use pretty_assertions::assert_eq;

    const UNCONSTRAINED: &str = r#"{"version":0,"data":[
        {"branchId":"B2","branchMappingLogic":{"operand":0.15,"clientKey":"rolloutToken","branchMappingOperator":"hash_lt"}},
        {"branchId":"B1","branchMappingLogic":"true"}]}"#;

    const CONSTRAINED: &str = r#"{"version":0,"data":[
        {"branchId":"B3","branchMappingLogic":["and",
            {"operand":0.5,"clientKey":"rolloutToken","branchMappingOperator":"hash_lt"},
            {"operand":"2.0.0","clientKey":"runtimeVersion","branchMappingOperator":"=="}]},
        {"branchId":"B2","branchMappingLogic":["and",
            {"operand":"1.0.0","clientKey":"runtimeVersion","branchMappingOperator":"=="},
            {"operand":0.1,"clientKey":"rolloutToken","branchMappingOperator":"hash_lt"}]},
        {"branchId":"B1","branchMappingLogic":"true"}]}"#;

    #[test]
    fn extracts_unconstrained_info() {
        let mapping = BranchMapping::parse(UNCONSTRAINED).unwrap();
        assert_eq!(
            get_rollout_info_from_branch_mapping(&mapping).unwrap(),
            RolloutInfo::Unconstrained(UnconstrainedRolloutInfo {
                rolled_out_branch_id: "B2".into(),
                percent_rolled_out: Percent::new(15).unwrap(),
                default_branch_id: "B1".into(),
            })
        );
    }

    #[test]
    fn extracts_every_constrained_entry() {
        let mapping = BranchMapping::parse(CONSTRAINED).unwrap();
        let info = get_rollout_info_from_branch_mapping(&mapping).unwrap();
        assert!(info.is_constrained());
        assert_eq!(info.runtime_versions(), vec!["2.0.0", "1.0.0"]);

        let v1 = info.for_runtime_version("1.0.0").unwrap();
        assert_eq!(v1.rolled_out_branch_id, "B2");
        assert_eq!(v1.percent_rolled_out.get(), 10);
        assert_eq!(v1.default_branch_id, "B1");

        let v2 = info.for_runtime_version("2.0.0").unwrap();
        assert_eq!(v2.rolled_out_branch_id, "B3");
        assert_eq!(v2.percent_rolled_out.get(), 50);
    }

    #[test]
    fn non_rollout_is_an_error() {
        let err = get_rollout_info_from_branch_mapping(&get_always_true_branch_mapping("B1"))
            .unwrap_err();
        assert!(matches!(err, BranchMappingValidationError::NotARollout { .. }));
    }

    #[test]
    fn targeting_follows_dialect() {
        let unconstrained = BranchMapping::parse(UNCONSTRAINED).unwrap();
        assert!(does_target_rollout(&unconstrained, "anything"));

        let constrained = BranchMapping::parse(CONSTRAINED).unwrap();
        assert!(does_target_rollout(&constrained, "1.0.0"));
        assert!(!does_target_rollout(&constrained, "3.0.0"));

        assert!(!does_target_rollout(&get_always_true_branch_mapping("B1"), "1.0.0"));
    }

    #[test]
    fn serializes_camel_case_with_integer_percent() {
        let mapping = BranchMapping::parse(UNCONSTRAINED).unwrap();
        let info = get_rollout_info_from_branch_mapping(&mapping).unwrap();
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({
                "rolledOutBranchId": "B2",
                "percentRolledOut": 15,
                "defaultBranchId": "B1"
            })
        );
    }
}
