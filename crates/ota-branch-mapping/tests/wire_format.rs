//! Wire-format guarantees of the branch-mapping codec.
//!
//! The serialized mapping is the only thing the persistence layer stores, and
//! the client-side evaluator reads it verbatim. Any tree this crate produces
//! must come back from its own parser structurally identical.

use ota_branch_mapping::prelude::*;
use ota_branch_mapping::{parse_branch_mapping, ROLLOUT_TOKEN_KEY, RUNTIME_VERSION_KEY};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn operator() -> impl Strategy<Value = BranchMappingOperator> {
    prop_oneof![
        Just(BranchMappingOperator::Equals),
        Just(BranchMappingOperator::NotEquals),
        Just(BranchMappingOperator::LessThan),
        Just(BranchMappingOperator::GreaterThan),
        Just(BranchMappingOperator::LessThanOrEqual),
        Just(BranchMappingOperator::GreaterThanOrEqual),
        Just(BranchMappingOperator::In),
        Just(BranchMappingOperator::Regex),
        Just(BranchMappingOperator::HashLt),
        Just(BranchMappingOperator::HashLte),
        Just(BranchMappingOperator::HashGt),
        Just(BranchMappingOperator::HashGte),
    ]
}

fn operand() -> impl Strategy<Value = BranchMappingOperand> {
    prop_oneof![
        (0u32..=100).prop_map(|p| BranchMappingOperand::Number(f64::from(p) / 100.0)),
        (-1.0e6f64..1.0e6).prop_map(BranchMappingOperand::Number),
        "[a-z0-9.]{0,8}".prop_map(BranchMappingOperand::String),
        proptest::collection::vec("[a-z]{1,6}", 0..4).prop_map(BranchMappingOperand::StringList),
    ]
}

fn predicate() -> impl Strategy<Value = BranchMappingNode> {
    (
        prop_oneof![
            Just(ROLLOUT_TOKEN_KEY.to_string()),
            Just(RUNTIME_VERSION_KEY.to_string()),
            "[a-zA-Z]{1,12}",
        ],
        operator(),
        operand(),
    )
        .prop_map(|(key, op, operand)| BranchMappingPredicate::new(key, op, operand).into())
}

fn node() -> impl Strategy<Value = BranchMappingNode> {
    let leaf = prop_oneof![Just(BranchMappingNode::AlwaysTrue), predicate()];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4)
                .prop_map(|nodes| BranchMappingStatement::And(nodes).into()),
            proptest::collection::vec(inner.clone(), 0..4)
                .prop_map(|nodes| BranchMappingStatement::Or(nodes).into()),
            inner.prop_map(|node| BranchMappingStatement::Not(Box::new(node)).into()),
        ]
    })
}

fn mapping() -> impl Strategy<Value = BranchMapping> {
    proptest::collection::vec(("[A-Za-z0-9-]{1,36}", node()), 0..5).prop_map(|entries| {
        BranchMapping::new(
            entries
                .into_iter()
                .map(|(id, logic)| BranchMappingEntry::new(id, logic))
                .collect(),
        )
    })
}

proptest! {
    #[test]
    fn prop_serialize_then_parse_is_identity(m in mapping()) {
        let raw = m.to_json().unwrap();
        let parsed = parse_branch_mapping(&raw).unwrap();
        prop_assert_eq!(parsed, m);
    }
}

/// Hand-authored mappings keep their meaning even when whitespace and key
/// order differ from what this crate writes.
#[test]
fn hand_authored_mapping_normalizes_to_canonical_form() {
    let raw = r#"
    {
      "data": [
        {
          "branchMappingLogic": {
            "branchMappingOperator": "hash_lt",
            "clientKey": "rolloutToken",
            "operand": 0.15
          },
          "branchId": "B2"
        },
        { "branchId": "B1", "branchMappingLogic": "true" }
      ],
      "version": 0
    }"#;

    let mapping = parse_branch_mapping(raw).unwrap();
    assert_eq!(
        mapping.to_json().unwrap(),
        r#"{"version":0,"data":[{"branchId":"B2","branchMappingLogic":{"operand":0.15,"clientKey":"rolloutToken","branchMappingOperator":"hash_lt"}},{"branchId":"B1","branchMappingLogic":"true"}]}"#
    );
}

#[test]
fn missing_fields_fail_to_parse() {
    assert!(parse_branch_mapping(r#"{"version":0}"#).is_err());
    assert!(parse_branch_mapping(r#"{"version":0,"data":[{"branchId":"B1"}]}"#).is_err());
    assert!(parse_branch_mapping(
        r#"{"version":0,"data":[{"branchId":"B1","branchMappingLogic":{"operand":1,"clientKey":"k"}}]}"#
    )
    .is_err());
}
