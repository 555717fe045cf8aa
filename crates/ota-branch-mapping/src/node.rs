//! Branch-mapping expression nodes
//!
//! A node is one of three closed shapes:
//! - [`BranchMappingNode::AlwaysTrue`]: the literal `"true"`
//! - [`BranchMappingNode::Predicate`]: `{operand, clientKey, branchMappingOperator}`
//! - [`BranchMappingNode::Statement`]: `["and" | "or", ...nodes]` or `["not", node]`
//!
//! The wire tokens (`"true"`, `hash_lt`, `==`, field names) are shared with the
//! client-side evaluator and must not change.

use crate::error::{BranchMappingResult, BranchMappingValidationError};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// Wire literal for the always-true node
pub const ALWAYS_TRUE_LITERAL: &str = "true";

/// Client key carrying the client's stable rollout bucket value
pub const ROLLOUT_TOKEN_KEY: &str = "rolloutToken";

/// Client key carrying the client's runtime version
pub const RUNTIME_VERSION_KEY: &str = "runtimeVersion";

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchMappingOperator {
    /// Value equals the operand
    #[serde(rename = "==")]
    Equals,
    /// Value differs from the operand
    #[serde(rename = "!=")]
    NotEquals,
    /// Value is less than the operand
    #[serde(rename = "<")]
    LessThan,
    /// Value is greater than the operand
    #[serde(rename = ">")]
    GreaterThan,
    /// Value is at most the operand
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// Value is at least the operand
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    /// Value is one of the operand's strings
    #[serde(rename = "in")]
    In,
    /// Value matches the operand pattern
    #[serde(rename = "regex")]
    Regex,
    /// Hash of the value, as a fraction, is below the operand
    #[serde(rename = "hash_lt")]
    HashLt,
    /// Hash fraction is at most the operand
    #[serde(rename = "hash_lte")]
    HashLte,
    /// Hash fraction is above the operand
    #[serde(rename = "hash_gt")]
    HashGt,
    /// Hash fraction is at least the operand
    #[serde(rename = "hash_gte")]
    HashGte,
}

impl BranchMappingOperator {
    /// Wire token for this operator
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
            Self::In => "in",
            Self::Regex => "regex",
            Self::HashLt => "hash_lt",
            Self::HashLte => "hash_lte",
            Self::HashGt => "hash_gt",
            Self::HashGte => "hash_gte",
        }
    }
}

impl Display for BranchMappingOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Largest magnitude below which every integer is exactly representable
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BranchMappingOperand {
    /// Numeric operand; hash operators take a fraction in `[0, 1]`
    Number(f64),
    /// String operand
    String(String),
    /// String list, for `in`
    StringList(Vec<String>),
}

impl Serialize for BranchMappingOperand {
    /// Integral numbers are written without a fractional part, the form the
    /// client-side evaluator emits. Non-finite numbers have no JSON form and
    /// are rejected.
    #[allow(clippy::cast_possible_truncation)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Number(n) if !n.is_finite() => Err(serde::ser::Error::custom(format!(
                "operand {n} is not a finite number"
            ))),
            Self::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(value) => serializer.serialize_str(value),
            Self::StringList(values) => values.serialize(serializer),
        }
    }
}

impl From<f64> for BranchMappingOperand {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for BranchMappingOperand {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for BranchMappingOperand {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for BranchMappingOperand {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

/// Single comparison of a client-supplied value against an operand
///
/// Field order matches the order the wire format is written in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMappingPredicate {
    /// Value compared against
    pub operand: BranchMappingOperand,
    /// Name of the client-supplied value
    pub client_key: String,
    /// Comparison operator
    pub branch_mapping_operator: BranchMappingOperator,
}

impl BranchMappingPredicate {
    /// Create predicate
    #[inline]
    #[must_use]
    pub fn new(
        client_key: impl Into<String>,
        operator: BranchMappingOperator,
        operand: impl Into<BranchMappingOperand>,
    ) -> Self {
        Self {
            operand: operand.into(),
            client_key: client_key.into(),
            branch_mapping_operator: operator,
        }
    }

    /// Check client key and operator in one go
    #[inline]
    #[must_use]
    pub fn matches(&self, client_key: &str, operator: BranchMappingOperator) -> bool {
        self.client_key == client_key && self.branch_mapping_operator == operator
    }
}

/// Boolean combination of nodes
#[derive(Debug, Clone, PartialEq)]
pub enum BranchMappingStatement {
    /// True when every node is true
    And(Vec<BranchMappingNode>),
    /// True when any node is true
    Or(Vec<BranchMappingNode>),
    /// Negation of a single node
    Not(Box<BranchMappingNode>),
}

impl BranchMappingStatement {
    /// Wire keyword heading the statement array
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::And(_) => "and",
            Self::Or(_) => "or",
            Self::Not(_) => "not",
        }
    }

    fn from_parts(keyword: &str, mut nodes: Vec<BranchMappingNode>) -> Result<Self, String> {
        match keyword {
            "and" => Ok(Self::And(nodes)),
            "or" => Ok(Self::Or(nodes)),
            "not" => match nodes.len() {
                1 => Ok(Self::Not(Box::new(nodes.remove(0)))),
                n => Err(format!("'not' statement takes exactly 1 node, got {n}")),
            },
            other => Err(format!("unknown statement keyword '{other}'")),
        }
    }
}

impl Serialize for BranchMappingStatement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nodes = get_nodes_from_statement(self);
        let mut seq = serializer.serialize_seq(Some(nodes.len() + 1))?;
        seq.serialize_element(self.keyword())?;
        for node in nodes {
            seq.serialize_element(node)?;
        }
        seq.end()
    }
}

/// Node of the branch-mapping expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum BranchMappingNode {
    /// Literal `"true"`
    AlwaysTrue,
    /// Single comparison
    Predicate(BranchMappingPredicate),
    /// Boolean combination
    Statement(BranchMappingStatement),
}

impl From<BranchMappingPredicate> for BranchMappingNode {
    fn from(predicate: BranchMappingPredicate) -> Self {
        Self::Predicate(predicate)
    }
}

impl From<BranchMappingStatement> for BranchMappingNode {
    fn from(statement: BranchMappingStatement) -> Self {
        Self::Statement(statement)
    }
}

impl Serialize for BranchMappingNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::AlwaysTrue => serializer.serialize_str(ALWAYS_TRUE_LITERAL),
            Self::Predicate(predicate) => predicate.serialize(serializer),
            Self::Statement(statement) => statement.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BranchMappingNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NodeVisitor;

        impl<'de> Visitor<'de> for NodeVisitor {
            type Value = BranchMappingNode;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("\"true\", a predicate object, or a statement array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value == ALWAYS_TRUE_LITERAL {
                    Ok(BranchMappingNode::AlwaysTrue)
                } else {
                    Err(de::Error::invalid_value(de::Unexpected::Str(value), &self))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let keyword: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let mut nodes = Vec::new();
                while let Some(node) = seq.next_element::<BranchMappingNode>()? {
                    nodes.push(node);
                }
                BranchMappingStatement::from_parts(&keyword, nodes)
                    .map(BranchMappingNode::Statement)
                    .map_err(de::Error::custom)
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                BranchMappingPredicate::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(BranchMappingNode::Predicate)
            }
        }

        deserializer.deserialize_any(NodeVisitor)
    }
}

// Structural predicates. Each node satisfies exactly one of
// is_always_true / is_predicate_object / is_statement.

/// Check for the always-true literal
#[inline]
#[must_use]
pub fn is_always_true(node: &BranchMappingNode) -> bool {
    matches!(node, BranchMappingNode::AlwaysTrue)
}

/// Check for any statement
#[inline]
#[must_use]
pub fn is_statement(node: &BranchMappingNode) -> bool {
    matches!(node, BranchMappingNode::Statement(_))
}

/// Check for a predicate object
#[inline]
#[must_use]
pub fn is_predicate_object(node: &BranchMappingNode) -> bool {
    matches!(node, BranchMappingNode::Predicate(_))
}

/// Check for an `and` statement
#[inline]
#[must_use]
pub fn is_and_statement(node: &BranchMappingNode) -> bool {
    matches!(node, BranchMappingNode::Statement(BranchMappingStatement::And(_)))
}

/// Check for an `or` statement
#[inline]
#[must_use]
pub fn is_or_statement(node: &BranchMappingNode) -> bool {
    matches!(node, BranchMappingNode::Statement(BranchMappingStatement::Or(_)))
}

/// Check for a `not` statement
#[inline]
#[must_use]
pub fn is_not_statement(node: &BranchMappingNode) -> bool {
    matches!(node, BranchMappingNode::Statement(BranchMappingStatement::Not(_)))
}

/// Operand nodes of a statement, in order
#[must_use]
pub fn get_nodes_from_statement(statement: &BranchMappingStatement) -> &[BranchMappingNode] {
    match statement {
        BranchMappingStatement::And(nodes) | BranchMappingStatement::Or(nodes) => nodes,
        BranchMappingStatement::Not(node) => std::slice::from_ref(node.as_ref()),
    }
}

/// Narrow a node to a statement
///
/// # Errors
/// Returns [`BranchMappingValidationError::UnexpectedShape`] for any other node.
pub fn assert_statement(node: &BranchMappingNode) -> BranchMappingResult<&BranchMappingStatement> {
    match node {
        BranchMappingNode::Statement(statement) => Ok(statement),
        other => Err(BranchMappingValidationError::unexpected_shape(
            "a statement",
            other,
        )),
    }
}

/// Narrow a node to the operands of an `and` statement
///
/// # Errors
/// Returns [`BranchMappingValidationError::UnexpectedShape`] for any other node.
pub fn assert_and_statement(node: &BranchMappingNode) -> BranchMappingResult<&[BranchMappingNode]> {
    match node {
        BranchMappingNode::Statement(BranchMappingStatement::And(nodes)) => Ok(nodes),
        other => Err(BranchMappingValidationError::unexpected_shape(
            "an 'and' statement",
            other,
        )),
    }
}

/// Narrow a node to a predicate object
///
/// # Errors
/// Returns [`BranchMappingValidationError::UnexpectedShape`] for any other node.
pub fn assert_predicate_object(
    node: &BranchMappingNode,
) -> BranchMappingResult<&BranchMappingPredicate> {
    match node {
        BranchMappingNode::Predicate(predicate) => Ok(predicate),
        other => Err(BranchMappingValidationError::unexpected_shape(
            "a predicate object",
            other,
        )),
    }
}

/// Narrow an operand to a number
///
/// # Errors
/// Returns [`BranchMappingValidationError::UnexpectedShape`] for non-numeric operands.
pub fn assert_number(operand: &BranchMappingOperand) -> BranchMappingResult<f64> {
    match operand {
        BranchMappingOperand::Number(n) => Ok(*n),
        other => Err(BranchMappingValidationError::unexpected_shape(
            "a number",
            other,
        )),
    }
}

/// Narrow an operand to a string
///
/// # Errors
/// Returns [`BranchMappingValidationError::UnexpectedShape`] for non-string operands.
pub fn assert_string(operand: &BranchMappingOperand) -> BranchMappingResult<&str> {
    match operand {
        BranchMappingOperand::String(s) => Ok(s),
        other => Err(BranchMappingValidationError::unexpected_shape(
            "a string",
            other,
        )),
    }
}

/// The always-true node
#[inline]
#[must_use]
pub fn always_true() -> BranchMappingNode {
    BranchMappingNode::AlwaysTrue
}

/// An `and` statement over the given nodes
#[inline]
#[must_use]
pub fn and_statement(nodes: Vec<BranchMappingNode>) -> BranchMappingNode {
    BranchMappingNode::Statement(BranchMappingStatement::And(nodes))
}

/// The `==` operator
#[inline]
#[must_use]
pub const fn equals_operator() -> BranchMappingOperator {
    BranchMappingOperator::Equals
}

/// The `hash_lt` operator
#[inline]
#[must_use]
pub const fn hash_lt_operator() -> BranchMappingOperator {
    BranchMappingOperator::HashLt
}
