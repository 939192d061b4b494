//! `WHERE`-clause predicates and the matching algorithm shared by plain
//! `SELECT`/`UPDATE`/`DELETE` and joined `SELECT`.

use crate::error::{EngineError, Result};
use crate::value::Value;

/// A comparison operator recognized in a `WHERE` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    GtEq,
    /// `<=`
    LtEq,
}

/// A single `column operator literal` conjunct.
#[derive(Debug, Clone)]
pub struct Condition {
    /// The column being compared.
    pub column: String,
    /// The operator.
    pub op: ComparisonOp,
    /// The right-hand-side literal.
    pub literal: Value,
}

/// The conjunction of every `WHERE` clause condition.
///
/// Kept as an ordered `Vec` rather than a map keyed by column name: a second
/// conjunct on the same column accumulates instead of overwriting the first,
/// so `WHERE age > 10 AND age < 20` behaves as a range (see REDESIGN FLAGS in
/// SPEC_FULL.md).
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    /// The conjuncts, all of which must hold for a row to match.
    pub conditions: Vec<Condition>,
}

impl Predicate {
    /// An empty predicate, which matches every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether this predicate has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates every conjunct against a row, using `get` to resolve a
    /// column name to its value. `get` returns `Value::Null` for a column it
    /// cannot resolve, matching the original source's `dict.get(..., None)`
    /// behavior for an unknown column.
    pub fn matches(&self, get: impl Fn(&str) -> Value) -> Result<bool> {
        for condition in &self.conditions {
            let row_value = get(&condition.column);
            if !evaluate(&row_value, condition.op, &condition.literal)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn evaluate(row_value: &Value, op: ComparisonOp, literal: &Value) -> Result<bool> {
    match op {
        ComparisonOp::Eq => Ok(values_equal(row_value, literal)),
        ComparisonOp::NotEq => Ok(!values_equal(row_value, literal)),
        ComparisonOp::Gt | ComparisonOp::Lt | ComparisonOp::GtEq | ComparisonOp::LtEq => {
            ordered_compare(row_value, op, literal)
        }
    }
}

/// `Null` never equals anything, including another `Null`, in predicate
/// context (SQL-style null semantics, deliberately not fully emulated: see
/// SPEC_FULL.md §3).
///
/// `pub(crate)` so the join executor can apply the same null-never-matches
/// rule to its equi-join condition.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return false;
    }
    a == b
}

fn ordered_compare(row_value: &Value, op: ComparisonOp, literal: &Value) -> Result<bool> {
    if row_value.is_null() {
        return Ok(false);
    }
    if !row_value.same_variant(literal) {
        return Err(EngineError::Type(format!(
            "cannot compare {row_value} to {literal}: mismatched types"
        )));
    }
    let ordering = row_value
        .partial_compare(literal)
        .ok_or_else(|| EngineError::Type(format!("cannot compare {row_value} to {literal}")))?;
    Ok(match op {
        ComparisonOp::Gt => ordering.is_gt(),
        ComparisonOp::Lt => ordering.is_lt(),
        ComparisonOp::GtEq => ordering.is_ge(),
        ComparisonOp::LtEq => ordering.is_le(),
        ComparisonOp::Eq | ComparisonOp::NotEq => unreachable!("handled above"),
    })
}
