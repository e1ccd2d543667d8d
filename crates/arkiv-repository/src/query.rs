//! JSON query language for `select` operations.
//!
//! A query is a JSON object with an optional `$query` condition and an
//! optional `$filter` section:
//!
//! ```json
//! {
//!   "$query": { "$and": [
//!     { "$eq": { "evType": "LOGBOOK_LC_SECURISATION" } },
//!     { "$lte": { "events.evDetData.StartDate": "2024-03-01T10:00:00.000" } }
//!   ] },
//!   "$filter": { "$limit": 1, "$orderby": { "events.evDateTime": -1 } }
//! }
//! ```
//!
//! Paths are dotted and traverse arrays: `events.outDetail` matches when any
//! event carries the value. Strings compare lexicographically, which orders
//! persisted timestamps chronologically.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    All,
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Vec<Condition>),
    Eq(String, Value),
    Ne(String, Value),
    In(String, Vec<Value>),
    Nin(String, Vec<Value>),
    Cmp(String, CmpOp, Value),
    Exists(String),
}

/// Sort direction for `$orderby`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    condition: Condition,
    offset: usize,
    limit: Option<usize>,
    order_by: Vec<(String, SortDirection)>,
}

fn invalid(message: impl Into<String>) -> RepositoryError {
    RepositoryError::InvalidQuery(message.into())
}

fn single_entry<'a>(op: &str, value: &'a Value) -> RepositoryResult<(&'a String, &'a Value)> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid(format!("{op} expects an object")))?;
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(invalid(format!("{op} expects exactly one field"))),
    }
}

fn parse_conditions(op: &str, value: &Value) -> RepositoryResult<Vec<Condition>> {
    value
        .as_array()
        .ok_or_else(|| invalid(format!("{op} expects an array")))?
        .iter()
        .map(parse_condition)
        .collect()
}

fn parse_condition(value: &Value) -> RepositoryResult<Condition> {
    if let Value::Array(_) = value {
        return parse_conditions("implicit $and", value).map(Condition::And);
    }
    let map = value
        .as_object()
        .ok_or_else(|| invalid("condition must be an object"))?;
    let mut entries = map.iter();
    let (op, arg) = match (entries.next(), entries.next()) {
        (None, _) => return Ok(Condition::All),
        (Some(entry), None) => entry,
        _ => return Err(invalid("condition must hold a single operator")),
    };

    let condition = match op.as_str() {
        "$and" => Condition::And(parse_conditions(op, arg)?),
        "$or" => Condition::Or(parse_conditions(op, arg)?),
        "$not" => Condition::Not(parse_conditions(op, arg)?),
        "$eq" => {
            let (path, v) = single_entry(op, arg)?;
            Condition::Eq(path.clone(), v.clone())
        },
        "$ne" => {
            let (path, v) = single_entry(op, arg)?;
            Condition::Ne(path.clone(), v.clone())
        },
        "$in" | "$nin" => {
            let (path, v) = single_entry(op, arg)?;
            let values = v
                .as_array()
                .ok_or_else(|| invalid(format!("{op} expects an array of values")))?
                .clone();
            if op == "$in" {
                Condition::In(path.clone(), values)
            } else {
                Condition::Nin(path.clone(), values)
            }
        },
        "$lt" | "$lte" | "$gt" | "$gte" => {
            let (path, v) = single_entry(op, arg)?;
            let cmp = match op.as_str() {
                "$lt" => CmpOp::Lt,
                "$lte" => CmpOp::Lte,
                "$gt" => CmpOp::Gt,
                _ => CmpOp::Gte,
            };
            Condition::Cmp(path.clone(), cmp, v.clone())
        },
        "$exists" => Condition::Exists(
            arg.as_str()
                .ok_or_else(|| invalid("$exists expects a field path"))?
                .to_string(),
        ),
        other => return Err(invalid(format!("unknown operator {other}"))),
    };
    Ok(condition)
}

fn parse_usize(op: &str, value: &Value) -> RepositoryResult<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(format!("{op} expects a non-negative integer")))
}

/// Collect every value reachable through a dotted path, expanding arrays.
fn resolve<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => next.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_object().and_then(|m| m.get(segment))),
                ),
                _ => {},
            }
        }
        current = next;
    }
    let mut out = Vec::with_capacity(current.len());
    for value in current {
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
        out.push(value);
    }
    out
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

impl Condition {
    fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::All => true,
            Self::And(conds) => conds.iter().all(|c| c.matches(doc)),
            Self::Or(conds) => conds.iter().any(|c| c.matches(doc)),
            Self::Not(conds) => !conds.iter().all(|c| c.matches(doc)),
            Self::Eq(path, expected) => resolve(doc, path)
                .into_iter()
                .any(|v| values_equal(v, expected)),
            Self::Ne(path, expected) => !resolve(doc, path)
                .into_iter()
                .any(|v| values_equal(v, expected)),
            Self::In(path, candidates) => resolve(doc, path)
                .into_iter()
                .any(|v| candidates.iter().any(|c| values_equal(v, c))),
            Self::Nin(path, candidates) => !resolve(doc, path)
                .into_iter()
                .any(|v| candidates.iter().any(|c| values_equal(v, c))),
            Self::Cmp(path, op, bound) => resolve(doc, path).into_iter().any(|v| {
                compare_values(v, bound).is_some_and(|ord| match op {
                    CmpOp::Lt => ord == Ordering::Less,
                    CmpOp::Lte => ord != Ordering::Greater,
                    CmpOp::Gt => ord == Ordering::Greater,
                    CmpOp::Gte => ord != Ordering::Less,
                })
            }),
            Self::Exists(path) => !resolve(doc, path).is_empty(),
        }
    }
}

impl Query {
    /// A query matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self {
            condition: Condition::All,
            offset: 0,
            limit: None,
            order_by: Vec::new(),
        }
    }

    /// Parse a JSON query.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidQuery`] if the document is not a
    /// well-formed query.
    pub fn parse(value: &Value) -> RepositoryResult<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| invalid("query root must be an object"))?;
        let mut query = Self::all();
        for (key, arg) in root {
            match key.as_str() {
                "$query" => query.condition = parse_condition(arg)?,
                "$filter" => query.parse_filter(arg)?,
                "$projection" => {},
                other => return Err(invalid(format!("unknown query section {other}"))),
            }
        }
        Ok(query)
    }

    fn parse_filter(&mut self, value: &Value) -> RepositoryResult<()> {
        let map = value
            .as_object()
            .ok_or_else(|| invalid("$filter must be an object"))?;
        for (key, arg) in map {
            match key.as_str() {
                "$limit" => self.limit = Some(parse_usize(key, arg)?),
                "$offset" => self.offset = parse_usize(key, arg)?,
                "$orderby" => {
                    let fields = arg
                        .as_object()
                        .ok_or_else(|| invalid("$orderby must be an object"))?;
                    for (path, dir) in fields {
                        let direction = match dir.as_i64() {
                            Some(1) => SortDirection::Ascending,
                            Some(-1) => SortDirection::Descending,
                            _ => return Err(invalid("$orderby direction must be 1 or -1")),
                        };
                        self.order_by.push((path.clone(), direction));
                    }
                },
                other => return Err(invalid(format!("unknown filter {other}"))),
            }
        }
        Ok(())
    }

    /// Cap the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add a sort key.
    #[must_use]
    pub fn order_by(mut self, path: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push((path.into(), direction));
        self
    }

    /// Whether a document satisfies the condition (ignoring paging).
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        self.condition.matches(doc)
    }

    /// Filter, sort and page a set of documents.
    #[must_use]
    pub fn apply(&self, docs: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut matched: Vec<Value> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if !self.order_by.is_empty() {
            matched.sort_by(|a, b| self.compare(a, b));
        }
        let paged = matched.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => paged.take(limit).collect(),
            None => paged.collect(),
        }
    }

    /// Sort key of a document: the smallest reachable value when ascending,
    /// the largest when descending.
    fn sort_key<'a>(doc: &'a Value, path: &str, direction: SortDirection) -> Option<&'a Value> {
        let candidates = resolve(doc, path)
            .into_iter()
            .filter(|v| !matches!(v, Value::Array(_) | Value::Object(_)));
        let pick = |a: &&Value, b: &&Value| compare_values(a, b).unwrap_or(Ordering::Equal);
        match direction {
            SortDirection::Ascending => candidates.min_by(pick),
            SortDirection::Descending => candidates.max_by(pick),
        }
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (path, direction) in &self.order_by {
            let left = Self::sort_key(a, path, *direction);
            let right = Self::sort_key(b, path, *direction);
            let ord = match (left, right) {
                (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::all()
    }
}
