//! Label queries over labeled collections
//!
//! Queries are S-expressions over label literals:
//! - `'label'` or a bare word matches entities carrying that label
//! - `all` matches every entity
//! - `(and q..)`, `(or q..)` and `(not q)` compose queries
//!
//! Matching is pure and keeps the input collection's insertion order.

mod parser;

#[cfg(test)]
mod tests;

pub use parser::parse;

use crate::error::{MatchError, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// An entity with a stable identifier and a set of labels
pub trait Labeled {
    fn id(&self) -> &str;

    fn labels(&self) -> &[String];

    fn has_label(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }
}

impl<T: Labeled + ?Sized> Labeled for Arc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn labels(&self) -> &[String] {
        (**self).labels()
    }
}

impl<T: Labeled + ?Sized> Labeled for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn labels(&self) -> &[String] {
        (**self).labels()
    }
}

/// Plain labeled entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledEntity {
    id: String,
    labels: Vec<String>,
}

impl Labeled for LabeledEntity {
    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Build a plain labeled entity
pub fn labeled<I, S>(id: impl Into<String>, labels: I) -> LabeledEntity
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    LabeledEntity {
        id: id.into(),
        labels: labels.into_iter().map(Into::into).collect(),
    }
}

/// Collection of labeled entities in insertion order
#[derive(Debug, Clone)]
pub struct LabeledSet<T> {
    items: Vec<T>,
}

impl<T> Default for LabeledSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Labeled> LabeledSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Labeled> FromIterator<T> for LabeledSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Subset of a `LabeledSet` selected by a query
///
/// Holds references into the matched collection rather than copies.
#[derive(Debug)]
pub struct MatchedSet<'a, T> {
    items: Vec<&'a T>,
}

impl<'a, T: Labeled> MatchedSet<'a, T> {
    pub fn slice(&self) -> &[&'a T] {
        &self.items
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id().to_string()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parsed boolean expression over labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    All,
    Label(String),
    Not(Box<Query>),
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Query {
    /// Evaluate the query against a single entity
    pub fn is_match<L: Labeled + ?Sized>(&self, entity: &L) -> bool {
        match self {
            Query::All => true,
            Query::Label(label) => entity.has_label(label),
            Query::Not(inner) => !inner.is_match(entity),
            Query::And(operands) => operands.iter().all(|q| q.is_match(entity)),
            Query::Or(operands) => operands.iter().any(|q| q.is_match(entity)),
        }
    }

    /// Select every entity of `set` that satisfies the query
    pub fn match_set<'a, T: Labeled>(
        &self,
        set: &'a LabeledSet<T>,
    ) -> std::result::Result<MatchedSet<'a, T>, MatchError> {
        let mut seen = HashSet::with_capacity(set.len());
        let mut items = Vec::new();

        for item in set.iter() {
            if !seen.insert(item.id()) {
                return Err(MatchError::DuplicateId(item.id().to_string()));
            }
            if self.is_match(item) {
                items.push(item);
            }
        }

        Ok(MatchedSet { items })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operands(f: &mut fmt::Formatter<'_>, op: &str, qs: &[Query]) -> fmt::Result {
            write!(f, "({}", op)?;
            for q in qs {
                write!(f, " {}", q)?;
            }
            f.write_str(")")
        }

        match self {
            Query::All => f.write_str("all"),
            Query::Label(label) => write!(f, "'{}'", label),
            Query::Not(inner) => write!(f, "(not {})", inner),
            Query::And(qs) => operands(f, "and", qs),
            Query::Or(qs) => operands(f, "or", qs),
        }
    }
}

/// Parse `expr` and match it against `set`
pub fn execute<'a, T: Labeled>(set: &'a LabeledSet<T>, expr: &str) -> Result<MatchedSet<'a, T>> {
    let query = parse(expr)?;
    Ok(query.match_set(set)?)
}
