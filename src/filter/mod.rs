//! Filter classification: raw JSON filter maps into a tagged tree.
//!
//! Incoming filters are plain JSON maps (`{"name": {"eq": "Alice"}, "OR":
//! [...]}`). Re-inspecting such maps at every recursion makes "is this a leaf
//! operator map or a nested object?" ambiguous, so classification happens
//! exactly once, up front: every map entry becomes a [`FilterNode`], every
//! field value a [`FieldFilter`]. A map whose keys mix operators with nested
//! fields is rejected here rather than silently resolved.
//!
//! Keys are iterated in lexicographic order, which makes placeholder
//! numbering and generated SQL reproducible across runs regardless of the
//! input map's iteration order.

use std::collections::BTreeSet;

use serde_json::Value;

mod errors;

pub use errors::FilterError;

use crate::selection::JsonMap;

pub const LOGICAL_AND: &str = "AND";
pub const LOGICAL_OR: &str = "OR";
pub const LOGICAL_NOT: &str = "NOT";

/// Array quantifiers recognized inside JSON column filters.
pub const QUANTIFIER_ANY: &str = "any";
pub const QUANTIFIER_ALL: &str = "all";

/// The set of names classified as leaf operators.
///
/// Built from the operator registry; a map containing any of these keys is a
/// leaf operator map, everything else is a nested field map.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    names: BTreeSet<String>,
}

impl Vocabulary {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Vocabulary {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name) || name == QUANTIFIER_ANY || name == QUANTIFIER_ALL
    }
}

/// One entry of a classified filter map.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    And(Vec<FilterMap>),
    Or(Vec<FilterMap>),
    Not(FilterMap),
    Field { name: String, filter: FieldFilter },
}

/// A classified filter map. Entries are sorted by key; siblings combine
/// under logical AND unless grouped by explicit `AND`/`OR`/`NOT` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMap {
    pub entries: Vec<FilterNode>,
}

/// The classified value of a single field entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// Leaf operator map: every key is a registered operator or quantifier.
    Operators(Vec<OperatorEntry>),
    /// Nested field map: no key is an operator.
    Nested(FilterMap),
}

/// One operator applied to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorEntry {
    /// A scalar comparison, e.g. `eq: "Alice"`.
    Op { name: String, value: Value },
    /// Existential array quantifier over a list-valued JSON field.
    Any(Box<FieldFilter>),
    /// Universal array quantifier over a list-valued JSON field.
    All(Box<FieldFilter>),
}

impl FilterMap {
    /// Classify a raw JSON filter map.
    pub fn parse(map: &JsonMap, vocabulary: &Vocabulary) -> Result<Self, FilterError> {
        if map.is_empty() {
            return Err(FilterError::EmptyFilter);
        }
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value = &map[key.as_str()];
            let entry = match key.as_str() {
                LOGICAL_AND | LOGICAL_OR => {
                    let list = value
                        .as_array()
                        .ok_or_else(|| FilterError::LogicalValueNotList(key.clone()))?;
                    let mut maps = Vec::with_capacity(list.len());
                    for item in list {
                        let item_map = item
                            .as_object()
                            .ok_or_else(|| FilterError::LogicalValueNotList(key.clone()))?;
                        maps.push(FilterMap::parse(item_map, vocabulary)?);
                    }
                    if key == LOGICAL_AND {
                        FilterNode::And(maps)
                    } else {
                        FilterNode::Or(maps)
                    }
                }
                LOGICAL_NOT => {
                    let inner = value.as_object().ok_or(FilterError::NotValueNotMap)?;
                    FilterNode::Not(FilterMap::parse(inner, vocabulary)?)
                }
                field => {
                    let inner = value
                        .as_object()
                        .ok_or_else(|| FilterError::FieldValueNotMap(field.to_string()))?;
                    FilterNode::Field {
                        name: field.to_string(),
                        filter: FieldFilter::parse(field, inner, vocabulary)?,
                    }
                }
            };
            entries.push(entry);
        }
        Ok(FilterMap { entries })
    }
}

impl FieldFilter {
    /// Classify a field's value map as a leaf operator map or a nested
    /// field map. Classification is total: mixed maps are an error.
    pub fn parse(
        field: &str,
        map: &JsonMap,
        vocabulary: &Vocabulary,
    ) -> Result<Self, FilterError> {
        if map.is_empty() {
            return Err(FilterError::EmptyFilter);
        }
        let operator_keys = map.keys().filter(|k| vocabulary.contains(k)).count();
        if operator_keys == 0 {
            return Ok(FieldFilter::Nested(FilterMap::parse(map, vocabulary)?));
        }
        // Logical keys never appear in a leaf map; counting them as "nested"
        // keeps `{eq: .., AND: ..}` an error rather than an ambiguity.
        if operator_keys != map.len() {
            return Err(FilterError::MixedFilterMap(field.to_string()));
        }

        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value = &map[key.as_str()];
            let entry = match key.as_str() {
                QUANTIFIER_ANY | QUANTIFIER_ALL => {
                    let inner = value
                        .as_object()
                        .ok_or_else(|| FilterError::QuantifierValueNotMap(key.clone()))?;
                    let body = Box::new(FieldFilter::parse(field, inner, vocabulary)?);
                    if key == QUANTIFIER_ANY {
                        OperatorEntry::Any(body)
                    } else {
                        OperatorEntry::All(body)
                    }
                }
                op => OperatorEntry::Op {
                    name: op.to_string(),
                    value: value.clone(),
                },
            };
            entries.push(entry);
        }
        Ok(FieldFilter::Operators(entries))
    }
}
