//! Entity identity: scope paths, key attributes, and the matching rules.
//!
//! Every entity type declares a dotted scope path (where in the snapshot
//! tree it lives) and an ordered tuple of key fields whose combined values
//! identify an instance within its scope across two snapshots taken close
//! together in time. Matching is deliberately lenient: snapshots are built
//! from partial sources, so an entity missing a key field is matched on the
//! fields it does have.

use crate::field::Field;
use serde::{Deserialize, Serialize};

/// A value usable in key position.
///
/// Identity keys are either scalars (numeric or string ids, names) or — for
/// relationship keys such as a squad's team — the key set of the referenced
/// entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Str(String),
    /// Key attributes of a referenced entity (e.g. `Squad.team`).
    Keys(KeyAttributes),
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Str(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Str(v)
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Str(v) => write!(f, "{}", v),
            KeyValue::Keys(keys) => {
                write!(f, "{{")?;
                for (i, (name, value)) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An ordered set of `(field name, value)` pairs identifying an entity.
///
/// Entities emit their keys in declared field order, so pairwise equality
/// reproduces the original's dict-equality semantics: two key sets with
/// different populated subsets are not equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyAttributes(Vec<(String, KeyValue)>);

impl KeyAttributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<KeyValue>) {
        self.0.push((name.into(), value.into()));
    }

    /// Chainable insert, for building filters.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<KeyValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&KeyValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, KeyValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Capability implemented by every entity type: scope routing, key-field
/// declaration, and by-name key lookup.
pub trait Keyed {
    /// Dotted path identifying where in the snapshot tree this entity type
    /// lives (e.g. `"players"`, `"players.score"`).
    const SCOPE: &'static str;

    /// Ordered key-field tuple used for cross-snapshot identity. May be
    /// empty for entity types that are never matched (scores, settings).
    const KEY_FIELDS: &'static [&'static str];

    /// Look up one declared key field by name. `None` means the field is
    /// not declared by this entity type at all, which is distinct from a
    /// declared-but-unset field.
    fn key_value(&self, field: &str) -> Option<Field<KeyValue>>;

    /// The mapping of key-field names to their current values, restricted
    /// to the fields that are set, in declared order.
    fn key_attributes(&self) -> KeyAttributes {
        let mut keys = KeyAttributes::new();
        for field in Self::KEY_FIELDS {
            if let Some(Field::Set(value)) = self.key_value(field) {
                keys.insert(*field, value);
            }
        }
        keys
    }
}

/// Whether `entity` matches every filter in `filters`.
///
/// Per filtered field:
/// - declared and set: the values must be equal;
/// - declared but observed-empty: disqualifies (an observed empty value
///   that differs from the filter is evidence of non-identity);
/// - unset or undeclared: disqualifies unless `ignore_unknown`, in which
///   case the field is neutral.
///
/// A match additionally requires at least one positive field comparison, so
/// an empty filter set — or a candidate with none of the filtered fields
/// populated — never matches. Entities with zero set key fields are always
/// treated as new/removed by the diff engine as a consequence.
pub fn matches_filters<E: Keyed>(entity: &E, filters: &KeyAttributes, ignore_unknown: bool) -> bool {
    let mut positives = 0usize;
    for (name, want) in filters.iter() {
        match entity.key_value(name) {
            Some(Field::Set(have)) => {
                if have == *want {
                    positives += 1;
                } else {
                    return false;
                }
            }
            Some(Field::Absent) => return false,
            Some(Field::Unset) | None => {
                if !ignore_unknown {
                    return false;
                }
            }
        }
    }
    positives > 0
}
