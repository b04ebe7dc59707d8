//! Tri-state field presence: unset vs. observed-empty vs. value.
//!
//! Snapshots are assembled from partial data sources, so every observed
//! attribute distinguishes "never observed" from "observed and empty" from
//! "observed with a value". A plain `Option` collapses the first two, which
//! breaks merge and diff semantics: absence of information is not evidence
//! of change.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Error raised by the fail-fast accessor [`Field::value`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field was never observed by any data source.
    #[error("attribute '{0}' was never observed")]
    MissingAttribute(&'static str),
}

/// A field that is either never observed, observed empty, or observed with
/// a value.
///
/// `Unset` survives merges (any observed state wins over it) and the diff
/// engine guards every cross-snapshot comparison with [`Field::has`] so an
/// unobserved side never produces a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field<T> {
    /// Never observed by any data source.
    Unset,
    /// Observed, and explicitly empty (e.g. a player with no squad).
    Absent,
    /// Observed with a concrete value.
    Set(T),
}

impl<T> Field<T> {
    /// True unless the field is `Unset`.
    ///
    /// An `Absent` field *has* been observed; only `Unset` means there is
    /// no information at all.
    pub fn has(&self) -> bool {
        !matches!(self, Field::Unset)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    /// The value, if one was observed. `None` covers both `Unset` and
    /// `Absent` — use [`Field::has`] first when the distinction matters.
    pub fn get(&self) -> Option<&T> {
        match self {
            Field::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Fail-fast access for callers that require the field to be observed.
    ///
    /// Returns `Err` on `Unset`; `Absent` yields `Ok(None)`. The field name
    /// is only used for the error message.
    pub fn value(&self, name: &'static str) -> Result<Option<&T>, FieldError> {
        match self {
            Field::Unset => Err(FieldError::MissingAttribute(name)),
            Field::Absent => Ok(None),
            Field::Set(v) => Ok(Some(v)),
        }
    }

    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Field::Unset => Field::Unset,
            Field::Absent => Field::Absent,
            Field::Set(v) => Field::Set(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Unset => Field::Unset,
            Field::Absent => Field::Absent,
            Field::Set(v) => Field::Set(f(v)),
        }
    }

    /// The value, or `default` when the field is `Unset` or `Absent`.
    pub fn get_or(&self, default: T) -> T
    where
        T: Clone,
    {
        match self {
            Field::Set(v) => v.clone(),
            _ => default,
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unset
    }
}

impl<T> From<T> for Field<T> {
    fn from(v: T) -> Self {
        Field::Set(v)
    }
}

impl<T> From<Option<T>> for Field<T> {
    /// `None` maps to `Absent`: converting an `Option` asserts the field
    /// *was* observed.
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Field::Set(v),
            None => Field::Absent,
        }
    }
}

impl From<&str> for Field<String> {
    fn from(v: &str) -> Self {
        Field::Set(v.to_string())
    }
}

impl<T: Hash> Hash for Field<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Field::Unset => 0u8.hash(state),
            Field::Absent => 1u8.hash(state),
            Field::Set(v) => {
                2u8.hash(state);
                v.hash(state);
            }
        }
    }
}

// Serde mapping: a missing key deserializes to `Unset` (via `#[serde(default)]`
// at the use site), an explicit `null` to `Absent`, a value to `Set`. `Unset`
// fields are skipped on serialization at the use site, so the three states
// round-trip.
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Set(v) => serializer.serialize_some(v),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Set(v),
            None => Field::Absent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_states_are_distinct() {
        let unset: Field<i64> = Field::Unset;
        let absent: Field<i64> = Field::Absent;
        let set: Field<i64> = Field::Set(3);

        assert!(!unset.has());
        assert!(absent.has());
        assert!(set.has());

        assert_eq!(unset.get(), None);
        assert_eq!(absent.get(), None);
        assert_eq!(set.get(), Some(&3));
    }

    #[test]
    fn test_value_fails_fast_on_unset() {
        let unset: Field<i64> = Field::Unset;
        assert_eq!(
            unset.value("level"),
            Err(FieldError::MissingAttribute("level"))
        );

        let absent: Field<i64> = Field::Absent;
        assert_eq!(absent.value("level"), Ok(None));

        let set: Field<i64> = Field::Set(7);
        assert_eq!(set.value("level"), Ok(Some(&7)));
    }

    #[test]
    fn test_option_conversion_is_observed() {
        let f: Field<i64> = Field::from(None::<i64>);
        assert!(f.is_absent());
        let f: Field<i64> = Field::from(Some(1));
        assert!(f.is_set());
    }

    #[test]
    fn test_serde_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Probe {
            #[serde(default, skip_serializing_if = "Field::is_unset")]
            a: Field<i64>,
            #[serde(default, skip_serializing_if = "Field::is_unset")]
            b: Field<i64>,
            #[serde(default, skip_serializing_if = "Field::is_unset")]
            c: Field<i64>,
        }

        let probe = Probe {
            a: Field::Unset,
            b: Field::Absent,
            c: Field::Set(5),
        };
        let json = serde_json::to_string(&probe).unwrap();
        assert_eq!(json, r#"{"b":null,"c":5}"#);

        let back: Probe = serde_json::from_str(&json).unwrap();
        assert!(back.a.is_unset());
        assert!(back.b.is_absent());
        assert_eq!(back.c.get(), Some(&5));
    }
}
