//! Property cache levels and the reference-level propagation rule.
//!
//! A property declares how long its converted value may live. While a chain of
//! nested conversions runs (a property value building further published
//! elements whose properties are converted in turn), the *reference* level is
//! threaded from the outermost access inward and decides the level actually used.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// How long a converted property value may be cached.
///
/// Ordered by scope breadth: `None < Element < Elements < Snapshot`.
/// `Elements` and `Snapshot` belong to the same breadth class (see
/// [`CacheLevel::breadth`]) but keep a strict order so comparisons are total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "RawCacheLevel")]
pub enum CacheLevel {
    /// Never cached; converted on every access.
    None,
    /// Cached on the property instance, lives as long as the owning element.
    Element,
    /// Cached in the elements store, survives across snapshots until content changes.
    Elements,
    /// Cached in the snapshot store, dropped when the read snapshot ends.
    Snapshot,
}

impl CacheLevel {
    pub const ALL: [CacheLevel; 4] = [
        CacheLevel::None,
        CacheLevel::Element,
        CacheLevel::Elements,
        CacheLevel::Snapshot,
    ];

    /// Breadth class of the level. `Elements` and `Snapshot` share a class.
    pub fn breadth(self) -> u8 {
        match self {
            CacheLevel::None => 0,
            CacheLevel::Element => 1,
            CacheLevel::Elements | CacheLevel::Snapshot => 2,
        }
    }

    fn rank(self) -> u8 {
        match self {
            CacheLevel::None => 0,
            CacheLevel::Element => 1,
            CacheLevel::Elements => 2,
            CacheLevel::Snapshot => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheLevel::None => "none",
            CacheLevel::Element => "element",
            CacheLevel::Elements => "elements",
            CacheLevel::Snapshot => "snapshot",
        }
    }
}

impl PartialOrd for CacheLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CacheLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric levels as stored by the schema layer: 1 = element, 2 = elements,
/// 3 = snapshot, 4 = none. Anything else is rejected.
impl TryFrom<i32> for CacheLevel {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CacheLevel::Element),
            2 => Ok(CacheLevel::Elements),
            3 => Ok(CacheLevel::Snapshot),
            4 => Ok(CacheLevel::None),
            other => Err(DomainError::InvalidCacheLevel {
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for CacheLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CacheLevel::None),
            "element" => Ok(CacheLevel::Element),
            "elements" => Ok(CacheLevel::Elements),
            "snapshot" => Ok(CacheLevel::Snapshot),
            _ => Err(DomainError::InvalidCacheLevel {
                value: s.to_string(),
            }),
        }
    }
}

/// Cache level as it appears in fixtures and schema exports: a name or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCacheLevel {
    Numeric(i32),
    Named(String),
}

impl TryFrom<RawCacheLevel> for CacheLevel {
    type Error = DomainError;

    fn try_from(raw: RawCacheLevel) -> Result<Self, Self::Error> {
        match raw {
            RawCacheLevel::Numeric(value) => CacheLevel::try_from(value),
            RawCacheLevel::Named(name) => name.parse(),
        }
    }
}

/// Outcome of [`resolve_cache_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCacheLevel {
    /// Level whose store holds the value for this access.
    pub effective: CacheLevel,
    /// Reference level handed to nested conversions.
    pub reference: CacheLevel,
}

/// Decide the cache level for one property access.
///
/// A declared level broader than the reference, or `None`, is used as is and
/// becomes the new reference. Otherwise the value is kept on the element and the
/// reference is left untouched.
pub fn resolve_cache_level(declared: CacheLevel, reference: CacheLevel) -> ResolvedCacheLevel {
    if declared > reference || declared == CacheLevel::None {
        ResolvedCacheLevel {
            effective: declared,
            reference: declared,
        }
    } else {
        ResolvedCacheLevel {
            effective: CacheLevel::Element,
            reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_total_and_ascending_by_breadth() {
        assert!(CacheLevel::None < CacheLevel::Element);
        assert!(CacheLevel::Element < CacheLevel::Elements);
        assert!(CacheLevel::Elements < CacheLevel::Snapshot);
        assert_eq!(CacheLevel::Elements.breadth(), CacheLevel::Snapshot.breadth());
        assert!(CacheLevel::None.breadth() < CacheLevel::Element.breadth());
    }

    #[test]
    fn broader_declared_level_becomes_reference() {
        let resolved = resolve_cache_level(CacheLevel::Snapshot, CacheLevel::Element);
        assert_eq!(resolved.effective, CacheLevel::Snapshot);
        assert_eq!(resolved.reference, CacheLevel::Snapshot);
    }

    #[test]
    fn narrower_declared_level_is_kept_on_element() {
        let resolved = resolve_cache_level(CacheLevel::Elements, CacheLevel::Snapshot);
        assert_eq!(resolved.effective, CacheLevel::Element);
        assert_eq!(resolved.reference, CacheLevel::Snapshot);

        let same = resolve_cache_level(CacheLevel::Elements, CacheLevel::Elements);
        assert_eq!(same.effective, CacheLevel::Element);
        assert_eq!(same.reference, CacheLevel::Elements);
    }

    #[test]
    fn none_always_wins() {
        for reference in CacheLevel::ALL {
            let resolved = resolve_cache_level(CacheLevel::None, reference);
            assert_eq!(resolved.effective, CacheLevel::None);
            assert_eq!(resolved.reference, CacheLevel::None);
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        for declared in CacheLevel::ALL {
            for reference in CacheLevel::ALL {
                let first = resolve_cache_level(declared, reference);
                let second = resolve_cache_level(declared, reference);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn unknown_numeric_levels_are_rejected() {
        assert_eq!(CacheLevel::try_from(3).expect("snapshot"), CacheLevel::Snapshot);
        assert_eq!(CacheLevel::try_from(4).expect("none"), CacheLevel::None);
        let err = CacheLevel::try_from(0).expect_err("unknown level");
        assert!(matches!(err, DomainError::InvalidCacheLevel { .. }));
        assert!(CacheLevel::try_from(7).is_err());
        assert!("forever".parse::<CacheLevel>().is_err());
        assert_eq!("Elements".parse::<CacheLevel>().expect("parse"), CacheLevel::Elements);
    }

    #[test]
    fn deserializes_names_and_numbers() {
        let levels: Vec<CacheLevel> =
            serde_json::from_str(r#"["snapshot", 1, "none", 2]"#).expect("levels");
        assert_eq!(
            levels,
            vec![
                CacheLevel::Snapshot,
                CacheLevel::Element,
                CacheLevel::None,
                CacheLevel::Elements
            ]
        );
        assert!(serde_json::from_str::<CacheLevel>("0").is_err());
        assert!(serde_json::from_str::<CacheLevel>(r#""unknown""#).is_err());
    }
}
