//! Type-safe identifiers for backend rows.
//!
//! Backend ids are UUID strings. They are held as `Arc<str>` so that state
//! snapshots can be cloned cheaply on every update.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

impl_identifier!(PlayerId);
impl_identifier!(TagId);
impl_identifier!(DodgeId);
impl_identifier!(MatchId);
impl_identifier!(SeasonId);
impl_identifier!(FlashEventId);
impl_identifier!(WhisperId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality() {
        let id1 = PlayerId::new("8f2c1a8e-0000-4000-8000-000000000001");
        let id2 = PlayerId::new("8f2c1a8e-0000-4000-8000-000000000001");
        let id3 = id1.clone();

        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert!(Arc::ptr_eq(&id1.0, &id3.0));
    }

    #[test]
    fn test_identifier_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(MatchId::new("m1"), 42);

        assert_eq!(map.get(&MatchId::new("m1")), Some(&42));
    }

    #[test]
    fn test_identifier_serde_is_plain_string() {
        let id = SeasonId::new("season-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"season-7\"");

        let parsed: SeasonId = serde_json::from_str("\"season-7\"").unwrap();
        assert_eq!(parsed, id);
    }
}
