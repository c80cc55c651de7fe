//! Identifier newtypes.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Security identifier (one share class).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
pub struct SecurityId(pub i64);

/// Company identifier grouping the share classes of one issuer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
pub struct CompanyId(pub i64);

/// Key of a company in the fundamentals feed.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize,
)]
pub struct CompanyKey(pub String);

impl From<&str> for CompanyKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
