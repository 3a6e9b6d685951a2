use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic ordering value: block height for ranked feeds, arrival sequence
/// for stream feeds.
pub type Rank = u64;

/// Stable per-item key used to match old and new entries while diffing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key used by placeholders, so a ranked feed keyed by height patches the
    /// placeholder node in place once the real entity arrives.
    pub fn for_rank(rank: Rank) -> Self {
        Self(rank.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IdentityKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque pre-rendered item content. Never built or inspected by the engine
/// beyond attribute lookup at the decode boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fragment {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Fragment {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An item as produced by a page fetch or a live message, before the reducer
/// has placed it. Ranked feeds require `rank`; stream feeds get an arrival
/// sequence assigned on admission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub key: IdentityKey,
    pub rank: Option<Rank>,
    pub payload: Fragment,
    pub from_address_hash: Option<String>,
    pub to_address_hash: Option<String>,
}

impl Candidate {
    pub fn new(key: impl Into<IdentityKey>, payload: impl Into<Fragment>) -> Self {
        Self {
            key: key.into(),
            rank: None,
            payload: payload.into(),
            from_address_hash: None,
            to_address_hash: None,
        }
    }

    /// Ranked candidate keyed by its rank, the way block feeds are keyed.
    pub fn ranked(rank: Rank, payload: impl Into<Fragment>) -> Self {
        Self {
            key: IdentityKey::for_rank(rank),
            rank: Some(rank),
            payload: payload.into(),
            from_address_hash: None,
            to_address_hash: None,
        }
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn with_roles(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.from_address_hash = from.map(str::to_string);
        self.to_address_hash = to.map(str::to_string);
        self
    }

    pub(crate) fn into_entity(self, rank: Rank) -> Entity {
        Entity {
            key: self.key,
            rank,
            payload: self.payload,
            from_address_hash: self.from_address_hash,
            to_address_hash: self.to_address_hash,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub key: IdentityKey,
    pub rank: Rank,
    pub payload: Fragment,
    pub from_address_hash: Option<String>,
    pub to_address_hash: Option<String>,
}

/// One slot of the visible list: a real entity or a known-missing rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Real(Entity),
    Placeholder(Rank),
}

impl Entry {
    pub fn rank(&self) -> Rank {
        match self {
            Entry::Real(e) => e.rank,
            Entry::Placeholder(r) => *r,
        }
    }

    pub fn identity(&self) -> IdentityKey {
        match self {
            Entry::Real(e) => e.key.clone(),
            Entry::Placeholder(r) => IdentityKey::for_rank(*r),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Entry::Placeholder(_))
    }

    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Entry::Real(e) => Some(e),
            Entry::Placeholder(_) => None,
        }
    }
}

/// `{eventName, payload}` envelope delivered on a live topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
}
