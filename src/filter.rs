use crate::types::Candidate;
use serde::{Deserialize, Serialize};

/// Which role of an item must match the page's address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    None,
    To,
    From,
}

impl FilterMode {
    /// Parse the `filter` query parameter; anything unrecognized means no filter.
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("to") => FilterMode::To,
            Some("from") => FilterMode::From,
            _ => FilterMode::None,
        }
    }

    pub fn is_filtered(self) -> bool {
        self != FilterMode::None
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::None => write!(f, "none"),
            FilterMode::To => write!(f, "to"),
            FilterMode::From => write!(f, "from"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterContext {
    pub address_hash: Option<String>,
    pub mode: FilterMode,
}

impl FilterContext {
    pub fn new(address_hash: Option<String>, mode: FilterMode) -> Self {
        Self { address_hash, mode }
    }

    /// Admission predicate shared by initial load and live intake.
    pub fn admits(&self, item: &Candidate) -> bool {
        let wanted = match self.mode {
            FilterMode::None => return true,
            FilterMode::To => item.to_address_hash.as_deref(),
            FilterMode::From => item.from_address_hash.as_deref(),
        };
        match (wanted, self.address_hash.as_deref()) {
            (Some(role), Some(address)) => same_address(role, address),
            _ => false,
        }
    }

    pub fn admit_all(&self, items: Vec<Candidate>) -> Vec<Candidate> {
        items.into_iter().filter(|c| self.admits(c)).collect()
    }
}

// Hex addresses arrive in mixed checksum case.
fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
