use serde::{Deserialize, Serialize};

/// Unknown fields carried through from the engine report untouched
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Memory address as reported by the engine
///
/// Engines emit either a raw integer or a pre-formatted string such as
/// `"0x401000"`; both are accepted and re-serialized in their original form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    /// Integer address
    Numeric(u64),
    /// Pre-formatted address string
    Text(String),
}

impl Address {
    /// Returns the numeric value, parsing hex (`0x` prefix) or decimal text
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Text(text) => {
                let text = text.trim();
                match text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                {
                    Some(hex) => u64::from_str_radix(hex, 16).ok(),
                    None => text.parse().ok(),
                }
            }
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{value:#x}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
