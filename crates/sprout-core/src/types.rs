use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier of a plant record (SQLite rowid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantId(pub i64);

impl PlantId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&PlantId(42)).unwrap();
        assert_eq!(json, "42");
        let back: PlantId = serde_json::from_str("7").unwrap();
        assert_eq!(back, PlantId(7));
    }
}
