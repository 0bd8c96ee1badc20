use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic configuration hash (BLAKE3 of the canonical risk config JSON)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic dataset hash (content hash of bars + signals)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic run ID (config + dataset + seed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub seed: u64,
}

impl RunId {
    pub fn new(config_hash: ConfigHash, dataset_hash: DatasetHash, seed: u64) -> Self {
        Self {
            config_hash,
            dataset_hash,
            seed,
        }
    }

    /// Stable BLAKE3 hash of the run identity.
    pub fn hash(&self) -> String {
        use serde_json::json;

        let canonical = json!({
            "config_hash": &self.config_hash.0,
            "dataset_hash": &self.dataset_hash.0,
            "seed": self.seed,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.config_hash, self.dataset_hash, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_deterministic() {
        let run1 = RunId::new(ConfigHash::from_bytes(b"abc123"), DatasetHash::from_hash("def456"), 42);
        let run2 = RunId::new(ConfigHash::from_bytes(b"abc123"), DatasetHash::from_hash("def456"), 42);
        assert_eq!(run1.hash(), run2.hash());
    }

    #[test]
    fn test_run_id_different_seed_different_hash() {
        let run1 = RunId::new(ConfigHash::from_bytes(b"abc123"), DatasetHash::from_hash("def456"), 42);
        let run2 = RunId::new(ConfigHash::from_bytes(b"abc123"), DatasetHash::from_hash("def456"), 43);
        assert_ne!(run1.hash(), run2.hash());
    }

    #[test]
    fn config_hash_is_hex_blake3() {
        let h = ConfigHash::from_bytes(b"risk");
        assert_eq!(h.0.len(), 64);
        assert_eq!(h, ConfigHash::from_bytes(b"risk"));
    }
}
