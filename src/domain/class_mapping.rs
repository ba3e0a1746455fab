// ============================================================
// Layer 3 — Class Mapping
// ============================================================
// Ordered class names ↔ integer indices 0..K-1. The order given
// by the caller fixes the indices, and the same mapping is
// stored with the exported model so prediction reuses it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassMapping {
    names: Vec<String>,
}

impl ClassMapping {
    /// Build a mapping where `names[i]` gets index `i`.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
        }
    }

    /// Index of a class name, `None` for unknown labels.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of classes (K).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
