//! Roll results.

use serde::{Deserialize, Serialize};

/// The faces showing after a roll, in die order.
///
/// Index identity matters: rerolls address individual positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    values: Vec<u32>,
}

impl RollResult {
    /// Wrap a sequence of die faces.
    pub fn new(values: Vec<u32>) -> Self {
        Self { values }
    }

    /// The individual die faces.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Sum of all die faces.
    pub fn total(&self) -> i64 {
        self.values.iter().map(|&v| i64::from(v)).sum()
    }

    /// Number of dice in the result.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing has been rolled.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn set(&mut self, index: usize, value: u32) {
        self.values[index] = value;
    }
}

impl From<Vec<u32>> for RollResult {
    fn from(values: Vec<u32>) -> Self {
        Self::new(values)
    }
}

impl std::fmt::Display for RollResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "[{}] = {}", values.join(", "), self.total())
    }
}
