//! Session configuration.

use serde::{Deserialize, Serialize};

/// Settings for a compilation [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name given to the produced circuit.
    #[serde(default = "default_name")]
    pub name: String,
    /// Upper bound on simultaneously live qubits.
    #[serde(default)]
    pub max_qubits: Option<u32>,
}

fn default_name() -> String {
    "session".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_qubits: None,
        }
    }
}

impl SessionConfig {
    /// Config with the given circuit name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Bound the number of live qubits.
    #[must_use]
    pub fn with_max_qubits(mut self, max: u32) -> Self {
        self.max_qubits = Some(max);
        self
    }
}
