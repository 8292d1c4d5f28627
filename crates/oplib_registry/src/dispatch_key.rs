//! Backend dispatch keys.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Backend an operator implementation is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DispatchKey {
    Undefined,
    Cpu,
    Cuda,
}

impl DispatchKey {
    /// Every key, in declaration order.
    pub const ALL: [DispatchKey; 3] = [DispatchKey::Undefined, DispatchKey::Cpu, DispatchKey::Cuda];

    /// Key retried when the requested one has no implementation.
    pub const FALLBACK: DispatchKey = DispatchKey::Cpu;

    pub fn as_str(self) -> &'static str {
        match self {
            DispatchKey::Undefined => "Undefined",
            DispatchKey::Cpu => "CPU",
            DispatchKey::Cuda => "CUDA",
        }
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized dispatch key name.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown dispatch key: {0}")]
pub struct ParseDispatchKeyError(pub String);

impl FromStr for DispatchKey {
    type Err = ParseDispatchKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DispatchKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseDispatchKeyError(s.to_string()))
    }
}
