//! # Raw Parameters
//!
//! Opaque value wrappers used to hand identifier and attribute values to the
//! external native-call bridge without exposing any of the internal locking.
//! The bridge consumes a caller-supplied slice of parameters and must iterate
//! its explicit length, never a type-descriptor string.

use serde::{Deserialize, Serialize};

/// A single argument for the external native-call bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawParameter {
    /// Unsigned integral value (reference ids, base ids, network ids)
    Unsigned(u64),

    /// Floating point value
    Float(f64),

    /// String value
    Text(String),
}

impl RawParameter {
    /// The unsigned payload, if this parameter carries one
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Self::Unsigned(value) => Some(*value),
            _ => None,
        }
    }

    /// The floating point payload, if this parameter carries one
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// The string payload, if this parameter carries one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<u32> for RawParameter {
    fn from(value: u32) -> Self {
        Self::Unsigned(value as u64)
    }
}

impl From<u64> for RawParameter {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}
