//! ## Custom Errors for civindex
//!
//! This module defines the error types used internally by the crate to report
//! invalid construction parameters.

use std::error::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors that can occur while constructing an index.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// Occurs when an R-tree is constructed with `max_children < 2`.
    InvalidCapacity {
        /// The capacity value that was provided.
        capacity: usize,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::InvalidCapacity { capacity } => {
                write!(
                    f,
                    "Invalid capacity: {capacity}. max_children must be at least 2."
                )
            }
        }
    }
}

impl Error for IndexError {}
