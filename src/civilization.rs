//! ## Civilization payload
//!
//! The record carried by every indexed point. The index treats it opaquely:
//! only `id` ever participates in equality or hashing concerns, via
//! [`crate::geometry::Point`]'s `PartialEq` impl.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An immutable payload record: an identified civilization at a location and
/// founding year.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Civilization {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_year: i64,
}

impl Civilization {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        start_year: i64,
    ) -> Self {
        Civilization {
            id,
            name: name.into(),
            latitude,
            longitude,
            start_year,
        }
    }
}
