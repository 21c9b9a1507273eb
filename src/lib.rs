//! # civindex
//!
//! An in-memory spatial index of geographic civilization records.
//!
//! [`kd_tree`] is a static 2-d binary space partition, used as a correctness
//! oracle and a simple build-once/query-many index. [`r_tree`] is a dynamic
//! Guttman-style R-tree supporting insertion and deletion after construction.
//! Both index the same [`civilization::Civilization`] payload and are built
//! to agree on range search and nearest-neighbor results.

pub mod civilization;
pub mod exceptions;
pub mod geometry;
pub mod kd_tree;
pub mod r_tree;
mod settings;
