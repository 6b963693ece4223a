//! Utility library for the mmparse project

pub mod files;
pub mod stats;
pub mod trace;
