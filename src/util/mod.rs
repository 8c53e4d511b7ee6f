//! Shared helpers

pub mod resource;
pub mod time;
