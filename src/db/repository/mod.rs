//! Repository layer: entity-scoped database operations.

mod history;

pub use history::*;
