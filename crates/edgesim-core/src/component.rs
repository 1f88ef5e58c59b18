//! Simulation component identifiers.

/// Identifier of a simulation component.
///
/// Identifiers are assigned sequentially upon the component registration
/// and are unique within a single simulation.
pub type Id = u32;
