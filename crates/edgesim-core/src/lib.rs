//! Minimal discrete-event simulation kernel: component registry, event queue,
//! virtual clock and logging facilities. Components implement [`EventHandler`]
//! and interact with the simulation through [`SimulationContext`].

pub mod component;
pub mod context;
pub mod event;
pub mod handler;
pub mod log;
pub mod simulation;
mod state;

pub use colored;
pub use component::Id;
pub use context::SimulationContext;
pub use event::{Event, EventData, EventId};
pub use handler::{EventCancellationPolicy, EventHandler};
pub use simulation::Simulation;
pub use state::EPSILON;
