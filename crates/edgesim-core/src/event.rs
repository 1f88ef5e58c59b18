//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Identifier of an event, unique within a simulation.
pub type EventId = u64;

/// Trait for event payloads.
///
/// Any serializable type can be used as an event payload. Handlers recover
/// the concrete type by downcasting, usually via the `cast!` macro.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// An event scheduled for delivery at some point in simulated time.
pub struct Event {
    pub id: EventId,
    pub time: f64,
    pub src: Id,
    pub dst: Id,
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Reversed ordering so that the binary heap pops the earliest event first,
// with ties resolved in submission order.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
