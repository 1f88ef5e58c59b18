//! Simulation configuration and execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::Level::Trace;
use log::{log_enabled, trace};
use serde_json::json;
use serde_type_name::type_name;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::handler::{EventCancellationPolicy, EventHandler};
use crate::log::log_undelivered_event;
use crate::state::SimulationState;
use crate::Event;

/// Represents a simulation, provides methods for its configuration and execution.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    name_to_id: HashMap<String, Id>,
    names: Rc<RefCell<Vec<String>>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            name_to_id: HashMap::new(),
            names: Rc::new(RefCell::new(Vec::new())),
            handlers: Vec::new(),
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.name_to_id.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.borrow_mut().push(name.to_owned());
        self.handlers.push(None);
        id
    }

    /// Returns the identifier of component by its name.
    ///
    /// Panics if component with such name does not exist.
    pub fn lookup_id(&self, name: &str) -> Id {
        *self.name_to_id.get(name).unwrap()
    }

    /// Returns the name of component by its identifier.
    ///
    /// Panics if component with such id does not exist.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }

    /// Creates a new simulation context with specified name.
    ///
    /// Component ids are assigned sequentially starting from 0.
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        SimulationContext::new(
            self.register(name.as_ref()),
            name.as_ref(),
            self.sim_state.clone(),
            self.names.clone(),
        )
    }

    /// Registers the event handler implementation for component with specified name,
    /// returns the component id.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler);
        id
    }

    /// Removes the event handler for component with specified name,
    /// cancelling the pending events according to the specified policy.
    pub fn remove_handler<S>(&mut self, name: S, policy: EventCancellationPolicy)
    where
        S: AsRef<str>,
    {
        let id = self.lookup_id(name.as_ref());
        self.handlers[id as usize] = None;
        match policy {
            EventCancellationPolicy::Incoming => {
                self.sim_state.borrow_mut().cancel_events(|e| e.dst == id);
            }
            EventCancellationPolicy::Outgoing => {
                self.sim_state.borrow_mut().cancel_events(|e| e.src == id);
            }
            EventCancellationPolicy::All => {
                self.sim_state.borrow_mut().cancel_events(|e| e.src == id || e.dst == id);
            }
            EventCancellationPolicy::None => {}
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Performs a single step through the simulation: takes the next event from the queue,
    /// advances the clock to the event time and delivers the event to the destination handler.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step(&mut self) -> bool {
        let next = self.sim_state.borrow_mut().next_event();
        if let Some(event) = next {
            if let Some(handler_opt) = self.handlers.get(event.dst as usize) {
                if log_enabled!(Trace) {
                    let src_name = self.lookup_name(event.src);
                    let dst_name = self.lookup_name(event.dst);
                    trace!(
                        target: &dst_name,
                        "[{:.3} {} {}] {}",
                        event.time,
                        crate::log::get_colored("EVENT", colored::Color::BrightBlack),
                        dst_name,
                        json!({"type": type_name(&event.data).unwrap(), "data": event.data, "src": src_name})
                    );
                }
                if let Some(handler) = handler_opt {
                    handler.borrow_mut().on(event);
                } else {
                    log_undelivered_event(event);
                }
            } else {
                log_undelivered_event(event);
            }
            true
        } else {
            false
        }
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no pending events left.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Steps through the simulation until the next event time is above the specified
    /// threshold (`current_time + duration`) or there are no pending events left.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.sim_state.borrow().time() + duration;
        self.step_until_time(end_time)
    }

    /// Steps through the simulation until the specified time.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_until_time(&mut self, time: f64) -> bool {
        loop {
            if let Some(event) = self.sim_state.borrow_mut().peek_event() {
                if event.time > time {
                    return true;
                }
            } else {
                return false;
            }
            self.step();
        }
    }

    /// Returns the total number of created events.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde::Serialize;

    use crate::{cast, Event, EventHandler, Simulation};

    #[derive(Serialize)]
    struct Ping {
        seq: u32,
    }

    #[derive(Default)]
    struct Recorder {
        delivered: Vec<(f64, u32)>,
    }

    impl EventHandler for Recorder {
        fn on(&mut self, event: Event) {
            let time = event.time;
            cast!(match event.data {
                Ping { seq } => {
                    self.delivered.push((time, seq));
                }
            })
        }
    }

    #[test]
    fn same_time_events_are_delivered_in_submission_order() {
        let mut sim = Simulation::new(42);
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let dst = sim.add_handler("recorder", recorder.clone());
        let mut ctx = sim.create_context("source");
        ctx.emit(Ping { seq: 1 }, dst, 5.0);
        ctx.emit(Ping { seq: 2 }, dst, 5.0);
        ctx.emit(Ping { seq: 0 }, dst, 1.0);
        sim.step_until_no_events();
        assert_eq!(sim.time(), 5.0);
        assert_eq!(recorder.borrow().delivered, vec![(1.0, 0), (5.0, 1), (5.0, 2)]);
    }

    #[test]
    fn canceled_event_is_not_delivered() {
        let mut sim = Simulation::new(42);
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let dst = sim.add_handler("recorder", recorder.clone());
        let mut ctx = sim.create_context("source");
        let event_id = ctx.emit(Ping { seq: 1 }, dst, 2.0);
        ctx.emit(Ping { seq: 2 }, dst, 3.0);
        ctx.cancel_event(event_id);
        sim.step_until_no_events();
        assert_eq!(recorder.borrow().delivered, vec![(3.0, 2)]);
    }

    #[test]
    fn step_until_time_stops_before_future_events() {
        let mut sim = Simulation::new(42);
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let dst = sim.add_handler("recorder", recorder.clone());
        let mut ctx = sim.create_context("source");
        ctx.emit(Ping { seq: 1 }, dst, 1.0);
        ctx.emit(Ping { seq: 2 }, dst, 10.0);
        assert!(sim.step_for_duration(5.0));
        assert_eq!(recorder.borrow().delivered.len(), 1);
        assert!(!sim.step_for_duration(10.0));
        assert_eq!(recorder.borrow().delivered.len(), 2);
    }
}
