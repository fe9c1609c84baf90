//! Event system following Game Engine Architecture Ch 16.8
//!
//! Nodes emit events into the [`crate::scene::UpdateContext`] during the
//! update pass; the frame scheduler hands them to an [`EventSystem`] once the
//! pass is over, so handlers never run while the tree is being walked.
//!
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Queuing support (immediate + deferred delivery)

use crate::foundation::fixed::Fp;
use std::collections::HashMap;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A node was touched / clicked
    NodeTouched,
    /// The drawing surface changed size
    SurfaceChanged,
    /// A node was attached under a parent (`node`, `parent`)
    NodeAttached,
    /// A node was detached or destroyed (`node`, `parent`)
    NodeDetached,
    /// Application-defined event
    Custom(u32),
}

/// Variant for type-safe event arguments
/// Uses key-value pairs to avoid order dependency problems
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Node name
    Node(String),
    /// Position coordinates
    Position(f32, f32),
    /// Fixed-point value
    Value(Fp),
    /// Integer identifier, such as a pointer id
    Id(u32),
    /// Surface size in pixels
    Size(u32, u32),
}

/// Event with type ID and key-value arguments
#[derive(Debug, Clone)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// Timestamp when event was created (seconds)
    pub timestamp: f64,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create a new event with the given type and timestamp
    #[must_use]
    pub fn new(event_type: EventType, timestamp: f64) -> Self {
        Self {
            event_type,
            timestamp,
            args: HashMap::new(),
        }
    }

    /// Add an argument to the event (builder pattern)
    #[must_use]
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    #[must_use]
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Get `node` argument if present
    #[must_use]
    pub fn get_node(&self) -> Option<&str> {
        match self.get_arg("node") {
            Some(EventArg::Node(name)) => Some(name),
            _ => None,
        }
    }

    /// Get `position` argument if present
    #[must_use]
    pub fn get_position(&self) -> Option<(f32, f32)> {
        match self.get_arg("position") {
            Some(EventArg::Position(x, y)) => Some((*x, *y)),
            _ => None,
        }
    }

    /// Get `pointer` argument if present
    #[must_use]
    pub fn get_pointer(&self) -> Option<u32> {
        match self.get_arg("pointer") {
            Some(EventArg::Id(id)) => Some(*id),
            _ => None,
        }
    }

    /// Get `value` argument if present
    #[must_use]
    pub fn get_value(&self) -> Option<Fp> {
        match self.get_arg("value") {
            Some(EventArg::Value(v)) => Some(*v),
            _ => None,
        }
    }

    /// Get `size` argument if present
    #[must_use]
    pub fn get_size(&self) -> Option<(u32, u32)> {
        match self.get_arg("size") {
            Some(EventArg::Size(w, h)) => Some((*w, *h)),
            _ => None,
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

impl<F: FnMut(&Event) -> bool> EventHandler for F {
    fn on_event(&mut self, event: &Event) -> bool {
        self(event)
    }
}

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
#[derive(Default)]
pub struct EventSystem {
    immediate_queue: Vec<Event>,
    deferred_queue: Vec<(f64, Event)>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
    current_time: f64,
}

impl EventSystem {
    /// Create a new empty event system
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update current time (seconds since start)
    pub fn update_time(&mut self, time: f64) {
        self.current_time = time;
    }

    /// Current time (seconds since start)
    #[must_use]
    pub const fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Register a handler for a specific event type
    /// Only handlers registered for this type will be notified
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Send event for immediate handling at the next dispatch
    pub fn send(&mut self, event: Event) {
        self.immediate_queue.push(event);
    }

    /// Post event for deferred delivery at specified time
    pub fn post(&mut self, delivery_time: f64, event: Event) {
        self.deferred_queue.push((delivery_time, event));
    }

    /// Number of events waiting for delivery
    #[must_use]
    pub fn pending(&self) -> usize {
        self.immediate_queue.len() + self.deferred_queue.len()
    }

    /// Dispatch all pending events
    /// Processes immediate queue first, then due deferred events in posting order.
    /// Returns the number of events consumed by a handler.
    pub fn dispatch(&mut self) -> usize {
        let mut consumed = 0;

        let immediate = std::mem::take(&mut self.immediate_queue);
        for event in immediate {
            consumed += usize::from(self.dispatch_event(&event));
        }

        let now = self.current_time;
        let (due, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.deferred_queue).into_iter().partition(|(at, _)| *at <= now);
        self.deferred_queue = waiting;
        for (_, event) in due {
            consumed += usize::from(self.dispatch_event(&event));
        }

        consumed
    }

    /// Dispatch single event to registered handlers
    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &Event) -> bool {
        let Some(handlers) = self.handlers.get_mut(&event.event_type) else {
            log::trace!("No handler for {:?}", event.event_type);
            return false;
        };
        handlers.iter_mut().any(|handler| handler.on_event(event))
    }

    /// Clear all queued events (useful for state transitions)
    pub fn clear(&mut self) {
        self.immediate_queue.clear();
        self.deferred_queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestHandler {
        received: Rc<RefCell<Vec<EventType>>>,
        consume: bool,
    }

    impl EventHandler for TestHandler {
        fn on_event(&mut self, event: &Event) -> bool {
            self.received.borrow_mut().push(event.event_type);
            self.consume
        }
    }

    fn handler(consume: bool) -> (Box<TestHandler>, Rc<RefCell<Vec<EventType>>>) {
        let received = Rc::new(RefCell::new(Vec::new()));
        (
            Box::new(TestHandler {
                received: Rc::clone(&received),
                consume,
            }),
            received,
        )
    }

    #[test]
    fn test_immediate_dispatch() {
        let mut system = EventSystem::new();
        let (h, received) = handler(false);
        system.register_handler(EventType::NodeTouched, h);

        let event = Event::new(EventType::NodeTouched, 0.0)
            .with_arg("node", EventArg::Node("cube".to_string()))
            .with_arg("position", EventArg::Position(1.0, 2.0));
        assert_eq!(event.get_node(), Some("cube"));
        assert_eq!(event.get_position(), Some((1.0, 2.0)));
        system.send(event);
        system.send(Event::new(EventType::SurfaceChanged, 0.0));
        assert_eq!(system.dispatch(), 0);

        // Only the registered type reaches the handler
        assert_eq!(*received.borrow(), vec![EventType::NodeTouched]);
        assert_eq!(system.pending(), 0);
    }

    #[test]
    fn test_deferred_dispatch() {
        let mut system = EventSystem::new();
        let (h, received) = handler(true);
        system.register_handler(EventType::Custom(3), h);
        system.post(1.0, Event::new(EventType::Custom(3), 0.0));

        system.update_time(0.5);
        assert_eq!(system.dispatch(), 0);
        assert_eq!(system.pending(), 1);

        system.update_time(1.0);
        assert_eq!(system.dispatch(), 1);
        assert_eq!(system.pending(), 0);
        assert_eq!(received.borrow().len(), 1);
    }

    #[test]
    fn test_event_consumption() {
        let mut system = EventSystem::new();
        let (first, first_seen) = handler(true);
        let (second, second_seen) = handler(false);
        system.register_handler(EventType::Custom(7), first);
        system.register_handler(EventType::Custom(7), second);

        system.send(Event::new(EventType::Custom(7), 0.0));
        assert_eq!(system.dispatch(), 1);
        assert_eq!(first_seen.borrow().len(), 1);
        assert!(second_seen.borrow().is_empty());
    }

    #[test]
    fn test_closure_handler() {
        let mut system = EventSystem::new();
        let total = Rc::new(RefCell::new(Fp::ZERO));
        let sink = Rc::clone(&total);
        system.register_handler(
            EventType::Custom(1),
            Box::new(move |event: &Event| {
                *sink.borrow_mut() += event.get_value().unwrap_or(Fp::ZERO);
                true
            }),
        );
        system.send(Event::new(EventType::Custom(1), 0.0).with_arg("value", EventArg::Value(Fp::HALF)));
        system.send(Event::new(EventType::Custom(1), 0.0).with_arg("value", EventArg::Value(Fp::HALF)));
        system.dispatch();
        assert_eq!(*total.borrow(), Fp::ONE);
    }
}
