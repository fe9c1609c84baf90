//! Input event queue
//!
//! Pointer and key events are captured on a producer context (the platform's UI
//! thread) and queued FIFO for the update pass. The queue is bounded; when it
//! fills up the [`OverflowPolicy`] decides which event is lost. Pointer moves
//! are additionally throttled on the producer side, so a flood of moves slows
//! the producer down instead of the frame loop.

use crate::core::config::InputConfig;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A discrete input event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer touched down
    PointerDown {
        /// Pointer identifier
        id: u32,
        /// X in pixels
        x: f32,
        /// Y in pixels
        y: f32,
    },
    /// Pointer moved while down
    PointerMove {
        /// Pointer identifier
        id: u32,
        /// X in pixels
        x: f32,
        /// Y in pixels
        y: f32,
    },
    /// Pointer lifted
    PointerUp {
        /// Pointer identifier
        id: u32,
        /// X in pixels
        x: f32,
        /// Y in pixels
        y: f32,
    },
    /// Key pressed
    KeyDown(KeyCode),
    /// Key released
    KeyUp(KeyCode),
}

impl InputEvent {
    /// Pointer position, for pointer events
    #[must_use]
    pub const fn position(&self) -> Option<(f32, f32)> {
        match *self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y, .. } | Self::PointerUp { x, y, .. } => {
                Some((x, y))
            }
            Self::KeyDown(_) | Self::KeyUp(_) => None,
        }
    }

    /// Whether this is a pointer move
    #[must_use]
    pub const fn is_move(&self) -> bool {
        matches!(self, Self::PointerMove { .. })
    }
}

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    /// Up arrow / d-pad up
    Up,
    /// Down arrow / d-pad down
    Down,
    /// Left arrow / d-pad left
    Left,
    /// Right arrow / d-pad right
    Right,
    /// Centre / select
    Select,
    /// Back
    Back,
    /// Menu
    Menu,
    /// Space
    Space,
    /// Enter
    Enter,
    /// Escape
    Escape,
    /// Any other key, by platform scan code
    Other(u32),
}

/// What to do when an event arrives at a full queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Evict the oldest queued event to make room
    #[default]
    DropOldest,
    /// Discard the incoming event
    DropNewest,
}

/// Bounded input queue
///
/// Created from an [`InputConfig`] and split into its producer and consumer halves.
pub struct InputQueue {
    sender: InputSender,
    receiver: InputReceiver,
}

impl InputQueue {
    /// Create a queue holding at most `capacity` events
    #[must_use]
    pub fn new(capacity: usize, policy: OverflowPolicy, throttle: Duration) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            sender: InputSender {
                tx,
                evict: (policy == OverflowPolicy::DropOldest).then(|| rx.clone()),
                policy,
                throttle,
                last_accepted: None,
                dropped: 0,
            },
            receiver: InputReceiver { rx },
        }
    }

    /// Create a queue from configuration
    #[must_use]
    pub fn from_config(config: &InputConfig) -> Self {
        Self::new(config.capacity, config.overflow, Duration::from_millis(config.throttle_ms))
    }

    /// Split into producer and consumer halves
    #[must_use]
    pub fn split(self) -> (InputSender, InputReceiver) {
        (self.sender, self.receiver)
    }
}

/// Producer half of the input queue
pub struct InputSender {
    tx: Sender<InputEvent>,
    // Second receiver handle, only present under DropOldest
    evict: Option<Receiver<InputEvent>>,
    policy: OverflowPolicy,
    throttle: Duration,
    last_accepted: Option<Instant>,
    dropped: u64,
}

impl InputSender {
    /// Queue an event.
    ///
    /// Pointer moves arriving within the throttle interval of the previous
    /// accepted event block the caller for the remainder of the interval.
    /// Returns `false` if the event itself was dropped or the consumer is gone.
    pub fn send(&mut self, event: InputEvent) -> bool {
        if !self.consumer_alive() {
            log::debug!("Input consumer disconnected, dropping {event:?}");
            return false;
        }
        if event.is_move() {
            self.wait_for_throttle();
        }

        let mut pending = event;
        // One eviction frees a slot; the retry only fails if it was refilled meanwhile
        for _ in 0..2 {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    self.last_accepted = Some(Instant::now());
                    return true;
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::debug!("Input consumer disconnected, dropping {event:?}");
                    return false;
                }
                Err(TrySendError::Full(rejected)) => match self.policy {
                    OverflowPolicy::DropNewest => {
                        self.dropped += 1;
                        log::warn!("Input queue full, dropping newest event {rejected:?}");
                        return false;
                    }
                    OverflowPolicy::DropOldest => {
                        if let Some(Ok(oldest)) = self.evict.as_ref().map(Receiver::try_recv) {
                            self.dropped += 1;
                            log::warn!("Input queue full, dropping oldest event {oldest:?}");
                        }
                        pending = rejected;
                    }
                },
            }
        }

        self.dropped += 1;
        log::warn!("Input queue still full, dropping {pending:?}");
        false
    }

    /// Events lost to overflow so far
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    // The eviction handle keeps the channel connected on its own
    fn consumer_alive(&self) -> bool {
        let own = usize::from(self.evict.is_some());
        self.tx.receiver_count() > own
    }

    fn wait_for_throttle(&self) {
        if let Some(last) = self.last_accepted {
            let since = last.elapsed();
            if since < self.throttle {
                std::thread::sleep(self.throttle - since);
            }
        }
    }
}

/// Consumer half of the input queue
pub struct InputReceiver {
    rx: Receiver<InputEvent>,
}

impl InputReceiver {
    /// Take every queued event, oldest first (non-blocking)
    #[must_use]
    pub fn drain(&self) -> Vec<InputEvent> {
        self.rx.try_iter().collect()
    }

    /// Take one event (non-blocking)
    #[must_use]
    pub fn try_recv(&self) -> Option<InputEvent> {
        self.rx.try_recv().ok()
    }

    /// Number of queued events
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.rx.len()
    }

    /// Whether any events are queued
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(id: u32) -> InputEvent {
        InputEvent::PointerDown { id, x: 0.0, y: 0.0 }
    }

    #[test]
    fn test_fifo_order() {
        let (mut tx, rx) = InputQueue::new(8, OverflowPolicy::DropOldest, Duration::ZERO).split();
        assert!(tx.send(down(1)));
        assert!(tx.send(InputEvent::KeyDown(KeyCode::Back)));
        assert!(tx.send(down(2)));
        assert_eq!(rx.pending_count(), 3);
        assert_eq!(rx.drain(), vec![down(1), InputEvent::KeyDown(KeyCode::Back), down(2)]);
        assert!(!rx.has_events());
    }

    #[test]
    fn test_drop_oldest() {
        let (mut tx, rx) = InputQueue::new(2, OverflowPolicy::DropOldest, Duration::ZERO).split();
        for id in 1..=4 {
            assert!(tx.send(down(id)));
        }
        assert_eq!(tx.dropped(), 2);
        assert_eq!(rx.drain(), vec![down(3), down(4)]);
    }

    #[test]
    fn test_drop_newest() {
        let (mut tx, rx) = InputQueue::new(2, OverflowPolicy::DropNewest, Duration::ZERO).split();
        assert!(tx.send(down(1)));
        assert!(tx.send(down(2)));
        assert!(!tx.send(down(3)));
        assert_eq!(tx.dropped(), 1);
        assert_eq!(rx.drain(), vec![down(1), down(2)]);
    }

    #[test]
    fn test_disconnected_consumer() {
        for policy in [OverflowPolicy::DropNewest, OverflowPolicy::DropOldest] {
            let (mut tx, rx) = InputQueue::new(2, policy, Duration::ZERO).split();
            drop(rx);
            assert!(!tx.send(down(1)), "{policy:?}");
            assert!(!tx.send(InputEvent::KeyDown(KeyCode::Up)), "{policy:?}");
            assert_eq!(tx.dropped(), 0);
        }
    }

    #[test]
    fn test_pointer_moves_are_throttled() {
        let throttle = Duration::from_millis(20);
        let (mut tx, rx) = InputQueue::new(8, OverflowPolicy::DropOldest, throttle).split();
        let start = Instant::now();
        assert!(tx.send(InputEvent::PointerMove { id: 0, x: 1.0, y: 1.0 }));
        assert!(tx.send(InputEvent::PointerMove { id: 0, x: 2.0, y: 2.0 }));
        assert!(tx.send(InputEvent::PointerMove { id: 0, x: 3.0, y: 3.0 }));
        assert!(start.elapsed() >= throttle * 2);
        assert_eq!(rx.drain().len(), 3);
    }

    #[test]
    fn test_position() {
        assert_eq!(InputEvent::PointerUp { id: 0, x: 3.0, y: 4.0 }.position(), Some((3.0, 4.0)));
        assert_eq!(InputEvent::KeyUp(KeyCode::Menu).position(), None);
    }
}
