//! The countdown timers.
//!
//! A timer's counter and action latch are written from two logical threads:
//! the timer's own tick loop (the single decrementing writer) and the
//! instruction handlers (explicit counter/latch writes). Both go through one
//! mutex per timer, so every read-modify-write is atomic with respect to the
//! other side.

use std::sync::{Arc, Mutex};
use std::time::Duration;

struct TimerState {
    counter: u8,
    action_requested: bool,
}

/// The counter and latch values observed at the end of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub counter: u8,
    pub action_requested: bool,
}

/// Cloneable handle to one countdown timer (delay or sound).
#[derive(Clone)]
pub struct AsyncTimer {
    state: Arc<Mutex<TimerState>>,
    tick_period: Duration,
}

impl AsyncTimer {
    pub fn new(tick_rate: u32) -> AsyncTimer {
        AsyncTimer {
            state: Arc::new(Mutex::new(TimerState {
                counter: 0,
                action_requested: false,
            })),
            tick_period: Duration::from_secs(1) / tick_rate,
        }
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// One tick: a nonzero counter decrements by one, zero stays zero.
    /// Decrement and latch read happen in the same critical section, and the
    /// post-tick state is returned so the tick consumer decides on a side
    /// effect without a second lock.
    pub fn tick(&self) -> TimerTick {
        let mut state = self.state.lock().unwrap();
        if state.counter > 0 {
            state.counter -= 1;
        }
        TimerTick {
            counter: state.counter,
            action_requested: state.action_requested,
        }
    }

    pub fn counter(&self) -> u8 {
        self.state.lock().unwrap().counter
    }

    /// Stores the written value unconditionally. Writing the counter never
    /// touches the latch; handlers set that separately.
    pub fn set_counter(&self, value: u8) {
        self.state.lock().unwrap().counter = value;
    }

    pub fn is_action_requested(&self) -> bool {
        self.state.lock().unwrap().action_requested
    }

    pub fn set_action_requested(&self, requested: bool) {
        self.state.lock().unwrap().action_requested = requested;
    }
}
