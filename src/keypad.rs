use std::sync::{Arc, Mutex};

/// The input latch: the currently pressed key value, if any.
///
/// Written by the host's input loop, read by the skip-on-key and key-wait
/// handlers on the CPU thread.
#[derive(Clone)]
pub struct Keypad {
    pressed: Arc<Mutex<Option<u8>>>,
}

impl Keypad {
    pub fn new() -> Keypad {
        Keypad {
            pressed: Arc::new(Mutex::new(None)),
        }
    }

    /// Latches a key value. The keypad has 16 keys; anything else is
    /// ignored.
    pub fn press(&self, key: u8) {
        if key > 0xF {
            warn!("ignoring key value {:#04x}, keypad has keys 0..16", key);
            return;
        }
        *self.pressed.lock().unwrap() = Some(key);
    }

    pub fn release(&self) {
        *self.pressed.lock().unwrap() = None;
    }

    pub fn pressed(&self) -> Option<u8> {
        *self.pressed.lock().unwrap()
    }
}
