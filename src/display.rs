//! The monochrome framebuffer.
//!
//! The grid itself is only ever mutated by the instruction-handler thread;
//! renderers read it through [`SharedDisplay::snapshot`], which hands out a
//! consistent point-in-time copy rather than a live reference.

use std::sync::{Arc, Mutex};

pub const DEFAULT_WIDTH: usize = 64;
pub const DEFAULT_HEIGHT: usize = 32;

const SPRITE_WIDTH: usize = 8;

/// Fixed-size grid of pixel states with XOR sprite compositing.
pub struct Display {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Display {
    pub fn new(width: usize, height: usize) -> Display {
        Display {
            width: width,
            height: height,
            pixels: vec![false; width * height],
        }
    }

    pub fn clear(&mut self) {
        for pixel in self.pixels.iter_mut() {
            *pixel = false;
        }
    }

    /// XORs sprite rows onto the grid starting at `(x, y)`. Both coordinates
    /// wrap per pixel, so a run off the right edge continues in column 0 of
    /// the same row and rows past the bottom continue at the top. Returns
    /// true if any set pixel was toggled off.
    pub fn draw(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;

        for (sy, byte) in sprite.iter().enumerate() {
            let dy = (y + sy) % self.height;
            for sx in 0..SPRITE_WIDTH {
                let bit_mask = 0b1000_0000 >> sx;
                if (byte & bit_mask) != 0 {
                    let dx = (x + sx) % self.width;
                    let index = dy * self.width + dx;

                    if self.pixels[index] {
                        collision = true;
                    }
                    self.pixels[index] ^= true;
                }
            }
        }

        collision
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[y * self.width + x]
    }
}

/// An owned copy of the grid at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<bool>,
}

impl Frame {
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[y * self.width + x]
    }
}

/// Cloneable handle to the framebuffer, shared between the handler thread
/// and render collaborators.
#[derive(Clone)]
pub struct SharedDisplay {
    inner: Arc<Mutex<Display>>,
}

impl SharedDisplay {
    pub fn new(width: usize, height: usize) -> SharedDisplay {
        SharedDisplay {
            inner: Arc::new(Mutex::new(Display::new(width, height))),
        }
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn draw(&self, x: usize, y: usize, sprite: &[u8]) -> bool {
        self.inner.lock().unwrap().draw(x, y, sprite)
    }

    /// A consistent copy for rendering; no partial sprite write is ever
    /// visible in it.
    pub fn snapshot(&self) -> Frame {
        let display = self.inner.lock().unwrap();
        Frame {
            width: display.width,
            height: display.height,
            pixels: display.pixels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_sets_pixels_without_collision() {
        let mut display = Display::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        assert!(!display.draw(0, 0, &[0xFF]));
        for x in 0..8 {
            assert!(display.get(x, 0));
        }
        assert!(!display.get(8, 0));
    }

    #[test]
    fn drawing_twice_is_an_involution() {
        let mut display = Display::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        let sprite = [0xF0, 0x90, 0x90, 0x90, 0xF0];
        assert!(!display.draw(3, 5, &sprite));
        assert!(display.draw(3, 5, &sprite));
        for y in 0..DEFAULT_HEIGHT {
            for x in 0..DEFAULT_WIDTH {
                assert!(!display.get(x, y));
            }
        }
    }

    #[test]
    fn horizontal_wrap_is_per_pixel() {
        let mut display = Display::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        for y in 0..DEFAULT_HEIGHT {
            display.clear();
            display.draw(DEFAULT_WIDTH - 1, y, &[0xFF]);
            assert!(display.get(DEFAULT_WIDTH - 1, y));
            for x in 0..7 {
                assert!(display.get(x, y));
            }
        }
    }

    #[test]
    fn vertical_wrap_is_per_row() {
        let mut display = Display::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        display.draw(0, DEFAULT_HEIGHT - 1, &[0x80, 0x80]);
        assert!(display.get(0, DEFAULT_HEIGHT - 1));
        assert!(display.get(0, 0));
    }

    #[test]
    fn snapshot_is_an_owned_copy() {
        let display = SharedDisplay::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        let before = display.snapshot();
        display.draw(0, 0, &[0x80]);
        let after = display.snapshot();
        assert!(!before.get(0, 0));
        assert!(after.get(0, 0));
    }
}
