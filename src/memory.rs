use byteorder::{BigEndian, ByteOrder};

use {ErrorKind, Result};

pub const MEMORY_SIZE: usize = 0x1000;

/// First user-addressable byte. Everything below holds the built-in font
/// glyphs and is off limits to programs.
pub const USER_SPACE_START: u16 = 0x200;
pub const USER_SPACE_END: u16 = 0xFFF;

pub const FONT_OFFSET: u16 = 0;
pub const FONT_GLYPH_SIZE: u16 = 5;

#[cfg_attr(rustfmt, rustfmt_skip)]
const FONT_SPRITES: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Flat addressable memory. The font region is seeded once at construction
/// and never mutated afterwards; byte-level access is restricted to user
/// space.
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    pub fn new() -> Memory {
        let mut memory = Memory {
            bytes: [0; MEMORY_SIZE],
        };
        {
            let font_memory = &mut memory.bytes[FONT_OFFSET as usize..FONT_SPRITES.len()];
            font_memory.copy_from_slice(&FONT_SPRITES);
        }
        memory
    }

    /// Copies a program image into user space, truncating anything beyond
    /// capacity.
    pub fn load(&mut self, program: &[u8]) {
        let capacity = MEMORY_SIZE - USER_SPACE_START as usize;
        if program.len() > capacity {
            warn!(
                "program image is {} bytes, truncating to {}",
                program.len(),
                capacity
            );
        }
        let len = program.len().min(capacity);
        let user_space = &mut self.bytes[USER_SPACE_START as usize..USER_SPACE_START as usize + len];
        user_space.copy_from_slice(&program[..len]);
    }

    pub fn read_byte(&self, addr: u16) -> Result<u8> {
        self.check_user_space(addr)?;
        Ok(self.bytes[addr as usize])
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) -> Result<()> {
        self.check_user_space(addr)?;
        self.bytes[addr as usize] = value;
        Ok(())
    }

    /// Big-endian 16-bit read. Not restricted to user space: this is the
    /// instruction fetch path, and a word straddling the end of memory is
    /// the only invalid case.
    pub fn read_word(&self, addr: u16) -> Result<u16> {
        if addr as usize + 1 >= MEMORY_SIZE {
            bail!(ErrorKind::TruncatedWord(addr));
        }
        Ok(BigEndian::read_u16(&self.bytes[addr as usize..]))
    }

    /// A read-only view of `len` sprite rows starting at `addr`. Sprite data
    /// may live in the font region, so only capacity is checked.
    pub fn sprite(&self, addr: u16, len: u8) -> Result<&[u8]> {
        let from = addr as usize;
        let to = from + len as usize;
        if to > MEMORY_SIZE {
            bail!(ErrorKind::OutOfRangeAccess(addr));
        }
        Ok(&self.bytes[from..to])
    }

    /// Zeroes user space. The font region survives.
    pub fn reset(&mut self) {
        for byte in &mut self.bytes[USER_SPACE_START as usize..] {
            *byte = 0;
        }
    }

    fn check_user_space(&self, addr: u16) -> Result<()> {
        if addr < USER_SPACE_START || addr > USER_SPACE_END {
            bail!(ErrorKind::OutOfRangeAccess(addr));
        }
        Ok(())
    }
}
