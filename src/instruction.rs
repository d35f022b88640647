//! Instruction word decoding.
//!
//! Every fetched 16-bit word is split into the five conventional operand
//! views (opcode group, two register nibbles, 4/8-bit immediates and the
//! 12-bit address) regardless of which of them the opcode actually uses.
//! `Instruction::decode` is the dispatch table: a word either maps to
//! exactly one variant or is a fatal decode error.

use enum_primitive::FromPrimitive;

error_chain! {
    errors {
        UnknownOpcode(word: u16) {
            description("unknown opcode")
            display("no handler for instruction word {:#06x}", word)
        }
    }
}

enum_from_primitive! {
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    V0 = 0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    Va,
    Vb,
    Vc,
    Vd,
    Ve,
    Vf,
}
}

impl Reg {
    pub fn index(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Imm(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Imm4(pub u8);

/// A raw instruction word and its bit-masked operand views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionWord(pub u16);

impl InstructionWord {
    pub fn opcode_group(&self) -> u8 {
        ((self.0 & 0xF000) >> 12) as u8
    }

    pub fn x(&self) -> Reg {
        reg(((self.0 & 0x0F00) >> 8) as u8)
    }

    pub fn y(&self) -> Reg {
        reg(((self.0 & 0x00F0) >> 4) as u8)
    }

    pub fn n(&self) -> Imm4 {
        Imm4((self.0 & 0x000F) as u8)
    }

    pub fn nn(&self) -> Imm {
        Imm((self.0 & 0x00FF) as u8)
    }

    pub fn nnn(&self) -> Addr {
        Addr(self.0 & 0x0FFF)
    }
}

fn reg(nibble: u8) -> Reg {
    // nibble is masked to 4 bits, so every value names a register
    Reg::from_u8(nibble).expect("register nibble in 0..16")
}

/// The binary function selected by the `8xy_` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fun {
    Id,
    Or,
    And,
    Xor,
    Add,
    Subtract,
    ShiftRight,
    SubtractInv,
    ShiftLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 0nnn machine-code routine; decoded but ignored at execution.
    Sys(Addr),
    ClearScreen,
    Ret,
    Jump(Addr),
    Call(Addr),
    SkipEqImm { vx: Reg, imm: Imm, inv: bool },
    SkipEqReg { vx: Reg, vy: Reg, inv: bool },
    PutImm { vx: Reg, imm: Imm },
    AddImm { vx: Reg, imm: Imm },
    Apply { vx: Reg, vy: Reg, f: Fun },
    SetI(Addr),
    JumpPlusV0(Addr),
    Randomize { vx: Reg, imm: Imm },
    Draw { vx: Reg, vy: Reg, n: Imm4 },
    SkipPressed { vx: Reg, inv: bool },
    GetDT(Reg),
    WaitKey(Reg),
    SetDT(Reg),
    SetST(Reg),
    AddI(Reg),
    LoadGlyph(Reg),
    StoreBCD(Reg),
    StoreRegs(Reg),
    LoadRegs(Reg),
}

impl Instruction {
    pub fn decode(word: InstructionWord) -> Result<Instruction> {
        use self::Instruction::*;

        let instruction = match word.opcode_group() {
            0x0 => match word.0 & 0x0FFF {
                0x0E0 => ClearScreen,
                0x0EE => Ret,
                _ => Sys(word.nnn()),
            },
            0x1 => Jump(word.nnn()),
            0x2 => Call(word.nnn()),
            0x3 => SkipEqImm {
                vx: word.x(),
                imm: word.nn(),
                inv: false,
            },
            0x4 => SkipEqImm {
                vx: word.x(),
                imm: word.nn(),
                inv: true,
            },
            0x5 if word.n().0 == 0 => SkipEqReg {
                vx: word.x(),
                vy: word.y(),
                inv: false,
            },
            0x6 => PutImm {
                vx: word.x(),
                imm: word.nn(),
            },
            0x7 => AddImm {
                vx: word.x(),
                imm: word.nn(),
            },
            0x8 => {
                let f = match word.n().0 {
                    0x0 => Fun::Id,
                    0x1 => Fun::Or,
                    0x2 => Fun::And,
                    0x3 => Fun::Xor,
                    0x4 => Fun::Add,
                    0x5 => Fun::Subtract,
                    0x6 => Fun::ShiftRight,
                    0x7 => Fun::SubtractInv,
                    0xE => Fun::ShiftLeft,
                    _ => bail!(ErrorKind::UnknownOpcode(word.0)),
                };
                Apply {
                    vx: word.x(),
                    vy: word.y(),
                    f: f,
                }
            }
            0x9 if word.n().0 == 0 => SkipEqReg {
                vx: word.x(),
                vy: word.y(),
                inv: true,
            },
            0xA => SetI(word.nnn()),
            0xB => JumpPlusV0(word.nnn()),
            0xC => Randomize {
                vx: word.x(),
                imm: word.nn(),
            },
            0xD => Draw {
                vx: word.x(),
                vy: word.y(),
                n: word.n(),
            },
            0xE => match word.nn().0 {
                0x9E => SkipPressed {
                    vx: word.x(),
                    inv: false,
                },
                0xA1 => SkipPressed {
                    vx: word.x(),
                    inv: true,
                },
                _ => bail!(ErrorKind::UnknownOpcode(word.0)),
            },
            0xF => match word.nn().0 {
                0x07 => GetDT(word.x()),
                0x0A => WaitKey(word.x()),
                0x15 => SetDT(word.x()),
                0x18 => SetST(word.x()),
                0x1E => AddI(word.x()),
                0x29 => LoadGlyph(word.x()),
                0x33 => StoreBCD(word.x()),
                0x55 => StoreRegs(word.x()),
                0x65 => LoadRegs(word.x()),
                _ => bail!(ErrorKind::UnknownOpcode(word.0)),
            },
            _ => bail!(ErrorKind::UnknownOpcode(word.0)),
        };

        Ok(instruction)
    }
}
