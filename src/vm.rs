use rand;
use rand::Rng;
use std::fmt;

use display::SharedDisplay;
use instruction::{Fun, Instruction, InstructionWord, Reg};
use keypad::Keypad;
use memory::{self, Memory};
use regfile::RegFile;
use stack::Stack;
use timer::AsyncTimer;
use Result;

/// Machine state plus the instruction handlers. The CPU loop is the sole
/// writer of memory, registers, stack and program counter; the display,
/// keypad and timers are shared handles the execution engine and host also
/// hold.
pub struct Vm {
    memory: Memory,
    gpr: RegFile,
    stack: Stack,
    pc: u16,
    dt: AsyncTimer,
    st: AsyncTimer,
    display: SharedDisplay,
    keypad: Keypad,
}

impl Vm {
    pub fn new(display: SharedDisplay, keypad: Keypad, dt: AsyncTimer, st: AsyncTimer) -> Vm {
        Vm {
            memory: Memory::new(),
            gpr: RegFile::new(),
            stack: Stack::new(),
            pc: memory::USER_SPACE_START,
            dt: dt,
            st: st,
            display: display,
            keypad: keypad,
        }
    }

    /// Copies a program image into user space and rewinds the program
    /// counter to its base.
    pub fn load(&mut self, program: &[u8]) {
        self.memory.load(program);
        self.pc = memory::USER_SPACE_START;
        info!("loaded {} byte program image", program.len());
    }

    /// One fetch-decode-execute step.
    pub fn cycle(&mut self) -> Result<()> {
        let instruction_word = InstructionWord(self.memory.read_word(self.pc)?);
        let instruction = Instruction::decode(instruction_word)?;
        trace!("{:04x}: {:?}", self.pc, instruction);
        let next_pc = self.execute_instruction(instruction)?;
        self.pc = next_pc;

        Ok(())
    }

    /// Executes one decoded instruction and returns the next program
    /// counter. Control transfers return their target directly, so the
    /// default auto-increment never applies to them.
    fn execute_instruction(&mut self, instruction: Instruction) -> Result<u16> {
        use instruction::Instruction::*;

        let mut next_pc = self.pc + 2;

        match instruction {
            Sys(addr) => {
                // machine-code routines of the host CPU; nothing to run
                debug!("ignoring machine code routine at {:#05x}", addr.0);
            }
            ClearScreen => self.display.clear(),
            Ret => {
                next_pc = self.stack.pop()?;
            }
            Jump(addr) => {
                next_pc = addr.0;
            }
            Call(addr) => {
                self.stack.push(next_pc)?;
                next_pc = addr.0;
            }
            SkipEqImm { vx, imm, inv } => {
                if (self.gpr[vx] == imm.0) != inv {
                    next_pc += 2;
                }
            }
            SkipEqReg { vx, vy, inv } => {
                if (self.gpr[vx] == self.gpr[vy]) != inv {
                    next_pc += 2;
                }
            }
            PutImm { vx, imm } => {
                self.gpr[vx] = imm.0;
            }
            AddImm { vx, imm } => {
                let x = self.gpr[vx];
                self.gpr[vx] = x.wrapping_add(imm.0);
            }
            Apply { vx, vy, f } => {
                let x = self.gpr[vx];
                let y = self.gpr[vy];

                match f {
                    Fun::Id => {
                        self.gpr[vx] = y;
                    }
                    Fun::Or => {
                        self.gpr[vx] = x | y;
                    }
                    Fun::And => {
                        self.gpr[vx] = x & y;
                    }
                    Fun::Xor => {
                        self.gpr[vx] = x ^ y;
                    }
                    Fun::Add => {
                        let (v, overflow) = x.overflowing_add(y);
                        self.gpr[vx] = v;
                        self.gpr[Reg::Vf] = if overflow { 1 } else { 0 };
                    }
                    Fun::Subtract => {
                        let (v, borrow) = x.overflowing_sub(y);
                        self.gpr[vx] = v;
                        self.gpr[Reg::Vf] = if borrow { 0 } else { 1 };
                    }
                    Fun::ShiftRight => {
                        self.gpr[vx] = y >> 1;
                        self.gpr[Reg::Vf] = y & 0x01;
                    }
                    Fun::SubtractInv => {
                        let (v, borrow) = y.overflowing_sub(x);
                        self.gpr[vx] = v;
                        self.gpr[Reg::Vf] = if borrow { 0 } else { 1 };
                    }
                    Fun::ShiftLeft => {
                        self.gpr[vx] = y << 1;
                        self.gpr[Reg::Vf] = (y >> 7) & 0x01;
                    }
                }
            }
            SetI(addr) => {
                self.gpr.i = addr.0;
            }
            JumpPlusV0(addr) => {
                next_pc = addr.0.wrapping_add(self.gpr[Reg::V0] as u16);
            }
            Randomize { vx, imm } => {
                let random_byte = rand::thread_rng().gen::<u8>();
                self.gpr[vx] = random_byte & imm.0;
            }
            Draw { vx, vy, n } => {
                self.gpr[Reg::Vf] = 0;
                let x = self.gpr[vx] as usize;
                let y = self.gpr[vy] as usize;

                let collision = {
                    let sprite = self.memory.sprite(self.gpr.i, n.0)?;
                    self.display.draw(x, y, sprite)
                };

                self.gpr[Reg::Vf] = if collision { 1 } else { 0 };
                // a refresh is due on the next delay tick
                self.dt.set_action_requested(true);
            }
            SkipPressed { vx, inv } => {
                let x = self.gpr[vx];
                if (self.keypad.pressed() == Some(x)) != inv {
                    next_pc += 2;
                }
            }
            GetDT(vx) => {
                self.gpr[vx] = self.dt.counter();
            }
            WaitKey(vx) => {
                // no key latched: stay on this instruction, the timers and
                // the cancellation signal keep running
                match self.keypad.pressed() {
                    Some(key) => self.gpr[vx] = key,
                    None => next_pc = self.pc,
                }
            }
            SetDT(vx) => {
                self.dt.set_counter(self.gpr[vx]);
            }
            SetST(vx) => {
                let x = self.gpr[vx];
                self.st.set_counter(x);
                if x > 0 {
                    self.st.set_action_requested(true);
                }
            }
            AddI(vx) => {
                let x = self.gpr[vx] as u16;
                self.gpr.i = self.gpr.i.wrapping_add(x);
            }
            LoadGlyph(vx) => {
                let v = self.gpr[vx];
                self.gpr.i = memory::FONT_OFFSET + v as u16 * memory::FONT_GLYPH_SIZE;
            }
            StoreBCD(vx) => {
                let v = self.gpr[vx];
                let i = self.gpr.i;

                self.memory.write_byte(i, v / 100)?;
                self.memory.write_byte(i + 1, (v / 10) % 10)?;
                self.memory.write_byte(i + 2, v % 10)?;
            }
            StoreRegs(vx) => {
                let i = self.gpr.i;
                for offset in 0..(vx.index() as u16 + 1) {
                    let value = self.gpr.read_at_index(offset as usize);
                    self.memory.write_byte(i + offset, value)?;
                }
                self.gpr.i += vx.index() as u16 + 1;
            }
            LoadRegs(vx) => {
                let i = self.gpr.i;
                for offset in 0..(vx.index() as u16 + 1) {
                    let value = self.memory.read_byte(i + offset)?;
                    self.gpr.write_at_index(offset as usize, value);
                }
                self.gpr.i += vx.index() as u16 + 1;
            }
        }

        Ok(next_pc)
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Vm")
            .field("gpr", &self.gpr)
            .field("pc", &format!("{:04x}", self.pc))
            .field("dt", &format!("{:02x}", self.dt.counter()))
            .field("st", &format!("{:02x}", self.st.counter()))
            .field("stack", &self.stack)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use display::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

    fn vm() -> Vm {
        Vm::new(
            SharedDisplay::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            Keypad::new(),
            AsyncTimer::new(60),
            AsyncTimer::new(60),
        )
    }

    fn run_program(vm: &mut Vm, program: &[u8]) {
        vm.load(program);
        for _ in 0..program.len() / 2 {
            vm.cycle().unwrap();
        }
    }

    #[test]
    fn put_then_jump_leaves_pc_at_the_target() {
        let mut vm = vm();
        // V0 = 0x0A; jump 0x200
        run_program(&mut vm, &[0x60, 0x0A, 0x12, 0x00]);
        assert_eq!(10, vm.gpr[Reg::V0]);
        assert_eq!(0x200, vm.pc);
    }

    #[test]
    fn draw_via_cycle_sets_pixels_and_clears_vf() {
        let mut vm = vm();
        // V0 = 0; V1 = 0; I = 0x20A; draw 1 row at (V0, V1); data: 0xFF
        vm.load(&[0x60, 0x00, 0x61, 0x00, 0xA2, 0x0A, 0xD0, 0x11]);
        vm.memory.write_byte(0x20A, 0xFF).unwrap();
        for _ in 0..4 {
            vm.cycle().unwrap();
        }

        let frame = vm.display.snapshot();
        for x in 0..8 {
            assert!(frame.get(x, 0));
        }
        assert_eq!(0, vm.gpr[Reg::Vf]);
        // the draw requested a display refresh
        assert!(vm.dt.is_action_requested());
    }

    #[test]
    fn add_sets_the_carry_flag() {
        let mut vm = vm();
        // V0 = 0xFF; V1 = 0x02; V0 += V1
        run_program(&mut vm, &[0x60, 0xFF, 0x61, 0x02, 0x80, 0x14]);
        assert_eq!(0x01, vm.gpr[Reg::V0]);
        assert_eq!(1, vm.gpr[Reg::Vf]);

        // 0x01 + 0x02 does not carry
        vm.load(&[0x80, 0x14]);
        vm.gpr[Reg::V0] = 0x01;
        vm.cycle().unwrap();
        assert_eq!(0x03, vm.gpr[Reg::V0]);
        assert_eq!(0, vm.gpr[Reg::Vf]);
    }

    #[test]
    fn sub_sets_the_borrow_flag() {
        let mut vm = vm();
        // V0 = 0x02; V1 = 0x03; V0 -= V1 underflows
        run_program(&mut vm, &[0x60, 0x02, 0x61, 0x03, 0x80, 0x15]);
        assert_eq!(0xFF, vm.gpr[Reg::V0]);
        assert_eq!(0, vm.gpr[Reg::Vf]);

        // 0x05 - 0x03 does not borrow
        vm.load(&[0x80, 0x15]);
        vm.gpr[Reg::V0] = 0x05;
        vm.cycle().unwrap();
        assert_eq!(0x02, vm.gpr[Reg::V0]);
        assert_eq!(1, vm.gpr[Reg::Vf]);
    }

    #[test]
    fn shifts_take_the_source_from_vy() {
        let mut vm = vm();
        // V1 = 0x81; V0 = V1 >> 1
        run_program(&mut vm, &[0x61, 0x81, 0x80, 0x16]);
        assert_eq!(0x40, vm.gpr[Reg::V0]);
        assert_eq!(1, vm.gpr[Reg::Vf]);

        // V0 = V1 << 1
        vm.load(&[0x80, 0x1E]);
        vm.gpr[Reg::V1] = 0x81;
        vm.cycle().unwrap();
        assert_eq!(0x02, vm.gpr[Reg::V0]);
        assert_eq!(1, vm.gpr[Reg::Vf]);
    }

    #[test]
    fn skip_instructions_step_over_the_next_word() {
        let mut vm = vm();
        // V0 = 0x42; skip if V0 == 0x42
        run_program(&mut vm, &[0x60, 0x42, 0x30, 0x42]);
        assert_eq!(0x206, vm.pc);

        // skip if V0 != 0x42 does not fire
        vm.load(&[0x60, 0x42, 0x40, 0x42]);
        vm.cycle().unwrap();
        vm.cycle().unwrap();
        assert_eq!(0x204, vm.pc);
    }

    #[test]
    fn call_and_ret_restore_the_pc() {
        let mut vm = vm();
        vm.load(&[0x22, 0x04, 0x00, 0x00, 0x00, 0xEE]);
        vm.cycle().unwrap();
        assert_eq!(0x204, vm.pc);
        vm.cycle().unwrap();
        assert_eq!(0x202, vm.pc);
    }

    #[test]
    fn ret_with_an_empty_stack_faults() {
        let mut vm = vm();
        vm.load(&[0x00, 0xEE]);
        assert!(vm.cycle().is_err());
    }

    #[test]
    fn bcd_writes_three_digits() {
        let mut vm = vm();
        // V0 = 0xFE (254); I = 0x300; BCD of V0
        run_program(&mut vm, &[0x60, 0xFE, 0xA3, 0x00, 0xF0, 0x33]);
        assert_eq!(2, vm.memory.read_byte(0x300).unwrap());
        assert_eq!(5, vm.memory.read_byte(0x301).unwrap());
        assert_eq!(4, vm.memory.read_byte(0x302).unwrap());
    }

    #[test]
    fn store_and_load_register_ranges() {
        let mut vm = vm();
        // V0..V2 = 1, 2, 3; I = 0x300; dump V0..V2
        run_program(
            &mut vm,
            &[
                0x60, 0x01, 0x61, 0x02, 0x62, 0x03, 0xA3, 0x00, 0xF2, 0x55,
            ],
        );
        assert_eq!(1, vm.memory.read_byte(0x300).unwrap());
        assert_eq!(2, vm.memory.read_byte(0x301).unwrap());
        assert_eq!(3, vm.memory.read_byte(0x302).unwrap());
        assert_eq!(0x303, vm.gpr.i);

        // load them back into a clean register file
        vm.load(&[0xA3, 0x00, 0xF2, 0x65]);
        vm.gpr = RegFile::new();
        vm.cycle().unwrap();
        vm.cycle().unwrap();
        assert_eq!(1, vm.gpr[Reg::V0]);
        assert_eq!(2, vm.gpr[Reg::V1]);
        assert_eq!(3, vm.gpr[Reg::V2]);
    }

    #[test]
    fn store_regs_outside_user_space_faults() {
        let mut vm = vm();
        // I = 0x000 points into the font region
        vm.load(&[0xA0, 0x00, 0xF0, 0x55]);
        vm.cycle().unwrap();
        assert!(vm.cycle().is_err());
    }

    #[test]
    fn wait_key_blocks_until_a_key_is_latched() {
        let mut vm = vm();
        vm.load(&[0xF0, 0x0A]);
        vm.cycle().unwrap();
        assert_eq!(0x200, vm.pc);
        vm.cycle().unwrap();
        assert_eq!(0x200, vm.pc);

        vm.keypad.press(0xB);
        vm.cycle().unwrap();
        assert_eq!(0x202, vm.pc);
        assert_eq!(0xB, vm.gpr[Reg::V0]);
    }

    #[test]
    fn skip_pressed_consults_the_latch() {
        let mut vm = vm();
        vm.load(&[0x60, 0x07, 0xE0, 0x9E]);
        vm.keypad.press(0x7);
        vm.cycle().unwrap();
        vm.cycle().unwrap();
        assert_eq!(0x206, vm.pc);

        vm.load(&[0x60, 0x07, 0xE0, 0xA1]);
        vm.cycle().unwrap();
        vm.cycle().unwrap();
        assert_eq!(0x204, vm.pc);
    }

    #[test]
    fn sound_timer_write_sets_the_latch() {
        let mut vm = vm();
        run_program(&mut vm, &[0x60, 0x05, 0xF0, 0x18]);
        assert_eq!(5, vm.st.counter());
        assert!(vm.st.is_action_requested());

        // a zero write leaves the latch untouched
        let mut vm = self::vm();
        run_program(&mut vm, &[0x60, 0x00, 0xF0, 0x18]);
        assert_eq!(0, vm.st.counter());
        assert!(!vm.st.is_action_requested());
    }

    #[test]
    fn delay_timer_roundtrip() {
        let mut vm = vm();
        run_program(&mut vm, &[0x60, 0x2A, 0xF0, 0x15, 0xF1, 0x07]);
        assert_eq!(0x2A, vm.gpr[Reg::V1]);
    }

    #[test]
    fn glyph_addressing() {
        let mut vm = vm();
        run_program(&mut vm, &[0x60, 0x0A, 0xF0, 0x29]);
        assert_eq!(10 * 5, vm.gpr.i);
    }

    #[test]
    fn unknown_opcode_faults() {
        let mut vm = vm();
        vm.load(&[0xFD, 0xEF]);
        assert!(vm.cycle().is_err());
    }
}
