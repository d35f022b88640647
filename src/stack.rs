use {ErrorKind, Result};

pub const STACK_DEPTH: usize = 16;

/// Bounded stack of subroutine return addresses. Exceeding the depth is a
/// resource exhaustion error, never silent corruption.
#[derive(Debug)]
pub struct Stack {
    sp: usize,
    frames: [u16; STACK_DEPTH],
}

impl Stack {
    pub fn new() -> Stack {
        Stack {
            sp: 0,
            frames: [0; STACK_DEPTH],
        }
    }

    pub fn push(&mut self, value: u16) -> Result<()> {
        if self.sp == STACK_DEPTH {
            bail!(ErrorKind::StackOverflow);
        }
        self.frames[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        if self.sp == 0 {
            bail!(ErrorKind::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.frames[self.sp])
    }
}
