//! Ring of temporaries
//!
//! Expression results live in `t0..t6`, handed out in LIFO order. The
//! eighth outstanding register wraps around to `t0`, spilling its previous
//! value onto the stack until it is released again.

use log::warn;

use super::asm::{Register, RiscVBackend};

const WORD: i32 = 4;

pub const TEMPORARIES: [Register; 7] = [
    Register::T0,
    Register::T1,
    Register::T2,
    Register::T3,
    Register::T4,
    Register::T5,
    Register::T6,
];

const RING: usize = TEMPORARIES.len();

/// LIFO allocator over [`TEMPORARIES`]
#[derive(Debug, Default)]
pub struct RegisterRing {
    /// Outstanding acquisitions
    used: usize,
    /// Values of `used` set aside by [`RegisterRing::save_busy`]
    saved: Vec<usize>,
}

impl RegisterRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding registers
    #[cfg(test)]
    pub fn in_use(&self) -> usize {
        self.used
    }

    fn spilled(&self) -> usize {
        self.used.saturating_sub(RING)
    }

    /// Whether releasing the newest register emits a reload
    pub fn release_reloads(&self) -> bool {
        self.used > RING
    }

    /// Hand out the next register, spilling its old value when the ring
    /// has wrapped.
    pub fn acquire(&mut self, asm: &mut RiscVBackend) -> Register {
        let reg = TEMPORARIES[self.used % RING];
        if self.used >= RING {
            asm.addi(Register::Sp, Register::Sp, -WORD, "spill");
            asm.sw(reg, Register::Sp, 0, "");
        }
        self.used += 1;
        reg
    }

    /// Give back the most recently acquired register, reloading a spilled
    /// value it covered.
    pub fn release(&mut self, asm: &mut RiscVBackend, reg: Register) {
        if self.used == 0 {
            warn!("release of {} with no register outstanding", reg);
            return;
        }
        self.used -= 1;
        let expected = TEMPORARIES[self.used % RING];
        if expected != reg {
            warn!("out-of-order release: expected {}, got {}", expected, reg);
        }
        if self.used >= RING {
            asm.lw(expected, Register::Sp, 0, "reload");
            asm.addi(Register::Sp, Register::Sp, WORD, "");
        }
    }

    /// Store every live register before a call and start over with an
    /// empty ring.
    pub fn save_busy(&mut self, asm: &mut RiscVBackend) {
        let live = self.used.min(RING);
        if live > 0 {
            asm.addi(Register::Sp, Register::Sp, -(live as i32) * WORD, "save busy registers");
            for (i, reg) in TEMPORARIES.iter().take(live).enumerate() {
                asm.sw(*reg, Register::Sp, i as i32 * WORD, "");
            }
        }
        self.saved.push(self.used);
        self.used = 0;
    }

    /// Undo the matching [`RegisterRing::save_busy`]
    pub fn load_busy(&mut self, asm: &mut RiscVBackend) {
        if self.used != 0 {
            warn!("{} register(s) still held across a call", self.used);
        }
        let Some(used) = self.saved.pop() else {
            warn!("load_busy without matching save_busy");
            return;
        };
        let live = used.min(RING);
        if live > 0 {
            for (i, reg) in TEMPORARIES.iter().take(live).enumerate() {
                asm.lw(*reg, Register::Sp, i as i32 * WORD, "");
            }
            asm.addi(Register::Sp, Register::Sp, live as i32 * WORD, "restore busy registers");
        }
        self.used = used;
    }

    /// Drop spilled words from the stack ahead of a jump out of the
    /// function body. The ring keeps its state for the code that follows.
    pub fn force_free(&self, asm: &mut RiscVBackend) {
        let spilled = self.spilled();
        if spilled > 0 {
            asm.addi(Register::Sp, Register::Sp, spilled as i32 * WORD, "drop spills");
        }
    }
}
