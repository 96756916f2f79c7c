//! Operand-stack words.
//!
//! The runtime ABI distinguishes unboxed integers (odd bit patterns,
//! `2n + 1`) from references (even bit patterns). The interpreter keeps
//! words as a closed sum instead of raw bit patterns; [`Word::tagged`]
//! reproduces the ABI encoding where it is observable.

use std::fmt::{self, Display, Formatter};

/// Index of an object slot in the runtime heap.
pub type Handle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    /// An unboxed 31-bit integer.
    Imm(i32),
    /// A reference to a heap object.
    Obj(Handle),
    /// The address of an operand-stack slot, produced by `LDA`.
    StackAddr(u32),
    /// The address of a closure capture slot, produced by `LDA` on a
    /// captured location.
    CaptureAddr(Handle, u32),
}

impl Word {
    pub const ZERO: Word = Word::Imm(0);

    pub fn as_int(self) -> Option<i32> {
        match self {
            Word::Imm(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_obj(self) -> Option<Handle> {
        match self {
            Word::Obj(h) => Some(h),
            _ => None,
        }
    }

    /// The ABI bit pattern of this word: integers are `2n + 1`, references
    /// are even.
    pub fn tagged(self) -> i64 {
        match self {
            Word::Imm(n) => (n as i64) * 2 + 1,
            Word::Obj(h) => (h as i64 + 1) << 1,
            Word::StackAddr(slot) => (slot as i64) << 1,
            Word::CaptureAddr(h, slot) => ((h as i64 + 1) << 33) | ((slot as i64) << 1),
        }
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Word::Imm(n) => write!(f, "{}", n),
            Word::Obj(h) => write!(f, "#{}", h),
            Word::StackAddr(slot) => write!(f, "@{}", slot),
            Word::CaptureAddr(h, slot) => write!(f, "#{}@{}", h, slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_tagging_is_two_n_plus_one() {
        assert_eq!(Word::Imm(7).tagged(), 15);
        assert_eq!(Word::Imm(0).tagged(), 1);
        assert_eq!(Word::Imm(-1).tagged(), -1);
        assert_eq!(Word::Imm(42).tagged(), 85);
    }

    #[test]
    fn references_have_the_low_bit_clear() {
        assert_eq!(Word::Obj(0).tagged() & 1, 0);
        assert_eq!(Word::StackAddr(123).tagged() & 1, 0);
        assert_eq!(Word::CaptureAddr(3, 1).tagged() & 1, 0);
    }
}
