//! Descriptor of Larch bytecode.
//!
//! Opcodes are one byte: the high nibble selects a family, the low nibble a
//! sub-selector for the compound families (binary operators, memory
//! locations, pattern checks, built-in calls). The fixed single-byte
//! opcodes live in [`opcode`] so callers can classify a raw byte without a
//! full decode.

use num_enum::TryFromPrimitive;
use std::fmt::{self, Display, Formatter};

/// High nibbles of the compound opcode families.
pub mod family {
    pub const BINOP: u8 = 0x0;
    pub const LD: u8 = 0x2;
    pub const LDA: u8 = 0x3;
    pub const ST: u8 = 0x4;
    pub const PATT: u8 = 0x6;
    pub const LCALL: u8 = 0x7;
    pub const STOP: u8 = 0xF;
}

/// Raw bytes of the fixed single-byte opcodes.
pub mod opcode {
    pub const CONST: u8 = 0x10;
    pub const STRING: u8 = 0x11;
    pub const SEXP: u8 = 0x12;
    pub const STI: u8 = 0x13;
    pub const STA: u8 = 0x14;
    pub const JMP: u8 = 0x15;
    pub const END: u8 = 0x16;
    pub const RET: u8 = 0x17;
    pub const DROP: u8 = 0x18;
    pub const DUP: u8 = 0x19;
    pub const SWAP: u8 = 0x1A;
    pub const ELEM: u8 = 0x1B;
    pub const CJMP_Z: u8 = 0x50;
    pub const CJMP_NZ: u8 = 0x51;
    pub const BEGIN: u8 = 0x52;
    pub const CBEGIN: u8 = 0x53;
    pub const CLOSURE: u8 = 0x54;
    pub const CALLC: u8 = 0x55;
    pub const CALL: u8 = 0x56;
    pub const TAG: u8 = 0x57;
    pub const ARRAY: u8 = 0x58;
    pub const FAIL: u8 = 0x59;
    pub const LINE: u8 = 0x5A;
}

/// Binary operator selector, the low nibble of a `BINOP` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Binop {
    Add = 1, // +
    Sub,     // -
    Mul,     // *
    Div,     // /
    Rem,     // %
    Lt,      // <
    Le,      // <=
    Gt,      // >
    Ge,      // >=
    Eq,      // ==
    Ne,      // !=
    And,     // &&, both operands non-zero
    Or,      // !!, either operand non-zero
}

impl Binop {
    pub fn symbol(self) -> &'static str {
        match self {
            Binop::Add => "+",
            Binop::Sub => "-",
            Binop::Mul => "*",
            Binop::Div => "/",
            Binop::Rem => "%",
            Binop::Lt => "<",
            Binop::Le => "<=",
            Binop::Gt => ">",
            Binop::Ge => ">=",
            Binop::Eq => "==",
            Binop::Ne => "!=",
            Binop::And => "&&",
            Binop::Or => "!!",
        }
    }
}

/// Kind of a memory location, the low nibble of an `LD`/`LDA`/`ST` byte and
/// the kind byte of a closure capture entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Location {
    Global = 0,
    Local,
    Arg,      // function argument
    Captured, // captured by the enclosing closure
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Location::Global => "G",
            Location::Local => "L",
            Location::Arg => "A",
            Location::Captured => "C",
        };
        write!(f, "{}", letter)
    }
}

/// A location reference: kind plus index within that kind's region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationEntry {
    pub kind: Location,
    pub index: i32,
}

impl Display for LocationEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.index)
    }
}

/// Pattern check selector, the low nibble of a `PATT` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Pattern {
    String = 0, // structural equality of two strings
    StringTag,
    ArrayTag,
    SexpTag,
    Boxed,
    Unboxed,
    ClosureTag,
}

impl Pattern {
    pub fn symbol(self) -> &'static str {
        match self {
            Pattern::String => "=str",
            Pattern::StringTag => "#string",
            Pattern::ArrayTag => "#array",
            Pattern::SexpTag => "#sexp",
            Pattern::Boxed => "#ref",
            Pattern::Unboxed => "#val",
            Pattern::ClosureTag => "#fun",
        }
    }
}

/// Built-in runtime call, the low nibble of an `LCALL` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Read an integer from standard input.
    Read,
    /// Write an integer to standard output.
    Write,
    /// Length of a string, array or S-expression.
    Length,
    /// Render the top value into a fresh string.
    String,
    /// Collect `len` stack values into a fresh array.
    Array { len: i32 },
}

/// One decoded instruction, the event the decoder hands to its clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Pop two integers, push the result of the selected operator.
    Binop(Binop),
    /// Push a boxed integer constant.
    Const(i32),
    /// Push a fresh string copied from the string table.
    String { offset: i32 },
    /// Pop `fields` values, push a tagged S-expression holding them.
    Sexp { tag: i32, fields: i32 },
    /// Indirect store: pop value and address, store, re-push the value.
    Sti,
    /// Aggregate store: pop value, index and aggregate.
    Sta,
    Jmp { target: i32 },
    /// Return from the current function; also ends its definition.
    End,
    Ret,
    Drop,
    Dup,
    Swap,
    /// Pop index and aggregate, push the selected element.
    Elem,
    CJmpZ { target: i32 },
    CJmpNz { target: i32 },
    /// Push the value held at the location.
    Ld(LocationEntry),
    /// Push the location's address, twice.
    Lda(LocationEntry),
    /// Store the top value into the location; the value stays on the stack.
    St(LocationEntry),
    /// Function prologue: `args` arguments, `locals` local slots.
    Begin { args: i32, locals: i32 },
    /// Prologue of a function that may use captured variables.
    CBegin { args: i32, locals: i32 },
    /// Build a closure over `entry` with the listed captures.
    Closure { entry: i32, captures: Vec<LocationEntry> },
    /// Call the closure found under the top `args` stack values.
    CallC { args: i32 },
    Call { offset: i32, args: i32 },
    /// Check that the top value is an S-expression with the given tag and arity.
    Tag { tag: i32, arity: i32 },
    /// Check that the top value is an array of the given length.
    Array { len: i32 },
    /// Pattern-match failure at the given source position.
    Fail { line: i32, col: i32 },
    /// Source line marker; diagnostics only.
    Line { line: i32 },
    Patt(Pattern),
    LCall(Builtin),
    Stop,
}

/// Absolute code offset of an `i32` jump/call operand. Negative operands
/// wrap past any real code section and are caught by the bounds checks of
/// whoever walks the graph.
pub fn abs_target(target: i32) -> usize {
    target as u32 as usize
}

impl Instruction {
    /// Whether execution never falls through to the next instruction.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Instruction::End
                | Instruction::Ret
                | Instruction::Fail { .. }
                | Instruction::Stop
        )
    }

    /// Successor offsets within the enclosing function, given the offset of
    /// the next instruction. Call and closure targets are separate
    /// functions and are not successors here.
    pub fn successors(&self, next: usize, out: &mut Vec<usize>) {
        out.clear();
        match self {
            Instruction::Jmp { target } => out.push(abs_target(*target)),
            Instruction::CJmpZ { target } | Instruction::CJmpNz { target } => {
                out.push(abs_target(*target));
                out.push(next);
            }
            _ if self.is_terminal() => {}
            _ => out.push(next),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Binop(_) => "BINOP",
            Instruction::Const(_) => "CONST",
            Instruction::String { .. } => "STRING",
            Instruction::Sexp { .. } => "SEXP",
            Instruction::Sti => "STI",
            Instruction::Sta => "STA",
            Instruction::Jmp { .. } => "JMP",
            Instruction::End => "END",
            Instruction::Ret => "RET",
            Instruction::Drop => "DROP",
            Instruction::Dup => "DUP",
            Instruction::Swap => "SWAP",
            Instruction::Elem => "ELEM",
            Instruction::CJmpZ { .. } => "CJMPz",
            Instruction::CJmpNz { .. } => "CJMPnz",
            Instruction::Ld(_) => "LD",
            Instruction::Lda(_) => "LDA",
            Instruction::St(_) => "ST",
            Instruction::Begin { .. } => "BEGIN",
            Instruction::CBegin { .. } => "CBEGIN",
            Instruction::Closure { .. } => "CLOSURE",
            Instruction::CallC { .. } => "CALLC",
            Instruction::Call { .. } => "CALL",
            Instruction::Tag { .. } => "TAG",
            Instruction::Array { .. } => "ARRAY",
            Instruction::Fail { .. } => "FAIL",
            Instruction::Line { .. } => "LINE",
            Instruction::Patt(_) => "PATT",
            Instruction::LCall(_) => "LCALL",
            Instruction::Stop => "STOP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successors_of_jumps_and_terminals() {
        let mut out = Vec::new();

        Instruction::Jmp { target: 0x40 }.successors(10, &mut out);
        assert_eq!(out, vec![0x40]);

        Instruction::CJmpZ { target: 0x20 }.successors(10, &mut out);
        assert_eq!(out, vec![0x20, 10]);

        Instruction::Call { offset: 0x30, args: 2 }.successors(10, &mut out);
        assert_eq!(out, vec![10]);

        Instruction::End.successors(10, &mut out);
        assert!(out.is_empty());
        Instruction::Stop.successors(10, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn negative_targets_exceed_any_code_section() {
        assert!(abs_target(-1) > u32::MAX as usize / 2);
    }

    #[test]
    fn selector_conversions() {
        assert_eq!(Binop::try_from(1u8), Ok(Binop::Add));
        assert_eq!(Binop::try_from(13u8), Ok(Binop::Or));
        assert!(Binop::try_from(0u8).is_err());
        assert!(Binop::try_from(14u8).is_err());

        assert_eq!(Location::try_from(3u8), Ok(Location::Captured));
        assert!(Location::try_from(4u8).is_err());

        assert_eq!(Pattern::try_from(6u8), Ok(Pattern::ClosureTag));
        assert!(Pattern::try_from(7u8).is_err());
    }
}
