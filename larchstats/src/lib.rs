//! Instruction-frequency mining over Larch bytecode: counts one- and
//! two-instruction idioms across the reachable code, never pairing across
//! a jump or a jump target.

pub mod stats;
