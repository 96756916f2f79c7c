//! Static verifier for Larch bytecode: proves stack discipline, jump
//! containment and location bounds over every function reachable from the
//! image's entry points, so the interpreter can treat verified code as
//! well-formed.

pub mod verifier;
