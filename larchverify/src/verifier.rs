//! Pre-execution verification of a loaded bytecode image.
//!
//! The verifier runs in three steps. A reachability worklist walks the
//! code graph from the entry points, discovering functions lazily at call
//! and closure sites and checking that every target points at a prologue.
//! Each discovered function body then gets an abstract pass: a worklist
//! carrying the operand-stack depth, with fixed per-instruction deltas,
//! location bounds checks and jump collection; a join reached with two
//! different depths is a verification failure. Finally every recorded call
//! site must have at least as many values on the stack as the callee's
//! observed argument requirement.

use bitvec::vec::BitVec;
use larchcore::bytecode::{abs_target, opcode, Builtin, Instruction, Location, LocationEntry, Pattern};
use larchcore::bytefile::Bytefile;
use larchcore::decoder::{Decoder, DecoderError};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifierError {
    #[error(transparent)]
    Decode(#[from] DecoderError),
    #[error("main is not a public symbol of this file")]
    NoEntrypoint,
    #[error("stack underflow at {offset:#010x}")]
    StackUnderflow { offset: usize },
    #[error("inconsistent stack depth at {offset:#010x}: {recorded} joins {incoming}")]
    InconsistentStackDepth {
        offset: usize,
        recorded: i64,
        incoming: i64,
    },
    #[error("nested function prologue at {offset:#010x}")]
    NestedBegin { offset: usize },
    #[error(
        "jump at {offset:#010x} leaves its function (target {target:#010x}, \
         body {begin:#010x}..{end:#010x})"
    )]
    JumpOutOfFunction {
        offset: usize,
        target: usize,
        begin: usize,
        end: usize,
    },
    #[error(
        "call at {offset:#010x} is short of arguments ({depth} on the stack, \
         callee wants {min_args})"
    )]
    ArgsUnderflow {
        offset: usize,
        depth: i64,
        min_args: i64,
    },
    #[error(
        "memory access failed at {offset:#010x}: {location} is out of bounds \
         ({limit} available)"
    )]
    BadLocation {
        offset: usize,
        location: LocationEntry,
        limit: i64,
    },
    #[error("call target {target:#010x} at {offset:#010x} is not a BEGIN")]
    BadCallTarget { offset: usize, target: usize },
    #[error("closure target {target:#010x} at {offset:#010x} is not a BEGIN or CBEGIN")]
    BadClosureTarget { offset: usize, target: usize },
    #[error("control leaves the code section at {offset:#010x} (target {target:#010x})")]
    TargetOutOfCode { offset: usize, target: usize },
}

/// Verify everything reachable from the image's entry points.
pub fn verify(bf: &Bytefile) -> Result<(), VerifierError> {
    let entrypoints = bf.entry_points();
    if entrypoints.is_empty() {
        return Err(VerifierError::NoEntrypoint);
    }
    Verifier { bf }.verify(&entrypoints)
}

/// A discovered function: its prologue offset, and the capture count when
/// it was discovered as a closure target.
struct Func {
    begin: usize,
    captured: Option<usize>,
}

/// Result of one function's abstract pass.
struct Analysis {
    /// The `args` accumulator: the declared argument count, bumped by every
    /// argument reference observed in the body.
    min_args: i64,
    /// Every call site with the abstract depth right before the call.
    calls: Vec<(usize, usize, i64)>,
}

/// The abstract stack layout carried through one function body. The depth
/// travels with each worklist state; everything else is fixed once the
/// prologue has been processed.
struct Layout {
    globals: i64,
    args: i64,
    locc: i64,
    is_closure: bool,
    captured: Option<usize>,
}

impl Layout {
    fn verify_location(&mut self, offset: usize, entry: &LocationEntry) -> Result<(), VerifierError> {
        let index = entry.index as i64;
        let bad = |limit: i64| VerifierError::BadLocation {
            offset,
            location: *entry,
            limit,
        };

        match entry.kind {
            Location::Global => {
                if index < 0 || index >= self.globals {
                    return Err(bad(self.globals));
                }
            }
            Location::Local => {
                if index < 0 || index >= self.locc {
                    return Err(bad(self.locc));
                }
            }
            Location::Arg => {
                if index < 0 {
                    return Err(bad(self.args));
                }
                // Argument references record the minimum the caller must
                // supply; the arity pass enforces it.
                self.args = self.args.max(index + 1);
            }
            Location::Captured => {
                if !self.is_closure || index < 0 {
                    return Err(bad(0));
                }
                if let Some(k) = self.captured {
                    if index >= k as i64 {
                        return Err(bad(k as i64));
                    }
                }
            }
        }
        Ok(())
    }
}

struct Verifier<'a> {
    bf: &'a Bytefile,
}

impl<'a> Verifier<'a> {
    fn verify(&self, entrypoints: &[usize]) -> Result<(), VerifierError> {
        let funcs = self.discover(entrypoints)?;
        debug!(functions = funcs.len(), "discovery settled");

        let mut min_args: HashMap<usize, i64> = HashMap::new();
        let mut calls: Vec<(usize, usize, i64)> = Vec::new();
        for func in &funcs {
            let analysis = self.analyze_function(func.begin, func.captured)?;
            if func.captured.is_none() {
                min_args.insert(func.begin, analysis.min_args);
            }
            calls.extend(analysis.calls);
        }

        for (offset, target, depth) in calls {
            let Some(&need) = min_args.get(&target) else {
                continue;
            };
            if depth < need {
                return Err(VerifierError::ArgsUnderflow {
                    offset,
                    depth,
                    min_args: need,
                });
            }
        }
        Ok(())
    }

    /// The callee byte of a call or closure site must be a prologue.
    fn check_callee(
        &self,
        offset: usize,
        target: usize,
        closure: bool,
    ) -> Result<(), VerifierError> {
        match self.bf.code().get(target).copied() {
            None => Err(VerifierError::TargetOutOfCode { offset, target }),
            Some(opcode::BEGIN) => Ok(()),
            Some(opcode::CBEGIN) if closure => Ok(()),
            Some(_) if closure => Err(VerifierError::BadClosureTarget { offset, target }),
            Some(_) => Err(VerifierError::BadCallTarget { offset, target }),
        }
    }

    /// Walk everything reachable from the entry points, collecting the
    /// functions named by call and closure sites.
    fn discover(&self, entrypoints: &[usize]) -> Result<Vec<Func>, VerifierError> {
        let code_len = self.bf.code_size();
        let mut visited: BitVec = BitVec::repeat(false, code_len);
        let mut funcs: Vec<Func> = entrypoints
            .iter()
            .map(|&begin| Func {
                begin,
                captured: None,
            })
            .collect();
        let mut seen: HashSet<(usize, Option<usize>)> =
            entrypoints.iter().map(|&begin| (begin, None)).collect();
        let mut worklist: VecDeque<usize> = entrypoints.iter().copied().collect();
        let mut decoder = Decoder::new(self.bf);
        let mut successors = Vec::new();

        while let Some(offset) = worklist.pop_front() {
            if visited[offset] {
                continue;
            }
            visited.set(offset, true);

            let (inst, next) = decoder.decode_at(offset)?;

            match &inst {
                Instruction::Call { offset: target, .. } => {
                    let target = abs_target(*target);
                    self.check_callee(offset, target, false)?;
                    if seen.insert((target, None)) {
                        funcs.push(Func {
                            begin: target,
                            captured: None,
                        });
                    }
                    if !visited[target] {
                        worklist.push_back(target);
                    }
                }
                Instruction::Closure { entry, captures } => {
                    let target = abs_target(*entry);
                    self.check_callee(offset, target, true)?;
                    if seen.insert((target, Some(captures.len()))) {
                        funcs.push(Func {
                            begin: target,
                            captured: Some(captures.len()),
                        });
                    }
                    if !visited[target] {
                        worklist.push_back(target);
                    }
                }
                _ => {}
            }

            inst.successors(next, &mut successors);
            for &succ in &successors {
                if succ >= code_len {
                    return Err(VerifierError::TargetOutOfCode {
                        offset,
                        target: succ,
                    });
                }
                if !visited[succ] {
                    worklist.push_back(succ);
                }
            }
        }

        Ok(funcs)
    }

    /// Linear scan for the function's `END`, rejecting interior prologues.
    fn scan_body(&self, begin: usize) -> Result<usize, VerifierError> {
        let mut decoder = Decoder::new(self.bf);
        decoder.jump_to(begin);
        loop {
            let offset = decoder.ip();
            let inst = decoder.decode_next()?;
            if offset != begin
                && matches!(
                    inst,
                    Instruction::Begin { .. } | Instruction::CBegin { .. }
                )
            {
                return Err(VerifierError::NestedBegin { offset });
            }
            if matches!(inst, Instruction::End) {
                return Ok(offset);
            }
        }
    }

    fn analyze_function(
        &self,
        begin: usize,
        captured: Option<usize>,
    ) -> Result<Analysis, VerifierError> {
        let end = self.scan_body(begin)?;

        let mut layout = Layout {
            globals: self.bf.global_area_size() as i64,
            args: 0,
            locc: 0,
            is_closure: captured.is_some(),
            captured,
        };
        let mut jumps: Vec<(usize, usize)> = Vec::new();
        let mut calls: Vec<(usize, usize, i64)> = Vec::new();
        let mut depth_at: HashMap<usize, i64> = HashMap::new();
        let mut worklist: VecDeque<(usize, i64)> = VecDeque::new();
        worklist.push_back((begin, 0));
        let mut decoder = Decoder::new(self.bf);
        let mut successors = Vec::new();

        while let Some((offset, depth)) = worklist.pop_front() {
            match depth_at.get(&offset).copied() {
                Some(recorded) if recorded == depth => continue,
                Some(recorded) => {
                    return Err(VerifierError::InconsistentStackDepth {
                        offset,
                        recorded,
                        incoming: depth,
                    })
                }
                None => {}
            }
            depth_at.insert(offset, depth);

            let (inst, next) = decoder.decode_at(offset)?;
            let mut depth = depth;

            match &inst {
                Instruction::Begin { args, locals } => {
                    layout.args = *args as i64;
                    layout.locc = *locals as i64;
                    layout.is_closure = false;
                    depth = layout.locc;
                }
                Instruction::CBegin { args, locals } => {
                    layout.args = *args as i64;
                    layout.locc = *locals as i64;
                    layout.is_closure = true;
                    depth = layout.locc;
                }
                Instruction::Const(_)
                | Instruction::String { .. }
                | Instruction::Sexp { .. }
                | Instruction::Dup => depth += 1,
                Instruction::Binop(_) => depth -= 1,
                Instruction::Ld(entry) => {
                    layout.verify_location(offset, entry)?;
                    depth += 1;
                }
                Instruction::Lda(entry) => {
                    layout.verify_location(offset, entry)?;
                    depth += 2;
                }
                Instruction::St(entry) => layout.verify_location(offset, entry)?,
                Instruction::Sti
                | Instruction::Drop
                | Instruction::Elem
                | Instruction::Fail { .. }
                | Instruction::Patt(Pattern::String) => depth -= 1,
                Instruction::Sta => depth -= 2,
                Instruction::CJmpZ { target } | Instruction::CJmpNz { target } => {
                    jumps.push((offset, abs_target(*target)));
                    depth -= 1;
                }
                Instruction::Jmp { target } => jumps.push((offset, abs_target(*target))),
                Instruction::Call { offset: target, .. } => {
                    calls.push((offset, abs_target(*target), depth));
                    depth += 1;
                }
                Instruction::Closure { captures, .. } => {
                    for capture in captures {
                        layout.verify_location(offset, capture)?;
                    }
                    depth += 1;
                }
                Instruction::LCall(Builtin::Read) | Instruction::LCall(Builtin::Array { .. }) => {
                    depth += 1
                }
                Instruction::LCall(_) => {}
                Instruction::Swap
                | Instruction::Patt(_)
                | Instruction::Tag { .. }
                | Instruction::Array { .. }
                | Instruction::Line { .. }
                | Instruction::CallC { .. }
                | Instruction::End
                | Instruction::Ret
                | Instruction::Stop => {}
            }

            if depth < 0 {
                return Err(VerifierError::StackUnderflow { offset });
            }

            inst.successors(next, &mut successors);
            for &succ in &successors {
                if succ >= begin && succ <= end {
                    worklist.push_back((succ, depth));
                }
            }
        }

        for (offset, target) in jumps {
            if target < begin || target > end {
                return Err(VerifierError::JumpOutOfFunction {
                    offset,
                    target,
                    begin,
                    end,
                });
            }
        }

        Ok(Analysis {
            min_args: layout.args,
            calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Asm {
        code: Vec<u8>,
    }

    impl Asm {
        fn new() -> Self {
            Asm { code: Vec::new() }
        }

        fn op(&mut self, byte: u8) -> &mut Self {
            self.code.push(byte);
            self
        }

        fn int(&mut self, n: i32) -> &mut Self {
            self.code.extend_from_slice(&n.to_le_bytes());
            self
        }

        fn byte(&mut self, b: u8) -> &mut Self {
            self.code.push(b);
            self
        }

        fn here(&self) -> usize {
            self.code.len()
        }
    }

    fn image(globals: u32, strings: &[u8], main_offset: usize, code: Vec<u8>) -> Bytefile {
        let mut table = b"main\0".to_vec();
        table.extend_from_slice(strings);
        Bytefile::from_parts(globals, vec![(0, main_offset as u32)], table, code).unwrap()
    }

    #[test]
    fn accepts_a_straight_line_program() {
        // main: BEGIN 0 0; CONST 3; CONST 4; BINOP +; ST G(0); DROP; END
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0);
        asm.op(opcode::CONST).int(3);
        asm.op(opcode::CONST).int(4);
        asm.op(0x01);
        asm.op(0x40).int(0); // ST G(0)
        asm.op(opcode::DROP);
        asm.op(opcode::END);

        let bf = image(1, b"", 0, asm.code);
        assert_eq!(verify(&bf), Ok(()));
    }

    /// BINOP with an empty stack must be rejected before execution.
    #[test]
    fn rejects_stack_underflow() {
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0); // 0
        asm.op(0x01); // 9: BINOP + with nothing pushed
        asm.op(opcode::END);

        let bf = image(0, b"", 0, asm.code);
        assert_eq!(
            verify(&bf),
            Err(VerifierError::StackUnderflow { offset: 9 })
        );
    }

    #[test]
    fn rejects_nested_prologues() {
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0); // 0
        asm.op(opcode::BEGIN).int(0).int(0); // 9
        asm.op(opcode::END);

        let bf = image(0, b"", 0, asm.code);
        assert_eq!(verify(&bf), Err(VerifierError::NestedBegin { offset: 9 }));
    }

    #[test]
    fn rejects_jumps_out_of_the_function() {
        // f: BEGIN 0 0; END
        // main: BEGIN 0 0; JMP 0; END    (into f's body)
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0); // 0: f
        asm.op(opcode::END); // 9
        asm.op(opcode::BEGIN).int(0).int(0); // 10: main
        asm.op(opcode::JMP).int(0); // 19
        asm.op(opcode::END); // 24

        let bf = image(0, b"", 10, asm.code);
        assert_eq!(
            verify(&bf),
            Err(VerifierError::JumpOutOfFunction {
                offset: 19,
                target: 0,
                begin: 10,
                end: 24,
            })
        );
    }

    #[test]
    fn rejects_call_targets_that_are_not_prologues() {
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0); // 0
        asm.op(opcode::CONST).int(1); // 9
        asm.op(opcode::CALL).int(9).int(0); // 14: into the CONST
        asm.op(opcode::END);

        let bf = image(0, b"", 0, asm.code);
        assert_eq!(
            verify(&bf),
            Err(VerifierError::BadCallTarget { offset: 14, target: 9 })
        );
    }

    #[test]
    fn rejects_out_of_bounds_locations() {
        // LD G(5) with one global slot.
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0); // 0
        asm.op(0x20).int(5); // 9: LD G(5)
        asm.op(opcode::END);
        let bf = image(1, b"", 0, asm.code);
        assert!(matches!(
            verify(&bf),
            Err(VerifierError::BadLocation { offset: 9, .. })
        ));

        // LD L(2) with one declared local.
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(1);
        asm.op(0x21).int(2); // LD L(2)
        asm.op(opcode::END);
        let bf = image(0, b"", 0, asm.code);
        assert!(matches!(
            verify(&bf),
            Err(VerifierError::BadLocation { .. })
        ));

        // Captured reference outside a closure.
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0);
        asm.op(0x23).int(0); // LD C(0)
        asm.op(opcode::END);
        let bf = image(0, b"", 0, asm.code);
        assert!(matches!(
            verify(&bf),
            Err(VerifierError::BadLocation { .. })
        ));
    }

    #[test]
    fn rejects_calls_with_too_few_stacked_values() {
        // f: BEGIN 2 0; END   (wants two arguments)
        // main: BEGIN 0 0; CONST 1; CALL f 2; END
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(2).int(0); // 0: f
        asm.op(opcode::CONST).int(0); // 9
        asm.op(opcode::END); // 14
        asm.op(opcode::BEGIN).int(0).int(0); // 15: main
        asm.op(opcode::CONST).int(1); // 24
        asm.op(opcode::CALL).int(0).int(2); // 29
        asm.op(opcode::END); // 38

        let bf = image(0, b"", 15, asm.code);
        assert_eq!(
            verify(&bf),
            Err(VerifierError::ArgsUnderflow {
                offset: 29,
                depth: 1,
                min_args: 2,
            })
        );
    }

    #[test]
    fn argument_references_raise_the_requirement() {
        // f declares one argument but reads A(2); callers must stack three.
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(1).int(0); // 0: f
        asm.op(0x22).int(2); // 9: LD A(2)
        asm.op(opcode::END); // 14
        asm.op(opcode::BEGIN).int(0).int(0); // 15: main
        asm.op(opcode::CONST).int(1); // 24
        asm.op(opcode::CONST).int(2); // 29
        asm.op(opcode::CALL).int(0).int(1); // 34
        asm.op(opcode::END); // 43

        let bf = image(0, b"", 15, asm.code);
        assert_eq!(
            verify(&bf),
            Err(VerifierError::ArgsUnderflow {
                offset: 34,
                depth: 2,
                min_args: 3,
            })
        );
    }

    #[test]
    fn rejects_inconsistent_depths_at_joins() {
        // The fallthrough path reaches the join one value deeper than the
        // branch path:
        // main: BEGIN 0 0; CONST 0; CJMPz L; CONST 1; JMP L; L: CONST 5; DROP; END
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0); // 0
        asm.op(opcode::CONST).int(0); // 9
        asm.op(opcode::CJMP_Z).int(29); // 14
        asm.op(opcode::CONST).int(1); // 19
        asm.op(opcode::JMP).int(29); // 24
        assert_eq!(asm.here(), 29);
        asm.op(opcode::CONST).int(5); // 29: L
        asm.op(opcode::DROP); // 34
        asm.op(opcode::END); // 35

        let bf = image(0, b"", 0, asm.code);
        assert_eq!(
            verify(&bf),
            Err(VerifierError::InconsistentStackDepth {
                offset: 29,
                recorded: 0,
                incoming: 1,
            })
        );
    }

    #[test]
    fn accepts_loops_with_stable_depth() {
        // main: BEGIN 0 1; CONST 3; ST L(0); DROP;
        // loop: LD L(0); CJMPz end; LD L(0); CONST 1; BINOP -; ST L(0); DROP; JMP loop;
        // end: CONST 0; END
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(1); // 0
        asm.op(opcode::CONST).int(3); // 9
        asm.op(0x41).int(0); // 14: ST L(0)
        asm.op(opcode::DROP); // 19
        assert_eq!(asm.here(), 20);
        asm.op(0x21).int(0); // 20: loop
        asm.op(opcode::CJMP_Z).int(52); // 25
        asm.op(0x21).int(0); // 30
        asm.op(opcode::CONST).int(1); // 35
        asm.op(0x02); // 40: BINOP -
        asm.op(0x41).int(0); // 41: ST L(0)
        asm.op(opcode::DROP); // 46
        asm.op(opcode::JMP).int(20); // 47
        assert_eq!(asm.here(), 52);
        asm.op(opcode::CONST).int(0); // 52: end
        asm.op(opcode::END); // 57

        let bf = image(0, b"", 0, asm.code);
        assert_eq!(verify(&bf), Ok(()));
    }

    #[test]
    fn accepts_closures_and_checks_capture_bounds() {
        // f: CBEGIN 1 0; LD A(0); LD C(0); BINOP +; END
        // main: BEGIN 0 1; CLOSURE f [L(0)]; CONST 7; CALLC 1; END
        let mut asm = Asm::new();
        asm.op(opcode::CBEGIN).int(1).int(0); // 0: f
        asm.op(0x22).int(0); // 9
        asm.op(0x23).int(0); // 14: LD C(0)
        asm.op(0x01); // 19
        asm.op(opcode::END); // 20
        asm.op(opcode::BEGIN).int(0).int(1); // 21: main
        asm.op(opcode::CLOSURE).int(0).int(1); // 30
        asm.byte(1).int(0); // capture L(0)
        asm.op(opcode::CONST).int(7); // 44
        asm.op(opcode::CALLC).int(1); // 49
        asm.op(opcode::END); // 54

        let bf = image(0, b"", 21, asm.code);
        assert_eq!(verify(&bf), Ok(()));

        // Same shape, but f reads capture 1 of a single-capture closure.
        let mut asm = Asm::new();
        asm.op(opcode::CBEGIN).int(1).int(0); // 0: f
        asm.op(0x23).int(1); // 9: LD C(1)
        asm.op(opcode::END); // 14
        asm.op(opcode::BEGIN).int(0).int(1); // 15: main
        asm.op(opcode::CLOSURE).int(0).int(1); // 24
        asm.byte(1).int(0);
        asm.op(opcode::CONST).int(7);
        asm.op(opcode::CALLC).int(1);
        asm.op(opcode::END);

        let bf = image(0, b"", 15, asm.code);
        assert!(matches!(
            verify(&bf),
            Err(VerifierError::BadLocation { offset: 9, .. })
        ));
    }

    #[test]
    fn rejects_closure_targets_without_a_prologue() {
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(0).int(0); // 0
        asm.op(opcode::CLOSURE).int(9).int(0); // 9: entry points at itself
        asm.op(opcode::END);

        let bf = image(0, b"", 0, asm.code);
        assert_eq!(
            verify(&bf),
            Err(VerifierError::BadClosureTarget { offset: 9, target: 9 })
        );
    }

    /// Flipping any single reachable byte must produce a clean accept or a
    /// clean reject, never a crash.
    #[test]
    fn single_byte_mutants_never_crash() {
        let mut asm = Asm::new();
        asm.op(opcode::BEGIN).int(2).int(0); // 0: add
        asm.op(0x22).int(0);
        asm.op(0x22).int(1);
        asm.op(0x01);
        asm.op(opcode::END); // 20
        asm.op(opcode::BEGIN).int(0).int(0); // 21: main
        asm.op(opcode::CONST).int(10);
        asm.op(opcode::CONST).int(32);
        asm.op(opcode::CALL).int(0).int(2);
        asm.op(opcode::END);
        let code = asm.code;

        let pristine = image(0, b"", 21, code.clone());
        assert_eq!(verify(&pristine), Ok(()));

        for position in 0..code.len() {
            for flip in [0x01u8, 0xFF] {
                let mut mutant = code.clone();
                mutant[position] ^= flip;
                // Mutants that corrupt main's prologue die in the loader.
                let Ok(bf) = Bytefile::from_parts(
                    0,
                    vec![(0, 21)],
                    b"main\0".to_vec(),
                    mutant,
                ) else {
                    continue;
                };
                let _ = verify(&bf);
            }
        }
    }
}
