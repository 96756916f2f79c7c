//! Idiom collection.
//!
//! An idiom is one instruction, or two consecutive instructions inside a
//! basic block: a pair is never formed across a control-transfer
//! instruction, and never ends on an instruction that some jump or call
//! targets. Only instructions reachable from the entry points are counted.

use bitvec::vec::BitVec;
use larchcore::bytecode::{abs_target, Instruction};
use larchcore::bytefile::Bytefile;
use larchcore::decoder::{Decoder, DecoderError};
use larchcore::disasm::{self, DisasmError};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Decode(#[from] DecoderError),
    #[error("main is not a public symbol of this file")]
    NoEntrypoint,
    #[error("control leaves the code section at {offset:#010x} (target {target:#010x})")]
    TargetOutOfCode { offset: usize, target: usize },
}

/// A counted idiom, with one representative span `[start, end)` in the
/// code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdiomGroup {
    pub start: usize,
    pub end: usize,
    pub count: usize,
}

/// Mark every instruction offset reachable from the entry points,
/// following fallthrough, jumps, call targets and closure entries.
fn mark_reachable(bf: &Bytefile, entrypoints: &[usize]) -> Result<BitVec, StatsError> {
    let code_len = bf.code_size();
    let mut visited: BitVec = BitVec::repeat(false, code_len);
    let mut worklist: VecDeque<usize> = entrypoints.iter().copied().collect();
    let mut decoder = Decoder::new(bf);
    let mut successors = Vec::new();

    while let Some(offset) = worklist.pop_front() {
        if visited[offset] {
            continue;
        }
        visited.set(offset, true);

        let (inst, next) = decoder.decode_at(offset)?;

        let callee = match &inst {
            Instruction::Call { offset: target, .. } => Some(abs_target(*target)),
            Instruction::Closure { entry, .. } => Some(abs_target(*entry)),
            _ => None,
        };
        if let Some(target) = callee {
            if target >= code_len {
                return Err(StatsError::TargetOutOfCode { offset, target });
            }
            if !visited[target] {
                worklist.push_back(target);
            }
        }

        inst.successors(next, &mut successors);
        for &succ in &successors {
            if succ >= code_len {
                return Err(StatsError::TargetOutOfCode {
                    offset,
                    target: succ,
                });
            }
            if !visited[succ] {
                worklist.push_back(succ);
            }
        }
    }
    Ok(visited)
}

/// One linear pass over the whole section marking the control-transfer
/// instructions and every offset some transfer lands on.
fn mark_jumps(bf: &Bytefile) -> Result<(BitVec, BitVec), StatsError> {
    let code_len = bf.code_size();
    let mut jump_src: BitVec = BitVec::repeat(false, code_len);
    let mut label: BitVec = BitVec::repeat(false, code_len);
    let mut decoder = Decoder::new(bf);
    let mut successors = Vec::new();

    while decoder.ip() < code_len {
        let offset = decoder.ip();
        let inst = decoder.decode_next()?;
        let next = decoder.ip();

        if matches!(
            inst,
            Instruction::Jmp { .. }
                | Instruction::CJmpZ { .. }
                | Instruction::CJmpNz { .. }
                | Instruction::Call { .. }
                | Instruction::CallC { .. }
                | Instruction::Fail { .. }
                | Instruction::Stop
        ) {
            jump_src.set(offset, true);
        }

        let callee = match &inst {
            Instruction::Call { offset: target, .. } => Some(abs_target(*target)),
            Instruction::Closure { entry, .. } => Some(abs_target(*entry)),
            _ => None,
        };
        if let Some(target) = callee {
            if target < code_len {
                label.set(target, true);
            }
        }

        inst.successors(next, &mut successors);
        for &succ in &successors {
            if succ != next && succ < code_len {
                label.set(succ, true);
            }
        }
    }
    Ok((jump_src, label))
}

/// Count idioms over the reachable instructions, sorted by descending
/// frequency (ties broken by the idiom's bytes).
pub fn collect(bf: &Bytefile) -> Result<Vec<IdiomGroup>, StatsError> {
    let entrypoints = bf.entry_points();
    if entrypoints.is_empty() {
        return Err(StatsError::NoEntrypoint);
    }

    let reachable = mark_reachable(bf, &entrypoints)?;
    let (jump_src, label) = mark_jumps(bf)?;

    let code = bf.code();
    let mut groups: HashMap<&[u8], IdiomGroup> = HashMap::new();
    let mut bump = |start: usize, end: usize| {
        groups
            .entry(&code[start..end])
            .or_insert(IdiomGroup {
                start,
                end,
                count: 0,
            })
            .count += 1;
    };

    let mut decoder = Decoder::new(bf);
    let mut prev: Option<usize> = None;
    while decoder.ip() < code.len() {
        let start = decoder.ip();
        if !reachable[start] {
            prev = None;
            decoder.decode_next()?;
            continue;
        }
        decoder.decode_next()?;
        let next = decoder.ip();

        if let Some(pair_start) = prev {
            if !label[start] {
                bump(pair_start, next);
            }
        }
        bump(start, next);

        prev = if jump_src[start] { None } else { Some(start) };
    }

    let mut groups: Vec<IdiomGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| code[a.start..a.end].cmp(&code[b.start..b.end]))
    });
    Ok(groups)
}

/// Print the collected idioms, most frequent first, each instruction
/// disassembled on its own indented line.
pub fn report(
    bf: &Bytefile,
    groups: &[IdiomGroup],
    out: &mut impl Write,
) -> Result<(), DisasmError> {
    let mut decoder = Decoder::new(bf);
    for (index, group) in groups.iter().enumerate() {
        write!(out, "#{}: {} times", index + 1, group.count)?;
        decoder.jump_to(group.start);
        while decoder.ip() < group.end {
            let inst = decoder.decode_next()?;
            write!(out, "\n\t")?;
            disasm::write_instruction(out, bf, &inst)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
