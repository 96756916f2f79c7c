//! Textual rendering of decoded instructions and whole code sections.

use crate::bytecode::{Builtin, Instruction};
use crate::bytefile::{Bytefile, BytefileError};
use crate::decoder::{Decoder, DecoderError};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisasmError {
    #[error(transparent)]
    Decode(#[from] DecoderError),
    #[error(transparent)]
    Bytefile(#[from] BytefileError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn escaped(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}

/// Write one instruction as `MNEMONIC<TAB>operands`.
pub fn write_instruction(
    out: &mut impl Write,
    bf: &Bytefile,
    inst: &Instruction,
) -> Result<(), DisasmError> {
    let m = inst.mnemonic();
    match inst {
        Instruction::Binop(op) => write!(out, "{}\t{}", m, op.symbol())?,
        Instruction::Const(n) => write!(out, "{}\t{}", m, n)?,
        Instruction::String { offset } => {
            let s = bf.string_at(*offset as usize)?;
            write!(out, "{}\t\"{}\"", m, escaped(s))?;
        }
        Instruction::Sexp { tag, fields } => {
            let s = bf.string_at(*tag as usize)?;
            write!(out, "{}\t\"{}\" {}", m, escaped(s), fields)?;
        }
        Instruction::Jmp { target } => write!(out, "{}\t{:#x}", m, target)?,
        Instruction::CJmpZ { target } | Instruction::CJmpNz { target } => {
            write!(out, "{}\t{:#x}", m, target)?
        }
        Instruction::Begin { args, locals } | Instruction::CBegin { args, locals } => {
            write!(out, "{}\t{} {}", m, args, locals)?
        }
        Instruction::Ld(loc) | Instruction::Lda(loc) | Instruction::St(loc) => {
            write!(out, "{}\t{}", m, loc)?
        }
        Instruction::Closure { entry, captures } => {
            write!(out, "{}\t{:#x}", m, entry)?;
            for capture in captures {
                write!(out, " {}", capture)?;
            }
        }
        Instruction::CallC { args } => write!(out, "{}\t{}", m, args)?,
        Instruction::Call { offset, args } => write!(out, "{}\t{:#x} {}", m, offset, args)?,
        Instruction::Tag { tag, arity } => {
            let s = bf.string_at(*tag as usize)?;
            write!(out, "{}\t\"{}\" {}", m, escaped(s), arity)?;
        }
        Instruction::Array { len } => write!(out, "{}\t{}", m, len)?,
        Instruction::Fail { line, col } => write!(out, "{}\t{} {}", m, line, col)?,
        Instruction::Line { line } => write!(out, "{}\t{}", m, line)?,
        Instruction::Patt(p) => write!(out, "{}\t{}", m, p.symbol())?,
        Instruction::LCall(builtin) => match builtin {
            Builtin::Read => write!(out, "{}\tLread", m)?,
            Builtin::Write => write!(out, "{}\tLwrite", m)?,
            Builtin::Length => write!(out, "{}\tLlength", m)?,
            Builtin::String => write!(out, "{}\tLstring", m)?,
            Builtin::Array { len } => write!(out, "{}\tBarray {}", m, len)?,
        },
        _ => write!(out, "{}", m)?,
    }
    Ok(())
}

/// Disassemble the entire code section, one instruction per line prefixed
/// with its hex offset.
pub fn disassemble(bf: &Bytefile, out: &mut impl Write) -> Result<(), DisasmError> {
    let mut decoder = Decoder::new(bf);
    while decoder.ip() < bf.code_size() {
        let offset = decoder.ip();
        let inst = decoder.decode_next()?;
        write!(out, "{:#010x}\t", offset)?;
        write_instruction(out, bf, &inst)?;
        writeln!(out)?;
    }
    Ok(())
}
