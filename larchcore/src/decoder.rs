//! Single-instruction decoder over the code section of a [`Bytefile`].
//!
//! One call decodes exactly one instruction: the opcode byte, then the
//! operand bytes in wire order. The decoder keeps nothing but its position
//! between calls; the interpreter, the verifier and the disassembly tools
//! all own their iteration strategy and reposition it freely.

use crate::bytecode::{
    family, opcode, Binop, Builtin, Instruction, Location, LocationEntry, Pattern,
};
use crate::bytefile::Bytefile;
use crate::numeric::LeBytes;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecoderError {
    #[error("instruction at {offset:#010x} runs past the end of the code section")]
    OutOfCode { offset: usize },
    #[error("invalid opcode {opcode:#04x} at {offset:#010x}")]
    InvalidOpcode { opcode: u8, offset: usize },
    #[error("string offset {string:#x} at {offset:#010x} is out of the string table")]
    BadStringOffset { string: i32, offset: usize },
    #[error("negative operand count {count} at {offset:#010x}")]
    NegativeCount { count: i32, offset: usize },
}

pub struct Decoder<'a> {
    bf: &'a Bytefile,
    ip: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bf: &'a Bytefile) -> Self {
        Decoder { bf, ip: 0 }
    }

    /// Current position in the code section.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn jump_to(&mut self, offset: usize) {
        self.ip = offset;
    }

    /// Decode the instruction at `offset`; returns the event and the offset
    /// one past the instruction.
    pub fn decode_at(&mut self, offset: usize) -> Result<(Instruction, usize), DecoderError> {
        self.jump_to(offset);
        let inst = self.decode_next()?;
        Ok((inst, self.ip))
    }

    /// Reads the next value of type `T` from the code section and advances.
    fn next<T: LeBytes>(&mut self, start: usize) -> Result<T, DecoderError> {
        let width = std::mem::size_of::<T>();
        let bytes = self
            .bf
            .code()
            .get(self.ip..self.ip + width)
            .ok_or(DecoderError::OutOfCode { offset: start })?;
        self.ip += width;
        Ok(T::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_loc(&mut self, start: usize) -> Result<LocationEntry, DecoderError> {
        let byte = self.next::<u8>(start)?;
        let kind = Location::try_from(byte).map_err(|_| DecoderError::InvalidOpcode {
            opcode: byte,
            offset: start,
        })?;
        let index = self.next::<i32>(start)?;
        Ok(LocationEntry { kind, index })
    }

    /// A string operand must name a byte within the string table.
    fn check_string(&self, string: i32, offset: usize) -> Result<(), DecoderError> {
        if string < 0 || string as usize >= self.bf.stringtab_size() {
            return Err(DecoderError::BadStringOffset { string, offset });
        }
        Ok(())
    }

    fn check_count(count: i32, offset: usize) -> Result<(), DecoderError> {
        if count < 0 {
            return Err(DecoderError::NegativeCount { count, offset });
        }
        Ok(())
    }

    /// Decode one instruction at the current position and advance past it.
    pub fn decode_next(&mut self) -> Result<Instruction, DecoderError> {
        let start = self.ip;
        let byte = self.next::<u8>(start)?;
        let (high, low) = (byte >> 4, byte & 0x0F);

        let invalid = DecoderError::InvalidOpcode {
            opcode: byte,
            offset: start,
        };

        match byte {
            opcode::CONST => Ok(Instruction::Const(self.next::<i32>(start)?)),
            opcode::STRING => {
                let offset = self.next::<i32>(start)?;
                self.check_string(offset, start)?;
                Ok(Instruction::String { offset })
            }
            opcode::SEXP => {
                let tag = self.next::<i32>(start)?;
                self.check_string(tag, start)?;
                let fields = self.next::<i32>(start)?;
                Self::check_count(fields, start)?;
                Ok(Instruction::Sexp { tag, fields })
            }
            opcode::STI => Ok(Instruction::Sti),
            opcode::STA => Ok(Instruction::Sta),
            opcode::JMP => Ok(Instruction::Jmp {
                target: self.next::<i32>(start)?,
            }),
            opcode::END => Ok(Instruction::End),
            opcode::RET => Ok(Instruction::Ret),
            opcode::DROP => Ok(Instruction::Drop),
            opcode::DUP => Ok(Instruction::Dup),
            opcode::SWAP => Ok(Instruction::Swap),
            opcode::ELEM => Ok(Instruction::Elem),
            opcode::CJMP_Z => Ok(Instruction::CJmpZ {
                target: self.next::<i32>(start)?,
            }),
            opcode::CJMP_NZ => Ok(Instruction::CJmpNz {
                target: self.next::<i32>(start)?,
            }),
            opcode::BEGIN | opcode::CBEGIN => {
                let args = self.next::<i32>(start)?;
                let locals = self.next::<i32>(start)?;
                Self::check_count(args, start)?;
                Self::check_count(locals, start)?;
                if byte == opcode::BEGIN {
                    Ok(Instruction::Begin { args, locals })
                } else {
                    Ok(Instruction::CBegin { args, locals })
                }
            }
            opcode::CLOSURE => {
                let entry = self.next::<i32>(start)?;
                let count = self.next::<i32>(start)?;
                Self::check_count(count, start)?;
                // Each capture entry takes five bytes; a count the rest of
                // the code section cannot hold is already malformed.
                let remaining = self.bf.code().len().saturating_sub(self.ip);
                if count as usize > remaining / 5 {
                    return Err(DecoderError::OutOfCode { offset: start });
                }
                let mut captures = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    captures.push(self.read_loc(start)?);
                }
                Ok(Instruction::Closure { entry, captures })
            }
            opcode::CALLC => {
                let args = self.next::<i32>(start)?;
                Self::check_count(args, start)?;
                Ok(Instruction::CallC { args })
            }
            opcode::CALL => {
                let offset = self.next::<i32>(start)?;
                let args = self.next::<i32>(start)?;
                Self::check_count(args, start)?;
                Ok(Instruction::Call { offset, args })
            }
            opcode::TAG => {
                let tag = self.next::<i32>(start)?;
                self.check_string(tag, start)?;
                let arity = self.next::<i32>(start)?;
                Ok(Instruction::Tag { tag, arity })
            }
            opcode::ARRAY => Ok(Instruction::Array {
                len: self.next::<i32>(start)?,
            }),
            opcode::FAIL => {
                let line = self.next::<i32>(start)?;
                let col = self.next::<i32>(start)?;
                Ok(Instruction::Fail { line, col })
            }
            opcode::LINE => Ok(Instruction::Line {
                line: self.next::<i32>(start)?,
            }),
            _ => match high {
                family::BINOP => Ok(Instruction::Binop(
                    Binop::try_from(low).map_err(|_| invalid)?,
                )),
                family::LD | family::LDA | family::ST => {
                    let kind = Location::try_from(low).map_err(|_| invalid)?;
                    let index = self.next::<i32>(start)?;
                    let entry = LocationEntry { kind, index };
                    Ok(match high {
                        family::LD => Instruction::Ld(entry),
                        family::LDA => Instruction::Lda(entry),
                        _ => Instruction::St(entry),
                    })
                }
                family::PATT => Ok(Instruction::Patt(
                    Pattern::try_from(low).map_err(|_| invalid)?,
                )),
                family::LCALL => match low {
                    0 => Ok(Instruction::LCall(Builtin::Read)),
                    1 => Ok(Instruction::LCall(Builtin::Write)),
                    2 => Ok(Instruction::LCall(Builtin::Length)),
                    3 => Ok(Instruction::LCall(Builtin::String)),
                    4 => {
                        let len = self.next::<i32>(start)?;
                        Self::check_count(len, start)?;
                        Ok(Instruction::LCall(Builtin::Array { len }))
                    }
                    _ => Err(invalid),
                },
                family::STOP => Ok(Instruction::Stop),
                _ => Err(invalid),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(code: Vec<u8>) -> Bytefile {
        Bytefile::from_parts(1, vec![], b"main\0hello\0".to_vec(), code).unwrap()
    }

    fn emit(op: u8, operands: &[i32]) -> Vec<u8> {
        let mut code = vec![op];
        for n in operands {
            code.extend_from_slice(&n.to_le_bytes());
        }
        code
    }

    /// The decoded width of every opcode equals one byte plus its operand
    /// bytes in wire order.
    #[test]
    fn decoded_widths_match_operand_layout() -> Result<(), DecoderError> {
        let cases: Vec<(Vec<u8>, usize)> = vec![
            (emit(0x01, &[]), 1),            // BINOP +
            (emit(0x0D, &[]), 1),            // BINOP !!
            (emit(opcode::CONST, &[7]), 5),
            (emit(opcode::STRING, &[0]), 5),
            (emit(opcode::SEXP, &[5, 2]), 9),
            (emit(opcode::STI, &[]), 1),
            (emit(opcode::STA, &[]), 1),
            (emit(opcode::JMP, &[0x40]), 5),
            (emit(opcode::END, &[]), 1),
            (emit(opcode::RET, &[]), 1),
            (emit(opcode::DROP, &[]), 1),
            (emit(opcode::DUP, &[]), 1),
            (emit(opcode::SWAP, &[]), 1),
            (emit(opcode::ELEM, &[]), 1),
            (emit(opcode::CJMP_Z, &[0]), 5),
            (emit(opcode::CJMP_NZ, &[0]), 5),
            (emit(opcode::BEGIN, &[2, 1]), 9),
            (emit(opcode::CBEGIN, &[2, 1]), 9),
            (emit(opcode::CALLC, &[1]), 5),
            (emit(opcode::CALL, &[0, 2]), 9),
            (emit(opcode::TAG, &[5, 2]), 9),
            (emit(opcode::ARRAY, &[3]), 5),
            (emit(opcode::FAIL, &[2, 10]), 9),
            (emit(opcode::LINE, &[4]), 5),
            (emit(0x20, &[0]), 5),           // LD G(0)
            (emit(0x33, &[0]), 5),           // LDA C(0)
            (emit(0x41, &[0]), 5),           // ST L(0)
            (emit(0x60, &[]), 1),            // PATT =str
            (emit(0x66, &[]), 1),            // PATT #fun
            (emit(0x70, &[]), 1),            // LCALL Lread
            (emit(0x73, &[]), 1),            // LCALL Lstring
            (emit(0x74, &[3]), 5),           // LCALL Barray 3
            (emit(0xFF, &[]), 1),            // STOP
        ];

        for (code, width) in cases {
            let bf = file_with(code.clone());
            let mut decoder = Decoder::new(&bf);
            let (_, next) = decoder.decode_at(0)?;
            assert_eq!(next, width, "opcode {:#04x}", code[0]);
        }
        Ok(())
    }

    #[test]
    fn closure_captures_are_decoded_in_order() -> Result<(), DecoderError> {
        let mut code = vec![opcode::CLOSURE];
        code.extend_from_slice(&0x20i32.to_le_bytes());
        code.extend_from_slice(&2i32.to_le_bytes());
        code.push(0); // G
        code.extend_from_slice(&1i32.to_le_bytes());
        code.push(2); // A
        code.extend_from_slice(&0i32.to_le_bytes());

        let bf = file_with(code);
        let mut decoder = Decoder::new(&bf);
        let (inst, next) = decoder.decode_at(0)?;
        assert_eq!(next, 1 + 4 + 4 + 2 * 5);
        assert_eq!(
            inst,
            Instruction::Closure {
                entry: 0x20,
                captures: vec![
                    LocationEntry { kind: Location::Global, index: 1 },
                    LocationEntry { kind: Location::Arg, index: 0 },
                ],
            }
        );
        Ok(())
    }

    #[test]
    fn undefined_opcodes_are_rejected() {
        for byte in [0x00u8, 0x0E, 0x1C, 0x24, 0x3F, 0x5B, 0x67, 0x75, 0x80, 0x90, 0xA0, 0xE3] {
            let bf = file_with(vec![byte, 0, 0, 0, 0]);
            let mut decoder = Decoder::new(&bf);
            let err = decoder.decode_at(0).unwrap_err();
            assert_eq!(
                err,
                DecoderError::InvalidOpcode { opcode: byte, offset: 0 },
                "byte {:#04x}",
                byte
            );
        }
    }

    #[test]
    fn truncated_operands_are_rejected() {
        let bf = file_with(vec![opcode::CONST, 0x07, 0x00]);
        let mut decoder = Decoder::new(&bf);
        assert_eq!(
            decoder.decode_at(0).unwrap_err(),
            DecoderError::OutOfCode { offset: 0 }
        );

        // The capture list runs off the end.
        let mut code = vec![opcode::CLOSURE];
        code.extend_from_slice(&0i32.to_le_bytes());
        code.extend_from_slice(&3i32.to_le_bytes());
        code.push(0);
        let bf = file_with(code);
        let mut decoder = Decoder::new(&bf);
        assert_eq!(
            decoder.decode_at(0).unwrap_err(),
            DecoderError::OutOfCode { offset: 0 }
        );
    }

    #[test]
    fn string_operands_are_bounds_checked() {
        let bf = file_with(emit(opcode::STRING, &[11]));
        let mut decoder = Decoder::new(&bf);
        assert_eq!(
            decoder.decode_at(0).unwrap_err(),
            DecoderError::BadStringOffset { string: 11, offset: 0 }
        );

        let bf = file_with(emit(opcode::TAG, &[-1, 0]));
        let mut decoder = Decoder::new(&bf);
        assert_eq!(
            decoder.decode_at(0).unwrap_err(),
            DecoderError::BadStringOffset { string: -1, offset: 0 }
        );
    }

    #[test]
    fn negative_counts_are_rejected() {
        let bf = file_with(emit(opcode::BEGIN, &[-2, 0]));
        let mut decoder = Decoder::new(&bf);
        assert_eq!(
            decoder.decode_at(0).unwrap_err(),
            DecoderError::NegativeCount { count: -2, offset: 0 }
        );
    }

    /// Sequential decoding consumes each instruction exactly once, with no
    /// overlap between the decoded spans.
    #[test]
    fn sequential_decoding_covers_the_stream() -> Result<(), DecoderError> {
        let mut code = Vec::new();
        code.extend(emit(opcode::BEGIN, &[0, 0]));
        code.extend(emit(opcode::CONST, &[3]));
        code.extend(emit(opcode::CONST, &[4]));
        code.extend(emit(0x01, &[])); // BINOP +
        code.extend(emit(opcode::END, &[]));
        let total = code.len();

        let bf = file_with(code);
        let mut decoder = Decoder::new(&bf);
        let mut covered = 0;
        while decoder.ip() < total {
            let at = decoder.ip();
            decoder.decode_next()?;
            assert!(decoder.ip() > at);
            covered += decoder.ip() - at;
        }
        assert_eq!(covered, total);
        Ok(())
    }
}
