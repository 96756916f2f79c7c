//! The dispatch loop of the Larch VM.
//!
//! One step decodes the instruction at `ip`, executes its side effect on
//! the operand stack, the frame stack and the heap, then either falls
//! through to the next instruction, jumps, or halts. Code reaching this
//! loop is expected to have passed verification; the checks that remain
//! here guard the dynamic properties the verifier cannot prove (value
//! kinds, aggregate bounds, arithmetic).

use crate::heap::{tag_hash, Heap, HeapError, Obj};
use crate::stack::{FrameStack, OperandStack, StackError};
use crate::value::{Handle, Word};
use larchcore::bytecode::{abs_target, Binop, Builtin, Instruction, Location, LocationEntry, Pattern};
use larchcore::bytefile::{Bytefile, BytefileError};
use larchcore::decoder::{Decoder, DecoderError};
use std::io::{self, BufRead, BufReader, Write};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("at {offset:#010x}: {source}")]
    At {
        offset: usize,
        #[source]
        source: Box<InterpreterError>,
    },
    #[error(transparent)]
    Decode(#[from] DecoderError),
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error(transparent)]
    Heap(#[from] HeapError),
    #[error(transparent)]
    Bytefile(#[from] BytefileError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("main is not a public symbol of this file")]
    NoEntrypoint,
    #[error("expected {expected} on the operand stack")]
    TypeMismatch { expected: &'static str },
    #[error("memory access failed: {location} is out of bounds ({limit} available)")]
    BadLocation { location: LocationEntry, limit: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("cannot read an integer from standard input: {0}")]
    BadInput(String),
    #[error("match failure at {file}:{line}:{col}, value: {value}")]
    MatchFailure {
        file: String,
        line: i32,
        col: i32,
        value: String,
    },
}

impl InterpreterError {
    /// The innermost error, with position wrappers peeled off.
    pub fn root(&self) -> &InterpreterError {
        match self {
            InterpreterError::At { source, .. } => source.root(),
            other => other,
        }
    }
}

/// How the instruction pointer moves after one instruction.
enum Flow {
    Next(usize),
    Jump(usize),
    Halt,
}

/// A resolved location: an operand-stack slot or a closure capture slot.
enum Lvalue {
    Slot(usize),
    Capture(Handle, u32),
}

pub struct Interpreter<'a> {
    bf: &'a Bytefile,
    file_name: String,
    ops: OperandStack,
    frames: FrameStack,
    heap: Heap,
    input: Box<dyn BufRead + 'a>,
    output: Box<dyn Write + 'a>,
}

impl<'a> Interpreter<'a> {
    /// An interpreter wired to standard input and output. Reserves the
    /// globals area at the bottom of the operand stack and installs the
    /// sentinel frame for `main`.
    pub fn new(bf: &'a Bytefile, file_name: impl Into<String>) -> Result<Self, InterpreterError> {
        Self::with_io(
            bf,
            file_name,
            BufReader::new(io::stdin()),
            io::stdout(),
        )
    }

    /// An interpreter over caller-supplied input and output streams.
    pub fn with_io(
        bf: &'a Bytefile,
        file_name: impl Into<String>,
        input: impl BufRead + 'a,
        output: impl Write + 'a,
    ) -> Result<Self, InterpreterError> {
        let mut ops = OperandStack::new();
        ops.reserve_globals(bf.global_area_size() as usize)?;
        let frames = FrameStack::new(ops.top_index());
        Ok(Interpreter {
            bf,
            file_name: file_name.into(),
            ops,
            frames,
            heap: Heap::new(),
            input: Box::new(input),
            output: Box::new(output),
        })
    }

    /// Run from the `main` entry point until the program halts.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        let entry = self.bf.entrypoint().ok_or(InterpreterError::NoEntrypoint)?;
        self.run_from(entry)
    }

    pub fn run_from(&mut self, entry: usize) -> Result<(), InterpreterError> {
        let mut ip = entry;
        loop {
            let offset = ip;
            match self.step(ip) {
                Ok(Flow::Next(next)) => ip = next,
                Ok(Flow::Jump(target)) => ip = target,
                Ok(Flow::Halt) => return Ok(()),
                Err(source) => {
                    return Err(InterpreterError::At {
                        offset,
                        source: Box::new(source),
                    })
                }
            }
        }
    }

    fn step(&mut self, ip: usize) -> Result<Flow, InterpreterError> {
        let (inst, next) = Decoder::new(self.bf).decode_at(ip)?;
        trace!(ip, ?inst, depth = self.ops.depth(), "step");
        self.eval(inst, next)
    }

    /// The top operand-stack word; a probe for embedders and tests.
    pub fn top(&self) -> Result<Word, StackError> {
        self.ops.top_word()
    }

    pub fn operand_depth(&self) -> usize {
        self.ops.depth()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.depth()
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    fn pop_int(&mut self) -> Result<i32, InterpreterError> {
        self.ops
            .pop()?
            .as_int()
            .ok_or(InterpreterError::TypeMismatch {
                expected: "an integer",
            })
    }

    fn pop_obj(&mut self) -> Result<Handle, InterpreterError> {
        self.ops
            .pop()?
            .as_obj()
            .ok_or(InterpreterError::TypeMismatch {
                expected: "a reference",
            })
    }

    fn resolve(&self, location: LocationEntry) -> Result<Lvalue, InterpreterError> {
        let frame = self.frames.top()?;
        let index = location.index;
        let bad = |limit: usize| InterpreterError::BadLocation { location, limit };

        match location.kind {
            Location::Global => {
                let limit = self.ops.globals();
                if index < 0 || index as usize >= limit {
                    return Err(bad(limit));
                }
                Ok(Lvalue::Slot(self.ops.global_slot(index as usize)))
            }
            Location::Local => {
                if index < 0 || index as usize >= frame.locals {
                    return Err(bad(frame.locals));
                }
                Ok(Lvalue::Slot(frame.base - index as usize))
            }
            Location::Arg => {
                if index < 0 || index as usize >= frame.args {
                    return Err(bad(frame.args));
                }
                Ok(Lvalue::Slot(frame.base + (frame.args - index as usize)))
            }
            Location::Captured => {
                if !frame.is_closure || index < 0 {
                    return Err(bad(0));
                }
                let closure_slot = frame.base + frame.args + 1;
                let closure = self
                    .ops
                    .load(closure_slot)?
                    .as_obj()
                    .ok_or(InterpreterError::TypeMismatch {
                        expected: "a closure",
                    })?;
                Ok(Lvalue::Capture(closure, index as u32))
            }
        }
    }

    fn read_location(&self, location: LocationEntry) -> Result<Word, InterpreterError> {
        match self.resolve(location)? {
            Lvalue::Slot(slot) => Ok(self.ops.load(slot)?),
            Lvalue::Capture(h, i) => Ok(self.heap.capture(h, i)?),
        }
    }

    fn write_location(&mut self, location: LocationEntry, v: Word) -> Result<(), InterpreterError> {
        match self.resolve(location)? {
            Lvalue::Slot(slot) => self.ops.store(slot, v)?,
            Lvalue::Capture(h, i) => self.heap.set_capture(h, i, v)?,
        }
        Ok(())
    }

    /// Store through an address word produced by `LDA`.
    fn write_through(&mut self, addr: Word, v: Word) -> Result<(), InterpreterError> {
        match addr {
            Word::StackAddr(slot) => self.ops.store(slot as usize, v)?,
            Word::CaptureAddr(h, i) => self.heap.set_capture(h, i, v)?,
            _ => {
                return Err(InterpreterError::TypeMismatch {
                    expected: "an address",
                })
            }
        }
        Ok(())
    }

    fn read_int(&mut self) -> Result<i32, InterpreterError> {
        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .map_err(|e| InterpreterError::BadInput(e.to_string()))?;
        line.trim()
            .parse()
            .map_err(|_| InterpreterError::BadInput(line.trim().to_string()))
    }

    fn eval(&mut self, inst: Instruction, next: usize) -> Result<Flow, InterpreterError> {
        match inst {
            Instruction::Binop(op) => {
                let rhs = self.pop_int()?;
                let lhs = self.pop_int()?;
                let result = match op {
                    Binop::Add => lhs.wrapping_add(rhs),
                    Binop::Sub => lhs.wrapping_sub(rhs),
                    Binop::Mul => lhs.wrapping_mul(rhs),
                    Binop::Div => {
                        if rhs == 0 {
                            return Err(InterpreterError::DivisionByZero);
                        }
                        lhs.wrapping_div(rhs)
                    }
                    Binop::Rem => {
                        if rhs == 0 {
                            return Err(InterpreterError::DivisionByZero);
                        }
                        lhs.wrapping_rem(rhs)
                    }
                    Binop::Lt => (lhs < rhs) as i32,
                    Binop::Le => (lhs <= rhs) as i32,
                    Binop::Gt => (lhs > rhs) as i32,
                    Binop::Ge => (lhs >= rhs) as i32,
                    Binop::Eq => (lhs == rhs) as i32,
                    Binop::Ne => (lhs != rhs) as i32,
                    Binop::And => (lhs != 0 && rhs != 0) as i32,
                    Binop::Or => (lhs != 0 || rhs != 0) as i32,
                };
                self.ops.push(Word::Imm(result))?;
            }
            Instruction::Const(n) => self.ops.push(Word::Imm(n))?,
            Instruction::String { offset } => {
                let handle = self
                    .heap
                    .alloc_string(self.bf.string_at(offset as usize)?, self.ops.roots());
                self.ops.push(Word::Obj(handle))?;
            }
            Instruction::Sexp { tag, fields } => {
                if fields as usize > self.ops.depth() {
                    return Err(StackError::Underflow.into());
                }
                let hash = tag_hash(self.bf.string_at(tag as usize)?);
                // Allocate first: the fields still sit on the stack, where
                // the collector can see them.
                let handle = self.heap.alloc_sexp(hash, fields as usize, self.ops.roots());
                for i in (0..fields).rev() {
                    let v = self.ops.pop()?;
                    self.heap.store_elem(handle, i, v)?;
                }
                self.ops.push(Word::Obj(handle))?;
            }
            Instruction::Sti => {
                let v = self.ops.pop()?;
                let addr = self.ops.pop()?;
                self.write_through(addr, v)?;
                self.ops.push(v)?;
            }
            Instruction::Sta => {
                let v = self.ops.pop()?;
                let index = self.ops.pop()?;
                let aggregate = self.ops.pop()?;
                match index {
                    Word::Imm(i) => {
                        let handle = aggregate.as_obj().ok_or(InterpreterError::TypeMismatch {
                            expected: "an aggregate",
                        })?;
                        self.heap.store_elem(handle, i, v)?;
                        self.ops.push(aggregate)?;
                    }
                    addr => {
                        // The index slot holds an address word from LDA; the
                        // third pop was its duplicate.
                        self.write_through(addr, v)?;
                        self.ops.push(v)?;
                    }
                }
            }
            Instruction::Jmp { target } => return Ok(Flow::Jump(abs_target(target))),
            Instruction::End | Instruction::Ret => {
                return Ok(match self.frames.ret(&mut self.ops)? {
                    Some(ip) => Flow::Jump(ip),
                    None => Flow::Halt,
                })
            }
            Instruction::Drop => {
                self.ops.pop()?;
            }
            Instruction::Dup => {
                let w = self.ops.top_word()?;
                self.ops.push(w)?;
            }
            Instruction::Swap => {
                let fst = self.ops.pop()?;
                let snd = self.ops.pop()?;
                self.ops.push(fst)?;
                self.ops.push(snd)?;
            }
            Instruction::Elem => {
                let index = self.pop_int()?;
                let handle = self.pop_obj()?;
                let elem = self.heap.load_elem(handle, index)?;
                self.ops.push(elem)?;
            }
            Instruction::CJmpZ { target } => {
                if self.pop_int()? == 0 {
                    return Ok(Flow::Jump(abs_target(target)));
                }
            }
            Instruction::CJmpNz { target } => {
                if self.pop_int()? != 0 {
                    return Ok(Flow::Jump(abs_target(target)));
                }
            }
            Instruction::Begin { locals, .. } | Instruction::CBegin { locals, .. } => {
                self.frames.alloc_locals(locals as usize, &mut self.ops)?;
            }
            Instruction::Closure { entry, captures } => {
                // Park the captured values on the stack so the allocation
                // below cannot lose them, then move them into the closure.
                for capture in &captures {
                    let w = self.read_location(*capture)?;
                    self.ops.push(w)?;
                }
                let count = captures.len();
                let handle = self.heap.alloc_closure(
                    abs_target(entry) as u32,
                    count,
                    self.ops.roots(),
                );
                for i in (0..count).rev() {
                    let v = self.ops.pop()?;
                    self.heap.set_capture(handle, i as u32, v)?;
                }
                self.ops.push(Word::Obj(handle))?;
            }
            Instruction::CallC { args } => {
                let closure = self
                    .ops
                    .peek(args as usize)?
                    .as_obj()
                    .ok_or(InterpreterError::TypeMismatch {
                        expected: "a closure",
                    })?;
                let entry = self.heap.closure_entry(closure)?;
                self.frames.call(next, args as usize, true, &self.ops)?;
                return Ok(Flow::Jump(entry));
            }
            Instruction::Call { offset, args } => {
                self.frames.call(next, args as usize, false, &self.ops)?;
                return Ok(Flow::Jump(abs_target(offset)));
            }
            Instruction::Tag { tag, arity } => {
                let hash = tag_hash(self.bf.string_at(tag as usize)?);
                let w = self.ops.pop()?;
                let matches = match w.as_obj().map(|h| self.heap.get(h)) {
                    Some(Ok(Obj::Sexp { tag, fields })) => {
                        *tag == hash && fields.len() == arity as usize
                    }
                    _ => false,
                };
                self.ops.push(Word::Imm(matches as i32))?;
            }
            Instruction::Array { len } => {
                let w = self.ops.pop()?;
                let matches = match w.as_obj().map(|h| self.heap.get(h)) {
                    Some(Ok(Obj::Array(items))) => items.len() == len as usize,
                    _ => false,
                };
                self.ops.push(Word::Imm(matches as i32))?;
            }
            Instruction::Fail { line, col } => {
                let w = self.ops.pop()?;
                return Err(InterpreterError::MatchFailure {
                    file: self.file_name.clone(),
                    line,
                    col,
                    value: self.heap.render(w),
                });
            }
            Instruction::Line { .. } => {}
            Instruction::Ld(location) => {
                let w = self.read_location(location)?;
                self.ops.push(w)?;
            }
            Instruction::Lda(location) => {
                let addr = match self.resolve(location)? {
                    Lvalue::Slot(slot) => Word::StackAddr(slot as u32),
                    Lvalue::Capture(h, i) => Word::CaptureAddr(h, i),
                };
                self.ops.push(addr)?;
                self.ops.push(addr)?;
            }
            Instruction::St(location) => {
                let v = self.ops.top_word()?;
                self.write_location(location, v)?;
            }
            Instruction::Patt(Pattern::String) => {
                let x = self.ops.pop()?;
                let y = self.ops.pop()?;
                let matches = self.heap.patt_string(x, y);
                self.ops.push(Word::Imm(matches as i32))?;
            }
            Instruction::Patt(pattern) => {
                let w = self.ops.pop()?;
                let matches = self.heap.patt_kind(pattern, w);
                self.ops.push(Word::Imm(matches as i32))?;
            }
            Instruction::LCall(Builtin::Read) => {
                let n = self.read_int()?;
                self.ops.push(Word::Imm(n))?;
            }
            Instruction::LCall(Builtin::Write) => {
                let n = self.pop_int()?;
                writeln!(self.output, "{}", n)?;
                self.ops.push(Word::Imm(0))?;
            }
            Instruction::LCall(Builtin::Length) => {
                let handle = self.pop_obj()?;
                let len = self.heap.length(handle)?;
                self.ops.push(Word::Imm(len as i32))?;
            }
            Instruction::LCall(Builtin::String) => {
                let w = self.ops.pop()?;
                let rendered = self.heap.render(w);
                // The scrutinee is already off the stack; render is done
                // with it, so losing it to the collector here is fine.
                let handle = self.heap.alloc_string(rendered.as_bytes(), self.ops.roots());
                self.ops.push(Word::Obj(handle))?;
            }
            Instruction::LCall(Builtin::Array { len }) => {
                if len as usize > self.ops.depth() {
                    return Err(StackError::Underflow.into());
                }
                let handle = self.heap.alloc_array(len as usize, self.ops.roots());
                for i in (0..len).rev() {
                    let v = self.ops.pop()?;
                    self.heap.store_elem(handle, i, v)?;
                }
                self.ops.push(Word::Obj(handle))?;
            }
            Instruction::Stop => return Ok(Flow::Halt),
        }
        Ok(Flow::Next(next))
    }
}
