//! Runtime heap of boxed values with a tracing mark-and-sweep collector.
//!
//! Objects live in a slab of slots addressed by [`Handle`]; the collector
//! never moves them, so handles stay valid for the lifetime of the object.
//! Every allocation may collect, with the operand stack's live region as
//! the root set; callers therefore allocate first and fill fields in place
//! rather than holding popped values across an allocation.

use crate::value::{Handle, Word};
use larchcore::bytecode::Pattern;
use thiserror::Error;
use tracing::debug;

/// Collect once this many objects are live; doubles with the surviving set.
const GC_INITIAL_THRESHOLD: usize = 1024;

/// Cut off value rendering on pathologically deep (or cyclic) data.
const MAX_RENDER_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeapError {
    #[error("dangling heap reference #{0}")]
    Dangling(Handle),
    #[error("index {index} is out of bounds for an object of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// A heap object: header kind plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Obj {
    Str(Vec<u8>),
    Array(Vec<Word>),
    Sexp { tag: i32, fields: Vec<Word> },
    /// Slot 0 is the code entry offset; captures follow.
    Closure { entry: u32, captures: Vec<Word> },
}

impl Obj {
    fn kind_name(&self) -> &'static str {
        match self {
            Obj::Str(_) => "a string",
            Obj::Array(_) => "an array",
            Obj::Sexp { .. } => "an S-expression",
            Obj::Closure { .. } => "a closure",
        }
    }

    fn children(&self) -> &[Word] {
        match self {
            Obj::Str(_) => &[],
            Obj::Array(items) => items,
            Obj::Sexp { fields, .. } => fields,
            Obj::Closure { captures, .. } => captures,
        }
    }
}

pub struct Heap {
    slots: Vec<Option<Obj>>,
    free: Vec<Handle>,
    live: usize,
    threshold: usize,
    collections: u64,
}

fn word_handle(w: Word) -> Option<Handle> {
    match w {
        Word::Obj(h) | Word::CaptureAddr(h, _) => Some(h),
        _ => None,
    }
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            threshold: GC_INITIAL_THRESHOLD,
            collections: 0,
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn collections(&self) -> u64 {
        self.collections
    }

    fn alloc(&mut self, obj: Obj, roots: &[Word]) -> Handle {
        if self.live >= self.threshold {
            self.collect(roots);
            self.threshold = (self.live * 2).max(GC_INITIAL_THRESHOLD);
        }

        self.live += 1;
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle as usize] = Some(obj);
                handle
            }
            None => {
                self.slots.push(Some(obj));
                (self.slots.len() - 1) as Handle
            }
        }
    }

    pub fn alloc_string(&mut self, bytes: &[u8], roots: &[Word]) -> Handle {
        self.alloc(Obj::Str(bytes.to_vec()), roots)
    }

    /// A fresh array of `len` boxed zeros, to be filled in place.
    pub fn alloc_array(&mut self, len: usize, roots: &[Word]) -> Handle {
        self.alloc(Obj::Array(vec![Word::ZERO; len]), roots)
    }

    /// A fresh S-expression with `fields` boxed-zero fields.
    pub fn alloc_sexp(&mut self, tag: i32, fields: usize, roots: &[Word]) -> Handle {
        self.alloc(
            Obj::Sexp {
                tag,
                fields: vec![Word::ZERO; fields],
            },
            roots,
        )
    }

    /// A fresh closure over `entry` with `captures` boxed-zero capture slots.
    pub fn alloc_closure(&mut self, entry: u32, captures: usize, roots: &[Word]) -> Handle {
        self.alloc(
            Obj::Closure {
                entry,
                captures: vec![Word::ZERO; captures],
            },
            roots,
        )
    }

    /// Mark everything reachable from `roots`, sweep the rest.
    pub fn collect(&mut self, roots: &[Word]) {
        let mut marked = vec![false; self.slots.len()];
        let mut worklist: Vec<Handle> = roots.iter().copied().filter_map(word_handle).collect();

        while let Some(handle) = worklist.pop() {
            let index = handle as usize;
            if index >= marked.len() || marked[index] {
                continue;
            }
            marked[index] = true;
            if let Some(obj) = &self.slots[index] {
                worklist.extend(obj.children().iter().copied().filter_map(word_handle));
            }
        }

        let before = self.live;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !marked[index] {
                *slot = None;
                self.free.push(index as Handle);
                self.live -= 1;
            }
        }
        self.collections += 1;
        debug!(freed = before - self.live, live = self.live, "collected");
    }

    pub fn get(&self, handle: Handle) -> Result<&Obj, HeapError> {
        self.slots
            .get(handle as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(HeapError::Dangling(handle))
    }

    fn get_mut(&mut self, handle: Handle) -> Result<&mut Obj, HeapError> {
        self.slots
            .get_mut(handle as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(HeapError::Dangling(handle))
    }

    /// Payload length per the object header: bytes for strings, elements
    /// for arrays and S-expressions, slot count for closures.
    pub fn length(&self, handle: Handle) -> Result<usize, HeapError> {
        Ok(match self.get(handle)? {
            Obj::Str(bytes) => bytes.len(),
            Obj::Array(items) => items.len(),
            Obj::Sexp { fields, .. } => fields.len(),
            Obj::Closure { captures, .. } => captures.len() + 1,
        })
    }

    fn check_index(index: i32, len: usize) -> Result<usize, HeapError> {
        if index < 0 || index as usize >= len {
            return Err(HeapError::IndexOutOfBounds {
                index: index as i64,
                len,
            });
        }
        Ok(index as usize)
    }

    /// Load an element of a string, array or S-expression. String elements
    /// are the character codes, unboxed.
    pub fn load_elem(&self, handle: Handle, index: i32) -> Result<Word, HeapError> {
        match self.get(handle)? {
            Obj::Str(bytes) => {
                let i = Self::check_index(index, bytes.len())?;
                Ok(Word::Imm(bytes[i] as i32))
            }
            Obj::Array(items) => {
                let i = Self::check_index(index, items.len())?;
                Ok(items[i])
            }
            Obj::Sexp { fields, .. } => {
                let i = Self::check_index(index, fields.len())?;
                Ok(fields[i])
            }
            other => Err(HeapError::KindMismatch {
                expected: "an aggregate",
                found: other.kind_name(),
            }),
        }
    }

    /// Store an element of a string, array or S-expression.
    pub fn store_elem(&mut self, handle: Handle, index: i32, value: Word) -> Result<(), HeapError> {
        match self.get_mut(handle)? {
            Obj::Str(bytes) => {
                let i = Self::check_index(index, bytes.len())?;
                let code = value.as_int().ok_or(HeapError::KindMismatch {
                    expected: "an integer",
                    found: "a reference",
                })?;
                bytes[i] = code as u8;
                Ok(())
            }
            Obj::Array(items) => {
                let i = Self::check_index(index, items.len())?;
                items[i] = value;
                Ok(())
            }
            Obj::Sexp { fields, .. } => {
                let i = Self::check_index(index, fields.len())?;
                fields[i] = value;
                Ok(())
            }
            other => Err(HeapError::KindMismatch {
                expected: "an aggregate",
                found: other.kind_name(),
            }),
        }
    }

    pub fn closure_entry(&self, handle: Handle) -> Result<usize, HeapError> {
        match self.get(handle)? {
            Obj::Closure { entry, .. } => Ok(*entry as usize),
            other => Err(HeapError::KindMismatch {
                expected: "a closure",
                found: other.kind_name(),
            }),
        }
    }

    pub fn capture(&self, handle: Handle, index: u32) -> Result<Word, HeapError> {
        match self.get(handle)? {
            Obj::Closure { captures, .. } => {
                let i = Self::check_index(index as i32, captures.len())?;
                Ok(captures[i])
            }
            other => Err(HeapError::KindMismatch {
                expected: "a closure",
                found: other.kind_name(),
            }),
        }
    }

    pub fn set_capture(&mut self, handle: Handle, index: u32, value: Word) -> Result<(), HeapError> {
        match self.get_mut(handle)? {
            Obj::Closure { captures, .. } => {
                let i = Self::check_index(index as i32, captures.len())?;
                captures[i] = value;
                Ok(())
            }
            other => Err(HeapError::KindMismatch {
                expected: "a closure",
                found: other.kind_name(),
            }),
        }
    }

    pub fn sexp_tag(&self, handle: Handle) -> Result<i32, HeapError> {
        match self.get(handle)? {
            Obj::Sexp { tag, .. } => Ok(*tag),
            other => Err(HeapError::KindMismatch {
                expected: "an S-expression",
                found: other.kind_name(),
            }),
        }
    }

    /// Structural equality of two strings; false when either operand is
    /// anything else.
    pub fn patt_string(&self, x: Word, y: Word) -> bool {
        match (x, y) {
            (Word::Obj(a), Word::Obj(b)) => matches!(
                (self.get(a), self.get(b)),
                (Ok(Obj::Str(sa)), Ok(Obj::Str(sb))) if sa == sb
            ),
            _ => false,
        }
    }

    /// The unary pattern checks; [`Pattern::String`] takes two operands and
    /// goes through [`Heap::patt_string`] instead.
    pub fn patt_kind(&self, pattern: Pattern, w: Word) -> bool {
        match pattern {
            Pattern::String => false,
            Pattern::Unboxed => matches!(w, Word::Imm(_)),
            Pattern::Boxed => !matches!(w, Word::Imm(_)),
            Pattern::StringTag => self.is_kind(w, |obj| matches!(obj, Obj::Str(_))),
            Pattern::ArrayTag => self.is_kind(w, |obj| matches!(obj, Obj::Array(_))),
            Pattern::SexpTag => self.is_kind(w, |obj| matches!(obj, Obj::Sexp { .. })),
            Pattern::ClosureTag => self.is_kind(w, |obj| matches!(obj, Obj::Closure { .. })),
        }
    }

    fn is_kind(&self, w: Word, pred: impl Fn(&Obj) -> bool) -> bool {
        match w {
            Word::Obj(h) => self.get(h).map(|obj| pred(obj)).unwrap_or(false),
            _ => false,
        }
    }

    /// Render a value the way the `string` built-in and match-failure
    /// diagnostics print it.
    pub fn render(&self, w: Word) -> String {
        self.render_at(w, 0, false)
    }

    fn render_at(&self, w: Word, depth: usize, nested: bool) -> String {
        if depth > MAX_RENDER_DEPTH {
            return "...".to_string();
        }
        match w {
            Word::Imm(n) => n.to_string(),
            Word::StackAddr(slot) => format!("<ref @{}>", slot),
            Word::CaptureAddr(h, slot) => format!("<ref #{}@{}>", h, slot),
            Word::Obj(h) => match self.get(h) {
                Err(_) => format!("<dangling #{}>", h),
                Ok(Obj::Str(bytes)) => {
                    let text = String::from_utf8_lossy(bytes);
                    if nested {
                        format!("\"{}\"", text)
                    } else {
                        text.into_owned()
                    }
                }
                Ok(Obj::Array(items)) => {
                    let items: Vec<String> = items
                        .iter()
                        .map(|&item| self.render_at(item, depth + 1, true))
                        .collect();
                    format!("[{}]", items.join(", "))
                }
                Ok(Obj::Sexp { tag, fields }) => {
                    let name = tag_unhash(*tag);
                    if fields.is_empty() {
                        name
                    } else {
                        let fields: Vec<String> = fields
                            .iter()
                            .map(|&field| self.render_at(field, depth + 1, true))
                            .collect();
                        format!("{} ({})", name, fields.join(", "))
                    }
                }
                Ok(Obj::Closure { entry, .. }) => format!("<closure {:#x}>", entry),
            },
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

/// Alphabet of the 6-bits-per-character tag hash.
const TAG_CHARS: &[u8] = b"_abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Deterministic hash of an S-expression tag name: a 6-bit alphabet fold
/// over the first five characters. Characters outside the alphabet fold in
/// their low six bits.
pub fn tag_hash(name: &[u8]) -> i32 {
    let mut hash: i32 = 0;
    for &b in name.iter().take(5) {
        let pos = TAG_CHARS
            .iter()
            .position(|&c| c == b)
            .unwrap_or((b & 0x3F) as usize);
        hash = (hash << 6) | pos as i32;
    }
    hash
}

/// Best-effort inverse of [`tag_hash`], for rendering S-expressions.
pub fn tag_unhash(mut hash: i32) -> String {
    let mut bytes = Vec::new();
    while hash > 0 {
        let pos = (hash & 0x3F) as usize;
        bytes.push(*TAG_CHARS.get(pos).unwrap_or(&b'?'));
        hash >>= 6;
    }
    bytes.reverse();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_unrooted_objects() {
        let mut heap = Heap::new();
        let kept = heap.alloc_string(b"kept", &[]);
        let lost = heap.alloc_string(b"lost", &[]);
        assert_eq!(heap.live(), 2);

        let roots = [Word::Obj(kept)];
        heap.collect(&roots);

        assert_eq!(heap.live(), 1);
        assert_eq!(heap.get(kept).unwrap(), &Obj::Str(b"kept".to_vec()));
        assert_eq!(heap.get(lost), Err(HeapError::Dangling(lost)));
    }

    #[test]
    fn marking_traces_through_aggregates() {
        let mut heap = Heap::new();
        let inner = heap.alloc_string(b"inner", &[]);
        let outer = heap.alloc_array(1, &[]);
        heap.store_elem(outer, 0, Word::Obj(inner)).unwrap();

        heap.collect(&[Word::Obj(outer)]);
        assert_eq!(heap.live(), 2);
        assert!(heap.get(inner).is_ok());
    }

    #[test]
    fn capture_cycles_are_collected() {
        let mut heap = Heap::new();
        let a = heap.alloc_closure(0, 1, &[]);
        let b = heap.alloc_closure(0, 1, &[]);
        heap.set_capture(a, 0, Word::Obj(b)).unwrap();
        heap.set_capture(b, 0, Word::Obj(a)).unwrap();

        heap.collect(&[]);
        assert_eq!(heap.live(), 0);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new();
        let first = heap.alloc_string(b"garbage", &[]);
        heap.collect(&[]);
        let second = heap.alloc_string(b"fresh", &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn element_access_is_bounds_checked() {
        let mut heap = Heap::new();
        let arr = heap.alloc_array(2, &[]);
        heap.store_elem(arr, 1, Word::Imm(5)).unwrap();
        assert_eq!(heap.load_elem(arr, 1), Ok(Word::Imm(5)));
        assert!(matches!(
            heap.load_elem(arr, 2),
            Err(HeapError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            heap.load_elem(arr, -1),
            Err(HeapError::IndexOutOfBounds { .. })
        ));

        let s = heap.alloc_string(b"ab", &[]);
        assert_eq!(heap.load_elem(s, 0), Ok(Word::Imm(b'a' as i32)));
    }

    #[test]
    fn pattern_checks() {
        let mut heap = Heap::new();
        let s1 = heap.alloc_string(b"x", &[]);
        let s2 = heap.alloc_string(b"x", &[]);
        let s3 = heap.alloc_string(b"y", &[]);
        let arr = heap.alloc_array(0, &[]);

        assert!(heap.patt_string(Word::Obj(s1), Word::Obj(s2)));
        assert!(!heap.patt_string(Word::Obj(s1), Word::Obj(s3)));
        assert!(!heap.patt_string(Word::Obj(s1), Word::Imm(3)));

        assert!(heap.patt_kind(Pattern::StringTag, Word::Obj(s1)));
        assert!(!heap.patt_kind(Pattern::StringTag, Word::Obj(arr)));
        assert!(heap.patt_kind(Pattern::ArrayTag, Word::Obj(arr)));
        assert!(heap.patt_kind(Pattern::Unboxed, Word::Imm(1)));
        assert!(!heap.patt_kind(Pattern::Boxed, Word::Imm(1)));
        assert!(heap.patt_kind(Pattern::Boxed, Word::Obj(arr)));
    }

    #[test]
    fn tag_hash_round_trips_through_unhash() {
        for name in ["cons", "nil", "Some", "None", "leaf"] {
            let hash = tag_hash(name.as_bytes());
            assert_eq!(tag_unhash(hash), name, "tag {}", name);
        }
        assert_eq!(tag_hash(b"cons"), tag_hash(b"cons"));
        assert_ne!(tag_hash(b"cons"), tag_hash(b"nil"));
    }

    #[test]
    fn renders_values() {
        let mut heap = Heap::new();
        let s = heap.alloc_string(b"hi", &[]);
        let arr = heap.alloc_array(2, &[]);
        heap.store_elem(arr, 0, Word::Imm(1)).unwrap();
        heap.store_elem(arr, 1, Word::Obj(s)).unwrap();
        let tag = tag_hash(b"pair");
        let sexp = heap.alloc_sexp(tag, 1, &[]);
        heap.store_elem(sexp, 0, Word::Obj(arr)).unwrap();

        assert_eq!(heap.render(Word::Imm(42)), "42");
        assert_eq!(heap.render(Word::Obj(s)), "hi");
        assert_eq!(heap.render(Word::Obj(arr)), "[1, \"hi\"]");
        assert_eq!(heap.render(Word::Obj(sexp)), "pair ([1, \"hi\"])");
    }
}
