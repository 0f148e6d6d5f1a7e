//! Heap objects.
//!
//! Strings are the only object kind. Every object lives in the `Heap`'s
//! object list and is addressed by an `ObjRef` index; the whole list is freed
//! at once when the heap is cleared or dropped. Strings created from source
//! literals and by `copy_string` are interned, so equal contents share one
//! object.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::table::{InternTable, hash_bytes};

/// Handle to an object in a `Heap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjRef(u32);

impl ObjRef {
    pub fn new(index: usize) -> Self {
        ObjRef(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Character data of a string object.
#[derive(Debug, Clone)]
pub enum StrData {
    /// Heap copy owned by the object.
    Owned(Box<str>),
    /// Slice of a shared source buffer; nothing is copied.
    Referenced {
        source: Rc<str>,
        start: usize,
        len: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ObjString {
    data: StrData,
    hash: u32,
}

impl ObjString {
    pub fn owned(text: &str) -> Self {
        ObjString {
            hash: hash_bytes(text.as_bytes()),
            data: StrData::Owned(text.into()),
        }
    }

    /// # Panics
    /// Panics if `start..start + len` is not a char-boundary range of `source`.
    pub fn referenced(source: &Rc<str>, start: usize, len: usize) -> Self {
        let text = &source[start..start + len];
        ObjString {
            hash: hash_bytes(text.as_bytes()),
            data: StrData::Referenced {
                source: Rc::clone(source),
                start,
                len,
            },
        }
    }

    pub fn as_str(&self) -> &str {
        match &self.data {
            StrData::Owned(s) => s,
            StrData::Referenced { source, start, len } => &source[*start..*start + *len],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.data, StrData::Owned(_))
    }
}

/// Object list plus the intern table that deduplicates it.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<ObjString>,
    strings: InternTable,
    // 0 means the table's own minimum
    table_capacity: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_capacity(capacity: usize) -> Self {
        Heap {
            objects: Vec::new(),
            strings: InternTable::with_capacity(capacity),
            table_capacity: capacity,
        }
    }

    fn push(&mut self, string: ObjString) -> ObjRef {
        let r = ObjRef::new(self.objects.len());
        self.objects.push(string);
        r
    }

    fn push_interned(&mut self, string: ObjString) -> ObjRef {
        let hash = string.hash();
        let r = self.push(string);
        self.strings.insert(r, hash);
        r
    }

    /// Existing string with these contents, if one was interned.
    pub fn find_interned(&self, text: &str) -> Option<ObjRef> {
        let bytes = text.as_bytes();
        self.strings
            .find_interned(&self.objects, bytes, hash_bytes(bytes))
    }

    /// Interned owned copy of `text`.
    pub fn copy_string(&mut self, text: &str) -> ObjRef {
        if let Some(r) = self.find_interned(text) {
            return r;
        }
        self.push_interned(ObjString::owned(text))
    }

    /// Interned string pointing at `source[start..start + len]`.
    pub fn ref_string(&mut self, source: &Rc<str>, start: usize, len: usize) -> ObjRef {
        if let Some(r) = self.find_interned(&source[start..start + len]) {
            return r;
        }
        self.push_interned(ObjString::referenced(source, start, len))
    }

    /// Fresh owned string `a ++ b`. The result is not interned.
    pub fn concat(&mut self, a: ObjRef, b: ObjRef) -> Option<ObjRef> {
        let left = self.get(a)?.as_str();
        let right = self.get(b)?.as_str();

        let mut text = String::with_capacity(left.len() + right.len());
        text.push_str(left);
        text.push_str(right);

        Some(self.push(ObjString::owned(&text)))
    }

    pub fn get(&self, r: ObjRef) -> Option<&ObjString> {
        self.objects.get(r.index())
    }

    pub fn as_str(&self, r: ObjRef) -> Option<&str> {
        self.get(r).map(ObjString::as_str)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn interned(&self) -> &InternTable {
        &self.strings
    }

    /// Frees every object at once.
    pub fn clear(&mut self) {
        tracing::debug!(objects = self.objects.len(), "freeing heap");
        self.objects.clear();
        self.strings = InternTable::with_capacity(self.table_capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_string_interns() {
        let mut heap = Heap::new();
        let a = heap.copy_string("ab");
        let b = heap.copy_string("ab");
        let c = heap.copy_string("ab ");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
        assert!(heap.get(a).unwrap().is_owned());
    }

    #[test]
    fn test_ref_string_points_into_source() {
        let source: Rc<str> = Rc::from(r#""hi" & "hi""#);
        let mut heap = Heap::new();
        let first = heap.ref_string(&source, 1, 2);
        let second = heap.ref_string(&source, 8, 2);

        assert_eq!(first, second);
        assert_eq!(heap.as_str(first), Some("hi"));
        assert!(!heap.get(first).unwrap().is_owned());
    }

    #[test]
    fn test_ref_and_copy_share_interned_instance() {
        let source: Rc<str> = Rc::from("xyz");
        let mut heap = Heap::new();
        let r = heap.ref_string(&source, 0, 3);
        let c = heap.copy_string("xyz");
        assert_eq!(r, c);
    }

    #[test]
    fn test_concat_is_fresh_and_not_interned() {
        let mut heap = Heap::new();
        let a = heap.copy_string("st");
        let b = heap.copy_string("ring");

        let x = heap.concat(a, b).unwrap();
        let y = heap.concat(a, b).unwrap();

        assert_eq!(heap.as_str(x), Some("string"));
        assert_ne!(x, y);
        assert!(heap.get(x).unwrap().is_owned());
        assert_eq!(heap.find_interned("string"), None);
    }

    #[test]
    fn test_concat_with_unknown_ref() {
        let mut heap = Heap::new();
        let a = heap.copy_string("a");
        assert_eq!(heap.concat(a, ObjRef::new(99)), None);
    }

    #[test]
    fn test_hash_is_cached_fnv() {
        let s = ObjString::owned("foobar");
        assert_eq!(s.hash(), hash_bytes(b"foobar"));
        assert_eq!(s.len(), 6);
    }

    #[test]
    fn test_clear_frees_everything() {
        let mut heap = Heap::new();
        heap.copy_string("one");
        heap.copy_string("two");
        heap.clear();

        assert!(heap.is_empty());
        assert!(heap.interned().is_empty());
        assert_eq!(heap.find_interned("one"), None);
    }

    #[test]
    fn test_clear_keeps_configured_table_capacity() {
        let mut heap = Heap::with_table_capacity(64);
        for n in 0..100 {
            heap.copy_string(&format!("s{}", n));
        }
        assert!(heap.interned().capacity() > 64);

        heap.clear();
        assert_eq!(heap.interned().capacity(), 64);

        let mut heap = Heap::new();
        heap.copy_string("x");
        heap.clear();
        assert_eq!(heap.interned().capacity(), 8);
    }
}
