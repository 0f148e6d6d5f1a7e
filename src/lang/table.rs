//! Open-addressing hash set used to intern strings.
//!
//! Linear probing over a power-of-two slot array. Deleted keys leave a
//! tombstone so probe chains that ran through them stay intact; tombstones
//! are dropped when the table is rebuilt at a larger size.

use super::object::{ObjRef, ObjString};

pub const MIN_CAPACITY: usize = 8;

/// Maximum load factor, as a fraction: `numerator / denominator`.
const MAX_LOAD: (usize, usize) = (3, 4);

/// FNV-1a over raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in bytes {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Empty,
    Tombstone,
    Occupied { key: ObjRef, hash: u32 },
}

#[derive(Debug, Clone)]
pub struct InternTable {
    slots: Vec<Slot>,
    /// Live keys.
    count: usize,
    tombstones: usize,
}

impl Default for InternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InternTable {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// Creates a table with at least `capacity` slots (rounded up to a power of two).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY).next_power_of_two();
        InternTable {
            slots: vec![Slot::Empty; capacity],
            count: 0,
            tombstones: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    fn start_index(hash: u32, capacity: usize) -> usize {
        hash as usize % capacity
    }

    /// Slot holding `key`, or the slot an insert of `key` should use: the
    /// first tombstone on the probe chain if there was one, else the empty
    /// slot that ended it.
    fn find_slot(slots: &[Slot], key: ObjRef, hash: u32) -> usize {
        let capacity = slots.len();
        let mut index = Self::start_index(hash, capacity);
        let mut tombstone = None;

        loop {
            match slots[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied { key: k, .. } if k == key => return index,
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn needs_growth(&self) -> bool {
        let (num, den) = MAX_LOAD;
        (self.count + self.tombstones) * den >= self.capacity() * num
    }

    fn grow(&mut self) {
        let capacity = self.capacity() * 2;
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; capacity]);
        self.count = 0;
        self.tombstones = 0;

        for slot in old {
            if let Slot::Occupied { key, hash } = slot {
                let index = Self::find_slot(&self.slots, key, hash);
                self.slots[index] = slot;
                self.count += 1;
            }
        }
        tracing::trace!(capacity, live = self.count, "intern table resized");
    }

    /// Adds `key`. Returns `true` if it was not present before.
    pub fn insert(&mut self, key: ObjRef, hash: u32) -> bool {
        if self.needs_growth() {
            self.grow();
        }

        let index = Self::find_slot(&self.slots, key, hash);
        match self.slots[index] {
            Slot::Occupied { .. } => return false,
            Slot::Tombstone => {
                self.tombstones -= 1;
                self.count += 1;
            }
            Slot::Empty => self.count += 1,
        }
        self.slots[index] = Slot::Occupied { key, hash };
        true
    }

    pub fn contains(&self, key: ObjRef, hash: u32) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_slot(&self.slots, key, hash);
        matches!(self.slots[index], Slot::Occupied { .. })
    }

    /// Removes `key`, leaving a tombstone. Returns `true` if it was present.
    pub fn delete(&mut self, key: ObjRef, hash: u32) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_slot(&self.slots, key, hash);
        if !matches!(self.slots[index], Slot::Occupied { .. }) {
            return false;
        }
        self.slots[index] = Slot::Tombstone;
        self.count -= 1;
        self.tombstones += 1;
        true
    }

    /// Inserts every live key of `from`.
    pub fn add_all(&mut self, from: &InternTable) {
        for (key, hash) in from.iter() {
            self.insert(key, hash);
        }
    }

    /// Live keys with their hashes, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, u32)> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied { key, hash } => Some((*key, *hash)),
            _ => None,
        })
    }

    /// Looks up an interned string by content.
    ///
    /// `objects` is the heap the keys index into.
    pub fn find_interned(&self, objects: &[ObjString], bytes: &[u8], hash: u32) -> Option<ObjRef> {
        if self.count == 0 {
            return None;
        }

        let capacity = self.capacity();
        let mut index = Self::start_index(hash, capacity);
        loop {
            match self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied { key, hash: h } => {
                    let matches = h == hash
                        && objects
                            .get(key.index())
                            .is_some_and(|s| s.as_bytes() == bytes);
                    if matches {
                        return Some(key);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a heap-like object list and returns refs + hashes for each text.
    fn strings(texts: &[&str]) -> (Vec<ObjString>, Vec<(ObjRef, u32)>) {
        let objects: Vec<ObjString> = texts.iter().map(|t| ObjString::owned(t)).collect();
        let keys = objects
            .iter()
            .enumerate()
            .map(|(i, s)| (ObjRef::new(i), s.hash()))
            .collect();
        (objects, keys)
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(hash_bytes(b""), 2_166_136_261);
        assert_eq!(hash_bytes(b"a"), 0xe40c_292c);
        assert_eq!(hash_bytes(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_insert_and_find() {
        let (objects, keys) = strings(&["ab", "cd"]);
        let mut table = InternTable::new();
        assert!(table.insert(keys[0].0, keys[0].1));
        assert!(table.insert(keys[1].0, keys[1].1));
        assert!(!table.insert(keys[0].0, keys[0].1), "duplicate insert");
        assert_eq!(table.len(), 2);

        assert_eq!(
            table.find_interned(&objects, b"ab", hash_bytes(b"ab")),
            Some(keys[0].0)
        );
        assert_eq!(
            table.find_interned(&objects, b"ab ", hash_bytes(b"ab ")),
            None
        );
    }

    #[test]
    fn test_growth_once_per_threshold() {
        let texts: Vec<String> = (0..13).map(|n| format!("key{}", n)).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let (objects, keys) = strings(&refs);
        let mut table = InternTable::new();

        let mut capacities = Vec::new();
        for (key, hash) in &keys {
            table.insert(*key, *hash);
            capacities.push(table.capacity());
        }

        // 8 slots hold 6 keys; the 7th insert doubles to 16, the 13th to 32
        assert_eq!(&capacities[..6], &[8; 6]);
        assert_eq!(&capacities[6..12], &[16; 6]);
        assert_eq!(capacities[12], 32);

        for text in &texts {
            let bytes = text.as_bytes();
            assert!(
                table
                    .find_interned(&objects, bytes, hash_bytes(bytes))
                    .is_some(),
                "lost {} after growth",
                text
            );
        }
    }

    #[test]
    fn test_delete_leaves_tombstone_that_keeps_chain() {
        let mut table = InternTable::with_capacity(8);

        // force all three onto one probe chain by giving them the same hash
        let hash = 5;
        let (x, y, z) = (ObjRef::new(0), ObjRef::new(1), ObjRef::new(2));
        table.insert(x, hash);
        table.insert(y, hash);
        table.insert(z, hash);

        assert!(table.delete(y, hash));
        assert!(!table.delete(y, hash));
        assert_eq!(table.len(), 2);
        assert_eq!(table.tombstones(), 1);

        // z sits past the tombstone and must still be found
        assert!(table.contains(z, hash));
        assert!(!table.contains(y, hash));
    }

    #[test]
    fn test_find_interned_skips_tombstones() {
        let (objects, keys) = strings(&["alpha", "beta"]);
        let mut table = InternTable::new();
        for (key, hash) in &keys {
            table.insert(*key, *hash);
        }
        table.delete(keys[0].0, keys[0].1);

        assert_eq!(
            table.find_interned(&objects, b"beta", keys[1].1),
            Some(keys[1].0)
        );
        assert_eq!(table.find_interned(&objects, b"alpha", keys[0].1), None);
    }

    #[test]
    fn test_insert_reuses_tombstone() {
        let mut table = InternTable::new();
        let hash = 3;
        let (a, b, c) = (ObjRef::new(0), ObjRef::new(1), ObjRef::new(2));
        table.insert(a, hash);
        table.insert(b, hash);
        table.delete(a, hash);

        assert!(table.insert(c, hash));
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.len(), 2);
        assert!(table.contains(b, hash));
        assert!(table.contains(c, hash));
    }

    #[test]
    fn test_growth_drops_tombstones() {
        let mut table = InternTable::new();
        for n in 0..5 {
            table.insert(ObjRef::new(n), n as u32);
        }
        table.delete(ObjRef::new(0), 0);
        assert_eq!(table.tombstones(), 1);

        // 4 live + 1 tombstone + 1 new reaches the threshold on the next insert
        table.insert(ObjRef::new(5), 5);
        table.insert(ObjRef::new(6), 6);
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_add_all() {
        let mut from = InternTable::new();
        from.insert(ObjRef::new(0), 10);
        from.insert(ObjRef::new(1), 11);

        let mut to = InternTable::new();
        to.insert(ObjRef::new(1), 11);
        to.add_all(&from);

        assert_eq!(to.len(), 2);
        assert!(to.contains(ObjRef::new(0), 10));
    }

    #[test]
    fn test_with_capacity_rounds_to_power_of_two() {
        assert_eq!(InternTable::with_capacity(0).capacity(), 8);
        assert_eq!(InternTable::with_capacity(9).capacity(), 16);
        assert_eq!(InternTable::with_capacity(64).capacity(), 64);
    }
}
