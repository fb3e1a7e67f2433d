//! The atom interner: hash-consed, reference-counted scalar values.
//!
//! Every atomic value in a compiled rule base — symbols, strings, instance
//! names, floats, integers, bitmaps, and external addresses — is stored
//! exactly once per table and handed out as a small, `Copy` [`AtomRef`].
//! Equal payloads always resolve to the same reference, so comparing two
//! atoms is an integer comparison regardless of payload size.
//!
//! Values are reference-counted. A freshly interned value starts out
//! *ephemeral*: it has no persistent referent yet, and will be reclaimed the
//! next time [`AtomInterner::sweep`] runs unless something calls
//! [`AtomInterner::increment`] on it first. This mirrors how a parser
//! manufactures atoms while scanning — most of them are discarded before a
//! construct is ever committed.
//!
//! ```
//! use rete_base::atoms::AtomInterner;
//!
//! let mut atoms = AtomInterner::new();
//! let a = atoms.add_symbol("foo");
//! let b = atoms.add_symbol("foo");
//! assert_eq!(a, b);
//!
//! atoms.increment(a);
//! atoms.sweep();
//! assert!(atoms.find_symbol("foo").is_some());
//! ```

use crate::hash::{bitmap_hash, external_address_hash, float_hash, integer_hash, symbol_hash};
use std::collections::HashMap;

/// Which per-type table an [`AtomRef`] was issued from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AtomCategory {
    Symbol,
    String,
    InstanceName,
    Float,
    Integer,
    Bitmap,
    ExternalAddress,
}

/// An opaque, `Copy` handle to an interned atom.
///
/// Two refs compare equal iff they were issued for equal payloads from the
/// same table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AtomRef {
    category: AtomCategory,
    slot: u32,
}

impl AtomRef {
    /// Which table this reference belongs to.
    pub fn category(self) -> AtomCategory {
        self.category
    }
}

/// Borrowed view of an atom's payload, for callers that need to inspect a
/// value without knowing which table it lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtomValue<'a> {
    Symbol(&'a str),
    String(&'a str),
    InstanceName(&'a str),
    Float(f64),
    Integer(i64),
    Bitmap(&'a [u8]),
    ExternalAddress { kind: u16, pointer: u64 },
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum Key {
    Text(String),
    FloatBits(u64),
    Integer(i64),
    Bitmap(Vec<u8>),
    ExternalAddress(u16, u64),
}

struct Entry {
    key: Key,
    #[allow(dead_code)]
    bucket: usize,
    count: u32,
    marked_ephemeral: bool,
    permanent: bool,
}

/// One category's hash-consing table: fixed bucket count (for the `bucket`
/// bookkeeping field only — lookup itself uses a `HashMap` for correctness),
/// reference counts, and an ephemeral reclamation list.
struct Table {
    capacity: usize,
    lookup: HashMap<Key, u32>,
    entries: Vec<Option<Entry>>,
    free: Vec<u32>,
    ephemeral: Vec<u32>,
}

impl Table {
    fn new(capacity: usize) -> Self {
        Table {
            capacity: capacity.max(1),
            lookup: HashMap::new(),
            entries: Vec::new(),
            free: Vec::new(),
            ephemeral: Vec::new(),
        }
    }

    fn find(&self, key: &Key) -> Option<u32> {
        self.lookup.get(key).copied()
    }

    fn add(&mut self, key: Key, hash: u64, permanent: bool) -> u32 {
        if let Some(&slot) = self.lookup.get(&key) {
            return slot;
        }
        let bucket = (hash % self.capacity as u64) as usize;
        let entry = Entry {
            key: key.clone(),
            bucket,
            count: 0,
            marked_ephemeral: true,
            permanent,
        };
        let slot = if let Some(slot) = self.free.pop() {
            self.entries[slot as usize] = Some(entry);
            slot
        } else {
            let slot = self.entries.len() as u32;
            self.entries.push(Some(entry));
            slot
        };
        self.lookup.insert(key, slot);
        self.ephemeral.push(slot);
        slot
    }

    fn increment(&mut self, slot: u32) {
        if let Some(entry) = self.entries[slot as usize].as_mut() {
            entry.count += 1;
        }
    }

    fn decrement(&mut self, slot: u32) -> Result<(), String> {
        let entry = self.entries[slot as usize]
            .as_mut()
            .ok_or_else(|| "decrement on a freed atom slot".to_string())?;
        if entry.count == 0 {
            return Err("decrement on a zero-count atom".to_string());
        }
        entry.count -= 1;
        if entry.count == 0 && !entry.marked_ephemeral {
            entry.marked_ephemeral = true;
            self.ephemeral.push(slot);
        }
        Ok(())
    }

    fn ephemerate(&mut self, slot: u32) {
        if let Some(entry) = self.entries[slot as usize].as_mut() {
            if !entry.marked_ephemeral {
                entry.marked_ephemeral = true;
                self.ephemeral.push(slot);
            }
        }
    }

    fn sweep(&mut self) {
        let frame = std::mem::take(&mut self.ephemeral);
        for slot in frame {
            let should_free = match self.entries[slot as usize].as_mut() {
                Some(entry) if entry.count == 0 && !entry.permanent => true,
                Some(entry) => {
                    entry.marked_ephemeral = false;
                    false
                }
                None => false,
            };
            if should_free {
                if let Some(entry) = self.entries[slot as usize].take() {
                    self.lookup.remove(&entry.key);
                }
                self.free.push(slot);
            }
        }
    }

    fn len(&self) -> usize {
        self.lookup.len()
    }
}

/// Default bucket-count guess for a freshly created table; small and prime,
/// matching the original's fixed-size hash tables. Grows in entry count
/// without rehashing since lookup is backed by a `HashMap`; only the
/// `bucket` bookkeeping field is computed modulo this constant.
const DEFAULT_CAPACITY: usize = 167;

/// The full atom interner: one table per scalar category.
pub struct AtomInterner {
    symbols: Table,
    strings: Table,
    instance_names: Table,
    floats: Table,
    integers: Table,
    bitmaps: Table,
    external_addresses: Table,
}

impl AtomInterner {
    /// Creates an interner with default table capacities.
    pub fn new() -> Self {
        Self::with_capacities(
            DEFAULT_CAPACITY,
            DEFAULT_CAPACITY,
            DEFAULT_CAPACITY,
            DEFAULT_CAPACITY,
            DEFAULT_CAPACITY,
            DEFAULT_CAPACITY,
            DEFAULT_CAPACITY,
        )
    }

    /// Creates an interner with explicit initial capacities per table, used
    /// when an `EnvironmentConfig` requests non-default sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn with_capacities(
        symbol: usize,
        string: usize,
        instance_name: usize,
        float: usize,
        integer: usize,
        bitmap: usize,
        external_address: usize,
    ) -> Self {
        AtomInterner {
            symbols: Table::new(symbol),
            strings: Table::new(string),
            instance_names: Table::new(instance_name),
            floats: Table::new(float),
            integers: Table::new(integer),
            bitmaps: Table::new(bitmap),
            external_addresses: Table::new(external_address),
        }
    }

    fn table(&self, category: AtomCategory) -> &Table {
        match category {
            AtomCategory::Symbol => &self.symbols,
            AtomCategory::String => &self.strings,
            AtomCategory::InstanceName => &self.instance_names,
            AtomCategory::Float => &self.floats,
            AtomCategory::Integer => &self.integers,
            AtomCategory::Bitmap => &self.bitmaps,
            AtomCategory::ExternalAddress => &self.external_addresses,
        }
    }

    fn table_mut(&mut self, category: AtomCategory) -> &mut Table {
        match category {
            AtomCategory::Symbol => &mut self.symbols,
            AtomCategory::String => &mut self.strings,
            AtomCategory::InstanceName => &mut self.instance_names,
            AtomCategory::Float => &mut self.floats,
            AtomCategory::Integer => &mut self.integers,
            AtomCategory::Bitmap => &mut self.bitmaps,
            AtomCategory::ExternalAddress => &mut self.external_addresses,
        }
    }

    fn add_text(&mut self, category: AtomCategory, s: &str, permanent: bool) -> AtomRef {
        let hash = symbol_hash(s);
        let slot = self
            .table_mut(category)
            .add(Key::Text(s.to_string()), hash, permanent);
        AtomRef { category, slot }
    }

    fn find_text(&self, category: AtomCategory, s: &str) -> Option<AtomRef> {
        let slot = self.table(category).find(&Key::Text(s.to_string()))?;
        Some(AtomRef { category, slot })
    }

    /// Interns a symbol. Idempotent: interning the same text twice returns
    /// the same reference.
    pub fn add_symbol(&mut self, s: &str) -> AtomRef {
        self.add_text(AtomCategory::Symbol, s, false)
    }

    /// Interns a permanent symbol that is never reclaimed by [`Self::sweep`],
    /// for well-known names such as `MAIN` or facet keywords.
    pub fn add_permanent_symbol(&mut self, s: &str) -> AtomRef {
        self.add_text(AtomCategory::Symbol, s, true)
    }

    pub fn find_symbol(&self, s: &str) -> Option<AtomRef> {
        self.find_text(AtomCategory::Symbol, s)
    }

    pub fn add_string(&mut self, s: &str) -> AtomRef {
        self.add_text(AtomCategory::String, s, false)
    }

    pub fn find_string(&self, s: &str) -> Option<AtomRef> {
        self.find_text(AtomCategory::String, s)
    }

    pub fn add_instance_name(&mut self, s: &str) -> AtomRef {
        self.add_text(AtomCategory::InstanceName, s, false)
    }

    pub fn find_instance_name(&self, s: &str) -> Option<AtomRef> {
        self.find_text(AtomCategory::InstanceName, s)
    }

    pub fn add_float(&mut self, value: f64) -> AtomRef {
        let hash = float_hash(value);
        let slot = self
            .floats
            .add(Key::FloatBits(value.to_bits()), hash, false);
        AtomRef {
            category: AtomCategory::Float,
            slot,
        }
    }

    pub fn find_float(&self, value: f64) -> Option<AtomRef> {
        let slot = self.floats.find(&Key::FloatBits(value.to_bits()))?;
        Some(AtomRef {
            category: AtomCategory::Float,
            slot,
        })
    }

    pub fn add_integer(&mut self, value: i64) -> AtomRef {
        let hash = integer_hash(value);
        let slot = self.integers.add(Key::Integer(value), hash, false);
        AtomRef {
            category: AtomCategory::Integer,
            slot,
        }
    }

    pub fn find_integer(&self, value: i64) -> Option<AtomRef> {
        let slot = self.integers.find(&Key::Integer(value))?;
        Some(AtomRef {
            category: AtomCategory::Integer,
            slot,
        })
    }

    pub fn add_bitmap(&mut self, bytes: &[u8]) -> AtomRef {
        let hash = bitmap_hash(bytes);
        let slot = self
            .bitmaps
            .add(Key::Bitmap(bytes.to_vec()), hash, false);
        AtomRef {
            category: AtomCategory::Bitmap,
            slot,
        }
    }

    pub fn find_bitmap(&self, bytes: &[u8]) -> Option<AtomRef> {
        let slot = self.bitmaps.find(&Key::Bitmap(bytes.to_vec()))?;
        Some(AtomRef {
            category: AtomCategory::Bitmap,
            slot,
        })
    }

    pub fn add_external(&mut self, kind: u16, pointer: u64) -> AtomRef {
        let hash = external_address_hash(pointer);
        let slot = self.external_addresses.add(
            Key::ExternalAddress(kind, pointer),
            hash,
            false,
        );
        AtomRef {
            category: AtomCategory::ExternalAddress,
            slot,
        }
    }

    pub fn find_external(&self, kind: u16, pointer: u64) -> Option<AtomRef> {
        let slot = self
            .external_addresses
            .find(&Key::ExternalAddress(kind, pointer))?;
        Some(AtomRef {
            category: AtomCategory::ExternalAddress,
            slot,
        })
    }

    /// Increments a reference's count, claiming it against the next sweep.
    pub fn increment(&mut self, r: AtomRef) {
        self.table_mut(r.category).increment(r.slot);
    }

    /// Decrements a reference's count. Decrementing a zero-count atom is an
    /// invariant violation (a system error in the original terminology).
    pub fn decrement(&mut self, r: AtomRef) -> Result<(), String> {
        self.table_mut(r.category).decrement(r.slot)
    }

    /// Marks a reference transient without touching its count, for values
    /// that originate on the evaluation stack rather than in a persistent
    /// structure.
    pub fn ephemerate(&mut self, r: AtomRef) {
        self.table_mut(r.category).ephemerate(r.slot);
    }

    /// Reclaims every zero-count, non-permanent entry currently marked
    /// ephemeral across all seven tables, and clears the ephemeral mark on
    /// every entry that survived (because something incremented it since it
    /// was added to the frame).
    pub fn sweep(&mut self) {
        self.symbols.sweep();
        self.strings.sweep();
        self.instance_names.sweep();
        self.floats.sweep();
        self.integers.sweep();
        self.bitmaps.sweep();
        self.external_addresses.sweep();
    }

    /// Looks up the payload behind a reference.
    pub fn value(&self, r: AtomRef) -> AtomValue<'_> {
        let entry = self.table(r.category).entries[r.slot as usize]
            .as_ref()
            .expect("AtomRef used after its entry was swept");
        match &entry.key {
            Key::Text(s) => match r.category {
                AtomCategory::Symbol => AtomValue::Symbol(s),
                AtomCategory::String => AtomValue::String(s),
                AtomCategory::InstanceName => AtomValue::InstanceName(s),
                _ => unreachable!("text key outside a text category"),
            },
            Key::FloatBits(bits) => AtomValue::Float(f64::from_bits(*bits)),
            Key::Integer(i) => AtomValue::Integer(*i),
            Key::Bitmap(b) => AtomValue::Bitmap(b),
            Key::ExternalAddress(kind, ptr) => AtomValue::ExternalAddress {
                kind: *kind,
                pointer: *ptr,
            },
        }
    }

    /// Number of distinct values currently interned in a given category.
    pub fn len(&self, category: AtomCategory) -> usize {
        self.table(category).len()
    }
}

impl Default for AtomInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_symbol_is_idempotent() {
        let mut atoms = AtomInterner::new();
        let a = atoms.add_symbol("foo");
        let b = atoms.add_symbol("foo");
        assert_eq!(a, b);
        assert_eq!(atoms.len(AtomCategory::Symbol), 1);
    }

    #[test]
    fn distinct_categories_do_not_collide() {
        let mut atoms = AtomInterner::new();
        let sym = atoms.add_symbol("42");
        let int = atoms.add_integer(42);
        assert_ne!(sym, int);
    }

    #[test]
    fn sweep_reclaims_zero_count_entries() {
        let mut atoms = AtomInterner::new();
        atoms.add_symbol("temp");
        assert!(atoms.find_symbol("temp").is_some());
        atoms.sweep();
        assert!(atoms.find_symbol("temp").is_none());
    }

    #[test]
    fn incremented_entries_survive_sweep() {
        let mut atoms = AtomInterner::new();
        let r = atoms.add_symbol("kept");
        atoms.increment(r);
        atoms.sweep();
        assert!(atoms.find_symbol("kept").is_some());
    }

    #[test]
    fn reinterning_after_sweep_may_yield_new_ref() {
        let mut atoms = AtomInterner::new();
        let first = atoms.add_symbol("cycle");
        atoms.sweep();
        assert!(atoms.find_symbol("cycle").is_none());
        let second = atoms.add_symbol("cycle");
        // A fresh slot may or may not reuse the old index, but the old
        // reference must no longer resolve to a live entry.
        atoms.increment(second);
        atoms.sweep();
        assert!(atoms.find_symbol("cycle").is_some());
        let _ = first;
    }

    #[test]
    fn decrement_to_zero_marks_ephemeral_again() {
        let mut atoms = AtomInterner::new();
        let r = atoms.add_symbol("held");
        atoms.increment(r);
        atoms.sweep();
        assert!(atoms.find_symbol("held").is_some());
        atoms.decrement(r).unwrap();
        atoms.sweep();
        assert!(atoms.find_symbol("held").is_none());
    }

    #[test]
    fn decrement_below_zero_is_an_error() {
        let mut atoms = AtomInterner::new();
        let r = atoms.add_symbol("unheld");
        assert!(atoms.decrement(r).is_err());
    }

    #[test]
    fn permanent_symbols_survive_sweep_even_at_zero_count() {
        let mut atoms = AtomInterner::new();
        atoms.add_permanent_symbol("MAIN");
        atoms.sweep();
        assert!(atoms.find_symbol("MAIN").is_some());
    }

    #[test]
    fn ephemerate_schedules_a_previously_safe_entry_for_sweep() {
        let mut atoms = AtomInterner::new();
        let r = atoms.add_symbol("stacked");
        atoms.increment(r);
        atoms.sweep();
        assert!(atoms.find_symbol("stacked").is_some());
        atoms.decrement(r).unwrap();
        atoms.ephemerate(r);
        atoms.sweep();
        assert!(atoms.find_symbol("stacked").is_none());
    }

    #[test]
    fn value_roundtrips_every_category() {
        let mut atoms = AtomInterner::new();
        let sym = atoms.add_symbol("s");
        let st = atoms.add_string("t");
        let inst = atoms.add_instance_name("oven-1");
        let f = atoms.add_float(1.5);
        let i = atoms.add_integer(-7);
        let bm = atoms.add_bitmap(&[1, 2, 3]);
        let ext = atoms.add_external(3, 4096);

        assert_eq!(atoms.value(sym), AtomValue::Symbol("s"));
        assert_eq!(atoms.value(st), AtomValue::String("t"));
        assert_eq!(atoms.value(inst), AtomValue::InstanceName("oven-1"));
        assert_eq!(atoms.value(f), AtomValue::Float(1.5));
        assert_eq!(atoms.value(i), AtomValue::Integer(-7));
        assert_eq!(atoms.value(bm), AtomValue::Bitmap(&[1, 2, 3]));
        assert_eq!(
            atoms.value(ext),
            AtomValue::ExternalAddress {
                kind: 3,
                pointer: 4096
            }
        );
    }
}
