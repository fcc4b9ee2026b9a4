//! # Reference Tables
//!
//! Side tables for values that cannot live inside a packed record
//! (`obj` and `str` fields). The record stores a 32-bit id; `0` means
//! "no value".

/// Id-indexed table of out-of-line values.
///
/// Ids are 1-based slot indices. Released ids go on a free list and are
/// handed out again by later acquisitions, so a record must not hold an id
/// after releasing it.
///
/// # Thread Safety
///
/// Not thread-safe, like the store that owns it.
pub struct RefTable<T> {
    /// Slot storage, index = id - 1.
    slots: Vec<Option<T>>,
    /// Free list of slot indices.
    free_list: Vec<u32>,
    /// Number of occupied slots.
    live: usize,
}

impl<T> RefTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Number of ids currently held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Checks if no id is held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Stores a value and returns its id (never `0`).
    pub fn acquire(&mut self, value: T) -> u32 {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            self.slots[index as usize] = Some(value);
            return index + 1;
        }
        self.slots.push(Some(value));
        self.slots.len() as u32
    }

    /// Drops the value behind `id`, returning it.
    ///
    /// `0` and unknown ids are ignored.
    pub fn release(&mut self, id: u32) -> Option<T> {
        let index = id.checked_sub(1)?;
        let value = self.slots.get_mut(index as usize)?.take()?;
        self.free_list.push(index);
        self.live -= 1;
        Some(value)
    }

    /// Looks up the value behind `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&T> {
        let index = id.checked_sub(1)?;
        self.slots.get(index as usize)?.as_ref()
    }

    /// Drops every value. Slot memory is kept for reuse.
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            *slot = None;
            self.free_list.push(index as u32);
        }
        self.live = 0;
    }
}

impl<T> Default for RefTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release() {
        let mut table: RefTable<&str> = RefTable::new();

        let id = table.acquire("a");
        assert_eq!(id, 1);
        assert_eq!(table.get(id), Some(&"a"));
        assert_eq!(table.len(), 1);

        assert_eq!(table.release(id), Some("a"));
        assert!(table.is_empty());
        assert!(table.get(id).is_none());
    }

    #[test]
    fn test_zero_is_never_an_id() {
        let mut table: RefTable<u8> = RefTable::new();
        assert!(table.get(0).is_none());
        assert!(table.release(0).is_none());
        assert_ne!(table.acquire(7), 0);
    }

    #[test]
    fn test_reuse_after_release() {
        let mut table: RefTable<u32> = RefTable::new();
        let a = table.acquire(1);
        let _b = table.acquire(2);
        table.release(a);

        let c = table.acquire(3);
        assert_eq!(a, c);
        assert_eq!(table.get(c), Some(&3));
    }

    #[test]
    fn test_double_release_is_ignored() {
        let mut table: RefTable<u32> = RefTable::new();
        let a = table.acquire(1);
        assert!(table.release(a).is_some());
        assert!(table.release(a).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_clear_keeps_ids_low() {
        let mut table: RefTable<u32> = RefTable::new();
        table.acquire(1);
        table.acquire(2);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.acquire(9), 1);
    }
}
