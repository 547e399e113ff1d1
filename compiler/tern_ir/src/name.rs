//! Interned identifier names.
//!
//! Identifiers are compared constantly during binding and evaluation, so they
//! are interned once and handled as 4-byte `Name` values: O(1) equality, no
//! string hashing on the hot path. Ids are dense (0, 1, 2, ...) in intern
//! order, which the wire format relies on to ship the string table.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;

/// An interned identifier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Create a name from its raw id.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// The raw interner id.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternOverflow {
    pub count: usize,
}

impl fmt::Display for InternOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interner exceeded capacity: {} strings, max is {}",
            self.count,
            u32::MAX
        )
    }
}

impl std::error::Error for InternOverflow {}

struct Inner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// String interner with dense ids.
///
/// # Thread Safety
/// A `parking_lot::RwLock` guards the tables so the interner can be shared
/// across worker threads checking independent files. Interned strings are
/// leaked; the interner lives for the life of the process.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create an empty interner.
    pub fn new() -> Self {
        StringInterner {
            inner: RwLock::new(Inner {
                map: FxHashMap::default(),
                strings: Vec::with_capacity(256),
            }),
        }
    }

    /// Try to intern a string, returning its `Name` or an error on overflow.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternOverflow> {
        // Fast path: already interned.
        {
            let guard = self.inner.read();
            if let Some(&id) = guard.map.get(s) {
                return Ok(Name(id));
            }
        }

        let mut guard = self.inner.write();
        // Double-check after acquiring the write lock.
        if let Some(&id) = guard.map.get(s) {
            return Ok(Name(id));
        }

        let id = u32::try_from(guard.strings.len()).map_err(|_| InternOverflow {
            count: guard.strings.len(),
        })?;
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        guard.map.insert(leaked, id);
        guard.strings.push(leaked);
        Ok(Name(id))
    }

    /// Intern a string.
    ///
    /// # Panics
    /// Panics after `u32::MAX` distinct strings; use `try_intern` to handle
    /// overflow gracefully.
    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Resolve a name back to its string.
    ///
    /// Returns the empty string for a name this interner never produced.
    pub fn resolve(&self, name: Name) -> &'static str {
        self.inner
            .read()
            .strings
            .get(name.0 as usize)
            .copied()
            .unwrap_or("")
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check if the interner is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All interned strings in id order (for the wire string table).
    pub fn strings_in_order(&self) -> Vec<&'static str> {
        self.inner.read().strings.clone()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_dedups() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        let c = interner.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn ids_are_dense() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern("a").raw(), 0);
        assert_eq!(interner.intern("b").raw(), 1);
        assert_eq!(interner.intern("a").raw(), 0);
        assert_eq!(interner.intern("c").raw(), 2);
    }

    #[test]
    fn resolve_roundtrip() {
        let interner = StringInterner::new();
        let name = interner.intern("isinstance");
        assert_eq!(interner.resolve(name), "isinstance");
    }

    #[test]
    fn resolve_unknown_is_empty() {
        let interner = StringInterner::new();
        assert_eq!(interner.resolve(Name::from_raw(999)), "");
    }

    #[test]
    fn strings_in_order() {
        let interner = StringInterner::new();
        interner.intern("x");
        interner.intern("y");
        assert_eq!(interner.strings_in_order(), vec!["x", "y"]);
    }

    #[test]
    fn concurrent_interning() {
        use std::sync::Arc;
        let interner = Arc::new(StringInterner::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let interner = Arc::clone(&interner);
                std::thread::spawn(move || interner.intern("shared"))
            })
            .collect();
        let names: Vec<Name> = handles.into_iter().map(|h| match h.join() {
            Ok(name) => name,
            Err(_) => panic!("intern thread panicked"),
        }).collect();
        assert!(names.windows(2).all(|w| w[0] == w[1]));
    }
}
