//! Symbol interning.
//!
//! Every symbol name maps to exactly one [`Symbol`] per interpreter, so
//! symbol equality is pointer equality. The evaluator relies on this for
//! special-form recognition and `eq?` relies on it for symbol identity.
//! The table is owned by the interpreter; nothing here is process-global.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// An interned symbol name.
///
/// Cloning a `Symbol` is a reference-count bump. Two symbols obtained from
/// the same [`Interner`] compare equal iff they were interned from the same
/// name.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        // Identity comparison; the interner guarantees one allocation per name
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Content hash is consistent with identity equality: pointer-equal
        // symbols have equal content
        self.0.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// The symbol table. Symbols are never removed; a session's symbol
/// population is small and bounded by its source text.
#[derive(Default)]
pub struct Interner {
    table: HashMap<Rc<str>, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Interner::default()
    }

    /// Return the unique `Symbol` for `name`, creating it on first use.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.table.get(name) {
            return sym.clone();
        }
        let key: Rc<str> = Rc::from(name);
        let sym = Symbol(Rc::clone(&key));
        self.table.insert(key, sym.clone());
        sym
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(sym: &Symbol) -> u64 {
        let mut hasher = DefaultHasher::new();
        sym.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_interning_identity() {
        let mut interner = Interner::new();

        // (name_a, name_b, should_be_equal)
        let test_cases = vec![
            ("foo", "foo", true),
            ("foo", "bar", false),
            ("", "", true),
            ("set!", "set!", true),
            ("list->vector?", "list->vector?", true),
            ("a", "A", false),
        ];

        for (i, (a, b, expected_equal)) in test_cases.iter().enumerate() {
            let sym_a = interner.intern(a);
            let sym_b = interner.intern(b);
            assert_eq!(
                sym_a == sym_b,
                *expected_equal,
                "Intern test #{}: {a:?} vs {b:?}",
                i + 1
            );
            if *expected_equal {
                assert_eq!(hash_of(&sym_a), hash_of(&sym_b), "Intern test #{}", i + 1);
            }
        }
    }

    #[test]
    fn test_clone_preserves_identity() {
        let mut interner = Interner::new();
        let original = interner.intern("lambda");
        let cloned = original.clone();
        assert_eq!(original, cloned);
        assert_eq!(cloned.name(), "lambda");
    }

    #[test]
    fn test_table_growth() {
        let mut interner = Interner::new();
        assert!(interner.is_empty());
        interner.intern("x");
        interner.intern("y");
        interner.intern("x"); // no new entry
        assert_eq!(interner.len(), 2);
    }
}
