//! The tagged object model and the printer.
//!
//! The central enum, [`Value`], covers every datum the language can
//! represent: integers, booleans, characters, mutable strings, interned
//! symbols, mutable pair cells, the empty list, primitive and compound
//! procedures, and first-class environments. Heap objects (strings, pairs,
//! procedures) are reference-counted and shared: cloning a `Value` clones a
//! handle, never the object, so mutation through one handle is visible
//! through all of them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::env::Env;
use crate::intern::Symbol;
use crate::interp::Interpreter;
use crate::Error;

/// A mutable cons cell. Both slots can be reassigned after construction
/// (`set-car!`, `set-cdr!`), so the pair graph may be cyclic.
pub struct Pair {
    pub car: RefCell<Value>,
    pub cdr: RefCell<Value>,
}

/// Unlink the cdr chain iteratively: the default recursive drop would
/// consume one host stack frame per element of a long list.
impl Drop for Pair {
    fn drop(&mut self) {
        let mut next = self.cdr.replace(Value::Nil);
        while let Value::Pair(pair) = next {
            match Rc::try_unwrap(pair) {
                // Sole owner: steal the tail before this cell drops
                Ok(pair) => next = pair.cdr.replace(Value::Nil),
                // Shared further down the chain, that owner keeps it alive
                Err(_) => break,
            }
        }
    }
}

/// A user-defined procedure: parameter list, body sequence, and the
/// environment captured at the evaluation of its `lambda`.
///
/// Invariant: `body` is non-empty (the evaluator rejects empty bodies
/// before constructing one).
pub struct Closure {
    pub params: Vec<Symbol>,
    pub body: Vec<Value>,
    pub env: Env,
}

/// The canonical signature for native primitive bodies. Arguments arrive
/// already evaluated, left to right.
pub type NativeFn = fn(&Interpreter, &[Value]) -> Result<Value, Error>;

/// How a primitive procedure is executed.
///
/// `apply` and `eval` cannot be native functions: both must re-enter the
/// evaluator's state machine (`apply` restarts procedure dispatch, `eval`
/// replaces the expression and environment in tail position), so they are
/// tagged and the evaluator intercepts them before native dispatch.
#[derive(Clone, Copy)]
pub enum PrimitiveKind {
    Native(NativeFn),
    Apply,
    Eval,
}

/// A primitive procedure descriptor.
pub struct Primitive {
    pub name: &'static str,
    pub kind: PrimitiveKind,
}

/// Core value type of the interpreter.
#[derive(Clone)]
pub enum Value {
    /// Integers (the only numeric type)
    Integer(i64),
    /// `#t` and `#f`
    Boolean(bool),
    /// Character literals (`#\a`, `#\space`, `#\newline`)
    Character(char),
    /// Mutable, shared string
    String(Rc<RefCell<String>>),
    /// Interned identifier
    Symbol(Symbol),
    /// Mutable, shared cons cell
    Pair(Rc<Pair>),
    /// The empty list
    Nil,
    /// Built-in procedure
    Primitive(Rc<Primitive>),
    /// User-defined procedure
    Closure(Rc<Closure>),
    /// First-class environment (produced by `interaction-environment`)
    Environment(Env),
}

/// Construct a fresh pair cell.
pub fn cons(car: Value, cdr: Value) -> Value {
    Value::Pair(Rc::new(Pair {
        car: RefCell::new(car),
        cdr: RefCell::new(cdr),
    }))
}

/// Construct a fresh string object.
pub fn string(contents: impl Into<String>) -> Value {
    Value::String(Rc::new(RefCell::new(contents.into())))
}

/// Build a proper list from a vector of elements.
pub fn list(elements: Vec<Value>) -> Value {
    let mut result = Value::Nil;
    for element in elements.into_iter().rev() {
        result = cons(element, result);
    }
    result
}

impl Value {
    /// The conditional truth rule: only `#f` is false.
    pub fn is_false(&self) -> bool {
        matches!(self, Value::Boolean(false))
    }

    /// Short tag name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Character(_) => "character",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Nil => "empty list",
            Value::Primitive(_) => "procedure",
            Value::Closure(_) => "procedure",
            Value::Environment(_) => "environment",
        }
    }

    /// Collect the elements of a proper list. Fails with `FormError` if
    /// the chain does not end in nil.
    pub fn proper_list_elements(&self) -> Result<Vec<Value>, Error> {
        let mut elements = Vec::new();
        let mut current = self.clone();
        loop {
            match current {
                Value::Nil => return Ok(elements),
                Value::Pair(pair) => {
                    elements.push(pair.car.borrow().clone());
                    let next = pair.cdr.borrow().clone();
                    current = next;
                }
                other => {
                    return Err(Error::FormError(format!(
                        "expected a proper list, found {} in tail position",
                        other.type_name()
                    )));
                }
            }
        }
    }

    /// `eq?` semantics: identity for heap objects, value comparison for
    /// immediates. Strings deliberately compare by content.
    pub fn identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::String(a), Value::String(b)) => *a.borrow() == *b.borrow(),
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Nil, Value::Nil) => true,
            (Value::Primitive(a), Value::Primitive(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Environment(a), Value::Environment(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// The printer. Strings print unescaped (display semantics), procedures
/// print opaquely. Cyclic structures are not detected.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Character(c) => write!(f, "{c}"),
            Value::String(s) => write!(f, "\"{}\"", s.borrow()),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Nil => write!(f, "()"),
            Value::Pair(pair) => {
                write!(f, "(")?;
                write_pair(f, pair)?;
                write!(f, ")")
            }
            Value::Primitive(_) | Value::Closure(_) => write!(f, "#<procedure>"),
            Value::Environment(_) => write!(f, "#<environment>"),
        }
    }
}

/// Write the interior of a list, using dot notation for improper tails.
/// Walks the cdr chain iteratively so long lists do not recurse.
fn write_pair(f: &mut fmt::Formatter<'_>, pair: &Rc<Pair>) -> fmt::Result {
    let mut current = Rc::clone(pair);
    loop {
        write!(f, "{}", current.car.borrow())?;
        let cdr = current.cdr.borrow().clone();
        match cdr {
            Value::Nil => return Ok(()),
            Value::Pair(next) => {
                write!(f, " ")?;
                current = next;
            }
            other => return write!(f, " . {other}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Character(c) => write!(f, "Character({c:?})"),
            Value::String(s) => write!(f, "String({:?})", s.borrow()),
            Value::Symbol(s) => write!(f, "{s:?}"),
            Value::Pair(_) | Value::Nil => write!(f, "Sexpr({self})"),
            Value::Primitive(p) => write!(f, "Primitive({})", p.name),
            Value::Closure(c) => {
                write!(f, "Closure(params=[")?;
                for (i, p) in c.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "])")
            }
            Value::Environment(_) => write!(f, "Environment"),
        }
    }
}

/// Structural equality, used by tests and nothing in the language itself
/// (`eq?` uses [`Value::identity_eq`]). Pairs and strings compare by
/// content; procedures compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::String(a), Value::String(b)) => *a.borrow() == *b.borrow(),
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Pair(a), Value::Pair(b)) => {
                *a.car.borrow() == *b.car.borrow() && *a.cdr.borrow() == *b.cdr.borrow()
            }
            (Value::Primitive(a), Value::Primitive(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Environment(a), Value::Environment(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::Interpreter;

    #[test]
    fn test_display() {
        let interp = Interpreter::new();
        let foo = Value::Symbol(interp.intern("foo"));
        let bar = Value::Symbol(interp.intern("bar"));

        // (value, expected display)
        let test_cases = vec![
            (Value::Integer(42), "42"),
            (Value::Integer(-17), "-17"),
            (Value::Boolean(true), "#t"),
            (Value::Boolean(false), "#f"),
            (Value::Character('a'), "a"),
            (Value::Character(' '), " "),
            (string("hello"), "\"hello\""),
            (Value::Nil, "()"),
            (foo.clone(), "foo"),
            (
                list(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
                "(1 2 3)",
            ),
            (cons(Value::Integer(1), Value::Integer(2)), "(1 . 2)"),
            (
                cons(foo.clone(), cons(bar.clone(), Value::Integer(3))),
                "(foo bar . 3)",
            ),
            (
                list(vec![foo, list(vec![bar, Value::Nil])]),
                "(foo (bar ()))",
            ),
        ];

        for (i, (value, expected)) in test_cases.iter().enumerate() {
            assert_eq!(
                format!("{value}"),
                *expected,
                "Display test #{} failed",
                i + 1
            );
        }
    }

    #[test]
    fn test_identity_eq() {
        let interp = Interpreter::new();
        let a = interp.intern("a");
        let shared_pair = cons(Value::Integer(1), Value::Integer(2));

        // (left, right, expected eq?)
        let test_cases = vec![
            (Value::Integer(5), Value::Integer(5), true),
            (Value::Integer(5), Value::Integer(6), false),
            (Value::Boolean(true), Value::Boolean(true), true),
            (Value::Character('x'), Value::Character('x'), true),
            // Strings compare by content even when not the same object
            (string("abc"), string("abc"), true),
            (string("abc"), string("abd"), false),
            (
                Value::Symbol(a.clone()),
                Value::Symbol(a.clone()),
                true,
            ),
            (Value::Nil, Value::Nil, true),
            // Same pair object
            (shared_pair.clone(), shared_pair.clone(), true),
            // Structurally equal but distinct pair objects
            (
                cons(Value::Integer(1), Value::Integer(2)),
                cons(Value::Integer(1), Value::Integer(2)),
                false,
            ),
            (Value::Integer(0), Value::Boolean(false), false),
            (Value::Nil, Value::Boolean(false), false),
        ];

        for (i, (left, right, expected)) in test_cases.iter().enumerate() {
            assert_eq!(
                left.identity_eq(right),
                *expected,
                "identity_eq test #{}: {left:?} vs {right:?}",
                i + 1
            );
        }
    }

    #[test]
    fn test_is_false() {
        assert!(Value::Boolean(false).is_false());
        assert!(!Value::Boolean(true).is_false());
        assert!(!Value::Integer(0).is_false());
        assert!(!Value::Nil.is_false());
        assert!(!string("").is_false());
    }

    #[test]
    fn test_proper_list_elements() {
        let proper = list(vec![Value::Integer(1), Value::Integer(2)]);
        let elements = proper.proper_list_elements().unwrap();
        assert_eq!(elements, vec![Value::Integer(1), Value::Integer(2)]);

        assert_eq!(Value::Nil.proper_list_elements().unwrap(), vec![]);

        let improper = cons(Value::Integer(1), Value::Integer(2));
        assert!(improper.proper_list_elements().is_err());
    }

    #[test]
    fn test_long_list_drops_without_recursion() {
        let mut head = Value::Nil;
        for i in 0..200_000 {
            head = cons(Value::Integer(i), head);
        }
        drop(head);
    }

    #[test]
    fn test_dropping_a_head_preserves_shared_tail() {
        let tail = cons(Value::Integer(2), Value::Nil);
        let head = cons(Value::Integer(1), tail.clone());
        drop(head);
        assert_eq!(format!("{tail}"), "(2)");
    }

    #[test]
    fn test_shared_mutation_visibility() {
        // Two handles to one cell: mutation through one is visible
        // through the other
        let cell = cons(Value::Integer(1), Value::Nil);
        let alias = cell.clone();
        if let Value::Pair(pair) = &cell {
            *pair.car.borrow_mut() = Value::Integer(99);
        }
        assert_eq!(format!("{alias}"), "(99)");
    }
}
