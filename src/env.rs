//! The lexical environment chain.
//!
//! An [`Env`] is a shared handle to a frame; each frame holds a mutable
//! binding table and a link to its parent. Closures capture an `Env` by
//! handle, so a frame stays alive as long as any closure (or child frame)
//! refers to it, and `set!` through one handle is visible through all
//! of them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::intern::Symbol;
use crate::value::Value;
use crate::Error;

struct Frame {
    bindings: RefCell<HashMap<Symbol, Value>>,
    parent: Option<Env>,
}

/// A shared handle to an environment frame. Cloning is a reference-count
/// bump.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

impl Env {
    /// Create an empty root frame.
    pub fn new_global() -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// Create a child frame binding `params` to `args`, used for
    /// procedure application. Parameter and argument counts must match
    /// exactly.
    pub fn new_frame(params: &[Symbol], args: Vec<Value>, parent: &Env) -> Result<Env, Error> {
        if params.len() != args.len() {
            return Err(Error::arity_error(params.len(), args.len()));
        }
        let bindings = params.iter().cloned().zip(args).collect();
        Ok(Env(Rc::new(Frame {
            bindings: RefCell::new(bindings),
            parent: Some(parent.clone()),
        })))
    }

    /// Find the value bound to `name`, searching innermost-out.
    pub fn lookup(&self, name: &Symbol) -> Result<Value, Error> {
        let mut frame = Rc::clone(&self.0);
        loop {
            if let Some(value) = frame.bindings.borrow().get(name) {
                return Ok(value.clone());
            }
            match &frame.parent {
                Some(parent) => {
                    let next = Rc::clone(&parent.0);
                    frame = next;
                }
                None => return Err(Error::UnboundVariable(name.name().to_owned())),
            }
        }
    }

    /// Mutate the innermost existing binding for `name`. Unlike `define`,
    /// this never creates a binding.
    pub fn set(&self, name: &Symbol, value: Value) -> Result<(), Error> {
        let mut frame = Rc::clone(&self.0);
        loop {
            {
                let mut bindings = frame.bindings.borrow_mut();
                if let Some(slot) = bindings.get_mut(name) {
                    *slot = value;
                    return Ok(());
                }
            }
            match &frame.parent {
                Some(parent) => {
                    let next = Rc::clone(&parent.0);
                    frame = next;
                }
                None => return Err(Error::UnboundVariable(name.name().to_owned())),
            }
        }
    }

    /// Bind `name` in this frame, shadowing any outer binding and
    /// overwriting any existing one here.
    pub fn define(&self, name: Symbol, value: Value) {
        self.0.bindings.borrow_mut().insert(name, value);
    }

    /// Snapshot of this frame chain's bindings, innermost binding wins.
    /// Used by the REPL's `:env` command.
    pub fn all_bindings(&self) -> Vec<(String, Value)> {
        let mut seen: HashMap<String, Value> = HashMap::new();
        let mut frame = Rc::clone(&self.0);
        loop {
            for (name, value) in frame.bindings.borrow().iter() {
                seen.entry(name.name().to_owned())
                    .or_insert_with(|| value.clone());
            }
            match &frame.parent {
                Some(parent) => {
                    let next = Rc::clone(&parent.0);
                    frame = next;
                }
                None => break,
            }
        }
        let mut bindings: Vec<_> = seen.into_iter().collect();
        bindings.sort_by(|(a, _), (b, _)| a.cmp(b));
        bindings
    }

    /// Identity comparison on the underlying frame.
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
