//! Schemelet - a small Scheme-family interpreter
//!
//! This crate implements a minimal Scheme dialect: a reader for textual
//! S-expressions, a tagged object graph, and an evaluator with lexical
//! scoping and proper tail calls.
//!
//! ```scheme
//! (define (adder x) (lambda (y) (+ x y)))
//! ((adder 3) 4)                ; => 7
//! (define (loop n) (if (= n 0) 0 (loop (- n 1))))
//! (loop 100000)                ; => 0, in constant stack space
//! ```
//!
//! ## Design
//!
//! - All interpreter state (symbol table, global environment) lives in an
//!   [`interp::Interpreter`] value; there are no process-wide statics.
//! - Symbols are interned: equal names are the same object, so identity
//!   comparison drives both special-form recognition and `eq?`.
//! - Pairs and strings are shared mutable structures (`set-car!` and
//!   `set-cdr!` affect every holder of a reference).
//! - Tail positions are evaluated by an explicit loop in the evaluator,
//!   never by host recursion, so tail-recursive programs run in bounded
//!   stack space.
//!
//! ## Modules
//!
//! - `value`: the tagged object model and the printer
//! - `intern`: symbol interning
//! - `reader`: S-expression parsing from text
//! - `env`: the lexical environment chain
//! - `eval`: the trampoline evaluator
//! - `builtins`: the primitive procedure library
//! - `interp`: the interpreter context and session driver

use std::fmt;

/// Maximum length of a string or symbol token accepted by the reader.
pub const MAX_STRING_LEN: usize = 1000;

/// Maximum nesting depth (lists, quotes) accepted by the reader.
/// This keeps reader recursion off unbounded host stack.
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum non-tail evaluation depth. Tail transitions do not consume
/// depth, so tail-recursive programs are not affected by this limit.
/// Small enough that runaway non-tail recursion is reported as an error
/// before the host stack is exhausted, even in debug builds.
pub const MAX_EVAL_DEPTH: usize = 64;

/// Categorizes the different kinds of reader failures.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad character at expression start,
    /// unknown `#`-prefixed literal)
    InvalidSyntax,
    /// Input ended inside a token or literal (unterminated string or
    /// character literal, EOF mid-expression)
    Incomplete,
    /// An atom was not followed by a delimiter
    MissingDelimiter,
    /// `.` in list position not followed by a delimiter
    BadDottedTail,
    /// A list was not closed before end of input, or a stray `)`
    UnmatchedParen,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
    /// Implementation-imposed limit exceeded (token length, integer
    /// literal overflow)
    ImplementationLimit,
}

/// A structured error describing a reader failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred
    pub context: Option<String>,
    /// The problematic character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a simple ParseError with a kind and message but no context
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError with context extracted from the input at a
    /// given offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 60;

        // Show some context before the failure point as well
        let context_start = error_offset.saturating_sub(20);

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < input.len() {
            display_context.push_str("[...]");
        }

        let display_context = display_context.replace('\n', "\\n").replace('\r', "");
        let found = input.chars().nth(error_offset).map(String::from);

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed external representation (see [`ParseErrorKind`])
    ParseError(ParseError),
    /// Structural-access misuse: `car` of a non-pair, arithmetic on a
    /// non-integer, and so on
    TypeError(String),
    /// `lookup` or `set!` on a name with no binding in the frame chain
    UnboundVariable(String),
    /// Mismatched parameter/argument counts on application
    ArityError {
        expected: usize,
        got: usize,
        expression: Option<String>,
    },
    /// Malformed special form shape (e.g. `if` with no predicate)
    FormError(String),
    /// Attempt to apply a value that is not a procedure
    ApplyNonProcedure(String),
    /// Any other evaluation failure (overflow, depth limit, unevaluable
    /// value)
    EvalError(String),
    /// Session driver output failure
    IoError(String),
}

impl Error {
    /// Create an ArityError without expression context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityError with expression context
    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: Some(expression),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::UnboundVariable(var) => write!(f, "Unbound variable: {var}"),
            Error::ArityError {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "ArityError: expression {expr}: expected {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "ArityError: procedure expected {expected} arguments but got {got}"
                ),
            },
            Error::FormError(msg) => write!(f, "Malformed form: {msg}"),
            Error::ApplyNonProcedure(what) => {
                write!(f, "Cannot apply non-procedure: {what}")
            }
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
            Error::IoError(msg) => write!(f, "IoError: {msg}"),
        }
    }
}

pub mod builtins;
pub mod env;
pub mod eval;
pub mod intern;
pub mod interp;
pub mod reader;
pub mod value;

pub use interp::{Interpreter, SessionOptions};
pub use value::Value;
