//! The interpreter context and the session driver.
//!
//! An [`Interpreter`] owns everything a session needs: the symbol table,
//! the pre-interned keyword symbols the evaluator dispatches on, and the
//! global environment with the primitive library installed. There are no
//! process-wide statics; independent interpreters are fully isolated.

use std::cell::RefCell;
use std::io::Write;

use crate::env::Env;
use crate::eval;
use crate::intern::{Interner, Symbol};
use crate::reader;
use crate::value::Value;
use crate::{builtins, Error};

/// Symbols the evaluator recognizes by identity. Interned once at
/// construction so dispatch never consults the string table.
pub(crate) struct Keywords {
    pub quote: Symbol,
    pub define: Symbol,
    pub set_bang: Symbol,
    pub if_: Symbol,
    pub lambda: Symbol,
    pub begin: Symbol,
    pub and_: Symbol,
    pub or_: Symbol,
    /// The sentinel returned by `define`, `set!` and the mutation
    /// primitives
    pub ok: Symbol,
}

/// A complete interpreter session: symbol table, keywords, global
/// environment.
pub struct Interpreter {
    interner: RefCell<Interner>,
    pub(crate) keywords: Keywords,
    global: Env,
}

/// Policy knobs for [`Interpreter::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Suppress prompts and result printing
    pub silent: bool,
    /// Propagate the first evaluation error instead of logging it and
    /// continuing
    pub stop_on_error: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        let mut interner = Interner::new();
        let keywords = Keywords {
            quote: interner.intern("quote"),
            define: interner.intern("define"),
            set_bang: interner.intern("set!"),
            if_: interner.intern("if"),
            lambda: interner.intern("lambda"),
            begin: interner.intern("begin"),
            and_: interner.intern("and"),
            or_: interner.intern("or"),
            ok: interner.intern("ok"),
        };
        let global = Env::new_global();
        builtins::install(&mut interner, &global);
        Interpreter {
            interner: RefCell::new(interner),
            keywords,
            global,
        }
    }

    /// Intern `name` in this interpreter's symbol table.
    pub fn intern(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().intern(name)
    }

    /// A handle to the global environment.
    pub fn global_env(&self) -> Env {
        self.global.clone()
    }

    /// Evaluate one expression in the global environment.
    pub fn eval(&self, expr: &Value) -> Result<Value, Error> {
        eval::eval(self, expr, &self.global)
    }

    /// Run a source text as a session: read one form at a time, evaluate
    /// it in the global environment, and report to `out`.
    ///
    /// Unless `silent`, each form gets a numbered prompt and its result
    /// (or error) printed. Parse errors always abort the run, since the
    /// reader's position in the text is no longer trustworthy; evaluation
    /// errors abort only under `stop_on_error` or `silent`.
    ///
    /// Returns the value of the last form, or `None` for an empty source.
    pub fn run<W: Write>(
        &self,
        source: &str,
        out: &mut W,
        options: &SessionOptions,
    ) -> Result<Option<Value>, Error> {
        let mut rest = source;
        let mut last = None;
        let mut count: usize = 1;

        while let Some((expr, tail)) = reader::read(self, rest)? {
            rest = tail;
            if !options.silent {
                write!(out, "{count}> ").map_err(io_error)?;
            }
            match self.eval(&expr) {
                Ok(value) => {
                    if !options.silent {
                        writeln!(out, "{value}").map_err(io_error)?;
                    }
                    last = Some(value);
                }
                Err(e) => {
                    if options.stop_on_error || options.silent {
                        return Err(e);
                    }
                    writeln!(out, "error: {e}").map_err(io_error)?;
                }
            }
            count += 1;
        }
        Ok(last)
    }

    /// Run a source text silently, stopping at the first error. Returns
    /// the value of the last form.
    pub fn run_script(&self, source: &str) -> Result<Option<Value>, Error> {
        let mut sink = std::io::sink();
        self.run(
            source,
            &mut sink,
            &SessionOptions {
                silent: true,
                stop_on_error: true,
            },
        )
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn io_error(e: std::io::Error) -> Error {
    Error::IoError(e.to_string())
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    fn run_to_string(source: &str, options: &SessionOptions) -> (Result<Option<Value>, Error>, String) {
        let interp = Interpreter::new();
        let mut out = Vec::new();
        let result = interp.run(source, &mut out, options);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_session_prompts_and_results() {
        let (result, output) =
            run_to_string("(define x 2) (+ x 3)", &SessionOptions::default());
        assert_eq!(result.unwrap().unwrap(), Value::Integer(5));
        assert_eq!(output, "1> ok\n2> 5\n");
    }

    #[test]
    fn test_silent_session_produces_no_output() {
        let options = SessionOptions {
            silent: true,
            stop_on_error: false,
        };
        let (result, output) = run_to_string("(+ 1 2) (+ 3 4)", &options);
        assert_eq!(result.unwrap().unwrap(), Value::Integer(7));
        assert!(output.is_empty());
    }

    #[test]
    fn test_empty_source_yields_none() {
        let (result, output) = run_to_string("  ; nothing here\n", &SessionOptions::default());
        assert!(result.unwrap().is_none());
        assert!(output.is_empty());
    }

    #[test]
    fn test_eval_error_logged_and_session_continues() {
        let (result, output) = run_to_string(
            "(car 5) (+ 1 1)",
            &SessionOptions {
                silent: false,
                stop_on_error: false,
            },
        );
        assert_eq!(result.unwrap().unwrap(), Value::Integer(2));
        assert!(output.contains("error:"), "output was: {output}");
        assert!(output.contains("2> 2"), "output was: {output}");
    }

    #[test]
    fn test_stop_on_error_propagates() {
        let (result, _) = run_to_string(
            "(car 5) (+ 1 1)",
            &SessionOptions {
                silent: false,
                stop_on_error: true,
            },
        );
        assert!(matches!(result, Err(Error::TypeError(_))));
    }

    #[test]
    fn test_parse_error_always_aborts() {
        let (result, _) = run_to_string(
            "(+ 1 2) (unclosed",
            &SessionOptions {
                silent: false,
                stop_on_error: false,
            },
        );
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_run_script() {
        let interp = Interpreter::new();
        let result = interp
            .run_script("(define (double n) (* n 2)) (double 21)")
            .unwrap();
        assert_eq!(result.unwrap(), Value::Integer(42));

        // Definitions persist across runs on the same interpreter
        let again = interp.run_script("(double 5)").unwrap();
        assert_eq!(again.unwrap(), Value::Integer(10));

        assert!(interp.run_script("(car 5)").is_err());
    }

    #[test]
    fn test_interpreters_are_isolated() {
        let a = Interpreter::new();
        let b = Interpreter::new();
        a.run_script("(define shared 1)").unwrap();
        assert!(b.run_script("shared").is_err());
    }
}
