//! The primitive procedure library.
//!
//! All primitives live in one registry table, [`PRIMITIVES`], installed
//! into the global environment when the interpreter is constructed. Most
//! are native Rust functions; `apply` and `eval` are tagged intrinsics the
//! evaluator intercepts (see [`crate::value::PrimitiveKind`]).

use std::rc::Rc;

use crate::env::Env;
use crate::intern::Interner;
use crate::interp::Interpreter;
use crate::value::{cons, list, string, Primitive, PrimitiveKind, Value};
use crate::Error;

struct PrimitiveDef {
    name: &'static str,
    kind: PrimitiveKind,
}

/// The full primitive registry. Adding a primitive means adding a row.
const PRIMITIVES: &[PrimitiveDef] = &[
    // Type predicates
    PrimitiveDef { name: "null?", kind: PrimitiveKind::Native(is_null) },
    PrimitiveDef { name: "boolean?", kind: PrimitiveKind::Native(is_boolean) },
    PrimitiveDef { name: "symbol?", kind: PrimitiveKind::Native(is_symbol) },
    PrimitiveDef { name: "integer?", kind: PrimitiveKind::Native(is_integer) },
    PrimitiveDef { name: "char?", kind: PrimitiveKind::Native(is_char) },
    PrimitiveDef { name: "string?", kind: PrimitiveKind::Native(is_string) },
    PrimitiveDef { name: "pair?", kind: PrimitiveKind::Native(is_pair) },
    PrimitiveDef { name: "procedure?", kind: PrimitiveKind::Native(is_procedure) },
    // Conversions
    PrimitiveDef { name: "char->integer", kind: PrimitiveKind::Native(char_to_integer) },
    PrimitiveDef { name: "integer->char", kind: PrimitiveKind::Native(integer_to_char) },
    PrimitiveDef { name: "number->string", kind: PrimitiveKind::Native(number_to_string) },
    PrimitiveDef { name: "string->number", kind: PrimitiveKind::Native(string_to_number) },
    PrimitiveDef { name: "symbol->string", kind: PrimitiveKind::Native(symbol_to_string) },
    PrimitiveDef { name: "string->symbol", kind: PrimitiveKind::Native(string_to_symbol) },
    // Integer arithmetic and comparison
    PrimitiveDef { name: "+", kind: PrimitiveKind::Native(add) },
    PrimitiveDef { name: "-", kind: PrimitiveKind::Native(subtract) },
    PrimitiveDef { name: "*", kind: PrimitiveKind::Native(multiply) },
    PrimitiveDef { name: "quotient", kind: PrimitiveKind::Native(quotient) },
    PrimitiveDef { name: "remainder", kind: PrimitiveKind::Native(remainder) },
    PrimitiveDef { name: "=", kind: PrimitiveKind::Native(num_equal) },
    PrimitiveDef { name: "<", kind: PrimitiveKind::Native(num_less) },
    PrimitiveDef { name: ">", kind: PrimitiveKind::Native(num_greater) },
    // Pairs and lists
    PrimitiveDef { name: "cons", kind: PrimitiveKind::Native(prim_cons) },
    PrimitiveDef { name: "car", kind: PrimitiveKind::Native(prim_car) },
    PrimitiveDef { name: "cdr", kind: PrimitiveKind::Native(prim_cdr) },
    PrimitiveDef { name: "list", kind: PrimitiveKind::Native(prim_list) },
    PrimitiveDef { name: "set-car!", kind: PrimitiveKind::Native(set_car) },
    PrimitiveDef { name: "set-cdr!", kind: PrimitiveKind::Native(set_cdr) },
    // Identity
    PrimitiveDef { name: "eq?", kind: PrimitiveKind::Native(identity_eq) },
    // Evaluator intrinsics
    PrimitiveDef { name: "apply", kind: PrimitiveKind::Apply },
    PrimitiveDef { name: "eval", kind: PrimitiveKind::Eval },
    PrimitiveDef { name: "interaction-environment", kind: PrimitiveKind::Native(interaction_environment) },
];

/// Install every registry entry into `global`.
pub(crate) fn install(interner: &mut Interner, global: &Env) {
    for def in PRIMITIVES {
        let name = interner.intern(def.name);
        global.define(
            name,
            Value::Primitive(Rc::new(Primitive {
                name: def.name,
                kind: def.kind,
            })),
        );
    }
}

fn expect_arity(name: &str, expected: usize, args: &[Value]) -> Result<(), Error> {
    if args.len() != expected {
        return Err(Error::arity_error_with_expr(
            expected,
            args.len(),
            name.to_owned(),
        ));
    }
    Ok(())
}

fn expect_integer(name: &str, value: &Value) -> Result<i64, Error> {
    match value {
        Value::Integer(n) => Ok(*n),
        other => Err(Error::TypeError(format!(
            "{name}: expected an integer, found {}",
            other.type_name()
        ))),
    }
}

fn overflow(operation: &str) -> Error {
    Error::EvalError(format!("integer overflow in {operation}"))
}

// --- type predicates ---

fn is_null(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("null?", 1, args)?;
    Ok(Value::Boolean(matches!(args[0], Value::Nil)))
}

fn is_boolean(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("boolean?", 1, args)?;
    Ok(Value::Boolean(matches!(args[0], Value::Boolean(_))))
}

fn is_symbol(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("symbol?", 1, args)?;
    Ok(Value::Boolean(matches!(args[0], Value::Symbol(_))))
}

fn is_integer(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("integer?", 1, args)?;
    Ok(Value::Boolean(matches!(args[0], Value::Integer(_))))
}

fn is_char(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("char?", 1, args)?;
    Ok(Value::Boolean(matches!(args[0], Value::Character(_))))
}

fn is_string(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("string?", 1, args)?;
    Ok(Value::Boolean(matches!(args[0], Value::String(_))))
}

fn is_pair(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("pair?", 1, args)?;
    Ok(Value::Boolean(matches!(args[0], Value::Pair(_))))
}

fn is_procedure(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("procedure?", 1, args)?;
    Ok(Value::Boolean(matches!(
        args[0],
        Value::Primitive(_) | Value::Closure(_)
    )))
}

// --- conversions ---

fn char_to_integer(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("char->integer", 1, args)?;
    match &args[0] {
        Value::Character(c) => Ok(Value::Integer(*c as i64)),
        other => Err(Error::TypeError(format!(
            "char->integer: expected a character, found {}",
            other.type_name()
        ))),
    }
}

fn integer_to_char(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("integer->char", 1, args)?;
    let n = expect_integer("integer->char", &args[0])?;
    u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Character)
        .ok_or_else(|| Error::TypeError(format!("integer->char: {n} is not a character code")))
}

fn number_to_string(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("number->string", 1, args)?;
    let n = expect_integer("number->string", &args[0])?;
    Ok(string(n.to_string()))
}

fn string_to_number(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("string->number", 1, args)?;
    match &args[0] {
        Value::String(s) => {
            let contents = s.borrow();
            contents
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| {
                    Error::TypeError(format!(
                        "string->number: \"{contents}\" does not denote an integer"
                    ))
                })
        }
        other => Err(Error::TypeError(format!(
            "string->number: expected a string, found {}",
            other.type_name()
        ))),
    }
}

fn symbol_to_string(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("symbol->string", 1, args)?;
    match &args[0] {
        Value::Symbol(s) => Ok(string(s.name())),
        other => Err(Error::TypeError(format!(
            "symbol->string: expected a symbol, found {}",
            other.type_name()
        ))),
    }
}

fn string_to_symbol(interp: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("string->symbol", 1, args)?;
    match &args[0] {
        Value::String(s) => Ok(Value::Symbol(interp.intern(&s.borrow()))),
        other => Err(Error::TypeError(format!(
            "string->symbol: expected a string, found {}",
            other.type_name()
        ))),
    }
}

// --- arithmetic ---

fn add(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    let mut sum: i64 = 0;
    for arg in args {
        let n = expect_integer("+", arg)?;
        sum = sum.checked_add(n).ok_or_else(|| overflow("+"))?;
    }
    Ok(Value::Integer(sum))
}

fn subtract(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    let (first, rest) = match args.split_first() {
        Some(split) => split,
        None => return Err(Error::arity_error_with_expr(1, 0, "-".to_owned())),
    };
    let first = expect_integer("-", first)?;
    if rest.is_empty() {
        return first
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| overflow("-"));
    }
    let mut difference = first;
    for arg in rest {
        let n = expect_integer("-", arg)?;
        difference = difference.checked_sub(n).ok_or_else(|| overflow("-"))?;
    }
    Ok(Value::Integer(difference))
}

fn multiply(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    let mut product: i64 = 1;
    for arg in args {
        let n = expect_integer("*", arg)?;
        product = product.checked_mul(n).ok_or_else(|| overflow("*"))?;
    }
    Ok(Value::Integer(product))
}

fn quotient(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("quotient", 2, args)?;
    let a = expect_integer("quotient", &args[0])?;
    let b = expect_integer("quotient", &args[1])?;
    if b == 0 {
        return Err(Error::EvalError("quotient: division by zero".to_owned()));
    }
    a.checked_div(b)
        .map(Value::Integer)
        .ok_or_else(|| overflow("quotient"))
}

fn remainder(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("remainder", 2, args)?;
    let a = expect_integer("remainder", &args[0])?;
    let b = expect_integer("remainder", &args[1])?;
    if b == 0 {
        return Err(Error::EvalError("remainder: division by zero".to_owned()));
    }
    a.checked_rem(b)
        .map(Value::Integer)
        .ok_or_else(|| overflow("remainder"))
}

/// Chained comparison shared by `=`, `<` and `>`.
fn compare(
    name: &str,
    args: &[Value],
    keep: fn(i64, i64) -> bool,
) -> Result<Value, Error> {
    if args.len() < 2 {
        return Err(Error::arity_error_with_expr(2, args.len(), name.to_owned()));
    }
    let mut previous = expect_integer(name, &args[0])?;
    for arg in &args[1..] {
        let current = expect_integer(name, arg)?;
        if !keep(previous, current) {
            return Ok(Value::Boolean(false));
        }
        previous = current;
    }
    Ok(Value::Boolean(true))
}

fn num_equal(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    compare("=", args, |a, b| a == b)
}

fn num_less(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    compare("<", args, |a, b| a < b)
}

fn num_greater(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    compare(">", args, |a, b| a > b)
}

// --- pairs and lists ---

fn prim_cons(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("cons", 2, args)?;
    Ok(cons(args[0].clone(), args[1].clone()))
}

fn prim_car(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("car", 1, args)?;
    match &args[0] {
        Value::Pair(pair) => Ok(pair.car.borrow().clone()),
        other => Err(Error::TypeError(format!(
            "car: expected a pair, found {}",
            other.type_name()
        ))),
    }
}

fn prim_cdr(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("cdr", 1, args)?;
    match &args[0] {
        Value::Pair(pair) => Ok(pair.cdr.borrow().clone()),
        other => Err(Error::TypeError(format!(
            "cdr: expected a pair, found {}",
            other.type_name()
        ))),
    }
}

fn prim_list(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(list(args.to_vec()))
}

fn set_car(interp: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("set-car!", 2, args)?;
    match &args[0] {
        Value::Pair(pair) => {
            *pair.car.borrow_mut() = args[1].clone();
            Ok(Value::Symbol(interp.keywords.ok.clone()))
        }
        other => Err(Error::TypeError(format!(
            "set-car!: expected a pair, found {}",
            other.type_name()
        ))),
    }
}

fn set_cdr(interp: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("set-cdr!", 2, args)?;
    match &args[0] {
        Value::Pair(pair) => {
            *pair.cdr.borrow_mut() = args[1].clone();
            Ok(Value::Symbol(interp.keywords.ok.clone()))
        }
        other => Err(Error::TypeError(format!(
            "set-cdr!: expected a pair, found {}",
            other.type_name()
        ))),
    }
}

// --- identity ---

fn identity_eq(_: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("eq?", 2, args)?;
    Ok(Value::Boolean(args[0].identity_eq(&args[1])))
}

// --- environments ---

fn interaction_environment(interp: &Interpreter, args: &[Value]) -> Result<Value, Error> {
    expect_arity("interaction-environment", 0, args)?;
    Ok(Value::Environment(interp.global_env()))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::reader;

    #[derive(Debug)]
    enum BuiltinTestResult {
        Prints(&'static str),
        WrongType,
        Arity,
        Evaluation,
    }
    use BuiltinTestResult::*;

    fn run_builtin_tests(test_cases: Vec<(&str, BuiltinTestResult)>) {
        let interp = Interpreter::new();
        for (i, (source, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Builtin test #{} ({source:?})", i + 1);
            let mut rest = *source;
            let mut result = Ok(Value::Nil);
            loop {
                match reader::read(&interp, rest).unwrap() {
                    Some((expr, tail)) => {
                        rest = tail;
                        result = interp.eval(&expr);
                        if result.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            match (result, expected) {
                (Ok(value), Prints(expected_display)) => {
                    assert_eq!(format!("{value}"), *expected_display, "{test_id}");
                }
                (Err(Error::TypeError(_)), WrongType) => {}
                (Err(Error::ArityError { .. }), Arity) => {}
                (Err(Error::EvalError(_)), Evaluation) => {}
                (result, expected) => {
                    panic!("{test_id}: expected {expected:?}, got {result:?}");
                }
            }
        }
    }

    #[test]
    fn test_type_predicates() {
        run_builtin_tests(vec![
            ("(null? '())", Prints("#t")),
            ("(null? '(1))", Prints("#f")),
            ("(boolean? #f)", Prints("#t")),
            ("(boolean? 0)", Prints("#f")),
            ("(symbol? 'a)", Prints("#t")),
            ("(symbol? \"a\")", Prints("#f")),
            ("(integer? 3)", Prints("#t")),
            ("(integer? #\\3)", Prints("#f")),
            ("(char? #\\a)", Prints("#t")),
            ("(string? \"abc\")", Prints("#t")),
            ("(pair? '(1 2))", Prints("#t")),
            ("(pair? '())", Prints("#f")),
            ("(procedure? car)", Prints("#t")),
            ("(procedure? (lambda (x) x))", Prints("#t")),
            ("(procedure? 'car)", Prints("#f")),
            ("(null?)", Arity),
            ("(null? 1 2)", Arity),
        ]);
    }

    #[test]
    fn test_arithmetic() {
        run_builtin_tests(vec![
            ("(+)", Prints("0")),
            ("(+ 1 2 3)", Prints("6")),
            ("(- 5)", Prints("-5")),
            ("(- 10 3 2)", Prints("5")),
            ("(*)", Prints("1")),
            ("(* 2 3 4)", Prints("24")),
            ("(quotient 17 5)", Prints("3")),
            ("(quotient -17 5)", Prints("-3")),
            ("(remainder 17 5)", Prints("2")),
            ("(remainder -17 5)", Prints("-2")),
            ("(quotient 1 0)", Evaluation),
            ("(remainder 1 0)", Evaluation),
            ("(+ 9223372036854775807 1)", Evaluation),
            ("(- -9223372036854775808)", Evaluation),
            ("(* 9223372036854775807 2)", Evaluation),
            ("(+ 1 'a)", WrongType),
            ("(-)", Arity),
        ]);
    }

    #[test]
    fn test_comparisons() {
        run_builtin_tests(vec![
            ("(= 3 3)", Prints("#t")),
            ("(= 3 3 3)", Prints("#t")),
            ("(= 3 3 4)", Prints("#f")),
            ("(< 1 2 3)", Prints("#t")),
            ("(< 1 3 2)", Prints("#f")),
            ("(> 3 2 1)", Prints("#t")),
            ("(> 3 1 2)", Prints("#f")),
            ("(= 1)", Arity),
            ("(< 1 'a)", WrongType),
        ]);
    }

    #[test]
    fn test_conversions() {
        run_builtin_tests(vec![
            ("(char->integer #\\a)", Prints("97")),
            ("(integer->char 97)", Prints("a")),
            ("(integer->char -1)", WrongType),
            ("(integer->char 55296)", WrongType), // surrogate
            ("(number->string 42)", Prints("\"42\"")),
            ("(string->number \"42\")", Prints("42")),
            ("(string->number \"-7\")", Prints("-7")),
            ("(string->number \"forty\")", WrongType),
            ("(symbol->string 'abc)", Prints("\"abc\"")),
            ("(string->symbol \"abc\")", Prints("abc")),
            // string->symbol produces the interned symbol
            ("(eq? (string->symbol \"abc\") 'abc)", Prints("#t")),
            ("(char->integer 5)", WrongType),
        ]);
    }

    #[test]
    fn test_pairs_and_mutation() {
        run_builtin_tests(vec![
            ("(cons 1 2)", Prints("(1 . 2)")),
            ("(car (cons 1 2))", Prints("1")),
            ("(cdr (cons 1 2))", Prints("2")),
            ("(list 1 2 3)", Prints("(1 2 3)")),
            ("(list)", Prints("()")),
            ("(car '())", WrongType),
            ("(cdr 5)", WrongType),
            ("(set-car! (cons 1 2) 9)", Prints("ok")),
            // Mutation is visible through every handle to the cell
            (
                "(define p (cons 1 2)) (define q p) (set-car! p 99) (car q)",
                Prints("99"),
            ),
            (
                "(define x (list 1 2 3)) (set-cdr! x '()) x",
                Prints("(1)"),
            ),
            ("(set-car! 5 1)", WrongType),
        ]);
    }

    #[test]
    fn test_eq() {
        run_builtin_tests(vec![
            ("(eq? 'a 'a)", Prints("#t")),
            ("(eq? 'a 'b)", Prints("#f")),
            ("(eq? 5 5)", Prints("#t")),
            ("(eq? '() '())", Prints("#t")),
            // Strings compare by content
            ("(eq? \"abc\" \"abc\")", Prints("#t")),
            // Distinct pair objects are not eq? even when equal-looking
            ("(eq? (cons 1 2) (cons 1 2))", Prints("#f")),
            ("(define p (cons 1 2)) (eq? p p)", Prints("#t")),
            ("(eq? car car)", Prints("#t")),
            ("(eq? car cdr)", Prints("#f")),
            ("(eq? 1 2 3)", Arity),
        ]);
    }

    #[test]
    fn test_interaction_environment() {
        run_builtin_tests(vec![
            ("(interaction-environment)", Prints("#<environment>")),
            (
                "(eq? (interaction-environment) (interaction-environment))",
                Prints("#t"),
            ),
            ("(interaction-environment 1)", Arity),
        ]);
    }
}
