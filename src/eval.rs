//! The trampoline evaluator.
//!
//! [`eval`] drives an explicit state machine whose state is the pair
//! `(expression, environment)`. Every tail position (the branches of `if`,
//! the last expression of a body or `begin`, the final operand of `and` and
//! `or`, a procedure call's body) re-assigns the state and continues the
//! loop instead of recursing, so tail-recursive programs run in constant
//! host stack space. Only non-tail sub-evaluations (operands, predicates,
//! definitions) recurse, and those carry a depth counter bounded by
//! [`MAX_EVAL_DEPTH`].

use crate::env::Env;
use crate::intern::Symbol;
use crate::interp::Interpreter;
use crate::value::{PrimitiveKind, Value};
use crate::{Error, MAX_EVAL_DEPTH};
use std::rc::Rc;

/// Evaluate `expr` in `env`.
pub fn eval(interp: &Interpreter, expr: &Value, env: &Env) -> Result<Value, Error> {
    eval_at_depth(interp, expr.clone(), env.clone(), 0)
}

fn eval_at_depth(
    interp: &Interpreter,
    mut expr: Value,
    mut env: Env,
    depth: usize,
) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "evaluation depth exceeds limit {MAX_EVAL_DEPTH} (runaway non-tail recursion?)"
        )));
    }

    'tail: loop {
        let pair = match expr {
            Value::Integer(_)
            | Value::Boolean(_)
            | Value::Character(_)
            | Value::String(_) => return Ok(expr),
            Value::Symbol(ref name) => return env.lookup(name),
            Value::Nil => {
                return Err(Error::EvalError(
                    "cannot evaluate the empty list".to_owned(),
                ));
            }
            // Procedures and environments only reach the evaluator through
            // the eval intrinsic; they denote themselves
            Value::Primitive(_) | Value::Closure(_) | Value::Environment(_) => return Ok(expr),
            Value::Pair(pair) => pair,
        };

        let head = pair.car.borrow().clone();
        let tail = pair.cdr.borrow().clone();

        // Special forms are recognized by symbol identity, so a shadowing
        // binding never reaches this dispatch by accident: these names are
        // checked before the head is evaluated.
        if let Value::Symbol(name) = &head {
            let kw = &interp.keywords;

            if *name == kw.quote {
                let operands = tail.proper_list_elements()?;
                match <[Value; 1]>::try_from(operands) {
                    Ok([datum]) => return Ok(datum),
                    Err(operands) => {
                        return Err(Error::FormError(format!(
                            "quote expects one datum, got {}",
                            operands.len()
                        )));
                    }
                }
            } else if *name == kw.set_bang {
                let operands = tail.proper_list_elements()?;
                match <[Value; 2]>::try_from(operands) {
                    Ok([Value::Symbol(target), init]) => {
                        let value = eval_at_depth(interp, init, env.clone(), depth + 1)?;
                        env.set(&target, value)?;
                        return Ok(Value::Symbol(kw.ok.clone()));
                    }
                    Ok([other, _]) => {
                        return Err(Error::FormError(format!(
                            "set! target must be a symbol, found {}",
                            other.type_name()
                        )));
                    }
                    Err(_) => {
                        return Err(Error::FormError(
                            "set! expects a symbol and a value".to_owned(),
                        ));
                    }
                }
            } else if *name == kw.define {
                eval_define(interp, &tail, &env, depth)?;
                return Ok(Value::Symbol(kw.ok.clone()));
            } else if *name == kw.begin {
                let operands = tail.proper_list_elements()?;
                match operands.split_last() {
                    Some((last, inits)) => {
                        for init in inits {
                            eval_at_depth(interp, init.clone(), env.clone(), depth + 1)?;
                        }
                        expr = last.clone();
                        continue 'tail;
                    }
                    None => {
                        return Err(Error::FormError(
                            "begin expects at least one expression".to_owned(),
                        ));
                    }
                }
            } else if *name == kw.if_ {
                let operands = tail.proper_list_elements()?;
                if operands.len() != 2 && operands.len() != 3 {
                    return Err(Error::FormError(format!(
                        "if expects a predicate, a consequent and an optional alternative, \
                         got {} forms",
                        operands.len()
                    )));
                }
                let mut operands = operands.into_iter();
                let predicate = match operands.next() {
                    Some(p) => p,
                    None => return Err(Error::FormError("if expects a predicate".to_owned())),
                };
                let result = eval_at_depth(interp, predicate, env.clone(), depth + 1)?;
                let consequent = operands.next();
                let alternative = operands.next();
                if !result.is_false() {
                    match consequent {
                        Some(c) => {
                            expr = c;
                            continue 'tail;
                        }
                        None => {
                            return Err(Error::FormError("if expects a consequent".to_owned()));
                        }
                    }
                }
                match alternative {
                    Some(a) => {
                        expr = a;
                        continue 'tail;
                    }
                    None => return Ok(Value::Boolean(false)),
                }
            } else if *name == kw.and_ {
                let operands = tail.proper_list_elements()?;
                match operands.split_last() {
                    None => return Ok(Value::Boolean(true)),
                    Some((last, inits)) => {
                        for init in inits {
                            let value =
                                eval_at_depth(interp, init.clone(), env.clone(), depth + 1)?;
                            if value.is_false() {
                                return Ok(value);
                            }
                        }
                        expr = last.clone();
                        continue 'tail;
                    }
                }
            } else if *name == kw.or_ {
                let operands = tail.proper_list_elements()?;
                match operands.split_last() {
                    None => return Ok(Value::Boolean(false)),
                    Some((last, inits)) => {
                        for init in inits {
                            let value =
                                eval_at_depth(interp, init.clone(), env.clone(), depth + 1)?;
                            if !value.is_false() {
                                return Ok(value);
                            }
                        }
                        expr = last.clone();
                        continue 'tail;
                    }
                }
            } else if *name == kw.lambda {
                return make_closure(&tail, &env);
            }
        }

        // Application: evaluate the operator and the operands eagerly,
        // left to right
        let proc = eval_at_depth(interp, head, env.clone(), depth + 1)?;
        let operands = tail.proper_list_elements().map_err(|_| {
            Error::FormError("procedure call operands must form a proper list".to_owned())
        })?;
        let mut args = Vec::with_capacity(operands.len());
        for operand in operands {
            args.push(eval_at_depth(interp, operand, env.clone(), depth + 1)?);
        }

        let mut proc = proc;
        loop {
            match proc {
                Value::Primitive(primitive) => match primitive.kind {
                    PrimitiveKind::Native(body) => return body(interp, &args),
                    PrimitiveKind::Apply => {
                        // (apply f a b (c d)) calls f with a b c d. The
                        // procedure may itself be apply, so keep unwrapping.
                        if args.len() < 2 {
                            return Err(Error::arity_error_with_expr(
                                2,
                                args.len(),
                                "apply".to_owned(),
                            ));
                        }
                        let spliced = match args.pop() {
                            Some(last) => last.proper_list_elements().map_err(|_| {
                                Error::TypeError(
                                    "apply: last argument must be a proper list".to_owned(),
                                )
                            })?,
                            None => Vec::new(),
                        };
                        proc = args.remove(0);
                        args.extend(spliced);
                    }
                    PrimitiveKind::Eval => match <[Value; 2]>::try_from(args) {
                        Ok([new_expr, Value::Environment(new_env)]) => {
                            expr = new_expr;
                            env = new_env;
                            continue 'tail;
                        }
                        Ok([_, other]) => {
                            return Err(Error::TypeError(format!(
                                "eval: second argument must be an environment, found {}",
                                other.type_name()
                            )));
                        }
                        Err(args) => {
                            return Err(Error::arity_error_with_expr(
                                2,
                                args.len(),
                                "eval".to_owned(),
                            ));
                        }
                    },
                },
                Value::Closure(closure) => {
                    let frame = Env::new_frame(&closure.params, args, &closure.env)?;
                    match closure.body.split_last() {
                        Some((last, inits)) => {
                            for init in inits {
                                eval_at_depth(interp, init.clone(), frame.clone(), depth + 1)?;
                            }
                            expr = last.clone();
                            env = frame;
                            continue 'tail;
                        }
                        None => {
                            return Err(Error::FormError(
                                "procedure has an empty body".to_owned(),
                            ));
                        }
                    }
                }
                other => return Err(Error::ApplyNonProcedure(format!("{other}"))),
            }
        }
    }
}

/// `(define name init)` or the procedure shorthand
/// `(define (name param ...) body ...)`.
fn eval_define(
    interp: &Interpreter,
    tail: &Value,
    env: &Env,
    depth: usize,
) -> Result<(), Error> {
    let operands = tail.proper_list_elements()?;
    let (target, rest) = match operands.split_first() {
        Some(split) => split,
        None => {
            return Err(Error::FormError(
                "define expects a name and a value".to_owned(),
            ));
        }
    };

    match target {
        Value::Symbol(name) => match rest {
            [init] => {
                let value = eval_at_depth(interp, init.clone(), env.clone(), depth + 1)?;
                env.define(name.clone(), value);
                Ok(())
            }
            _ => Err(Error::FormError(format!(
                "define expects exactly one value for '{name}', got {}",
                rest.len()
            ))),
        },
        Value::Pair(signature) => {
            // (define (name param ...) body ...) sugar for a lambda
            let name = match &*signature.car.borrow() {
                Value::Symbol(name) => name.clone(),
                other => {
                    return Err(Error::FormError(format!(
                        "define: procedure name must be a symbol, found {}",
                        other.type_name()
                    )));
                }
            };
            let params = parse_params(&signature.cdr.borrow().clone())?;
            if rest.is_empty() {
                return Err(Error::FormError(format!(
                    "define: procedure '{name}' has an empty body"
                )));
            }
            let closure = Value::Closure(Rc::new(crate::value::Closure {
                params,
                body: rest.to_vec(),
                env: env.clone(),
            }));
            env.define(name, closure);
            Ok(())
        }
        other => Err(Error::FormError(format!(
            "define target must be a symbol or a procedure signature, found {}",
            other.type_name()
        ))),
    }
}

/// `(lambda (param ...) body ...)`.
fn make_closure(tail: &Value, env: &Env) -> Result<Value, Error> {
    let operands = tail.proper_list_elements()?;
    let (param_list, body) = match operands.split_first() {
        Some(split) => split,
        None => {
            return Err(Error::FormError(
                "lambda expects a parameter list and a body".to_owned(),
            ));
        }
    };
    let params = parse_params(param_list)?;
    if body.is_empty() {
        return Err(Error::FormError("lambda has an empty body".to_owned()));
    }
    Ok(Value::Closure(Rc::new(crate::value::Closure {
        params,
        body: body.to_vec(),
        env: env.clone(),
    })))
}

/// A parameter list is a proper list of distinct symbols.
fn parse_params(param_list: &Value) -> Result<Vec<Symbol>, Error> {
    let elements = param_list.proper_list_elements().map_err(|_| {
        Error::FormError("parameter list must be a proper list".to_owned())
    })?;
    let mut params = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Value::Symbol(name) => {
                if params.contains(&name) {
                    return Err(Error::FormError(format!(
                        "duplicate parameter name '{name}'"
                    )));
                }
                params.push(name);
            }
            other => {
                return Err(Error::FormError(format!(
                    "parameter must be a symbol, found {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(params)
}
