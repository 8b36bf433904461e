//! The reader: textual S-expressions to [`Value`] graphs.
//!
//! [`read`] consumes leading atmosphere (whitespace and `;` comments) and
//! exactly one external representation, returning the value and the
//! unconsumed tail of the input. A clean end of input before any token is
//! `Ok(None)`, which is how the session driver distinguishes "done" from
//! "broken".
//!
//! Atoms must be terminated by a delimiter (whitespace, parenthesis,
//! double quote, semicolon, or end of input): `12abc` is an error, not the
//! number 12 followed by a symbol.

use nom::{
    character::complete::{char, digit1},
    combinator::{opt, recognize},
    sequence::pair,
    IResult, Parser,
};

use crate::interp::Interpreter;
use crate::value::{cons, string, Value};
use crate::{Error, ParseError, ParseErrorKind, MAX_PARSE_DEPTH, MAX_STRING_LEN};

/// Reader-internal error: a typed failure kind plus the input position it
/// occurred at (as the unconsumed suffix). Converted to the crate's
/// [`ParseError`] with positional context at the `read` boundary.
#[derive(Debug)]
pub struct ReadError<'a> {
    input: &'a str,
    kind: ParseErrorKind,
    message: String,
}

impl<'a> nom::error::ParseError<&'a str> for ReadError<'a> {
    fn from_error_kind(input: &'a str, _kind: nom::error::ErrorKind) -> Self {
        ReadError {
            input,
            kind: ParseErrorKind::InvalidSyntax,
            message: "invalid syntax".into(),
        }
    }

    fn append(_input: &'a str, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

type ReadResult<'a, T> = IResult<&'a str, T, ReadError<'a>>;

/// Build an unrecoverable reader failure at `input`.
fn fail<'a>(
    input: &'a str,
    kind: ParseErrorKind,
    message: impl Into<String>,
) -> nom::Err<ReadError<'a>> {
    nom::Err::Failure(ReadError {
        input,
        kind,
        message: message.into(),
    })
}

/// Characters that terminate an atom.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == ';'
}

/// Characters that may begin a symbol. `+` and `-` are not here: a lone
/// `+` or `-` immediately followed by a delimiter is the only way either
/// may start a symbol, handled as an explicit case in [`parse_expr`].
fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || "*/><=?!".contains(c)
}

/// Characters that may continue a symbol.
fn is_symbol_continue(c: char) -> bool {
    is_symbol_start(c) || c.is_ascii_digit() || c == '+' || c == '-'
}

/// Skip whitespace and `;`-to-end-of-line comments.
fn skip_atmosphere(mut input: &str) -> &str {
    loop {
        let trimmed = input.trim_start();
        if let Some(rest) = trimmed.strip_prefix(';') {
            input = match rest.find('\n') {
                Some(pos) => &rest[pos + 1..],
                None => "",
            };
        } else {
            return trimmed;
        }
    }
}

/// Atoms must be followed by a delimiter or end of input.
fn require_delimiter<'a>(input: &'a str, what: &str) -> Result<(), nom::Err<ReadError<'a>>> {
    match input.chars().next() {
        None => Ok(()),
        Some(c) if is_delimiter(c) => Ok(()),
        Some(_) => Err(fail(
            input,
            ParseErrorKind::MissingDelimiter,
            format!("{what} not followed by delimiter"),
        )),
    }
}

/// Read one external representation from `input`.
///
/// Returns `Ok(None)` when the input holds nothing but atmosphere, and
/// `Ok(Some((value, rest)))` otherwise, where `rest` begins immediately
/// after the representation.
pub fn read<'a>(
    interp: &Interpreter,
    input: &'a str,
) -> Result<Option<(Value, &'a str)>, Error> {
    let start = skip_atmosphere(input);
    if start.is_empty() {
        return Ok(None);
    }
    match parse_expr(interp, start, 0) {
        Ok((rest, value)) => Ok(Some((value, rest))),
        Err(e) => Err(convert_error(input, e)),
    }
}

/// Map a reader-internal failure to the crate error type, attaching a
/// context snippet around the failure offset.
fn convert_error(source: &str, error: nom::Err<ReadError>) -> Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = source.len().saturating_sub(e.input.len());
            Error::ParseError(ParseError::with_context(e.kind, e.message, source, offset))
        }
        nom::Err::Incomplete(_) => Error::ParseError(ParseError::from_message(
            ParseErrorKind::Incomplete,
            "unexpected end of input",
        )),
    }
}

/// Parse one expression. `input` must already be past any atmosphere.
fn parse_expr<'a>(interp: &Interpreter, input: &'a str, depth: usize) -> ReadResult<'a, Value> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(fail(
            input,
            ParseErrorKind::TooDeeplyNested,
            format!("expression nesting exceeds depth limit {MAX_PARSE_DEPTH}"),
        ));
    }

    let mut chars = input.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => {
            return Err(fail(
                input,
                ParseErrorKind::Incomplete,
                "unexpected end of input",
            ));
        }
    };
    let second = chars.next();

    match first {
        '#' => parse_hash(input),
        '"' => parse_string_literal(input),
        '\'' => {
            let (rest, quoted) = parse_expr(interp, skip_atmosphere(&input[1..]), depth + 1)?;
            let quote = Value::Symbol(interp.keywords.quote.clone());
            Ok((rest, cons(quote, cons(quoted, Value::Nil))))
        }
        '(' => parse_list(interp, &input[1..], depth),
        ')' => Err(fail(
            input,
            ParseErrorKind::UnmatchedParen,
            "unmatched closing parenthesis",
        )),
        c if c.is_ascii_digit() => parse_integer(input),
        '-' if second.is_some_and(|c| c.is_ascii_digit()) => parse_integer(input),
        '+' | '-' if second.is_none_or(is_delimiter) => {
            Ok((&input[1..], Value::Symbol(interp.intern(&input[..1]))))
        }
        c if is_symbol_start(c) => parse_symbol(interp, input),
        c => Err(fail(
            input,
            ParseErrorKind::InvalidSyntax,
            format!("unexpected character '{c}'"),
        )),
    }
}

/// `#t`, `#f`, and `#\` character literals.
fn parse_hash(input: &str) -> ReadResult<'_, Value> {
    let rest = &input[1..];
    match rest.chars().next() {
        Some('t') => {
            require_delimiter(&rest[1..], "boolean literal")?;
            Ok((&rest[1..], Value::Boolean(true)))
        }
        Some('f') => {
            require_delimiter(&rest[1..], "boolean literal")?;
            Ok((&rest[1..], Value::Boolean(false)))
        }
        Some('\\') => parse_character(&rest[1..]),
        Some(c) => Err(fail(
            input,
            ParseErrorKind::InvalidSyntax,
            format!("unknown literal '#{c}'"),
        )),
        None => Err(fail(
            input,
            ParseErrorKind::Incomplete,
            "unexpected end of input after '#'",
        )),
    }
}

/// The body of a `#\` character literal. Named forms `space` and
/// `newline` win only when followed by a delimiter, so `#\s` is still the
/// letter s.
fn parse_character(input: &str) -> ReadResult<'_, Value> {
    for (name, ch) in [("space", ' '), ("newline", '\n')] {
        if let Some(rest) = input.strip_prefix(name) {
            if rest.chars().next().is_none_or(is_delimiter) {
                return Ok((rest, Value::Character(ch)));
            }
        }
    }
    match input.chars().next() {
        Some(c) => {
            let rest = &input[c.len_utf8()..];
            require_delimiter(rest, "character literal")?;
            Ok((rest, Value::Character(c)))
        }
        None => Err(fail(
            input,
            ParseErrorKind::Incomplete,
            "unterminated character literal",
        )),
    }
}

/// A double-quoted string. Recognized escapes are `\n`, `\t`, `\a`, `\\`
/// and `\"`; any other escaped character denotes itself.
fn parse_string_literal(input: &str) -> ReadResult<'_, Value> {
    let mut remaining = &input[1..];
    let mut contents = String::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some('"') => return Ok((char_iter.as_str(), string(contents))),
            Some('\\') => {
                match char_iter.next() {
                    Some('n') => contents.push('\n'),
                    Some('t') => contents.push('\t'),
                    Some('a') => contents.push('\u{7}'),
                    Some(other) => contents.push(other),
                    None => {
                        return Err(fail(
                            remaining,
                            ParseErrorKind::Incomplete,
                            "unterminated string literal",
                        ));
                    }
                }
                remaining = char_iter.as_str();
            }
            Some(c) => {
                contents.push(c);
                remaining = char_iter.as_str();
            }
            None => {
                return Err(fail(
                    remaining,
                    ParseErrorKind::Incomplete,
                    "unterminated string literal",
                ));
            }
        }
        if contents.len() > MAX_STRING_LEN {
            return Err(fail(
                remaining,
                ParseErrorKind::ImplementationLimit,
                format!("string exceeds maximum length {MAX_STRING_LEN}"),
            ));
        }
    }
}

/// A signed decimal integer.
fn parse_integer(input: &str) -> ReadResult<'_, Value> {
    let (rest, number_str) = recognize(pair(opt(char('-')), digit1)).parse(input)?;
    let n: i64 = number_str.parse().map_err(|_| {
        fail(
            input,
            ParseErrorKind::ImplementationLimit,
            format!("integer literal '{number_str}' out of range"),
        )
    })?;
    require_delimiter(rest, "number")?;
    Ok((rest, Value::Integer(n)))
}

/// A symbol token: a symbol-start character followed by symbol-start
/// characters and digits.
fn parse_symbol<'a>(interp: &Interpreter, input: &'a str) -> ReadResult<'a, Value> {
    let end = input
        .find(|c: char| !is_symbol_continue(c))
        .unwrap_or(input.len());
    let (token, rest) = input.split_at(end);
    if token.len() > MAX_STRING_LEN {
        return Err(fail(
            input,
            ParseErrorKind::ImplementationLimit,
            format!("symbol exceeds maximum length {MAX_STRING_LEN}"),
        ));
    }
    require_delimiter(rest, "symbol")?;
    Ok((rest, Value::Symbol(interp.intern(token))))
}

/// The interior of a list, after the opening parenthesis. Handles proper
/// lists, dotted tails, and nil.
fn parse_list<'a>(interp: &Interpreter, input: &'a str, depth: usize) -> ReadResult<'a, Value> {
    let mut remaining = input;
    let mut elements: Vec<Value> = Vec::new();

    loop {
        remaining = skip_atmosphere(remaining);
        let mut chars = remaining.chars();
        match chars.next() {
            None => {
                return Err(fail(
                    remaining,
                    ParseErrorKind::UnmatchedParen,
                    "unterminated list",
                ));
            }
            Some(')') => {
                return Ok((chars.as_str(), crate::value::list(elements)));
            }
            Some('.') => {
                if !chars.next().is_none_or(is_delimiter) {
                    return Err(fail(
                        remaining,
                        ParseErrorKind::BadDottedTail,
                        "dot not followed by delimiter",
                    ));
                }
                if elements.is_empty() {
                    return Err(fail(
                        remaining,
                        ParseErrorKind::BadDottedTail,
                        "dotted tail with no preceding element",
                    ));
                }
                let after_dot = skip_atmosphere(&remaining[1..]);
                let (rest, tail) = parse_expr(interp, after_dot, depth + 1)?;
                let rest = skip_atmosphere(rest);
                match rest.strip_prefix(')') {
                    Some(rest) => {
                        let mut result = tail;
                        for element in elements.into_iter().rev() {
                            result = cons(element, result);
                        }
                        return Ok((rest, result));
                    }
                    None => {
                        return Err(fail(
                            rest,
                            ParseErrorKind::BadDottedTail,
                            "more than one object follows dotted tail",
                        ));
                    }
                }
            }
            Some(_) => {
                let (rest, element) = parse_expr(interp, remaining, depth + 1)?;
                elements.push(element);
                remaining = rest;
            }
        }
    }
}
