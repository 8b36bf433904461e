use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use schemelet::{reader, Interpreter, SessionOptions, Value};
use std::panic;
use std::process;

fn main() {
    let result = panic::catch_unwind(|| match std::env::args().nth(1) {
        Some(path) => run_file(&path),
        None => run_repl(),
    });

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(panic_info) => {
            eprintln!("The interpreter encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

/// Run a source file through the session driver, echoing numbered
/// prompts and results to stdout.
fn run_file(path: &str) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read {path}: {e}");
            return 1;
        }
    };

    let interp = Interpreter::new();
    let options = SessionOptions {
        silent: false,
        stop_on_error: false,
    };
    let mut stdout = std::io::stdout();
    match interp.run(&source, &mut stdout, &options) {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn run_repl() -> i32 {
    println!("Schemelet - a small Scheme interpreter");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Could not initialize line editor: {e}");
            return 1;
        }
    };
    let interp = Interpreter::new();

    loop {
        match rl.readline("schemelet> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&interp);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                eval_line(&interp, line);
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
    0
}

/// Read and evaluate every form on the line, printing each result.
/// Errors are printed and end the line, never the session.
fn eval_line(interp: &Interpreter, line: &str) {
    let mut rest = line;
    loop {
        match reader::read(interp, rest) {
            Ok(Some((expr, tail))) => {
                rest = tail;
                match interp.eval(&expr) {
                    Ok(value) => println!("{value}"),
                    Err(e) => {
                        println!("Error: {e}");
                        return;
                    }
                }
            }
            Ok(None) => return,
            Err(e) => {
                println!("Error: {e}");
                return;
            }
        }
    }
}

fn print_help() {
    println!("Schemelet commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Language:");
    println!("  Literals: 42, -5, #t, #f, #\\a, #\\space, \"text\", 'sym");
    println!("  Special forms: quote, define, set!, if, lambda, begin, and, or");
    println!("  Arithmetic: +, -, *, quotient, remainder, =, <, >");
    println!("  Pairs: cons, car, cdr, list, set-car!, set-cdr!, eq?");
    println!("  Meta: apply, eval, interaction-environment");
    println!();
    println!("Examples:");
    println!("  (define (square x) (* x x))");
    println!("  (square 7)");
    println!("  (apply + (list 1 2 3))");
    println!();
}

fn print_environment(interp: &Interpreter) {
    let bindings = interp.global_env().all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate primitives from user-defined values
    let mut primitives = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Primitive(_) => primitives.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !primitives.is_empty() {
        println!("Primitive procedures ({}):", primitives.len());
        // Print in columns for readability
        let mut col = 0;
        for name in primitives {
            print!("  {name:<24}");
            col += 1;
            if col % 3 == 0 {
                println!();
            }
        }
        if col % 3 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
