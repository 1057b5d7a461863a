//! Yarrow command-line tool for inspecting and converting YAML documents.
//!
//! Usage: yarrow [OPTIONS] [FILE]
//!
//! Options:
//!   -t, --to <FORMAT>      Output format (json, debug, events) [default: json]
//!   --check                Check if the input is valid (exit 0 if valid, 1 if not)
//!   --tabs                 Accept tabs as block indentation
//!   -h, --help             Print help
//!   -V, --version          Print version
//!
//! With no FILE, or when FILE is -, reads standard input.

use libyarrow::{load_all_with, parse_events_with, Options, Value};
use num_traits::ToPrimitive;
use std::fs;
use std::io::{self, Read};
use std::process;

fn is_format_name(s: &str) -> bool {
    matches!(s, "json" | "debug" | "events")
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut to_format: Option<&str> = None;
    let mut check_only = false;
    let mut allow_tabs = false;
    let mut input_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-V" | "--version" => {
                println!("yarrow {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "-t" | "--to" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: -t requires a format argument");
                    process::exit(1);
                }
                if !is_format_name(&args[i]) {
                    eprintln!("Error: Unknown format: {}", args[i]);
                    process::exit(1);
                }
                to_format = Some(&args[i]);
            }
            "--check" => {
                check_only = true;
            }
            "--tabs" => {
                allow_tabs = true;
            }
            "-" => {
                // Explicit stdin; input_path stays None.
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                process::exit(1);
            }
            arg => {
                if input_path.is_some() {
                    eprintln!("Error: Multiple input files given");
                    process::exit(1);
                }
                input_path = Some(arg);
            }
        }
        i += 1;
    }

    let (source, filename) = match input_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => (text, Some(path)),
            Err(e) => {
                eprintln!("Error: Cannot read {}: {}", path, e);
                process::exit(1);
            }
        },
        None => {
            let mut text = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut text) {
                eprintln!("Error: Cannot read stdin: {}", e);
                process::exit(1);
            }
            (text, None)
        }
    };

    let options = Options {
        allow_tab_indent: allow_tabs,
        ..Options::default()
    };

    if check_only {
        if let Err(e) = load_all_with(&source, filename, options) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }

    match to_format.unwrap_or("json") {
        "events" => match parse_events_with(&source, filename, options) {
            Ok(events) => {
                for event in events {
                    let mark = &event.span.start;
                    println!("{}:{}: {:?}", mark.line + 1, mark.column + 1, event.data);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        format => match load_all_with(&source, filename, options) {
            Ok(values) => {
                for value in &values {
                    if format == "debug" {
                        println!("{:#?}", value);
                    } else {
                        let rendered = serde_json::to_string_pretty(&to_json(value))
                            .expect("JSON rendering of an owned value cannot fail");
                        println!("{}", rendered);
                    }
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
    }
}

/// Render a value as JSON. Integers beyond 64 bits and non-finite floats
/// have no JSON form and fall back to strings; non-string mapping keys
/// are stringified; duplicate keys collapse last-wins.
fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => (*b).into(),
        Value::Int(int) => {
            if let Some(n) = int.to_i64() {
                n.into()
            } else if let Some(n) = int.to_u64() {
                n.into()
            } else {
                serde_json::Value::String(int.to_string())
            }
        }
        Value::Float(f) => match serde_json::Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => serde_json::Value::String(f.to_string()),
        },
        Value::String(s) => s.clone().into(),
        Value::Sequence(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Mapping(pairs) => {
            let mut map = serde_json::Map::new();
            for (key, value) in pairs {
                let key = match key {
                    Value::String(s) => s.clone(),
                    other => to_json(other).to_string(),
                };
                map.insert(key, to_json(value));
            }
            serde_json::Value::Object(map)
        }
    }
}

fn print_help() {
    println!("Usage: yarrow [OPTIONS] [FILE]");
    println!();
    println!("Options:");
    println!("  -t, --to <FORMAT>   Output format (json, debug, events) [default: json]");
    println!("  --check             Check if the input is valid (exit 0 if valid, 1 if not)");
    println!("  --tabs              Accept tabs as block indentation");
    println!("  -h, --help          Print help");
    println!("  -V, --version       Print version");
    println!();
    println!("With no FILE, or when FILE is -, reads standard input.");
}
