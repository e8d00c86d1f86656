#![allow(clippy::module_inception)]

use std::{rc::Rc, sync::Once};

use crate::{
    compiler::compiler::compile,
    errors::errors::{Error, ErrorTip},
    lexer::lexer::tokenize,
    options::CompileOptions,
    parser::parser::parse,
};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod ir;
pub mod lexer;
pub mod macros;
pub mod options;
pub mod parser;
pub mod types;

extern crate regex;

#[derive(Debug, Clone, PartialEq)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn null() -> Self {
        Span {
            start: Position::null(),
            end: Position::null(),
        }
    }

    /// Span covering `self` up to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start.clone(),
            end: other.end.clone(),
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=emberc=debug`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Runs the whole pipeline on a source string: tokenize, parse, then lower
/// every item into an IR module.
pub fn compile_source(source: &str, options: &CompileOptions) -> Result<ir::ir::Module, Vec<Error>> {
    let tokens = tokenize(source, Some(options.file_name.clone())).map_err(|error| vec![error])?;
    let module = parse(tokens, Rc::new(options.file_name.clone())).map_err(|error| vec![error])?;

    compile(&module, options)
}

/// Returns the 1-based line and column of a byte offset.
pub fn line_and_column(source: &str, position: u32) -> (usize, usize) {
    let pos = (position as usize).min(source.len());
    let before = &source[..pos];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => pos - newline,
        None => pos + 1,
    };

    (line, column)
}

/// Returns the line number, the text of the line and the offset into it for
/// a byte position.
pub fn get_line_at_position(source: &str, position: u32) -> (usize, String, usize) {
    let pos = position as usize;
    let mut start = 0;
    let mut line_number = 1;

    for line in source.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return (line_number, line.to_string(), pos - start);
        }

        start = end;
        line_number += 1;
    }

    (line_number, String::new(), 0)
}

/// Pretty prints an error with the offending line underneath.
pub fn display_error(error: &Error, source: &str) -> String {
    /*
        file:3:9 message (tip)
           |
         3 | y := #;
           | -----^
    */

    let position = &error.get_span().start;
    let (line, line_text, line_pos) = get_line_at_position(source, position.0);

    let line_string = line.to_string();
    let padding = line_string.len() + 2;

    let mut output = String::new();
    if let ErrorTip::None = error.get_tip() {
        output.push_str(&error.render(source));
    } else {
        output.push_str(&format!("{} ({})", error.render(source), error.get_tip()));
    }
    output.push('\n');
    output.push_str(&format!("{:>padding$}\n", "|"));

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    output.push_str(&format!("{} | {}\n", line_string, line_text_removed.trim_end()));

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;
    output.push_str(&format!("{:>padding$} {:->arrows$}", "|", "^"));

    output
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_get_line_at_position() {
        let source = "Hello, world!\nfoo\nbar\nTesting { }\n";

        let (line_number, line, line_pos) = super::get_line_at_position(source, 10);
        assert_eq!(line_number, 1);
        assert_eq!(line, "Hello, world!\n");
        assert_eq!(line_pos, 10);

        let (line_number, line, line_pos) = super::get_line_at_position(source, 30);
        assert_eq!(line_number, 4);
        assert_eq!(line, "Testing { }\n");
        assert_eq!(line_pos, 8);
    }

    #[test]
    fn test_line_and_column() {
        let source = "ab\ncd\n";
        assert_eq!(super::line_and_column(source, 0), (1, 1));
        assert_eq!(super::line_and_column(source, 1), (1, 2));
        assert_eq!(super::line_and_column(source, 3), (2, 1));
        assert_eq!(super::line_and_column(source, 4), (2, 2));
    }
}
