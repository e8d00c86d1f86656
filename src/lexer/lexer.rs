use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

pub type RegexHandler = fn(&mut Lexer, &Regex) -> Result<(), Error>;

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

lazy_static! {
    // Every pattern is anchored; order matters where one token is a prefix
    // of another.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        RegexPattern { regex: Regex::new(r"^\s+").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new(r"^//[^\n]*").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*").unwrap(), handler: symbol_handler },
        RegexPattern {
            regex: Regex::new(r"^(0[xX][0-9a-fA-F_]+|0[bB][01_]+|[0-9][0-9_]*(\.[0-9]+)?([eE][+-]?[0-9]+)?)").unwrap(),
            handler: number_handler,
        },
        RegexPattern { regex: Regex::new(r#"^"(\\.|[^"\\])*""#).unwrap(), handler: string_handler },
        RegexPattern { regex: Regex::new(r"^'(\\.|[^'\\])'").unwrap(), handler: char_handler },
        RegexPattern { regex: Regex::new(r"^<<=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ShiftLeftEquals, "<<=") },
        RegexPattern { regex: Regex::new(r"^>>=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ShiftRightEquals, ">>=") },
        RegexPattern { regex: Regex::new(r"^::").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ColonColon, "::") },
        RegexPattern { regex: Regex::new(r"^:=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ColonEquals, ":=") },
        RegexPattern { regex: Regex::new(r"^->").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Arrow, "->") },
        RegexPattern { regex: Regex::new(r"^==").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Equals, "==") },
        RegexPattern { regex: Regex::new(r"^!=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=") },
        RegexPattern { regex: Regex::new(r"^<=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=") },
        RegexPattern { regex: Regex::new(r"^>=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=") },
        RegexPattern { regex: Regex::new(r"^<<").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ShiftLeft, "<<") },
        RegexPattern { regex: Regex::new(r"^>>").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ShiftRight, ">>") },
        RegexPattern { regex: Regex::new(r"^&&").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::And, "&&") },
        RegexPattern { regex: Regex::new(r"^\|\|").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Or, "||") },
        RegexPattern { regex: Regex::new(r"^\+=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::PlusEquals, "+=") },
        RegexPattern { regex: Regex::new(r"^-=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::MinusEquals, "-=") },
        RegexPattern { regex: Regex::new(r"^\*=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::StarEquals, "*=") },
        RegexPattern { regex: Regex::new(r"^/=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::SlashEquals, "/=") },
        RegexPattern { regex: Regex::new(r"^%=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::PercentEquals, "%=") },
        RegexPattern { regex: Regex::new(r"^&=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::AmpersandEquals, "&=") },
        RegexPattern { regex: Regex::new(r"^\|=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::PipeEquals, "|=") },
        RegexPattern { regex: Regex::new(r"^\^=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::CaretEquals, "^=") },
        RegexPattern { regex: Regex::new(r"^\[").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::OpenBracket, "[") },
        RegexPattern { regex: Regex::new(r"^\]").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::CloseBracket, "]") },
        RegexPattern { regex: Regex::new(r"^\{").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::OpenCurly, "{") },
        RegexPattern { regex: Regex::new(r"^\}").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::CloseCurly, "}") },
        RegexPattern { regex: Regex::new(r"^\(").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(") },
        RegexPattern { regex: Regex::new(r"^\)").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")") },
        RegexPattern { regex: Regex::new(r"^!").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Not, "!") },
        RegexPattern { regex: Regex::new(r"^~").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Tilde, "~") },
        RegexPattern { regex: Regex::new(r"^=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=") },
        RegexPattern { regex: Regex::new(r"^<").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Less, "<") },
        RegexPattern { regex: Regex::new(r"^>").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Greater, ">") },
        RegexPattern { regex: Regex::new(r"^&").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Ampersand, "&") },
        RegexPattern { regex: Regex::new(r"^\|").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Pipe, "|") },
        RegexPattern { regex: Regex::new(r"^\^").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Caret, "^") },
        RegexPattern { regex: Regex::new(r"^\.").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dot, ".") },
        RegexPattern { regex: Regex::new(r"^;").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Semicolon, ";") },
        RegexPattern { regex: Regex::new(r"^:").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Colon, ":") },
        RegexPattern { regex: Regex::new(r"^,").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Comma, ",") },
        RegexPattern { regex: Regex::new(r"^\+").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+") },
        RegexPattern { regex: Regex::new(r"^-").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dash, "-") },
        RegexPattern { regex: Regex::new(r"^/").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Slash, "/") },
        RegexPattern { regex: Regex::new(r"^\*").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Star, "*") },
        RegexPattern { regex: Regex::new(r"^%").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Percent, "%") },
    ];
}

pub struct Lexer<'s> {
    tokens: Vec<Token>,
    source: &'s str,
    pos: usize,
    file: Rc<String>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str, file: Option<String>) -> Lexer<'s> {
        let file_name = if let Some(file) = file {
            Rc::new(file)
        } else {
            Rc::new(String::from("shell"))
        };

        Lexer {
            pos: 0,
            tokens: vec![],
            source,
            file: file_name,
        }
    }

    pub fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn remainder(&self) -> &'s str {
        &self.source[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Span starting at the current position and covering `len` bytes.
    pub fn span_of(&self, len: usize) -> Span {
        Span {
            start: Position(self.pos as u32, Rc::clone(&self.file)),
            end: Position((self.pos + len) as u32, Rc::clone(&self.file)),
        }
    }

    fn error(&self, error: ErrorImpl, len: usize) -> Error {
        Error::new(error, self.span_of(len))
    }

    fn matched(&self, regex: &Regex) -> &'s str {
        regex.find(self.remainder()).map(|m| m.as_str()).unwrap_or("")
    }
}

fn skip_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex).len();
    lexer.advance_n(matched);
    Ok(())
}

fn number_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex);
    let lower = matched.to_ascii_lowercase();
    let is_real = !lower.starts_with("0x")
        && !lower.starts_with("0b")
        && (lower.contains('.') || lower.contains('e'));
    let kind = if is_real {
        TokenKind::Real
    } else {
        TokenKind::Number
    };

    lexer.push(MK_TOKEN!(kind, matched.to_string(), lexer.span_of(matched.len())));
    lexer.advance_n(matched.len());
    Ok(())
}

fn string_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex);
    let body = &matched[1..matched.len() - 1];
    let value = unescape(body).map_err(|token| {
        lexer.error(ErrorImpl::UnrecognisedToken { token }, matched.len())
    })?;

    lexer.push(MK_TOKEN!(TokenKind::String, value, lexer.span_of(matched.len())));
    lexer.advance_n(matched.len());
    Ok(())
}

fn char_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex);
    let body = &matched[1..matched.len() - 1];
    let value = unescape(body).map_err(|token| {
        lexer.error(ErrorImpl::UnrecognisedToken { token }, matched.len())
    })?;

    if value.len() != 1 {
        return Err(lexer.error(
            ErrorImpl::UnrecognisedToken {
                token: matched.to_string(),
            },
            matched.len(),
        ));
    }

    lexer.push(MK_TOKEN!(TokenKind::Char, value, lexer.span_of(matched.len())));
    lexer.advance_n(matched.len());
    Ok(())
}

fn symbol_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let value = lexer.matched(regex);
    let kind = RESERVED_LOOKUP
        .get(value)
        .copied()
        .unwrap_or(TokenKind::Identifier);

    lexer.push(MK_TOKEN!(kind, String::from(value), lexer.span_of(value.len())));
    lexer.advance_n(value.len());
    Ok(())
}

/// Resolves backslash escapes. Returns the offending escape on failure.
fn unescape(literal: &str) -> Result<String, String> {
    let mut result = String::new();
    let mut chars = literal.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some('x') => {
                let mut hex = String::new();
                while hex.len() < 2 {
                    match chars.peek() {
                        Some(digit) if digit.is_ascii_hexdigit() => {
                            hex.push(*digit);
                            chars.next();
                        }
                        _ => break,
                    }
                }

                let byte = u8::from_str_radix(&hex, 16).map_err(|_| format!("\\x{}", hex))?;
                result.push(byte as char);
            }
            Some(other) => return Err(format!("\\{}", other)),
            None => return Err(String::from("\\")),
        }
    }

    Ok(result)
}

pub fn tokenize(source: &str, file: Option<String>) -> Result<Vec<Token>, Error> {
    let mut lex = Lexer::new(source, file);

    while !lex.at_eof() {
        let remainder = lex.remainder();
        let pattern = PATTERNS
            .iter()
            .find(|pattern| pattern.regex.is_match(remainder));

        match pattern {
            Some(pattern) => (pattern.handler)(&mut lex, &pattern.regex)?,
            None => {
                let token = remainder.chars().next().map(String::from).unwrap_or_default();
                return Err(lex.error(ErrorImpl::UnrecognisedToken { token }, 1));
            }
        }
    }

    lex.push(MK_TOKEN!(TokenKind::EOF, String::from("EOF"), lex.span_of(0)));
    Ok(lex.tokens)
}
