use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("struct", TokenKind::Struct);
        map.insert("union", TokenKind::Union);
        map.insert("packed", TokenKind::Packed);
        map.insert("func", TokenKind::Func);
        map.insert("ref", TokenKind::Ref);
        map.insert("if", TokenKind::If);
        map.insert("elif", TokenKind::Elif);
        map.insert("else", TokenKind::Else);
        map.insert("loop", TokenKind::Loop);
        map.insert("break", TokenKind::Break);
        map.insert("continue", TokenKind::Continue);
        map.insert("return", TokenKind::Return);
        map.insert("as", TokenKind::As);
        map.insert("sizeof", TokenKind::SizeOf);
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("static", TokenKind::Static);
        map.insert("private", TokenKind::Private);
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EOF,
    Number,
    Real,
    String,
    Char,
    Identifier,

    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,

    Assignment, // =
    Equals,     // ==
    Not,        // !
    NotEquals,  // !=
    Tilde,      // ~

    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    ShiftLeft,
    ShiftRight,

    Or,
    And,
    Ampersand,
    Pipe,
    Caret,

    Dot,
    Semicolon,
    Colon,
    ColonColon,
    ColonEquals,
    Comma,
    Arrow,

    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    PercentEquals,
    AmpersandEquals,
    PipeEquals,
    CaretEquals,
    ShiftLeftEquals,
    ShiftRightEquals,

    Plus,
    Dash,
    Slash,
    Star,
    Percent,

    // Reserved
    Struct,
    Union,
    Packed,
    Func,
    Ref,
    If,
    Elif,
    Else,
    Loop,
    Break,
    Continue,
    Return,
    As,
    SizeOf,
    True,
    False,
    Static,
    Private,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token {{\nkind: {},\nvalue: {}}}", self.kind, self.value)
    }
}

impl Token {
    pub fn is_one_of_many(&self, tokens: &[TokenKind]) -> bool {
        tokens.contains(&self.kind)
    }
}
