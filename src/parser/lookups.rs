use std::collections::HashMap;

use crate::{
    ast::{expressions::Expr, statements::Stmt},
    errors::errors::Error,
    lexer::tokens::TokenKind,
};

use super::{expr::*, parser::Parser, stmt::*, types::*};

#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
pub enum BindingPower {
    Default,
    Assignment,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Cast,
    Unary,
    Postfix,
    Primary,
}

pub type StmtHandler = fn(&mut Parser) -> Result<Stmt, Error>;
pub type NUDHandler = fn(&mut Parser) -> Result<Expr, Error>;
pub type LEDHandler = fn(&mut Parser, Expr, BindingPower) -> Result<Expr, Error>;

pub fn create_token_lookups(parser: &mut Parser) {
    // Assignment
    for kind in [
        TokenKind::Assignment,
        TokenKind::PlusEquals,
        TokenKind::MinusEquals,
        TokenKind::StarEquals,
        TokenKind::SlashEquals,
        TokenKind::PercentEquals,
        TokenKind::AmpersandEquals,
        TokenKind::PipeEquals,
        TokenKind::CaretEquals,
        TokenKind::ShiftLeftEquals,
        TokenKind::ShiftRightEquals,
    ] {
        parser.led(kind, BindingPower::Assignment, parse_assignment_expr);
    }

    // Logical
    parser.led(TokenKind::Or, BindingPower::LogicalOr, parse_binary_expr);
    parser.led(TokenKind::And, BindingPower::LogicalAnd, parse_binary_expr);

    // Bitwise
    parser.led(TokenKind::Pipe, BindingPower::BitOr, parse_binary_expr);
    parser.led(TokenKind::Caret, BindingPower::BitXor, parse_binary_expr);
    parser.led(TokenKind::Ampersand, BindingPower::BitAnd, parse_binary_expr);

    // Relational
    parser.led(TokenKind::Equals, BindingPower::Equality, parse_binary_expr);
    parser.led(TokenKind::NotEquals, BindingPower::Equality, parse_binary_expr);
    parser.led(TokenKind::Less, BindingPower::Relational, parse_binary_expr);
    parser.led(TokenKind::LessEquals, BindingPower::Relational, parse_binary_expr);
    parser.led(TokenKind::Greater, BindingPower::Relational, parse_binary_expr);
    parser.led(TokenKind::GreaterEquals, BindingPower::Relational, parse_binary_expr);

    // Shift, additive and multiplicative
    parser.led(TokenKind::ShiftLeft, BindingPower::Shift, parse_binary_expr);
    parser.led(TokenKind::ShiftRight, BindingPower::Shift, parse_binary_expr);
    parser.led(TokenKind::Plus, BindingPower::Additive, parse_binary_expr);
    parser.led(TokenKind::Dash, BindingPower::Additive, parse_binary_expr);
    parser.led(TokenKind::Star, BindingPower::Multiplicative, parse_binary_expr);
    parser.led(TokenKind::Slash, BindingPower::Multiplicative, parse_binary_expr);
    parser.led(TokenKind::Percent, BindingPower::Multiplicative, parse_binary_expr);

    parser.led(TokenKind::As, BindingPower::Cast, parse_cast_expr);

    // Postfix
    parser.led(TokenKind::OpenParen, BindingPower::Postfix, parse_call_expr);
    parser.led(TokenKind::OpenBracket, BindingPower::Postfix, parse_index_expr);
    parser.led(TokenKind::Dot, BindingPower::Postfix, parse_member_expr);
    parser.led(TokenKind::OpenCurly, BindingPower::Postfix, parse_typed_initializer_expr);

    // Literals and symbols
    parser.nud(TokenKind::Number, parse_primary_expr);
    parser.nud(TokenKind::Real, parse_primary_expr);
    parser.nud(TokenKind::Char, parse_primary_expr);
    parser.nud(TokenKind::String, parse_primary_expr);
    parser.nud(TokenKind::True, parse_primary_expr);
    parser.nud(TokenKind::False, parse_primary_expr);
    parser.nud(TokenKind::Identifier, parse_primary_expr);
    parser.nud(TokenKind::OpenParen, parse_grouping_expr);
    parser.nud(TokenKind::OpenCurly, parse_initializer_expr);
    parser.nud(TokenKind::SizeOf, parse_sizeof_expr);

    // Prefix
    parser.nud(TokenKind::Dash, parse_prefix_expr);
    parser.nud(TokenKind::Not, parse_prefix_expr);
    parser.nud(TokenKind::Tilde, parse_prefix_expr);
    parser.nud(TokenKind::Ampersand, parse_prefix_expr);
    parser.nud(TokenKind::Star, parse_prefix_expr);

    // Type constructors
    parser.nud(TokenKind::OpenBracket, parse_array_type);
    parser.nud(TokenKind::Struct, parse_struct_type);
    parser.nud(TokenKind::Packed, parse_struct_type);
    parser.nud(TokenKind::Union, parse_union_type);
    parser.nud(TokenKind::Func, parse_function_type);

    // Statements
    parser.stmt(TokenKind::OpenCurly, parse_block_stmt);
    parser.stmt(TokenKind::If, parse_if_stmt);
    parser.stmt(TokenKind::Loop, parse_loop_stmt);
    parser.stmt(TokenKind::Break, parse_break_stmt);
    parser.stmt(TokenKind::Continue, parse_continue_stmt);
    parser.stmt(TokenKind::Return, parse_return_stmt);
    parser.stmt(TokenKind::Static, parse_var_decl_stmt);
}

// Lookup tables inside parser struct, so it's easier
pub type StmtLookup = HashMap<TokenKind, StmtHandler>;
pub type NUDLookup = HashMap<TokenKind, NUDHandler>;
pub type LEDLookup = HashMap<TokenKind, LEDHandler>;
pub type BPLookup = HashMap<TokenKind, BindingPower>;
