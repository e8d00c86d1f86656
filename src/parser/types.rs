//! Type constructor parsing.
//!
//! Type constructors are ordinary NUD handlers, so a type may appear
//! anywhere an expression may: as a representation value, after `as`, inside
//! `sizeof(...)` or in front of an initializer.

use crate::{
    ast::expressions::{Expr, ExprKind, Field},
    errors::errors::Error,
    lexer::tokens::TokenKind,
};

use super::{expr::parse_expr, lookups::BindingPower, parser::Parser};

/// `[N]T`
pub fn parse_array_type(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span;
    let size = parser.with_initializers(true, |parser| parse_expr(parser, BindingPower::Default))?;
    parser.expect(TokenKind::CloseBracket)?;

    // `{` must stay available for `[N]T{...}`
    let element = parse_expr(parser, BindingPower::Postfix)?;
    let span = start.to(&element.span);

    Ok(Expr::new(
        ExprKind::ArrayType {
            size: Box::new(size),
            element: Box::new(element),
        },
        span,
    ))
}

fn parse_fields(parser: &mut Parser, allow_ref: bool) -> Result<Vec<Field>, Error> {
    parser.expect(TokenKind::OpenParen)?;

    let fields = parser.with_initializers(true, |parser| {
        let mut fields = vec![];

        while parser.current_token_kind() != TokenKind::CloseParen {
            let start = parser.current_token().span.clone();
            let by_ref = allow_ref && parser.eat(TokenKind::Ref);

            let error = parser.unexpected_detailed("expected member name");
            let name = parser.expect_error(TokenKind::Identifier, Some(error))?.value;
            parser.expect(TokenKind::Colon)?;
            let ty = parse_expr(parser, BindingPower::Assignment)?;

            fields.push(Field {
                name,
                by_ref,
                span: start.to(&ty.span),
                ty,
            });

            if !parser.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(fields)
    })?;

    parser.expect(TokenKind::CloseParen)?;
    Ok(fields)
}

/// `[packed] struct(name: T, ...)`
pub fn parse_struct_type(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.current_token().span.clone();
    let packed = parser.eat(TokenKind::Packed);
    parser.expect(TokenKind::Struct)?;

    let members = parse_fields(parser, false)?;

    Ok(Expr::new(
        ExprKind::StructType { members, packed },
        start.to(&parser.previous_span()),
    ))
}

/// `union(name: T, ...)`
pub fn parse_union_type(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span;
    let members = parse_fields(parser, false)?;

    Ok(Expr::new(
        ExprKind::UnionType { members },
        start.to(&parser.previous_span()),
    ))
}

/// `func([ref] name: T, ...) [-> R]`
pub fn parse_function_type(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span;
    let params = parse_fields(parser, true)?;

    let ret = if parser.eat(TokenKind::Arrow) {
        Some(Box::new(parse_expr(parser, BindingPower::Assignment)?))
    } else {
        None
    };

    Ok(Expr::new(
        ExprKind::FunctionType { params, ret },
        start.to(&parser.previous_span()),
    ))
}
