use crate::{
    ast::{
        expressions::Expr,
        statements::{IfBranch, Stmt, StmtKind, VarDecl},
    },
    errors::errors::Error,
    lexer::tokens::TokenKind,
    parser::{expr::parse_expr, lookups::BindingPower},
};

use super::parser::{parse_annotation, Parser};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if let Some(handler) = parser.get_stmt_lookup().get(&parser.current_token_kind()).copied() {
        return handler(parser);
    }

    if starts_var_decl(parser) {
        return parse_var_decl_stmt(parser);
    }

    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Semicolon)?;

    let span = expr.span.to(&parser.previous_span());

    Ok(Stmt::new(StmtKind::Expression(expr), span))
}

fn starts_var_decl(parser: &Parser) -> bool {
    parser.current_token_kind() == TokenKind::Identifier
        && matches!(parser.peek_kind(1), TokenKind::Colon | TokenKind::ColonEquals)
}

/// `{ stmt* }`, returning the statements.
pub fn parse_block(parser: &mut Parser) -> Result<Vec<Stmt>, Error> {
    parser.expect(TokenKind::OpenCurly)?;

    let mut statements = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseCurly {
        if !parser.has_tokens() {
            return Err(parser.unexpected_detailed("unterminated block"));
        }
        statements.push(parse_stmt(parser)?);
    }

    parser.expect(TokenKind::CloseCurly)?;
    Ok(statements)
}

pub fn parse_block_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.current_token().span.clone();
    let body = parse_block(parser)?;

    Ok(Stmt::new(StmtKind::Block(body), start.to(&parser.previous_span())))
}

/// `[static] name := value;` or `[static] name : T [= value];`
pub fn parse_var_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.current_token().span.clone();
    let is_static = parser.eat(TokenKind::Static);

    let error = parser.unexpected_detailed("expected identifier during variable declaration");
    let name = parser.expect_error(TokenKind::Identifier, Some(error))?.value;

    let (ty, value) = if parser.eat(TokenKind::ColonEquals) {
        (None, Some(parse_expr(parser, BindingPower::Default)?))
    } else {
        parser.expect(TokenKind::Colon)?;
        let ty = parse_annotation(parser, true)?;

        let value = if parser.eat(TokenKind::Assignment) {
            Some(parse_expr(parser, BindingPower::Default)?)
        } else {
            None
        };

        (Some(ty), value)
    };

    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(
        StmtKind::VarDecl(VarDecl {
            name,
            ty,
            value,
            is_static,
        }),
        start.to(&parser.previous_span()),
    ))
}

fn parse_condition(parser: &mut Parser) -> Result<Expr, Error> {
    parser.with_initializers(false, |parser| parse_expr(parser, BindingPower::Default))
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span;
    let mut branches = vec![];

    loop {
        let branch_start = parser.previous_span();
        let condition = parse_condition(parser)?;
        let body = parse_block(parser)?;

        branches.push(IfBranch {
            condition,
            body,
            span: branch_start.to(&parser.previous_span()),
        });

        if !parser.eat(TokenKind::Elif) {
            break;
        }
    }

    let otherwise = if parser.eat(TokenKind::Else) {
        Some(parse_block(parser)?)
    } else {
        None
    };

    Ok(Stmt::new(
        StmtKind::If { branches, otherwise },
        start.to(&parser.previous_span()),
    ))
}

/// `loop { }`, `loop cond { }` or `loop [init]; [cond]; [update] { }`
pub fn parse_loop_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span;

    let mut init = None;
    let mut condition = None;
    let mut update = None;

    if parser.current_token_kind() != TokenKind::OpenCurly {
        let three_clause = if starts_var_decl(parser) {
            init = Some(Box::new(parse_var_decl_stmt(parser)?));
            true
        } else if parser.eat(TokenKind::Semicolon) {
            true
        } else {
            let expr = parse_condition(parser)?;

            if parser.eat(TokenKind::Semicolon) {
                let span = expr.span.to(&parser.previous_span());
                init = Some(Box::new(Stmt::new(StmtKind::Expression(expr), span)));
                true
            } else {
                condition = Some(expr);
                false
            }
        };

        if three_clause {
            if !parser.eat(TokenKind::Semicolon) {
                condition = Some(parse_condition(parser)?);
                parser.expect(TokenKind::Semicolon)?;
            }

            if parser.current_token_kind() != TokenKind::OpenCurly {
                update = Some(parse_condition(parser)?);
            }
        }
    }

    let body = parse_block(parser)?;

    Ok(Stmt::new(
        StmtKind::Loop {
            init,
            condition,
            update,
            body,
        },
        start.to(&parser.previous_span()),
    ))
}

pub fn parse_break_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span;
    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::Break, start.to(&parser.previous_span())))
}

pub fn parse_continue_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span;
    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::Continue, start.to(&parser.previous_span())))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span;

    let value = if parser.current_token_kind() != TokenKind::Semicolon {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::Return(value), start.to(&parser.previous_span())))
}
