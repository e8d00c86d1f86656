use crate::{
    ast::expressions::{BinaryOp, Expr, ExprKind, InitElement, InitTag, UnaryOp},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::{lookups::BindingPower, parser::Parser};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let nud = match parser.get_nud_lookup().get(&token_kind) {
        Some(nud) => *nud,
        None => return Err(parser.unexpected()),
    };

    let mut left = nud(parser)?;

    // While the current token binds tighter than `bp`, keep extending lhs
    while parser.current_binding_power() > bp {
        let token_kind = parser.current_token_kind();
        let led = match parser.get_led_lookup().get(&token_kind) {
            Some(led) => *led,
            None => return Err(parser.unexpected()),
        };

        let binding_power = parser.current_binding_power();
        left = led(parser, left, binding_power)?;
    }

    Ok(left)
}

fn parse_integer(text: &str) -> Option<i128> {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();

    let value = if let Some(hex) = lower.strip_prefix("0x") {
        u128::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u128::from_str_radix(bin, 2).ok()?
    } else {
        lower.parse::<u128>().ok()?
    };

    i128::try_from(value).ok()
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.current_token().clone();

    let kind = match token.kind {
        TokenKind::Number => match parse_integer(&token.value) {
            Some(value) => ExprKind::Integer(value),
            None => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.span,
                ))
            }
        },
        TokenKind::Real => match token.value.parse::<f64>() {
            Ok(value) => ExprKind::Real(value),
            Err(_) => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.span,
                ))
            }
        },
        TokenKind::Char => ExprKind::Char(token.value.bytes().next().unwrap_or(0)),
        TokenKind::String => ExprKind::String(token.value.clone()),
        TokenKind::True => ExprKind::Bool(true),
        TokenKind::False => ExprKind::Bool(false),
        TokenKind::Identifier => ExprKind::Identifier(token.value.clone()),
        _ => return Err(parser.unexpected()),
    };

    parser.advance();
    Ok(Expr::new(kind, token.span))
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus | TokenKind::PlusEquals => BinaryOp::Add,
        TokenKind::Dash | TokenKind::MinusEquals => BinaryOp::Sub,
        TokenKind::Star | TokenKind::StarEquals => BinaryOp::Mul,
        TokenKind::Slash | TokenKind::SlashEquals => BinaryOp::Div,
        TokenKind::Percent | TokenKind::PercentEquals => BinaryOp::Rem,
        TokenKind::Ampersand | TokenKind::AmpersandEquals => BinaryOp::BitAnd,
        TokenKind::Pipe | TokenKind::PipeEquals => BinaryOp::BitOr,
        TokenKind::Caret | TokenKind::CaretEquals => BinaryOp::BitXor,
        TokenKind::ShiftLeft | TokenKind::ShiftLeftEquals => BinaryOp::Shl,
        TokenKind::ShiftRight | TokenKind::ShiftRightEquals => BinaryOp::Shr,
        TokenKind::Equals => BinaryOp::Eq,
        TokenKind::NotEquals => BinaryOp::Ne,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::LessEquals => BinaryOp::Le,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::GreaterEquals => BinaryOp::Ge,
        TokenKind::And => BinaryOp::LogicalAnd,
        TokenKind::Or => BinaryOp::LogicalOr,
        _ => return None,
    })
}

pub fn parse_binary_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator_token = parser.current_token().clone();
    let op = binary_operator(operator_token.kind).ok_or_else(|| parser.unexpected())?;
    parser.advance();

    let right = parse_expr(parser, bp)?;
    let span = left.span.to(&right.span);

    Ok(Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    ))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let operand = parse_expr(parser, BindingPower::Unary)?;
    let span = operator_token.span.to(&operand.span);

    let kind = match operator_token.kind {
        TokenKind::Star => ExprKind::Deref(Box::new(operand)),
        TokenKind::Dash => ExprKind::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(operand),
        },
        TokenKind::Not => ExprKind::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        },
        TokenKind::Tilde => ExprKind::Unary {
            op: UnaryOp::BitNot,
            operand: Box::new(operand),
        },
        TokenKind::Ampersand => ExprKind::Unary {
            op: UnaryOp::AddressOf,
            operand: Box::new(operand),
        },
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: operator_token.value,
                },
                operator_token.span,
            ))
        }
    };

    Ok(Expr::new(kind, span))
}

pub fn parse_assignment_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let op = match operator_token.kind {
        TokenKind::Assignment => None,
        kind => binary_operator(kind),
    };

    // Right associative
    let value = parse_expr(parser, BindingPower::Default)?;
    let span = left.span.to(&value.span);

    Ok(Expr::new(
        ExprKind::Assign {
            op,
            target: Box::new(left),
            value: Box::new(value),
        },
        span,
    ))
}

pub fn parse_cast_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();
    let ty = parse_expr(parser, bp)?;
    let span = left.span.to(&ty.span);

    Ok(Expr::new(
        ExprKind::Cast {
            value: Box::new(left),
            ty: Box::new(ty),
        },
        span,
    ))
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parser.advance();
    let expr = parser.with_initializers(true, |parser| parse_expr(parser, BindingPower::Default))?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(expr)
}

pub fn parse_sizeof_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span;
    parser.expect(TokenKind::OpenParen)?;
    let operand = parser.with_initializers(true, |parser| parse_expr(parser, BindingPower::Default))?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(Expr::new(
        ExprKind::SizeOf(Box::new(operand)),
        start.to(&parser.previous_span()),
    ))
}

pub fn parse_call_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();

    let args = parser.with_initializers(true, |parser| {
        let mut args = vec![];

        while parser.current_token_kind() != TokenKind::CloseParen {
            args.push(parse_expr(parser, BindingPower::Default)?);

            if !parser.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    })?;

    parser.expect(TokenKind::CloseParen)?;
    let span = left.span.to(&parser.previous_span());

    Ok(Expr::new(
        ExprKind::Call {
            callee: Box::new(left),
            args,
        },
        span,
    ))
}

pub fn parse_index_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();
    let index = parser.with_initializers(true, |parser| parse_expr(parser, BindingPower::Default))?;
    parser.expect(TokenKind::CloseBracket)?;
    let span = left.span.to(&parser.previous_span());

    Ok(Expr::new(
        ExprKind::Index {
            object: Box::new(left),
            index: Box::new(index),
        },
        span,
    ))
}

pub fn parse_member_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();

    let error = parser.unexpected_detailed("expected member name after `.`");
    let member = parser.expect_error(TokenKind::Identifier, Some(error))?;
    let span = left.span.to(&member.span);

    Ok(Expr::new(
        ExprKind::Member {
            object: Box::new(left),
            member: member.value,
        },
        span,
    ))
}

fn parse_init_element(parser: &mut Parser) -> Result<InitElement, Error> {
    let start = parser.current_token().span.clone();

    let tag = match parser.current_token_kind() {
        TokenKind::OpenBracket => {
            parser.advance();
            let index = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::CloseBracket)?;
            parser.expect(TokenKind::Assignment)?;
            Some(InitTag::Index(index))
        }
        TokenKind::Dot => {
            parser.advance();
            let member = parser.expect(TokenKind::Identifier)?.value;
            parser.expect(TokenKind::Assignment)?;
            Some(InitTag::Member(member))
        }
        _ => None,
    };

    let value = parse_expr(parser, BindingPower::Default)?;

    Ok(InitElement {
        tag,
        span: start.to(&value.span),
        value,
    })
}

fn parse_init_elements(parser: &mut Parser) -> Result<Vec<InitElement>, Error> {
    parser.expect(TokenKind::OpenCurly)?;

    let elements = parser.with_initializers(true, |parser| {
        let mut elements = vec![];

        while parser.current_token_kind() != TokenKind::CloseCurly {
            elements.push(parse_init_element(parser)?);

            if !parser.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(elements)
    })?;

    parser.expect(TokenKind::CloseCurly)?;
    Ok(elements)
}

pub fn parse_initializer_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.current_token().span.clone();
    let elements = parse_init_elements(parser)?;

    Ok(Expr::new(
        ExprKind::Initializer { ty: None, elements },
        start.to(&parser.previous_span()),
    ))
}

pub fn parse_typed_initializer_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let elements = parse_init_elements(parser)?;
    let span = left.span.to(&parser.previous_span());

    Ok(Expr::new(
        ExprKind::Initializer {
            ty: Some(Box::new(left)),
            elements,
        },
        span,
    ))
}
