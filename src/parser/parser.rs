//! Parser state and the top-level item grammar.
//!
//! Expressions use a Pratt parser: NUD handlers for prefix positions, LED
//! handlers for infix/postfix positions, and a binding power per LED token.
//! Statements dispatch on their leading token.

use std::{collections::HashMap, rc::Rc};

use tracing::debug;

use crate::{
    ast::{
        ast::{Declaration, Definition, DefinitionBody, Module, Representation},
        expressions::Expr,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    Span,
};

use super::{
    expr::parse_expr,
    lookups::{
        create_token_lookups, BPLookup, BindingPower, LEDHandler, LEDLookup, NUDHandler, NUDLookup,
        StmtHandler, StmtLookup,
    },
    stmt::parse_block,
};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: Rc<String>,
    stmt_lookup: StmtLookup,
    nud_lookup: NUDLookup,
    led_lookup: LEDLookup,
    binding_power_lookup: BPLookup,
    /// When set, `{` does not continue an expression as a typed initializer.
    /// Used where a block follows an expression: conditions and the type of
    /// a function definition.
    no_initializer: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: Rc<String>) -> Self {
        Parser {
            tokens,
            pos: 0,
            file,
            stmt_lookup: HashMap::new(),
            nud_lookup: HashMap::new(),
            led_lookup: HashMap::new(),
            binding_power_lookup: HashMap::new(),
            no_initializer: false,
        }
    }

    /// Returns the current token without advancing. The stream always ends
    /// in EOF, which is never consumed.
    pub fn current_token(&self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub fn current_token_kind(&self) -> TokenKind {
        self.current_token().kind
    }

    pub fn peek_kind(&self, offset: usize) -> TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[index].kind
    }

    /// Advances to the next token and returns the previous token.
    pub fn advance(&mut self) -> Token {
        let token = self.current_token().clone();
        if token.kind != TokenKind::EOF {
            self.pos += 1;
        }
        token
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> Span {
        let index = self.pos.saturating_sub(1).min(self.tokens.len() - 1);
        self.tokens[index].span.clone()
    }

    pub fn unexpected(&self) -> Error {
        let token = self.current_token();
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: token.value.clone(),
            },
            token.span.clone(),
        )
    }

    pub fn unexpected_detailed(&self, message: &str) -> Error {
        let token = self.current_token();
        Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: token.value.clone(),
                message: message.to_string(),
            },
            token.span.clone(),
        )
    }

    pub fn expect_error(&mut self, expected_kind: TokenKind, error: Option<Error>) -> Result<Token, Error> {
        if self.current_token_kind() != expected_kind {
            Err(error.unwrap_or_else(|| self.unexpected()))
        } else {
            Ok(self.advance())
        }
    }

    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        self.expect_error(expected_kind, None)
    }

    /// Consumes the current token if it is of the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.current_token_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EOF
    }

    pub fn get_stmt_lookup(&self) -> &StmtLookup {
        &self.stmt_lookup
    }

    pub fn get_nud_lookup(&self) -> &NUDLookup {
        &self.nud_lookup
    }

    pub fn get_led_lookup(&self) -> &LEDLookup {
        &self.led_lookup
    }

    /// Binding power of the current token in infix position.
    pub fn current_binding_power(&self) -> BindingPower {
        let kind = self.current_token_kind();
        if self.no_initializer && kind == TokenKind::OpenCurly {
            return BindingPower::Default;
        }

        self.binding_power_lookup
            .get(&kind)
            .copied()
            .unwrap_or(BindingPower::Default)
    }

    pub fn led(&mut self, kind: TokenKind, binding_power: BindingPower, led_fn: LEDHandler) {
        self.binding_power_lookup.insert(kind, binding_power);
        self.led_lookup.insert(kind, led_fn);
    }

    pub fn nud(&mut self, kind: TokenKind, nud_fn: NUDHandler) {
        self.nud_lookup.insert(kind, nud_fn);
    }

    pub fn stmt(&mut self, kind: TokenKind, stmt_fn: StmtHandler) {
        self.stmt_lookup.insert(kind, stmt_fn);
    }

    /// Runs `parse` with typed initializers enabled or disabled, restoring
    /// the previous setting afterwards.
    pub fn with_initializers<T>(
        &mut self,
        allowed: bool,
        parse: impl FnOnce(&mut Parser) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let saved = self.no_initializer;
        self.no_initializer = !allowed;
        let result = parse(self);
        self.no_initializer = saved;
        result
    }

    pub fn file(&self) -> &Rc<String> {
        &self.file
    }
}

/// Parses a stream of tokens into a module of top-level items.
pub fn parse(tokens: Vec<Token>, file: Rc<String>) -> Result<Module, Error> {
    let mut parser = Parser::new(tokens, Rc::clone(&file));
    create_token_lookups(&mut parser);

    let mut module = Module::new(file);

    while parser.has_tokens() {
        parse_item(&mut parser, &mut module)?;
    }

    debug!(items = module.len(), "parsed module");
    Ok(module)
}

fn parse_item(parser: &mut Parser, module: &mut Module) -> Result<(), Error> {
    let start = parser.current_token().span.clone();
    let private = parser.eat(TokenKind::Private);

    let error = parser.unexpected_detailed("expected item name");
    let name = parser.expect_error(TokenKind::Identifier, Some(error))?.value;

    match parser.current_token_kind() {
        TokenKind::ColonColon if !private => {
            parser.advance();
            let value = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::Semicolon)?;

            module.add_representation(Representation {
                name,
                value,
                span: start.to(&parser.previous_span()),
            })
        }
        TokenKind::ColonEquals => {
            parser.advance();
            let value = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::Semicolon)?;

            module.add_definition(Definition {
                name,
                private,
                ty: None,
                body: DefinitionBody::Variable(Some(value)),
                span: start.to(&parser.previous_span()),
            })
        }
        TokenKind::Colon => {
            parser.advance();
            let ty = parse_annotation(parser, false)?;
            parse_typed_item(parser, module, start, name, private, ty)
        }
        _ => Err(parser.unexpected_detailed("expected `::`, `:=` or `:` after item name")),
    }
}

fn parse_typed_item(
    parser: &mut Parser,
    module: &mut Module,
    start: Span,
    name: String,
    private: bool,
    ty: Expr,
) -> Result<(), Error> {
    match parser.current_token_kind() {
        TokenKind::OpenCurly => {
            let body = parse_block(parser)?;

            module.add_definition(Definition {
                name,
                private,
                ty: Some(ty),
                body: DefinitionBody::Function(body),
                span: start.to(&parser.previous_span()),
            })
        }
        TokenKind::Assignment => {
            parser.advance();
            let value = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::Semicolon)?;

            module.add_definition(Definition {
                name,
                private,
                ty: Some(ty),
                body: DefinitionBody::Variable(Some(value)),
                span: start.to(&parser.previous_span()),
            })
        }
        TokenKind::Semicolon if private => {
            parser.advance();

            module.add_definition(Definition {
                name,
                private,
                ty: Some(ty),
                body: DefinitionBody::Variable(None),
                span: start.to(&parser.previous_span()),
            })
        }
        TokenKind::Semicolon => {
            parser.advance();

            module.add_declaration(Declaration {
                name,
                ty,
                span: start.to(&parser.previous_span()),
            })
        }
        _ => Err(parser.unexpected()),
    }
}

/// Parses a type annotation. It stops before `=` so the annotation can be
/// followed by an initial value, and before `{` so it can be followed by a
/// body.
pub fn parse_annotation(parser: &mut Parser, initializers: bool) -> Result<Expr, Error> {
    parser.with_initializers(initializers, |parser| {
        parse_expr(parser, BindingPower::Assignment)
    })
}
