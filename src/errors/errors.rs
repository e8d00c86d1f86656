use std::fmt::Display;

use thiserror::Error;

use crate::{line_and_column, Span};

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    span: Span,
}

/// Broad category an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Resolution,
    Type,
    Constant,
    StaticUb,
    ControlFlow,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, span: Span) -> Self {
        Error {
            internal_error: error_impl,
            span,
        }
    }

    pub fn get_span(&self) -> &Span {
        &self.span
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn message(&self) -> String {
        self.internal_error.to_string()
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. }
            | ErrorImpl::UnexpectedToken { .. }
            | ErrorImpl::UnexpectedTokenDetailed { .. }
            | ErrorImpl::NumberParseError { .. } => ErrorKind::Syntax,
            ErrorImpl::UnknownIdentifier { .. }
            | ErrorImpl::NotARepresentation { .. }
            | ErrorImpl::NotAType { .. }
            | ErrorImpl::NotAValue { .. }
            | ErrorImpl::IncompleteType { .. }
            | ErrorImpl::Redefinition { .. }
            | ErrorImpl::TypeReconstruction { .. }
            | ErrorImpl::SynonymCycle { .. }
            | ErrorImpl::CyclicDefinition { .. }
            | ErrorImpl::DependencyFailed { .. } => ErrorKind::Resolution,
            ErrorImpl::TypeMismatch { .. }
            | ErrorImpl::ArgumentTypeMismatch { .. }
            | ErrorImpl::ArityMismatch { .. }
            | ErrorImpl::InvalidOperand { .. }
            | ErrorImpl::InvalidRecast { .. }
            | ErrorImpl::NotAddressable
            | ErrorImpl::NotCallable { .. }
            | ErrorImpl::NoSuchMember { .. }
            | ErrorImpl::DuplicateMember { .. }
            | ErrorImpl::FunctionMember { .. }
            | ErrorImpl::IndexOutOfBounds { .. }
            | ErrorImpl::UnionInitializer { .. }
            | ErrorImpl::InvalidInitializer { .. }
            | ErrorImpl::InvalidSizeOf { .. }
            | ErrorImpl::LiteralOutOfRange { .. }
            | ErrorImpl::NotAFunctionType { .. }
            | ErrorImpl::InvalidVariableType { .. } => ErrorKind::Type,
            ErrorImpl::NotConstant { .. }
            | ErrorImpl::InvalidArraySize { .. }
            | ErrorImpl::IndeterminateArraySize { .. }
            | ErrorImpl::TypeTooLarge { .. }
            | ErrorImpl::RelocatableConstant
            | ErrorImpl::NonConstantTag => ErrorKind::Constant,
            ErrorImpl::DivisionByZero
            | ErrorImpl::SignedOverflow { .. }
            | ErrorImpl::ShiftOverflow { .. } => ErrorKind::StaticUb,
            ErrorImpl::BreakOutsideLoop
            | ErrorImpl::ContinueOutsideLoop
            | ErrorImpl::MissingReturn { .. }
            | ErrorImpl::ReturnMismatch { .. } => ErrorKind::ControlFlow,
        }
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::UnknownIdentifier { .. } => "UnknownIdentifier",
            ErrorImpl::NotARepresentation { .. } => "NotARepresentation",
            ErrorImpl::NotAType { .. } => "NotAType",
            ErrorImpl::NotAValue { .. } => "NotAValue",
            ErrorImpl::IncompleteType { .. } => "IncompleteType",
            ErrorImpl::Redefinition { .. } => "Redefinition",
            ErrorImpl::TypeReconstruction { .. } => "TypeReconstruction",
            ErrorImpl::SynonymCycle { .. } => "SynonymCycle",
            ErrorImpl::CyclicDefinition { .. } => "CyclicDefinition",
            ErrorImpl::DependencyFailed { .. } => "DependencyFailed",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::ArgumentTypeMismatch { .. } => "ArgumentTypeMismatch",
            ErrorImpl::ArityMismatch { .. } => "ArityMismatch",
            ErrorImpl::InvalidOperand { .. } => "InvalidOperand",
            ErrorImpl::InvalidRecast { .. } => "InvalidRecast",
            ErrorImpl::NotAddressable => "NotAddressable",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::NoSuchMember { .. } => "NoSuchMember",
            ErrorImpl::DuplicateMember { .. } => "DuplicateMember",
            ErrorImpl::FunctionMember { .. } => "FunctionMember",
            ErrorImpl::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            ErrorImpl::UnionInitializer { .. } => "UnionInitializer",
            ErrorImpl::InvalidInitializer { .. } => "InvalidInitializer",
            ErrorImpl::InvalidSizeOf { .. } => "InvalidSizeOf",
            ErrorImpl::LiteralOutOfRange { .. } => "LiteralOutOfRange",
            ErrorImpl::NotAFunctionType { .. } => "NotAFunctionType",
            ErrorImpl::InvalidVariableType { .. } => "InvalidVariableType",
            ErrorImpl::NotConstant { .. } => "NotConstant",
            ErrorImpl::InvalidArraySize { .. } => "InvalidArraySize",
            ErrorImpl::IndeterminateArraySize { .. } => "IndeterminateArraySize",
            ErrorImpl::TypeTooLarge { .. } => "TypeTooLarge",
            ErrorImpl::RelocatableConstant => "RelocatableConstant",
            ErrorImpl::NonConstantTag => "NonConstantTag",
            ErrorImpl::DivisionByZero => "DivisionByZero",
            ErrorImpl::SignedOverflow { .. } => "SignedOverflow",
            ErrorImpl::ShiftOverflow { .. } => "ShiftOverflow",
            ErrorImpl::BreakOutsideLoop => "BreakOutsideLoop",
            ErrorImpl::ContinueOutsideLoop => "ContinueOutsideLoop",
            ErrorImpl::MissingReturn { .. } => "MissingReturn",
            ErrorImpl::ReturnMismatch { .. } => "ReturnMismatch",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a semicolon?",
                token
            )),
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::IncompleteType { type_ } => ErrorTip::Suggestion(format!(
                "`{}` is still being defined here, refer to it through a pointer",
                type_
            )),
            ErrorImpl::TypeMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Use `as {}` to convert a `{}` explicitly",
                expected, received
            )),
            ErrorImpl::NotAddressable => ErrorTip::Suggestion(String::from(
                "Store the value in a variable first",
            )),
            ErrorImpl::MissingReturn { function } => ErrorTip::Suggestion(format!(
                "Add a `return` at the end of `{}`",
                function
            )),
            _ => ErrorTip::None,
        }
    }

    /// Renders the error as `file:line:col[-line:col] message`.
    pub fn render(&self, source: &str) -> String {
        let (start_line, start_col) = line_and_column(source, self.span.start.0);
        let (end_line, end_col) = line_and_column(source, self.span.end.0);
        let file = &self.span.start.1;

        if (start_line, start_col) == (end_line, end_col) || self.span.end.0 <= self.span.start.0 {
            format!("{}:{}:{} {}", file, start_line, start_col, self.message())
        } else {
            format!(
                "{}:{}:{}-{}:{} {}",
                file,
                start_line,
                start_col,
                end_line,
                end_col,
                self.message()
            )
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    // Lexing and parsing
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },

    // Resolution
    #[error("unknown identifier `{name}`")]
    UnknownIdentifier { name: String },
    #[error("`{name}` is not a representation and cannot appear in a constant expression")]
    NotARepresentation { name: String },
    #[error("`{name}` does not name a type")]
    NotAType { name: String },
    #[error("`{name}` names a type, not a value")]
    NotAValue { name: String },
    #[error("incomplete type `{type_}` used where a complete type is required")]
    IncompleteType { type_: String },
    #[error("`{name}` is already defined")]
    Redefinition { name: String },
    #[error("type `{type_}` has already been constructed")]
    TypeReconstruction { type_: String },
    #[error("synonym chain starting at `{name}` never reaches a type")]
    SynonymCycle { name: String },
    #[error("definition of `{name}` depends on itself")]
    CyclicDefinition { name: String },
    #[error("`{name}` failed to resolve earlier")]
    DependencyFailed { name: String },

    // Typing
    #[error("types do not match: expected `{expected}`, received `{received}`")]
    TypeMismatch { expected: String, received: String },
    #[error("argument {index} has the wrong type: expected `{expected}`, received `{received}`")]
    ArgumentTypeMismatch {
        index: usize,
        expected: String,
        received: String,
    },
    #[error("expected {expected} arguments, received {received}")]
    ArityMismatch { expected: usize, received: usize },
    #[error("operator `{operator}` cannot be applied to `{type_}`")]
    InvalidOperand { operator: String, type_: String },
    #[error("cannot recast `{from}` to `{to}`")]
    InvalidRecast { from: String, to: String },
    #[error("expression is not addressable")]
    NotAddressable,
    #[error("`{type_}` is not callable")]
    NotCallable { type_: String },
    #[error("`{type_}` has no member `{member}`")]
    NoSuchMember { type_: String, member: String },
    #[error("member `{member}` is declared twice")]
    DuplicateMember { member: String },
    #[error("member `{member}` has function type, use a pointer to a function instead")]
    FunctionMember { member: String },
    #[error("index {index} is out of bounds for `{type_}`")]
    IndexOutOfBounds { index: i128, type_: String },
    #[error("union initializers take exactly one element, received {count}")]
    UnionInitializer { count: usize },
    #[error("cannot initialize `{type_}` with a braced initializer")]
    InvalidInitializer { type_: String },
    #[error("cannot take the size of `{type_}`")]
    InvalidSizeOf { type_: String },
    #[error("literal {value} does not fit in `{type_}`")]
    LiteralOutOfRange { value: String, type_: String },
    #[error("`{type_}` is not a function type")]
    NotAFunctionType { type_: String },
    #[error("a variable cannot have type `{type_}`")]
    InvalidVariableType { type_: String },

    // Constant evaluation
    #[error("{what} is not a compile-time constant")]
    NotConstant { what: String },
    #[error("array size must be positive, found {size}")]
    InvalidArraySize { size: i128 },
    #[error("array size is indeterminate: it contains {reason}")]
    IndeterminateArraySize { reason: String },
    #[error("{what} is too large: its size does not fit in 64 bits")]
    TypeTooLarge { what: String },
    #[error("constant depends on a relocation and cannot be used here")]
    RelocatableConstant,
    #[error("initializer tag is not a constant")]
    NonConstantTag,

    // Static undefined behaviour
    #[error("division by zero")]
    DivisionByZero,
    #[error("signed overflow in constant `{operator}`")]
    SignedOverflow { operator: String },
    #[error("shift amount {amount} is too large for `{type_}`")]
    ShiftOverflow { amount: i128, type_: String },

    // Control flow
    #[error("`break` outside of a loop")]
    BreakOutsideLoop,
    #[error("`continue` outside of a loop")]
    ContinueOutsideLoop,
    #[error("function `{function}` does not always return a value")]
    MissingReturn { function: String },
    #[error("return type mismatch: expected `{expected}`, received `{received}`")]
    ReturnMismatch { expected: String, received: String },
}
