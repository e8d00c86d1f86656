//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorKind, ErrorTip};
use crate::{Position, Span};
use std::rc::Rc;

fn span(start: u32, end: u32) -> Span {
    let file = Rc::new("test.em".to_string());
    Span {
        start: Position(start, Rc::clone(&file)),
        end: Position(end, file),
    }
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        span(10, 11),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.kind(), ErrorKind::Syntax);
}

#[test]
fn test_error_span() {
    let error = Error::new(ErrorImpl::DivisionByZero, span(42, 47));

    assert_eq!(error.get_span().start.0, 42);
    assert_eq!(error.get_span().end.0, 47);
}

#[test]
fn test_error_categories() {
    let cases = [
        (
            ErrorImpl::UnknownIdentifier {
                name: "foo".to_string(),
            },
            ErrorKind::Resolution,
        ),
        (
            ErrorImpl::TypeMismatch {
                expected: "int32".to_string(),
                received: "int64".to_string(),
            },
            ErrorKind::Type,
        ),
        (ErrorImpl::InvalidArraySize { size: 0 }, ErrorKind::Constant),
        (ErrorImpl::DivisionByZero, ErrorKind::StaticUb),
        (
            ErrorImpl::SignedOverflow {
                operator: "/".to_string(),
            },
            ErrorKind::StaticUb,
        ),
        (ErrorImpl::BreakOutsideLoop, ErrorKind::ControlFlow),
        (
            ErrorImpl::MissingReturn {
                function: "f".to_string(),
            },
            ErrorKind::ControlFlow,
        ),
    ];

    for (error_impl, kind) in cases {
        assert_eq!(Error::new(error_impl, span(0, 0)).kind(), kind);
    }
}

#[test]
fn test_render_single_position() {
    let source = "x := 1;\ny := 5 / 0;\n";
    let error = Error::new(ErrorImpl::DivisionByZero, span(13, 13));

    assert_eq!(error.render(source), "test.em:2:6 division by zero");
}

#[test]
fn test_render_range() {
    let source = "x := 1;\ny := 5 / 0;\n";
    let error = Error::new(ErrorImpl::DivisionByZero, span(13, 18));

    assert_eq!(error.render(source), "test.em:2:6-2:11 division by zero");
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        span(0, 0),
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_suggestion() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "}".to_string(),
        },
        span(0, 0),
    );

    match error.get_tip() {
        ErrorTip::Suggestion(_) => (),
        _ => panic!("Expected suggestion tip"),
    }
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_message_uses_display() {
    let error = Error::new(
        ErrorImpl::ArityMismatch {
            expected: 2,
            received: 3,
        },
        span(0, 0),
    );

    assert_eq!(error.message(), "expected 2 arguments, received 3");
    assert_eq!(error.to_string(), error.message());
}
