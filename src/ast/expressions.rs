//! Expression nodes.
//!
//! Type constructors are expressions too: `*T`, `[N]T`, `struct(...)`,
//! `union(...)` and `func(...)` share this tree with value expressions so a
//! representation can bind either kind. Which one a node denotes is decided
//! during lowering.

use std::fmt::Display;

use crate::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    BitNot,
    AddressOf,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::AddressOf => "&",
        };
        write!(f, "{}", symbol)
    }
}

/// A named member of a struct, union or function parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Expr,
    pub by_ref: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitTag {
    Index(Expr),
    Member(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitElement {
    pub tag: Option<InitTag>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Integer(i128),
    Real(f64),
    Bool(bool),
    Char(u8),
    String(String),
    Identifier(String),

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `*e`: a dereference, or a pointer type in type position.
    Deref(Box<Expr>),
    Member {
        object: Box<Expr>,
        member: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Cast {
        value: Box<Expr>,
        ty: Box<Expr>,
    },
    SizeOf(Box<Expr>),
    Initializer {
        ty: Option<Box<Expr>>,
        elements: Vec<InitElement>,
    },

    ArrayType {
        size: Box<Expr>,
        element: Box<Expr>,
    },
    StructType {
        members: Vec<Field>,
        packed: bool,
    },
    UnionType {
        members: Vec<Field>,
    },
    FunctionType {
        params: Vec<Field>,
        ret: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this node can only denote a type.
    pub fn is_type_constructor(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::ArrayType { .. }
                | ExprKind::StructType { .. }
                | ExprKind::UnionType { .. }
                | ExprKind::FunctionType { .. }
        )
    }

    /// Calls `visit` on every direct child expression.
    pub fn for_each_child<'a>(&'a self, mut visit: impl FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Integer(_)
            | ExprKind::Real(_)
            | ExprKind::Bool(_)
            | ExprKind::Char(_)
            | ExprKind::String(_)
            | ExprKind::Identifier(_) => {}
            ExprKind::Binary { left, right, .. } => {
                visit(left);
                visit(right);
            }
            ExprKind::Assign { target, value, .. } => {
                visit(target);
                visit(value);
            }
            ExprKind::Unary { operand, .. } => visit(operand),
            ExprKind::Deref(inner) | ExprKind::SizeOf(inner) => visit(inner),
            ExprKind::Member { object, .. } => visit(object),
            ExprKind::Index { object, index } => {
                visit(object);
                visit(index);
            }
            ExprKind::Call { callee, args } => {
                visit(callee);
                args.iter().for_each(visit);
            }
            ExprKind::Cast { value, ty } => {
                visit(value);
                visit(ty);
            }
            ExprKind::Initializer { ty, elements } => {
                if let Some(ty) = ty {
                    visit(ty);
                }
                for element in elements {
                    if let Some(InitTag::Index(index)) = &element.tag {
                        visit(index);
                    }
                    visit(&element.value);
                }
            }
            ExprKind::ArrayType { size, element } => {
                visit(size);
                visit(element);
            }
            ExprKind::StructType { members, .. }
            | ExprKind::UnionType { members }
            | ExprKind::FunctionType {
                params: members,
                ret: None,
            } => members.iter().for_each(|member| visit(&member.ty)),
            ExprKind::FunctionType {
                params,
                ret: Some(ret),
            } => {
                params.iter().for_each(|param| visit(&param.ty));
                visit(ret);
            }
        }
    }
}
