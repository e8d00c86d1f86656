//! Basic-block IR handed to code emission.
//!
//! A [`Module`] holds global variables, external symbols and functions.
//! Every function is a list of blocks; every block ends in exactly one
//! [`Terminator`]. Values are either temporaries defined once by an
//! instruction, incoming parameters or constants.

use crate::types::types::{TypeId, TypeTable};

/// Where an instance lives and who can see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    /// An alias for storage owned elsewhere: by-reference parameters,
    /// dereferenced pointers and sub-objects.
    Reference,
    /// Declared here, defined in another module.
    External,
    /// Module-level definition visible to other modules.
    Internal,
    /// Module-lifetime storage with function scope.
    Static,
    /// Function-local stack storage.
    Local,
    /// Module-level definition or temporary visible only here.
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// An integer, or an integer-valued pointer. Normalized to the range of
    /// its type.
    Int { value: i128, ty: TypeId },
    Real { value: f64, ty: TypeId },
    Bool(bool),
    /// Address of a NUL-terminated byte string.
    String(Vec<u8>),
    Zero(TypeId),
    /// Array or struct, one constant per element.
    Aggregate { ty: TypeId, elements: Vec<Constant> },
    Union { ty: TypeId, member: usize, value: Box<Constant> },
    /// Address of a symbol plus a byte offset.
    Address { symbol: String, offset: u64, ty: TypeId },
}

impl Constant {
    /// Whether the value is only known after linking.
    pub fn is_relocatable(&self) -> bool {
        match self {
            Constant::String(_) | Constant::Address { .. } => true,
            Constant::Aggregate { elements, .. } => elements.iter().any(Constant::is_relocatable),
            Constant::Union { value, .. } => value.is_relocatable(),
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Constant::Int { value, .. } => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Temp(Temp),
    Param(u32),
    Const(Constant),
}

impl Operand {
    pub fn as_const(&self) -> Option<&Constant> {
        match self {
            Operand::Const(constant) => Some(constant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Trunc,
    ZeroExtend,
    SignExtend,
    FloatTrunc,
    FloatExtend,
    SignedToFloat,
    UnsignedToFloat,
    FloatToSigned,
    FloatToUnsigned,
    PtrToInt,
    IntToPtr,
    Bitcast,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Stack slot. Always placed at the head of the entry block.
    Alloca { dest: Temp, ty: TypeId },
    Load { dest: Temp, ty: TypeId, addr: Operand },
    Store { ty: TypeId, addr: Operand, value: Operand },
    /// Loads `size` bytes of an aggregate as one unsigned integer.
    LoadBits { dest: Temp, size: u64, addr: Operand },
    StoreBits { size: u64, addr: Operand, value: Operand },
    Copy { dest: Operand, src: Operand, size: u64 },
    Zero { addr: Operand, size: u64 },
    /// Signedness of division, remainder and right shift follows `ty`.
    Binary { dest: Temp, op: ArithOp, ty: TypeId, lhs: Operand, rhs: Operand },
    Compare { dest: Temp, op: CompareOp, ty: TypeId, lhs: Operand, rhs: Operand },
    Unary { dest: Temp, op: UnaryOp, ty: TypeId, operand: Operand },
    Cast { dest: Temp, kind: CastKind, from: TypeId, to: TypeId, value: Operand },
    /// `base + offset` bytes.
    Offset { dest: Temp, base: Operand, offset: u64 },
    /// `base + index * stride` bytes.
    Element { dest: Temp, base: Operand, index: Operand, stride: u64 },
    Call { dest: Option<Temp>, callee: Operand, ty: TypeId, args: Vec<Operand> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Jump(BlockId),
    Branch { cond: Operand, then: BlockId, otherwise: BlockId },
    Return(Option<Operand>),
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch { then, otherwise, .. } => vec![*then, *otherwise],
            Terminator::Return(_) => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub label: String,
    pub instrs: Vec<Instr>,
    pub terminator: Option<Terminator>,
}

/// How a parameter crosses the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    /// Address of the caller's object.
    ByReference,
    /// The value itself; aggregates travel as raw bits.
    Direct,
    /// Address of a private copy made by the caller.
    Indirect,
    /// Hidden first parameter: where an indirect result is written.
    ReturnSlot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
    pub class: ParamClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ty: TypeId,
    pub storage: StorageClass,
    pub params: Vec<Param>,
    pub blocks: Vec<Block>,
    pub temps: u32,
}

impl Function {
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn block_by_label(&self, label: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.label == label)
    }

    pub fn entry(&self) -> &Block {
        &self.blocks[0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: TypeId,
    pub storage: StorageClass,
    pub init: Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct External {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug)]
pub struct Module {
    pub types: TypeTable,
    pub globals: Vec<Global>,
    pub externals: Vec<External>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|global| global.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn external(&self, name: &str) -> Option<&External> {
        self.externals.iter().find(|external| external.name == name)
    }
}
