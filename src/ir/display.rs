//! Deterministic textual dump of a module.
//!
//! ```text
//! global @y: int64 internal = 8
//! extern @puts: func(s: *uint8) -> int32
//!
//! func @main() -> int32 internal {
//! entry.0:
//!   %0 = alloca int32
//!   ret 0
//! }
//! ```

use std::fmt::{Display, Formatter, Result};

use crate::types::types::TypeTable;

use super::ir::{
    ArithOp, Block, BlockId, CastKind, CompareOp, Constant, Function, Instr, Module, Operand, ParamClass,
    StorageClass, Terminator, UnaryOp,
};

struct Ctx<'a, T> {
    types: &'a TypeTable,
    item: &'a T,
}

fn storage(storage: StorageClass) -> &'static str {
    match storage {
        StorageClass::Reference => "reference",
        StorageClass::External => "external",
        StorageClass::Internal => "internal",
        StorageClass::Static => "static",
        StorageClass::Local => "local",
        StorageClass::Private => "private",
    }
}

fn arith(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "add",
        ArithOp::Sub => "sub",
        ArithOp::Mul => "mul",
        ArithOp::Div => "div",
        ArithOp::Rem => "rem",
        ArithOp::And => "and",
        ArithOp::Or => "or",
        ArithOp::Xor => "xor",
        ArithOp::Shl => "shl",
        ArithOp::Shr => "shr",
    }
}

fn compare(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "eq",
        CompareOp::Ne => "ne",
        CompareOp::Lt => "lt",
        CompareOp::Le => "le",
        CompareOp::Gt => "gt",
        CompareOp::Ge => "ge",
    }
}

fn cast(kind: CastKind) -> &'static str {
    match kind {
        CastKind::Trunc => "trunc",
        CastKind::ZeroExtend => "zext",
        CastKind::SignExtend => "sext",
        CastKind::FloatTrunc => "fptrunc",
        CastKind::FloatExtend => "fpext",
        CastKind::SignedToFloat => "sitofp",
        CastKind::UnsignedToFloat => "uitofp",
        CastKind::FloatToSigned => "fptosi",
        CastKind::FloatToUnsigned => "fptoui",
        CastKind::PtrToInt => "ptrtoint",
        CastKind::IntToPtr => "inttoptr",
        CastKind::Bitcast => "bitcast",
    }
}

pub fn constant(types: &TypeTable, value: &Constant) -> String {
    match value {
        Constant::Int { value, .. } => value.to_string(),
        Constant::Real { value, .. } => format!("{:?}", value),
        Constant::Bool(value) => value.to_string(),
        Constant::String(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        Constant::Zero(ty) => format!("zeroinit {}", types.name(*ty)),
        Constant::Aggregate { elements, .. } => {
            let elements: Vec<String> = elements.iter().map(|element| constant(types, element)).collect();
            format!("{{{}}}", elements.join(", "))
        }
        Constant::Union { member, value, .. } => format!("{{#{} = {}}}", member, constant(types, value)),
        Constant::Address { symbol, offset: 0, .. } => format!("@{}", symbol),
        Constant::Address { symbol, offset, .. } => format!("@{}+{}", symbol, offset),
    }
}

pub fn operand(types: &TypeTable, value: &Operand) -> String {
    match value {
        Operand::Temp(temp) => format!("%{}", temp.0),
        Operand::Param(index) => format!("%arg{}", index),
        Operand::Const(value) => constant(types, value),
    }
}

fn label(function: &Function, id: BlockId) -> String {
    match function.block(id) {
        Some(block) => format!("{}.{}", block.label, id.0),
        None => format!("?.{}", id.0),
    }
}

fn instr(types: &TypeTable, instr: &Instr) -> String {
    let op = |value: &Operand| operand(types, value);
    let ty = |id| types.name(id);

    match instr {
        Instr::Alloca { dest, ty: t } => format!("%{} = alloca {}", dest.0, ty(*t)),
        Instr::Load { dest, ty: t, addr } => format!("%{} = load {} {}", dest.0, ty(*t), op(addr)),
        Instr::Store { ty: t, addr, value } => format!("store {} {}, {}", ty(*t), op(value), op(addr)),
        Instr::LoadBits { dest, size, addr } => format!("%{} = loadbits {} {}", dest.0, size, op(addr)),
        Instr::StoreBits { size, addr, value } => format!("storebits {} {}, {}", size, op(value), op(addr)),
        Instr::Copy { dest, src, size } => format!("copy {} {} -> {}", size, op(src), op(dest)),
        Instr::Zero { addr, size } => format!("zero {} {}", size, op(addr)),
        Instr::Binary {
            dest,
            op: o,
            ty: t,
            lhs,
            rhs,
        } => format!("%{} = {} {} {}, {}", dest.0, arith(*o), ty(*t), op(lhs), op(rhs)),
        Instr::Compare {
            dest,
            op: o,
            ty: t,
            lhs,
            rhs,
        } => format!("%{} = cmp {} {} {}, {}", dest.0, compare(*o), ty(*t), op(lhs), op(rhs)),
        Instr::Unary {
            dest,
            op: o,
            ty: t,
            operand: value,
        } => {
            let name = match o {
                UnaryOp::Neg => "neg",
                UnaryOp::Not => "not",
            };
            format!("%{} = {} {} {}", dest.0, name, ty(*t), op(value))
        }
        Instr::Cast {
            dest,
            kind,
            from,
            to,
            value,
        } => format!("%{} = {} {} {} to {}", dest.0, cast(*kind), ty(*from), op(value), ty(*to)),
        Instr::Offset { dest, base, offset } => format!("%{} = offset {}, {}", dest.0, op(base), offset),
        Instr::Element {
            dest,
            base,
            index,
            stride,
        } => format!("%{} = element {}, {} * {}", dest.0, op(base), op(index), stride),
        Instr::Call { dest, callee, args, .. } => {
            let args: Vec<String> = args.iter().map(op).collect();
            match dest {
                Some(dest) => format!("%{} = call {}({})", dest.0, op(callee), args.join(", ")),
                None => format!("call {}({})", op(callee), args.join(", ")),
            }
        }
    }
}

fn block(f: &mut Formatter<'_>, types: &TypeTable, function: &Function, block: &Block) -> Result {
    writeln!(f, "{}:", label(function, block.id))?;

    for item in &block.instrs {
        writeln!(f, "  {}", instr(types, item))?;
    }

    match &block.terminator {
        Some(Terminator::Jump(target)) => writeln!(f, "  jump {}", label(function, *target)),
        Some(Terminator::Branch {
            cond,
            then,
            otherwise,
        }) => writeln!(
            f,
            "  br {}, {}, {}",
            operand(types, cond),
            label(function, *then),
            label(function, *otherwise)
        ),
        Some(Terminator::Return(Some(value))) => writeln!(f, "  ret {}", operand(types, value)),
        Some(Terminator::Return(None)) => writeln!(f, "  ret"),
        None => writeln!(f, "  <open>"),
    }
}

impl Display for Ctx<'_, Function> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let function = self.item;
        let params: Vec<String> = function
            .params
            .iter()
            .map(|param| {
                let class = match param.class {
                    ParamClass::ByReference => "ref",
                    ParamClass::Direct => "direct",
                    ParamClass::Indirect => "indirect",
                    ParamClass::ReturnSlot => "sret",
                };
                format!("{}: {} {}", param.name, self.types.name(param.ty), class)
            })
            .collect();

        let ret = match self.types.function_parts(function.ty) {
            Some((_, ret)) => self.types.name(ret),
            None => String::from("?"),
        };

        writeln!(
            f,
            "func @{}({}) -> {} {} {{",
            function.name,
            params.join(", "),
            ret,
            storage(function.storage)
        )?;

        for item in &function.blocks {
            block(f, self.types, function, item)?;
        }

        writeln!(f, "}}")
    }
}

/// Renders one function against the module's type table.
pub fn function(types: &TypeTable, function: &Function) -> String {
    Ctx { types, item: function }.to_string()
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for global in &self.globals {
            writeln!(
                f,
                "global @{}: {} {} = {}",
                global.name,
                self.types.name(global.ty),
                storage(global.storage),
                constant(&self.types, &global.init)
            )?;
        }

        for external in &self.externals {
            writeln!(f, "extern @{}: {}", external.name, self.types.name(external.ty))?;
        }

        for item in &self.functions {
            writeln!(f)?;
            write!(f, "{}", Ctx { types: &self.types, item })?;
        }

        Ok(())
    }
}
