//! Compile-time arithmetic.
//!
//! Integer constants are carried as `i128` normalized to the range of their
//! type, so every operation on two 64-bit operands can be computed exactly
//! and then checked or wrapped. Signed overflow is an error; unsigned
//! arithmetic wraps.

use crate::{
    ast::expressions::BinaryOp,
    errors::errors::ErrorImpl,
    ir::ir::Constant,
    types::types::{TypeId, TypeTable},
};

/// Inclusive value range of an integer type.
pub fn range(bits: u32, signed: bool) -> (i128, i128) {
    if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    }
}

pub fn fits(value: i128, bits: u32, signed: bool) -> bool {
    let (min, max) = range(bits, signed);
    (min..=max).contains(&value)
}

/// Wraps `value` into the range of the type, two's complement.
pub fn normalize(value: i128, bits: u32, signed: bool) -> i128 {
    let mask = (1i128 << bits) - 1;
    let bits_value = value & mask;

    if signed && (bits_value >> (bits - 1)) & 1 == 1 {
        bits_value - (1i128 << bits)
    } else {
        bits_value
    }
}

/// Reinterprets a normalized value as `from_bits` raw bits and sign-extends
/// it.
pub fn sign_extend(value: i128, from_bits: u32) -> i128 {
    normalize(value, from_bits, true)
}

pub fn zero_extend(value: i128, from_bits: u32) -> i128 {
    normalize(value, from_bits, false)
}

/// Rejects a constant zero divisor, whatever the dividend is.
pub fn check_divisor(op: BinaryOp, divisor: Option<i128>) -> Result<(), ErrorImpl> {
    match (op, divisor) {
        (BinaryOp::Div | BinaryOp::Rem, Some(0)) => Err(ErrorImpl::DivisionByZero),
        _ => Ok(()),
    }
}

/// Rejects a constant shift amount outside `0..bits`.
pub fn check_shift(op: BinaryOp, amount: Option<i128>, bits: u32, type_: &str) -> Result<(), ErrorImpl> {
    match (op, amount) {
        (BinaryOp::Shl | BinaryOp::Shr, Some(amount)) if amount < 0 || amount >= bits as i128 => {
            Err(ErrorImpl::ShiftOverflow {
                amount,
                type_: type_.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Folds an arithmetic, bitwise or shift operator over two normalized
/// integers of the same type.
pub fn fold_int(op: BinaryOp, a: i128, b: i128, bits: u32, signed: bool, type_: &str) -> Result<i128, ErrorImpl> {
    let overflow = || ErrorImpl::SignedOverflow {
        operator: op.symbol().to_string(),
    };

    check_divisor(op, Some(b))?;
    check_shift(op, Some(b), bits, type_)?;

    let exact = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul if signed => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => {
            if signed && b == -1 && a == range(bits, signed).0 {
                return Err(overflow());
            }
            a % b
        }
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::Shl if signed => a.checked_mul(1i128 << b).ok_or_else(overflow)?,
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::Shr => a >> b,
        _ => {
            return Err(ErrorImpl::InvalidOperand {
                operator: op.symbol().to_string(),
                type_: type_.to_string(),
            })
        }
    };

    if signed {
        if fits(exact, bits, signed) {
            Ok(exact)
        } else {
            Err(overflow())
        }
    } else {
        Ok(normalize(exact, bits, signed))
    }
}

/// Folds real arithmetic. `single` rounds the result to 32 bits.
pub fn fold_real(op: BinaryOp, a: f64, b: f64, single: bool) -> Option<f64> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => return None,
    };

    Some(if single { value as f32 as f64 } else { value })
}

pub fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> Option<bool> {
    Some(match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => return None,
    })
}

/// The all-zero value of a type. Scalars get their natural zero.
pub fn zero_constant(types: &TypeTable, ty: TypeId) -> Constant {
    if types.is_integer(ty) || types.is_pointer(ty) {
        Constant::Int { value: 0, ty }
    } else if types.is_real(ty) {
        Constant::Real { value: 0.0, ty }
    } else if types.is_bool(ty) {
        Constant::Bool(false)
    } else {
        Constant::Zero(ty)
    }
}
