use pretty_assertions::assert_eq;

use crate::types::types::{TypeId, TypeKind, TypeTable};

use super::{
    builder::{FinishError, FunctionBuilder},
    display,
    ir::{BlockId, Constant, Instr, Operand, StorageClass, Terminator},
};

fn int(value: i128) -> Operand {
    Operand::Const(Constant::Int {
        value,
        ty: TypeId::INT32,
    })
}

fn void_function(table: &mut TypeTable) -> TypeId {
    table.add(TypeKind::Function {
        params: vec![],
        ret: TypeId::VOID,
    })
}

#[test]
fn test_allocas_stay_at_entry_head() {
    let mut table = TypeTable::new(8);
    let ty = void_function(&mut table);
    let mut builder = FunctionBuilder::new("f", ty, StorageClass::Internal, vec![]);

    let first = builder.alloca(TypeId::INT32);
    builder.emit(Instr::Store {
        ty: TypeId::INT32,
        addr: first.clone(),
        value: int(1),
    });

    let body = builder.new_block("body");
    builder.jump(body);
    builder.position_at(body);

    let second = builder.alloca(TypeId::INT64);
    assert_eq!(builder.current_block(), body);

    let function = builder.finish(true).unwrap();
    let entry = function.entry();

    assert!(matches!(entry.instrs[0], Instr::Alloca { ty: TypeId::INT32, .. }));
    assert!(matches!(entry.instrs[1], Instr::Alloca { ty: TypeId::INT64, .. }));
    assert!(matches!(entry.instrs[2], Instr::Store { .. }));
    assert_ne!(first, second);
}

#[test]
fn test_terminate_keeps_first_terminator() {
    let mut table = TypeTable::new(8);
    let ty = void_function(&mut table);
    let mut builder = FunctionBuilder::new("f", ty, StorageClass::Internal, vec![]);

    let other = builder.new_block("other");
    assert!(builder.ret(None));
    assert!(!builder.jump(other));
    assert!(builder.is_terminated());

    let function = builder.finish(true).unwrap();
    assert_eq!(function.entry().terminator, Some(Terminator::Return(None)));
}

#[test]
fn test_finish_prunes_unreachable_blocks() {
    let mut table = TypeTable::new(8);
    let ty = void_function(&mut table);
    let mut builder = FunctionBuilder::new("f", ty, StorageClass::Internal, vec![]);

    let live = builder.new_block("live");
    let dead = builder.new_block("dead");
    builder.jump(live);
    builder.position_at(dead);
    builder.jump(live);

    let function = builder.finish(true).unwrap();

    assert_eq!(function.blocks.len(), 2);
    assert!(function.block_by_label("dead").is_none());
    assert_eq!(
        function.block(live).and_then(|block| block.terminator.clone()),
        Some(Terminator::Return(None))
    );
}

#[test]
fn test_finish_reports_missing_return() {
    let mut table = TypeTable::new(8);
    let ty = table.add(TypeKind::Function {
        params: vec![],
        ret: TypeId::INT32,
    });
    let mut builder = FunctionBuilder::new("f", ty, StorageClass::Internal, vec![]);

    let cond = Operand::Const(Constant::Bool(true));
    let then = builder.new_block("then");
    let otherwise = builder.new_block("otherwise");
    builder.branch(cond, then, otherwise);
    builder.position_at(then);
    builder.ret(Some(int(1)));

    assert_eq!(builder.finish(false).err(), Some(FinishError::MissingReturn(BlockId(2))));
}

#[test]
fn test_dump_function() {
    let mut table = TypeTable::new(8);
    let ty = table.add(TypeKind::Function {
        params: vec![],
        ret: TypeId::INT32,
    });
    let mut builder = FunctionBuilder::new("main", ty, StorageClass::Internal, vec![]);

    let slot = builder.alloca(TypeId::INT32);
    let loaded = builder.temp();
    builder.emit(Instr::Load {
        dest: loaded,
        ty: TypeId::INT32,
        addr: slot,
    });
    builder.ret(Some(Operand::Temp(loaded)));

    let function = builder.finish(false).unwrap();
    let text = display::function(&table, &function);

    assert_eq!(
        text,
        "func @main() -> int32 internal {\nentry.0:\n  %0 = alloca int32\n  %1 = load int32 %0\n  ret %1\n}\n"
    );
}
