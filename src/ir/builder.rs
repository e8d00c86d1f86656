//! Incremental construction of one function's CFG.
//!
//! The builder owns a single insertion cursor. Lowering code positions it at
//! a block, emits instructions there and terminates the block. Stack slots
//! are inserted at the head of the entry block by saving the cursor, moving
//! it, and restoring it afterwards.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::types::types::TypeId;

use super::ir::{Block, BlockId, Function, Instr, Operand, Param, StorageClass, Temp, Terminator};

/// An insertion point: a block and, optionally, an index inside it. Without
/// an index instructions are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    block: BlockId,
    index: Option<usize>,
}

/// Why a function could not be finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishError {
    /// A reachable block falls off the end of a function with a result.
    MissingReturn(BlockId),
}

pub struct FunctionBuilder {
    function: Function,
    cursor: Cursor,
    allocas: usize,
}

impl FunctionBuilder {
    pub fn new(name: &str, ty: TypeId, storage: StorageClass, params: Vec<Param>) -> Self {
        let entry = Block {
            id: BlockId(0),
            label: String::from("entry"),
            instrs: vec![],
            terminator: None,
        };

        FunctionBuilder {
            function: Function {
                name: name.to_string(),
                ty,
                storage,
                params,
                blocks: vec![entry],
                temps: 0,
            },
            cursor: Cursor {
                block: BlockId(0),
                index: None,
            },
            allocas: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn entry_block(&self) -> BlockId {
        BlockId(0)
    }

    /// Appends a new, empty block. The cursor does not move.
    pub fn new_block(&mut self, label: &str) -> BlockId {
        let id = BlockId(self.function.blocks.len() as u32);
        self.function.blocks.push(Block {
            id,
            label: label.to_string(),
            instrs: vec![],
            terminator: None,
        });
        id
    }

    pub fn position_at(&mut self, block: BlockId) {
        self.cursor = Cursor { block, index: None };
    }

    pub fn current_block(&self) -> BlockId {
        self.cursor.block
    }

    pub fn save_cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn restore_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.function.blocks[id.0 as usize]
    }

    pub fn is_terminated(&self) -> bool {
        self.function.blocks[self.cursor.block.0 as usize]
            .terminator
            .is_some()
    }

    pub fn temp(&mut self) -> Temp {
        let temp = Temp(self.function.temps);
        self.function.temps += 1;
        temp
    }

    pub fn emit(&mut self, instr: Instr) {
        let Cursor { block, index } = self.cursor;
        let instrs = &mut self.block_mut(block).instrs;

        match index {
            Some(index) => {
                instrs.insert(index, instr);
                self.cursor.index = Some(index + 1);
            }
            None => instrs.push(instr),
        }
    }

    /// Allocates a stack slot at the head of the entry block and returns its
    /// address.
    pub fn alloca(&mut self, ty: TypeId) -> Operand {
        let dest = self.temp();
        let saved = self.save_cursor();

        self.cursor = Cursor {
            block: self.entry_block(),
            index: Some(self.allocas),
        };
        self.emit(Instr::Alloca { dest, ty });
        self.allocas += 1;

        // Appending to the entry block is unaffected by the insertion above.
        self.restore_cursor(saved);
        Operand::Temp(dest)
    }

    /// Terminates the current block unless it already is. Returns whether
    /// the terminator was placed.
    pub fn terminate(&mut self, terminator: Terminator) -> bool {
        let block = self.cursor.block;
        let block = self.block_mut(block);

        if block.terminator.is_some() {
            return false;
        }

        block.terminator = Some(terminator);
        true
    }

    pub fn jump(&mut self, target: BlockId) -> bool {
        self.terminate(Terminator::Jump(target))
    }

    pub fn branch(&mut self, cond: Operand, then: BlockId, otherwise: BlockId) -> bool {
        self.terminate(Terminator::Branch {
            cond,
            then,
            otherwise,
        })
    }

    pub fn ret(&mut self, value: Option<Operand>) -> bool {
        self.terminate(Terminator::Return(value))
    }

    fn reachable(&self) -> HashSet<BlockId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.entry_block()]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }

            if let Some(terminator) = &self.function.blocks[id.0 as usize].terminator {
                queue.extend(terminator.successors());
            }
        }

        seen
    }

    /// Prunes unreachable blocks and closes the remaining ones. Open blocks
    /// get `ret void` when `returns_void`, otherwise they are an error.
    pub fn finish(mut self, returns_void: bool) -> Result<Function, FinishError> {
        let reachable = self.reachable();
        let before = self.function.blocks.len();

        self.function
            .blocks
            .retain(|block| reachable.contains(&block.id));

        for block in &mut self.function.blocks {
            if block.terminator.is_none() {
                if !returns_void {
                    return Err(FinishError::MissingReturn(block.id));
                }
                block.terminator = Some(Terminator::Return(None));
            }
        }

        debug!(
            function = %self.function.name,
            blocks = self.function.blocks.len(),
            pruned = before - self.function.blocks.len(),
            "finished function"
        );

        Ok(self.function)
    }
}
