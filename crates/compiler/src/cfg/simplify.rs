//! CFG simplification (§4.5): the emitter (§4.4) is deliberately naive
//! about block count — every `if`/`while`/`&&` diamond allocates a merge
//! block whether or not anything distinguishes it from its successor.
//! This pass collapses that debris before native lowering sees it, the
//! same way the teacher's own lowering runs a cheap peephole pass over
//! freshly emitted blocks rather than asking the emitter to be clever.

use std::collections::{HashMap, HashSet};

use crate::cfg::{BlockId, CfgFunction, Terminator};

pub fn simplify(func: &mut CfgFunction) {
    collapse_trivial_branches(func);
    collapse_empty_jump_chains(func);
    remove_unreachable_blocks(func);
}

/// A `Branch` whose two targets are identical carries no information;
/// treat it as a plain `Jump` so the empty-block pass below can also
/// absorb it.
fn collapse_trivial_branches(func: &mut CfgFunction) {
    for block in &mut func.blocks {
        if let Terminator::Branch { then_blk, else_blk, .. } = block.terminator {
            if then_blk == else_blk {
                block.terminator = Terminator::Jump(then_blk);
            }
        }
    }
}

/// Builds the "this empty block just jumps to that one" replacement map,
/// resolves it transitively (a chain of three empty blocks collapses to
/// one hop), then rewrites every terminator and the function's entry
/// pointer through it.
fn collapse_empty_jump_chains(func: &mut CfgFunction) {
    let mut replacement: HashMap<BlockId, BlockId> = HashMap::new();
    for block in &func.blocks {
        if block.instrs.is_empty() {
            if let Terminator::Jump(target) = block.terminator {
                if target != block.id {
                    replacement.insert(block.id, target);
                }
            }
        }
    }
    if replacement.is_empty() {
        return;
    }

    let resolve = |mut id: BlockId, map: &HashMap<BlockId, BlockId>| -> BlockId {
        let mut seen = HashSet::new();
        while let Some(&next) = map.get(&id) {
            if !seen.insert(id) {
                break;
            }
            id = next;
        }
        id
    };

    func.entry = resolve(func.entry, &replacement);
    for block in &mut func.blocks {
        match &mut block.terminator {
            Terminator::Jump(target) => *target = resolve(*target, &replacement),
            Terminator::Branch { then_blk, else_blk, .. } => {
                *then_blk = resolve(*then_blk, &replacement);
                *else_blk = resolve(*else_blk, &replacement);
            }
            Terminator::Return | Terminator::ReturnValue(_) | Terminator::Throw(_) | Terminator::None => {}
        }
    }
}

/// Walks the terminator graph from `entry` and drops every block that
/// pass never actually reaches — the empty blocks the previous pass just
/// redirected away from, and any branch arm made dead by an earlier
/// always-terminating statement.
fn remove_unreachable_blocks(func: &mut CfgFunction) {
    let mut reachable = HashSet::new();
    let mut stack = vec![func.entry];
    while let Some(id) = stack.pop() {
        if !reachable.insert(id) {
            continue;
        }
        let block = func.block(id);
        match &block.terminator {
            Terminator::Jump(t) => stack.push(*t),
            Terminator::Branch { then_blk, else_blk, .. } => {
                stack.push(*then_blk);
                stack.push(*else_blk);
            }
            Terminator::Return | Terminator::ReturnValue(_) | Terminator::Throw(_) | Terminator::None => {}
        }
    }
    func.blocks.retain(|b| reachable.contains(&b.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::emit::emit_function;
    use crate::parser::Parser;
    use std::collections::HashMap as Map;

    fn compile(src: &str) -> CfgFunction {
        let program = Parser::new(src).unwrap().parse_program();
        emit_function(&program.functions[0], &Map::new()).unwrap()
    }

    #[test]
    fn if_without_else_collapses_empty_merge_chain() {
        let mut f = compile("function f(a: int32): int32 { if (a > 0) { return 1; } return 0; }");
        let before = f.blocks.len();
        simplify(&mut f);
        assert!(f.blocks.len() <= before);
        for block in &f.blocks {
            assert!(!(block.instrs.is_empty() && matches!(block.terminator, Terminator::Jump(_))));
        }
    }

    #[test]
    fn unreachable_block_after_both_arms_return_is_dropped() {
        let mut f = compile(
            "function f(a: int32): int32 { if (a > 0) { return 1; } else { return 2; } }",
        );
        simplify(&mut f);
        let reachable_from_entry = {
            let mut seen = HashSet::new();
            let mut stack = vec![f.entry];
            while let Some(id) = stack.pop() {
                if !seen.insert(id) {
                    continue;
                }
                match &f.block(id).terminator {
                    Terminator::Jump(t) => stack.push(*t),
                    Terminator::Branch { then_blk, else_blk, .. } => {
                        stack.push(*then_blk);
                        stack.push(*else_blk);
                    }
                    _ => {}
                }
            }
            seen
        };
        assert_eq!(reachable_from_entry.len(), f.blocks.len());
    }

    #[test]
    fn trivial_same_target_branch_becomes_a_jump() {
        let mut f = compile("function f(a: int32): int32 { return a; }");
        let entry_id = f.entry;
        f.block_mut(entry_id).terminator = Terminator::Branch {
            cond: crate::cfg::TempId(0),
            then_blk: entry_id,
            else_blk: entry_id,
        };
        collapse_trivial_branches(&mut f);
        assert!(matches!(f.block(entry_id).terminator, Terminator::Jump(_)));
    }
}
