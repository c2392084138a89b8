//! Stack-slot allocation for boxed values (§4.6, invariant 3): every
//! `Any`-typed temp gets a fixed index into a per-function slot array so
//! native lowering can address it without reconstructing SSA form across
//! the CFG's merge points. Scalar temps need no slot — they live in
//! registers `mem2reg` promotes from the `alloca`s lowering gives them.

use std::collections::HashMap;

use crate::cfg::{CfgFunction, TempId};
use crate::types::StaticType;

#[derive(Debug, Clone)]
pub struct SlotAssignment {
    slots: HashMap<TempId, u32>,
    frame_size: u32,
}

impl SlotAssignment {
    /// The slot index reserved for `temp`, or `None` for a scalar temp
    /// that never needed one.
    pub fn slot_of(&self, temp: TempId) -> Option<u32> {
        self.slots.get(&temp).copied()
    }

    /// How many `Any` slots this function's frame needs.
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }
}

/// One pass over every temp in definition order — which, since the
/// emitter (§4.4) allocates temp ids in the order it visits the source,
/// is equivalent to the statement-order walk §4.6 describes.
pub fn assign_slots(func: &CfgFunction) -> SlotAssignment {
    let mut slots = HashMap::new();
    let mut next_slot = 0u32;
    for (idx, ty) in func.temp_types.iter().enumerate() {
        if *ty == StaticType::Any {
            slots.insert(TempId(idx as u32), next_slot);
            next_slot += 1;
        }
    }
    SlotAssignment { slots, frame_size: next_slot }
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
    fn scalar_only_function_needs_no_slots() {
        let f = compile("function f(a: int32, b: int32): int32 { return a + b; }");
        let slots = assign_slots(&f);
        assert_eq!(slots.frame_size(), 0);
    }

    #[test]
    fn any_typed_locals_each_get_a_distinct_slot() {
        let f = compile("function f(a: object): any { let x: any = a.b; return x; }");
        let slots = assign_slots(&f);
        assert!(slots.frame_size() >= 2);
        let mut seen = std::collections::HashSet::new();
        for ty_idx in 0..f.temp_types.len() {
            if f.temp_types[ty_idx] == StaticType::Any {
                let slot = slots.slot_of(TempId(ty_idx as u32)).unwrap();
                assert!(seen.insert(slot), "slot {slot} assigned twice");
            }
        }
    }
}
