use std::ops::Range;

use proptest::collection::vec;
use proptest::prelude::*;

/// Straight-line program: `add` must wait one bundle for `mov`.
pub const DEPENDENT_PAIR: &[&str] = &["mov x1, 5", "add x2, x1, x1"];

/// Three independent ALU instructions on a two-ALU machine.
pub const INDEPENDENT_ADDS: &[&str] = &["add x1, x2, x3", "add x4, x5, x6", "add x7, x8, x9"];

/// Loop whose only carried value goes through a latency-3 multiply.
pub const MULTIPLY_RECURRENCE: &[&str] = &["mov x1, 1", "mulu x1, x1, x1", "loop 1"];

/// Counter loop with nothing after it.
pub const TRAILING_LOOP: &[&str] = &["mov x1, 0", "addi x1, x1, 1", "loop 1"];

/// Array walk: load, scale, store, advance the pointer, then use the pointer
/// after the loop.
pub const ARRAY_SCALE: &[&str] = &[
    "mov LC, 99",
    "mov x1, 0x1000",
    "mov x2, 3",
    "ld x3, 0(x1)",
    "mulu x4, x3, x2",
    "st x4, 0(x1)",
    "addi x1, x1, 8",
    "loop 3",
    "st x2, 0(x1)",
];

/// Running sum of a loaded value.
pub const ACCUMULATE: &[&str] = &[
    "mov x1, 0",
    "mov x2, 0x2000",
    "ld x3, 0(x2)",
    "add x1, x1, x3",
    "addi x2, x2, 4",
    "loop 2",
    "st x1, 0(x2)",
];

fn reg() -> Range<u32> {
    1..6
}

/// One random non-branch, non-`nop` instruction over a handful of registers,
/// so that generated programs are dense in dependencies.
pub fn arb_instruction() -> impl Strategy<Value = String> {
    prop_oneof![
        (reg(), reg(), reg()).prop_map(|(d, a, b)| format!("add x{d}, x{a}, x{b}")),
        (reg(), reg(), reg()).prop_map(|(d, a, b)| format!("sub x{d}, x{a}, x{b}")),
        (reg(), reg(), reg()).prop_map(|(d, a, b)| format!("mulu x{d}, x{a}, x{b}")),
        (reg(), reg(), -8i64..8).prop_map(|(d, a, imm)| format!("addi x{d}, x{a}, {imm}")),
        (reg(), reg()).prop_map(|(d, s)| format!("mov x{d}, x{s}")),
        (reg(), 0i64..256).prop_map(|(d, imm)| format!("mov x{d}, {imm:#x}")),
        (reg(), reg(), 0i64..64).prop_map(|(d, b, off)| format!("ld x{d}, {off}(x{b})")),
        (reg(), reg(), 0i64..64).prop_map(|(d, b, off)| format!("ld x{d}, {off:#x}(x{b})")),
        (reg(), reg(), 0i64..64).prop_map(|(s, b, off)| format!("st x{s}, {off}(x{b})")),
        (reg(), reg(), 0i64..64).prop_map(|(s, b, off)| format!("st x{s}, {off:#x}(x{b})")),
    ]
}

/// A program without a loop.
pub fn arb_straight_line() -> impl Strategy<Value = Vec<String>> {
    vec(arb_instruction(), 1..8)
}

/// A program with exactly one loop: a short prologue, a body closed by `loop`,
/// and a short epilogue.
pub fn arb_loop_program() -> impl Strategy<Value = Vec<String>> {
    (
        vec(arb_instruction(), 0..3),
        vec(arb_instruction(), 1..5),
        vec(arb_instruction(), 0..2),
    )
        .prop_map(|(prologue, body, epilogue)| {
            let target = prologue.len();
            let mut lines = prologue;
            lines.extend(body);
            lines.push(format!("loop {target}"));
            lines.extend(epilogue);
            lines
        })
}
