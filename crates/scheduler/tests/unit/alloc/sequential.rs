//! # Sequential Allocation Tests
//!
//! Fresh simple registers per producer, nearest-producer operand mapping, and the
//! moves that carry loop values back to the top of the body.

use modsched_core::Config;
use modsched_core::common::{RegisterClass, RegisterError, RegisterFile, ScheduleError};
use modsched_core::isa::instruction::{InstructionKind, Operand};
use modsched_core::schedule::Scheduler;
use pretty_assertions::assert_eq;

use crate::common::harness::{TestContext, occupied_rows};
use crate::common::programs::{
    ACCUMULATE, DEPENDENT_PAIR, INDEPENDENT_ADDS, MULTIPLY_RECURRENCE, TRAILING_LOOP,
};

#[test]
fn straight_line_reads_the_nearest_producer() {
    let sched = TestContext::new(DEPENDENT_PAIR).sequential_allocated();
    assert_eq!(
        occupied_rows(&sched),
        vec![vec!["mov x1, 5"], vec!["add x2, x1, x1"]]
    );
}

#[test]
fn unwritten_sources_get_their_own_registers() {
    let sched = TestContext::new(INDEPENDENT_ADDS).sequential_allocated();
    assert_eq!(
        occupied_rows(&sched),
        vec![
            vec!["add x1, x4, x5", "add x2, x6, x7"],
            vec!["add x3, x8, x9"],
        ]
    );
}

#[test]
fn accumulator_gets_compensating_moves() {
    let sched = TestContext::new(ACCUMULATE).sequential_allocated();
    assert_eq!(
        sched.rows(),
        vec![
            vec!["mov x1, 0", "mov x2, 0x2000", "nop", "nop", "nop"],
            vec!["addi x3, x2, 4", "nop", "nop", "ld x4, 0(x2)", "nop"],
            vec!["add x5, x1, x4", "mov x2, x3", "nop", "nop", "nop"],
            vec!["mov x1, x5", "nop", "nop", "nop", "loop 1"],
            vec!["nop", "nop", "nop", "st x5, 0(x3)", "nop"],
        ]
    );
    assert_eq!(sched.loop_start(), Some(1));
    assert_eq!(sched.loop_end(), Some(4));
    assert_eq!(sched.instructions().len(), ACCUMULATE.len() + 2);
}

#[test]
fn move_waits_for_a_slow_producer() {
    let sched = TestContext::new(MULTIPLY_RECURRENCE).sequential_allocated();
    // The product is only readable three bundles after the multiply issues.
    assert_eq!(
        occupied_rows(&sched),
        vec![
            vec!["mov x1, 1"],
            vec!["mulu x2, x1, x1"],
            vec![],
            vec![],
            vec!["mov x1, x2", "loop 1"],
        ]
    );
    let branch = sched.instruction(sched.branch().unwrap()).unwrap();
    assert_eq!(branch.bundle(), Some(4));
    assert_eq!(branch.kind, InstructionKind::Loop { target: 1 });
}

#[test]
fn loop_invariant_read_needs_no_move() {
    let sched = TestContext::new(&["mov x1, 0", "addi x2, x1, 1", "loop 1"]).sequential_allocated();
    assert_eq!(sched.instructions().len(), 3);
    assert_eq!(
        occupied_rows(&sched),
        vec![vec!["mov x1, 0"], vec!["addi x2, x1, 1", "loop 1"]]
    );
}

#[test]
fn carried_value_is_moved_once_ready() {
    let sched = TestContext::new(TRAILING_LOOP).sequential_allocated();
    assert_eq!(
        occupied_rows(&sched),
        vec![
            vec!["mov x1, 0"],
            vec!["addi x2, x1, 1"],
            vec!["mov x1, x2", "loop 1"],
        ]
    );
    assert_eq!(sched.loop_start(), Some(1));
    assert_eq!(sched.loop_end(), Some(3));
    assert_eq!(sched.loop_region_end(), 3);
}

#[test]
fn every_register_stays_in_the_simple_class() {
    let ctx = TestContext::new(ACCUMULATE);
    let sched = ctx.sequential_allocated();
    let simple = ctx.config.registers.simple_base..ctx.config.registers.register_count;
    for id in sched.placed() {
        let inst = sched.instruction(id).unwrap();
        assert_eq!(inst.predicate, None);
        let regs = Operand::BOTH
            .into_iter()
            .filter_map(|op| inst.mapped_operand(op))
            .chain(inst.mapped_destination);
        for reg in regs {
            assert!(simple.contains(&reg), "{inst}");
        }
    }
}

#[test]
fn small_register_file_is_exhausted() {
    let mut config = Config::default();
    config.registers.register_count = 2;
    let ctx = TestContext::new(DEPENDENT_PAIR).with_config(config);
    let mut sched = ctx.sequential();
    let mut regs = RegisterFile::without_rotation(ctx.config.registers);
    let err = sched.allocate_registers(&ctx.deps, &mut regs).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::Register(RegisterError::Exhausted {
            class: RegisterClass::Simple,
            limit: 2,
        })
    );
    // Nothing was placed differently on the way to the failure.
    assert_eq!(sched.schedule().len(), 2);
}
