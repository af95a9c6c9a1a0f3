//! # Sequential Schedule Tests
//!
//! ASAP placement in program order, loop boundaries, and the fixed branch slot.

use modsched_core::Config;
use modsched_core::common::ScheduleError;
use modsched_core::config::FunctionalUnit;
use modsched_core::isa::instruction::InstructionKind;
use modsched_core::schedule::{ScheduleKind, Scheduler, SequentialSchedule};
use pretty_assertions::assert_eq;

use crate::common::harness::{TestContext, cell, occupied_rows};
use crate::common::programs::{ACCUMULATE, DEPENDENT_PAIR, INDEPENDENT_ADDS, TRAILING_LOOP};

#[test]
fn dependent_instruction_waits_for_latency() {
    let ctx = TestContext::new(DEPENDENT_PAIR);
    let sched = ctx.sequential().into_schedule();
    assert_eq!(sched.kind(), ScheduleKind::Sequential);
    assert_eq!(
        sched.rows(),
        vec![
            vec!["mov x1, 5", "nop", "nop", "nop", "nop"],
            vec!["add x2, x1, x1", "nop", "nop", "nop", "nop"],
        ]
    );
    assert!(!sched.has_loop());
    assert_eq!(sched.loop_start(), None);
}

#[test]
fn independent_instructions_fill_alu_slots() {
    let ctx = TestContext::new(INDEPENDENT_ADDS);
    let sched = ctx.sequential().into_schedule();
    assert_eq!(
        occupied_rows(&sched),
        vec![
            vec!["add x1, x2, x3", "add x4, x5, x6"],
            vec!["add x7, x8, x9"],
        ]
    );
}

#[test]
fn loop_region_and_branch() {
    let ctx = TestContext::new(ACCUMULATE);
    let built = ctx.sequential();
    let sched = built.schedule();

    assert_eq!(sched.loop_start(), Some(1));
    assert_eq!(sched.loop_end(), Some(3));
    assert_eq!(
        occupied_rows(sched),
        vec![
            vec!["mov x1, 0", "mov x2, 0x2000"],
            vec!["addi x2, x2, 4", "ld x3, 0(x2)", "loop 1"],
            vec!["add x1, x1, x3"],
            vec!["st x1, 0(x2)"],
        ]
    );
    assert_eq!(cell(sched, 1, 4), "loop 1");
    let branch = sched.instruction(sched.branch().unwrap()).unwrap();
    assert_eq!(branch.kind, InstructionKind::Loop { target: 1 });
}

#[test]
fn post_loop_code_starts_after_the_loop() {
    let ctx = TestContext::new(&["mov x1, 0", "addi x1, x1, 1", "loop 1", "mov x2, 7"]);
    let sched = ctx.sequential().into_schedule();
    // The independent post-loop mov still may not move into the loop.
    let tail = sched.instruction(3).unwrap();
    assert_eq!(tail.bundle(), sched.loop_end());
    assert!(tail.bundle().unwrap() >= 2);
}

#[test]
fn machine_without_required_unit_is_rejected() {
    let mut config = Config::default();
    config.machine.mul_units = 0;
    let ctx = TestContext::new(&["mulu x1, x2, x3"]).with_config(config);
    let err = SequentialSchedule::build(&ctx.program, &ctx.deps, &ctx.config.machine).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::MissingUnit {
            address: 0,
            unit: FunctionalUnit::Mul
        }
    );
}

#[test]
fn wider_machine_packs_more_per_bundle() {
    let mut config = Config::default();
    config.machine.alu_units = 3;
    let ctx = TestContext::new(INDEPENDENT_ADDS).with_config(config);
    let sched = ctx.sequential().into_schedule();
    assert_eq!(sched.len(), 1);
    assert_eq!(sched.width(), 6);
}

#[test]
fn loop_without_trailing_code_is_closed() {
    let ctx = TestContext::new(TRAILING_LOOP);
    let sched = ctx.sequential().into_schedule();
    assert!(sched.has_loop());
    assert_eq!(sched.loop_start(), Some(1));
    assert_eq!(sched.loop_end(), Some(2));
    assert_eq!(cell(&sched, 1, 4), "loop 1");
}

#[test]
fn listing_has_no_stage_rules() {
    let sched = TestContext::new(ACCUMULATE).sequential_allocated();
    let text = sched.to_string();
    assert_eq!(text.lines().count(), sched.len());
    assert!(text.lines().all(|line| !line.starts_with('-')));
}
