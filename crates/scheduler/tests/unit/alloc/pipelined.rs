//! # Rotating Allocation Tests
//!
//! Stage-offset operand names, prologue seeds for carried values, stage
//! predicates, the kernel fold, and the loop-control setup before the loop.

use modsched_core::Config;
use modsched_core::common::{RegisterClass, RegisterError, RegisterFile, ScheduleError};
use modsched_core::isa::instruction::{InstructionKind, Operand};
use modsched_core::schedule::Scheduler;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{TestContext, cell, occupied_rows};
use crate::common::programs::{
    ACCUMULATE, ARRAY_SCALE, DEPENDENT_PAIR, MULTIPLY_RECURRENCE, TRAILING_LOOP,
};

#[test]
fn straight_line_allocation_matches_sequential() {
    let ctx = TestContext::new(DEPENDENT_PAIR);
    assert_eq!(
        ctx.pipelined_finished().rows(),
        ctx.sequential_allocated().rows()
    );
}

#[test]
fn accumulator_rotates_across_stages() {
    let ctx = TestContext::new(ACCUMULATE);
    let mut built = ctx.pipelined();
    let mut regs = RegisterFile::new(ctx.config.registers);
    built.allocate_registers(&ctx.deps, &mut regs).unwrap();
    let sched = built.schedule();

    let dest = |id| sched.instruction(id).unwrap().mapped_destination;
    // Rotating blocks are spaced by the stage count plus one.
    assert_eq!(dest(4), Some(32)); // addi
    assert_eq!(dest(2), Some(35)); // ld
    assert_eq!(dest(3), Some(38)); // add
    // Prologue producers write where the first iteration reads.
    assert_eq!(dest(0), Some(38));
    assert_eq!(dest(1), Some(33));

    let add = sched.instruction(3).unwrap();
    // Carried sum: same stage, one more rotation.
    assert_eq!(add.mapped_operand(Operand::A), Some(39));
    // Loaded value: one stage later.
    assert_eq!(add.mapped_operand(Operand::B), Some(36));

    let tail = sched.instruction(6).unwrap();
    assert_eq!(tail.mapped_operand(Operand::A), Some(38));
    assert_eq!(tail.mapped_operand(Operand::B), Some(33));
}

#[test]
fn accumulator_finished_listing() {
    let sched = TestContext::new(ACCUMULATE).pipelined_finished();
    assert_eq!(
        sched.rows(),
        vec![
            vec!["mov x38, 0", "mov x33, 0x2000", "nop", "nop", "nop"],
            vec!["mov EC, 1", "mov p32, true", "nop", "nop", "nop"],
            vec![
                "(p33) add x38, x39, x36",
                "(p32) addi x32, x33, 4",
                "nop",
                "(p32) ld x35, 0(x33)",
                "loop.pip 2",
            ],
            vec!["nop", "nop", "nop", "st x38, 0(x33)", "nop"],
        ]
    );
    assert_eq!(sched.loop_start(), Some(2));
    assert_eq!(sched.loop_region_end(), 3);
}

#[test]
fn recurrence_keeps_its_ii_after_the_fold() {
    let sched = TestContext::new(MULTIPLY_RECURRENCE).pipelined_finished();
    assert_eq!(
        occupied_rows(&sched),
        vec![
            vec!["mov x33, 1", "mov EC, 0"],
            vec!["mov p32, true"],
            vec!["(p32) mulu x32, x33, x33"],
            vec![],
            vec!["loop.pip 2"],
        ]
    );
    assert_eq!(sched.initiation_interval(), 3);
    assert_eq!(sched.loop_region_end() - sched.loop_start().unwrap(), 3);
}

#[test]
fn trailing_loop_keeps_its_bounds_through_setup() {
    let sched = TestContext::new(TRAILING_LOOP).pipelined_finished();
    assert_eq!(
        occupied_rows(&sched),
        vec![
            vec!["mov x33, 0", "mov EC, 0"],
            vec!["mov p32, true"],
            vec!["(p32) addi x32, x33, 1", "loop.pip 2"],
        ]
    );

    let ls = sched.loop_start().unwrap();
    let ii = sched.initiation_interval();
    assert_eq!(ls, 2);
    assert_eq!(sched.loop_end(), Some(ls + ii));

    let branch = sched.instruction(sched.branch().unwrap()).unwrap();
    assert_eq!(branch.kind, InstructionKind::LoopPip { target: ls });
    assert_eq!(branch.bundle(), Some(ls + ii - 1));
}

#[test]
fn loop_setup_uses_free_alu_slots_before_the_loop() {
    let sched = TestContext::new(ARRAY_SCALE).pipelined_finished();
    assert_eq!(cell(&sched, 0, 0), "mov LC, 99");
    assert_eq!(cell(&sched, 1, 1), "mov EC, 2");
    // The bundle before the loop is full by then, so the predicate gets its own.
    assert_eq!(occupied_rows(&sched)[2], vec!["mov p32, true"]);
    assert_eq!(sched.loop_start(), Some(3));
    assert_eq!(sched.stage_count(), 1);

    let branch = sched.instruction(sched.branch().unwrap()).unwrap();
    assert_eq!(branch.kind, InstructionKind::LoopPip { target: 3 });
    assert_eq!(branch.bundle(), Some(4));
    assert_eq!(branch.predicate, None);
}

#[test]
fn stage_predicates_follow_the_stage() {
    let ctx = TestContext::new(ARRAY_SCALE);
    let sched = ctx.pipelined_finished();
    let pred = |id| sched.instruction(id).unwrap().predicate;
    assert_eq!(pred(3), Some(32)); // ld, stage 0
    assert_eq!(pred(6), Some(32)); // addi, stage 0
    assert_eq!(pred(4), Some(32)); // mulu, stage 0
    assert_eq!(pred(5), Some(34)); // st, stage 2
    assert_eq!(pred(8), None); // post-loop store
}

#[rstest]
#[case(MULTIPLY_RECURRENCE)]
#[case(ACCUMULATE)]
#[case(ARRAY_SCALE)]
fn registers_stay_in_their_classes(#[case] lines: &[&str]) {
    let ctx = TestContext::new(lines);
    let sched = ctx.pipelined_finished();
    let layout = ctx.config.registers;
    let simple = layout.simple_base..layout.rotating_base;
    let rotating = layout.rotating_base..layout.register_count;
    let predicates = layout.predicate_base..layout.predicate_base + layout.predicate_count;

    let ls = sched.loop_start().unwrap();
    let le = sched.loop_region_end();
    for id in sched.placed() {
        let inst = sched.instruction(id).unwrap();
        let in_loop = inst.bundle().is_some_and(|b| (ls..le).contains(&b));
        if let Some(reg) = inst.mapped_destination
            && in_loop
        {
            assert!(rotating.contains(&reg), "{inst}");
        }
        for reg in Operand::BOTH.into_iter().filter_map(|op| inst.mapped_operand(op)) {
            assert!(simple.contains(&reg) || rotating.contains(&reg), "{inst}");
        }
        if let Some(pred) = inst.predicate {
            assert!(in_loop, "{inst}");
            assert!(predicates.contains(&pred), "{inst}");
        }
    }
}

#[test]
fn predicate_file_runs_out() {
    let mut config = Config::default();
    config.registers.predicate_count = 1;
    let ctx = TestContext::new(ARRAY_SCALE).with_config(config);
    let mut sched = ctx.pipelined();
    let mut regs = RegisterFile::new(ctx.config.registers);
    sched.allocate_registers(&ctx.deps, &mut regs).unwrap();
    let err = sched.prepare_loop(&mut regs).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::Register(RegisterError::Exhausted {
            class: RegisterClass::Predicate,
            limit: 33,
        })
    );
}
