//! # Driver and I/O Tests
//!
//! The full program → schedules pipeline and the JSON files on either side.

use std::fs;

use modsched_core::io::{load_program, parse_program, to_json, write_schedule};
use modsched_core::{Config, Error, schedule_program};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::tempdir;

use crate::common::harness::TestContext;
use crate::common::programs::{ACCUMULATE, ARRAY_SCALE, MULTIPLY_RECURRENCE};

#[test]
fn both_schedules_come_out_finished() {
    for lines in [MULTIPLY_RECURRENCE, ACCUMULATE, ARRAY_SCALE] {
        let ctx = TestContext::new(lines);
        let schedules = schedule_program(&ctx.program, &ctx.config).unwrap();
        assert_eq!(schedules.sequential.rows(), ctx.sequential_allocated().rows());
        assert_eq!(schedules.pipelined.rows(), ctx.pipelined_finished().rows());
    }
}

#[test]
fn json_listing_has_one_array_per_bundle() {
    let ctx = TestContext::new(ACCUMULATE);
    let schedules = schedule_program(&ctx.program, &ctx.config).unwrap();
    let value = to_json(&schedules.pipelined);
    assert_eq!(
        value,
        json!([
            ["mov x38, 0", "mov x33, 0x2000", "nop", "nop", "nop"],
            ["mov EC, 1", "mov p32, true", "nop", "nop", "nop"],
            [
                "(p33) add x38, x39, x36",
                "(p32) addi x32, x33, 4",
                "nop",
                "(p32) ld x35, 0(x33)",
                "loop.pip 2"
            ],
            ["nop", "nop", "nop", "st x38, 0(x33)", "nop"]
        ])
    );
}

#[test]
fn files_round_trip_through_the_pipeline() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.json");
    let output = dir.path().join("simple.json");
    fs::write(&input, serde_json::to_string(ACCUMULATE).unwrap()).unwrap();

    let program = load_program(&input).unwrap();
    assert_eq!(program.len(), ACCUMULATE.len());

    let schedules = schedule_program(&program, &Config::default()).unwrap();
    write_schedule(&schedules.sequential, &output).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, to_json(&schedules.sequential));
    let bundles = written.as_array().unwrap();
    assert_eq!(bundles.len(), schedules.sequential.len());
    assert!(bundles.iter().all(|b| b.as_array().is_some_and(|s| s.len() == 5)));
}

#[test]
fn missing_input_names_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match load_program(&path) {
        Err(Error::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn unwritable_output_is_an_io_error() {
    let dir = tempdir().unwrap();
    let ctx = TestContext::new(ACCUMULATE);
    let sched = ctx.sequential_allocated();
    let err = write_schedule(&sched, dir.path().join("missing").join("out.json")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn bad_instruction_reports_its_index() {
    let err = parse_program(r#"["mov x1, 1", "jmp 0"]"#).unwrap_err();
    assert!(matches!(err, Error::Decode { index: 1, .. }), "{err}");
}

#[test]
fn second_loop_branch_is_rejected() {
    let err = parse_program(r#"["mov x1, 1", "loop 0", "loop 0"]"#).unwrap_err();
    assert!(matches!(err, Error::Program(_)), "{err}");
}

#[test]
fn infeasible_ii_propagates_from_the_driver() {
    let mut config = Config::default();
    config.scheduling.max_initiation_interval = Some(1);
    let ctx = TestContext::new(MULTIPLY_RECURRENCE);
    let err = schedule_program(&ctx.program, &config).unwrap_err();
    assert_eq!(err.to_string(), "no feasible initiation interval: II 2 exceeds the limit of 1");
}
