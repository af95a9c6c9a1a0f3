//! End-to-end scheduling.
//!
//! Runs the dependency analysis once and builds both schedules from it, each with
//! its own register file so that neither run sees the other's allocations.

use tracing::debug;

use crate::analysis::{DependencyMatrix, analyze};
use crate::common::error::ScheduleError;
use crate::common::reg::RegisterFile;
use crate::config::Config;
use crate::program::Program;
use crate::schedule::{PipelinedSchedule, Schedule, SequentialSchedule};

/// The two finished schedules of one program.
#[derive(Debug, Clone)]
pub struct Schedules {
    /// Straight-line schedule closed by `loop`.
    pub sequential: Schedule,
    /// Modulo schedule closed by `loop.pip`.
    pub pipelined: Schedule,
}

/// Analyzes `program` and produces both of its schedules.
///
/// # Arguments
///
/// * `program` - The decoded, validated program.
/// * `config` - Machine resources, register layout and II limits.
///
/// # Returns
///
/// The sequential and pipelined schedules with registers allocated.
pub fn schedule_program(program: &Program, config: &Config) -> Result<Schedules, ScheduleError> {
    debug!("program:\n{program}");
    let deps = analyze(program);
    debug!("dependencies:\n{deps}");

    Ok(Schedules {
        sequential: build_sequential_schedule(program, &deps, config)?,
        pipelined: build_pipelined_schedule(program, &deps, config)?,
    })
}

/// Builds and allocates the sequential schedule.
pub fn build_sequential_schedule(
    program: &Program,
    deps: &DependencyMatrix,
    config: &Config,
) -> Result<Schedule, ScheduleError> {
    let mut regs = RegisterFile::without_rotation(config.registers);
    let mut sched = SequentialSchedule::build(program, deps, &config.machine)?;
    sched.allocate_registers(deps, &mut regs)?;
    Ok(sched.into_schedule())
}

/// Builds the modulo schedule, allocates rotating registers and folds the loop
/// onto its kernel.
pub fn build_pipelined_schedule(
    program: &Program,
    deps: &DependencyMatrix,
    config: &Config,
) -> Result<Schedule, ScheduleError> {
    let mut regs = RegisterFile::new(config.registers);
    let mut sched =
        PipelinedSchedule::build(program, deps, &config.machine, &config.scheduling)?;
    sched.allocate_registers(deps, &mut regs)?;
    sched.prepare_loop(&mut regs)?;
    Ok(sched.into_schedule())
}
