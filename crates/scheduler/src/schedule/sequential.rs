//! Straight-line schedule.
//!
//! Instructions are placed ASAP in program order. The loop is not overlapped: a
//! body instruction that does not fit before the current loop end pushes the loop
//! end down by one bundle at a time.

use tracing::info;

use super::{InstrId, Schedule, ScheduleKind, Scheduler};
use crate::alloc;
use crate::analysis::DependencyMatrix;
use crate::common::error::ScheduleError;
use crate::common::reg::RegisterFile;
use crate::config::MachineConfig;
use crate::program::{BasicBlock, Program};

/// Builder for the sequential (`loop`) schedule.
#[derive(Debug, Clone)]
pub struct SequentialSchedule {
    schedule: Schedule,
}

impl SequentialSchedule {
    /// Creates an empty sequential schedule for `program`.
    pub fn new(program: &Program, machine: &MachineConfig) -> Result<Self, ScheduleError> {
        Ok(Self {
            schedule: Schedule::new(ScheduleKind::Sequential, program, machine)?,
        })
    }

    /// Schedules every program instruction in program order.
    pub fn build(
        program: &Program,
        deps: &DependencyMatrix,
        machine: &MachineConfig,
    ) -> Result<Self, ScheduleError> {
        let mut sched = Self::new(program, machine)?;
        for id in 0..program.len() {
            sched.schedule_instruction(id, deps)?;
        }
        sched.schedule.close_loop();
        info!(
            bundles = sched.schedule.len(),
            ii = sched.schedule.initiation_interval(),
            "sequential schedule built"
        );
        Ok(sched)
    }

    /// Assigns concrete registers; see [`alloc::sequential`].
    pub fn allocate_registers(
        &mut self,
        deps: &DependencyMatrix,
        regs: &mut RegisterFile,
    ) -> Result<(), ScheduleError> {
        alloc::sequential::allocate(self, deps, regs)
    }

    /// The finished schedule.
    pub fn into_schedule(self) -> Schedule {
        self.schedule
    }
}

impl Scheduler for SequentialSchedule {
    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    fn try_place(&mut self, id: InstrId, index: usize) -> bool {
        let sched = &mut self.schedule;
        if sched.region(id) == BasicBlock::Body {
            while sched.loop_end().is_some_and(|le| index >= le) {
                sched.push_down_loop_end();
            }
        }
        while index >= sched.len() {
            sched.append_bundle();
        }
        sched.insert_into(id, index).is_some()
    }
}
