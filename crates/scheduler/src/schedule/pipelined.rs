//! Modulo schedule.
//!
//! The loop body is scheduled in flattened form: a sequence of stages, each `II`
//! bundles long, where a slot used at loop offset `k` is reserved at every offset
//! congruent to `k` modulo `II`. It provides:
//! 1. **Stage Growth:** An instruction that does not fit extends the loop by a
//!    whole stage and re-propagates reservations.
//! 2. **II Search:** After each body placement the interloop constraint
//!    `producer + latency <= consumer + II` is checked for every pair the
//!    instruction takes part in. A violation raises II by one, discards the loop
//!    region and replays the body; the search stops with an error at the II cap.
//!
//! Collapsing the stages into one kernel happens in [`alloc::pipelined`], after
//! registers are allocated.

use tracing::{debug, info};

use super::{InstrId, Schedule, ScheduleKind, Scheduler};
use crate::alloc;
use crate::analysis::DependencyMatrix;
use crate::common::error::ScheduleError;
use crate::common::reg::RegisterFile;
use crate::config::{MachineConfig, SchedulingConfig};
use crate::isa::instruction::Instruction;
use crate::program::{BasicBlock, Program};

/// Builder for the pipelined (`loop.pip`) schedule.
#[derive(Debug, Clone)]
pub struct PipelinedSchedule {
    schedule: Schedule,
    body_start: usize,
    ii_limit: usize,
}

impl PipelinedSchedule {
    /// Creates an empty pipelined schedule for `program`.
    ///
    /// The II cap is the configured maximum, or the sum of the body's latencies,
    /// and never below the resource bound.
    pub fn new(
        program: &Program,
        machine: &MachineConfig,
        scheduling: &SchedulingConfig,
    ) -> Result<Self, ScheduleError> {
        let schedule = Schedule::new(ScheduleKind::Pipelined, program, machine)?;
        let body_latency: usize = program
            .block(BasicBlock::Body)
            .iter()
            .map(|i| i.kind.latency())
            .sum();
        let ii_limit = scheduling
            .max_initiation_interval
            .unwrap_or(body_latency)
            .max(schedule.initiation_interval());
        Ok(Self {
            schedule,
            body_start: program.loop_start(),
            ii_limit,
        })
    }

    /// Schedules every program instruction, searching for a feasible II.
    pub fn build(
        program: &Program,
        deps: &DependencyMatrix,
        machine: &MachineConfig,
        scheduling: &SchedulingConfig,
    ) -> Result<Self, ScheduleError> {
        let mut sched = Self::new(program, machine, scheduling)?;
        debug!(
            ii = sched.schedule.initiation_interval(),
            limit = sched.ii_limit,
            "initial initiation interval"
        );
        for id in 0..program.len() {
            if sched.schedule.region(id) == BasicBlock::Body {
                sched.schedule_body_instruction(id, deps)?;
            } else {
                sched.schedule_instruction(id, deps)?;
            }
        }
        sched.schedule.close_loop();
        info!(
            bundles = sched.schedule.len(),
            ii = sched.schedule.initiation_interval(),
            stages = sched.schedule.stage_count(),
            "pipelined schedule built"
        );
        Ok(sched)
    }

    /// Largest II the search may reach.
    pub const fn ii_limit(&self) -> usize {
        self.ii_limit
    }

    /// Whether every interloop pair `id` takes part in, with both ends placed,
    /// satisfies `producer + latency <= consumer + II`.
    pub fn interloop_satisfied(&self, id: InstrId, deps: &DependencyMatrix) -> bool {
        let sched = &self.schedule;
        let ii = sched.initiation_interval();
        deps.interloop_pairs()
            .filter(|(p, c)| *p == id || *c == id)
            .all(|(p, c)| {
                let ready = sched.instruction(p).and_then(Instruction::ready_at);
                let consumer = sched.instruction(c).and_then(Instruction::bundle);
                match (ready, consumer) {
                    (Some(ready), Some(consumer)) => ready <= consumer + ii,
                    _ => true,
                }
            })
    }

    /// Assigns rotating and simple registers; see [`alloc::pipelined`].
    pub fn allocate_registers(
        &mut self,
        deps: &DependencyMatrix,
        regs: &mut RegisterFile,
    ) -> Result<(), ScheduleError> {
        alloc::pipelined::allocate(self, deps, regs)
    }

    /// Adds stage predicates, collapses the loop into its kernel and sets up the
    /// loop-control registers; see [`alloc::pipelined::prepare_loop`].
    pub fn prepare_loop(&mut self, regs: &mut RegisterFile) -> Result<(), ScheduleError> {
        alloc::pipelined::prepare_loop(self, regs)
    }

    /// The finished schedule.
    pub fn into_schedule(self) -> Schedule {
        self.schedule
    }

    fn schedule_body_instruction(
        &mut self,
        id: InstrId,
        deps: &DependencyMatrix,
    ) -> Result<(), ScheduleError> {
        self.schedule_instruction(id, deps)?;
        if self.interloop_satisfied(id, deps) {
            return Ok(());
        }

        let mut violating = id;
        loop {
            self.raise_ii(violating)?;
            match self.replay(id, deps)? {
                None => return Ok(()),
                Some(next) => violating = next,
            }
        }
    }

    /// Re-schedules the body from its first instruction through `upto`.
    ///
    /// # Returns
    ///
    /// The first instruction that violates an interloop constraint, if any.
    fn replay(
        &mut self,
        upto: InstrId,
        deps: &DependencyMatrix,
    ) -> Result<Option<InstrId>, ScheduleError> {
        for id in self.body_start..=upto {
            self.schedule_instruction(id, deps)?;
            if !self.interloop_satisfied(id, deps) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn raise_ii(&mut self, violating: InstrId) -> Result<(), ScheduleError> {
        let next = self.schedule.initiation_interval() + 1;
        if next > self.ii_limit {
            return Err(ScheduleError::InfeasibleInitiationInterval {
                ii: next,
                limit: self.ii_limit,
            });
        }
        debug!(
            address = violating,
            ii = next,
            "interloop dependency violated, raising initiation interval"
        );
        self.schedule.set_initiation_interval(next);
        self.schedule.discard_loop();
        Ok(())
    }

    /// Extends the loop by one stage of `II` bundles.
    fn add_loop_stage(&mut self) {
        for _ in 0..self.schedule.initiation_interval().max(1) {
            self.schedule.push_down_loop_end();
        }
        let Some(ls) = self.schedule.loop_start() else {
            return;
        };
        let placed: Vec<InstrId> = self
            .schedule
            .placed_in(ls..self.schedule.loop_region_end())
            .collect();
        for id in placed {
            self.schedule.reserve_modulo_slots(id);
        }
    }
}

impl Scheduler for PipelinedSchedule {
    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    fn try_place(&mut self, id: InstrId, index: usize) -> bool {
        let in_body = self.schedule.region(id) == BasicBlock::Body;
        if in_body {
            while index >= self.schedule.loop_region_end() {
                self.add_loop_stage();
            }
        }
        while index >= self.schedule.len() {
            self.schedule.append_bundle();
        }
        if self.schedule.insert_into(id, index).is_none() {
            return false;
        }
        if in_body {
            self.schedule.reserve_modulo_slots(id);
        }
        true
    }
}
