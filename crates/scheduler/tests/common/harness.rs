use modsched_core::analysis::{DependencyMatrix, analyze};
use modsched_core::common::RegisterFile;
use modsched_core::config::{Config, FunctionalUnit};
use modsched_core::program::Program;
use modsched_core::schedule::{PipelinedSchedule, Schedule, SequentialSchedule};

/// A decoded program together with its dependency matrix and configuration.
pub struct TestContext {
    pub program: Program,
    pub deps: DependencyMatrix,
    pub config: Config,
}

impl TestContext {
    /// Decodes `lines` and analyzes the program under the default configuration.
    pub fn new(lines: &[&str]) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let program = Program::from_lines(lines.iter().copied()).unwrap();
        let deps = analyze(&program);
        Self {
            program,
            deps,
            config: Config::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sequential schedule before register allocation.
    pub fn sequential(&self) -> SequentialSchedule {
        SequentialSchedule::build(&self.program, &self.deps, &self.config.machine).unwrap()
    }

    /// Modulo schedule before register allocation and loop collapse.
    pub fn pipelined(&self) -> PipelinedSchedule {
        PipelinedSchedule::build(
            &self.program,
            &self.deps,
            &self.config.machine,
            &self.config.scheduling,
        )
        .unwrap()
    }

    /// Sequential schedule with registers allocated.
    pub fn sequential_allocated(&self) -> Schedule {
        let mut sched = self.sequential();
        let mut regs = RegisterFile::without_rotation(self.config.registers);
        sched.allocate_registers(&self.deps, &mut regs).unwrap();
        sched.into_schedule()
    }

    /// Finished modulo schedule: allocated, collapsed, loop set up.
    pub fn pipelined_finished(&self) -> Schedule {
        let mut sched = self.pipelined();
        let mut regs = RegisterFile::new(self.config.registers);
        sched.allocate_registers(&self.deps, &mut regs).unwrap();
        sched.prepare_loop(&mut regs).unwrap();
        sched.into_schedule()
    }
}

/// Rendered rows of a schedule with filler slots dropped, for compact assertions.
pub fn occupied_rows(schedule: &Schedule) -> Vec<Vec<String>> {
    schedule
        .rows()
        .into_iter()
        .map(|row| row.into_iter().filter(|cell| cell != "nop").collect())
        .collect()
}

/// Rendered text of the instruction in `(bundle, slot)`.
pub fn cell(schedule: &Schedule, bundle: usize, slot: usize) -> String {
    schedule.rows()[bundle][slot].clone()
}

/// Checks that every placed instruction sits in a slot of its own class and
/// that no class is oversubscribed in any bundle.
pub fn assert_slot_affinity(schedule: &Schedule) {
    let machine = schedule.machine();
    for (index, bundle) in schedule.bundles().iter().enumerate() {
        assert_eq!(bundle.width(), machine.pipeline_width());
        for (slot, id) in bundle.instructions() {
            let inst = schedule.instruction(id).unwrap();
            if let Some(unit) = inst.kind.unit() {
                assert!(
                    machine.slots(unit).contains(&slot),
                    "{inst} in slot {slot} of bundle {index}"
                );
            }
        }
        for unit in FunctionalUnit::ALL {
            let used = bundle
                .instructions()
                .filter(|(_, id)| schedule.instruction(*id).unwrap().kind.unit() == Some(unit))
                .count();
            assert!(used <= machine.units(unit), "{unit} oversubscribed in bundle {index}");
        }
    }
}

/// Checks that every placement recorded on an instruction matches the bundle
/// contents and that no instruction is placed twice.
pub fn assert_placements_consistent(schedule: &Schedule) {
    let mut seen = Vec::new();
    for (index, bundle) in schedule.bundles().iter().enumerate() {
        for (slot, id) in bundle.instructions() {
            assert!(!seen.contains(&id), "instruction {id} placed twice");
            seen.push(id);
            let placement = schedule.instruction(id).unwrap().placement.unwrap();
            assert_eq!((placement.bundle, placement.slot), (index, slot));
        }
    }
}
