use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::backend::for_target;
use crate::cli::progress::StepContext;
use crate::config::{SimTarget, SramConfig};
use crate::paths::{out_deck, out_expectations};
use crate::verification::verify::verify_outputs;
use crate::verification::{generate_program, CapturedData, CheckReport, ExpectationLedger, TbParams};
use crate::Result;

/// A concrete, validated plan for one testbench.
#[derive(Debug, Clone, PartialEq)]
pub struct TbPlan {
    pub params: TbParams,
    /// Seed of the test sequence RNG.
    pub seed: u64,
    pub target: SimTarget,
    pub dut_netlist: PathBuf,
    pub tolerance: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    GeneratePlan,
    GenerateStimulus,
    WriteNetlist,
    WriteExpectations,
    CheckOutputs,
}

impl TaskKey {
    pub fn desc(&self) -> &'static str {
        match self {
            TaskKey::GeneratePlan => "Generate plan",
            TaskKey::GenerateStimulus => "Generate stimulus",
            TaskKey::WriteNetlist => "Write testbench netlist",
            TaskKey::WriteExpectations => "Write expected outputs",
            TaskKey::CheckOutputs => "Check simulation outputs",
        }
    }
}

/// Tasks run when generating a testbench.
pub const GENERATE_TASKS: [TaskKey; 4] = [
    TaskKey::GeneratePlan,
    TaskKey::GenerateStimulus,
    TaskKey::WriteNetlist,
    TaskKey::WriteExpectations,
];

/// Tasks run when checking captured outputs.
pub const CHECK_TASKS: [TaskKey; 2] = [TaskKey::GeneratePlan, TaskKey::CheckOutputs];

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a TbPlan,
    pub ctx: Option<&'a mut StepContext>,
}

pub struct CheckOutputsParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a TbPlan,
    /// JSON file of captured simulator outputs.
    pub captured: &'a Path,
    pub ctx: Option<&'a mut StepContext>,
}

/// Files written by [`execute_plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbArtifacts {
    pub netlist: PathBuf,
    pub expectations: PathBuf,
}

/// Validates `config`. `seed` takes precedence over the configured seed.
pub fn generate_plan(config: &SramConfig, seed: Option<u64>) -> Result<TbPlan> {
    let params = config.to_tb_params()?;
    let seed = seed.or(config.seed).unwrap_or_else(rand::random);

    Ok(TbPlan {
        params,
        seed,
        target: config.target.clone(),
        dut_netlist: config.dut_netlist.clone(),
        tolerance: config.tolerance,
    })
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

pub fn execute_plan(params: ExecutePlanParams) -> Result<TbArtifacts> {
    let ExecutePlanParams {
        work_dir,
        plan,
        mut ctx,
    } = params;

    let name = plan.params.dut_name.as_str();
    info!("using seed {}", plan.seed);
    let mut rng = StdRng::seed_from_u64(plan.seed);
    let (program, ledger) = generate_program(&plan.params, &mut rng)?;
    try_finish_task!(ctx, TaskKey::GenerateStimulus);

    std::fs::create_dir_all(work_dir)?;

    let backend = for_target(&plan.target, plan.dut_netlist.clone());
    let netlist = out_deck(work_dir, name, backend.extension());
    std::fs::write(&netlist, backend.render(&program, &ledger)?)?;
    info!("wrote {} testbench to {:?}", plan.target.as_str(), &netlist);
    try_finish_task!(ctx, TaskKey::WriteNetlist);

    let expectations = out_expectations(work_dir, name);
    ledger.save(&expectations)?;
    info!(
        "wrote {} expected outputs to {:?}",
        ledger.len(),
        &expectations
    );
    try_finish_task!(ctx, TaskKey::WriteExpectations);

    Ok(TbArtifacts {
        netlist,
        expectations,
    })
}

/// Compares captured outputs against the expectations written by [`execute_plan`].
///
/// The task is only marked done if every sample matched.
pub fn check_outputs(params: CheckOutputsParams) -> Result<CheckReport> {
    let CheckOutputsParams {
        work_dir,
        plan,
        captured,
        mut ctx,
    } = params;

    let ledger = ExpectationLedger::load(out_expectations(
        work_dir,
        plan.params.dut_name.as_str(),
    ))?;
    let data = CapturedData::load(captured)?;
    let report = verify_outputs(&ledger, &data, &plan.params.ports, plan.tolerance)?;

    if report.passed() {
        try_finish_task!(ctx, TaskKey::CheckOutputs);
    }
    Ok(report)
}
