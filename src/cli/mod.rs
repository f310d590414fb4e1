use std::fs::canonicalize;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::cli::args::Args;
use crate::cli::progress::StepContext;
use crate::config::parse_sram_config;
use crate::plan::{
    check_outputs, execute_plan, generate_plan, CheckOutputsParams, ExecutePlanParams, TaskKey,
    CHECK_TASKS, GENERATE_TASKS,
};
use crate::{anyhow, Result};

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
 ___ _ __ __ _ _ __ ___ | |_| |__
/ __| '__/ _` | '_ ` _ \| __| '_ \
\__ \ | | (_| | | | | | | |_| |_) |
|___/_|  \__,_|_| |_| |_|\__|_.__/

SRAMTB v0.1
";

pub fn run() -> Result<()> {
    let args = Args::parse();

    let config_path = canonicalize(&args.config)
        .with_context(|| format!("configuration file {:?} not found", &args.config))?;

    println!("{BANNER}");

    println!("Reading configuration file...\n");
    let config = parse_sram_config(&config_path)?;

    println!("Configuration file: {:?}", &config_path);
    println!("Testbench parameters:");
    println!("\tNumber of words: {}", config.num_words);
    println!("\tWord size: {}", config.word_size);
    println!("\tSupply voltage: {}", config.vdd);
    println!("\tClock period: {}", config.clk_period);
    println!("\tTest sequence: {}", config.sequence);
    println!("\tSimulator: {}", config.target.as_str());

    let tasks: &[TaskKey] = if args.check.is_some() {
        &CHECK_TASKS
    } else {
        &GENERATE_TASKS
    };
    let mut ctx = StepContext::new(tasks);

    let plan = ctx.check(generate_plan(&config, args.seed))?;
    ctx.finish(TaskKey::GeneratePlan);

    let work_dir = if let Some(output_dir) = args.output_dir {
        output_dir
    } else {
        PathBuf::from(plan.params.dut_name.as_str())
    };

    if let Some(captured) = args.check {
        let work_dir = canonicalize(&work_dir)
            .with_context(|| format!("output directory {:?} not found", &work_dir))?;
        let report = check_outputs(CheckOutputsParams {
            work_dir: &work_dir,
            plan: &plan,
            captured: &captured,
            ctx: Some(&mut ctx),
        });
        let report = ctx.check(report)?;
        if !report.passed() {
            ctx.bail(anyhow!(
                "{} of {} output samples did not match",
                report.mismatches.len(),
                report.checked
            ))?;
        }
        println!("All {} output samples matched\n", report.checked);
        return Ok(());
    }

    std::fs::create_dir_all(&work_dir)?;
    let work_dir = canonicalize(work_dir)?;

    let res = execute_plan(ExecutePlanParams {
        work_dir: &work_dir,
        plan: &plan,
        ctx: Some(&mut ctx),
    });

    let artifacts = ctx.check(res)?;
    println!("Seed: {}", plan.seed);
    println!("Testbench saved to: {:?}", &artifacts.netlist);
    println!("Expected outputs saved to: {:?}\n", &artifacts.expectations);

    Ok(())
}
