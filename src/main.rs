use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nandsim::{circuit_sim::Ticks, Project, SimConfig};

/// Load a circuit project and run the test vectors of its components.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Project description (YAML). Runs the built-in SR latch sample if omitted.
    path: Option<PathBuf>,

    /// Give up on a row after this many component evaluations.
    #[arg(long)]
    max_ticks: Option<Ticks>,

    /// Only test this component.
    #[arg(long)]
    component: Option<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let project = match &args.path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Project::from_yaml(&text).with_context(|| format!("loading {}", path.display()))?
        }
        None => Project::sample().context("loading built-in sample")?,
    };

    let mut config = SimConfig::default();
    if let Some(max_ticks) = args.max_ticks {
        config.max_ticks = max_ticks;
    }

    let reports = match &args.component {
        Some(name) => vec![project.run_component_tests(name, &config)?],
        None => project.run_tests(&config)?,
    };

    println!("{}", project.name());
    let mut all_passed = true;
    for report in &reports {
        for row in &report.rows {
            let inputs: String = row
                .vector
                .inputs
                .iter()
                .map(|v| if *v { '1' } else { '0' })
                .collect();
            let actual: String = row.actual.iter().map(|s| s.to_char()).collect();
            let mark = if row.passed() { "ok" } else { "FAIL" };
            println!(
                "  {} [{}]: {} -> {} ({} ticks) {}",
                report.component, row.row, inputs, actual, row.ticks, mark
            );
        }
        all_passed &= report.passed();
    }

    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
