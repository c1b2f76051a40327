use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};

/// Developer tasks for the courier workspace.
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Seeded scenario through the `courier` binary, run until settled
    Simulate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 10_000)]
        ticks: u64,
    },
    /// Strategy comparison on a random 40x40 maze
    Compare {
        #[arg(long, default_value_t = 0.25)]
        wall_density: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
    /// Criterion benches, optionally saving or comparing a named baseline
    Bench {
        #[arg(long, conflicts_with = "against")]
        save: Option<String>,
        #[arg(long)]
        against: Option<String>,
    },
    /// CI checks
    Ci {
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Ignored load tests in courier_core
    LoadTest,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CiJob {
    /// fmt, clippy and tests
    Check,
    /// example scenario and CLI smoke run
    Examples,
    All,
}

fn cargo(label: &str, args: &[&str]) {
    eprintln!("\n=== {label} ===\n+ cargo {}", args.join(" "));
    let status = match Command::new("cargo").args(args).status() {
        Ok(status) => status,
        Err(err) => {
            eprintln!("cannot run cargo: {err}");
            exit(1);
        }
    };
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn courier(label: &str, args: &[&str]) {
    let mut full = vec!["run", "-p", "courier_cli", "--release", "--"];
    full.extend_from_slice(args);
    cargo(label, &full);
}

fn bench(save: Option<&str>, against: Option<&str>) {
    let mut args = vec!["bench", "-p", "courier_core", "--bench", "performance"];
    match (save, against) {
        (Some(name), _) => args.extend(["--", "--save-baseline", name]),
        (None, Some(name)) => args.extend(["--", "--baseline", name]),
        (None, None) => {}
    }
    cargo("benchmarks", &args);
}

fn ci(job: CiJob) {
    if matches!(job, CiJob::Check | CiJob::All) {
        cargo("format", &["fmt", "--all", "--", "--check"]);
        cargo(
            "clippy",
            &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        );
        cargo("tests", &["test", "--workspace"]);
    }
    if matches!(job, CiJob::Examples | CiJob::All) {
        cargo(
            "scenario example",
            &["run", "-p", "courier_core", "--example", "scenario_run", "--release"],
        );
        courier("route smoke run", &["route", "--target", "5,5", "--target", "0,9"]);
    }
}

fn main() {
    match Cli::parse().command {
        Task::Simulate { seed, ticks } => {
            let (seed, ticks) = (seed.to_string(), ticks.to_string());
            courier(
                "simulate",
                &[
                    "run", "--seed", &seed, "--ticks", &ticks, "--auto-orders", "0",
                    "--until-settled",
                ],
            );
        }
        Task::Compare { wall_density, seed } => {
            let (density, seed) = (wall_density.to_string(), seed.to_string());
            courier(
                "compare",
                &[
                    "compare", "--rows", "40", "--cols", "40", "--wall-density", &density,
                    "--seed", &seed,
                ],
            );
        }
        Task::Bench { save, against } => bench(save.as_deref(), against.as_deref()),
        Task::Ci { job } => {
            ci(job);
            eprintln!("\nCI job passed.");
        }
        Task::LoadTest => cargo(
            "load tests",
            &["test", "-p", "courier_core", "--test", "load_tests", "--", "--ignored"],
        ),
    }
}
