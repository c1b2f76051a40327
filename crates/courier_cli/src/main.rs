use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use courier_core::dispatch::DispatchMode;
use courier_core::grid::GridPos;
use courier_core::search::SearchStrategy;
use tracing_subscriber::EnvFilter;

mod commands;
mod scenarios;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "courier",
    about = "Grid delivery simulation: riders, hotels, homes and orders",
    long_about = "Run the tick-based delivery simulation, compare search strategies on a\n\
                  grid, or plan a multi-stop route."
)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a scenario and run the simulation
    Run(RunArgs),
    /// Run every search strategy over the same route and report effort
    Compare(CompareArgs),
    /// Plan a multi-stop route from a start cell
    Route(RouteArgs),
    /// Print scenario parameters as JSON (a template for --config)
    Scenario(ScenarioArgs),
}

/// Overrides applied on top of defaults or a `--config` file.
#[derive(Args, Clone, Default)]
struct ScenarioOverrides {
    /// JSON file with scenario parameters
    #[arg(long, env = "COURIER_CONFIG")]
    config: Option<std::path::PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    rows: Option<i32>,
    #[arg(long)]
    cols: Option<i32>,
    #[arg(long)]
    riders: Option<usize>,
    #[arg(long)]
    hotels: Option<usize>,
    #[arg(long)]
    homes: Option<usize>,
    /// Fraction of free cells turned into walls
    #[arg(long)]
    wall_density: Option<f64>,
    /// Cells per tick
    #[arg(long)]
    speed: Option<f64>,
    #[arg(long)]
    tick_ms: Option<u64>,
    #[arg(long)]
    cooking_ms: Option<u64>,
    /// efficiency or fairness
    #[arg(long)]
    dispatch: Option<DispatchMode>,
    /// dijkstra, greedy or astar
    #[arg(long)]
    strategy: Option<SearchStrategy>,
    /// Ticks between automatic orders (0 disables)
    #[arg(long)]
    auto_orders: Option<u64>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    scenario: ScenarioOverrides,
    /// Ticks to run
    #[arg(long, default_value_t = 2_000)]
    ticks: u64,
    /// Stop early once every order is delivered and every rider is idle
    #[arg(long)]
    until_settled: bool,
    /// Pace ticks to the tick period in wall time
    #[arg(long)]
    realtime: bool,
    /// Print a JSON snapshot every N ticks
    #[arg(long)]
    snapshot_every: Option<u64>,
    /// Print the final snapshot as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CompareArgs {
    #[arg(long, default_value_t = 20)]
    rows: i32,
    #[arg(long, default_value_t = 20)]
    cols: i32,
    /// Wall cell as "row,col" (repeatable)
    #[arg(long = "wall")]
    walls: Vec<GridPos>,
    /// Random wall density, seeded by --seed
    #[arg(long, default_value_t = 0.0)]
    wall_density: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value = "0,0")]
    start: GridPos,
    #[arg(long)]
    end: Option<GridPos>,
    /// Intermediate stop as "row,col" (repeatable, visited in order)
    #[arg(long = "waypoint")]
    waypoints: Vec<GridPos>,
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum RouteModeArg {
    #[default]
    NearestNeighbor,
    Exact,
}

#[derive(Args)]
struct RouteArgs {
    #[arg(long, default_value_t = 20)]
    rows: i32,
    #[arg(long, default_value_t = 20)]
    cols: i32,
    #[arg(long = "wall")]
    walls: Vec<GridPos>,
    #[arg(long, default_value = "0,0")]
    start: GridPos,
    /// Stop as "row,col" (repeatable)
    #[arg(long = "target", required = true)]
    targets: Vec<GridPos>,
    #[arg(value_enum, long, default_value_t = RouteModeArg::NearestNeighbor)]
    mode: RouteModeArg,
    #[arg(long, default_value_t = SearchStrategy::AStar)]
    strategy: SearchStrategy,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ScenarioArgs {
    #[command(flatten)]
    scenario: ScenarioOverrides,
    /// Also build the world and print its initial snapshot
    #[arg(long)]
    build: bool,
}

// ── entry point ────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run(args),
        Commands::Compare(args) => commands::compare(args),
        Commands::Route(args) => commands::route(args),
        Commands::Scenario(args) => commands::scenario(args),
    }
}
