mod game;
mod remote;
mod ui;

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use abalone_core::board::Board;
use abalone_core::options::{CoordinatorOptions, EngineOptions};
use abalone_core::search::StrategyKind;
use abalone_core::search::sampling::SamplingPolicy;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;

#[derive(Args, Debug, Clone)]
struct EngineParams {
    /// Deepest iterative-deepening round
    #[arg(short, long, default_value = "4")]
    depth: u32,

    /// First distributed round (at least 2)
    #[arg(long, default_value = "2")]
    min_depth: u32,

    /// Time budget per search in milliseconds
    #[arg(long = "time-ms")]
    time_ms: Option<u64>,

    /// Strategy name or index, see `abalone strategies`
    #[arg(short, long, default_value = "alphabeta-sorted")]
    strategy: StrategyKind,

    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Restrict the first ply to the best N moves
    #[arg(long)]
    samples: Option<usize>,

    /// Also keep moves within this score of the best one when sampling
    #[arg(long, default_value = "50")]
    threshold: i32,

    /// Reissue jobs unanswered for this many milliseconds (0 disables)
    #[arg(long = "lease-ms", default_value = "10000")]
    lease_ms: u64,

    /// Keep the same evaluation scheme for the whole game
    #[arg(long)]
    no_change_eval: bool,
}

impl EngineParams {
    fn to_options(&self) -> Result<EngineOptions, Box<dyn Error>> {
        let sampling = SamplingPolicy::new(
            self.samples.unwrap_or(SamplingPolicy::default().samples),
            self.threshold,
        );
        let lease = (self.lease_ms > 0).then(|| Duration::from_millis(self.lease_ms));
        let coordinator = CoordinatorOptions::default()
            .with_depths(self.min_depth, self.depth)
            .with_lease_timeout(lease)
            .with_sampling(self.samples.map(|_| sampling));
        let mut options = EngineOptions::default()
            .with_workers(self.workers)
            .with_strategy(self.strategy)
            .with_sampling(sampling)
            .with_change_eval(!self.no_change_eval)
            .with_coordinator(coordinator);
        if let Some(ms) = self.time_ms {
            options = options.with_move_time(Duration::from_millis(ms));
        }
        options.validate()?;
        Ok(options)
    }

    fn budget(&self) -> Option<Duration> {
        self.time_ms.map(Duration::from_millis)
    }
}

#[derive(Args, Debug, Clone)]
struct PositionParams {
    /// Board state string: 61 cells, side to move, move number and clocks
    #[arg(long, conflicts_with = "file")]
    state: Option<String>,

    /// File holding a board state string
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    file: Option<PathBuf>,
}

impl PositionParams {
    fn load(&self) -> Result<Board, Box<dyn Error>> {
        if let Some(state) = &self.state {
            return Ok(Board::from_state_str(state)?);
        }
        if let Some(path) = &self.file {
            let text = fs::read_to_string(path)?;
            return Ok(Board::from_state_str(text.trim())?);
        }
        Ok(Board::new())
    }
}

#[derive(Parser, Debug)]
#[command(name = "abalone", version, about = "Distributed Abalone search engine")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Search one position with local worker threads
    Search {
        #[command(flatten)]
        position: PositionParams,

        #[command(flatten)]
        engine_params: EngineParams,
    },
    /// Let two engines play each other
    Selfplay {
        /// Stop after each side played this many moves
        #[arg(long)]
        moves: Option<u32>,

        /// Initial clock of each side in milliseconds
        #[arg(long, default_value = "300000")]
        clock_ms: i32,

        #[command(flatten)]
        engine_params: EngineParams,
    },
    /// Search one position with workers connecting over TCP
    Coordinator {
        #[arg(long, default_value = "127.0.0.1:7070")]
        listen: String,

        #[command(flatten)]
        position: PositionParams,

        #[command(flatten)]
        engine_params: EngineParams,
    },
    /// Serve jobs for a TCP coordinator
    Worker {
        #[arg(long, default_value = "127.0.0.1:7070")]
        connect: String,

        #[command(flatten)]
        engine_params: EngineParams,
    },
    /// List the search strategies
    Strategies,
}

fn main() {
    let args = Cli::parse();
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(err) = run(args.command) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(command: SubCommands) -> Result<(), Box<dyn Error>> {
    match command {
        SubCommands::Search {
            position,
            engine_params,
        } => {
            let board = position.load()?;
            let options = engine_params.to_options()?;
            game::search(&board, &options, engine_params.budget())
        }
        SubCommands::Selfplay {
            moves,
            clock_ms,
            engine_params,
        } => {
            let options = engine_params.to_options()?.with_max_moves(moves);
            game::selfplay(&options, clock_ms)
        }
        SubCommands::Coordinator {
            listen,
            position,
            engine_params,
        } => {
            let board = position.load()?;
            let options = engine_params.to_options()?;
            remote::coordinate(&listen, &board, &options, engine_params.budget())
        }
        SubCommands::Worker {
            connect,
            engine_params,
        } => {
            let options = engine_params.to_options()?;
            remote::serve(&connect, &options)
        }
        SubCommands::Strategies => {
            ui::print_strategies();
            Ok(())
        }
    }
}
