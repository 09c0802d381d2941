//! Cloud balancing with a seeded hill climber.
//!
//! ```text
//! cargo run -p cloud-balancing -- [director.toml] [constraints.toml]
//! ```
//!
//! Without a constraints file the built-in constraint streams are used. Set
//! `RUST_LOG=scoreforge_scoring=debug` to see network and session events.

mod constraints;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scoreforge::{
    load_constraints, ConstraintSessionFactory, DirectorConfig, FunctionRegistry, HardSoftScore,
    ScoreDirector, ScoreForgeError,
};
use scoreforge_test::cloud::CloudBalance;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const SEED: u64 = 37;
const COMPUTERS: usize = 8;
const PROCESSES: usize = 40;
const STEPS: usize = 2_000;

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<(), ScoreForgeError> {
    init_tracing();
    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => DirectorConfig::load(path)?,
        None => DirectorConfig::default(),
    };
    let constraints = match args.next() {
        Some(path) => load_constraints::<HardSoftScore>(path)?,
        None => constraints::define_constraints(),
    };

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut solution = CloudBalance::generate(COMPUTERS, PROCESSES, SEED);
    for process in 0..PROCESSES {
        solution.assign(process, Some(rng.random_range(0..COMPUTERS)));
    }
    let sessions = ConstraintSessionFactory::new(constraints, FunctionRegistry::new())?;
    info!(
        event = "solve_start",
        computer_count = COMPUTERS,
        process_count = PROCESSES,
        node_count = sessions.network().node_count(),
        environment_mode = ?config.environment_mode,
    );

    let mut director = ScoreDirector::with_config(sessions, solution, config)?;
    let mut best = director.calculate_score()?;
    let mut accepted = 0usize;

    for step in 0..STEPS {
        let process = rng.random_range(0..PROCESSES);
        let computer = Some(rng.random_range(0..COMPUTERS));
        let previous = director.solution().processes[process].computer;
        if previous == computer {
            continue;
        }

        let key = director.solution().processes[process].key();
        director.before_variable_changed(key)?;
        director.solution_mut().processes[process].computer = computer;
        director.after_variable_changed(key)?;
        let score = director.calculate_score()?;

        if score >= best {
            if score > best {
                info!(event = "new_best", step, score = %score);
            }
            best = score;
            accepted += 1;
        } else {
            director.before_variable_changed(key)?;
            director.solution_mut().processes[process].computer = previous;
            director.after_variable_changed(key)?;
        }
    }

    let final_score = director.calculate_score()?;
    info!(
        event = "solve_end",
        score = %final_score,
        accepted_moves = accepted,
        calculations = director.calculation_count(),
    );
    println!("{}", director.explain()?.summary(3));
    Ok(())
}
