use std::path::PathBuf;
use std::sync::Arc;

use bake_address::{loader, Flags};
use bake_diagnostic::Diagnostics;
use bake_lock::Lock;
use clap::{Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_DIAGNOSTIC: i32 = 2;
pub const EXIT_OTHER: i32 = 3;
pub const EXIT_INTERNAL: i32 = 11;

#[derive(Parser)]
#[command(name = "bake", version, about = "A declarative build-task orchestrator")]
pub struct Cli {
    /// Directory to load recipes from and to store `.bake/lock.json` under.
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print each task that carries a description, one per line.
    List,
    /// Resolve and execute a task's dependency subtree.
    Run {
        task: String,

        #[arg(long, conflicts_with = "force")]
        dry: bool,

        #[arg(long)]
        prune: bool,

        #[arg(long, conflicts_with = "dry")]
        force: bool,

        #[arg(long, default_value_t = bake_coordinator::DEFAULT_JOBS)]
        jobs: usize,
    },
}

pub async fn run_cli(cli: Cli) -> i32 {
    let cwd = match cli.cwd {
        Some(cwd) => cwd,
        None => match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(e) => {
                eprintln!("error: failed to determine the current directory: {e}");
                return EXIT_OTHER;
            }
        },
    };

    match cli.command {
        Command::List => list(&cwd),
        Command::Run { task, dry, prune, force, jobs } => {
            run_task(&cwd, &task, Flags { dry, prune, force }, jobs).await
        }
    }
}

fn list(cwd: &std::path::Path) -> i32 {
    let partials = match loader::load_recipes(cwd) {
        Ok(partials) => partials,
        Err(diagnostics) => return report(&diagnostics),
    };

    for partial in &partials {
        if let Some((name, description)) = bake_address::describe_task(&partial) {
            println!("{name}\t{description}");
        }
    }
    EXIT_SUCCESS
}

async fn run_task(cwd: &std::path::Path, task: &str, flags: Flags, jobs: usize) -> i32 {
    let partials = match loader::load_recipes(cwd) {
        Ok(partials) => partials,
        Err(diagnostics) => return report(&diagnostics),
    };

    let lock = match Lock::load(cwd, VERSION) {
        Ok(lock) => lock,
        Err(diagnostics) => return report(&diagnostics),
    };
    let prior_lock = Arc::new(lock.clone());

    let result = bake_coordinator::run(task, partials, cwd.to_path_buf(), flags, prior_lock, jobs).await;

    let exit_code = report(&result.diagnostics);
    if result.diagnostics.has_errors() {
        return exit_code;
    }

    if !flags.dry {
        if let Err(diagnostics) = bake_coordinator::update_lock(VERSION, cwd, lock, &result.actions) {
            return report(&diagnostics);
        }
    }

    EXIT_SUCCESS
}

fn report(diagnostics: &Diagnostics) -> i32 {
    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
    if diagnostics.has_errors() {
        EXIT_DIAGNOSTIC
    } else {
        EXIT_SUCCESS
    }
}
