use std::process::ExitCode;

use bake::{Cli, EXIT_INTERNAL};
use clap::Parser;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start the async runtime: {e}");
            return ExitCode::from(EXIT_INTERNAL as u8);
        }
    };

    let code = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| runtime.block_on(bake::run_cli(cli))))
    {
        Ok(code) => code,
        Err(_) => {
            eprintln!("error: bake panicked; this is a bug");
            EXIT_INTERNAL
        }
    };

    ExitCode::from(code as u8)
}
