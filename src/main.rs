//! suiterun - discover, provision and run a directory of unittest modules
//!
//! Collects every `test_*.py` module of a directory into one suite and runs
//! it, or installs the suite's test dependencies with `--install-deps`.

use clap::Parser;
use suiterun::commands::Options;
use suiterun::{cli, common::logging};

#[derive(Parser)]
#[command(name = "suiterun", about = "run unit tests")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: Options,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    match cli::dispatch(cli.options).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
