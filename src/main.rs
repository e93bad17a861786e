use clap::Parser;
use shockwise::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
