use clap::Parser;
use kiln::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
