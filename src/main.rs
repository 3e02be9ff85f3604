use std::process::ExitCode;

use clap::Parser;

use instafilter::cli::{self, CliArgs};

fn main() -> ExitCode {
    cli::run(CliArgs::parse())
}
