//! CLI entry point for cubing image tiles into WKW datasets

use clap::Parser;
use wkcuber::io::cli::{Cli, Runner};

fn main() -> wkcuber::Result<()> {
    let cli = Cli::parse();
    let mut runner = Runner::new(cli);
    runner.run()
}
