mod app;
mod catalog;
mod config;
mod logging;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let args = app::CliArgs::parse();
    logging::initialize(args.log, args.log_level, &args.log_file);
    app::run_app(args)
}
