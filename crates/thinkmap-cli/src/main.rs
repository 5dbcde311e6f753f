//! Thinkmap CLI - validate, template and generate thinking-map diagram specs

mod cli;
mod colorizer;

use clap::Parser;
use thinkmap::core::logging::init_logging;

fn main() {
    let cli_args = cli::Cli::parse();

    let level = cli_args.effective_log_level();
    let format = cli_args.log_format.map(|f| f.as_str());
    if let Err(e) = init_logging(level, format) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let mut app = cli::ThinkmapApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
