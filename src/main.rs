use clap::Parser;
use colored::*;
use djmake::cli;
use log::info;

fn main() {
    let args = cli::Args::parse();
    cli::init_logging(&args);
    info!("Starting djmake v{}", env!("CARGO_PKG_VERSION"));

    let code = match cli::run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            1
        }
    };
    std::process::exit(code);
}
