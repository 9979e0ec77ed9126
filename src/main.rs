use clap::{CommandFactory, Parser};
use cli::Cli;

mod cli;

fn main() {
    // Bare invocation gets the help text on stdout, but still counts as a
    // failure. clap's own no-argument handling would exit zero.
    if std::env::args().len() <= 1 {
        let _ = Cli::command().print_help();
        std::process::exit(1);
    }

    let args = Cli::parse();

    if let Err(e) = cli::run(args) {
        eprintln!("an error occurred: {e:#}");
        std::process::exit(1);
    }
}
