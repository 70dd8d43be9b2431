use clap::Parser;
use lotfolio::cli::command::Cli;
use lotfolio::cli::output;

fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = lotfolio::cli::run(cli) {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
