use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

mod abbr;
mod cli;
mod commands;
mod config;
mod llm;
mod markdown;
mod preparse;
mod prompt;
mod storage;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let split = preparse::grammar_end(&args, &cli::registry());
    let (grammar, free_text) = args.split_at(split.min(args.len()));
    tracing::debug!(?grammar, ?free_text, "split command line");

    // help, version and usage errors exit here
    let matches = match cli::build().try_get_matches_from(grammar) {
        Ok(matches) => matches,
        Err(e) => e.exit(),
    };

    if let Err(e) = commands::dispatch(&matches, free_text).await {
        eprintln!("{}: {:#}", cli::BIN_NAME, e);
        process::exit(1);
    }
}
