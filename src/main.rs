use chat_bridge::cli::Args;
use chat_bridge::{ run, run_history };
use clap::Parser;
use dotenv::dotenv;
use std::process;
use tokio::io::AsyncReadExt;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv().ok();
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Some(command) = args.command.clone() {
        let outcome = run_history(&args, &command).await;
        println!("{}", outcome.output);
        process::exit(outcome.exit_code);
    }

    let mut input = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut input).await {
        log::error!("Failed to read stdin: {}", e);
    }

    let outcome = run(args, &input).await;
    println!("{}", outcome.output);
    if outcome.exit_code != 0 {
        process::exit(outcome.exit_code);
    }
}
