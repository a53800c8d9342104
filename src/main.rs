use clap::Parser;
use whalecopy::cli::Cli;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = cli.execute().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
