use clap::Parser;

use codex_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    codex_cli::logging::init(cli.verbose);

    let mut stdout = std::io::stdout();
    if let Err(e) = codex_cli::dispatch(cli, &mut stdout).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
