use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the fleet gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full status snapshot (breaker states, window counts, health)
    Status,
    /// One line per service: circuit breaker state
    Breakers,
    /// One line per service: advisory health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/gateway/status", cli.url))
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;

    match cli.command {
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Breakers => {
            for svc in services(&json) {
                println!(
                    "{:<16} {}",
                    svc["name"].as_str().unwrap_or("?"),
                    svc["breaker"].as_str().unwrap_or("?")
                );
            }
        }
        Commands::Health => {
            for svc in services(&json) {
                let healthy = match svc["healthy"].as_bool() {
                    Some(true) => "healthy",
                    Some(false) => "unhealthy",
                    None => "unknown",
                };
                println!("{:<16} {}", svc["name"].as_str().unwrap_or("?"), healthy);
            }
        }
    }

    Ok(())
}

fn services(json: &Value) -> impl Iterator<Item = &Value> {
    json["services"].as_array().into_iter().flatten()
}
