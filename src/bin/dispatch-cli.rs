use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "dispatch-cli")]
#[command(about = "Management CLI for the cascade-dispatch admin API", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key.
    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check engine status
    Status,
    /// Internal dispatch counts per URI
    Calls,
    /// Configured hooks and their handlers
    Hooks,
    /// List cached handler outputs
    Cache,
    /// Purge one cached handler output
    Purge {
        /// Cache key, e.g. `blog_post` for handler `blog/post`
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = match &cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string()),
        Commands::Calls => (Method::GET, "/admin/calls".to_string()),
        Commands::Hooks => (Method::GET, "/admin/hooks".to_string()),
        Commands::Cache => (Method::GET, "/admin/cache".to_string()),
        Commands::Purge { key } => (Method::DELETE, format!("/admin/cache/{key}")),
    };

    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    match status {
        StatusCode::NO_CONTENT => {
            println!("Purged");
            return Ok(());
        }
        StatusCode::NOT_FOUND => {
            eprintln!("Not found");
            return Ok(());
        }
        s if !s.is_success() => {
            eprintln!("Error: Admin API returned status {}", status);
            if let Ok(text) = res.text().await {
                eprintln!("Response: {}", text);
            }
            return Ok(());
        }
        _ => {}
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
