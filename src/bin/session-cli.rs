use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(name = "session-cli")]
#[command(about = "Client for the search session proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session, optionally seeded with NAME=VALUE cookies
    Create {
        #[arg(short, long = "cookie", value_parser = parse_pair)]
        cookies: Vec<(String, String)>,
    },
    /// Run a search through the proxy
    Search {
        /// Query text
        query: String,

        /// Session to search under
        #[arg(short, long)]
        session: Option<String>,

        /// Path the proxy forwards from
        #[arg(long, default_value = "/search")]
        mount: String,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    match cli.command {
        Commands::Create { cookies } => {
            let cookies: BTreeMap<_, _> = cookies.into_iter().collect();
            let res = client
                .post(format!("{}/create-session", cli.url))
                .json(&serde_json::json!({ "cookies": cookies }))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Search { query, session, mount } => {
            let mut headers = HeaderMap::new();
            if let Some(id) = session {
                headers.insert(COOKIE, HeaderValue::from_str(&format!("sessionId={id}"))?);
            }
            let res = client
                .get(format!("{}{}", cli.url, mount))
                .query(&[("q", query)])
                .headers(headers)
                .send()
                .await?;

            println!("{}", res.status());
            for value in res.headers().get_all(SET_COOKIE) {
                println!("set-cookie: {}", value.to_str().unwrap_or("<binary>"));
            }
            let body = res.text().await?;
            println!("{} bytes", body.len());
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
