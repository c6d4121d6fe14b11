use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "vote-cli")]
#[command(about = "Client CLI for the vote-integrity server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vote totals and session counts
    Stats,
    /// Public key for the challenge widget
    SiteKey,
    /// Request a session token for a visitor
    Token {
        #[arg(long)]
        visitor_id: String,
        #[arg(long, default_value = "")]
        local_id: String,
    },
    /// Submit a vote with a previously issued token
    Vote {
        #[arg(long)]
        contestant: String,
        #[arg(long)]
        fingerprint: String,
        #[arg(long)]
        token: String,
        /// reCAPTCHA response for suspicious sessions
        #[arg(long)]
        proof: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Stats => {
            let res = client.get(format!("{}/stats", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::SiteKey => {
            let res = client.get(format!("{}/captcha/site-key", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Token { visitor_id, local_id } => {
            let res = client
                .get(format!("{}/token", cli.url))
                .query(&[("visitorId", visitor_id), ("localId", local_id)])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Vote { contestant, fingerprint, token, proof } => {
            let body = json!({
                "contestant": contestant,
                "fingerprint": fingerprint,
                "recaptcha_token": proof,
            });
            let res = client
                .post(format!("{}/vote", cli.url))
                .header("x-vote-token", token)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
