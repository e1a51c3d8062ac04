use clap::{Parser, Subcommand};
use reqwest::Url;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command line client for the ledger gateway JSON API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// CA certificate for an HTTPS gateway
    #[arg(long)]
    ca: Option<std::path::PathBuf>,

    /// Client certificate and key (PEM, concatenated) for mutual TLS
    #[arg(long)]
    identity: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Round-trip a message through the gateway
    Echo { message: String },
    /// Show backend connection state
    Status,
    /// Evaluate a transaction without committing it
    Query(TxArgs),
    /// Submit a transaction
    Invoke(TxArgs),
}

#[derive(clap::Args)]
struct TxArgs {
    /// Chaincode to call
    #[arg(long = "chaincode")]
    chaincode_id: String,
    transaction: String,
    parameter: Vec<String>,

    /// Endorsing peers
    #[arg(long = "endorser")]
    endorsers: Vec<String>,

    /// Per-call deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<i64>,
}

impl TxArgs {
    fn body(&self) -> Value {
        json!({
            "chaincode_id": self.chaincode_id,
            "transaction": self.transaction,
            "parameter": self.parameter,
            "endorser": self.endorsers,
            "timeout_ms": self.timeout_ms.unwrap_or(0),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut builder = reqwest::Client::builder();
    if let Some(path) = &cli.ca {
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&std::fs::read(path)?)?);
    }
    if let Some(path) = &cli.identity {
        builder = builder.identity(reqwest::Identity::from_pem(&std::fs::read(path)?)?);
    }
    let client = builder.build()?;
    let base = Url::parse(&cli.url)?.join("/v1/")?;

    let res = match &cli.command {
        Commands::Echo { message } => {
            client
                .get(base.join("echo")?)
                .query(&[("message", message)])
                .send()
                .await?
        }
        Commands::Status => client.get(base.join("status")?).send().await?,
        Commands::Query(args) => client.post(base.join("query")?).json(&args.body()).send().await?,
        Commands::Invoke(args) => client.post(base.join("invoke")?).json(&args.body()).send().await?,
    };

    if !print_response(res).await? {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
        return Ok(false);
    }

    println!("{}", rendered);
    Ok(true)
}
