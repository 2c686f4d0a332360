use anyhow::{bail, Result};
use clap::Parser;
use reqwest::Url;
use serde_json::Value;

#[derive(Parser)]
#[command(author, version, about = "Probe a running relay's health endpoint", long_about = None)]
struct Args {
    /// Health endpoint of the relay, e.g. http://127.0.0.1:8001/health
    url: String,

    /// Also fail when the relay reports its upstream as disconnected
    #[arg(long)]
    require_upstream: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let url = Url::parse(&args.url)?;

    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        bail!("Request failed with status {}", response.status());
    }

    if args.require_upstream {
        let body: Value = response.json()?;
        let upstream = body["colab_status"].as_str().unwrap_or("unknown");
        if upstream != "connected" {
            bail!("Upstream is {}", upstream);
        }
    }

    Ok(())
}
