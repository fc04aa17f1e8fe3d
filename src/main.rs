use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use unfurl::config::Config;
use unfurl::{Extractor, RequestOptions};

/// Fetch web pages and print their link-preview metadata as JSON.
#[derive(Debug, Parser)]
#[command(name = "unfurl", version, about)]
struct Cli {
    /// Page URLs to unfurl
    #[arg(required = true)]
    urls: Vec<String>,

    /// Request timeout in seconds (overrides UNFURL_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    /// Extra request header as `Name: value`; may be repeated
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// User-Agent to send (overrides UNFURL_USER_AGENT)
    #[arg(long)]
    user_agent: Option<String>,

    /// Refuse hosts that resolve to private addresses
    #[arg(long)]
    deny_private: bool,

    /// Print one JSON document per line instead of pretty output
    #[arg(long)]
    compact: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in `{raw}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn init_tracing() {
    // JSON in production, human-readable otherwise. Logs go to stderr so
    // stdout stays valid JSON.
    let filter = EnvFilter::try_from_env("UNFURL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("unfurl=info"));

    if std::env::var("APP_ENV").as_deref() == Ok("production") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn request_options(cli: &Cli, config: &Config) -> RequestOptions {
    let mut options = config.request_options();
    if let Some(secs) = cli.timeout {
        options.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(ua) = &cli.user_agent {
        options.user_agent = Some(ua.clone());
    }
    options.headers.extend(cli.headers.iter().cloned());
    options.deny_private_addresses |= cli.deny_private;
    options
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env();
    let options = request_options(&cli, &config);
    let extractor = Extractor::http();

    let mut failed = false;
    for url in &cli.urls {
        match extractor.extract(url, Some(&options)).await {
            Ok(result) => {
                let rendered = if cli.compact {
                    serde_json::to_string(&result)
                } else {
                    serde_json::to_string_pretty(&result)
                };
                match rendered {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        tracing::error!(error = %e, url = %url, "Failed to serialize result");
                        failed = true;
                    }
                }
            }
            Err(e) => {
                eprintln!("unfurl: {url}: {e}");
                failed = true;
            }
        }
    }

    info!(count = cli.urls.len(), failed, "Done");
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
