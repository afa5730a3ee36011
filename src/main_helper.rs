use crate::constants::{API_TOKEN_ENV, DEBUG_LOG_FILTER, DEFAULT_LOG_FILTER};
use crate::types::*;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// SSE endpoint to GET.
    #[arg(long, conflicts_with = "input")]
    pub url: Option<String>,
    /// Captured SSE transcript to render instead; `-` reads stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub no_color: bool,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    /// Write the log as JSON lines.
    #[arg(long, default_value_t = false)]
    pub log_json: bool,
    /// Where the log file goes. Defaults to the system temp dir.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Url(String),
    File(PathBuf),
    Stdin,
}

impl Args {
    pub fn input_source(&self) -> Result<InputSource> {
        match (&self.url, &self.input) {
            (Some(url), None) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(SleuthError::Config(format!("not an http(s) url: {}", url)).into());
                }
                Ok(InputSource::Url(url.clone()))
            }
            (None, Some(path)) if path.as_os_str() == "-" => Ok(InputSource::Stdin),
            (None, Some(path)) => Ok(InputSource::File(path.clone())),
            (None, None) => Err(SleuthError::Config(
                "one of --url or --input is required".to_string(),
            )
            .into()),
            (Some(_), Some(_)) => Err(SleuthError::Config(
                "--url and --input are mutually exclusive".to_string(),
            )
            .into()),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir(),
        }
    }

    /// `RUST_LOG` wins; otherwise info, or debug with `--debug`.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            DEBUG_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }
}

/// Bearer token from the environment, ignoring an empty value.
pub fn api_token() -> Option<String> {
    match std::env::var(API_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
        _ => None,
    }
}

/// Streams run for as long as the server keeps talking, so only connecting
/// is bounded.
pub fn build_client(args: &Args) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(args.connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()?;
    Ok(client)
}
