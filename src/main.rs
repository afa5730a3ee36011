#![allow(clippy::manual_unwrap_or_default)]
#![allow(clippy::manual_unwrap_or)]
use sleuth::client::open_event_stream;
use sleuth::console::Console;
use sleuth::constants::LOG_FILE_NAME;
use sleuth::main_helper::{api_token, build_client, InputSource};
use sleuth::redaction_layer::RedactingWriter;
use sleuth::streaming::{stream_to_terminal, StreamHandler};
use sleuth::*;

use clap::Parser;
use colored::*;
use std::io::IsTerminal;
use tokio::io::AsyncRead;
use tracing_subscriber::Layer;

type ByteSource = Box<dyn AsyncRead + Unpin + Send>;

async fn open_input(args: &Args) -> Result<ByteSource> {
    match args.input_source()? {
        InputSource::Url(url) => {
            let client = build_client(args)?;
            let token = api_token();
            let reader = open_event_stream(&client, &url, token.as_deref()).await?;
            Ok(Box::new(reader))
        }
        InputSource::File(path) => {
            tracing::info!("[INPUT] reading transcript {}", path.display());
            let file = tokio::fs::File::open(&path).await?;
            Ok(Box::new(file))
        }
        InputSource::Stdin => {
            tracing::info!("[INPUT] reading stdin");
            Ok(Box::new(tokio::io::stdin()))
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let stdout = std::io::stdout();
    let interactive = stdout.is_terminal();
    let mut handler = StreamHandler::new(Console::new(stdout, interactive));

    let reader = open_input(args).await?;

    let outcome = tokio::select! {
        outcome = stream_to_terminal(reader, &mut handler) => Some(outcome?),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(outcome) => tracing::info!("[MAIN] stream ended: {:?}", outcome),
        None => {
            tracing::warn!("[MAIN] interrupted");
            handler.finish()?;
        }
    }

    tracing::info!(
        "[MAIN] final answer {} bytes, session {}",
        handler.final_answer().len(),
        handler.session_uuid().unwrap_or("unknown")
    );
    if let Some(uuid) = handler.session_uuid() {
        eprintln!("{}", format!("session {}", uuid).dimmed());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    use tracing_subscriber::prelude::*;

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => args.default_log_filter().into(),
    };

    let log_dir = args.log_dir();
    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking, _guard) = tracing_appender::non_blocking(RedactingWriter::new(file_appender));

    let fmt_layer = if args.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    sleuth::logging::setup_panic_hook();

    if args.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    tracing::info!(
        "[MAIN] sleuth {} logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.join(LOG_FILE_NAME).display()
    );

    let code = match run(&args).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("[MAIN] fatal: {}", e);
            eprintln!("{} {}", "error:".red().bold(), e.inner);
            1
        }
    };

    // exit() skips destructors; flush the log writer first.
    drop(_guard);
    std::process::exit(code);
}
