mod args;
mod context;
mod render;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dropconv_core::{load_config_or_default, metrics, validate_config};

use args::Args;
use context::AppContext;
use render::Renderer;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.json, args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(json: bool, verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so stdout carries only event lines.
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Returns whether every path converted.
async fn run(args: Args) -> Result<bool> {
    let config = load_config_or_default(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load config from environment".to_string(),
    })?;
    validate_config(&config).context("Configuration validation failed")?;

    let (ctx, mut events) = AppContext::new(config);
    info!(
        "Using {} (temp dir {:?})",
        ctx.config().converter.ffmpeg_path.display(),
        ctx.config().converter.temp_dir
    );

    if !args.no_preflight {
        ctx.preflight()
            .await
            .context("Encoder is not usable, no files were converted")?;
    }

    let mut renderer = Renderer::new(args.json);
    ctx.dispatcher().submit(&args.files).await;

    let interrupted = {
        let wait = ctx.dispatcher().wait_all();
        tokio::pin!(wait);
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    if let Some(line) = renderer.render(&event) {
                        println!("{}", line);
                    }
                }
                _ = &mut wait => break false,
                _ = &mut shutdown => break true,
            }
        }
    };

    if interrupted {
        warn!("Interrupted, stopping running conversions");
        ctx.dispatcher().shutdown().await;
    }

    // Everything still queued was sent before the jobs were reported.
    while let Ok(event) = events.try_recv() {
        if let Some(line) = renderer.render(&event) {
            println!("{}", line);
        }
    }

    if args.json {
        info!("{}", renderer.summary_line());
    } else {
        println!("{}", renderer.summary_line());
    }

    if args.metrics {
        print!("{}", metrics::render_metrics());
    }

    Ok(!interrupted && !renderer.summary().has_failures())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
