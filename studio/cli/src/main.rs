//! appstudio
//!
//! Describe an app in plain language, watch its source stream in, then refine
//! it with follow-up instructions.
//!
//! # Usage
//!
//! ```bash
//! # Generate a React app and write it to ./out/App.tsx
//! appstudio --out out "Build me a calculator app"
//!
//! # Generate, then apply two revisions
//! appstudio --framework vue --revise "make it pink" --revise "bigger buttons" "a todo list"
//!
//! # Interactive: revisions are read from stdin, one per line
//! appstudio --out out "a landing page for a bakery"
//!
//! # Offline, from a recorded event stream
//! appstudio --replay transcript.sse "anything"
//!
//! # With verbose logging
//! RUST_LOG=debug appstudio "a snake game"
//! ```
//!
//! # Interactive Commands
//!
//! - `:new`: discard the app; the next line starts a new one
//! - `:quit`: exit
//!
//! # Signals
//!
//! - SIGINT (Ctrl-C): cancel the generation in flight, or exit when idle

mod catalog;
mod driver;
mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use appstudio_core::backend::{GenerationBackend, HttpBackend, ReplayBackend, Transcript};
use appstudio_core::config::{default_config_path, load_config_from_path, ConfigOverrides};
use appstudio_core::{CancelHandle, Studio, StudioConfigFile, StudioMessage};

use crate::catalog::{model_label, resolve_model, Framework};
use crate::driver::Driver;
use crate::render::Renderer;

/// Describe an app, stream its source, refine it
#[derive(Debug, Parser)]
#[command(name = "appstudio", version, about)]
struct Args {
    /// What to build
    prompt: Option<String>,

    /// Configuration file (default: $XDG_CONFIG_HOME/appstudio/studio.toml)
    #[arg(long, env = "APPSTUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// Generation endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Model: a catalogue key (dobby, llama-405b) or a full model id
    #[arg(long)]
    model: Option<String>,

    /// Target framework
    #[arg(long, value_enum)]
    framework: Option<Framework>,

    /// Directory the artifact is written to (default: print to stdout)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Replay a recorded event stream instead of calling the endpoint
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Revision to apply after creation (repeatable, disables stdin)
    #[arg(long, value_name = "PROMPT")]
    revise: Vec<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref endpoint) = self.endpoint {
            overrides = overrides.with_endpoint(endpoint.clone());
        }
        if let Some(ref model) = self.model {
            overrides = overrides.with_default_model(resolve_model(model));
        }
        if let Some(framework) = self.framework {
            overrides = overrides.with_default_framework(framework.as_str().to_string());
        }
        overrides
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("appstudio=info".parse()?)
                .add_directive("appstudio_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Configuration is read before the runtime starts
    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("loading configuration")?;
    args.overrides().apply(&mut config);
    config.validate()?;

    info!(
        source = %config.source(),
        endpoint = %config.endpoint,
        model = model_label(&config.default_model).unwrap_or(config.default_model.as_str()),
        framework = %config.default_framework,
        "Configuration loaded"
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting runtime")?
        .block_on(start(config, args))
}

async fn start(config: StudioConfigFile, args: Args) -> anyhow::Result<()> {
    match args.replay {
        Some(ref path) => {
            let body = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading replay file {}", path.display()))?;
            run(ReplayBackend::new(Transcript::new(body)), &config, &args).await
        }
        None => {
            let backend = HttpBackend::new(config.endpoint.clone(), config.connect_timeout)?;
            run(backend, &config, &args).await
        }
    }
}

async fn run<B: GenerationBackend>(
    backend: B,
    config: &StudioConfigFile,
    args: &Args,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel::<StudioMessage>(100);
    let renderer = Renderer::new(args.out.as_deref(), &config.default_framework);
    if let Some(target) = renderer.target() {
        info!(path = %target.display(), "Writing artifact");
    }
    let render_task = tokio::spawn(renderer.run(rx));

    let mut studio = Studio::new(backend, config.studio_config(), tx);
    info!(session = %studio.session_id(), backend = studio.backend().name(), "Studio ready");

    // Ctrl-C cancels the cycle in flight, or exits when idle
    let (armed, armed_rx) = watch::channel::<Option<CancelHandle>>(None);
    tokio::spawn(async move {
        loop {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            match armed_rx.borrow().as_ref() {
                Some(handle) => {
                    eprintln!("» Cancelling...");
                    handle.cancel();
                }
                None => std::process::exit(130),
            }
        }
    });

    let result = {
        let mut driver = Driver::new(
            &mut studio,
            armed,
            config.default_model.clone(),
            config.default_framework.clone(),
        );
        let stdin = BufReader::new(tokio::io::stdin());
        driver.drive(args.prompt.as_deref(), &args.revise, stdin).await
    };

    // Closing the channel lets the renderer finish its writes
    drop(studio);
    if let Err(e) = render_task.await {
        warn!(error = %e, "Renderer task failed");
    }
    result
}
