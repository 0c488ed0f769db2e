//! Binary entrypoint for the photostrip pipeline.
//!
//! Stands in for the booth UI: fills the session store, picks a background and
//! saves the rendered strip. All logic lives in the library crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use clap::{ArgAction, Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_photostrip::compositor::Compositor;
use rust_photostrip::config::Configuration;
use rust_photostrip::events::{PreviewEvent, RenderRequest};
use rust_photostrip::export;
use rust_photostrip::processing::filters::FilterSettings;
use rust_photostrip::processing::layout::CanvasConfig;
use rust_photostrip::session::{CaptureSession, SessionStore};
use rust_photostrip::tasks::loader::DecodingLoader;
use rust_photostrip::tasks::renderer;

#[derive(Debug, Parser)]
#[command(name = "photostrip", version, about = "Compose captured photos into a photostrip")]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new session from image files, one capture per file
    Capture {
        /// Photos in the strip (3 or 4)
        #[arg(long, default_value_t = 3)]
        photos: usize,
        /// Grayscale percentage
        #[arg(long, default_value_t = 0.0)]
        grayscale: f32,
        /// Brightness percentage (100 is neutral)
        #[arg(long, default_value_t = 100.0)]
        brightness: f32,
        /// Sepia percentage
        #[arg(long, default_value_t = 0.0)]
        retro: f32,
        /// Saturation percentage (100 is neutral)
        #[arg(long, default_value_t = 100.0)]
        saturate: f32,
        /// Blur radius in pixels
        #[arg(long, default_value_t = 0.0)]
        soft: f32,
        /// Record captures as not mirrored
        #[arg(long)]
        no_mirror: bool,
        #[arg(value_name = "IMAGE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Render the stored session and save it as a PNG
    Render {
        /// `#RRGGBB` colour or template reference; overrides the configured background
        #[arg(long)]
        background: Option<String>,
    },
    /// List templates offered for the stored session
    Templates,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "rust_photostrip=debug,photostrip=debug,info",
        _ => "rust_photostrip=trace,photostrip=trace,info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        verbose,
        command,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    let store = SessionStore::new(cfg.session_file.clone());

    match command {
        Command::Capture {
            photos,
            grayscale,
            brightness,
            retro,
            saturate,
            soft,
            no_mirror,
            files,
        } => {
            let mut session = CaptureSession::new(photos);
            let settings = session.settings_mut();
            settings.filters = FilterSettings {
                grayscale,
                brightness,
                retro_filter: retro,
                saturate,
                soft_filter: soft,
            };
            settings.mirrored = !no_mirror;
            for file in &files {
                let uri = data_uri_for(file)?;
                session
                    .capture(uri)
                    .with_context(|| format!("cannot capture {}", file.display()))?;
            }
            store.save(session.images())?;
            info!(
                count = session.images().len(),
                path = %store.path().display(),
                "stored capture session"
            );
        }
        Command::Render { background } => render(&cfg, &store, background).await?,
        Command::Templates => {
            let count = store.load().len();
            for entry in cfg.templates_for(count) {
                println!("{}\t{}", entry.label, entry.path);
            }
        }
    }

    Ok(())
}

async fn render(cfg: &Configuration, store: &SessionStore, background: Option<String>) -> Result<()> {
    let mut picker = cfg.background_picker()?;
    if let Some(value) = background {
        if picker.pick(&value).is_err() {
            bail!("{}", picker.error().unwrap_or("invalid background"));
        }
    }

    let images = store.load();
    let compositor = Compositor::new(CanvasConfig::STRIP, DecodingLoader::new(cfg.template_dir.clone()));

    let (req_tx, req_rx) = mpsc::channel::<RenderRequest>(4);
    let (ui_tx, mut ui_rx) = mpsc::channel::<PreviewEvent>(4);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(renderer::run(req_rx, ui_tx, cancel.clone(), compositor));

    req_tx
        .send(RenderRequest {
            images: Arc::from(images),
            background: picker.background(),
        })
        .await
        .map_err(|_| anyhow!("render task stopped early"))?;
    drop(req_tx);

    let outcome = tokio::select! {
        event = ui_rx.recv() => event,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; cancelling render");
            cancel.cancel();
            None
        }
    };
    task.await.context("render task panicked")??;

    match outcome {
        Some(PreviewEvent::Updated { strip, .. }) => {
            export::save_preview(&cfg.output_dir, Some(&strip))?;
            Ok(())
        }
        Some(PreviewEvent::Failed { message, .. }) => bail!("render failed: {message}"),
        None => Ok(()),
    }
}

fn data_uri_for(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let format = image::guess_format(&bytes)
        .with_context(|| format!("unrecognised image format in {}", path.display()))?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    ))
}
