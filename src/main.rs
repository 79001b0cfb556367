//! # EPUB Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Validazione degli input dell'utente
//! - Creazione della configurazione e avvio dell'optimizer
//! - Cancellazione cooperativa via Ctrl-C (controllata tra un file e l'altro)
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, quality, opzioni di riduzione, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Costruisce la Config dai flag (o da file JSON con --config)
//! 4. Con --estimate stampa inventario e proiezione senza trasformare
//! 5. Altrimenti istanzia EpubOptimizer e avvia il batch
//!
//! ## Esempio di utilizzo:
//! ```bash
//! epub-optimizer library/ --quality 60 --strip-fonts --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::info;

use epub_optimizer::file_manager::FileManager;
use epub_optimizer::json_output::JsonMessage;
use epub_optimizer::{estimate_compressed_size, Book, Config, EpubOptimizer, ImageOptions};

#[derive(Parser)]
#[command(name = "epub-optimizer")]
#[command(about = "Shrink EPUB e-books by recompressing images and minifying markup")]
struct Args {
    /// EPUB files or directories to optimize
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Image quality (10-95)
    #[arg(short, long, default_value = "75")]
    quality: u8,

    /// Maximum image width in pixels (downscale above this)
    #[arg(long, default_value = "1200")]
    max_width: u32,

    /// Maximum image height in pixels (downscale above this)
    #[arg(long, default_value = "1600")]
    max_height: u32,

    /// Keep PNG images as PNG instead of converting to JPEG/WebP
    #[arg(long)]
    keep_png: bool,

    /// Skip image recompression
    #[arg(long)]
    no_images: bool,

    /// Skip HTML minification
    #[arg(long)]
    no_html: bool,

    /// Skip CSS minification
    #[arg(long)]
    no_css: bool,

    /// Remove embedded fonts and their @font-face rules (significant reduction,
    /// the book falls back to system fonts)
    #[arg(long)]
    strip_fonts: bool,

    /// Output directory for compressed files (default: next to each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the per-kind inventory and the estimated final size, then exit
    #[arg(long)]
    estimate: bool,

    /// Run the full pipeline but do not write any output file
    #[arg(long)]
    dry_run: bool,

    /// Skip files whose output already exists
    #[arg(long)]
    keep_existing: bool,

    /// Emit progress and results as JSON lines
    #[arg(long)]
    json: bool,

    /// Load options from a JSON configuration file (other flags are ignored)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match args.config {
        Some(ref path) => {
            info!("Loading configuration from {}", path.display());
            Config::from_file(path).await?
        }
        None => Config {
            compress_images: !args.no_images,
            minify_html: !args.no_html,
            minify_css: !args.no_css,
            strip_fonts: args.strip_fonts,
            image: ImageOptions {
                quality: args.quality,
                max_width: Some(args.max_width),
                max_height: Some(args.max_height),
                force_jpeg: !args.keep_png,
            },
            output_dir: args.output,
            dry_run: args.dry_run,
            keep_existing: args.keep_existing,
            json_output: args.json,
        },
    };

    // Validate and create output directory if specified
    if let Some(ref output_dir) = config.output_dir {
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir)?;
            info!("Created output directory: {}", output_dir.display());
        }
        if !output_dir.is_dir() {
            return Err(anyhow::anyhow!(
                "Output path is not a directory: {}",
                output_dir.display()
            ));
        }
    }

    if args.estimate {
        return run_estimate(&args.inputs, &config).await;
    }

    // Cooperative cancellation: the signal is checked between files, the
    // in-flight file finishes before the batch stops
    let (stop_sender, stop_receiver) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, finishing the current file before stopping");
            let _ = stop_sender.send(());
        }
    });

    let mut optimizer = EpubOptimizer::with_cancellation(config, stop_receiver)?;
    optimizer.run(&args.inputs).await?;

    Ok(())
}

/// Print the per-kind inventory and the heuristic size projection for every
/// input, without transforming anything.
async fn run_estimate(inputs: &[PathBuf], config: &Config) -> Result<()> {
    config.validate()?;

    let files = FileManager::find_epub_files(inputs)?;
    if files.is_empty() {
        info!("No EPUB files found to estimate");
        return Ok(());
    }

    for path in files {
        let open_path = path.clone();
        let info = tokio::task::spawn_blocking(move || {
            Book::open(&open_path).map(|book| book.info())
        })
        .await??;

        let estimate = estimate_compressed_size(&info, config);

        if config.json_output {
            JsonMessage::estimate(path, info, &estimate).emit();
        } else {
            info!("{}", path.display());
            info!("  {}", info.format_summary());
            info!(
                "  Current size: {}",
                FileManager::format_size(info.total_size)
            );
            info!(
                "  Estimated size: ~ {} (~ {:.1}% reduction)",
                FileManager::format_size(estimate.estimated_size),
                estimate.reduction_percent
            );
        }
    }

    Ok(())
}
