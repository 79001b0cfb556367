//! # Main Optimizer Orchestrator Module
//!
//! Questo è il modulo principale che orchestra tutto il processo di
//! compressione dei file EPUB.
//!
//! ## Responsabilità:
//! - Coordinamento di tutti gli altri moduli
//! - Batch sequenziale sulla lista di input (un worker in background)
//! - Orchestrazione del flusso: discovery -> processing -> statistics
//! - Gestione cancellazione cooperativa (controllata TRA un file e l'altro)
//! - Report finale con statistiche complete
//!
//! ## Processing pipeline per file:
//! 1. Carica l'intero archivio in memoria
//! 2. Passata singola sulle risorse, una decisione per media-kind:
//!    - immagine: ricomprimi, sostituisci SOLO se strettamente più piccola
//!    - documento: minifica, sostituisci sempre
//!    - stylesheet: minifica, sostituisci sempre
//!    - font: marca per la rimozione
//! 3. Post-passata (se strip_fonts): pulisci le regole @font-face da ogni
//!    stylesheet, rimuovi gli item dal manifest OPF, elimina le risorse
//! 4. Riserializza l'archivio sul path di output (o su buffer in dry-run)
//!
//! ## Gestione concorrenza:
//! Nessun parallelismo tra file o tra risorse: l'intero batch gira in
//! sequenza dentro `spawn_blocking`, il foreground resta reattivo solo
//! perché il lavoro è su un worker separato.
//!
//! ## Error handling:
//! - Errori fatali per singolo file non bloccano il batch (skip-and-continue)
//! - Errori per singola risorsa degradano a "keep original bytes"
//! - Statistics tracciano il numero di errori
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut optimizer = EpubOptimizer::new(config)?;
//! let stats = optimizer.run(&inputs).await?;
//! ```

use crate::{
    book::{Book, MediaKind},
    config::Config,
    file_manager::FileManager,
    image_processor::ImageProcessor,
    json_output::JsonMessage,
    progress::{OptimizationStats, ProgressManager},
    text_processor,
};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Run statistics for a single book
#[derive(Debug, Clone, Serialize)]
pub struct BookStats {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub original_size: u64,
    pub final_size: u64,
    pub reduction_percent: f64,
}

impl BookStats {
    pub fn new(input_path: PathBuf, output_path: PathBuf, original_size: u64, final_size: u64) -> Self {
        let reduction_percent = if original_size > 0 {
            (1.0 - (final_size as f64 / original_size as f64)) * 100.0
        } else {
            0.0
        };

        Self {
            input_path,
            output_path,
            original_size,
            final_size,
            reduction_percent,
        }
    }
}

/// Main EPUB optimizer orchestrator
pub struct EpubOptimizer {
    config: Config,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl EpubOptimizer {
    /// Create a new optimizer instance
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            stop_receiver: None,
        })
    }

    /// Create a new optimizer with cancellation support.
    ///
    /// The stop signal is checked between files, not between resources:
    /// an in-flight file finishes before cancellation takes effect.
    pub fn with_cancellation(
        config: Config,
        stop_receiver: broadcast::Receiver<()>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            stop_receiver: Some(stop_receiver),
        })
    }

    /// Checks if a stop signal has been received
    fn should_stop(&mut self) -> bool {
        if let Some(ref mut receiver) = self.stop_receiver {
            match receiver.try_recv() {
                Ok(_) => return true,
                Err(broadcast::error::TryRecvError::Empty) => return false,
                Err(broadcast::error::TryRecvError::Lagged(_)) => return true,
                Err(broadcast::error::TryRecvError::Closed) => return false,
            }
        }
        false
    }

    /// Run the optimization batch over the given files and directories
    pub async fn run(&mut self, inputs: &[PathBuf]) -> Result<OptimizationStats> {
        let files = FileManager::find_epub_files(inputs)?;
        info!("Found {} EPUB files to process", files.len());

        if files.is_empty() {
            info!("No EPUB files found to process");
            return Ok(OptimizationStats::new());
        }

        // Log configuration details
        if self.config.compress_images {
            info!(
                "🎯 Images: recompress at quality {} (bounding box {}x{})",
                self.config.image.quality,
                self.config.image.max_width.unwrap_or(0),
                self.config.image.max_height.unwrap_or(0)
            );
        } else {
            info!("🎯 Images: keep as-is");
        }
        info!(
            "📄 Markup: minify HTML {} | minify CSS {}",
            if self.config.minify_html { "on" } else { "off" },
            if self.config.minify_css { "on" } else { "off" }
        );
        if self.config.strip_fonts {
            info!("✂️  Fonts: strip embedded fonts and @font-face rules");
        }
        if let Some(ref output_dir) = self.config.output_dir {
            info!("📁 Output directory: {}", output_dir.display());
        } else {
            info!("📁 Output: next to each input file");
        }
        if self.config.dry_run {
            info!("🧪 Dry run mode: no files will be written");
        }

        if self.config.json_output {
            JsonMessage::start(files.len(), &self.config).emit();
        }

        let progress = ProgressManager::new(files.len() as u64);
        let mut stats = OptimizationStats::new();
        let total = files.len();

        for (index, input) in files.into_iter().enumerate() {
            if self.should_stop() {
                info!(
                    "Cancellation requested, stopping after {}/{} files",
                    index, total
                );
                break;
            }

            let file_name = input
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let output = FileManager::output_path(&input, self.config.output_dir.as_deref());

            if self.config.keep_existing && output.exists() {
                info!("⏩ Skipping {}, output already exists", input.display());
                let size = tokio::fs::metadata(&input).await.map(|m| m.len()).unwrap_or(0);
                if self.config.json_output {
                    JsonMessage::file_skipped(input.clone(), size).emit();
                }
                stats.add_skipped(size);
                progress.update(&format!("⏩ {}: skipped", file_name));
                continue;
            }

            if self.config.json_output {
                let size = tokio::fs::metadata(&input).await.map(|m| m.len()).unwrap_or(0);
                JsonMessage::file_start(input.clone(), size, index, total).emit();
            }

            info!("--- Processing file {}/{} ---", index + 1, total);

            // One background worker, one file at a time
            let config = self.config.clone();
            let progress_clone = progress.clone();
            let input_clone = input.clone();
            let output_clone = output.clone();
            let result = tokio::task::spawn_blocking(move || {
                process_book(&input_clone, &output_clone, &config, &progress_clone)
            })
            .await?;

            match result {
                Ok(book_stats) => {
                    if self.config.json_output {
                        JsonMessage::file_complete(&book_stats).emit();
                    }
                    progress.update(&format!(
                        "✅ {}: {:.1}% saved",
                        file_name, book_stats.reduction_percent
                    ));
                    stats.add_optimized(book_stats.original_size, book_stats.final_size);
                }
                Err(e) => {
                    error!("FATAL ERROR compressing {}: {:#}", input.display(), e);
                    if self.config.json_output {
                        JsonMessage::file_error(input.clone(), format!("{:#}", e)).emit();
                    }
                    progress.update(&format!("❌ {}: error", file_name));
                    stats.add_error();
                }
            }
        }

        progress.finish(&stats.format_summary());
        self.print_final_stats(&stats);

        if self.config.json_output {
            JsonMessage::complete(&stats).emit();
        }

        Ok(stats)
    }

    fn print_final_stats(&self, stats: &OptimizationStats) {
        info!("=== Optimization Complete ===");
        info!("Files processed: {}", stats.files_processed);
        info!("Files optimized: {}", stats.files_optimized);
        info!("Files skipped: {}", stats.files_skipped);
        info!("Errors: {}", stats.errors);
        info!(
            "Bytes saved: {}",
            FileManager::format_size(stats.total_bytes_saved)
        );
        info!(
            "Average reduction: {:.2}%",
            stats.overall_reduction_percent()
        );
    }
}

/// Process a single book: load, transform every resource, rebuild.
///
/// Runs synchronously inside `spawn_blocking`. Per-resource failures
/// degrade to "keep original bytes"; only container-level failures (the
/// archive cannot be read or written) abort the file.
fn process_book(
    input: &Path,
    output: &Path,
    config: &Config,
    progress: &ProgressManager,
) -> Result<BookStats> {
    let original_size = std::fs::metadata(input)?.len();
    info!(
        "Starting compression for: {}",
        input.file_name().unwrap_or_default().to_string_lossy()
    );
    info!("Original size: {}", FileManager::format_size(original_size));

    let mut book = Book::open(input)?;
    let image_processor = ImageProcessor::new(config.image.clone());
    let total_items = book.resources.len();
    let mut fonts_to_remove: HashSet<String> = HashSet::new();

    // Single pass, one decision per resource kind
    for (index, resource) in book.resources.iter_mut().enumerate() {
        let original_item_size = resource.data.len();

        match resource.kind {
            MediaKind::Image if config.compress_images => {
                progress.set_message(&format!("Compressing image: {}", resource.name));
                let compressed = image_processor.compress(&resource.data);

                // Keep the transformed bytes only if strictly smaller
                if compressed.extension.is_some() && compressed.data.len() < original_item_size {
                    if let Some(extension) = compressed.extension {
                        debug!("{} re-encoded as {}", resource.name, extension);
                    }
                    info!(
                        "  - Compressed {} ({} -> {})",
                        resource.name,
                        FileManager::format_size(original_item_size as u64),
                        FileManager::format_size(compressed.data.len() as u64)
                    );
                    resource.data = compressed.data;
                } else {
                    info!("  - Skipped {}, no size improvement", resource.name);
                }
            }
            MediaKind::Document if config.minify_html => {
                progress.set_message(&format!("Minifying HTML: {}", resource.name));
                resource.data = text_processor::minify_document(&resource.data);
            }
            MediaKind::Stylesheet if config.minify_css => {
                progress.set_message(&format!("Minifying CSS: {}", resource.name));
                resource.data = text_processor::minify_stylesheet(&resource.data);
            }
            MediaKind::Font if config.strip_fonts => {
                info!("Marking font for removal: {}", resource.name);
                fonts_to_remove.insert(resource.name.clone());
            }
            _ => {}
        }

        debug!(
            "Processed resource {}/{}: {}",
            index + 1,
            total_items,
            resource.name
        );
    }

    // Fonts stripped: clean the @font-face rules out of every stylesheet
    // and drop the matching manifest items, then the resources themselves
    if config.strip_fonts {
        info!("Stripping @font-face rules from CSS files...");
        for resource in book
            .resources
            .iter_mut()
            .filter(|r| r.kind == MediaKind::Stylesheet)
        {
            let cleaned = match std::str::from_utf8(&resource.data) {
                Ok(css) => Some(text_processor::strip_font_face_rules(css)),
                Err(_) => {
                    warn!(
                        "Stylesheet {} is not valid UTF-8, leaving it untouched",
                        resource.name
                    );
                    None
                }
            };
            if let Some(css) = cleaned {
                resource.data = css.into_bytes();
            }
        }

        if !fonts_to_remove.is_empty() {
            for resource in book
                .resources
                .iter_mut()
                .filter(|r| r.is_package_document())
            {
                let cleaned = match std::str::from_utf8(&resource.data) {
                    Ok(opf) => Some(text_processor::strip_manifest_items(
                        opf,
                        &resource.name,
                        &fonts_to_remove,
                    )),
                    Err(_) => {
                        warn!(
                            "Package document {} is not valid UTF-8, manifest left untouched",
                            resource.name
                        );
                        None
                    }
                };
                if let Some(opf) = cleaned {
                    resource.data = opf.into_bytes();
                }
            }

            book.remove_resources(&fonts_to_remove);
        }
    }

    info!("Rebuilding and saving compressed EPUB...");
    progress.set_message("Saving file...");

    let final_size = if config.dry_run {
        book.serialized_size()?
    } else {
        book.save(output)?;
        std::fs::metadata(output)?.len()
    };

    let stats = BookStats::new(
        input.to_path_buf(),
        output.to_path_buf(),
        original_size,
        final_size,
    );

    info!(
        "Compression complete: {}",
        output.file_name().unwrap_or_default().to_string_lossy()
    );
    info!("Final size: {}", FileManager::format_size(final_size));
    info!(
        "Reduced by: {} ({:.1}%)",
        FileManager::format_size(original_size.saturating_sub(final_size)),
        stats.reduction_percent
    );

    Ok(stats)
}
