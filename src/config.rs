//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutte le opzioni di riduzione
//! - Definisce `ImageOptions` per la sotto-configurazione immagini
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `compress_images`: Ricomprime le immagini embedded (default: true)
//! - `minify_html`: Minifica i documenti HTML/XHTML (default: true)
//! - `minify_css`: Minifica i fogli di stile CSS (default: true)
//! - `strip_fonts`: Rimuove i font embedded e le regole @font-face (default: false)
//! - `image.quality`: Qualità immagini (10-95, default: 75)
//! - `image.max_width` / `image.max_height`: Bounding box di resize (default: 1200x1600)
//! - `image.force_jpeg`: Converte i PNG opachi in JPEG (default: true)
//! - `output_dir`: Directory di output (default: None = accanto all'input)
//! - `dry_run`: Esegue la pipeline senza scrivere output (default: false)
//!
//! ## Validazione:
//! - Controlla che image.quality sia nel range 10-95 (range dello slider originale)
//! - Controlla che il bounding box, se presente, non sia degenere
//! - Controlla che output_dir esista e sia una directory
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     strip_fonts: true,
//!     image: ImageOptions { quality: 60, ..Default::default() },
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::OptimizeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Image recompression sub-configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Quality for JPEG/WebP re-encoding (10-95)
    pub quality: u8,
    /// Maximum image width, downscale above this (None = no bound)
    pub max_width: Option<u32>,
    /// Maximum image height, downscale above this (None = no bound)
    pub max_height: Option<u32>,
    /// Convert PNG images to JPEG (opaque) or WebP (with alpha)
    pub force_jpeg: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            quality: 75,
            max_width: Some(1200),
            max_height: Some(1600),
            force_jpeg: true,
        }
    }
}

/// Configuration for EPUB optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Recompress embedded images
    pub compress_images: bool,
    /// Minify HTML/XHTML documents
    pub minify_html: bool,
    /// Minify CSS stylesheets
    pub minify_css: bool,
    /// Remove embedded fonts and their @font-face rules
    pub strip_fonts: bool,
    /// Image recompression settings
    pub image: ImageOptions,
    /// Output directory for compressed files (None = next to each input)
    pub output_dir: Option<PathBuf>,
    /// Run the full pipeline but do not write any output file
    pub dry_run: bool,
    /// Skip inputs whose output file already exists
    pub keep_existing: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compress_images: true,
            minify_html: true,
            minify_css: true,
            strip_fonts: false,
            image: ImageOptions::default(),
            output_dir: None,
            dry_run: false,
            keep_existing: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.image.quality < 10 || self.image.quality > 95 {
            return Err(OptimizeError::Validation(
                "Image quality must be between 10 and 95".to_string(),
            ));
        }

        if self.image.max_width == Some(0) || self.image.max_height == Some(0) {
            return Err(OptimizeError::Validation(
                "Image bounding box dimensions must be greater than 0".to_string(),
            ));
        }

        if let Some(ref output_dir) = self.output_dir {
            if !output_dir.exists() {
                return Err(OptimizeError::Validation(format!(
                    "Output path does not exist: {}",
                    output_dir.display()
                )));
            }
            if !output_dir.is_dir() {
                return Err(OptimizeError::Validation(format!(
                    "Output path is not a directory: {}",
                    output_dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
