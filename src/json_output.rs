//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico.
//!
//! ## Responsabilità:
//! - Emette messaggi JSON line-delimited per gli eventi del run
//! - Fornisce un'interfaccia standardizzata per wrapper e script esterni
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch con la configurazione effettiva
//! - `estimate`: Inventario e proiezione euristica di un file
//! - `file_start`: Inizio elaborazione di un file
//! - `file_complete`: Fine elaborazione di un file (o errore per-file)
//! - `complete`: Fine del batch con statistiche aggregate
//! - `error`: Errore generale

use crate::book::BookInfo;
use crate::config::Config;
use crate::estimate::Estimate;
use crate::optimizer::BookStats;
use crate::progress::OptimizationStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        total_files: usize,
        config: JsonConfig,
    },

    /// Inventario e proiezione per un singolo file
    #[serde(rename = "estimate")]
    EstimateReport {
        path: PathBuf,
        info: BookInfo,
        estimated_size: u64,
        reduction_percent: f64,
    },

    /// Inizio elaborazione di un file specifico
    #[serde(rename = "file_start")]
    FileStart {
        path: PathBuf,
        size: u64,
        index: usize,
        total: usize,
    },

    /// Fine elaborazione di un file specifico
    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        original_size: u64,
        final_size: u64,
        reduction_percent: f64,
        skipped: bool,
        error: Option<String>,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        files_optimized: usize,
        files_skipped: usize,
        errors: usize,
        total_bytes_saved: u64,
        overall_reduction_percent: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error { message: String },
}

/// Configurazione effettiva riportata nel messaggio di start
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub compress_images: bool,
    pub minify_html: bool,
    pub minify_css: bool,
    pub strip_fonts: bool,
    pub image_quality: u8,
    pub dry_run: bool,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(total_files: usize, config: &Config) -> Self {
        Self::Start {
            total_files,
            config: JsonConfig::from(config),
        }
    }

    pub fn estimate(path: PathBuf, info: BookInfo, estimate: &Estimate) -> Self {
        Self::EstimateReport {
            path,
            info,
            estimated_size: estimate.estimated_size,
            reduction_percent: estimate.reduction_percent,
        }
    }

    pub fn file_start(path: PathBuf, size: u64, index: usize, total: usize) -> Self {
        Self::FileStart {
            path,
            size,
            index,
            total,
        }
    }

    pub fn file_complete(stats: &BookStats) -> Self {
        Self::FileComplete {
            path: stats.input_path.clone(),
            original_size: stats.original_size,
            final_size: stats.final_size,
            reduction_percent: stats.reduction_percent,
            skipped: false,
            error: None,
        }
    }

    pub fn file_skipped(path: PathBuf, size: u64) -> Self {
        Self::FileComplete {
            path,
            original_size: size,
            final_size: size,
            reduction_percent: 0.0,
            skipped: true,
            error: None,
        }
    }

    pub fn file_error(path: PathBuf, message: String) -> Self {
        Self::FileComplete {
            path,
            original_size: 0,
            final_size: 0,
            reduction_percent: 0.0,
            skipped: false,
            error: Some(message),
        }
    }

    pub fn complete(stats: &OptimizationStats) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_optimized: stats.files_optimized,
            files_skipped: stats.files_skipped,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            overall_reduction_percent: stats.overall_reduction_percent(),
        }
    }

    pub fn error(message: String) -> Self {
        Self::Error { message }
    }
}

/// Converti la Config esistente in JsonConfig
impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            compress_images: config.compress_images,
            minify_html: config.minify_html,
            minify_css: config.minify_css,
            strip_fonts: config.strip_fonts,
            image_quality: config.image.quality,
            dry_run: config.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_tag_with_type() {
        let message = JsonMessage::start(3, &Config::default());
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"type\":\"start\""));
        assert!(json.contains("\"total_files\":3"));
    }

    #[test]
    fn test_file_error_carries_message() {
        let message =
            JsonMessage::file_error(PathBuf::from("a.epub"), "broken archive".to_string());
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"error\":\"broken archive\""));
    }
}
