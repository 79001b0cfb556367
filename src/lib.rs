//! # EPUB Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `book`: Container EPUB (lettura, classificazione, riscrittura)
//! - `estimate`: Proiezione euristica della dimensione finale
//! - `image_processor`: Ricompressione immagini in memoria (JPEG/PNG/WebP)
//! - `text_processor`: Minificazione HTML/CSS e stripping @font-face
//! - `optimizer`: Orchestratore principale del processo
//! - `file_manager`: Discovery file EPUB e path di output
//! - `progress`: Progress tracking e statistiche
//! - `json_output`: Eventi JSON line-delimited per uso programmatico
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use epub_optimizer::{Config, EpubOptimizer};
//!
//! let config = Config::default();
//! let mut optimizer = EpubOptimizer::new(config)?;
//! let stats = optimizer.run(&inputs).await?;
//! ```

pub mod book;
pub mod config;
pub mod error;
pub mod estimate;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod optimizer;
pub mod progress;
pub mod text_processor;

pub use book::{Book, BookInfo, MediaKind, Resource};
pub use config::{Config, ImageOptions};
pub use error::OptimizeError;
pub use estimate::{estimate_compressed_size, Estimate};
pub use optimizer::{BookStats, EpubOptimizer};
