//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//! - Supporta error chaining per mantenere il contesto degli errori
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di elaborazione immagini (formati corrotti, etc.)
//! - `Container`: Errori di lettura/scrittura dell'archivio EPUB (ZIP)
//! - `Minify`: Errori di minificazione HTML/CSS
//! - `Validation`: Errori di validazione input
//!
//! ## Esempio:
//! ```rust,ignore
//! if config.image.quality < 10 {
//!     return Err(OptimizeError::Validation("quality out of range".to_string()));
//! }
//! ```

/// Custom error types for EPUB optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EPUB container error: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("Minification error: {0}")]
    Minify(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
