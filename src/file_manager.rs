//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei file EPUB e i path di output.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file `.epub` da file e directory di input
//! - Derivazione del path di output (`libro.epub` -> `libro_compressed.epub`)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_epub_files(&inputs)?;
//! for file in files {
//!     let output = FileManager::output_path(&file, None);
//! }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Manages file discovery and output paths
pub struct FileManager;

impl FileManager {
    /// Collect every EPUB file from a mixed list of files and directories.
    ///
    /// Directories are walked recursively; non-EPUB file arguments are
    /// ignored with a warning. The result is sorted and deduplicated.
    pub fn find_epub_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_dir() {
                for entry in WalkDir::new(input)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                {
                    if Self::is_epub(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
            } else if Self::is_epub(input) {
                files.push(input.clone());
            } else {
                warn!("Ignoring non-EPUB input: {}", input.display());
            }
        }

        files.sort();
        files.dedup();

        Ok(files)
    }

    /// Check if a file is an EPUB archive
    pub fn is_epub(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            ext.to_string_lossy().to_lowercase() == "epub"
        } else {
            false
        }
    }

    /// Derive the output path by suffixing the input base name.
    ///
    /// `book.epub` becomes `book_compressed.epub`, placed in `output_dir`
    /// when given, next to the input otherwise.
    pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let file_name = format!("{}_compressed.epub", stem);

        match output_dir {
            Some(dir) => dir.join(file_name),
            None => input.with_file_name(file_name),
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_epub() {
        assert!(FileManager::is_epub(Path::new("a/book.epub")));
        assert!(FileManager::is_epub(Path::new("BOOK.EPUB")));
        assert!(!FileManager::is_epub(Path::new("book.mobi")));
        assert!(!FileManager::is_epub(Path::new("epub")));
    }

    #[test]
    fn test_output_path_next_to_input() {
        let output = FileManager::output_path(Path::new("/books/war.epub"), None);
        assert_eq!(output, PathBuf::from("/books/war_compressed.epub"));
    }

    #[test]
    fn test_output_path_in_output_dir() {
        let output =
            FileManager::output_path(Path::new("/books/war.epub"), Some(Path::new("/out")));
        assert_eq!(output, PathBuf::from("/out/war_compressed.epub"));
    }

    #[test]
    fn test_find_epub_files_walks_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(temp_dir.path().join("a.epub"), b"x").unwrap();
        std::fs::write(nested.join("b.epub"), b"x").unwrap();
        std::fs::write(nested.join("c.txt"), b"x").unwrap();

        let files = FileManager::find_epub_files(&[temp_dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| FileManager::is_epub(f)));
    }

    #[test]
    fn test_find_epub_files_deduplicates() {
        let temp_dir = TempDir::new().unwrap();
        let book = temp_dir.path().join("a.epub");
        std::fs::write(&book, b"x").unwrap();

        let files =
            FileManager::find_epub_files(&[book.clone(), temp_dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 1);
    }
}
