//! # EPUB Container Module
//!
//! Questo modulo gestisce la lettura e la riscrittura del container EPUB.
//!
//! ## Responsabilità:
//! - Carica l'intero archivio in memoria come lista ordinata di risorse
//! - Classifica ogni risorsa per media-kind (immagine, documento, CSS, font, altro)
//! - Accumula conteggi e dimensioni per kind in un `BookInfo`
//! - Rimuove le risorse marcate per la rimozione
//! - Serializza un nuovo archivio valido (entry `mimetype` per prima, STORED)
//!
//! ## Formato container:
//! Un EPUB è un archivio ZIP con un manifest XML (il package document OPF).
//! La entry `mimetype` deve essere la prima dell'archivio e non compressa;
//! tutte le altre entry vengono riscritte con DEFLATE al livello massimo,
//! preservando l'ordine originale.
//!
//! ## Classificazione:
//! Basata sull'estensione del file normalizzata (case-insensitive), come
//! per la discovery dei media. Le risorse non riconosciute finiscono in
//! `Other` e non vengono mai trasformate.
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut book = Book::open(&path)?;
//! let info = book.info();
//! book.save(&output_path)?;
//! ```

use crate::error::OptimizeError;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Media kind of a resource inside the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaKind {
    Image,
    Document,
    Stylesheet,
    Font,
    Other,
}

impl MediaKind {
    /// Classify a resource by its normalized file extension
    pub fn classify(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match ext.as_deref() {
            Some("jpg" | "jpeg" | "png" | "gif" | "webp" | "svg") => MediaKind::Image,
            Some("html" | "xhtml" | "htm") => MediaKind::Document,
            Some("css") => MediaKind::Stylesheet,
            Some("ttf" | "otf" | "woff" | "woff2") => MediaKind::Font,
            _ => MediaKind::Other,
        }
    }

    /// Human-readable label for log lines
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Document => "document",
            MediaKind::Stylesheet => "stylesheet",
            MediaKind::Font => "font",
            MediaKind::Other => "other",
        }
    }
}

/// A single named resource inside the container
#[derive(Debug, Clone)]
pub struct Resource {
    /// Archive entry name, immutable within a session
    pub name: String,
    /// Media kind derived from the entry name
    pub kind: MediaKind,
    /// Raw resource bytes, mutable
    pub data: Vec<u8>,
}

impl Resource {
    /// True for OPF package documents (the XML manifest of the book)
    pub fn is_package_document(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with(".opf")
    }
}

/// Per-kind inventory of a book's resources
#[derive(Debug, Default, Clone, Serialize)]
pub struct BookInfo {
    /// On-disk size of the whole archive
    pub total_size: u64,
    pub images: usize,
    pub image_size: u64,
    pub documents: usize,
    pub document_size: u64,
    pub stylesheets: usize,
    pub stylesheet_size: u64,
    pub fonts: usize,
    pub font_size: u64,
    pub other: usize,
    pub other_size: u64,
}

impl BookInfo {
    /// One-line summary of the inventory for log output
    pub fn format_summary(&self) -> String {
        format!(
            "{} images ({}) | {} documents ({}) | {} stylesheets ({}) | {} fonts ({}) | {} other ({})",
            self.images,
            crate::file_manager::FileManager::format_size(self.image_size),
            self.documents,
            crate::file_manager::FileManager::format_size(self.document_size),
            self.stylesheets,
            crate::file_manager::FileManager::format_size(self.stylesheet_size),
            self.fonts,
            crate::file_manager::FileManager::format_size(self.font_size),
            self.other,
            crate::file_manager::FileManager::format_size(self.other_size),
        )
    }
}

/// An EPUB book loaded fully into memory
pub struct Book {
    path: PathBuf,
    archive_size: u64,
    /// Ordered resource list, same order as the source archive
    pub resources: Vec<Resource>,
}

impl Book {
    /// Read a whole EPUB archive into memory
    pub fn open(path: &Path) -> Result<Self, OptimizeError> {
        let archive_size = std::fs::metadata(path)?.len();
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let mut resources = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            let kind = MediaKind::classify(&name);
            debug!("Loaded {} ({}, {} bytes)", name, kind.label(), data.len());
            resources.push(Resource { name, kind, data });
        }

        Ok(Self {
            path: path.to_path_buf(),
            archive_size,
            resources,
        })
    }

    /// Source path of the archive
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On-disk size of the source archive
    pub fn archive_size(&self) -> u64 {
        self.archive_size
    }

    /// Bucket every resource by media kind, accumulating counts and sizes
    pub fn info(&self) -> BookInfo {
        let mut info = BookInfo {
            total_size: self.archive_size,
            ..Default::default()
        };

        for resource in &self.resources {
            let size = resource.data.len() as u64;
            match resource.kind {
                MediaKind::Image => {
                    info.images += 1;
                    info.image_size += size;
                }
                MediaKind::Document => {
                    info.documents += 1;
                    info.document_size += size;
                }
                MediaKind::Stylesheet => {
                    info.stylesheets += 1;
                    info.stylesheet_size += size;
                }
                MediaKind::Font => {
                    info.fonts += 1;
                    info.font_size += size;
                }
                MediaKind::Other => {
                    info.other += 1;
                    info.other_size += size;
                }
            }
        }

        info
    }

    /// Drop every resource whose name is in the removal set
    pub fn remove_resources(&mut self, names: &HashSet<String>) {
        self.resources.retain(|r| !names.contains(&r.name));
    }

    /// Serialize the archive to any seekable sink.
    ///
    /// The `mimetype` entry goes first and uncompressed, as the EPUB
    /// container format requires; everything else is deflated at the
    /// maximum level in the original entry order.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<(), OptimizeError> {
        let mut zip = ZipWriter::new(writer);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9));

        if let Some(mime) = self.resources.iter().find(|r| r.name == "mimetype") {
            zip.start_file(mime.name.as_str(), stored)?;
            zip.write_all(&mime.data)?;
        }

        for resource in &self.resources {
            if resource.name == "mimetype" {
                continue;
            }
            zip.start_file(resource.name.as_str(), deflated)?;
            zip.write_all(&resource.data)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Write the archive to a new file
    pub fn save(&self, path: &Path) -> Result<(), OptimizeError> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Size the rebuilt archive would have, without touching the filesystem
    pub fn serialized_size(&self) -> Result<u64, OptimizeError> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner().len() as u64)
    }
}
