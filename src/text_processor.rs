//! # Markup Transform Module
//!
//! Questo modulo raccoglie le trasformazioni testuali sulle risorse del
//! container: minificazione HTML/CSS, stripping delle regole @font-face e
//! pulizia del manifest OPF.
//!
//! ## Responsabilità:
//! - Minifica documenti XHTML preservando la struttura (closing tag, doctype)
//! - Minifica fogli di stile CSS (parse, minify, print)
//! - Rimuove i blocchi `@font-face` con uno scan brace-balanced
//! - Rimuove dal manifest OPF gli `<item>` delle risorse eliminate
//!
//! ## Contratto fail-closed:
//! Ogni trasformazione che non riesce (contenuto non UTF-8, CSS non
//! parsabile) ritorna i byte originali invariati. Lo stripping @font-face e
//! la pulizia del manifest sono best-effort su testo, non un parser CSS/XML
//! completo.

use crate::error::OptimizeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

static FONT_FACE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@font-face\s*\{").expect("valid @font-face pattern"));

static MANIFEST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<item\b[^>]*?(?:/>|>\s*</item\s*>)").expect("valid manifest item pattern")
});

static ITEM_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']*)["']"#).expect("valid href pattern"));

/// Minify an HTML/XHTML document.
///
/// Strips comments and non-semantic whitespace. EPUB documents are XHTML,
/// so closing tags, the doctype and the html/head opening tags are kept.
/// Inline CSS and JS inside the document are minified as well.
pub fn minify_document(data: &[u8]) -> Vec<u8> {
    let cfg = minify_html::Cfg {
        keep_closing_tags: true,
        keep_html_and_head_opening_tags: true,
        do_not_minify_doctype: true,
        ensure_spec_compliant_unquoted_attribute_values: true,
        minify_css: true,
        minify_js: true,
        ..minify_html::Cfg::default()
    };

    minify_html::minify(data, &cfg)
}

/// Collapse a CSS stylesheet, returning the original bytes on any failure
pub fn minify_stylesheet(data: &[u8]) -> Vec<u8> {
    let css = match std::str::from_utf8(data) {
        Ok(css) => css,
        Err(e) => {
            warn!("Stylesheet is not valid UTF-8, keeping original bytes: {}", e);
            return data.to_vec();
        }
    };

    match minify_css_str(css) {
        Ok(minified) => minified.into_bytes(),
        Err(e) => {
            warn!("Could not minify CSS, keeping original bytes: {}", e);
            data.to_vec()
        }
    }
}

fn minify_css_str(css: &str) -> Result<String, OptimizeError> {
    let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| OptimizeError::Minify(e.to_string()))?;
    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| OptimizeError::Minify(e.to_string()))?;
    let output = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| OptimizeError::Minify(e.to_string()))?;
    Ok(output.code)
}

/// Remove every `@font-face` block from CSS text.
///
/// Blocks are located with a regex anchor and closed with a brace-balanced
/// scan, so nested braces inside the block do not break the match. If a
/// block never closes, the text from that point on is left untouched.
pub fn strip_font_face_rules(css: &str) -> String {
    let mut output = String::with_capacity(css.len());
    let mut cursor = 0usize;

    while let Some(found) = FONT_FACE_OPEN.find_at(css, cursor) {
        match matching_brace(css, found.end() - 1) {
            Some(close) => {
                debug!("Stripping @font-face block at byte {}", found.start());
                output.push_str(&css[cursor..found.start()]);
                cursor = close + 1;
            }
            None => break,
        }
    }

    output.push_str(&css[cursor..]);
    output
}

/// Find the byte offset of the brace closing the one at `open`
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes().iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove from an OPF package document every manifest `<item>` whose href
/// resolves to a removed resource name.
///
/// Hrefs are relative to the OPF's own directory; `removed` holds full
/// archive entry names. Best-effort text transform, not an XML parser.
pub fn strip_manifest_items(opf: &str, opf_name: &str, removed: &HashSet<String>) -> String {
    let opf_dir = Path::new(opf_name)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    MANIFEST_ITEM
        .replace_all(opf, |caps: &regex::Captures| {
            let tag = &caps[0];
            if let Some(href) = ITEM_HREF.captures(tag).map(|c| c[1].to_string()) {
                let resolved = resolve_href(&opf_dir, &href);
                if removed.contains(&resolved) {
                    debug!("Removing manifest item for {}", resolved);
                    return String::new();
                }
            }
            tag.to_string()
        })
        .into_owned()
}

/// Resolve an href against the OPF directory into an archive entry name
fn resolve_href(opf_dir: &str, href: &str) -> String {
    let joined = if opf_dir.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", opf_dir, href)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
