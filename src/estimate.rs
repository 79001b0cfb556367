//! # Size Estimation Module
//!
//! Proiezione puramente aritmetica della dimensione finale a partire dai
//! totali per media-kind e dalle opzioni abilitate, senza eseguire alcuna
//! trasformazione reale.
//!
//! Le percentuali sono euristiche, non garanzie: la minificazione HTML vale
//! circa il 20%, quella CSS circa il 30%, la rimozione font è esatta, e la
//! ricompressione immagini mappa linearmente il range di qualità 10-95 su
//! una riduzione proiettata dell'85%-15%.

use crate::book::BookInfo;
use crate::config::Config;
use serde::Serialize;

/// Projected final size for a book with the given options enabled.
///
/// This is a heuristic, not a guarantee: real savings depend on how
/// compressible the actual resources are. The projection is monotonically
/// non-increasing as more reduction options are enabled.
#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub estimated_size: u64,
    pub reduction_percent: f64,
}

/// Estimate the compressed size of a book without doing any real work
pub fn estimate_compressed_size(info: &BookInfo, config: &Config) -> Estimate {
    let mut estimated = info.total_size as f64;

    // Rough estimates for minification savings
    if config.minify_html {
        estimated -= info.document_size as f64 * 0.20;
    }
    if config.minify_css {
        estimated -= info.stylesheet_size as f64 * 0.30;
    }

    // Stripping fonts removes their bytes entirely, this one is accurate
    if config.strip_fonts {
        estimated -= info.font_size as f64;
    }

    // Map the 10-95 quality range to a 15%-85% projected size reduction:
    // higher quality means less compression
    if config.compress_images {
        let quality = f64::from(config.image.quality);
        let reduction_factor = 0.85 - ((quality - 10.0) / (95.0 - 10.0)) * 0.70;
        estimated -= info.image_size as f64 * reduction_factor;
    }

    let estimated = estimated.max(0.0);

    let reduction_percent = if info.total_size > 0 {
        (info.total_size as f64 - estimated) / info.total_size as f64 * 100.0
    } else {
        0.0
    };

    Estimate {
        estimated_size: estimated.round() as u64,
        reduction_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> BookInfo {
        BookInfo {
            total_size: 1_000_000,
            images: 10,
            image_size: 500_000,
            documents: 20,
            document_size: 200_000,
            stylesheets: 2,
            stylesheet_size: 50_000,
            fonts: 3,
            font_size: 150_000,
            other: 5,
            other_size: 100_000,
        }
    }

    fn all_disabled() -> Config {
        Config {
            compress_images: false,
            minify_html: false,
            minify_css: false,
            strip_fonts: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_options_no_reduction() {
        let estimate = estimate_compressed_size(&sample_info(), &all_disabled());
        assert_eq!(estimate.estimated_size, 1_000_000);
        assert_eq!(estimate.reduction_percent, 0.0);
    }

    #[test]
    fn test_strip_fonts_is_exact() {
        let mut config = all_disabled();
        config.strip_fonts = true;
        let estimate = estimate_compressed_size(&sample_info(), &config);
        assert_eq!(estimate.estimated_size, 850_000);
    }

    #[test]
    fn test_quality_range_maps_to_reduction_factor() {
        let info = sample_info();

        let mut config = all_disabled();
        config.compress_images = true;

        // Minimum quality projects the maximum (85%) image reduction
        config.image.quality = 10;
        let at_min = estimate_compressed_size(&info, &config);
        assert_eq!(at_min.estimated_size, 1_000_000 - 425_000);

        // Maximum quality projects the minimum (15%) image reduction
        config.image.quality = 95;
        let at_max = estimate_compressed_size(&info, &config);
        assert_eq!(at_max.estimated_size, 1_000_000 - 75_000);
    }

    #[test]
    fn test_projection_monotonically_non_increasing() {
        let info = sample_info();

        let mut config = all_disabled();
        let mut previous = estimate_compressed_size(&info, &config).estimated_size;

        config.minify_html = true;
        let with_html = estimate_compressed_size(&info, &config).estimated_size;
        assert!(with_html <= previous);
        previous = with_html;

        config.minify_css = true;
        let with_css = estimate_compressed_size(&info, &config).estimated_size;
        assert!(with_css <= previous);
        previous = with_css;

        config.strip_fonts = true;
        let with_fonts = estimate_compressed_size(&info, &config).estimated_size;
        assert!(with_fonts <= previous);
        previous = with_fonts;

        config.compress_images = true;
        let with_images = estimate_compressed_size(&info, &config).estimated_size;
        assert!(with_images <= previous);
    }

    #[test]
    fn test_projection_clamped_at_zero() {
        let info = BookInfo {
            total_size: 100,
            fonts: 1,
            font_size: 500,
            ..Default::default()
        };
        let mut config = all_disabled();
        config.strip_fonts = true;

        let estimate = estimate_compressed_size(&info, &config);
        assert_eq!(estimate.estimated_size, 0);
    }

    #[test]
    fn test_empty_book() {
        let estimate = estimate_compressed_size(&BookInfo::default(), &Config::default());
        assert_eq!(estimate.estimated_size, 0);
        assert_eq!(estimate.reduction_percent, 0.0);
    }
}
