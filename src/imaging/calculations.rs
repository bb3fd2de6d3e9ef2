//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Represents a single responsive variant to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsiveSize {
    /// Requested width from the configured list.
    pub width: u32,
    /// Height preserving the source aspect ratio.
    pub height: u32,
}

/// Calculate which responsive widths to generate and their heights.
///
/// Widths at or above the source width are skipped, duplicates collapse,
/// and order follows the configured list. When nothing fits the result is
/// empty: the full-size encode already covers the source width.
///
/// # Arguments
/// * `original` - Original image dimensions (width, height)
/// * `widths` - Requested variant widths
pub fn calculate_responsive_sizes(original: (u32, u32), widths: &[u32]) -> Vec<ResponsiveSize> {
    let (orig_w, orig_h) = original;
    if orig_w == 0 || orig_h == 0 {
        return Vec::new();
    }

    let mut result: Vec<ResponsiveSize> = Vec::new();
    for &width in widths {
        if width == 0 || width >= orig_w || result.iter().any(|s| s.width == width) {
            continue;
        }
        let ratio = width as f64 / orig_w as f64;
        let height = ((orig_h as f64 * ratio).round() as u32).max(1);
        result.push(ResponsiveSize { width, height });
    }
    result
}

/// Fit `original` inside a `max_edge` square, preserving aspect ratio.
///
/// Used for placeholder thumbnails. Never upscales and never returns a zero
/// dimension.
///
/// ```
/// # use pagesmith::imaging::calculate_fit_dimensions;
/// assert_eq!(calculate_fit_dimensions((1600, 900), 20), (20, 11));
/// assert_eq!(calculate_fit_dimensions((10, 40), 20), (5, 20));
/// ```
pub fn calculate_fit_dimensions(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = original;
    let longer = w.max(h);
    if longer <= max_edge || longer == 0 {
        return (w.max(1), h.max(1));
    }
    let ratio = max_edge as f64 / longer as f64;
    (
        ((w as f64 * ratio).round() as u32).max(1),
        ((h as f64 * ratio).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_responsive_sizes tests
    // =========================================================================

    #[test]
    fn responsive_skips_widths_at_or_above_source() {
        let sizes = calculate_responsive_sizes((1000, 800), &[640, 1000, 1600]);
        assert_eq!(sizes, vec![ResponsiveSize { width: 640, height: 512 }]);
    }

    #[test]
    fn responsive_preserves_aspect_ratio() {
        // 2000x1500, target 1000 → 750 high
        let sizes = calculate_responsive_sizes((2000, 1500), &[1000]);
        assert_eq!(sizes[0].height, 750);
    }

    #[test]
    fn responsive_portrait_uses_width() {
        // 1500x2000 portrait, width 750 → 1000 high
        let sizes = calculate_responsive_sizes((1500, 2000), &[750]);
        assert_eq!(sizes, vec![ResponsiveSize { width: 750, height: 1000 }]);
    }

    #[test]
    fn responsive_empty_when_all_exceed() {
        let sizes = calculate_responsive_sizes((500, 400), &[640, 1024]);
        assert!(sizes.is_empty());
    }

    #[test]
    fn responsive_preserves_order_and_dedups() {
        let sizes = calculate_responsive_sizes((3000, 2000), &[1600, 640, 1600, 1024]);
        let widths: Vec<u32> = sizes.iter().map(|s| s.width).collect();
        assert_eq!(widths, vec![1600, 640, 1024]);
    }

    #[test]
    fn responsive_zero_dimension_source() {
        assert!(calculate_responsive_sizes((0, 100), &[10]).is_empty());
    }

    #[test]
    fn responsive_height_never_zero() {
        // Very wide panorama
        let sizes = calculate_responsive_sizes((10_000, 10), &[100]);
        assert_eq!(sizes[0].height, 1);
    }

    // =========================================================================
    // calculate_fit_dimensions tests
    // =========================================================================

    #[test]
    fn fit_landscape() {
        assert_eq!(calculate_fit_dimensions((1600, 900), 32), (32, 18));
    }

    #[test]
    fn fit_portrait() {
        assert_eq!(calculate_fit_dimensions((900, 1600), 32), (18, 32));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(calculate_fit_dimensions((12, 8), 32), (12, 8));
    }
}
