//! Binarization and directional morphology for candidate detection.
//!
//! The detection front-end turns the page into a binary ink mask: grayscale
//! conversion, histogram equalization, adaptive thresholding (inverted so
//! text becomes foreground), then directional gap closing that joins
//! characters into words and lines into blocks before component labelling.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::{adaptive_threshold, equalize_histogram};

/// Foreground (ink) value in binary masks.
pub const FOREGROUND: u8 = 255;
/// Background value in binary masks.
pub const BACKGROUND: u8 = 0;

/// Produces a binary ink mask of the page.
///
/// Text is darker than its local neighborhood, so it lands on the black
/// side of the adaptive threshold; the mask is inverted so ink is
/// foreground.
pub fn binarize(image: &RgbImage, block_radius: u32) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    let equalized = equalize_histogram(&gray);
    let mut binary = adaptive_threshold(&equalized, block_radius.max(1));
    // A uniform neighborhood ties with its own mean; a fully saturated
    // pixel is never ink, whichever way the threshold breaks the tie.
    for (x, y, pixel) in binary.enumerate_pixels_mut() {
        let saturated = equalized.get_pixel(x, y).0[0] == u8::MAX;
        pixel.0[0] = if pixel.0[0] == 0 && !saturated {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }
    binary
}

/// Bridges short background runs in both directions, in place.
///
/// `horizontal_gap` joins characters into words, `vertical_gap` joins
/// lines into blocks. A gap of zero disables that direction.
pub fn close_gaps(binary: &mut GrayImage, horizontal_gap: u32, vertical_gap: u32) {
    if horizontal_gap > 0 {
        close_rows(binary, horizontal_gap);
    }
    if vertical_gap > 0 {
        close_columns(binary, vertical_gap);
    }
}

fn close_rows(binary: &mut GrayImage, max_gap: u32) {
    let (width, height) = binary.dimensions();
    for y in 0..height {
        let mut last_foreground: Option<u32> = None;
        for x in 0..width {
            if binary.get_pixel(x, y).0[0] != FOREGROUND {
                continue;
            }
            if let Some(previous) = last_foreground {
                let gap = x - previous - 1;
                if gap > 0 && gap <= max_gap {
                    for fill_x in previous + 1..x {
                        binary.put_pixel(fill_x, y, Luma([FOREGROUND]));
                    }
                }
            }
            last_foreground = Some(x);
        }
    }
}

fn close_columns(binary: &mut GrayImage, max_gap: u32) {
    let (width, height) = binary.dimensions();
    for x in 0..width {
        let mut last_foreground: Option<u32> = None;
        for y in 0..height {
            if binary.get_pixel(x, y).0[0] != FOREGROUND {
                continue;
            }
            if let Some(previous) = last_foreground {
                let gap = y - previous - 1;
                if gap > 0 && gap <= max_gap {
                    for fill_y in previous + 1..y {
                        binary.put_pixel(x, fill_y, Luma([FOREGROUND]));
                    }
                }
            }
            last_foreground = Some(y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(width: u32, height: u32, foreground: &[(u32, u32)]) -> GrayImage {
        let mut image = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
        for &(x, y) in foreground {
            image.put_pixel(x, y, Luma([FOREGROUND]));
        }
        image
    }

    #[test]
    fn close_rows_bridges_gaps_up_to_limit() {
        let mut image = mask(10, 1, &[(1, 0), (4, 0)]);
        close_gaps(&mut image, 2, 0);
        for x in 1..=4 {
            assert_eq!(image.get_pixel(x, 0).0[0], FOREGROUND, "x={x}");
        }
    }

    #[test]
    fn close_rows_keeps_gaps_beyond_limit() {
        let mut image = mask(10, 1, &[(1, 0), (6, 0)]);
        close_gaps(&mut image, 2, 0);
        assert_eq!(image.get_pixel(3, 0).0[0], BACKGROUND);
    }

    #[test]
    fn close_columns_bridges_vertical_gaps() {
        let mut image = mask(1, 10, &[(0, 2), (0, 5)]);
        close_gaps(&mut image, 0, 3);
        for y in 2..=5 {
            assert_eq!(image.get_pixel(0, y).0[0], FOREGROUND, "y={y}");
        }
    }

    #[test]
    fn binarize_marks_dark_text_as_foreground() {
        // White page with a dark textured block.
        let mut page = RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]));
        for x in 20..40 {
            for y in 28..36 {
                if x % 2 == 0 {
                    page.put_pixel(x, y, image::Rgb([0, 0, 0]));
                }
            }
        }
        let binary = binarize(&page, 7);
        let ink: usize = binary
            .pixels()
            .filter(|pixel| pixel.0[0] == FOREGROUND)
            .count();
        assert!(ink > 0, "dark strokes should become foreground");
        // The uniform margin must stay background.
        assert_eq!(binary.get_pixel(2, 2).0[0], BACKGROUND);
    }
}
