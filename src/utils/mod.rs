//! Image loading helpers.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::core::{OcrError, OcrResult};

/// Converts a dynamic image to RGB8.
pub fn dynamic_to_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Loads an image file as RGB8.
pub fn load_image(path: &Path) -> OcrResult<RgbImage> {
    let image = image::open(path).map_err(OcrError::ImageLoad)?;
    Ok(dynamic_to_rgb(image))
}
