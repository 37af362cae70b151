//! Annotated-page rendering for segmentation results.
//!
//! Draws each zone's bounding box in a per-type color and, when a font is
//! configured, a `order: type` label next to the box. Without a font the
//! boxes are still drawn and label rendering is skipped.

use std::collections::HashMap;
use std::path::Path;

use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::domain::{Zone, ZoneType};

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_BACKGROUND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Per-type box colors.
fn zone_color(zone_type: ZoneType) -> Rgb<u8> {
    match zone_type {
        ZoneType::Header => Rgb([220, 20, 60]),
        ZoneType::Price => Rgb([0, 128, 0]),
        ZoneType::Date => Rgb([30, 144, 255]),
        ZoneType::Address => Rgb([255, 140, 0]),
        ZoneType::Reference => Rgb([138, 43, 226]),
        ZoneType::Paragraph => Rgb([70, 130, 180]),
        ZoneType::Signature => Rgb([199, 21, 133]),
        ZoneType::Footer => Rgb([105, 105, 105]),
        ZoneType::Unknown => Rgb([128, 128, 128]),
    }
}

/// Configuration for annotated-page rendering.
pub struct VisualizationConfig {
    /// The font used for zone labels. If None, labels are skipped.
    pub font: Option<FontVec>,
    /// Font scale for labels. Defaults to 14.0.
    pub font_scale: f32,
    /// Bounding box line thickness in pixels. Defaults to 2.
    pub bbox_thickness: u32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 14.0,
            bbox_thickness: 2,
        }
    }
}

impl VisualizationConfig {
    /// Loads the label font from a file.
    pub fn with_font_path(font_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let font_data = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(font_data)
            .map_err(|_| format!("Failed to parse font file: {}", font_path.display()))?;
        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }
}

/// Renders the page with one colored rectangle per zone.
///
/// `reading_order` maps zone ids to their 1-based reading rank; the rank is
/// shown in the label so the computed order can be checked visually.
pub fn annotate(
    image: &RgbImage,
    zones: &[Zone],
    reading_order: &[u32],
    config: &VisualizationConfig,
) -> RgbImage {
    let mut canvas = image.clone();
    let ranks: HashMap<u32, usize> = reading_order
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index + 1))
        .collect();

    for zone in zones {
        let color = zone_color(zone.zone_type);
        draw_box(&mut canvas, zone, color, config.bbox_thickness);
        if let Some(font) = &config.font {
            let rank = ranks.get(&zone.id).copied().unwrap_or(0);
            let label = format!("{rank}: {}", zone.zone_type);
            draw_label(&mut canvas, zone, &label, color, font, config.font_scale);
        }
    }
    canvas
}

fn draw_box(canvas: &mut RgbImage, zone: &Zone, color: Rgb<u8>, thickness: u32) {
    let bbox = &zone.bbox;
    for inset in 0..thickness {
        let width = bbox.width.saturating_sub(inset * 2);
        let height = bbox.height.saturating_sub(inset * 2);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

fn draw_label(
    canvas: &mut RgbImage,
    zone: &Zone,
    label: &str,
    color: Rgb<u8>,
    font: &FontVec,
    font_scale: f32,
) {
    let label_height = font_scale.ceil() as u32 + 4;
    let label_width = ((label.chars().count() as f32) * font_scale * 0.6).ceil() as u32;

    // Above the box when there is room, inside the top edge otherwise.
    let label_y = if zone.bbox.y >= label_height {
        zone.bbox.y - label_height
    } else {
        zone.bbox.y
    };
    let label_x = zone.bbox.x;

    let (canvas_width, canvas_height) = canvas.dimensions();
    let clamped_width = label_width.min(canvas_width.saturating_sub(label_x));
    let clamped_height = label_height.min(canvas_height.saturating_sub(label_y));
    if clamped_width == 0 || clamped_height == 0 {
        return;
    }

    let background = Rect::at(label_x as i32, label_y as i32).of_size(clamped_width, clamped_height);
    draw_filled_rect_mut(canvas, background, LABEL_BACKGROUND_COLOR);
    draw_hollow_rect_mut(canvas, background, color);
    draw_text_mut(
        canvas,
        LABEL_TEXT_COLOR,
        label_x as i32 + 2,
        label_y as i32 + 2,
        font_scale,
        font,
        label,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::BoundingBox;

    fn zone(id: u32, bbox: BoundingBox, zone_type: ZoneType) -> Zone {
        Zone {
            id,
            bbox,
            zone_type,
            confidence: 0.7,
            crop_path: None,
            content_preview: String::new(),
        }
    }

    #[test]
    fn annotate_draws_box_edges_in_type_color() {
        let page = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let zones = vec![zone(1, BoundingBox::new(20, 20, 40, 30), ZoneType::Header)];
        let annotated = annotate(&page, &zones, &[1], &VisualizationConfig::default());
        assert_eq!(*annotated.get_pixel(20, 20), zone_color(ZoneType::Header));
        assert_eq!(*annotated.get_pixel(40, 21), zone_color(ZoneType::Header));
        // Interior stays untouched.
        assert_eq!(*annotated.get_pixel(40, 35), Rgb([255, 255, 255]));
    }

    #[test]
    fn annotate_without_font_leaves_margin_clean() {
        let page = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let zones = vec![zone(1, BoundingBox::new(30, 40, 20, 20), ZoneType::Price)];
        let annotated = annotate(&page, &zones, &[1], &VisualizationConfig::default());
        assert_eq!(*annotated.get_pixel(30, 20), Rgb([255, 255, 255]));
    }

    #[test]
    fn annotate_handles_zone_touching_image_edge() {
        let page = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let zones = vec![zone(1, BoundingBox::new(0, 0, 50, 50), ZoneType::Unknown)];
        let annotated = annotate(&page, &zones, &[1], &VisualizationConfig::default());
        assert_eq!(*annotated.get_pixel(0, 0), zone_color(ZoneType::Unknown));
    }
}
