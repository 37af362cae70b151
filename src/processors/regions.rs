//! Candidate region extraction, filtering and zone merging.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use crate::core::config::DetectionParams;
use crate::domain::Zone;
use crate::processors::binarize::BACKGROUND;
use crate::processors::geometry::BoundingBox;

/// Bounding rectangles of the 8-connected foreground components of a
/// binary mask, in raster order of their top-left corners.
///
/// The explicit ordering makes detection order reproducible across runs
/// regardless of labelling internals.
pub fn component_boxes(binary: &GrayImage) -> Vec<BoundingBox> {
    let labels = connected_components(binary, Connectivity::Eight, Luma([BACKGROUND]));

    let mut extents: HashMap<u32, (u32, u32, u32, u32)> = HashMap::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        extents
            .entry(label)
            .and_modify(|(min_x, min_y, max_x, max_y)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
            })
            .or_insert((x, y, x, y));
    }

    let mut boxes: Vec<BoundingBox> = extents
        .into_values()
        .map(|(min_x, min_y, max_x, max_y)| {
            BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
        })
        .collect();
    boxes.sort_by_key(|bbox| (bbox.y, bbox.x, bbox.height, bbox.width));
    boxes
}

/// Applies the size and aspect filters from the detection parameters.
pub fn filter_candidates(
    boxes: Vec<BoundingBox>,
    params: &DetectionParams,
    image_width: u32,
    image_height: u32,
) -> Vec<BoundingBox> {
    let page_area = (image_width as f64 * image_height as f64).max(1.0);
    let before = boxes.len();
    let kept: Vec<BoundingBox> = boxes
        .into_iter()
        .filter(|bbox| {
            let area_ratio = (bbox.area() as f64 / page_area) as f32;
            let aspect = bbox.aspect_ratio();
            area_ratio >= params.min_area_ratio
                && area_ratio <= params.max_area_ratio
                && bbox.width >= params.min_width
                && bbox.height >= params.min_height
                && aspect >= params.min_aspect_ratio
                && aspect <= params.max_aspect_ratio
        })
        .collect();
    debug!(before, after = kept.len(), "size/aspect filtering");
    kept
}

/// Texture check separating text from fills, rules and blank framing.
///
/// A text region has mixed ink: its intensity varies and the fraction of
/// pixels darker than the regional mean sits away from both extremes.
pub fn looks_like_text(gray: &GrayImage, bbox: &BoundingBox, params: &DetectionParams) -> bool {
    let pixel_count = bbox.area();
    if pixel_count == 0 {
        return false;
    }

    let mut sum = 0.0f64;
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            sum += gray.get_pixel(x, y).0[0] as f64;
        }
    }
    let mean = sum / pixel_count as f64;

    let mut variance = 0.0f64;
    let mut dark = 0u64;
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            let value = gray.get_pixel(x, y).0[0] as f64;
            variance += (value - mean) * (value - mean);
            if value < mean {
                dark += 1;
            }
        }
    }
    let std_dev = (variance / pixel_count as f64).sqrt() as f32;
    let density = dark as f32 / pixel_count as f32;

    std_dev >= params.min_std_dev && density >= params.min_density && density <= params.max_density
}

/// Merges nearby same-type zones whose confidences agree.
///
/// Two zones merge when their center distance is below
/// `merge_distance_ratio` times their mean half-extent and their
/// confidences differ by less than `max_confidence_diff`. The merged zone
/// takes the union box, the area-weighted confidence and the concatenated
/// previews. Ids are reassigned 1..n afterwards so they stay unique.
pub fn merge_similar_zones(
    zones: Vec<Zone>,
    merge_distance_ratio: f32,
    max_confidence_diff: f32,
) -> Vec<Zone> {
    if zones.len() <= 1 {
        return zones;
    }

    let mut merged: Vec<Zone> = Vec::with_capacity(zones.len());
    let mut used = vec![false; zones.len()];

    for i in 0..zones.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![i];
        for j in i + 1..zones.len() {
            if used[j] {
                continue;
            }
            if should_merge(&zones[i], &zones[j], merge_distance_ratio, max_confidence_diff) {
                used[j] = true;
                group.push(j);
            }
        }
        if group.len() == 1 {
            merged.push(zones[i].clone());
        } else {
            debug!(count = group.len(), zone_type = %zones[i].zone_type, "merging zone group");
            merged.push(merge_group(&zones, &group));
        }
    }

    for (index, zone) in merged.iter_mut().enumerate() {
        zone.id = index as u32 + 1;
    }
    merged
}

fn should_merge(a: &Zone, b: &Zone, merge_distance_ratio: f32, max_confidence_diff: f32) -> bool {
    if a.zone_type != b.zone_type {
        return false;
    }
    if (a.confidence - b.confidence).abs() >= max_confidence_diff {
        return false;
    }
    let mean_half_extent = (a.bbox.width + a.bbox.height + b.bbox.width + b.bbox.height) as f32 / 4.0;
    a.bbox.center_distance(&b.bbox) < mean_half_extent * merge_distance_ratio
}

fn merge_group(zones: &[Zone], group: &[usize]) -> Zone {
    let first = &zones[group[0]];
    let bbox = group
        .iter()
        .skip(1)
        .fold(first.bbox, |acc, &i| acc.union(&zones[i].bbox));

    let total_area: f64 = group.iter().map(|&i| zones[i].bbox.area() as f64).sum();
    let confidence = if total_area > 0.0 {
        group
            .iter()
            .map(|&i| zones[i].confidence as f64 * zones[i].bbox.area() as f64)
            .sum::<f64>()
            / total_area
    } else {
        first.confidence as f64
    };

    let content_preview = group
        .iter()
        .map(|&i| zones[i].content_preview.trim())
        .filter(|preview| !preview.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Zone {
        id: first.id,
        bbox,
        zone_type: first.zone_type,
        confidence: confidence as f32,
        crop_path: None,
        content_preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ZoneType;
    use crate::processors::binarize::FOREGROUND;

    fn blob(image: &mut GrayImage, x0: u32, y0: u32, width: u32, height: u32) {
        for y in y0..y0 + height {
            for x in x0..x0 + width {
                image.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    fn zone(id: u32, bbox: BoundingBox, zone_type: ZoneType, confidence: f32) -> Zone {
        Zone {
            id,
            bbox,
            zone_type,
            confidence,
            crop_path: None,
            content_preview: format!("zone {id}"),
        }
    }

    #[test]
    fn component_boxes_finds_separate_blobs_in_raster_order() {
        let mut mask = GrayImage::from_pixel(100, 100, Luma([BACKGROUND]));
        blob(&mut mask, 60, 70, 20, 10);
        blob(&mut mask, 10, 10, 30, 5);

        let boxes = component_boxes(&mask);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0], BoundingBox::new(10, 10, 30, 5));
        assert_eq!(boxes[1], BoundingBox::new(60, 70, 20, 10));
    }

    #[test]
    fn filter_candidates_drops_undersized_boxes() {
        let params = DetectionParams::default();
        let boxes = vec![
            BoundingBox::new(0, 0, 5, 5),     // below min_width
            BoundingBox::new(0, 20, 100, 20), // acceptable
        ];
        let kept = filter_candidates(boxes, &params, 400, 400);
        assert_eq!(kept, vec![BoundingBox::new(0, 20, 100, 20)]);
    }

    #[test]
    fn looks_like_text_rejects_uniform_regions() {
        let params = DetectionParams::default();
        let uniform = GrayImage::from_pixel(50, 50, Luma([200]));
        let bbox = BoundingBox::new(5, 5, 40, 40);
        assert!(!looks_like_text(&uniform, &bbox, &params));
    }

    #[test]
    fn looks_like_text_accepts_striped_regions() {
        let params = DetectionParams::default();
        let mut striped = GrayImage::from_pixel(50, 50, Luma([255]));
        for y in 5..45 {
            for x in 5..45 {
                if x % 2 == 0 {
                    striped.put_pixel(x, y, Luma([0]));
                }
            }
        }
        let bbox = BoundingBox::new(5, 5, 40, 40);
        assert!(looks_like_text(&striped, &bbox, &params));
    }

    #[test]
    fn merge_joins_close_same_type_zones_and_reassigns_ids() {
        // Centers 30px apart against a 48px cutoff (0.8 x mean half-extent
        // of 60), so the first two merge; the third is far below.
        let zones = vec![
            zone(1, BoundingBox::new(10, 10, 80, 40), ZoneType::Paragraph, 0.6),
            zone(2, BoundingBox::new(40, 10, 80, 40), ZoneType::Paragraph, 0.65),
            zone(3, BoundingBox::new(10, 300, 80, 40), ZoneType::Paragraph, 0.6),
        ];
        let merged = merge_similar_zones(zones, 0.8, 0.3);
        assert_eq!(merged.len(), 2);
        let ids: Vec<u32> = merged.iter().map(|z| z.id).collect();
        assert_eq!(ids, vec![1, 2]);
        // The merged zone covers both source boxes.
        assert_eq!(merged[0].bbox, BoundingBox::new(10, 10, 110, 40));
        assert_eq!(merged[0].content_preview, "zone 1 zone 2");
    }

    #[test]
    fn merge_keeps_different_types_apart() {
        let zones = vec![
            zone(1, BoundingBox::new(10, 10, 80, 40), ZoneType::Header, 0.6),
            zone(2, BoundingBox::new(40, 10, 80, 40), ZoneType::Price, 0.6),
        ];
        let merged = merge_similar_zones(zones, 0.8, 0.3);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_respects_confidence_gap() {
        let zones = vec![
            zone(1, BoundingBox::new(10, 10, 80, 40), ZoneType::Paragraph, 0.9),
            zone(2, BoundingBox::new(40, 10, 80, 40), ZoneType::Paragraph, 0.2),
        ];
        let merged = merge_similar_zones(zones, 0.8, 0.3);
        assert_eq!(merged.len(), 2);
    }
}
