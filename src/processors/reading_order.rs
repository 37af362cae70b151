//! Reading-order computation over detected zones.
//!
//! Two strategies: a plain raster sweep for classical mode, and a
//! layout-aware ordering for intelligent mode that pins headers to the
//! front, signatures and footers to the tail, and groups the body into
//! visual rows before sweeping left to right.

use crate::domain::{Zone, ZoneType};

/// Zone ids sorted by a top-to-bottom, left-to-right raster sweep.
///
/// Ties on both coordinates fall back to the id so the order is total.
pub fn raster_order(zones: &[Zone]) -> Vec<u32> {
    let mut order: Vec<&Zone> = zones.iter().collect();
    order.sort_by_key(|zone| (zone.bbox.y, zone.bbox.x, zone.id));
    order.into_iter().map(|zone| zone.id).collect()
}

/// Layout-aware reading order.
///
/// Headers always come first and signatures and footers always come last,
/// regardless of their geometry. The remaining zones are grouped into rows
/// of mutually overlapping vertical spans (overlap above `row_overlap_ratio`
/// joins a row), rows are ordered by their topmost member and zones within
/// a row left to right.
pub fn layout_order(zones: &[Zone], row_overlap_ratio: f32) -> Vec<u32> {
    let mut header: Vec<&Zone> = Vec::new();
    let mut tail: Vec<&Zone> = Vec::new();
    let mut body: Vec<&Zone> = Vec::new();

    for zone in zones {
        match zone.zone_type {
            ZoneType::Header => header.push(zone),
            ZoneType::Signature | ZoneType::Footer => tail.push(zone),
            _ => body.push(zone),
        }
    }

    header.sort_by_key(|zone| (zone.bbox.y, zone.bbox.x, zone.id));
    tail.sort_by_key(|zone| (zone.bbox.y, zone.bbox.x, zone.id));

    let mut order: Vec<u32> = header.iter().map(|zone| zone.id).collect();
    order.extend(row_grouped_order(&body, row_overlap_ratio));
    order.extend(tail.iter().map(|zone| zone.id));
    order
}

fn row_grouped_order(zones: &[&Zone], row_overlap_ratio: f32) -> Vec<u32> {
    let mut remaining: Vec<&Zone> = zones.to_vec();
    remaining.sort_by_key(|zone| (zone.bbox.y, zone.bbox.x, zone.id));

    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let anchor = remaining.remove(0);
        let mut row = vec![anchor];
        let mut index = 0;
        while index < remaining.len() {
            let overlaps = row.iter().any(|member| {
                member.bbox.vertical_overlap_ratio(&remaining[index].bbox) > row_overlap_ratio
            });
            if overlaps {
                row.push(remaining.remove(index));
            } else {
                index += 1;
            }
        }
        row.sort_by_key(|zone| (zone.bbox.x, zone.bbox.y, zone.id));
        order.extend(row.iter().map(|zone| zone.id));
    }
    order
}
