//! Image processing building blocks for zone segmentation.

pub mod binarize;
pub mod geometry;
pub mod reading_order;
pub mod regions;

pub use geometry::BoundingBox;
