//! Semantic zone classification.
//!
//! Classification runs in two stages: regex patterns over the recognized
//! text preview (French and English business-document vocabulary), then a
//! positional fallback for zones whose preview matched nothing. A composite
//! score folds the preview confidence together with type, length and size
//! bonuses into a final zone confidence in [0, 1].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::ZoneType;
use crate::processors::BoundingBox;

/// Fraction of the page height treated as the top band.
const TOP_BAND: f32 = 0.15;
/// A top-band zone wider than this fraction of the page reads as a header
/// block; narrower ones read as reference numbers.
const HEADER_MIN_WIDTH_RATIO: f32 = 0.5;
/// Fraction of the page height past which zones count as bottom content.
const BOTTOM_BAND: f32 = 0.8;
/// A bottom zone shorter than this fraction of the page height reads as a
/// footer line rather than a signature block.
const FOOTER_MAX_HEIGHT_RATIO: f32 = 0.05;
/// Digit share above which a zone with a currency mark reads as a price.
const PRICE_DIGIT_RATIO: f32 = 0.3;
/// Aspect ratio above which an unmatched zone reads as a text line.
const PARAGRAPH_MIN_ASPECT: f32 = 5.0;

/// Semantic vocabulary, checked in priority order; the first matching type
/// wins. Each type folds its French and English cues into one alternation.
static SEMANTIC_PATTERNS: Lazy<Vec<(ZoneType, Regex)>> = Lazy::new(|| {
    let table: [(ZoneType, &str); 7] = [
        (
            ZoneType::Header,
            r"(?i)facture|devis|bon de commande|commande|invoice|quote|order|receipt|bill|soci[ée]t[ée]|company|corporation|entreprise|sarl|sas|sa\b|eurl|inc\.|ltd\.|llc|n°\s*\d+|numero|num[ée]ro|siret|siren|rcs",
        ),
        (
            ZoneType::Date,
            r"(?i)\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{1,2}\s+(janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[ûu]t|septembre|octobre|novembre|d[ée]cembre)|(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}|date\s*:",
        ),
        (
            ZoneType::Price,
            r"(?i)\d+[,.]\d{2}\s*[€$]|[€$]\s*\d+[,.]\d{2}|total|montant|prix|price|amount|somme|cost|tva|ttc|\bht\b|tax|vat|hors\s+taxe|toutes\s+taxes|\d+\s*%",
        ),
        (
            ZoneType::Address,
            r"(?i)\d+\s+(rue|avenue|boulevard|place|chemin|all[ée]e|impasse|street|road|lane|drive)|\d{5}\s+[a-zA-ZÀ-ÿ\s]+|adresse|address|france|paris|lyon|marseille|toulouse|bordeaux",
        ),
        (
            ZoneType::Reference,
            r"(?i)ref\s*:?\s*\w+|r[ée]f[ée]rence|reference|commande\s+n°|code\s+client|client\s+n°",
        ),
        (
            ZoneType::Signature,
            r"(?i)signature|sign[ée]|signed|cachet|stamp|tampon|lu\s+et\s+approuv[ée]|bon\s+pour\s+accord",
        ),
        (
            ZoneType::Footer,
            r"(?i)page\s+\d+|si[èe]ge\s+social|capital\s+social|mentions\s+l[ée]gales",
        ),
    ];
    table
        .into_iter()
        .map(|(zone_type, pattern)| {
            let regex = Regex::new(pattern)
                .unwrap_or_else(|e| panic!("invalid semantic pattern for {zone_type}: {e}"));
            (zone_type, regex)
        })
        .collect()
});

/// Outcome of classifying one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub zone_type: ZoneType,
    /// Composite confidence in [0, 1].
    pub confidence: f32,
}

/// Classifies a zone from its text preview and page position.
///
/// `preview_confidence` is the mean recognition confidence of the preview
/// in [0, 100]; pass 0.0 when no preview text is available.
pub fn classify_zone(
    preview: &str,
    preview_confidence: f32,
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
) -> Classification {
    let zone_type = semantic_type(preview)
        .unwrap_or_else(|| positional_type(preview, bbox, image_width, image_height));
    Classification {
        zone_type,
        confidence: score(zone_type, preview, preview_confidence, bbox, image_width, image_height),
    }
}

fn semantic_type(preview: &str) -> Option<ZoneType> {
    let text = preview.trim();
    if text.is_empty() {
        return None;
    }
    SEMANTIC_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(zone_type, _)| *zone_type)
}

/// Positional fallback for zones with no semantic match.
fn positional_type(
    preview: &str,
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
) -> ZoneType {
    let page_height = image_height.max(1) as f32;
    let page_width = image_width.max(1) as f32;
    let relative_y = bbox.y as f32 / page_height;

    if relative_y < TOP_BAND {
        return if bbox.width as f32 > page_width * HEADER_MIN_WIDTH_RATIO {
            ZoneType::Header
        } else {
            ZoneType::Reference
        };
    }
    if relative_y > BOTTOM_BAND {
        return if (bbox.height as f32 / page_height) < FOOTER_MAX_HEIGHT_RATIO {
            ZoneType::Footer
        } else {
            ZoneType::Signature
        };
    }

    let text = preview.trim();
    if !text.is_empty() {
        let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
        let digit_ratio = digits as f32 / text.chars().count() as f32;
        let has_currency =
            ['€', '$', '%', ','].iter().any(|symbol| text.contains(*symbol));
        if digit_ratio > PRICE_DIGIT_RATIO && has_currency {
            return ZoneType::Price;
        }
    }
    if bbox.aspect_ratio() > PARAGRAPH_MIN_ASPECT {
        return ZoneType::Paragraph;
    }
    ZoneType::Unknown
}

/// Composite confidence: recognition confidence plus type, length and size
/// bonuses, clamped to [0, 1].
fn score(
    zone_type: ZoneType,
    preview: &str,
    preview_confidence: f32,
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
) -> f32 {
    let type_bonus = match zone_type {
        ZoneType::Header => 0.1,
        ZoneType::Price => 0.15,
        ZoneType::Date => 0.1,
        ZoneType::Reference => 0.05,
        ZoneType::Unknown => -0.1,
        _ => 0.0,
    };
    let length_bonus = (preview.trim().chars().count() as f32 / 100.0).min(0.2);

    let page_area = (image_width as f64 * image_height as f64).max(1.0);
    let area_ratio = (bbox.area() as f64 / page_area) as f32;
    let size_bonus = if (0.001..=0.3).contains(&area_ratio) {
        0.1
    } else {
        -0.1
    };

    (preview_confidence / 100.0 + type_bonus + length_bonus + size_bonus).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_box(y: u32, height: u32) -> BoundingBox {
        BoundingBox::new(100, y, 300, height)
    }

    #[test]
    fn invoice_keyword_classifies_as_header() {
        let result = classify_zone("FACTURE N° 2024-117", 85.0, &page_box(400, 40), 1000, 1000);
        assert_eq!(result.zone_type, ZoneType::Header);
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn numeric_date_wins_over_position() {
        // A date in the bottom band still classifies semantically.
        let result = classify_zone("Le 12/03/2024", 70.0, &page_box(900, 30), 1000, 1000);
        assert_eq!(result.zone_type, ZoneType::Date);
    }

    #[test]
    fn amount_with_currency_classifies_as_price() {
        let result = classify_zone("1 234,56 €", 90.0, &page_box(500, 30), 1000, 1000);
        assert_eq!(result.zone_type, ZoneType::Price);
    }

    #[test]
    fn top_band_splits_header_from_reference_by_width() {
        let wide = BoundingBox::new(100, 50, 600, 40);
        let result = classify_zone("", 0.0, &wide, 1000, 1000);
        assert_eq!(result.zone_type, ZoneType::Header);

        // A narrow block in the top band reads as a reference number.
        let narrow = classify_zone("", 0.0, &page_box(50, 40), 1000, 1000);
        assert_eq!(narrow.zone_type, ZoneType::Reference);
    }

    #[test]
    fn bottom_band_splits_footer_from_signature_by_height() {
        let footer = classify_zone("", 0.0, &page_box(900, 30), 1000, 1000);
        assert_eq!(footer.zone_type, ZoneType::Footer);
        let signature = classify_zone("", 0.0, &page_box(850, 120), 1000, 1000);
        assert_eq!(signature.zone_type, ZoneType::Signature);
    }

    #[test]
    fn wide_unmatched_zone_reads_as_paragraph() {
        let bbox = BoundingBox::new(100, 500, 600, 40);
        let result = classify_zone("lorem ipsum dolor", 60.0, &bbox, 1000, 1000);
        assert_eq!(result.zone_type, ZoneType::Paragraph);
    }

    #[test]
    fn square_unmatched_zone_stays_unknown_with_penalty() {
        let bbox = BoundingBox::new(400, 500, 100, 100);
        let matched = classify_zone("xyzzy", 50.0, &bbox, 1000, 1000);
        assert_eq!(matched.zone_type, ZoneType::Unknown);
        assert!(matched.confidence < 0.6);
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        let result = classify_zone(
            "TOTAL TTC 999,99 € montant somme prix toutes taxes comprises",
            100.0,
            &page_box(500, 60),
            1000,
            1000,
        );
        assert_eq!(result.zone_type, ZoneType::Price);
        assert!(result.confidence <= 1.0);
    }
}
