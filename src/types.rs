//! Shared data types for tracks, list items, and rating conversions.

/// A normalized track record, extracted from an API response or bridge row.
///
/// `duration` is pre-formatted (`"3:45"`) and empty when unknown, so the
/// renderer never has to re-derive it. `extras` is populated only when the
/// caller asked for full metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: String,
    pub duration: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub genre: String,
    pub id: String,
    pub extras: Option<TrackExtras>,
}

/// Additional metadata carried only in full exports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackExtras {
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub has_lyrics: bool,
    pub catalog_id: String,
    pub composer: String,
    pub isrc: String,
    pub is_explicit: bool,
    pub preview_url: String,
    pub artwork_url: String,
}

/// A non-track list item (playlist, album, artist, video, recommendation).
///
/// Rendered as `name - artist id` (or `name id` when `artist` is `None`).
/// `extra` carries additional fields for exports, in column order.
#[derive(Debug, Clone, Default)]
pub struct SimpleItem {
    pub name: String,
    pub artist: Option<String>,
    pub id: String,
    pub extra: Vec<(&'static str, serde_json::Value)>,
}

/// Convert a 0-5 star rating to the player's 0-100 rating scale.
/// Out-of-range input saturates at 5 stars.
pub fn stars_to_rating(stars: i64) -> i64 {
    stars.clamp(0, 5) * 20
}

/// Convert the player's 0-100 rating scale to 0-5 stars.
pub fn rating_to_stars(rating: i64) -> i64 {
    (rating.clamp(0, 100)) / 20
}

/// Render a star rating as filled/empty star glyphs, e.g. `★★★☆☆`.
pub fn star_glyphs(stars: i64) -> String {
    let stars = stars.clamp(0, 5) as usize;
    format!("{}{}", "★".repeat(stars), "☆".repeat(5 - stars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_roundtrip() {
        for stars in 0..=5i64 {
            let encoded = stars_to_rating(stars);
            let decoded = rating_to_stars(encoded);
            assert_eq!(
                stars, decoded,
                "roundtrip failed for {stars} stars (encoded: {encoded})"
            );
        }
    }

    #[test]
    fn rating_exact_values() {
        assert_eq!(stars_to_rating(0), 0);
        assert_eq!(stars_to_rating(1), 20);
        assert_eq!(stars_to_rating(3), 60);
        assert_eq!(stars_to_rating(5), 100);
    }

    #[test]
    fn stars_out_of_range_saturate() {
        assert_eq!(stars_to_rating(9), 100);
        assert_eq!(stars_to_rating(-3), 0);
    }

    #[test]
    fn rating_bucket_boundaries() {
        assert_eq!(rating_to_stars(0), 0);
        assert_eq!(rating_to_stars(19), 0);
        assert_eq!(rating_to_stars(20), 1);
        assert_eq!(rating_to_stars(99), 4);
        assert_eq!(rating_to_stars(100), 5);
    }

    #[test]
    fn glyphs() {
        assert_eq!(star_glyphs(0), "☆☆☆☆☆");
        assert_eq!(star_glyphs(3), "★★★☆☆");
        assert_eq!(star_glyphs(5), "★★★★★");
    }
}
