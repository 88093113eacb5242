//! Tiered output rendering for track and item listings.
//!
//! Callers are LLM agents with hard context budgets. Truncating a long
//! response would lose the tail of the list, so instead the renderer degrades
//! field richness uniformly: every item keeps its name and identifier, and
//! less essential fields are shed tier by tier until the rendering fits
//! [`MAX_OUTPUT_CHARS`]. Minimal is emitted even when it still exceeds the
//! budget; no further degradation is defined.

use std::fmt;
use std::path::Path;

use crate::types::{SimpleItem, Track, TrackExtras};

/// Character budget for rendered listings.
pub const MAX_OUTPUT_CHARS: usize = 50_000;

/// Cap on simple (non-track) item lines in text output.
const SIMPLE_ITEM_CAP: usize = 200;

/// Keys kept in JSON output unless full metadata was requested.
const STANDARD_KEYS: &[&str] = &[
    "name",
    "duration",
    "artist",
    "album",
    "year",
    "genre",
    "id",
    "track_count",
    "release_date",
];

/// Track CSV columns, standard then extras.
const TRACK_CSV_FIELDS: &[&str] = &["name", "duration", "artist", "album", "year", "genre", "id"];
const TRACK_CSV_EXTRAS: &[&str] = &[
    "track_number",
    "disc_number",
    "has_lyrics",
    "catalog_id",
    "composer",
    "isrc",
    "is_explicit",
    "preview_url",
    "artwork_url",
];

/// Rendering tier, most to least detailed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// name, artist, duration, album, year, genre, id, all verbatim.
    Full,
    /// Same fields, name/artist/album truncated to per-field caps.
    Clipped,
    /// Album and year dropped; name, artist, duration, genre, id.
    Compact,
    /// Duration also dropped; name, artist, genre, id.
    Minimal,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Clipped => "Clipped",
            Self::Compact => "Compact",
            Self::Minimal => "Minimal",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body format for listing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
    /// No response body; export info only.
    None,
}

impl OutputFormat {
    /// Unrecognized values behave like "none" (export-only).
    pub fn parse(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "json" => Self::Json,
            "csv" => Self::Csv,
            _ => Self::None,
        }
    }
}

/// File export mode for listing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    #[default]
    None,
    Csv,
    Json,
}

impl ExportMode {
    pub fn parse(s: &str) -> Self {
        match s {
            "csv" => Self::Csv,
            "json" => Self::Json,
            _ => Self::None,
        }
    }
}

/// Truncate to `max_len` characters, appending `...` when truncated.
pub fn clip(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let mut out: String = s.chars().take(max_len).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

/// Format milliseconds as `m:ss`. Zero or negative input yields an empty
/// string, which the line renderers treat as "omit the duration group".
pub fn format_duration_ms(ms: i64) -> String {
    if ms <= 0 {
        return String::new();
    }
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Join non-empty parts with single spaces. Empty fields and their
/// surrounding punctuation are omitted entirely rather than rendered empty.
fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

fn name_artist(name: &str, artist: &str) -> String {
    if artist.is_empty() {
        name.to_string()
    } else {
        format!("{name} - {artist}")
    }
}

fn paren(s: &str) -> String {
    if s.is_empty() { String::new() } else { format!("({s})") }
}

fn bracket(s: &str) -> String {
    if s.is_empty() { String::new() } else { format!("[{s}]") }
}

/// Full: `Name - Artist (Duration) Album [Year] Genre Id`.
pub(crate) fn line_full(t: &Track) -> String {
    join_parts(&[
        name_artist(&t.name, &t.artist),
        paren(&t.duration),
        t.album.clone(),
        bracket(&t.year),
        t.genre.clone(),
        t.id.clone(),
    ])
}

/// Clipped: same fields as Full with name/artist/album truncated.
fn line_clipped(t: &Track) -> String {
    join_parts(&[
        name_artist(&clip(&t.name, 35), &clip(&t.artist, 22)),
        paren(&t.duration),
        clip(&t.album, 30),
        bracket(&t.year),
        t.genre.clone(),
        t.id.clone(),
    ])
}

/// Compact: album and year dropped.
fn line_compact(t: &Track) -> String {
    join_parts(&[
        name_artist(&clip(&t.name, 40), &clip(&t.artist, 25)),
        paren(&t.duration),
        t.genre.clone(),
        t.id.clone(),
    ])
}

/// Minimal: duration also dropped.
fn line_minimal(t: &Track) -> String {
    join_parts(&[
        name_artist(&clip(&t.name, 30), &clip(&t.artist, 20)),
        t.genre.clone(),
        t.id.clone(),
    ])
}

/// Rendered size: line characters plus one newline between lines.
fn char_count(lines: &[String]) -> usize {
    let chars: usize = lines.iter().map(|l| l.chars().count()).sum();
    chars + lines.len().saturating_sub(1)
}

/// Render every track at the most detailed tier that fits the budget.
///
/// Returns the rendered lines and the chosen tier. An empty input renders as
/// no lines at the Full tier.
pub fn format_track_list(tracks: &[Track]) -> (Vec<String>, Tier) {
    if tracks.is_empty() {
        return (Vec::new(), Tier::Full);
    }

    let full: Vec<String> = tracks.iter().map(line_full).collect();
    if char_count(&full) <= MAX_OUTPUT_CHARS {
        return (full, Tier::Full);
    }

    let clipped: Vec<String> = tracks.iter().map(line_clipped).collect();
    if char_count(&clipped) <= MAX_OUTPUT_CHARS {
        return (clipped, Tier::Clipped);
    }

    let compact: Vec<String> = tracks.iter().map(line_compact).collect();
    if char_count(&compact) <= MAX_OUTPUT_CHARS {
        return (compact, Tier::Compact);
    }

    (tracks.iter().map(line_minimal).collect(), Tier::Minimal)
}

// ---------------------------------------------------------------------------
// CSV / JSON serialization
// ---------------------------------------------------------------------------

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    fields.iter().map(|f| csv_escape(f)).collect::<Vec<_>>().join(",")
}

fn opt_num(n: Option<i64>) -> String {
    n.map(|v| v.to_string()).unwrap_or_default()
}

fn track_csv_values(t: &Track, full: bool) -> Vec<String> {
    let mut values = vec![
        t.name.clone(),
        t.duration.clone(),
        t.artist.clone(),
        t.album.clone(),
        t.year.clone(),
        t.genre.clone(),
        t.id.clone(),
    ];
    if full {
        let default = TrackExtras::default();
        let e = t.extras.as_ref().unwrap_or(&default);
        values.extend([
            opt_num(e.track_number),
            opt_num(e.disc_number),
            e.has_lyrics.to_string(),
            e.catalog_id.clone(),
            e.composer.clone(),
            e.isrc.clone(),
            e.is_explicit.to_string(),
            e.preview_url.clone(),
            e.artwork_url.clone(),
        ]);
    }
    values
}

fn tracks_csv(tracks: &[Track], full: bool) -> String {
    let mut fields: Vec<&str> = TRACK_CSV_FIELDS.to_vec();
    if full {
        fields.extend(TRACK_CSV_EXTRAS);
    }
    let mut out = String::new();
    out.push_str(&fields.join(","));
    out.push_str("\r\n");
    for t in tracks {
        out.push_str(&csv_row(&track_csv_values(t, full)));
        out.push_str("\r\n");
    }
    out
}

fn json_value_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn simple_csv(items: &[SimpleItem]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let mut fields = vec!["name"];
    if first.artist.is_some() {
        fields.push("artist");
    }
    fields.push("id");
    fields.extend(first.extra.iter().map(|(k, _)| *k));

    let mut out = String::new();
    out.push_str(&fields.join(","));
    out.push_str("\r\n");
    for item in items {
        let mut values = vec![item.name.clone()];
        if let Some(artist) = &item.artist {
            values.push(artist.clone());
        }
        values.push(item.id.clone());
        values.extend(item.extra.iter().map(|(_, v)| json_value_cell(v)));
        out.push_str(&csv_row(&values));
        out.push_str("\r\n");
    }
    out
}

pub(crate) fn track_json(t: &Track, full: bool) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("name".into(), t.name.clone().into());
    map.insert("duration".into(), t.duration.clone().into());
    map.insert("artist".into(), t.artist.clone().into());
    map.insert("album".into(), t.album.clone().into());
    map.insert("year".into(), t.year.clone().into());
    map.insert("genre".into(), t.genre.clone().into());
    map.insert("id".into(), t.id.clone().into());
    if full && let Some(e) = &t.extras {
        map.insert("track_number".into(), e.track_number.into());
        map.insert("disc_number".into(), e.disc_number.into());
        map.insert("has_lyrics".into(), e.has_lyrics.into());
        map.insert("catalog_id".into(), e.catalog_id.clone().into());
        map.insert("composer".into(), e.composer.clone().into());
        map.insert("isrc".into(), e.isrc.clone().into());
        map.insert("is_explicit".into(), e.is_explicit.into());
        map.insert("preview_url".into(), e.preview_url.clone().into());
        map.insert("artwork_url".into(), e.artwork_url.clone().into());
    }
    serde_json::Value::Object(map)
}

fn simple_json(item: &SimpleItem, full: bool) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("name".into(), item.name.clone().into());
    if let Some(artist) = &item.artist {
        map.insert("artist".into(), artist.clone().into());
    }
    map.insert("id".into(), item.id.clone().into());
    for (k, v) in &item.extra {
        map.insert((*k).into(), v.clone());
    }
    if !full {
        map.retain(|k, _| STANDARD_KEYS.contains(&k.as_str()));
    }
    serde_json::Value::Object(map)
}

fn json_dump(values: Vec<serde_json::Value>) -> String {
    serde_json::to_string_pretty(&serde_json::Value::Array(values))
        .unwrap_or_else(|_| "[]".to_string())
}

// ---------------------------------------------------------------------------
// Top-level rendering
// ---------------------------------------------------------------------------

fn export_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn write_export(
    export_dir: &Path,
    file_prefix: &str,
    ext: &str,
    content: &str,
    count: usize,
    parts: &mut Vec<String>,
) {
    let path = export_dir.join(format!("{file_prefix}_{}.{ext}", export_timestamp()));
    let result = std::fs::create_dir_all(export_dir).and_then(|()| std::fs::write(&path, content));
    match result {
        Ok(()) => parts.push(format!("Exported {count} items: {}", path.display())),
        Err(e) => {
            eprintln!("[applemusic] export write failed: {e}");
            parts.push(format!("Export failed: {e}"));
        }
    }
}

/// Render a track listing in the requested format, with optional file export.
pub fn render_tracks(
    tracks: &[Track],
    format: OutputFormat,
    export: ExportMode,
    full: bool,
    file_prefix: &str,
    export_dir: &Path,
) -> String {
    if tracks.is_empty() {
        return match format {
            OutputFormat::Json => "[]".to_string(),
            _ => "No results".to_string(),
        };
    }

    let mut parts: Vec<String> = Vec::new();
    match format {
        OutputFormat::Json => {
            parts.push(json_dump(tracks.iter().map(|t| track_json(t, full)).collect()));
        }
        OutputFormat::Csv => parts.push(tracks_csv(tracks, full)),
        OutputFormat::Text => {
            let (lines, tier) = format_track_list(tracks);
            parts.push(format!("=== {} items ({tier} format) ===\n", tracks.len()));
            parts.push(lines.join("\n"));
        }
        OutputFormat::None => {}
    }

    match export {
        ExportMode::Csv => {
            let content = tracks_csv(tracks, full);
            write_export(export_dir, file_prefix, "csv", &content, tracks.len(), &mut parts);
        }
        ExportMode::Json => {
            let content = json_dump(tracks.iter().map(|t| track_json(t, full)).collect());
            write_export(export_dir, file_prefix, "json", &content, tracks.len(), &mut parts);
        }
        ExportMode::None => {}
    }

    if parts.is_empty() {
        return format!("{} items (use export='csv' or 'json' to save)", tracks.len());
    }
    parts.join("\n")
}

/// Render a non-track listing (playlists, albums, artists, videos).
pub fn render_simple(
    items: &[SimpleItem],
    format: OutputFormat,
    export: ExportMode,
    full: bool,
    file_prefix: &str,
    export_dir: &Path,
) -> String {
    if items.is_empty() {
        return match format {
            OutputFormat::Json => "[]".to_string(),
            _ => "No results".to_string(),
        };
    }

    let mut parts: Vec<String> = Vec::new();
    match format {
        OutputFormat::Json => {
            parts.push(json_dump(items.iter().map(|i| simple_json(i, full)).collect()));
        }
        OutputFormat::Csv => parts.push(simple_csv(items)),
        OutputFormat::Text => {
            parts.push(format!("=== {} items ===\n", items.len()));
            for item in items.iter().take(SIMPLE_ITEM_CAP) {
                match &item.artist {
                    Some(artist) => parts.push(format!("{} - {} {}", item.name, artist, item.id)),
                    None => parts.push(format!("{} {}", item.name, item.id)),
                }
            }
        }
        OutputFormat::None => {}
    }

    match export {
        ExportMode::Csv => {
            let content = simple_csv(items);
            write_export(export_dir, file_prefix, "csv", &content, items.len(), &mut parts);
        }
        ExportMode::Json => {
            let content = json_dump(items.iter().map(|i| simple_json(i, full)).collect());
            write_export(export_dir, file_prefix, "json", &content, items.len(), &mut parts);
        }
        ExportMode::None => {}
    }

    if parts.is_empty() {
        return format!("{} items (use export='csv' or 'json' to save)", items.len());
    }
    parts.join("\n")
}

/// Sanitize a string for use in an export filename.
pub fn safe_file_component(s: &str) -> String {
    s.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artist: &str, duration: &str, album: &str, id: &str) -> Track {
        Track {
            name: name.to_string(),
            artist: artist.to_string(),
            duration: duration.to_string(),
            album: album.to_string(),
            id: id.to_string(),
            ..Track::default()
        }
    }

    #[test]
    fn duration_formats_minutes_seconds() {
        assert_eq!(format_duration_ms(225_000), "3:45");
    }

    #[test]
    fn duration_over_an_hour_stays_in_minutes() {
        assert_eq!(format_duration_ms(3_930_000), "65:30");
    }

    #[test]
    fn duration_zero_or_negative_is_empty() {
        assert_eq!(format_duration_ms(0), "");
        assert_eq!(format_duration_ms(-5), "");
    }

    #[test]
    fn duration_sub_second_rounds_down() {
        assert_eq!(format_duration_ms(999), "0:00");
    }

    #[test]
    fn clip_leaves_short_strings_alone() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("exactly_10", 10), "exactly_10");
    }

    #[test]
    fn clip_truncates_with_ellipsis() {
        assert_eq!(clip("abcdefghijk", 5), "abcde...");
    }

    #[test]
    fn clip_counts_characters_not_bytes() {
        assert_eq!(clip("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn full_line_renders_expected_literal() {
        let t = track("Song", "Artist", "3:00", "Album", "123");
        let (lines, tier) = format_track_list(&[t]);
        assert_eq!(tier, Tier::Full);
        assert_eq!(lines, vec!["Song - Artist (3:00) Album 123".to_string()]);
    }

    #[test]
    fn full_line_with_year_and_genre() {
        let mut t = track("Song", "Artist", "3:00", "Album", "123");
        t.year = "1999".into();
        t.genre = "Electronic".into();
        let (lines, _) = format_track_list(&[t]);
        assert_eq!(lines[0], "Song - Artist (3:00) Album [1999] Electronic 123");
    }

    #[test]
    fn empty_duration_omits_parens() {
        let t = track("Song", "Artist", "", "Album", "123");
        let (lines, _) = format_track_list(&[t]);
        assert_eq!(lines[0], "Song - Artist Album 123");
    }

    #[test]
    fn empty_album_and_year_omitted() {
        let t = track("Song", "Artist", "3:00", "", "123");
        let (lines, _) = format_track_list(&[t]);
        assert_eq!(lines[0], "Song - Artist (3:00) 123");
    }

    #[test]
    fn empty_artist_omits_separator() {
        let t = track("Song", "", "3:00", "", "123");
        let (lines, _) = format_track_list(&[t]);
        assert_eq!(lines[0], "Song (3:00) 123");
    }

    #[test]
    fn empty_list_is_full_tier() {
        let (lines, tier) = format_track_list(&[]);
        assert!(lines.is_empty());
        assert_eq!(tier, Tier::Full);
    }

    #[test]
    fn small_list_never_degrades() {
        let tracks: Vec<Track> = (0..50)
            .map(|i| track(&format!("Track {i}"), "Artist", "3:00", "Album", &i.to_string()))
            .collect();
        let (_, tier) = format_track_list(&tracks);
        assert_eq!(tier, Tier::Full);
    }

    #[test]
    fn oversized_names_degrade_to_clipped() {
        let long_name = "N".repeat(600);
        let tracks: Vec<Track> = (0..100)
            .map(|i| track(&long_name, "A", "3:00", "B", &i.to_string()))
            .collect();
        let (lines, tier) = format_track_list(&tracks);
        assert_eq!(tier, Tier::Clipped);
        assert!(lines[0].starts_with(&"N".repeat(35)));
        assert!(lines[0].contains("..."));
        assert!(char_count(&lines) <= MAX_OUTPUT_CHARS);
    }

    #[test]
    fn long_albums_degrade_to_compact() {
        // Clipped still carries the (capped) album; at this count that is
        // over budget while Compact, which drops it, fits.
        let tracks: Vec<Track> = (0..550)
            .map(|i| {
                track(
                    &"N".repeat(60),
                    &"A".repeat(30),
                    "3:00",
                    &"B".repeat(80),
                    &format!("{i:04}"),
                )
            })
            .collect();
        let (lines, tier) = format_track_list(&tracks);
        assert_eq!(tier, Tier::Compact);
        assert!(!lines[0].contains('B'));
        assert!(char_count(&lines) <= MAX_OUTPUT_CHARS);
    }

    #[test]
    fn minimal_emitted_even_over_budget() {
        let tracks: Vec<Track> = (0..1200)
            .map(|i| track(&"N".repeat(60), &"A".repeat(30), "3:00", "", &format!("{i:04}")))
            .collect();
        let (lines, tier) = format_track_list(&tracks);
        assert_eq!(tier, Tier::Minimal);
        assert_eq!(lines.len(), 1200);
        assert!(char_count(&lines) > MAX_OUTPUT_CHARS);
        assert!(!lines[0].contains("3:00"));
    }

    #[test]
    fn compact_and_minimal_keep_genre() {
        let mut t = track(&"N".repeat(60), "Artist", "3:00", "Album", "123");
        t.genre = "Jungle".into();
        assert!(line_compact(&t).contains("Jungle"));
        assert!(line_minimal(&t).contains("Jungle"));
        assert!(!line_compact(&t).contains("Album"));
        assert!(!line_minimal(&t).contains("3:00"));
    }

    #[test]
    fn render_text_has_header_and_blank_line() {
        let tracks = vec![track("Song", "Artist", "3:00", "Album", "123")];
        let out = render_tracks(
            &tracks,
            OutputFormat::Text,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        assert_eq!(out, "=== 1 items (Full format) ===\n\nSong - Artist (3:00) Album 123");
    }

    #[test]
    fn render_empty_listing() {
        let out = render_tracks(
            &[],
            OutputFormat::Text,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        assert_eq!(out, "No results");
        let out = render_tracks(
            &[],
            OutputFormat::Json,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        assert_eq!(out, "[]");
    }

    #[test]
    fn json_keeps_standard_keys_unless_full() {
        let mut t = track("Song", "Artist", "3:00", "Album", "123");
        t.extras = Some(TrackExtras {
            isrc: "USX123".into(),
            is_explicit: true,
            ..TrackExtras::default()
        });
        let out = render_tracks(
            &[t.clone()],
            OutputFormat::Json,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["name"], "Song");
        assert!(parsed[0].get("isrc").is_none());

        let out = render_tracks(
            &[t],
            OutputFormat::Json,
            ExportMode::None,
            true,
            "test",
            Path::new("/tmp"),
        );
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["isrc"], "USX123");
        assert_eq!(parsed[0]["is_explicit"], true);
    }

    #[test]
    fn csv_escapes_delimiters_and_quotes() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let tracks = vec![track("Song, Pt. 1", "Artist", "3:00", "Album", "123")];
        let out = render_tracks(
            &tracks,
            OutputFormat::Csv,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("name,duration,artist,album,year,genre,id"));
        assert_eq!(lines.next(), Some("\"Song, Pt. 1\",3:00,Artist,Album,,,123"));
    }

    #[test]
    fn simple_items_render_with_optional_artist() {
        let items = vec![
            SimpleItem {
                name: "Liked".into(),
                artist: None,
                id: "p.1".into(),
                extra: vec![("track_count", 12.into())],
            },
            SimpleItem {
                name: "Homework".into(),
                artist: Some("Daft Punk".into()),
                id: "a.2".into(),
                extra: Vec::new(),
            },
        ];
        let out = render_simple(
            &items,
            OutputFormat::Text,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        assert_eq!(out, "=== 2 items ===\n\nLiked p.1\nHomework - Daft Punk a.2");
    }

    #[test]
    fn simple_items_capped_at_two_hundred() {
        let items: Vec<SimpleItem> = (0..205)
            .map(|i| SimpleItem {
                name: format!("Item {i}"),
                artist: None,
                id: i.to_string(),
                extra: Vec::new(),
            })
            .collect();
        let out = render_simple(
            &items,
            OutputFormat::Text,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        assert!(out.starts_with("=== 205 items ===\n"));
        // Header part plus 200 item lines.
        assert_eq!(out.lines().count(), 202);
    }

    #[test]
    fn simple_json_filters_non_standard_keys() {
        let items = vec![SimpleItem {
            name: "Mix".into(),
            artist: None,
            id: "p.9".into(),
            extra: vec![("can_edit", true.into()), ("track_count", 4.into())],
        }];
        let out = render_simple(
            &items,
            OutputFormat::Json,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["track_count"], 4);
        assert!(parsed[0].get("can_edit").is_none());

        let out = render_simple(
            &items,
            OutputFormat::Json,
            ExportMode::None,
            true,
            "test",
            Path::new("/tmp"),
        );
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["can_edit"], true);
    }

    #[test]
    fn format_none_reports_count_only() {
        let tracks = vec![track("Song", "Artist", "3:00", "Album", "123")];
        let out = render_tracks(
            &tracks,
            OutputFormat::None,
            ExportMode::None,
            false,
            "test",
            Path::new("/tmp"),
        );
        assert_eq!(out, "1 items (use export='csv' or 'json' to save)");
    }

    #[test]
    fn export_writes_file_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let tracks = vec![track("Song", "Artist", "3:00", "Album", "123")];
        let out = render_tracks(
            &tracks,
            OutputFormat::None,
            ExportMode::Csv,
            false,
            "playlist_test",
            dir.path(),
        );
        assert!(out.starts_with("Exported 1 items: "), "unexpected output: {out}");
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let name = files[0].as_ref().unwrap().file_name();
        let name = name.to_string_lossy();
        assert!(name.starts_with("playlist_test_") && name.ends_with(".csv"));
    }

    #[test]
    fn unknown_format_behaves_like_none() {
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::None);
        assert_eq!(ExportMode::parse("csv"), ExportMode::Csv);
        assert_eq!(ExportMode::parse("xml"), ExportMode::None);
    }

    #[test]
    fn safe_file_component_replaces_punctuation() {
        assert_eq!(safe_file_component("My Mix!"), "My_Mix_");
        assert_eq!(safe_file_component("p.12345"), "p_12345");
    }
}
