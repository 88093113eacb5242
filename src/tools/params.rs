use schemars::JsonSchema;
use serde::Deserialize;

use crate::render::{ExportMode, OutputFormat};

/// Output controls shared by every listing tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RenderParams {
    #[schemars(
        description = "Response format: 'text' (default), 'json', 'csv', or 'none' (export only)"
    )]
    pub format: Option<String>,
    #[schemars(description = "Write results to a file: 'csv' or 'json' ('none' by default)")]
    pub export: Option<String>,
    #[schemars(description = "Include all metadata (artwork, track numbers, ISRC) in output")]
    pub full: Option<bool>,
}

impl RenderParams {
    pub(crate) fn format(&self) -> OutputFormat {
        match self.format.as_deref() {
            Some(s) => OutputFormat::parse(s),
            None => OutputFormat::Text,
        }
    }

    pub(crate) fn export(&self) -> ExportMode {
        self.export.as_deref().map(ExportMode::parse).unwrap_or_default()
    }

    pub(crate) fn full(&self) -> bool {
        self.full.unwrap_or(false)
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct LibraryPlaylistsParams {
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlaylistTracksParams {
    #[schemars(description = "Playlist ID (from get_library_playlists)")]
    pub playlist_id: Option<String>,
    #[schemars(description = "Playlist name (macOS only, uses AppleScript)")]
    pub playlist_name: Option<String>,
    #[schemars(description = "Filter tracks by name/artist (case-insensitive substring match)")]
    pub filter: Option<String>,
    #[schemars(description = "Max tracks to return (0 = all)")]
    pub limit: Option<usize>,
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckPlaylistParams {
    #[schemars(description = "Song name or artist to search for")]
    pub search: String,
    #[schemars(description = "Playlist ID (from get_library_playlists)")]
    pub playlist_id: Option<String>,
    #[schemars(description = "Playlist name (macOS only, uses AppleScript)")]
    pub playlist_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreatePlaylistParams {
    #[schemars(description = "Name for the new playlist")]
    pub name: String,
    #[schemars(description = "Optional description")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddToPlaylistParams {
    #[schemars(description = "Playlist ID (API mode, cross-platform)")]
    pub playlist_id: Option<String>,
    #[schemars(description = "Comma-separated track IDs: catalog (numeric) or library IDs")]
    pub track_ids: Option<String>,
    #[schemars(description = "Playlist name (macOS only, works on any playlist)")]
    pub playlist_name: Option<String>,
    #[schemars(description = "Track name for name-based matching (macOS only)")]
    pub track_name: Option<String>,
    #[schemars(description = "Artist name to disambiguate the track")]
    pub artist: Option<String>,
    #[schemars(description = "Add even when the track is already in the playlist (default false)")]
    pub allow_duplicates: Option<bool>,
    #[schemars(description = "Verify the add succeeded afterwards (default true)")]
    pub verify: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CopyPlaylistParams {
    #[schemars(description = "ID of the playlist to copy")]
    pub source_playlist_id: String,
    #[schemars(description = "Name for the new playlist")]
    pub new_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchLibraryParams {
    #[schemars(description = "Search term")]
    pub query: String,
    #[schemars(description = "Search scope: songs, artists, albums, or all (macOS only)")]
    pub search_type: Option<String>,
    #[schemars(description = "Max results (default 25, up to 100 on macOS)")]
    pub limit: Option<usize>,
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddToLibraryParams {
    #[schemars(description = "Comma-separated catalog song IDs (from search_catalog)")]
    pub catalog_ids: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecentlyPlayedParams {
    #[schemars(description = "Number of tracks to return (default 30, max 50)")]
    pub limit: Option<usize>,
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchCatalogParams {
    #[schemars(description = "Search term")]
    pub query: String,
    #[schemars(description = "Comma-separated types: songs, albums, artists, playlists")]
    pub types: Option<String>,
    #[schemars(description = "Max results per type (default 15)")]
    pub limit: Option<usize>,
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AlbumTracksParams {
    #[schemars(description = "Library album ID (l.xxx) or catalog album ID (numeric)")]
    pub album_id: String,
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BrowseLibraryParams {
    #[schemars(description = "What to browse: songs, albums, artists, or videos")]
    pub item_type: Option<String>,
    #[schemars(description = "Max items (default 100, 0 for all; only applies to songs)")]
    pub limit: Option<usize>,
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DiscoveryParams {
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecentlyAddedParams {
    #[schemars(description = "Number of items to return (default 50)")]
    pub limit: Option<usize>,
    #[serde(flatten)]
    pub render: RenderParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ArtistNameParams {
    #[schemars(description = "Artist name to search for")]
    pub artist_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SongIdParams {
    #[schemars(description = "Catalog song ID (from search_catalog)")]
    pub song_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RatingParams {
    #[schemars(description = "One of: love, dislike, get, set")]
    pub action: String,
    #[schemars(description = "Track name for name-based lookup")]
    pub track_name: Option<String>,
    #[schemars(description = "Artist name to disambiguate")]
    pub artist: Option<String>,
    #[schemars(description = "0-5 stars (for the 'set' action)")]
    pub stars: Option<i64>,
    #[schemars(description = "Catalog ID for direct love/dislike (alternative to track_name)")]
    pub song_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ChartsParams {
    #[schemars(description = "Chart type: 'songs', 'albums', 'music-videos', or 'playlists'")]
    pub chart_type: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct MusicVideosParams {
    #[schemars(description = "Search term (leave empty for featured music videos)")]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SuggestionsParams {
    #[schemars(description = "Partial search term (e.g. 'tay')")]
    pub term: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CacheParams {
    #[schemars(description = "'info' (default) to list export files, 'clear' to delete them")]
    pub action: Option<String>,
    #[schemars(description = "When clearing, only delete files older than this many days (0 = all)")]
    pub days_old: Option<i64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct OutputSizeParams {
    #[schemars(description = "Target character count to test (default 50000)")]
    pub target_chars: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlayTrackParams {
    #[schemars(description = "Name of the track to play (partial match works)")]
    pub track_name: String,
    #[schemars(description = "Artist name to disambiguate")]
    pub artist: Option<String>,
    #[schemars(description = "If the track is not in the library, open it in the Music app")]
    pub reveal: Option<bool>,
    #[schemars(description = "If the track is not in the library, add it first then play")]
    pub add_to_library: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlayPlaylistParams {
    #[schemars(description = "Name of the playlist to play")]
    pub playlist_name: String,
    #[schemars(description = "Shuffle the playlist (default false)")]
    pub shuffle: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlaybackControlParams {
    #[schemars(description = "One of: play, pause, playpause, stop, next, previous")]
    pub action: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct PlaybackSettingsParams {
    #[schemars(description = "Volume 0-100 (omit to leave unchanged)")]
    pub volume: Option<i64>,
    #[schemars(description = "'on' or 'off' (omit to leave unchanged)")]
    pub shuffle: Option<String>,
    #[schemars(description = "'off', 'one', or 'all' (omit to leave unchanged)")]
    pub repeat: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SeekParams {
    #[schemars(description = "Position in seconds from the start of the track")]
    pub seconds: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveFromPlaylistParams {
    #[schemars(description = "Name of the playlist")]
    pub playlist_name: String,
    #[schemars(description = "Name of the track to remove (substring match)")]
    pub track_name: Option<String>,
    #[schemars(description = "Artist name to disambiguate")]
    pub artist: Option<String>,
    #[schemars(description = "Persistent track ID for an exact match (overrides track_name)")]
    pub track_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveFromLibraryParams {
    #[schemars(description = "Name of the track to remove (substring match)")]
    pub track_name: Option<String>,
    #[schemars(description = "Artist name to disambiguate")]
    pub artist: Option<String>,
    #[schemars(description = "Persistent track ID for an exact match (overrides track_name)")]
    pub track_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlaylistNameParams {
    #[schemars(description = "Name of the playlist")]
    pub playlist_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RevealParams {
    #[schemars(description = "Name of the track (partial match works)")]
    pub track_name: String,
    #[schemars(description = "Artist name to disambiguate")]
    pub artist: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AirplayParams {
    #[schemars(description = "Device to switch to (partial match). Omit to list devices")]
    pub device_name: Option<String>,
}
