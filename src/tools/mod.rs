use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

mod catalog;
mod library;
mod params;
mod playback;

use params::*;

use crate::auth::{self, Preferences};
use crate::bridge;
use crate::cache::{self, MetadataCache};
use crate::error::MusicError;

/// Inner shared state (not Clone).
struct ServerState {
    config_dir: PathBuf,
    export_dir: PathBuf,
    cache: Mutex<MetadataCache>,
    bridge: OnceLock<Result<(), String>>,
    http: reqwest::Client,
}

impl ServerState {
    /// Metadata cache guard. Poisoning is recovered: the cache holds
    /// best-effort metadata, never an invariant.
    fn cache(&self) -> std::sync::MutexGuard<'_, MetadataCache> {
        self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Availability of the AppleScript bridge, probed once per process.
    fn bridge(&self) -> Result<(), MusicError> {
        match self.bridge.get_or_init(bridge::probe_osascript) {
            Ok(()) => Ok(()),
            Err(msg) => Err(MusicError::BridgeUnavailable(msg.clone())),
        }
    }

    fn has_bridge(&self) -> bool {
        self.bridge().is_ok()
    }

    /// Preferences are re-read per call so config file edits apply without
    /// a server restart.
    fn preferences(&self) -> Preferences {
        auth::load_preferences(&self.config_dir)
    }
}

/// MCP server for a personal Apple Music library.
#[derive(Clone)]
pub struct AppleMusicServer {
    state: Arc<ServerState>,
    tool_router: ToolRouter<Self>,
}

/// Every tool reports outcomes as text: failures become an `Error: ...`
/// body instead of a protocol error, so the calling model can read them
/// and adjust.
fn respond(result: Result<String, MusicError>) -> Result<CallToolResult, McpError> {
    let text = match result {
        Ok(text) => text,
        Err(e) => e.user_text(),
    };
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn default_export_dir() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join("applemusic-mcp")
}

use rmcp::handler::server::wrapper::Parameters;

#[tool_router]
impl AppleMusicServer {
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        let config_dir = config_dir
            .or_else(|| std::env::var_os("APPLEMUSIC_MCP_CONFIG_DIR").map(PathBuf::from))
            .unwrap_or_else(auth::default_config_dir);
        let cache_path = std::env::var_os("APPLEMUSIC_MCP_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(cache::default_path);
        let export_dir = std::env::var_os("APPLEMUSIC_MCP_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_export_dir);
        let http = reqwest::Client::builder()
            .user_agent("applemusic-mcp/0.1")
            .build()
            .expect("failed to build HTTP client");
        Self {
            state: Arc::new(ServerState {
                config_dir,
                export_dir,
                cache: Mutex::new(MetadataCache::open(cache_path)),
                bridge: OnceLock::new(),
                http,
            }),
            tool_router: Self::tool_router(),
        }
    }

    // -----------------------------------------------------------------------
    // Library
    // -----------------------------------------------------------------------

    #[tool(description = "List all playlists in your Apple Music library")]
    async fn get_library_playlists(
        &self,
        params: Parameters<LibraryPlaylistsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::get_library_playlists(&self.state, params.0).await)
    }

    #[tool(description = "List tracks in a playlist by ID (API) or by name (macOS AppleScript)")]
    async fn get_playlist_tracks(
        &self,
        params: Parameters<PlaylistTracksParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::get_playlist_tracks(&self.state, params.0).await)
    }

    #[tool(description = "Quick check whether a song or artist is already in a playlist")]
    async fn check_playlist(
        &self,
        params: Parameters<CheckPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::check_playlist(&self.state, params.0).await)
    }

    #[tool(
        description = "Create a new playlist. API-created playlists stay API-editable; without tokens macOS creates it locally"
    )]
    async fn create_playlist(
        &self,
        params: Parameters<CreatePlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::create_playlist(&self.state, params.0).await)
    }

    #[tool(description = "Add songs to a playlist by track IDs (API) or by track name (macOS)")]
    async fn add_to_playlist(
        &self,
        params: Parameters<AddToPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::add_to_playlist(&self.state, params.0).await)
    }

    #[tool(description = "Copy a playlist into a new API-editable playlist")]
    async fn copy_playlist(
        &self,
        params: Parameters<CopyPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::copy_playlist(&self.state, params.0).await)
    }

    #[tool(
        description = "Search your personal library (AppleScript on macOS, API fallback elsewhere)"
    )]
    async fn search_library(
        &self,
        params: Parameters<SearchLibraryParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::search_library(&self.state, params.0).await)
    }

    #[tool(description = "Add catalog songs to your personal library")]
    async fn add_to_library(
        &self,
        params: Parameters<AddToLibraryParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::add_to_library(&self.state, params.0).await)
    }

    #[tool(description = "Get recently played tracks from your listening history")]
    async fn get_recently_played(
        &self,
        params: Parameters<RecentlyPlayedParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::get_recently_played(&self.state, params.0).await)
    }

    #[tool(description = "Browse your library by type: songs, albums, artists, or videos")]
    async fn browse_library(
        &self,
        params: Parameters<BrowseLibraryParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::browse_library(&self.state, params.0).await)
    }

    #[tool(description = "Get personalized recommendations based on your listening history")]
    async fn get_recommendations(
        &self,
        params: Parameters<DiscoveryParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::get_recommendations(&self.state, params.0).await)
    }

    #[tool(description = "Get the content you have been playing frequently")]
    async fn get_heavy_rotation(
        &self,
        params: Parameters<DiscoveryParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::get_heavy_rotation(&self.state, params.0).await)
    }

    #[tool(description = "Get content recently added to your library")]
    async fn get_recently_added(
        &self,
        params: Parameters<RecentlyAddedParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::get_recently_added(&self.state, params.0).await)
    }

    #[tool(description = "View or clear exported files in the cache directory")]
    async fn cache(&self, params: Parameters<CacheParams>) -> Result<CallToolResult, McpError> {
        respond(library::cache(&self.state, params.0).await)
    }

    #[tool(description = "Diagnostic: walk playlists to test response size limits with real data")]
    async fn test_output_size(
        &self,
        params: Parameters<OutputSizeParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(library::test_output_size(&self.state, params.0).await)
    }

    #[tool(description = "Check whether the auth tokens are valid and the API is reachable")]
    async fn check_auth_status(&self) -> Result<CallToolResult, McpError> {
        respond(library::check_auth_status(&self.state).await)
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    #[tool(
        description = "Search the Apple Music catalog for songs, albums, artists, and playlists"
    )]
    async fn search_catalog(
        &self,
        params: Parameters<SearchCatalogParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::search_catalog(&self.state, params.0).await)
    }

    #[tool(description = "List all tracks on an album (library l.xxx or catalog numeric ID)")]
    async fn get_album_tracks(
        &self,
        params: Parameters<AlbumTracksParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_album_tracks(&self.state, params.0).await)
    }

    #[tool(description = "Get an artist's most popular songs")]
    async fn get_artist_top_songs(
        &self,
        params: Parameters<ArtistNameParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_artist_top_songs(&self.state, params.0).await)
    }

    #[tool(description = "Get artists similar to a given artist")]
    async fn get_similar_artists(
        &self,
        params: Parameters<ArtistNameParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_similar_artists(&self.state, params.0).await)
    }

    #[tool(description = "Get the radio station seeded by a song")]
    async fn get_song_station(
        &self,
        params: Parameters<SongIdParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_song_station(&self.state, params.0).await)
    }

    #[tool(description = "Get detailed catalog information for a song")]
    async fn get_song_details(
        &self,
        params: Parameters<SongIdParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_song_details(&self.state, params.0).await)
    }

    #[tool(description = "Get detailed information about an artist by name")]
    async fn get_artist_details(
        &self,
        params: Parameters<ArtistNameParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_artist_details(&self.state, params.0).await)
    }

    #[tool(description = "Get Apple Music charts: top songs, albums, music videos, or playlists")]
    async fn get_charts(
        &self,
        params: Parameters<ChartsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_charts(&self.state, params.0).await)
    }

    #[tool(description = "Search music videos, or list featured ones when no query is given")]
    async fn get_music_videos(
        &self,
        params: Parameters<MusicVideosParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_music_videos(&self.state, params.0).await)
    }

    #[tool(description = "List the music genres available in the catalog")]
    async fn get_genres(&self) -> Result<CallToolResult, McpError> {
        respond(catalog::get_genres(&self.state).await)
    }

    #[tool(description = "Get autocomplete suggestions for a partial search term")]
    async fn get_search_suggestions(
        &self,
        params: Parameters<SuggestionsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(catalog::get_search_suggestions(&self.state, params.0).await)
    }

    #[tool(description = "List Apple Music storefronts (regional markets)")]
    async fn get_storefronts(&self) -> Result<CallToolResult, McpError> {
        respond(catalog::get_storefronts(&self.state).await)
    }

    #[tool(description = "Get your personal radio station")]
    async fn get_personal_station(&self) -> Result<CallToolResult, McpError> {
        respond(catalog::get_personal_station(&self.state).await)
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    #[tool(
        description = "Play a track from your library (macOS only). Catalog songs can be revealed or added first"
    )]
    async fn play_track(
        &self,
        params: Parameters<PlayTrackParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::play_track(&self.state, params.0).await)
    }

    #[tool(description = "Start playing a playlist (macOS only)")]
    async fn play_playlist(
        &self,
        params: Parameters<PlayPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::play_playlist(&self.state, params.0).await)
    }

    #[tool(
        description = "Control playback: play, pause, playpause, stop, next, previous (macOS only)"
    )]
    async fn playback_control(
        &self,
        params: Parameters<PlaybackControlParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::playback_control(&self.state, params.0).await)
    }

    #[tool(description = "Get the currently playing track (macOS only)")]
    async fn get_now_playing(&self) -> Result<CallToolResult, McpError> {
        respond(playback::get_now_playing(&self.state).await)
    }

    #[tool(description = "Get or set volume, shuffle, and repeat (macOS only)")]
    async fn playback_settings(
        &self,
        params: Parameters<PlaybackSettingsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::playback_settings(&self.state, params.0).await)
    }

    #[tool(description = "Seek to a position in the current track (macOS only)")]
    async fn seek_to_position(
        &self,
        params: Parameters<SeekParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::seek_to_position(&self.state, params.0).await)
    }

    #[tool(description = "Remove a track from a playlist (macOS only)")]
    async fn remove_from_playlist(
        &self,
        params: Parameters<RemoveFromPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::remove_from_playlist(&self.state, params.0).await)
    }

    #[tool(description = "Remove a track from your library entirely (macOS only)")]
    async fn remove_from_library(
        &self,
        params: Parameters<RemoveFromLibraryParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::remove_from_library(&self.state, params.0).await)
    }

    #[tool(description = "Get the player state: playing, paused, or stopped (macOS only)")]
    async fn get_player_state(&self) -> Result<CallToolResult, McpError> {
        respond(playback::get_player_state(&self.state).await)
    }

    #[tool(description = "Delete a playlist (macOS only)")]
    async fn delete_playlist(
        &self,
        params: Parameters<PlaylistNameParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::delete_playlist(&self.state, params.0).await)
    }

    #[tool(description = "Reveal a track in the Music app window (macOS only)")]
    async fn reveal_in_music(
        &self,
        params: Parameters<RevealParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::reveal_in_music(&self.state, params.0).await)
    }

    #[tool(description = "List AirPlay devices or switch output to one (macOS only)")]
    async fn airplay(
        &self,
        params: Parameters<AirplayParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::airplay(&self.state, params.0).await)
    }

    #[tool(
        description = "Get library and player summary: counts, state, volume, shuffle, repeat (macOS only)"
    )]
    async fn get_library_stats(&self) -> Result<CallToolResult, McpError> {
        respond(playback::get_library_stats(&self.state).await)
    }

    #[tool(description = "Rate tracks: love, dislike, get stars, or set stars")]
    async fn rating(
        &self,
        params: Parameters<RatingParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(playback::rating(&self.state, params.0).await)
    }
}

#[tool_handler]
impl ServerHandler for AppleMusicServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Apple Music server. Search the catalog and your library, manage \
                 playlists, and control playback. Tools marked macOS only need the \
                 local Music app; everything else talks to the API and works on \
                 any platform."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
