//! Library tools: playlists, library search, additions, browsing, and the
//! export cache. Each function backs one MCP tool and produces the final
//! text for its tool result.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::{Value, json};

use crate::api;
use crate::auth;
use crate::error::MusicError;
use crate::player;
use crate::render::{self, OutputFormat};
use crate::types::{SimpleItem, Track, TrackExtras};

use super::ServerState;
use super::params::{
    AddToLibraryParams, AddToPlaylistParams, BrowseLibraryParams, CacheParams,
    CheckPlaylistParams, CopyPlaylistParams, CreatePlaylistParams, DiscoveryParams,
    LibraryPlaylistsParams, OutputSizeParams, PlaylistTracksParams, RecentlyAddedParams,
    RecentlyPlayedParams, SearchLibraryParams,
};

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fill in the explicit flag from the metadata cache for tracks sourced from
/// AppleScript, which reports no content rating. No-op unless the
/// `fetch_explicit` preference is on.
fn annotate_explicit(state: &ServerState, tracks: &mut [Track]) {
    if !state.preferences().fetch_explicit {
        return;
    }
    let cache = state.cache();
    for track in tracks.iter_mut() {
        if track.id.is_empty() {
            continue;
        }
        if let Some(explicit) = cache.get_explicit(&track.id) {
            let extras = track.extras.get_or_insert_with(TrackExtras::default);
            extras.is_explicit = explicit == "Yes";
        }
    }
}

fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Shape a bridge-enumerated playlist like the API listing. The smart and
/// editable flags ride in `extra`, where the API rows carry `can_edit`;
/// the API has no smart playlists, so only this path reports them.
pub(super) fn bridge_playlist_item(p: &player::BridgePlaylist) -> SimpleItem {
    SimpleItem {
        name: p.name.clone(),
        artist: None,
        id: p.id.clone(),
        extra: vec![
            ("can_edit", json!(p.editable)),
            ("smart", json!(p.smart)),
            ("track_count", json!(p.track_count)),
            ("duration", json!(p.duration)),
        ],
    }
}

pub(super) async fn get_library_playlists(
    state: &ServerState,
    p: LibraryPlaylistsParams,
) -> Result<String, MusicError> {
    let playlists = match api::library_playlists(&state.http, &state.config_dir).await {
        Ok(playlists) => playlists,
        // Without usable tokens the local app can still enumerate playlists,
        // including smart playlists the API never reports.
        Err(MusicError::CredentialMissing(_) | MusicError::CredentialExpired(_))
            if state.has_bridge() =>
        {
            let local = player::get_playlists().await?;
            local.iter().map(bridge_playlist_item).collect()
        }
        Err(e) => return Err(e),
    };
    let out = render::render_simple(
        &playlists,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        "playlists",
        &state.export_dir,
    );
    if p.render.format() == OutputFormat::Text
        && let Some(warning) = auth::token_expiration_warning(&state.config_dir)
    {
        return Ok(format!("{warning}\n\n{out}"));
    }
    Ok(out)
}

pub(super) async fn get_playlist_tracks(
    state: &ServerState,
    p: PlaylistTracksParams,
) -> Result<String, MusicError> {
    let playlist_id = non_empty(p.playlist_id.as_deref());
    let playlist_name = non_empty(p.playlist_name.as_deref());
    if playlist_id.is_some() && playlist_name.is_some() {
        return Err(MusicError::InvalidArgument(
            "Provide either playlist_id or playlist_name, not both".to_string(),
        ));
    }

    let (mut tracks, prefix) = if let Some(name) = playlist_name {
        if !state.has_bridge() {
            return Err(MusicError::BridgeUnavailable(
                "AppleScript (playlist_name) requires macOS".to_string(),
            ));
        }
        let mut tracks = player::playlist_tracks(name, player::PLAYLIST_TRACK_LIMIT).await?;
        annotate_explicit(state, &mut tracks);
        (tracks, format!("playlist_{}", render::safe_file_component(name)))
    } else if let Some(id) = playlist_id {
        let raw = api::playlist_tracks(&state.http, &state.config_dir, id).await?;
        let tracks = raw
            .iter()
            .map(|t| api::extract_track(t, p.render.full()))
            .collect();
        (tracks, format!("playlist_{}", render::safe_file_component(id)))
    } else {
        return Err(MusicError::InvalidArgument(
            "Provide playlist_id or playlist_name".to_string(),
        ));
    };

    if tracks.is_empty() {
        return Ok("Playlist is empty".to_string());
    }
    if let Some(filter) = non_empty(p.filter.as_deref()) {
        let needle = filter.to_lowercase();
        tracks.retain(|t| {
            t.name.to_lowercase().contains(&needle) || t.artist.to_lowercase().contains(&needle)
        });
    }
    let limit = p.limit.unwrap_or(0);
    if limit > 0 && tracks.len() > limit {
        tracks.truncate(limit);
    }
    Ok(render::render_tracks(
        &tracks,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        &prefix,
        &state.export_dir,
    ))
}

pub(super) async fn check_playlist(
    state: &ServerState,
    p: CheckPlaylistParams,
) -> Result<String, MusicError> {
    let playlist_id = non_empty(p.playlist_id.as_deref());
    let playlist_name = non_empty(p.playlist_name.as_deref());
    if playlist_id.is_some() && playlist_name.is_some() {
        return Err(MusicError::InvalidArgument(
            "Provide either playlist_id or playlist_name, not both".to_string(),
        ));
    }

    let pairs: Vec<(String, String)> = if let Some(name) = playlist_name {
        if !state.has_bridge() {
            return Err(MusicError::BridgeUnavailable(
                "playlist_name requires macOS".to_string(),
            ));
        }
        player::playlist_tracks(name, player::PLAYLIST_TRACK_LIMIT)
            .await?
            .into_iter()
            .map(|t| (t.name, t.artist))
            .collect()
    } else if let Some(id) = playlist_id {
        api::playlist_track_names(&state.http, &state.config_dir, id).await?
    } else {
        return Err(MusicError::InvalidArgument(
            "Provide playlist_id or playlist_name".to_string(),
        ));
    };

    let needle = p.search.to_lowercase();
    let matches: Vec<String> = pairs
        .iter()
        .filter(|(name, artist)| {
            name.to_lowercase().contains(&needle) || artist.to_lowercase().contains(&needle)
        })
        .map(|(name, artist)| format!("{name} by {artist}"))
        .collect();

    if matches.is_empty() {
        return Ok(format!("No matches for '{}'", p.search));
    }
    if matches.len() == 1 {
        return Ok(format!("Found: {}", matches[0]));
    }
    let mut out = format!("Found {} matches:\n", matches.len());
    out.push_str(
        &matches
            .iter()
            .take(10)
            .map(|m| format!("  - {m}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    if matches.len() > 10 {
        out.push_str(&format!("\n  ...and {} more", matches.len() - 10));
    }
    Ok(out)
}

pub(super) async fn create_playlist(
    state: &ServerState,
    p: CreatePlaylistParams,
) -> Result<String, MusicError> {
    let description = p.description.as_deref().unwrap_or("");
    let id = match api::create_playlist(&state.http, &state.config_dir, &p.name, description).await
    {
        Ok(id) => id,
        // Local creation works without tokens, but the playlist is not
        // API-editable afterwards; later edits go through the bridge.
        Err(MusicError::CredentialMissing(_) | MusicError::CredentialExpired(_))
            if state.has_bridge() =>
        {
            player::create_playlist(&p.name, description).await?
        }
        Err(e) => return Err(e),
    };
    Ok(format!("Created playlist '{}' (ID: {id})", p.name))
}

pub(super) async fn add_to_playlist(
    state: &ServerState,
    p: AddToPlaylistParams,
) -> Result<String, MusicError> {
    let playlist_id = non_empty(p.playlist_id.as_deref());
    let playlist_name = non_empty(p.playlist_name.as_deref());
    let track_ids = non_empty(p.track_ids.as_deref());
    let track_name = non_empty(p.track_name.as_deref());
    let artist = non_empty(p.artist.as_deref());
    let allow_duplicates = p.allow_duplicates.unwrap_or(false);

    if playlist_id.is_some() && playlist_name.is_some() {
        return Err(MusicError::InvalidArgument(
            "Provide either playlist_id or playlist_name, not both".to_string(),
        ));
    }
    if playlist_id.is_none() && playlist_name.is_none() {
        return Err(MusicError::InvalidArgument(
            "Provide playlist_id or playlist_name".to_string(),
        ));
    }
    if track_ids.is_none() && track_name.is_none() {
        return Err(MusicError::InvalidArgument(
            "Provide track_ids or track_name".to_string(),
        ));
    }

    if let Some(playlist) = playlist_name {
        if !state.has_bridge() {
            return Err(MusicError::BridgeUnavailable(
                "playlist_name requires macOS (use playlist_id for cross-platform)".to_string(),
            ));
        }
        if track_ids.is_some() && track_name.is_none() {
            return add_ids_by_name(state, playlist, track_ids.unwrap_or_default()).await;
        }
        return add_named_track(
            playlist,
            track_name.unwrap_or_default(),
            artist,
            allow_duplicates,
            p.verify.unwrap_or(true),
        )
        .await;
    }

    add_ids_by_api(
        state,
        playlist_id.unwrap_or_default(),
        track_ids.unwrap_or_default(),
        allow_duplicates,
    )
    .await
}

/// playlist_name + track_ids: look up each id, push catalog songs into the
/// library, then add to the playlist by name through AppleScript.
async fn add_ids_by_name(
    state: &ServerState,
    playlist: &str,
    track_ids: &str,
) -> Result<String, MusicError> {
    let mut steps: Vec<String> = Vec::new();
    let mut results: Vec<bool> = Vec::new();

    for track_id in split_ids(track_ids) {
        let is_catalog = api::is_catalog_id(&track_id);
        let song = if is_catalog {
            steps.push(format!("Adding catalog ID {track_id} to library..."));
            let _ = api::add_songs_to_library(
                &state.http,
                &state.config_dir,
                std::slice::from_ref(&track_id),
            )
            .await;
            match api::catalog_song(&state.http, &state.config_dir, &track_id).await? {
                Some(song) => song,
                None => {
                    steps.push(format!("  Error: Could not get info for {track_id}"));
                    continue;
                }
            }
        } else {
            match api::library_song(&state.http, &state.config_dir, &track_id).await? {
                Some(song) => song,
                None => {
                    steps.push(format!("Error: Could not get info for {track_id}"));
                    continue;
                }
            }
        };

        {
            let mut cache = state.cache();
            api::remember_track(&mut cache, &song);
        }
        let name = api::attr_str(&song, "name");
        let artist_name = api::attr_str(&song, "artistName");
        if name.is_empty() {
            steps.push(format!("  Error: No name found for {track_id}"));
            continue;
        }
        // Give the library a moment to register a fresh catalog add.
        if is_catalog {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let artist_arg = (!artist_name.is_empty()).then_some(artist_name.as_str());
        match player::add_track_to_playlist(playlist, &name, artist_arg).await {
            Ok(_) => {
                steps.push(format!("Added: {name} - {artist_name}"));
                results.push(true);
            }
            Err(e) => {
                steps.push(format!("Failed to add {name}: {e}"));
                results.push(false);
            }
        }
    }

    if results.is_empty() {
        return Ok(format!("Error: No tracks could be added\n{}", steps.join("\n")));
    }
    Ok(steps.join("\n"))
}

/// playlist_name + track_name: duplicate check, add, then poll to verify.
async fn add_named_track(
    playlist: &str,
    track_name: &str,
    artist: Option<&str>,
    allow_duplicates: bool,
    verify: bool,
) -> Result<String, MusicError> {
    if !allow_duplicates
        && let Ok(Some(existing)) =
            player::track_exists_in_playlist(playlist, track_name, artist).await
    {
        return Ok(format!(
            "Skipped: '{track_name}' already in playlist\n  Found: {existing}"
        ));
    }

    let mut steps = vec![player::add_track_to_playlist(playlist, track_name, artist).await?];

    if verify {
        let mut verified = false;
        for _ in 0..5 {
            if let Ok(Some(found)) =
                player::track_exists_in_playlist(playlist, track_name, artist).await
            {
                steps.push(format!("Verified: {found}"));
                verified = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if !verified {
            steps.push("Warning: could not verify add".to_string());
        }
    }

    Ok(steps.join("\n"))
}

/// playlist_id: resolve catalog ids to library ids, skip duplicates, then
/// add the batch through the API.
async fn add_ids_by_api(
    state: &ServerState,
    playlist_id: &str,
    track_ids: &str,
    allow_duplicates: bool,
) -> Result<String, MusicError> {
    let ids = split_ids(track_ids);
    if ids.is_empty() {
        return Err(MusicError::InvalidArgument("No track IDs provided".to_string()));
    }

    let mut steps: Vec<String> = Vec::new();
    let mut library_ids: Vec<String> = Vec::new();

    for track_id in &ids {
        if !api::is_catalog_id(track_id) {
            library_ids.push(track_id.clone());
            continue;
        }
        steps.push(format!("Adding catalog ID {track_id} to library..."));
        if let Err(e) = api::add_songs_to_library(
            &state.http,
            &state.config_dir,
            std::slice::from_ref(track_id),
        )
        .await
        {
            steps.push(format!("  Warning: {e}"));
        }
        match api::catalog_song(&state.http, &state.config_dir, track_id).await {
            Ok(Some(song)) => {
                {
                    let mut cache = state.cache();
                    api::remember_track(&mut cache, &song);
                }
                let name = api::attr_str(&song, "name");
                let artist_name = api::attr_str(&song, "artistName");
                match api::find_library_id(&state.http, &state.config_dir, &name, &artist_name)
                    .await
                {
                    Some(found) => {
                        steps.push(format!("  Found in library: {name} (ID: {found})"));
                        library_ids.push(found);
                    }
                    None => {
                        steps.push(format!(
                            "  Warning: could not find '{name}' in library after adding"
                        ));
                    }
                }
            }
            Ok(None) => {
                steps.push(format!("  Warning: could not get catalog info for {track_id}"));
            }
            Err(e) => {
                return Ok(format!("{}\n{}", e.user_text(), steps.join("\n")));
            }
        }
    }

    if library_ids.is_empty() {
        return Ok(format!("Error: No valid library IDs to add\n{}", steps.join("\n")));
    }

    if !allow_duplicates
        && let Ok(existing) =
            api::playlist_track_names(&state.http, &state.config_dir, playlist_id).await
        && !existing.is_empty()
    {
        let mut kept = Vec::new();
        for lib_id in library_ids {
            let mut duplicate = false;
            if let Ok(Some(song)) = api::library_song(&state.http, &state.config_dir, &lib_id).await
            {
                let name = api::attr_str(&song, "name");
                let artist_name = api::attr_str(&song, "artistName");
                if !api::find_track_in_list(&existing, &name, &artist_name).is_empty() {
                    steps.push(format!("Skipped duplicate: {name} - {artist_name}"));
                    duplicate = true;
                }
            }
            if !duplicate {
                kept.push(lib_id);
            }
        }
        library_ids = kept;
    }

    if library_ids.is_empty() {
        steps.push("All tracks already in playlist".to_string());
        return Ok(steps.join("\n"));
    }

    match api::add_tracks_to_playlist(&state.http, &state.config_dir, playlist_id, &library_ids)
        .await
    {
        Ok(()) => steps.push(format!("Added {} track(s) to playlist", library_ids.len())),
        Err(MusicError::PermissionDenied) => {
            return Ok(format!(
                "Error: Cannot edit this playlist (not API-created). Use playlist_name on macOS.\n{}",
                steps.join("\n")
            ));
        }
        Err(e) => return Ok(format!("{}\n{}", e.user_text(), steps.join("\n"))),
    }

    if let Ok(updated) =
        api::playlist_track_names(&state.http, &state.config_dir, playlist_id).await
    {
        steps.push(format!("Verified: playlist now has {} tracks", updated.len()));
    }

    Ok(steps.join("\n"))
}

pub(super) async fn copy_playlist(
    state: &ServerState,
    p: CopyPlaylistParams,
) -> Result<String, MusicError> {
    let tracks =
        api::playlist_tracks(&state.http, &state.config_dir, &p.source_playlist_id).await?;
    let new_id = api::create_playlist(&state.http, &state.config_dir, &p.new_name, "").await?;

    for batch in tracks.chunks(25) {
        let ids: Vec<String> = batch.iter().map(api::item_id).collect();
        let _ = api::add_tracks_to_playlist(&state.http, &state.config_dir, &new_id, &ids).await;
    }

    Ok(format!(
        "Created '{}' (ID: {new_id}) with {} tracks",
        p.new_name,
        tracks.len()
    ))
}

pub(super) async fn search_library(
    state: &ServerState,
    p: SearchLibraryParams,
) -> Result<String, MusicError> {
    let scope = p.search_type.as_deref().unwrap_or("songs");
    let prefix = format!(
        "search_{}",
        render::safe_file_component(&p.query.chars().take(20).collect::<String>())
    );

    // Native search is faster and sees the whole library. Fall back to the
    // API when it finds nothing or fails.
    if state.has_bridge()
        && let Ok(mut tracks) = player::search_library(&p.query, scope).await
        && !tracks.is_empty()
    {
        annotate_explicit(state, &mut tracks);
        return Ok(render::render_tracks(
            &tracks,
            p.render.format(),
            p.render.export(),
            p.render.full(),
            &prefix,
            &state.export_dir,
        ));
    }

    let songs = api::library_search_songs(
        &state.http,
        &state.config_dir,
        &p.query,
        p.limit.unwrap_or(25),
    )
    .await?;
    if songs.is_empty() {
        return Ok("No songs found".to_string());
    }
    {
        let mut cache = state.cache();
        for song in &songs {
            api::remember_track(&mut cache, song);
        }
    }
    let tracks: Vec<Track> = songs
        .iter()
        .map(|s| api::extract_track(s, p.render.full()))
        .collect();
    Ok(render::render_tracks(
        &tracks,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        &prefix,
        &state.export_dir,
    ))
}

pub(super) async fn add_to_library(
    state: &ServerState,
    p: AddToLibraryParams,
) -> Result<String, MusicError> {
    let ids = split_ids(&p.catalog_ids);
    api::add_songs_to_library(&state.http, &state.config_dir, &ids).await?;
    Ok(format!(
        "Successfully added {} song(s) to your library. Use search_library to find their library IDs.",
        ids.len()
    ))
}

pub(super) async fn get_recently_played(
    state: &ServerState,
    p: RecentlyPlayedParams,
) -> Result<String, MusicError> {
    let raw =
        api::recently_played(&state.http, &state.config_dir, p.limit.unwrap_or(30)).await?;
    if raw.is_empty() {
        return Ok("No recently played tracks".to_string());
    }
    let tracks: Vec<Track> = raw
        .iter()
        .map(|t| api::extract_track(t, p.render.full()))
        .collect();
    Ok(render::render_tracks(
        &tracks,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        "recently_played",
        &state.export_dir,
    ))
}

pub(super) async fn browse_library(
    state: &ServerState,
    p: BrowseLibraryParams,
) -> Result<String, MusicError> {
    let item_type = p.item_type.as_deref().unwrap_or("songs").trim().to_lowercase();
    let path = match item_type.as_str() {
        "songs" => "library/songs",
        "albums" => "library/albums",
        "artists" => "library/artists",
        "videos" => "library/music-videos",
        _ => {
            return Err(MusicError::InvalidArgument(format!(
                "Invalid type: {item_type}. Use: songs, albums, artists, or videos"
            )));
        }
    };
    let url = format!("{}/me/{path}", api::BASE_URL);
    // Only the songs listing honors a cap; the others are small enough to
    // fetch whole.
    let max = if item_type == "songs" { p.limit.unwrap_or(100) } else { 0 };
    let items = api::fetch_limited(&state.http, &state.config_dir, &url, max).await?;
    if items.is_empty() {
        return Ok(format!("No {item_type} in library"));
    }

    let prefix = format!("library_{item_type}");
    if item_type == "songs" {
        let tracks: Vec<Track> = items
            .iter()
            .map(|s| api::extract_track(s, p.render.full()))
            .collect();
        return Ok(render::render_tracks(
            &tracks,
            p.render.format(),
            p.render.export(),
            p.render.full(),
            &prefix,
            &state.export_dir,
        ));
    }

    let simple: Vec<SimpleItem> = items
        .iter()
        .map(|item| browse_item(item, &item_type))
        .collect();
    Ok(render::render_simple(
        &simple,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        &prefix,
        &state.export_dir,
    ))
}

fn browse_item(item: &Value, item_type: &str) -> SimpleItem {
    let name = api::attr_str(item, "name");
    let id = api::item_id(item);
    match item_type {
        "albums" => {
            let genre = item
                .pointer("/attributes/genreNames/0")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            SimpleItem {
                name,
                artist: Some(api::attr_str(item, "artistName")),
                id,
                extra: vec![
                    (
                        "track_count",
                        item.pointer("/attributes/trackCount")
                            .cloned()
                            .unwrap_or(Value::from(0)),
                    ),
                    ("genre", Value::from(genre)),
                    ("release_date", Value::from(api::attr_str(item, "releaseDate"))),
                ],
            }
        }
        "artists" => SimpleItem { name, artist: None, id, extra: Vec::new() },
        _ => SimpleItem {
            name,
            artist: Some(api::attr_str(item, "artistName")),
            id,
            extra: Vec::new(),
        },
    }
}

pub(super) async fn get_recommendations(
    state: &ServerState,
    p: DiscoveryParams,
) -> Result<String, MusicError> {
    let items = api::recommendations(&state.http, &state.config_dir).await?;
    Ok(render::render_simple(
        &items,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        "recommendations",
        &state.export_dir,
    ))
}

pub(super) async fn get_heavy_rotation(
    state: &ServerState,
    p: DiscoveryParams,
) -> Result<String, MusicError> {
    let items = api::heavy_rotation(&state.http, &state.config_dir).await?;
    if items.is_empty() {
        return Ok("No heavy rotation data".to_string());
    }
    Ok(render::render_simple(
        &items,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        "heavy_rotation",
        &state.export_dir,
    ))
}

pub(super) async fn get_recently_added(
    state: &ServerState,
    p: RecentlyAddedParams,
) -> Result<String, MusicError> {
    let items =
        api::recently_added(&state.http, &state.config_dir, p.limit.unwrap_or(50)).await?;
    if items.is_empty() {
        return Ok("No recently added content".to_string());
    }
    Ok(render::render_simple(
        &items,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        "recently_added",
        &state.export_dir,
    ))
}

pub(super) async fn cache(state: &ServerState, p: CacheParams) -> Result<String, MusicError> {
    let action = p.action.as_deref().unwrap_or("info").to_lowercase();
    let days_old = p.days_old.unwrap_or(0);
    let mut out = cache_report(&state.export_dir, &action, days_old);

    // The track metadata cache lives alongside the CSV exports; report and
    // clear it with them.
    let mut cache = state.cache();
    if action == "clear" {
        if days_old <= 0 && !cache.is_empty() {
            out.push_str(&format!("\nCleared {} track metadata entries", cache.len()));
            cache.clear();
        }
    } else if !cache.is_empty() {
        out.push_str(&format!("\nTrack metadata: {} entries", cache.len()));
    }
    Ok(out)
}

fn cache_report(dir: &Path, action: &str, days_old: i64) -> String {
    match cache_report_inner(dir, action, days_old) {
        Ok(text) => text,
        Err(e) => format!("Error reading cache: {e}"),
    }
}

fn cache_report_inner(dir: &Path, action: &str, days_old: i64) -> std::io::Result<String> {
    if !dir.exists() {
        return Ok("Cache directory doesn't exist".to_string());
    }

    let mut files: Vec<(PathBuf, u64, SystemTime)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let meta = entry.metadata()?;
        files.push((path, meta.len(), meta.modified()?));
    }
    if files.is_empty() {
        return Ok("No CSV files in cache".to_string());
    }
    let now = SystemTime::now();

    if action == "clear" {
        let max_age = Duration::from_secs((days_old.max(0) as u64).saturating_mul(86_400));
        let mut deleted = 0usize;
        let mut kept = 0usize;
        let mut total_size = 0u64;
        for (path, size, modified) in &files {
            let age = now.duration_since(*modified).unwrap_or_default();
            if days_old <= 0 || age > max_age {
                std::fs::remove_file(path)?;
                deleted += 1;
                total_size += size;
            } else {
                kept += 1;
            }
        }
        let size_str = if total_size < 1024 {
            format!("{total_size} bytes")
        } else if total_size < 1024 * 1024 {
            format!("{:.1} KB", total_size as f64 / 1024.0)
        } else {
            format!("{:.1} MB", total_size as f64 / (1024.0 * 1024.0))
        };
        let mut output = vec![format!("Deleted: {deleted} files ({size_str})")];
        if kept > 0 {
            output.push(format!("Kept: {kept} files (newer than {days_old} days)"));
        }
        return Ok(output.join("\n"));
    }

    // info: newest first
    files.sort_by(|a, b| b.2.cmp(&a.2));
    let mut total_size = 0u64;
    let mut lines = Vec::new();
    for (path, size, modified) in &files {
        total_size += size;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let age_days =
            now.duration_since(*modified).unwrap_or_default().as_secs_f64() / 86_400.0;
        let size_str = if *size < 1024 {
            format!("{size}B")
        } else if *size < 1024 * 1024 {
            format!("{:.0}KB", *size as f64 / 1024.0)
        } else {
            format!("{:.1}MB", *size as f64 / (1024.0 * 1024.0))
        };
        let age_str = if age_days < 1.0 {
            format!("{:.0}h ago", age_days * 24.0)
        } else {
            format!("{age_days:.0}d ago")
        };
        lines.push(format!("{name} ({size_str}, {age_str})"));
    }
    let total_str = if total_size < 1024 * 1024 {
        format!("{:.1} KB", total_size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", total_size as f64 / (1024.0 * 1024.0))
    };

    let mut output = vec![
        format!("=== Cache: {} ===", dir.display()),
        format!("Total: {} files, {total_str}", files.len()),
        String::new(),
    ];
    output.extend(lines);
    Ok(output.join("\n"))
}

/// Diagnostic: build output from real playlists until a character target is
/// hit, with an END marker to spot client-side truncation.
pub(super) async fn test_output_size(
    state: &ServerState,
    p: OutputSizeParams,
) -> Result<String, MusicError> {
    let target = p.target_chars.unwrap_or(render::MAX_OUTPUT_CHARS);
    let url = format!("{}/me/library/playlists", api::BASE_URL);
    let page = api::get_json(
        &state.http,
        &state.config_dir,
        &url,
        &[("limit", "100".to_string())],
    )
    .await?;
    let playlists = api::data_array(&page);
    if playlists.is_empty() {
        return Ok("No playlists found in library".to_string());
    }

    let mut content = format!(
        "=== SIZE TEST: {} chars target ===\n=== Found {} playlists to draw from ===\n\n",
        thousands(target),
        playlists.len()
    );
    let mut playlists_used = 0usize;
    let mut total_tracks = 0usize;

    for playlist in &playlists {
        if content.chars().count() >= target {
            break;
        }
        let playlist_id = api::item_id(playlist);
        let mut name = api::attr_str(playlist, "name");
        if name.is_empty() {
            name = "Unknown".to_string();
        }

        let tracks_url = format!("{}/me/library/playlists/{playlist_id}/tracks", api::BASE_URL);
        let tracks = match api::get_json(
            &state.http,
            &state.config_dir,
            &tracks_url,
            &[("limit", "100".to_string())],
        )
        .await
        {
            Ok(page) => api::data_array(&page),
            Err(_) => continue,
        };
        if tracks.is_empty() {
            continue;
        }

        content.push_str(&format!(
            "--- {name} ({} tracks, char {}) ---\n",
            tracks.len(),
            thousands(content.chars().count())
        ));
        for t in &tracks {
            if content.chars().count() >= target {
                break;
            }
            content.push_str(&render::line_full(&api::extract_track(t, false)));
            content.push('\n');
            total_tracks += 1;
        }
        content.push('\n');
        playlists_used += 1;
    }

    if content.chars().count() < target {
        content.push_str(&format!(
            "\n(Exhausted all {} playlists at {} chars)\n",
            playlists.len(),
            thousands(content.chars().count())
        ));
    }
    let footer = format!(
        "\n\n=== END: {} chars, {playlists_used} playlists, {total_tracks} tracks ===",
        thousands(content.chars().count())
    );
    content.push_str(&footer);
    Ok(content)
}

pub(super) async fn check_auth_status(state: &ServerState) -> Result<String, MusicError> {
    let mut status = vec![
        auth::developer_token_status(&state.config_dir),
        auth::user_token_status(&state.config_dir),
    ];
    if auth::both_tokens_present(&state.config_dir) {
        status.push(api::probe_connection(&state.http, &state.config_dir).await);
    }
    Ok(status.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(50000), "50,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn split_ids_trims_and_drops_empties() {
        assert_eq!(
            split_ids(" 1440783617, i.XYZ789 ,,  "),
            vec!["1440783617".to_string(), "i.XYZ789".to_string()]
        );
        assert!(split_ids("").is_empty());
        assert!(split_ids(" , ,").is_empty());
    }

    #[test]
    fn non_empty_filters_blank() {
        assert_eq!(non_empty(Some("x")), Some("x"));
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn cache_report_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(cache_report(&missing, "info", 0), "Cache directory doesn't exist");
    }

    #[test]
    fn cache_report_no_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(cache_report(dir.path(), "info", 0), "No CSV files in cache");
    }

    #[test]
    fn cache_report_info_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("playlists_20250101_120000.csv"), "a".repeat(600))
            .unwrap();
        std::fs::write(dir.path().join("search_x_20250101_120001.csv"), "b".repeat(2048))
            .unwrap();
        let out = cache_report(dir.path(), "info", 0);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("=== Cache: "));
        assert!(lines[1].starts_with("Total: 2 files, "));
        assert_eq!(lines[2], "");
        assert!(out.contains("playlists_20250101_120000.csv (600B, 0h ago)"));
        assert!(out.contains("search_x_20250101_120001.csv (2KB, 0h ago)"));
    }

    #[test]
    fn cache_clear_deletes_everything_at_zero_days() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "12345").unwrap();
        std::fs::write(dir.path().join("b.csv"), "67890").unwrap();
        let out = cache_report(dir.path(), "clear", 0);
        assert_eq!(out, "Deleted: 2 files (10 bytes)");
        assert_eq!(cache_report(dir.path(), "info", 0), "No CSV files in cache");
    }

    #[test]
    fn cache_clear_keeps_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.csv"), "x").unwrap();
        let out = cache_report(dir.path(), "clear", 7);
        assert_eq!(out, "Deleted: 0 files (0 bytes)\nKept: 1 files (newer than 7 days)");
        assert!(dir.path().join("fresh.csv").exists());
    }

    #[test]
    fn browse_item_albums_carry_extras() {
        let album = serde_json::json!({
            "id": "l.abc",
            "attributes": {
                "name": "Discovery",
                "artistName": "Daft Punk",
                "trackCount": 14,
                "genreNames": ["Electronic", "Dance"],
                "releaseDate": "2001-03-07"
            }
        });
        let item = browse_item(&album, "albums");
        assert_eq!(item.name, "Discovery");
        assert_eq!(item.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(item.id, "l.abc");
        assert_eq!(item.extra[0], ("track_count", serde_json::json!(14)));
        assert_eq!(item.extra[1], ("genre", serde_json::json!("Electronic")));
        assert_eq!(item.extra[2], ("release_date", serde_json::json!("2001-03-07")));
    }

    #[test]
    fn browse_item_artists_have_no_artist_column() {
        let artist = serde_json::json!({
            "id": "r.123",
            "attributes": {"name": "Daft Punk"}
        });
        let item = browse_item(&artist, "artists");
        assert_eq!(item.name, "Daft Punk");
        assert!(item.artist.is_none());
        assert!(item.extra.is_empty());
    }
}
