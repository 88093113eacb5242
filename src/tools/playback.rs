//! Playback tools: transport control, now-playing, player settings, ratings,
//! and playlist edits that go through the local player. Every flow here needs
//! the AppleScript bridge except the catalog fallbacks inside `play_track`
//! and `rating`.

use std::time::Duration;

use crate::api;
use crate::error::MusicError;
use crate::player;
use crate::types::{rating_to_stars, star_glyphs, stars_to_rating};

use super::ServerState;
use super::params::{
    AirplayParams, PlayPlaylistParams, PlayTrackParams, PlaybackControlParams,
    PlaybackSettingsParams, PlaylistNameParams, RatingParams, RemoveFromLibraryParams,
    RemoveFromPlaylistParams, RevealParams, SeekParams,
};

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

/// Search term for catalog fallbacks: `"{track} {artist}"` when an artist
/// was given, otherwise the bare track name.
fn fallback_term(track_name: &str, artist: Option<&str>) -> String {
    match artist {
        Some(a) => format!("{track_name} {a}").trim().to_string(),
        None => track_name.to_string(),
    }
}

/// Loose match check for catalog fallback hits: the requested name must
/// appear in the song title, and the requested artist (when given) in the
/// song's artist. Case-insensitive on both sides.
fn song_matches(song: &serde_json::Value, track_name: &str, artist: Option<&str>) -> bool {
    let song_name = api::attr_str(song, "name").to_lowercase();
    if !song_name.contains(&track_name.to_lowercase()) {
        return false;
    }
    match artist {
        Some(a) => api::attr_str(song, "artistName")
            .to_lowercase()
            .contains(&a.to_lowercase()),
        None => true,
    }
}

fn onoff(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

pub(super) async fn play_track(
    state: &ServerState,
    p: PlayTrackParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    let artist = non_empty(p.artist.as_deref());
    let reveal = p.reveal.unwrap_or_else(|| state.preferences().reveal_on_library_miss);
    let add_to_library = p.add_to_library.unwrap_or(false);

    // Library first; the player can only auto-play what it already has.
    if let Ok(result) = player::play_library_track(&p.track_name, artist).await {
        if reveal {
            let _ = player::reveal_track(&p.track_name, artist).await;
        }
        return Ok(result);
    }

    let term = fallback_term(&p.track_name, artist);
    let songs = api::search_catalog_songs(&state.http, &state.config_dir, &term, 5).await;
    for song in &songs {
        if !song_matches(song, &p.track_name, artist) {
            continue;
        }
        {
            let mut cache = state.cache();
            api::remember_track(&mut cache, song);
        }
        let catalog_id = api::item_id(song);
        let song_name = api::attr_str(song, "name");
        let song_artist = api::attr_str(song, "artistName");
        let match_artist = non_empty(Some(song_artist.as_str()));

        if add_to_library {
            let ids = std::slice::from_ref(&catalog_id);
            match api::add_songs_to_library(&state.http, &state.config_dir, ids).await {
                Ok(_) => {
                    // iCloud sync lag: the song takes a moment to appear in
                    // the local library after the add call succeeds.
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    for attempt in 0..45 {
                        if attempt > 0 {
                            tokio::time::sleep(Duration::from_millis(200)).await;
                        }
                        if player::play_library_track(&song_name, match_artist).await.is_ok() {
                            if reveal {
                                let _ = player::reveal_track(&song_name, match_artist).await;
                            }
                            return Ok(format!(
                                "Added to library and playing: {song_name} by {song_artist}"
                            ));
                        }
                    }
                    return Ok(format!(
                        "Added to library but couldn't play yet: {song_name} by {song_artist}. Try again in a moment."
                    ));
                }
                Err(e) => return Ok(format!("Failed to add to library: {e}")),
            }
        }

        if reveal {
            let url = format!("https://music.apple.com/{}/song/{catalog_id}", api::STOREFRONT);
            let _ = player::open_catalog_url(&url).await;
            return Ok(format!(
                "Opened in Music: {song_name} by {song_artist}. Click play to start (AppleScript can't auto-play catalog songs not in library)."
            ));
        }

        return Ok(format!(
            "Found in catalog: {song_name} by {song_artist}. Use add_to_library=True to add and play, or reveal=True to open in Music app. (AppleScript cannot auto-play catalog songs not in your library)"
        ));
    }

    Ok(format!("Track not found in library or catalog: {}", p.track_name))
}

pub(super) async fn play_playlist(
    state: &ServerState,
    p: PlayPlaylistParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    player::play_playlist(&p.playlist_name, p.shuffle.unwrap_or(false)).await
}

pub(super) async fn playback_control(
    state: &ServerState,
    p: PlaybackControlParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    let action = p.action.trim().to_lowercase();
    player::transport(&action).await?;
    Ok(format!("Playback: {action}"))
}

pub(super) async fn get_now_playing(state: &ServerState) -> Result<String, MusicError> {
    state.bridge()?;
    let info = player::now_playing().await?;
    if info.stopped {
        return Ok("Not currently playing".to_string());
    }

    let mut parts = Vec::new();
    if let Some(name) = &info.name {
        parts.push(format!("Track: {name}"));
    }
    if let Some(artist) = &info.artist {
        parts.push(format!("Artist: {artist}"));
    }
    if let Some(album) = &info.album {
        parts.push(format!("Album: {album}"));
    }
    if let (Some(pos), Some(dur)) = (info.position_secs, info.duration_secs) {
        parts.push(format!(
            "Position: {} / {}",
            player::mmss(pos as i64),
            player::mmss(dur as i64)
        ));
    }

    if parts.is_empty() {
        return Ok("Playing (no track info available)".to_string());
    }
    Ok(parts.join("\n"))
}

pub(super) async fn playback_settings(
    state: &ServerState,
    p: PlaybackSettingsParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    let mut changes = Vec::new();

    if let Some(volume) = p.volume
        && volume >= 0
    {
        match player::set_volume(volume).await {
            Ok(clamped) => changes.push(format!("Volume: {clamped}")),
            Err(e) => return Ok(format!("Error setting volume: {e}")),
        }
    }
    if let Some(shuffle) = non_empty(p.shuffle.as_deref()) {
        let enabled = matches!(shuffle.to_lowercase().as_str(), "on" | "true" | "1" | "yes");
        match player::set_shuffle(enabled).await {
            Ok(()) => changes.push(format!("Shuffle: {}", onoff(enabled))),
            Err(e) => return Ok(format!("Error setting shuffle: {e}")),
        }
    }
    if let Some(repeat) = non_empty(p.repeat.as_deref()) {
        match player::set_repeat(&repeat.to_lowercase()).await {
            Ok(()) => changes.push(format!("Repeat: {repeat}")),
            Err(e) => return Ok(format!("Error setting repeat: {e}")),
        }
    }

    if !changes.is_empty() {
        return Ok(format!("Updated: {}", changes.join(", ")));
    }

    // Nothing requested: report current settings instead.
    let stats = player::library_stats().await?;
    Ok(format!(
        "Player: {}\nVolume: {}\nShuffle: {}\nRepeat: {}",
        stats.player_state,
        stats.volume,
        onoff(stats.shuffle),
        stats.repeat
    ))
}

pub(super) async fn seek_to_position(
    state: &ServerState,
    p: SeekParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    player::seek(p.seconds).await?;
    Ok(format!("Seeked to {}", player::mmss(p.seconds as i64)))
}

pub(super) async fn remove_from_playlist(
    state: &ServerState,
    p: RemoveFromPlaylistParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    player::remove_track_from_playlist(
        &p.playlist_name,
        p.track_name.as_deref().unwrap_or_default(),
        non_empty(p.artist.as_deref()),
        non_empty(p.track_id.as_deref()),
    )
    .await
}

pub(super) async fn remove_from_library(
    state: &ServerState,
    p: RemoveFromLibraryParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    player::remove_from_library(
        p.track_name.as_deref().unwrap_or_default(),
        non_empty(p.artist.as_deref()),
        non_empty(p.track_id.as_deref()),
    )
    .await
}

pub(super) async fn get_player_state(state: &ServerState) -> Result<String, MusicError> {
    state.bridge()?;
    let current = player::player_state().await?;
    Ok(format!("Player state: {current}"))
}

pub(super) async fn delete_playlist(
    state: &ServerState,
    p: PlaylistNameParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    player::delete_playlist(&p.playlist_name).await
}

pub(super) async fn reveal_in_music(
    state: &ServerState,
    p: RevealParams,
) -> Result<String, MusicError> {
    state.bridge()?;
    player::reveal_track(&p.track_name, non_empty(p.artist.as_deref())).await
}

pub(super) async fn airplay(state: &ServerState, p: AirplayParams) -> Result<String, MusicError> {
    state.bridge()?;
    if let Some(device) = non_empty(p.device_name.as_deref()) {
        return player::set_airplay_device(device).await;
    }

    let devices = player::airplay_devices().await?;
    if devices.is_empty() {
        return Ok("No AirPlay devices found".to_string());
    }
    let listing: Vec<String> = devices.iter().map(|d| format!("  - {d}")).collect();
    Ok(format!("AirPlay devices ({}):\n{}", devices.len(), listing.join("\n")))
}

pub(super) async fn get_library_stats(state: &ServerState) -> Result<String, MusicError> {
    state.bridge()?;
    let stats = player::library_stats().await?;
    Ok(format!(
        "Library: {} tracks, {} playlists\nPlayer: {}\nVolume: {}\nShuffle: {}\nRepeat: {}",
        stats.track_count,
        stats.playlist_count,
        stats.player_state,
        stats.volume,
        onoff(stats.shuffle),
        stats.repeat
    ))
}

pub(super) async fn rating(state: &ServerState, p: RatingParams) -> Result<String, MusicError> {
    let action = p.action.trim().to_lowercase();

    // Direct ID rating skips the bridge entirely.
    if let Some(song_id) = non_empty(p.song_id.as_deref())
        && matches!(action.as_str(), "love" | "dislike")
    {
        api::rate_song(&state.http, &state.config_dir, song_id, &action).await?;
        return Ok(format!("Set '{action}' for song {song_id}"));
    }

    let Some(track_name) = non_empty(p.track_name.as_deref()) else {
        return Err(MusicError::InvalidArgument(
            "track_name required (or song_id for love/dislike)".to_string(),
        ));
    };
    let artist = non_empty(p.artist.as_deref());

    match action.as_str() {
        "get" => {
            if !state.has_bridge() {
                return Err(MusicError::BridgeUnavailable("Star ratings require macOS".to_string()));
            }
            let rating = player::get_rating(track_name, artist).await?;
            let glyphs = star_glyphs(rating_to_stars(rating));
            Ok(format!("{track_name}: {glyphs} ({rating}/100)"))
        }
        "set" => {
            if !state.has_bridge() {
                return Err(MusicError::BridgeUnavailable("Star ratings require macOS".to_string()));
            }
            let stars = p.stars.unwrap_or(0);
            player::set_rating(track_name, stars_to_rating(stars), artist).await?;
            Ok(format!("Set {track_name} to {}", star_glyphs(stars)))
        }
        "love" | "dislike" => {
            if state.has_bridge() {
                let local = if action == "love" {
                    player::love_track(track_name, artist).await
                } else {
                    player::dislike_track(track_name, artist).await
                };
                if let Ok(message) = local {
                    return Ok(message);
                }
            }

            // Not in the local library (or no bridge): rate via catalog ID.
            let term = fallback_term(track_name, artist);
            let songs = api::search_catalog_songs(&state.http, &state.config_dir, &term, 5).await;
            for song in &songs {
                if !song_matches(song, track_name, artist) {
                    continue;
                }
                {
                    let mut cache = state.cache();
                    api::remember_track(&mut cache, song);
                }
                let song_name = api::attr_str(song, "name");
                let song_artist = api::attr_str(song, "artistName");
                api::rate_song(&state.http, &state.config_dir, &api::item_id(song), &action)
                    .await?;
                let verb = if action == "love" { "Loved" } else { "Disliked" };
                return Ok(format!("{verb}: {song_name} by {song_artist}"));
            }
            Ok(format!("Track not found: {track_name}"))
        }
        _ => Err(MusicError::InvalidArgument(format!(
            "Invalid action: {action}. Use: love, dislike, get, set"
        ))),
    }
}
