//! Catalog tools: search, album and artist lookups, charts, stations, and
//! storefront metadata. Everything here goes through the remote API; none
//! of it needs the AppleScript bridge.

use serde::Serialize;
use serde_json::Value;

use crate::api;
use crate::error::MusicError;
use crate::render::{self, ExportMode, OutputFormat};
use crate::types::Track;

use super::ServerState;
use super::params::{
    AlbumTracksParams, ArtistNameParams, ChartsParams, MusicVideosParams, SearchCatalogParams,
    SongIdParams, SuggestionsParams,
};

fn or_unknown(s: String) -> String {
    if s.is_empty() { "Unknown".to_string() } else { s }
}

/// Genre list for detail views. A missing key reads as "Unknown"; an empty
/// list renders empty.
fn genre_names(item: &Value) -> String {
    match item.pointer("/attributes/genreNames").and_then(Value::as_array) {
        Some(genres) => genres
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        None => "Unknown".to_string(),
    }
}

fn duration_of(item: &Value) -> String {
    let ms = item
        .pointer("/attributes/durationInMillis")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    render::format_duration_ms(ms)
}

#[derive(Serialize)]
struct AlbumHit {
    id: String,
    name: String,
    artist: String,
    track_count: i64,
    year: String,
}

#[derive(Serialize)]
struct ArtistHit {
    id: String,
    name: String,
    genres: Vec<String>,
}

#[derive(Serialize)]
struct PlaylistHit {
    id: String,
    name: String,
    curator: String,
}

/// JSON body for `search_catalog`. Field order is the response order.
#[derive(Serialize)]
struct CatalogResults {
    songs: Vec<Value>,
    albums: Vec<AlbumHit>,
    artists: Vec<ArtistHit>,
    playlists: Vec<PlaylistHit>,
}

fn album_hit(album: &Value) -> AlbumHit {
    AlbumHit {
        id: api::item_id(album),
        name: api::attr_str(album, "name"),
        artist: api::attr_str(album, "artistName"),
        track_count: album
            .pointer("/attributes/trackCount")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        year: api::attr_str(album, "releaseDate").chars().take(4).collect(),
    }
}

fn artist_hit(artist: &Value) -> ArtistHit {
    let genres = artist
        .pointer("/attributes/genreNames")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    ArtistHit {
        id: api::item_id(artist),
        name: api::attr_str(artist, "name"),
        genres,
    }
}

fn playlist_hit(playlist: &Value) -> PlaylistHit {
    PlaylistHit {
        id: api::item_id(playlist),
        name: api::attr_str(playlist, "name"),
        curator: api::attr_str(playlist, "curatorName"),
    }
}

fn hits_in(results: &Value, kind: &str) -> Vec<Value> {
    results
        .pointer(&format!("/{kind}/data"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub(super) async fn search_catalog(
    state: &ServerState,
    p: SearchCatalogParams,
) -> Result<String, MusicError> {
    let results = api::catalog_search(
        &state.http,
        &state.config_dir,
        &p.query,
        p.types.as_deref().unwrap_or("songs"),
        p.limit.unwrap_or(15),
    )
    .await?;

    let mut raw_songs = hits_in(&results, "songs");
    if state.preferences().clean_only {
        raw_songs.retain(|s| api::attr_str(s, "contentRating") != "explicit");
    }
    {
        let mut cache = state.cache();
        for song in &raw_songs {
            api::remember_track(&mut cache, song);
        }
    }
    let full = p.render.full();
    let songs: Vec<Track> = raw_songs.iter().map(|s| api::extract_track(s, full)).collect();
    let albums: Vec<AlbumHit> = hits_in(&results, "albums").iter().map(album_hit).collect();
    let artists: Vec<ArtistHit> = hits_in(&results, "artists").iter().map(artist_hit).collect();
    let playlists: Vec<PlaylistHit> =
        hits_in(&results, "playlists").iter().map(playlist_hit).collect();

    // File export covers songs only.
    let mut export_msg = String::new();
    if p.render.export() != ExportMode::None && !songs.is_empty() {
        let prefix = format!(
            "catalog_{}",
            render::safe_file_component(&p.query.chars().take(20).collect::<String>())
        );
        export_msg = format!(
            "\n{}",
            render::render_tracks(
                &songs,
                OutputFormat::None,
                p.render.export(),
                full,
                &prefix,
                &state.export_dir,
            )
        );
    }

    if p.render.format() == OutputFormat::Json {
        let body = CatalogResults {
            songs: songs.iter().map(|t| render::track_json(t, full)).collect(),
            albums,
            artists,
            playlists,
        };
        let json = serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".to_string());
        return Ok(format!("{json}{export_msg}"));
    }

    let mut output: Vec<String> = Vec::new();
    if !songs.is_empty() {
        output.push(format!("=== {} Songs ===", songs.len()));
        for t in &songs {
            output.push(format!(
                "{} - {} ({}) {} [{}] {}",
                t.name, t.artist, t.duration, t.album, t.year, t.id
            ));
        }
    }
    if !albums.is_empty() {
        output.push(format!("\n=== {} Albums ===", albums.len()));
        for a in &albums {
            output.push(format!(
                "  {} - {} ({} tracks) [{}] {}",
                a.name, a.artist, a.track_count, a.year, a.id
            ));
        }
    }
    if !artists.is_empty() {
        output.push(format!("\n=== {} Artists ===", artists.len()));
        for a in &artists {
            output.push(format!("  {} {}", a.name, a.id));
        }
    }
    if !playlists.is_empty() {
        output.push(format!("\n=== {} Playlists ===", playlists.len()));
        for pl in &playlists {
            output.push(format!("  {} {}", pl.name, pl.id));
        }
    }

    if output.is_empty() {
        return Ok("No results found".to_string());
    }
    Ok(format!("{}{export_msg}", output.join("\n")))
}

pub(super) async fn get_album_tracks(
    state: &ServerState,
    p: AlbumTracksParams,
) -> Result<String, MusicError> {
    let raw = api::album_tracks(&state.http, &state.config_dir, &p.album_id).await?;
    if raw.is_empty() {
        return Ok("No tracks found".to_string());
    }
    {
        let mut cache = state.cache();
        for track in &raw {
            api::remember_track(&mut cache, track);
        }
    }
    // Always pull extras so track and disc numbers are available for export.
    let tracks: Vec<Track> = raw.iter().map(|t| api::extract_track(t, true)).collect();
    let prefix = format!("album_{}", render::safe_file_component(&p.album_id));
    Ok(render::render_tracks(
        &tracks,
        p.render.format(),
        p.render.export(),
        p.render.full(),
        &prefix,
        &state.export_dir,
    ))
}

pub(super) async fn get_artist_top_songs(
    state: &ServerState,
    p: ArtistNameParams,
) -> Result<String, MusicError> {
    let Some((artist_id, artist)) =
        api::find_artist(&state.http, &state.config_dir, &p.artist_name).await?
    else {
        return Ok(format!("No artist found matching '{}'", p.artist_name));
    };
    let mut actual = api::attr_str(&artist, "name");
    if actual.is_empty() {
        actual = p.artist_name.clone();
    }

    let songs = api::artist_view(&state.http, &state.config_dir, &artist_id, "top-songs").await?;
    let mut output = vec![format!("=== Top Songs by {actual} ===")];
    for (i, song) in songs.iter().enumerate() {
        let name = or_unknown(api::attr_str(song, "name"));
        let album = api::attr_str(song, "albumName");
        let album_part = if album.is_empty() { String::new() } else { format!(" ({album})") };
        output.push(format!(
            "{}. {name}{album_part} [catalog ID: {}]",
            i + 1,
            api::item_id(song)
        ));
    }
    if output.len() == 1 {
        return Ok("No top songs found".to_string());
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_similar_artists(
    state: &ServerState,
    p: ArtistNameParams,
) -> Result<String, MusicError> {
    let Some((artist_id, artist)) =
        api::find_artist(&state.http, &state.config_dir, &p.artist_name).await?
    else {
        return Ok(format!("No artist found matching '{}'", p.artist_name));
    };
    let mut actual = api::attr_str(&artist, "name");
    if actual.is_empty() {
        actual = p.artist_name.clone();
    }

    let similar =
        api::artist_view(&state.http, &state.config_dir, &artist_id, "similar-artists").await?;
    let mut output = vec![format!("=== Artists Similar to {actual} ===")];
    for candidate in &similar {
        let name = or_unknown(api::attr_str(candidate, "name"));
        let genres = candidate
            .pointer("/attributes/genreNames")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .take(2)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        output.push(format!("{name} ({genres}) [artist ID: {}]", api::item_id(candidate)));
    }
    if output.len() == 1 {
        return Ok("No similar artists found".to_string());
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_song_station(
    state: &ServerState,
    p: SongIdParams,
) -> Result<String, MusicError> {
    let stations = api::song_station(&state.http, &state.config_dir, &p.song_id).await?;
    let Some(station) = stations.first() else {
        return Ok("No station found for this song".to_string());
    };
    let mut name = api::attr_str(station, "name");
    if name.is_empty() {
        name = "Unknown Station".to_string();
    }
    Ok(format!(
        "Station: {name}\nStation ID: {}\n\nUse this station to discover music similar to this song.",
        api::item_id(station)
    ))
}

pub(super) async fn get_song_details(
    state: &ServerState,
    p: SongIdParams,
) -> Result<String, MusicError> {
    let Some(song) = api::catalog_song(&state.http, &state.config_dir, &p.song_id).await? else {
        return Ok("Song not found".to_string());
    };
    {
        let mut cache = state.cache();
        api::remember_track(&mut cache, &song);
    }

    let mut duration = duration_of(&song);
    if duration.is_empty() {
        duration = "Unknown".to_string();
    }
    let explicit = if api::attr_str(&song, "contentRating") == "explicit" { "Yes" } else { "No" };
    let isrc = api::attr_str(&song, "isrc");

    let output = [
        format!("Title: {}", or_unknown(api::attr_str(&song, "name"))),
        format!("Artist: {}", or_unknown(api::attr_str(&song, "artistName"))),
        format!("Album: {}", or_unknown(api::attr_str(&song, "albumName"))),
        format!("Genre: {}", genre_names(&song)),
        format!("Duration: {duration}"),
        format!("Release Date: {}", or_unknown(api::attr_str(&song, "releaseDate"))),
        format!("Explicit: {explicit}"),
        format!("ISRC: {}", if isrc.is_empty() { "N/A".to_string() } else { isrc }),
    ];
    Ok(output.join("\n"))
}

pub(super) async fn get_artist_details(
    state: &ServerState,
    p: ArtistNameParams,
) -> Result<String, MusicError> {
    let Some((artist_id, artist)) =
        api::find_artist(&state.http, &state.config_dir, &p.artist_name).await?
    else {
        return Ok(format!("No artist found matching '{}'", p.artist_name));
    };

    let mut output = vec![
        format!("Artist: {}", or_unknown(api::attr_str(&artist, "name"))),
        format!("Artist ID: {artist_id}"),
        format!("Genres: {}", genre_names(&artist)),
    ];

    let albums = api::artist_albums(&state.http, &state.config_dir, &artist_id, 10).await?;
    if !albums.is_empty() {
        output.push("\nRecent Albums:".to_string());
        for album in albums.iter().take(10) {
            let name = or_unknown(api::attr_str(album, "name"));
            let year: String = api::attr_str(album, "releaseDate").chars().take(4).collect();
            output.push(format!("  - {name} ({year}) [catalog ID: {}]", api::item_id(album)));
        }
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_charts(
    state: &ServerState,
    p: ChartsParams,
) -> Result<String, MusicError> {
    let results = api::charts(
        &state.http,
        &state.config_dir,
        p.chart_type.as_deref().unwrap_or("songs"),
        20,
    )
    .await?;

    let mut output: Vec<String> = Vec::new();
    if let Some(map) = results.as_object() {
        for (key, chart_list) in map {
            let Some(chart_list) = chart_list.as_array() else { continue };
            for chart in chart_list {
                let mut title =
                    chart.get("name").and_then(Value::as_str).unwrap_or("").to_string();
                if title.is_empty() {
                    title = key.clone();
                }
                output.push(format!("=== {title} ==="));

                let items = chart.get("data").and_then(Value::as_array).cloned().unwrap_or_default();
                for (i, item) in items.iter().take(20).enumerate() {
                    let name = or_unknown(api::attr_str(item, "name"));
                    let artist = api::attr_str(item, "artistName");
                    if artist.is_empty() {
                        output.push(format!("  {}. {name}", i + 1));
                    } else {
                        output.push(format!("  {}. {name} - {artist}", i + 1));
                    }
                }
            }
        }
    }

    if output.is_empty() {
        return Ok("No chart data available".to_string());
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_music_videos(
    state: &ServerState,
    p: MusicVideosParams,
) -> Result<String, MusicError> {
    let query = p.query.as_deref().unwrap_or("");
    let videos: Vec<Value> = if query.is_empty() {
        // No query: pull the featured videos chart.
        let results = api::charts(&state.http, &state.config_dir, "music-videos", 15).await?;
        results
            .pointer("/music-videos/0/data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    } else {
        let results =
            api::catalog_search(&state.http, &state.config_dir, query, "music-videos", 15).await?;
        hits_in(&results, "music-videos")
    };

    let mut output = Vec::new();
    for video in &videos {
        let name = or_unknown(api::attr_str(video, "name"));
        let artist = or_unknown(api::attr_str(video, "artistName"));
        let mut duration = duration_of(video);
        if duration.is_empty() {
            duration = "0:00".to_string();
        }
        output.push(format!("{name} - {artist} [{duration}] (ID: {})", api::item_id(video)));
    }
    if output.is_empty() {
        return Ok("No music videos found".to_string());
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_genres(state: &ServerState) -> Result<String, MusicError> {
    let genres = api::genres(&state.http, &state.config_dir).await?;
    let output: Vec<String> = genres
        .iter()
        .map(|g| format!("{} (ID: {})", or_unknown(api::attr_str(g, "name")), api::item_id(g)))
        .collect();
    if output.is_empty() {
        return Ok("No genres found".to_string());
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_search_suggestions(
    state: &ServerState,
    p: SuggestionsParams,
) -> Result<String, MusicError> {
    let suggestions = api::search_suggestions(&state.http, &state.config_dir, &p.term).await?;
    let mut output = vec!["=== Search Suggestions ===".to_string()];
    for suggestion in &suggestions {
        if suggestion.get("kind").and_then(Value::as_str) != Some("terms") {
            continue;
        }
        let search_term = suggestion
            .get("searchTerm")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let display = suggestion
            .get("displayTerm")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(search_term);
        output.push(format!("  {display}"));
    }
    if output.len() == 1 {
        return Ok("No suggestions found".to_string());
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_storefronts(state: &ServerState) -> Result<String, MusicError> {
    let storefronts = api::storefronts(&state.http, &state.config_dir).await?;
    let mut output = vec!["=== Apple Music Storefronts ===".to_string()];
    for storefront in &storefronts {
        let id = api::item_id(storefront).to_uppercase();
        let name = or_unknown(api::attr_str(storefront, "name"));
        let language = api::attr_str(storefront, "defaultLanguageTag");
        output.push(format!("  {id}: {name} ({language})"));
    }
    if output.len() == 1 {
        return Ok("No storefronts found".to_string());
    }
    Ok(output.join("\n"))
}

pub(super) async fn get_personal_station(state: &ServerState) -> Result<String, MusicError> {
    let stations = api::personal_station(&state.http, &state.config_dir).await?;
    let Some(station) = stations.first() else {
        return Ok("No personal station found (may require more listening history)".to_string());
    };
    let mut name = api::attr_str(station, "name");
    if name.is_empty() {
        name = "Your Personal Station".to_string();
    }
    let is_live = station
        .pointer("/attributes/isLive")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let output = [
        format!("=== {name} ==="),
        format!("Station ID: {}", api::item_id(station)),
        format!("Type: {}", if is_live { "Live" } else { "On-demand" }),
        String::new(),
        "This station plays music based on your listening history and preferences.".to_string(),
    ];
    Ok(output.join("\n"))
}
