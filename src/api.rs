//! Apple Music web API client.
//!
//! Requests carry the developer token (Bearer) and the music user token
//! loaded from the config directory on every call, so token rotation on
//! disk takes effect without a restart. Response bodies are navigated as
//! `serde_json::Value`; the catalog schema is too wide and too unstable to
//! pin down in structs.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use crate::auth;
use crate::cache::MetadataCache;
use crate::error::MusicError;
use crate::render::format_duration_ms;
use crate::types::{SimpleItem, Track, TrackExtras};

pub const BASE_URL: &str = "https://api.music.apple.com/v1";
pub const STOREFRONT: &str = "us";

/// Standard page size for paginated library endpoints.
const PAGE_SIZE: usize = 100;

/// Catalog IDs are numeric; library IDs carry a prefix like `i.` or `l.`.
pub fn is_catalog_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

fn tokens(config_dir: &Path) -> Result<(String, String), MusicError> {
    Ok((auth::developer_token(config_dir)?, auth::user_token(config_dir)?))
}

async fn get(
    client: &Client,
    config_dir: &Path,
    url: &str,
    query: &[(&str, String)],
) -> Result<Response, MusicError> {
    let (dev, user) = tokens(config_dir)?;
    client
        .get(url)
        .bearer_auth(dev)
        .header("Music-User-Token", user)
        .query(query)
        .send()
        .await
        .map_err(|e| MusicError::RemoteRequestFailed(format!("API request failed: {e}")))
}

async fn post(
    client: &Client,
    config_dir: &Path,
    url: &str,
    query: &[(&str, String)],
    body: Option<&Value>,
) -> Result<Response, MusicError> {
    let (dev, user) = tokens(config_dir)?;
    let mut req = client
        .post(url)
        .bearer_auth(dev)
        .header("Music-User-Token", user)
        .query(query);
    if let Some(body) = body {
        req = req.json(body);
    }
    req.send()
        .await
        .map_err(|e| MusicError::RemoteRequestFailed(format!("API request failed: {e}")))
}

async fn put(
    client: &Client,
    config_dir: &Path,
    url: &str,
    body: &Value,
) -> Result<Response, MusicError> {
    let (dev, user) = tokens(config_dir)?;
    client
        .put(url)
        .bearer_auth(dev)
        .header("Music-User-Token", user)
        .json(body)
        .send()
        .await
        .map_err(|e| MusicError::RemoteRequestFailed(format!("API request failed: {e}")))
}

fn status_error(status: StatusCode) -> MusicError {
    MusicError::RemoteRequestFailed(format!("API returned status {}", status.as_u16()))
}

async fn into_json(resp: Response) -> Result<Value, MusicError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    resp.json()
        .await
        .map_err(|e| MusicError::RemoteRequestFailed(format!("API returned invalid JSON: {e}")))
}

/// GET a JSON endpoint, treating any non-2xx status as failure.
pub async fn get_json(
    client: &Client,
    config_dir: &Path,
    url: &str,
    query: &[(&str, String)],
) -> Result<Value, MusicError> {
    into_json(get(client, config_dir, url, query).await?).await
}

/// Walk a paginated library endpoint until the data runs out. A 404 on any
/// page means the end of pagination, not an error.
pub async fn fetch_paged(
    client: &Client,
    config_dir: &Path,
    url: &str,
) -> Result<Vec<Value>, MusicError> {
    fetch_limited(client, config_dir, url, 0).await
}

/// Same walk but stops once `max` items have been collected. `max` of zero
/// means no cap.
pub async fn fetch_limited(
    client: &Client,
    config_dir: &Path,
    url: &str,
    max: usize,
) -> Result<Vec<Value>, MusicError> {
    let mut all = Vec::new();
    let mut offset = 0usize;
    loop {
        let query = [
            ("limit", PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ];
        let resp = get(client, config_dir, url, &query).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            break;
        }
        let page = into_json(resp).await?;
        let items = data_array(&page);
        if items.is_empty() {
            break;
        }
        let count = items.len();
        all.extend(items);
        if max > 0 && all.len() >= max {
            all.truncate(max);
            break;
        }
        if count < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }
    Ok(all)
}

// ---------------------------------------------------------------------------
// Value navigation
// ---------------------------------------------------------------------------

fn str_of(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn attrs_of(item: &Value) -> &Value {
    item.get("attributes").unwrap_or(&Value::Null)
}

/// Read a string attribute off an API item, empty when absent.
pub fn attr_str(item: &Value, key: &str) -> String {
    str_of(attrs_of(item), key)
}

pub fn item_id(item: &Value) -> String {
    str_of(item, "id")
}

/// Clone the `data` array out of a response body.
pub fn data_array(body: &Value) -> Vec<Value> {
    body.get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn first_genre(attrs: &Value) -> String {
    attrs
        .get("genreNames")
        .and_then(Value::as_array)
        .and_then(|g| g.first())
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn release_year(attrs: &Value) -> String {
    let date = str_of(attrs, "releaseDate");
    date.chars().take(4).collect()
}

fn artwork_url(attrs: &Value) -> String {
    attrs
        .get("artwork")
        .map(|a| str_of(a, "url"))
        .unwrap_or_default()
        .replace("{w}x{h}", "500x500")
}

/// Normalize an API song item into a [`Track`]. Extras are only populated
/// when asked for; most callers render the seven standard fields.
pub fn extract_track(item: &Value, include_extras: bool) -> Track {
    let attrs = attrs_of(item);
    let duration_ms = attrs
        .get("durationInMillis")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let mut track = Track {
        name: str_of(attrs, "name"),
        duration: format_duration_ms(duration_ms),
        artist: str_of(attrs, "artistName"),
        album: str_of(attrs, "albumName"),
        year: release_year(attrs),
        genre: first_genre(attrs),
        id: str_of(item, "id"),
        extras: None,
    };
    if include_extras {
        let preview_url = attrs
            .get("previews")
            .and_then(Value::as_array)
            .and_then(|p| p.first())
            .map(|p| str_of(p, "url"))
            .unwrap_or_default();
        track.extras = Some(TrackExtras {
            track_number: attrs.get("trackNumber").and_then(Value::as_i64),
            disc_number: attrs.get("discNumber").and_then(Value::as_i64),
            has_lyrics: attrs.get("hasLyrics").and_then(Value::as_bool).unwrap_or(false),
            catalog_id: attrs
                .get("playParams")
                .map(|p| str_of(p, "catalogId"))
                .unwrap_or_default(),
            composer: str_of(attrs, "composerName"),
            isrc: str_of(attrs, "isrc"),
            is_explicit: str_of(attrs, "contentRating") == "explicit",
            preview_url,
            artwork_url: artwork_url(attrs),
        });
    }
    track
}

/// Record a song's stable metadata in the reconciliation cache under every
/// identifier the item carries. Library items contribute their library ID
/// plus the catalog ID from playParams; catalog items contribute their
/// numeric ID plus ISRC.
pub fn remember_track(cache: &mut MetadataCache, item: &Value) {
    let attrs = attrs_of(item);
    let id = str_of(item, "id");
    if id.is_empty() {
        return;
    }
    let explicit = if str_of(attrs, "contentRating") == "explicit" { "Yes" } else { "No" };
    let isrc = str_of(attrs, "isrc");
    let catalog_from_params = attrs
        .get("playParams")
        .map(|p| str_of(p, "catalogId"))
        .unwrap_or_default();
    let (library_id, catalog_id) = if is_catalog_id(&id) {
        (String::new(), id)
    } else {
        (id, catalog_from_params)
    };
    cache.set_track_metadata(
        explicit,
        if isrc.is_empty() { None } else { Some(&isrc) },
        None,
        if library_id.is_empty() { None } else { Some(&library_id) },
        if catalog_id.is_empty() { None } else { Some(&catalog_id) },
    );
}

// ---------------------------------------------------------------------------
// Search and library edits
// ---------------------------------------------------------------------------

/// Catalog song search used by fallback flows. Failures collapse to an
/// empty list; callers treat no-results and error identically.
pub async fn search_catalog_songs(
    client: &Client,
    config_dir: &Path,
    query: &str,
    limit: usize,
) -> Vec<Value> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/search");
    let query = [
        ("term", query.to_string()),
        ("types", "songs".to_string()),
        ("limit", limit.min(25).to_string()),
    ];
    match get(client, config_dir, &url, &query).await {
        Ok(resp) if resp.status() == StatusCode::OK => match resp.json::<Value>().await {
            Ok(body) => body
                .pointer("/results/songs/data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Full catalog search across types. Returns the raw `results` object.
pub async fn catalog_search(
    client: &Client,
    config_dir: &Path,
    term: &str,
    types: &str,
    limit: usize,
) -> Result<Value, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/search");
    let query = [
        ("term", term.to_string()),
        ("types", types.to_string()),
        ("limit", limit.min(25).to_string()),
    ];
    let body = get_json(client, config_dir, &url, &query).await?;
    Ok(body.get("results").cloned().unwrap_or_else(|| json!({})))
}

/// Library song search (`library-songs` type).
pub async fn library_search_songs(
    client: &Client,
    config_dir: &Path,
    term: &str,
    limit: usize,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/me/library/search");
    let query = [
        ("term", term.to_string()),
        ("types", "library-songs".to_string()),
        ("limit", limit.min(25).to_string()),
    ];
    let body = get_json(client, config_dir, &url, &query).await?;
    Ok(body
        .pointer("/results/library-songs/data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

/// Add catalog songs to the library.
pub async fn add_songs_to_library(
    client: &Client,
    config_dir: &Path,
    catalog_ids: &[String],
) -> Result<String, MusicError> {
    if catalog_ids.is_empty() {
        return Err(MusicError::InvalidArgument("No catalog IDs provided".to_string()));
    }
    let url = format!("{BASE_URL}/me/library");
    let query = [("ids[songs]", catalog_ids.join(","))];
    let resp = post(client, config_dir, &url, &query, None).await?;
    match resp.status().as_u16() {
        200 | 201 | 202 | 204 => Ok(format!("Added {} song(s) to library", catalog_ids.len())),
        code => Err(MusicError::RemoteRequestFailed(format!("API returned status {code}"))),
    }
}

/// Love or dislike a song by catalog ID.
pub async fn rate_song(
    client: &Client,
    config_dir: &Path,
    song_id: &str,
    rating: &str,
) -> Result<String, MusicError> {
    let value = match rating.to_lowercase().as_str() {
        "love" => 1,
        "dislike" => -1,
        _ => {
            return Err(MusicError::InvalidArgument(
                "rating must be 'love' or 'dislike'".to_string(),
            ));
        }
    };
    let url = format!("{BASE_URL}/me/ratings/songs/{song_id}");
    let body = json!({"type": "rating", "attributes": {"value": value}});
    let resp = put(client, config_dir, &url, &body).await?;
    match resp.status().as_u16() {
        200 | 201 | 204 => Ok(format!("Marked as {rating}")),
        code => Err(MusicError::RemoteRequestFailed(format!("API returned status {code}"))),
    }
}

/// Fetch one catalog song by ID. Non-200 collapses to None.
pub async fn catalog_song(
    client: &Client,
    config_dir: &Path,
    song_id: &str,
) -> Result<Option<Value>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/songs/{song_id}");
    let resp = get(client, config_dir, &url, &[]).await?;
    if resp.status() != StatusCode::OK {
        return Ok(None);
    }
    let body = resp
        .json::<Value>()
        .await
        .map_err(|e| MusicError::RemoteRequestFailed(format!("API returned invalid JSON: {e}")))?;
    Ok(data_array(&body).into_iter().next())
}

/// Fetch one library song by ID. Non-200 collapses to None.
pub async fn library_song(
    client: &Client,
    config_dir: &Path,
    song_id: &str,
) -> Result<Option<Value>, MusicError> {
    let url = format!("{BASE_URL}/me/library/songs/{song_id}");
    let resp = get(client, config_dir, &url, &[]).await?;
    if resp.status() != StatusCode::OK {
        return Ok(None);
    }
    let body = resp
        .json::<Value>()
        .await
        .map_err(|e| MusicError::RemoteRequestFailed(format!("API returned invalid JSON: {e}")))?;
    Ok(data_array(&body).into_iter().next())
}

/// Poll the library search until a just-added track shows up, matching by
/// exact name and artist containment. Library sync lags the add call by up
/// to a second.
pub async fn find_library_id(
    client: &Client,
    config_dir: &Path,
    name: &str,
    artist: &str,
) -> Option<String> {
    let name_lower = name.to_lowercase();
    let artist_lower = artist.to_lowercase();
    for attempt in 0..10 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let Ok(songs) = library_search_songs(client, config_dir, name, 25).await else {
            continue;
        };
        for song in &songs {
            let attrs = attrs_of(song);
            if str_of(attrs, "name").to_lowercase() == name_lower
                && str_of(attrs, "artistName").to_lowercase().contains(&artist_lower)
            {
                return Some(str_of(song, "id"));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Playlists
// ---------------------------------------------------------------------------

/// Fetch every library playlist as a simple item.
pub async fn library_playlists(
    client: &Client,
    config_dir: &Path,
) -> Result<Vec<SimpleItem>, MusicError> {
    let url = format!("{BASE_URL}/me/library/playlists");
    let items = fetch_paged(client, config_dir, &url).await?;
    Ok(items.iter().map(playlist_item).collect())
}

fn playlist_item(playlist: &Value) -> SimpleItem {
    let attrs = attrs_of(playlist);
    let description = match attrs.get("description") {
        Some(Value::Object(desc)) => desc
            .get("standard")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let name = attrs
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    SimpleItem {
        name,
        artist: None,
        id: str_of(playlist, "id"),
        extra: vec![
            ("can_edit", json!(attrs.get("canEdit").and_then(Value::as_bool).unwrap_or(false))),
            ("is_public", json!(attrs.get("isPublic").and_then(Value::as_bool).unwrap_or(false))),
            ("date_added", json!(str_of(attrs, "dateAdded"))),
            ("last_modified", json!(str_of(attrs, "lastModifiedDate"))),
            ("description", json!(description)),
            ("has_catalog", json!(attrs.get("hasCatalog").and_then(Value::as_bool).unwrap_or(false))),
        ],
    }
}

/// Raw track items of a library playlist, fully paginated.
pub async fn playlist_tracks(
    client: &Client,
    config_dir: &Path,
    playlist_id: &str,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/me/library/playlists/{playlist_id}/tracks");
    fetch_paged(client, config_dir, &url).await
}

/// Name/artist pairs of a playlist's tracks, for duplicate checks.
pub async fn playlist_track_names(
    client: &Client,
    config_dir: &Path,
    playlist_id: &str,
) -> Result<Vec<(String, String)>, MusicError> {
    let tracks = playlist_tracks(client, config_dir, playlist_id).await?;
    Ok(tracks
        .iter()
        .map(|t| {
            let attrs = attrs_of(t);
            (str_of(attrs, "name"), str_of(attrs, "artistName"))
        })
        .collect())
}

/// Substring-match a track against `name - artist` pairs.
pub fn find_track_in_list(
    tracks: &[(String, String)],
    track_name: &str,
    artist: &str,
) -> Vec<String> {
    let track_lower = track_name.to_lowercase();
    let artist_lower = artist.to_lowercase();
    let mut matches = Vec::new();
    for (name, track_artist) in tracks {
        if name.to_lowercase().contains(&track_lower) {
            if !artist_lower.is_empty() && !track_artist.to_lowercase().contains(&artist_lower) {
                continue;
            }
            matches.push(format!("{name} - {track_artist}"));
        }
    }
    matches
}

/// Create an API-editable playlist. Returns the new playlist's ID.
pub async fn create_playlist(
    client: &Client,
    config_dir: &Path,
    name: &str,
    description: &str,
) -> Result<String, MusicError> {
    let url = format!("{BASE_URL}/me/library/playlists");
    let body = json!({"attributes": {"name": name, "description": description}});
    let resp = post(client, config_dir, &url, &[], Some(&body)).await?;
    let data = into_json(resp).await?;
    Ok(data_array(&data)
        .first()
        .map(|p| str_of(p, "id"))
        .unwrap_or_default())
}

/// Append library songs to a playlist. Playlists not created through the
/// API answer 403 (or sometimes 500) to this call.
pub async fn add_tracks_to_playlist(
    client: &Client,
    config_dir: &Path,
    playlist_id: &str,
    library_ids: &[String],
) -> Result<(), MusicError> {
    let url = format!("{BASE_URL}/me/library/playlists/{playlist_id}/tracks");
    let track_data: Vec<Value> = library_ids
        .iter()
        .map(|id| json!({"id": id, "type": "library-songs"}))
        .collect();
    let body = json!({"data": track_data});
    let resp = post(client, config_dir, &url, &[], Some(&body)).await?;
    match resp.status().as_u16() {
        204 => Ok(()),
        403 | 500 => Err(MusicError::PermissionDenied),
        code if (200..300).contains(&code) => Ok(()),
        code => Err(MusicError::RemoteRequestFailed(format!("API returned status {code}"))),
    }
}

// ---------------------------------------------------------------------------
// Albums, history, discovery
// ---------------------------------------------------------------------------

/// Album tracks by library (`l.` prefixed) or catalog (numeric) album ID.
pub async fn album_tracks(
    client: &Client,
    config_dir: &Path,
    album_id: &str,
) -> Result<Vec<Value>, MusicError> {
    let url = if album_id.starts_with("l.") {
        format!("{BASE_URL}/me/library/albums/{album_id}/tracks")
    } else {
        format!("{BASE_URL}/catalog/{STOREFRONT}/albums/{album_id}/tracks")
    };
    fetch_paged(client, config_dir, &url).await
}

/// Recently played history. The endpoint serves at most 10 per page.
pub async fn recently_played(
    client: &Client,
    config_dir: &Path,
    limit: usize,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/me/recent/played/tracks");
    let max = limit.min(50);
    let mut all = Vec::new();
    let mut offset = 0usize;
    while offset < max {
        let batch = (max - offset).min(10);
        let query = [("limit", batch.to_string()), ("offset", offset.to_string())];
        let resp = get(client, config_dir, &url, &query).await?;
        if resp.status() != StatusCode::OK {
            break;
        }
        let Ok(body) = resp.json::<Value>().await else { break };
        let items = data_array(&body);
        if items.is_empty() {
            break;
        }
        all.extend(items);
        offset += 10;
    }
    Ok(all)
}

/// Recently added library content. Pages are fixed at 25 items.
pub async fn recently_added(
    client: &Client,
    config_dir: &Path,
    limit: usize,
) -> Result<Vec<SimpleItem>, MusicError> {
    let url = format!("{BASE_URL}/me/library/recently-added");
    let max = limit.min(100);
    let mut all = Vec::new();
    let mut offset = 0usize;
    while all.len() < max {
        let batch = (max - all.len()).min(25);
        let query = [("limit", batch.to_string()), ("offset", offset.to_string())];
        let resp = get(client, config_dir, &url, &query).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            break;
        }
        let body = into_json(resp).await?;
        let items = data_array(&body);
        if items.is_empty() {
            break;
        }
        let count = items.len();
        all.extend(items);
        if count < batch {
            break;
        }
        offset += 25;
    }
    Ok(all.iter().map(|i| rotation_item(i, false)).collect())
}

pub async fn heavy_rotation(
    client: &Client,
    config_dir: &Path,
) -> Result<Vec<SimpleItem>, MusicError> {
    let url = format!("{BASE_URL}/me/history/heavy-rotation");
    let body = get_json(client, config_dir, &url, &[]).await?;
    Ok(data_array(&body).iter().map(|i| rotation_item(i, true)).collect())
}

/// Shared shape for heavy-rotation and recently-added items. Heavy rotation
/// additionally spells out hyphenated type names.
fn rotation_item(item: &Value, spell_out_type: bool) -> SimpleItem {
    let attrs = attrs_of(item);
    let mut kind = str_of(item, "type").replace("library-", "");
    if spell_out_type {
        kind = kind.replace('-', " ");
    }
    SimpleItem {
        name: str_of(attrs, "name"),
        artist: Some(str_of(attrs, "artistName")),
        id: str_of(item, "id"),
        extra: vec![
            ("type", json!(kind)),
            (
                "track_count",
                attrs.get("trackCount").cloned().unwrap_or_else(|| json!("")),
            ),
            ("genre", json!(first_genre(attrs))),
            ("release_date", json!(str_of(attrs, "releaseDate"))),
            ("date_added", json!(str_of(attrs, "dateAdded"))),
            ("artwork_url", json!(artwork_url(attrs))),
        ],
    }
}

pub async fn recommendations(
    client: &Client,
    config_dir: &Path,
) -> Result<Vec<SimpleItem>, MusicError> {
    let url = format!("{BASE_URL}/me/recommendations");
    let body = get_json(client, config_dir, &url, &[("limit", "10".to_string())]).await?;
    Ok(recommendation_items(&body))
}

/// Flatten recommendation groups to at most 8 entries per category.
fn recommendation_items(body: &Value) -> Vec<SimpleItem> {
    let mut all = Vec::new();
    for rec in data_array(body) {
        let attrs = attrs_of(&rec);
        let category = attrs
            .pointer("/title/stringForDisplay")
            .and_then(Value::as_str)
            .unwrap_or("Recommendation")
            .to_string();
        let contents = rec
            .pointer("/relationships/contents/data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for item in contents.iter().take(8) {
            let item_attrs = attrs_of(item);
            let name = item_attrs
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();
            all.push(SimpleItem {
                name,
                artist: Some(str_of(item_attrs, "artistName")),
                id: str_of(item, "id"),
                extra: vec![
                    ("category", json!(category)),
                    ("type", json!(str_of(item, "type").replace("library-", ""))),
                    ("year", json!(release_year(item_attrs))),
                ],
            });
        }
    }
    all
}

// ---------------------------------------------------------------------------
// Artists, stations, catalog browsing
// ---------------------------------------------------------------------------

/// Search for an artist by name. Returns the top hit's ID and raw item.
pub async fn find_artist(
    client: &Client,
    config_dir: &Path,
    artist_name: &str,
) -> Result<Option<(String, Value)>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/search");
    let query = [
        ("term", artist_name.to_string()),
        ("types", "artists".to_string()),
        ("limit", "1".to_string()),
    ];
    let body = get_json(client, config_dir, &url, &query).await?;
    let artists = body
        .pointer("/results/artists/data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(artists.into_iter().next().map(|a| (str_of(&a, "id"), a)))
}

/// Catalog artist view endpoints: `top-songs`, `similar-artists`.
pub async fn artist_view(
    client: &Client,
    config_dir: &Path,
    artist_id: &str,
    view: &str,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/artists/{artist_id}/view/{view}");
    let body = get_json(client, config_dir, &url, &[]).await?;
    Ok(data_array(&body))
}

/// An artist's albums. Non-200 collapses to an empty list; callers render
/// the artist header even when the album fetch fails.
pub async fn artist_albums(
    client: &Client,
    config_dir: &Path,
    artist_id: &str,
    limit: usize,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/artists/{artist_id}/albums");
    let resp = get(client, config_dir, &url, &[("limit", limit.to_string())]).await?;
    if resp.status() != StatusCode::OK {
        return Ok(Vec::new());
    }
    let Ok(body) = resp.json::<Value>().await else {
        return Ok(Vec::new());
    };
    Ok(data_array(&body))
}

/// Station derived from a song.
pub async fn song_station(
    client: &Client,
    config_dir: &Path,
    song_id: &str,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/songs/{song_id}/station");
    let body = get_json(client, config_dir, &url, &[]).await?;
    Ok(data_array(&body))
}

/// The listener's personal radio station.
pub async fn personal_station(
    client: &Client,
    config_dir: &Path,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/stations");
    let query = [("filter[identity]", "personal".to_string())];
    let body = get_json(client, config_dir, &url, &query).await?;
    Ok(data_array(&body))
}

/// Chart listings. Returns the raw `results` object keyed by chart type.
pub async fn charts(
    client: &Client,
    config_dir: &Path,
    types: &str,
    limit: usize,
) -> Result<Value, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/charts");
    let query = [("types", types.to_string()), ("limit", limit.to_string())];
    let body = get_json(client, config_dir, &url, &query).await?;
    Ok(body.get("results").cloned().unwrap_or_else(|| json!({})))
}

pub async fn genres(client: &Client, config_dir: &Path) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/genres");
    let body = get_json(client, config_dir, &url, &[("limit", "50".to_string())]).await?;
    Ok(data_array(&body))
}

pub async fn storefronts(client: &Client, config_dir: &Path) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/storefronts");
    let body = get_json(client, config_dir, &url, &[]).await?;
    Ok(data_array(&body))
}

/// Typeahead suggestions for a partial term.
pub async fn search_suggestions(
    client: &Client,
    config_dir: &Path,
    term: &str,
) -> Result<Vec<Value>, MusicError> {
    let url = format!("{BASE_URL}/catalog/{STOREFRONT}/search/suggestions");
    let query = [
        ("term", term.to_string()),
        ("kinds", "terms".to_string()),
        ("limit", "10".to_string()),
    ];
    let body = get_json(client, config_dir, &url, &query).await?;
    Ok(body
        .pointer("/results/suggestions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

/// Probe the API with a one-playlist request. Distinguishes auth failures
/// from other statuses for the status report.
pub async fn probe_connection(client: &Client, config_dir: &Path) -> String {
    let url = format!("{BASE_URL}/me/library/playlists");
    match get(client, config_dir, &url, &[("limit", "1".to_string())]).await {
        Ok(resp) => match resp.status().as_u16() {
            200 => "API Connection: OK".to_string(),
            401 => "API Connection: UNAUTHORIZED - Token may be expired. Run: applemusic-mcp authorize"
                .to_string(),
            code => format!("API Connection: FAILED ({code})"),
        },
        Err(e) => format!("API Connection: ERROR - {e}"),
    }
}
