use crate::app::ports::MediaCatalogPort;
use anilog_core::{MediaResult, MediaTitle, NextAiringEpisode};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("anilog-server/", env!("CARGO_PKG_VERSION"));

const MEDIA_FIELDS: &str = r#"
    id
    type
    title { romaji english native }
    description
    format
    episodes
    chapters
    volumes
    averageScore
    nextAiringEpisode { episode timeUntilAiring }
    startDate { year month day }
    coverImage { extraLarge }
    status
    genres
    studios { nodes { name } }
    synonyms
    isAdult
"#;

fn search_query() -> String {
    format!(
        r#"query (
    $search: String,
    $page: Int,
    $perPage: Int,
    $type: MediaType,
    $format: [MediaFormat],
    $statusIn: [MediaStatus],
    $isAdult: Boolean,
    $genres: [String],
    $genresNotIn: [String],
    $sortBy: [MediaSort]
) {{
  Page(page: $page, perPage: $perPage) {{
    media(
      search: $search,
      type: $type,
      format_in: $format,
      status_in: $statusIn,
      isAdult: $isAdult,
      genre_in: $genres,
      genre_not_in: $genresNotIn,
      sort: $sortBy
    ) {{{fields}}}
  }}
}}"#,
        fields = MEDIA_FIELDS
    )
}

fn by_id_query() -> String {
    format!(
        "query ($id: Int) {{\n  Page {{\n    media(id: $id) {{{fields}}}\n  }}\n}}",
        fields = MEDIA_FIELDS
    )
}

/// GraphQL client for the public AniList API.
pub struct AniListClient {
    client: reqwest::Client,
    api_url: String,
}

impl AniListClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("Failed to build AniList HTTP client: {}", e))?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    #[instrument(skip(self, query, variables))]
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, String> {
        let body = json!({ "query": query, "variables": variables });
        let resp = self
            .client
            .post(&self.api_url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("AniList responded with HTTP {}", status.as_u16()));
        }

        let payload: Value = resp.json().await.map_err(|e| e.to_string())?;
        debug!("AniList response received");
        Ok(payload)
    }
}

#[async_trait]
impl MediaCatalogPort for AniListClient {
    async fn search_media(&self, variables: Value) -> Result<Vec<MediaResult>, String> {
        let payload = self.execute(&search_query(), variables).await?;
        parse_media_page(&payload)
    }

    async fn media_by_id(&self, id: i64) -> Result<Vec<MediaResult>, String> {
        let payload = self.execute(&by_id_query(), json!({ "id": id })).await?;
        parse_media_page(&payload)
    }
}

fn opt_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn opt_i64(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Flattens `data.Page.media[]` into catalog records. Missing pieces stay empty.
///
/// A payload without the media array is an error, carrying the first GraphQL
/// error message when AniList sent one.
pub fn parse_media_page(payload: &Value) -> Result<Vec<MediaResult>, String> {
    let media = match payload.pointer("/data/Page/media").and_then(Value::as_array) {
        Some(media) => media,
        None => {
            return Err(match payload.pointer("/errors/0/message").and_then(Value::as_str) {
                Some(message) => format!("AniList error: {}", message),
                None => "AniList response missing data.Page.media".to_string(),
            })
        }
    };

    Ok(media
        .iter()
        .filter(|m| m.is_object())
        .map(parse_media)
        .collect())
}

fn parse_media(media: &Value) -> MediaResult {
    let null = Value::Null;
    let title = media.get("title").unwrap_or(&null);
    let start = media.get("startDate").unwrap_or(&null);

    let next_airing_episode = media
        .get("nextAiringEpisode")
        .filter(|n| n.is_object())
        .map(|n| NextAiringEpisode {
            episode: opt_i64(n, "episode"),
            time_until_airing: opt_i64(n, "timeUntilAiring"),
        })
        .filter(|n| n.episode.is_some() || n.time_until_airing.is_some());

    let studios = media
        .pointer("/studios/nodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(|n| n.get("name").and_then(Value::as_str))
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    MediaResult {
        id: opt_i64(media, "id").unwrap_or(0),
        media_type: opt_string(media, "type"),
        title: MediaTitle {
            romaji: opt_string(title, "romaji"),
            english: opt_string(title, "english"),
            native: opt_string(title, "native"),
        },
        description: opt_string(media, "description"),
        format: opt_string(media, "format"),
        episodes: opt_i64(media, "episodes"),
        chapters: opt_i64(media, "chapters"),
        volumes: opt_i64(media, "volumes"),
        average_score: opt_i64(media, "averageScore"),
        next_airing_episode,
        day: opt_i64(start, "day"),
        month: opt_i64(start, "month"),
        year: opt_i64(start, "year"),
        cover_image_url: media
            .pointer("/coverImage/extraLarge")
            .and_then(Value::as_str)
            .map(str::to_string),
        status: opt_string(media, "status"),
        genres: string_list(media.get("genres")),
        studios,
        synonyms: string_list(media.get("synonyms")),
        is_adult: media.get("isAdult").and_then(Value::as_bool).unwrap_or(false),
    }
}
