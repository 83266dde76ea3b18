//! Catalog records flattened from AniList media responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NextAiringEpisode {
    pub episode: Option<i64>,
    pub time_until_airing: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaResult {
    pub id: i64,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub title: MediaTitle,
    pub description: Option<String>,
    pub format: Option<String>,
    pub episodes: Option<i64>,
    pub chapters: Option<i64>,
    pub volumes: Option<i64>,
    pub average_score: Option<i64>,
    pub next_airing_episode: Option<NextAiringEpisode>,
    pub day: Option<i64>,
    pub month: Option<i64>,
    pub year: Option<i64>,
    pub cover_image_url: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub synonyms: Vec<String>,
    pub is_adult: bool,
}
