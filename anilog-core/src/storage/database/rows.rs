//! Column lists and row decoding for the libSQL tables.

use crate::common::error::{Result, StoreError};
use crate::domain::*;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Row, Value};

pub const USER_COLUMNS: &str = "id, username, password_hash, age, bio, avatar_url, email_address, \
     favorite_anime, favorite_genres, favorite_manga, created_at";

pub const FOLLOW_COLUMNS: &str = "id, follower_id, followee_id, status, created_at";

pub const LIST_ITEM_COLUMNS: &str =
    "id, user_id, title, type, cover_image_url, anilist_id, added_date";

pub const WATCHED_COLUMNS: &str = "id, user_id, title, type, cover_image_url, anilist_id, \
     watched_date, completed_date, episodes_watched, total_episodes, chapters_read, \
     total_chapters, status, rating, notes";

pub const REFRESH_TOKEN_COLUMNS: &str = "id, token_hash, user_id, expires_at, created_at";

/// Typed accessors over a result row. Column indexes follow the column lists above.
pub struct RowReader<'a> {
    row: &'a Row,
    table: &'static str,
}

impl<'a> RowReader<'a> {
    pub fn new(row: &'a Row, table: &'static str) -> Self {
        Self { row, table }
    }

    fn value(&self, idx: i32) -> Result<Value> {
        self.row.get_value(idx).map_err(|e| {
            StoreError::database(format!("Failed to read {} column {}: {e}", self.table, idx))
        })
    }

    fn mismatch(&self, idx: i32, expected: &str) -> StoreError {
        StoreError::database(format!(
            "Unexpected value in {} column {}, expected {}",
            self.table, idx, expected
        ))
    }

    pub fn opt_i64(&self, idx: i32) -> Result<Option<i64>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(v)),
            Value::Real(v) => Ok(Some(v as i64)),
            _ => Err(self.mismatch(idx, "integer")),
        }
    }

    pub fn i64(&self, idx: i32) -> Result<i64> {
        self.opt_i64(idx)?.ok_or_else(|| self.mismatch(idx, "integer"))
    }

    pub fn opt_i32(&self, idx: i32) -> Result<Option<i32>> {
        self.opt_i64(idx)?
            .map(|v| i32::try_from(v).map_err(|_| self.mismatch(idx, "32-bit integer")))
            .transpose()
    }

    pub fn opt_f64(&self, idx: i32) -> Result<Option<f64>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Real(v) => Ok(Some(v)),
            Value::Integer(v) => Ok(Some(v as f64)),
            _ => Err(self.mismatch(idx, "real")),
        }
    }

    pub fn opt_text(&self, idx: i32) -> Result<Option<String>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Text(v) => Ok(Some(v)),
            _ => Err(self.mismatch(idx, "text")),
        }
    }

    pub fn text(&self, idx: i32) -> Result<String> {
        self.opt_text(idx)?.ok_or_else(|| self.mismatch(idx, "text"))
    }

    pub fn opt_datetime(&self, idx: i32) -> Result<Option<DateTime<Utc>>> {
        self.opt_text(idx)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        StoreError::database(format!(
                            "Invalid timestamp '{}' in {} column {}: {e}",
                            raw, self.table, idx
                        ))
                    })
            })
            .transpose()
    }

    pub fn datetime(&self, idx: i32) -> Result<DateTime<Utc>> {
        self.opt_datetime(idx)?
            .ok_or_else(|| self.mismatch(idx, "timestamp"))
    }

    pub fn parsed<T: std::str::FromStr>(&self, idx: i32) -> Result<T> {
        let raw = self.text(idx)?;
        raw.parse::<T>()
            .map_err(|_| StoreError::InvalidRecord(format!("{}: unknown value '{}'", self.table, raw)))
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub fn to_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn user_from_row(row: &Row) -> Result<User> {
    let r = RowReader::new(row, "users");
    let genres: Vec<String> = match r.opt_text(8)? {
        Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)?,
        _ => Vec::new(),
    };

    Ok(User {
        id: Some(r.i64(0)?),
        username: r.text(1)?,
        password_hash: r.text(2)?,
        age: r.opt_i32(3)?,
        bio: r.opt_text(4)?,
        avatar_url: r.opt_text(5)?,
        email_address: r.text(6)?,
        favorite_anime: r.opt_text(7)?,
        favorite_genres: genres,
        favorite_manga: r.opt_text(9)?,
        created_at: r.datetime(10)?,
    })
}

pub fn follow_from_row(row: &Row) -> Result<Follow> {
    let r = RowReader::new(row, "follows");
    Ok(Follow {
        id: Some(r.i64(0)?),
        follower_id: r.i64(1)?,
        followee_id: r.i64(2)?,
        status: r.parsed(3)?,
        created_at: r.datetime(4)?,
    })
}

pub fn list_item_from_row(row: &Row) -> Result<ListItem> {
    let r = RowReader::new(row, "user_list_items");
    Ok(ListItem {
        id: Some(r.i64(0)?),
        user_id: r.i64(1)?,
        title: r.text(2)?,
        media_type: r.parsed(3)?,
        cover_image_url: r.opt_text(4)?,
        anilist_id: r.opt_i64(5)?,
        added_date: r.datetime(6)?,
    })
}

pub fn watched_item_from_row(row: &Row) -> Result<WatchedItem> {
    let r = RowReader::new(row, "watched_items");
    Ok(WatchedItem {
        id: Some(r.i64(0)?),
        user_id: r.i64(1)?,
        title: r.text(2)?,
        media_type: r.parsed(3)?,
        cover_image_url: r.opt_text(4)?,
        anilist_id: r.opt_i64(5)?,
        watched_date: r.datetime(6)?,
        completed_date: r.opt_datetime(7)?,
        episodes_watched: r.opt_i32(8)?,
        total_episodes: r.opt_i32(9)?,
        chapters_read: r.opt_i32(10)?,
        total_chapters: r.opt_i32(11)?,
        status: r.parsed(12)?,
        rating: r.opt_f64(13)?,
        notes: r.opt_text(14)?,
    })
}

pub fn refresh_token_from_row(row: &Row) -> Result<RefreshToken> {
    let r = RowReader::new(row, "refresh_tokens");
    Ok(RefreshToken {
        id: Some(r.i64(0)?),
        token_hash: r.text(1)?,
        user_id: r.i64(2)?,
        expires_at: r.datetime(3)?,
        created_at: r.datetime(4)?,
    })
}
