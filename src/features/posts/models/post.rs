use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// A row of the `posts` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    /// Server-assigned identifier (uuid or bigint depending on the schema)
    #[serde(deserialize_with = "deserialize_opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_optional_opaque_id")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Insert payload for a new post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub body: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueId {
    Text(String),
    Number(i64),
}

impl From<OpaqueId> for String {
    fn from(id: OpaqueId) -> Self {
        match id {
            OpaqueId::Text(s) => s,
            OpaqueId::Number(n) => n.to_string(),
        }
    }
}

fn deserialize_opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    OpaqueId::deserialize(deserializer).map(String::from)
}

fn deserialize_optional_opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<OpaqueId>::deserialize(deserializer).map(|id| id.map(String::from))
}

fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 (`timestamptz`) as well as offset-less `timestamp`
/// values, which the realtime feed sends for columns without a time zone.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid timestamp '{}'", raw))
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Postgres renders `+00` rather than `+00:00` in some contexts
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
