use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Generates an opaque random identifier for newly created entities.
pub fn generate_id() -> String {
    use rand::{Rng, distributions::Alphanumeric};
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(21)
        .map(char::from)
        .collect()
}

/// Splits free-form tag input on commas/whitespace and normalizes each tag
/// to a single `#` prefix. Empty tokens are dropped, duplicates keep their
/// first occurrence.
pub fn normalize_tags(input: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim().trim_start_matches('#');
        if token.is_empty() {
            continue;
        }
        let tag = format!("#{token}");
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life_expectancy: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WishRecord {
    pub id: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl WishRecord {
    pub fn new(content: &str) -> Self {
        Self {
            id: generate_id(),
            content: content.trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawWishItem")]
pub struct WishItem {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub tags: Vec<String>,
    pub records: Vec<WishRecord>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WishItem {
    pub fn new(title: &str, tags: Vec<String>) -> Self {
        Self {
            id: generate_id(),
            title: title.trim().to_string(),
            completed: false,
            tags,
            records: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Stored shape of a wish item, including fields from earlier versions.
/// Items written before tags and progress records existed carried a single
/// free-text `notes` string; that note becomes the item's first record.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWishItem {
    id: String,
    title: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    records: Vec<WishRecord>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl From<RawWishItem> for WishItem {
    fn from(raw: RawWishItem) -> Self {
        let mut records = raw.records;
        if records.is_empty()
            && let Some(notes) = raw.notes.as_deref().map(str::trim)
            && !notes.is_empty()
        {
            // Deterministic id: re-reading a legacy item can never mint a
            // second record for the same note.
            records.push(WishRecord {
                id: format!("migrated-{}", raw.id),
                content: notes.to_string(),
                created_at: raw.created_at,
            });
        }
        Self {
            id: raw.id,
            title: raw.title,
            completed: raw.completed,
            tags: raw.tags,
            records,
            created_at: raw.created_at,
            completed_at: raw.completed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WishList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<WishItem>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl WishList {
    pub fn new(name: &str) -> Self {
        Self {
            id: generate_id(),
            name: name.trim().to_string(),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// One journal entry per calendar date.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: String,
    pub date: NaiveDate,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, content: &str, tags: Vec<String>) -> Self {
        Self {
            id: generate_id(),
            date,
            content: content.trim().to_string(),
            tags,
            created_at: Utc::now(),
        }
    }
}

/// Identifier of a specific remote file revision. The value is produced by
/// the remote store and is only ever handed back on the next write; it is
/// never inspected or derived locally.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
