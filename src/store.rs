use crate::github::RemoteSyncConfig;
use crate::models::{DailyRecord, UserSettings, VersionToken, WishList};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The five independently addressable persistence slots. Each slot is one
/// JSON file under the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Settings,
    WishLists,
    DailyRecords,
    RemoteConfig,
    RemoteVersion,
}

impl Slot {
    fn file_name(self) -> &'static str {
        match self {
            Slot::Settings => "settings.json",
            Slot::WishLists => "wish-lists.json",
            Slot::DailyRecords => "daily-records.json",
            Slot::RemoteConfig => "github-sync.json",
            Slot::RemoteVersion => "github-file-sha.json",
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Serialize(String),
}

impl StoreError {
    pub fn message(&self) -> String {
        match self {
            StoreError::Io(msg) => format!("storage failure: {msg}"),
            StoreError::Serialize(msg) => format!("could not encode state: {msg}"),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// In-memory cache of the persisted slots. Opened once per process and
/// handed to whatever drives the tool; no other code touches the data
/// directory.
pub struct Store {
    data_dir: PathBuf,
    pub settings: UserSettings,
    pub wish_lists: Vec<WishList>,
    pub daily_records: Vec<DailyRecord>,
    remote_config: Option<RemoteSyncConfig>,
    version_token: Option<VersionToken>,
}

impl Store {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        // First-ever run seeds defaults; corrupt settings fall back to the
        // default value in memory without overwriting the stored bytes.
        let settings = if !data_dir.join(Slot::Settings.file_name()).exists() {
            let seeded = default_settings();
            save_slot(&data_dir, Slot::Settings, &seeded)?;
            seeded
        } else {
            load_slot::<UserSettings>(&data_dir, Slot::Settings).unwrap_or_default()
        };

        let wish_lists = load_data_slot::<Vec<WishList>>(&data_dir, Slot::WishLists)?;
        let daily_records = load_data_slot::<Vec<DailyRecord>>(&data_dir, Slot::DailyRecords)?;
        let remote_config = load_slot::<RemoteSyncConfig>(&data_dir, Slot::RemoteConfig);
        let version_token = load_slot::<VersionToken>(&data_dir, Slot::RemoteVersion);

        Ok(Self {
            data_dir,
            settings,
            wish_lists,
            daily_records,
            remote_config,
            version_token,
        })
    }

    pub fn persist(&self, slot: Slot) -> Result<(), StoreError> {
        match slot {
            Slot::Settings => save_slot(&self.data_dir, slot, &self.settings),
            Slot::WishLists => save_slot(&self.data_dir, slot, &self.wish_lists),
            Slot::DailyRecords => save_slot(&self.data_dir, slot, &self.daily_records),
            Slot::RemoteConfig => match &self.remote_config {
                Some(config) => save_slot(&self.data_dir, slot, config),
                None => clear_slot(&self.data_dir, slot),
            },
            Slot::RemoteVersion => match &self.version_token {
                Some(token) => save_slot(&self.data_dir, slot, token),
                None => clear_slot(&self.data_dir, slot),
            },
        }
    }

    pub fn remote_config(&self) -> Option<&RemoteSyncConfig> {
        self.remote_config.as_ref()
    }

    pub fn set_remote_config(&mut self, config: RemoteSyncConfig) -> Result<(), StoreError> {
        self.remote_config = Some(config);
        self.persist(Slot::RemoteConfig)
    }

    /// Unsets the sync target. The version token identifies a revision of
    /// that target, so the two slots are cleared as a unit.
    pub fn clear_remote_config(&mut self) -> Result<(), StoreError> {
        self.remote_config = None;
        self.version_token = None;
        self.persist(Slot::RemoteConfig)?;
        self.persist(Slot::RemoteVersion)
    }

    pub fn version_token(&self) -> Option<&VersionToken> {
        self.version_token.as_ref()
    }

    pub fn set_version_token(&mut self, token: VersionToken) -> Result<(), StoreError> {
        self.version_token = Some(token);
        self.persist(Slot::RemoteVersion)
    }

    pub fn record_for_date(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.daily_records.iter().find(|r| r.date == date)
    }

    /// Case-insensitive search over record content and tags, newest first.
    pub fn search_records(&self, query: &str) -> Vec<&DailyRecord> {
        let query = query.to_lowercase();
        let mut results: Vec<&DailyRecord> = self
            .daily_records
            .iter()
            .filter(|record| {
                record.content.to_lowercase().contains(&query)
                    || record.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
            })
            .collect();
        results.sort_by(|a, b| b.date.cmp(&a.date));
        results
    }

    /// Returns every tag used across daily records and wish items with its
    /// occurrence count, sorted by frequency.
    pub fn all_tags(&self) -> Vec<(String, usize)> {
        let mut tag_counts: HashMap<String, usize> = HashMap::new();
        for record in &self.daily_records {
            for tag in &record.tags {
                *tag_counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        for list in &self.wish_lists {
            for item in &list.items {
                for tag in &item.tags {
                    *tag_counts.entry(tag.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut tags: Vec<(String, usize)> = tag_counts.into_iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tags
    }
}

fn default_settings() -> UserSettings {
    UserSettings {
        birthday: None,
        life_expectancy: Some(80),
    }
}

fn load_slot<T: DeserializeOwned>(data_dir: &Path, slot: Slot) -> Option<T> {
    let path = data_dir.join(slot.file_name());
    let content = fs::read_to_string(path).ok()?;
    // Unreadable and unparseable both collapse to "absent"; stale or
    // corrupt state must never keep the tool from starting with defaults.
    serde_json::from_str(&content).ok()
}

/// Loads a data slot and immediately re-persists it when deserialization
/// changed its shape (legacy field migration, missing defaults).
fn load_data_slot<T>(data_dir: &Path, slot: Slot) -> Result<T, StoreError>
where
    T: DeserializeOwned + Serialize + Default,
{
    let path = data_dir.join(slot.file_name());
    let Ok(raw) = fs::read_to_string(&path) else {
        return Ok(T::default());
    };
    let Ok(value) = serde_json::from_str::<T>(&raw) else {
        return Ok(T::default());
    };
    let normalized =
        serde_json::to_string_pretty(&value).map_err(|e| StoreError::Serialize(e.to_string()))?;
    if normalized != raw {
        fs::write(&path, &normalized)?;
    }
    Ok(value)
}

fn save_slot<T: Serialize>(data_dir: &Path, slot: Slot, value: &T) -> Result<(), StoreError> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
    fs::write(data_dir.join(slot.file_name()), content)?;
    Ok(())
}

fn clear_slot(data_dir: &Path, slot: Slot) -> Result<(), StoreError> {
    match fs::remove_file(data_dir.join(slot.file_name())) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_data_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        dir.push(format!("lifelog-test-{}-{}", std::process::id(), stamp));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn remote_config() -> RemoteSyncConfig {
        RemoteSyncConfig {
            owner: "octocat".to_string(),
            repo: "life".to_string(),
            path: "data/life-tracker.json".to_string(),
            token: "ghp_test".to_string(),
            branch: "main".to_string(),
        }
    }

    #[test]
    fn first_open_seeds_default_settings() {
        let dir = temp_data_dir();
        let store = Store::open(&dir).expect("open store");
        assert_eq!(store.settings.life_expectancy, Some(80));
        assert!(store.settings.birthday.is_none());
        assert!(dir.join("settings.json").exists());

        // A later open reads the seeded value instead of re-seeding.
        let again = Store::open(&dir).expect("reopen store");
        assert_eq!(again.settings, store.settings);
    }

    #[test]
    fn corrupt_slot_is_treated_as_absent() {
        let dir = temp_data_dir();
        fs::write(dir.join("settings.json"), "{not json").expect("write corrupt slot");
        fs::write(dir.join("daily-records.json"), "also not json").expect("write corrupt slot");

        let store = Store::open(&dir).expect("open store");
        assert_eq!(store.settings, UserSettings::default());
        assert!(store.daily_records.is_empty());
    }

    #[test]
    fn legacy_wish_lists_migrate_and_re_persist() {
        let dir = temp_data_dir();
        let legacy = r#"[{
            "id": "l1",
            "name": "Someday",
            "createdAt": "2023-01-01T00:00:00Z",
            "items": [{
                "id": "w1",
                "title": "Sail the Baltic",
                "completed": false,
                "notes": "pick a route",
                "createdAt": "2023-02-03T08:00:00Z"
            }]
        }]"#;
        fs::write(dir.join("wish-lists.json"), legacy).expect("write legacy slot");

        let store = Store::open(&dir).expect("open store");
        let item = &store.wish_lists[0].items[0];
        assert!(item.tags.is_empty());
        assert_eq!(item.records.len(), 1);
        assert_eq!(item.records[0].content, "pick a route");
        assert_eq!(item.records[0].created_at, item.created_at);

        // The migrated shape lands on disk, and a second open is a no-op.
        let stored = fs::read_to_string(dir.join("wish-lists.json")).expect("read slot");
        assert!(!stored.contains("notes"));
        let again = Store::open(&dir).expect("reopen store");
        assert_eq!(again.wish_lists, store.wish_lists);
        let stored_again = fs::read_to_string(dir.join("wish-lists.json")).expect("read slot");
        assert_eq!(stored, stored_again);
    }

    #[test]
    fn clearing_remote_config_also_drops_version_token() {
        let dir = temp_data_dir();
        let mut store = Store::open(&dir).expect("open store");
        store.set_remote_config(remote_config()).expect("set config");
        store
            .set_version_token(VersionToken::new("abc123"))
            .expect("set token");
        assert!(dir.join("github-sync.json").exists());
        assert!(dir.join("github-file-sha.json").exists());

        store.clear_remote_config().expect("clear config");
        assert!(store.remote_config().is_none());
        assert!(store.version_token().is_none());
        assert!(!dir.join("github-sync.json").exists());
        assert!(!dir.join("github-file-sha.json").exists());
    }

    #[test]
    fn version_token_round_trips_through_its_slot() {
        let dir = temp_data_dir();
        let mut store = Store::open(&dir).expect("open store");
        store.set_remote_config(remote_config()).expect("set config");
        store
            .set_version_token(VersionToken::new("deadbeef"))
            .expect("set token");

        let again = Store::open(&dir).expect("reopen store");
        assert_eq!(
            again.version_token().map(VersionToken::as_str),
            Some("deadbeef")
        );
    }

    #[test]
    fn search_records_matches_content_and_tags() {
        let dir = temp_data_dir();
        let mut store = Store::open(&dir).expect("open store");
        store.daily_records.push(DailyRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("date"),
            "Long swim in the lake",
            vec!["#health".to_string()],
        ));
        store.daily_records.push(DailyRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, 2).expect("date"),
            "Quiet day",
            vec!["#rest".to_string()],
        ));

        let by_content = store.search_records("SWIM");
        assert_eq!(by_content.len(), 1);
        assert_eq!(by_content[0].content, "Long swim in the lake");

        let by_tag = store.search_records("#rest");
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].content, "Quiet day");
    }

    #[test]
    fn all_tags_counts_across_records_and_wish_items() {
        let dir = temp_data_dir();
        let mut store = Store::open(&dir).expect("open store");
        store.daily_records.push(DailyRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("date"),
            "ran",
            vec!["#health".to_string()],
        ));
        let mut list = WishList::new("Someday");
        list.items.push(crate::models::WishItem::new(
            "Run a marathon",
            vec!["#health".to_string(), "#travel".to_string()],
        ));
        store.wish_lists.push(list);

        let tags = store.all_tags();
        assert_eq!(tags[0], ("#health".to_string(), 2));
        assert_eq!(tags[1], ("#travel".to_string(), 1));
    }
}
