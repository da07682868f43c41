use crate::models::{DailyRecord, UserSettings, WishList};
use crate::store::{Slot, Store, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The complete exportable state, in the wire shape used for file backups
/// and for the synced remote file. Absent fields are omitted on export and
/// leave their local slot untouched on import.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wish_lists: Option<Vec<WishList>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_records: Option<Vec<DailyRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ParseError(String);

impl ParseError {
    pub fn message(&self) -> String {
        format!("invalid snapshot JSON: {}", self.0)
    }
}

/// Which top-level slots an import replaced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub settings: bool,
    pub wish_lists: bool,
    pub daily_records: bool,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        let mut replaced = Vec::new();
        if self.settings {
            replaced.push("settings");
        }
        if self.wish_lists {
            replaced.push("wish lists");
        }
        if self.daily_records {
            replaced.push("daily records");
        }
        if replaced.is_empty() {
            "Nothing to import: the snapshot carried no known sections.".to_string()
        } else {
            format!("Replaced: {}.", replaced.join(", "))
        }
    }
}

pub fn export(store: &Store) -> Result<String, StoreError> {
    let snapshot = Snapshot {
        settings: Some(store.settings.clone()),
        wish_lists: Some(store.wish_lists.clone()),
        daily_records: Some(store.daily_records.clone()),
        export_date: Some(Utc::now()),
    };
    serde_json::to_string_pretty(&snapshot).map_err(|e| StoreError::Serialize(e.to_string()))
}

/// Parses snapshot text without touching any state. Unknown fields are
/// ignored; missing fields stay `None`.
pub fn parse(text: &str) -> Result<Snapshot, ParseError> {
    serde_json::from_str(text).map_err(|e| ParseError(e.to_string()))
}

/// Applies a parsed snapshot to the store: each present section overwrites
/// its slot, each absent section leaves the slot unmodified.
pub fn apply(store: &mut Store, snapshot: Snapshot) -> Result<ImportReport, StoreError> {
    let mut report = ImportReport::default();
    if let Some(settings) = snapshot.settings {
        store.settings = settings;
        store.persist(Slot::Settings)?;
        report.settings = true;
    }
    if let Some(wish_lists) = snapshot.wish_lists {
        store.wish_lists = wish_lists;
        store.persist(Slot::WishLists)?;
        report.wish_lists = true;
    }
    if let Some(daily_records) = snapshot.daily_records {
        store.daily_records = daily_records;
        store.persist(Slot::DailyRecords)?;
        report.daily_records = true;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WishItem, normalize_tags};
    use chrono::NaiveDate;
    use std::fs;
    use std::path::PathBuf;

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

    fn populated_store() -> Store {
        let mut store = Store::open(temp_data_dir()).expect("open store");
        store.settings = UserSettings {
            birthday: NaiveDate::from_ymd_opt(1990, 5, 4),
            life_expectancy: Some(85),
        };
        let mut list = WishList::new("Someday");
        let mut item = WishItem::new("See the aurora", normalize_tags("#travel"));
        item.records.push(crate::models::WishRecord::new("booked flights"));
        list.items.push(item);
        store.wish_lists.push(list);
        store.daily_records.push(DailyRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("date"),
            "你好 #tag, multi-byte content survives",
            normalize_tags("#tag"),
        ));
        store
    }

    #[test]
    fn import_of_export_round_trips_all_slots() {
        let mut store = populated_store();
        let exported = export(&store).expect("export");

        let before_settings = store.settings.clone();
        let before_lists = store.wish_lists.clone();
        let before_records = store.daily_records.clone();

        let snapshot = parse(&exported).expect("parse exported snapshot");
        let report = apply(&mut store, snapshot).expect("apply snapshot");

        assert!(report.settings && report.wish_lists && report.daily_records);
        assert_eq!(store.settings, before_settings);
        assert_eq!(store.wish_lists, before_lists);
        assert_eq!(store.daily_records, before_records);
    }

    #[test]
    fn round_trip_holds_for_empty_state() {
        let mut store = Store::open(temp_data_dir()).expect("open store");
        let exported = export(&store).expect("export");
        let snapshot = parse(&exported).expect("parse");
        apply(&mut store, snapshot).expect("apply");
        assert!(store.wish_lists.is_empty());
        assert!(store.daily_records.is_empty());
    }

    #[test]
    fn export_omits_nothing_and_emits_no_nulls() {
        let store = populated_store();
        let exported = export(&store).expect("export");
        let value: serde_json::Value = serde_json::from_str(&exported).expect("parse export");
        assert!(value.get("settings").is_some());
        assert!(value.get("wishLists").is_some());
        assert!(value.get("dailyRecords").is_some());
        assert!(value.get("exportDate").is_some());
        assert!(!exported.contains("null"));
    }

    #[test]
    fn partial_import_leaves_missing_slots_untouched() {
        let mut store = populated_store();
        let before_settings = store.settings.clone();
        let before_lists = store.wish_lists.clone();

        let text = r#"{ "dailyRecords": [] }"#;
        let report = apply(&mut store, parse(text).expect("parse")).expect("apply");

        assert!(report.daily_records);
        assert!(!report.settings);
        assert!(!report.wish_lists);
        assert!(store.daily_records.is_empty());
        assert_eq!(store.settings, before_settings);
        assert_eq!(store.wish_lists, before_lists);
    }

    #[test]
    fn malformed_import_fails_without_mutating_state() {
        let store = populated_store();
        let before_records = store.daily_records.clone();

        let result = parse("{not json");
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.message().contains("invalid snapshot JSON"));
        }
        // parse() never saw the store; state is untouched by construction.
        assert_eq!(store.daily_records, before_records);
    }

    #[test]
    fn import_ignores_unknown_top_level_fields() {
        let mut store = populated_store();
        let text = r#"{ "settings": { "lifeExpectancy": 90 }, "schemaVersion": 7 }"#;
        let report = apply(&mut store, parse(text).expect("parse")).expect("apply");
        assert!(report.settings);
        assert_eq!(store.settings.life_expectancy, Some(90));
        assert!(store.settings.birthday.is_none());
    }
}
