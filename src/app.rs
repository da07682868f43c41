use crate::config::Config;
use crate::github::{RemoteClient, RemoteSyncConfig};
use crate::models::{DailyRecord, UserSettings, WishItem, WishList, WishRecord};
use crate::snapshot::ImportReport;
use crate::store::{Slot, Store, StoreError};
use crate::sync::{SyncError, Syncer};
use chrono::{NaiveDate, Utc};

/// What happened to the automatic remote push after a local mutation. The
/// local save has already succeeded by the time this value exists; a failed
/// push is reported, never retried, and never rolls anything back.
#[derive(Debug)]
pub enum AutoSync {
    RemoteNotConfigured,
    Pushed,
    Failed(SyncError),
}

#[derive(Debug)]
pub enum AppError {
    Storage(StoreError),
    Http(String),
    NotFound(String),
    Invalid(String),
}

impl AppError {
    pub fn message(&self) -> String {
        match self {
            AppError::Storage(err) => err.message(),
            AppError::Http(msg) => format!("could not build HTTP client: {msg}"),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Invalid(msg) => msg.clone(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Storage(err)
    }
}

/// Owns the loaded state and the sync machinery for one process. All
/// mutations go through here so local persistence and auto-sync stay in
/// lockstep.
pub struct App {
    pub store: Store,
    syncer: Syncer,
}

impl App {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let store = Store::open(&config.data.data_path)?;
        let client = RemoteClient::new(config.sync.timeout_seconds)
            .map_err(|e| AppError::Http(e.message()))?;
        Ok(Self {
            store,
            syncer: Syncer::new(client),
        })
    }

    #[cfg(test)]
    fn with_parts(store: Store, syncer: Syncer) -> Self {
        Self { store, syncer }
    }

    fn auto_push(&mut self) -> AutoSync {
        if self.store.remote_config().is_none() {
            return AutoSync::RemoteNotConfigured;
        }
        match self.syncer.push_to_remote(&mut self.store) {
            Ok(()) => AutoSync::Pushed,
            Err(err) => AutoSync::Failed(err),
        }
    }

    pub fn push(&mut self) -> Result<(), SyncError> {
        self.syncer.push_to_remote(&mut self.store)
    }

    pub fn pull(&mut self) -> Result<ImportReport, SyncError> {
        self.syncer.pull_from_remote(&mut self.store)
    }

    pub fn validate_remote(&self, config: &RemoteSyncConfig) -> Result<(), SyncError> {
        self.syncer.validate_remote(config)
    }

    pub fn set_remote_config(&mut self, config: RemoteSyncConfig) -> Result<(), AppError> {
        self.store.set_remote_config(config)?;
        Ok(())
    }

    pub fn clear_remote_config(&mut self) -> Result<(), AppError> {
        self.store.clear_remote_config()?;
        Ok(())
    }

    pub fn save_settings(&mut self, settings: UserSettings) -> Result<AutoSync, AppError> {
        self.store.settings = settings;
        self.store.persist(Slot::Settings)?;
        Ok(self.auto_push())
    }

    /// Writes the journal entry for a date. At most one record exists per
    /// date; writing again replaces content and tags but keeps the record's
    /// identity and creation time.
    pub fn upsert_daily_record(
        &mut self,
        date: NaiveDate,
        content: &str,
        tags: Vec<String>,
    ) -> Result<AutoSync, AppError> {
        if let Some(existing) = self.store.daily_records.iter_mut().find(|r| r.date == date) {
            existing.content = content.trim().to_string();
            existing.tags = tags;
        } else {
            self.store
                .daily_records
                .push(DailyRecord::new(date, content, tags));
        }
        self.store.persist(Slot::DailyRecords)?;
        Ok(self.auto_push())
    }

    pub fn delete_daily_record(&mut self, date: NaiveDate) -> Result<AutoSync, AppError> {
        let before = self.store.daily_records.len();
        self.store.daily_records.retain(|r| r.date != date);
        if self.store.daily_records.len() == before {
            return Err(AppError::NotFound(format!("no record for {date}")));
        }
        self.store.persist(Slot::DailyRecords)?;
        Ok(self.auto_push())
    }

    pub fn create_wish_list(&mut self, name: &str) -> Result<AutoSync, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Invalid("list name must not be empty".to_string()));
        }
        if self.store.wish_lists.iter().any(|l| l.name == name) {
            return Err(AppError::Invalid(format!("a list named \"{name}\" already exists")));
        }
        self.store.wish_lists.push(WishList::new(name));
        self.store.persist(Slot::WishLists)?;
        Ok(self.auto_push())
    }

    pub fn rename_wish_list(&mut self, name: &str, new_name: &str) -> Result<AutoSync, AppError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AppError::Invalid("list name must not be empty".to_string()));
        }
        let index = self.list_index(name)?;
        self.store.wish_lists[index].name = new_name.to_string();
        self.store.persist(Slot::WishLists)?;
        Ok(self.auto_push())
    }

    pub fn delete_wish_list(&mut self, name: &str) -> Result<AutoSync, AppError> {
        let index = self.list_index(name)?;
        self.store.wish_lists.remove(index);
        self.store.persist(Slot::WishLists)?;
        Ok(self.auto_push())
    }

    pub fn add_wish_item(
        &mut self,
        list: &str,
        title: &str,
        tags: Vec<String>,
    ) -> Result<AutoSync, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Invalid("item title must not be empty".to_string()));
        }
        let index = self.list_index(list)?;
        self.store.wish_lists[index]
            .items
            .push(WishItem::new(title, tags));
        self.store.persist(Slot::WishLists)?;
        Ok(self.auto_push())
    }

    /// Flips an item between open and done. `completed_at` is present
    /// exactly while the item is completed.
    pub fn toggle_wish_item(&mut self, list: &str, item: usize) -> Result<AutoSync, AppError> {
        let list_index = self.list_index(list)?;
        let item = self.item_mut(list_index, item)?;
        item.completed = !item.completed;
        item.completed_at = if item.completed { Some(Utc::now()) } else { None };
        self.store.persist(Slot::WishLists)?;
        Ok(self.auto_push())
    }

    pub fn delete_wish_item(&mut self, list: &str, item: usize) -> Result<AutoSync, AppError> {
        let list_index = self.list_index(list)?;
        let items = &mut self.store.wish_lists[list_index].items;
        if item == 0 || item > items.len() {
            return Err(AppError::NotFound(item_not_found(list, item)));
        }
        items.remove(item - 1);
        self.store.persist(Slot::WishLists)?;
        Ok(self.auto_push())
    }

    pub fn add_wish_record(
        &mut self,
        list: &str,
        item: usize,
        content: &str,
    ) -> Result<AutoSync, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Invalid("note text must not be empty".to_string()));
        }
        let list_index = self.list_index(list)?;
        let item = self.item_mut(list_index, item)?;
        item.records.push(WishRecord::new(content));
        self.store.persist(Slot::WishLists)?;
        Ok(self.auto_push())
    }

    fn list_index(&self, name: &str) -> Result<usize, AppError> {
        self.store
            .wish_lists
            .iter()
            .position(|l| l.name == name.trim())
            .ok_or_else(|| AppError::NotFound(format!("no wish list named \"{}\"", name.trim())))
    }

    /// Items are addressed by 1-based position within their list, matching
    /// the numbering the CLI prints.
    fn item_mut(&mut self, list_index: usize, item: usize) -> Result<&mut WishItem, AppError> {
        let list = &mut self.store.wish_lists[list_index];
        if item == 0 || item > list.items.len() {
            let name = list.name.clone();
            return Err(AppError::NotFound(item_not_found(&name, item)));
        }
        Ok(&mut list.items[item - 1])
    }
}

fn item_not_found(list: &str, item: usize) -> String {
    format!("list \"{list}\" has no item #{item}")
}
