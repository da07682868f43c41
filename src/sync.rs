use crate::github::{RemoteClient, RemoteError, RemoteSyncConfig};
use crate::snapshot::{self, ImportReport};
use crate::store::{Store, StoreError};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub enum SyncError {
    NotConfigured,
    InProgress,
    Auth(String),
    Permission(String),
    NotFoundRemote(String),
    Conflict(String),
    Network(String),
    MalformedPayload(String),
    Storage(String),
    Api(String),
}

impl SyncError {
    pub fn message(&self) -> String {
        match self {
            SyncError::NotConfigured => {
                "GitHub sync is not configured. Run `lifelog remote set` first.".to_string()
            }
            SyncError::InProgress => "a sync operation is already running".to_string(),
            SyncError::Auth(msg) => format!("authentication failed: {msg}"),
            SyncError::Permission(msg) => format!("permission denied: {msg}"),
            SyncError::NotFoundRemote(msg) => format!("remote data not found: {msg}"),
            SyncError::Conflict(msg) => format!(
                "remote file changed since the last sync ({msg}); pull first, then push again"
            ),
            SyncError::Network(msg) => format!("network error: {msg}"),
            SyncError::MalformedPayload(msg) => format!("remote data is not a valid snapshot: {msg}"),
            SyncError::Storage(msg) => format!("local storage error: {msg}"),
            SyncError::Api(msg) => msg.clone(),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Auth(msg) => SyncError::Auth(msg),
            RemoteError::Permission(msg) => SyncError::Permission(msg),
            RemoteError::NotFound(msg) => SyncError::NotFoundRemote(msg),
            RemoteError::Conflict(msg) => SyncError::Conflict(msg),
            RemoteError::Network(msg) => SyncError::Network(msg),
            RemoteError::Encoding(msg) => SyncError::MalformedPayload(msg),
            RemoteError::Api(msg) => SyncError::Api(msg),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Storage(err.message())
    }
}

/// Runs push/pull against the configured remote file. At most one operation
/// is in flight at a time; a second caller gets `InProgress` instead of
/// being queued.
pub struct Syncer {
    client: RemoteClient,
    syncing: AtomicBool,
}

/// Resets the syncing flag when an operation ends, on every exit path.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Syncer {
    pub fn new(client: RemoteClient) -> Self {
        Self {
            client,
            syncing: AtomicBool::new(false),
        }
    }

    fn begin(&self) -> Result<SyncGuard<'_>, SyncError> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::InProgress);
        }
        Ok(SyncGuard { flag: &self.syncing })
    }

    /// Serializes the full local snapshot and writes it to the remote file,
    /// guarded by the last observed version token. On success the file is
    /// re-read to capture the fresh token, which is persisted for the next
    /// push.
    pub fn push_to_remote(&self, store: &mut Store) -> Result<(), SyncError> {
        let _guard = self.begin()?;
        let Some(config) = store.remote_config().cloned() else {
            return Err(SyncError::NotConfigured);
        };

        let payload = snapshot::export(store)?;
        let previous = store.version_token().cloned();
        let message = format!("Update life tracker data - {}", Utc::now().to_rfc3339());
        self.client
            .write_file(&config, &payload, previous.as_ref(), &message)?;

        // The write response is not trusted to carry the new revision id;
        // re-reading the file is the one reliable way to learn it.
        if let Some(file) = self.client.fetch_file(&config)? {
            store.set_version_token(file.version)?;
        }
        Ok(())
    }

    /// Fetches the remote snapshot and replaces the local slots it names.
    /// Local state is untouched when the payload fails to parse.
    pub fn pull_from_remote(&self, store: &mut Store) -> Result<ImportReport, SyncError> {
        let _guard = self.begin()?;
        let Some(config) = store.remote_config().cloned() else {
            return Err(SyncError::NotConfigured);
        };

        let Some(file) = self.client.fetch_file(&config)? else {
            return Err(SyncError::NotFoundRemote(format!(
                "no snapshot file at {}",
                config.location()
            )));
        };

        let parsed =
            snapshot::parse(&file.content).map_err(|e| SyncError::MalformedPayload(e.message()))?;
        store.set_version_token(file.version)?;
        let report = snapshot::apply(store, parsed)?;
        Ok(report)
    }

    /// Read-only credential check against the configured repository.
    pub fn validate_remote(&self, config: &RemoteSyncConfig) -> Result<(), SyncError> {
        let _guard = self.begin()?;
        self.client.validate(config)?;
        Ok(())
    }
}
