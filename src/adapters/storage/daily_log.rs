use crate::adapters::storage::{RecordStore, Result, StorageError};
use crate::domain::submission::{ContactRecord, Submission};
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::Date;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

const PARTITION_PREFIX: &str = "contacts_";

/// Day-partitioned JSON log of contact submissions.
///
/// Each UTC day maps to `contacts_YYYY-MM-DD.json`, a JSON array in arrival order. Appends to
/// one partition are serialized through a per-date lock so concurrent writers never lose an
/// update; different days proceed independently.
#[derive(Debug)]
pub struct DailyLogStore {
    data_dir: PathBuf,
    locks: DashMap<Date, Arc<Mutex<()>>>,
}

impl DailyLogStore {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), locks: DashMap::new() }
    }

    #[must_use]
    pub fn partition_path(&self, date: Date) -> PathBuf {
        self.data_dir.join(format!("{PARTITION_PREFIX}{date}.json"))
    }

    /// Loads every record stored for `date`. A partition that does not exist yet is empty.
    ///
    /// # Errors
    /// Returns `StorageError::Io` if the file cannot be read and `StorageError::Decode` if it
    /// does not hold a valid record array.
    pub async fn read_partition(&self, date: Date) -> Result<Vec<ContactRecord>> {
        let path = self.partition_path(date);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Decode { path, source })
    }

    /// Verifies the data directory exists and accepts writes.
    ///
    /// # Errors
    /// Returns `StorageError::Io` if the directory cannot be created or written to.
    pub async fn probe(&self) -> Result<()> {
        let probe = self.data_dir.join(format!(".probe-{}", Uuid::new_v4()));
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| StorageError::Io { path: self.data_dir.clone(), source })?;
        fs::write(&probe, b"ok").await.map_err(|source| StorageError::Io { path: probe.clone(), source })?;
        fs::remove_file(&probe).await.map_err(|source| StorageError::Io { path: probe, source })
    }

    fn lock_for(&self, date: Date) -> Arc<Mutex<()>> {
        let entry = self.locks.entry(date).or_default();
        Arc::clone(entry.value())
    }

    /// Drops the lock for `date` unless another append holds or awaits it.
    fn release_lock(&self, date: Date) {
        self.locks.remove_if(&date, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn write_partition(&self, path: &Path, records: &[ContactRecord]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records)?;

        // Write-then-rename so readers never observe a truncated partition.
        let tmp = path.with_extension("json.tmp");
        if let Err(source) = write_synced(&tmp, &bytes).await {
            discard(&tmp).await;
            return Err(StorageError::Io { path: tmp, source });
        }

        if let Err(source) = fs::rename(&tmp, path).await {
            discard(&tmp).await;
            return Err(StorageError::Io { path: path.to_path_buf(), source });
        }

        sync_dir(&self.data_dir).await.map_err(|source| StorageError::Io { path: self.data_dir.clone(), source })
    }

    async fn append_locked(&self, submission: &Submission, date: Date, path: &Path) -> Result<usize> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| StorageError::Io { path: self.data_dir.clone(), source })?;

        let mut records = match self.read_partition(date).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Could not read existing partition, starting fresh");
                Vec::new()
            }
        };

        records.push(ContactRecord::from(submission));
        self.write_partition(path, &records).await?;
        Ok(records.len())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn discard(tmp: &Path) {
    match fs::remove_file(tmp).await {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            tracing::warn!(error = %e, path = %tmp.display(), "Could not remove temporary partition file");
        }
        _ => {}
    }
}

/// Persists the rename itself by flushing the directory entry.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl RecordStore for DailyLogStore {
    #[tracing::instrument(level = "debug", skip_all, fields(submission_id = %submission.id()))]
    async fn append(&self, submission: &Submission) -> Result<()> {
        let date = submission.partition_date();
        let path = self.partition_path(date);

        let lock = self.lock_for(date);
        let guard = lock.lock().await;
        let res = self.append_locked(submission, date, &path).await;
        drop(guard);
        drop(lock);
        self.release_lock(date);

        let count = res?;
        tracing::info!(path = %path.display(), records = count, "Contact saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::submission::STATUS_RECEIVED;
    use time::macros::datetime;

    fn submission(name: &str) -> Submission {
        Submission::accept_at(
            name.to_string(),
            "ada@example.com".to_string(),
            "Checking in about your rates.".to_string(),
            datetime!(2024-06-01 12:00 UTC),
        )
    }

    #[tokio::test]
    async fn test_append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::new(dir.path().join("data"));
        let sub = submission("Ada L");

        store.append(&sub).await.unwrap();

        let records = store.read_partition(sub.partition_date()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], ContactRecord::from(&sub));
        assert_eq!(records[0].status, STATUS_RECEIVED);
        assert!(dir.path().join("data/contacts_2024-06-01.json").exists());
    }

    #[tokio::test]
    async fn test_append_preserves_prior_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::new(dir.path());

        let first = submission("First");
        let second = submission("Second");
        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();

        let records = store.read_partition(first.partition_date()).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_partitions_split_by_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::new(dir.path());

        let today = submission("Today");
        let tomorrow = Submission::accept_at(
            "Tomorrow".into(),
            "ada@example.com".into(),
            "Checking in about your rates.".into(),
            datetime!(2024-06-02 00:00:01 UTC),
        );
        store.append(&today).await.unwrap();
        store.append(&tomorrow).await.unwrap();

        let day_one = store.read_partition(today.partition_date()).await.unwrap();
        let day_two = store.read_partition(tomorrow.partition_date()).await.unwrap();
        assert_eq!(day_one.len(), 1);
        assert_eq!(day_one[0].name, "Today");
        assert_eq!(day_two.len(), 1);
        assert_eq!(day_two[0].name, "Tomorrow");
    }

    #[tokio::test]
    async fn test_corrupt_partition_is_replaced() {
        crate::telemetry::init_test_telemetry();
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::new(dir.path());
        let sub = submission("Ada L");

        let path = store.partition_path(sub.partition_date());
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(store.read_partition(sub.partition_date()).await, Err(StorageError::Decode { .. })));

        store.append(&sub).await.unwrap();

        let records = store.read_partition(sub.partition_date()).await.unwrap();
        assert_eq!(records, vec![ContactRecord::from(&sub)]);
    }

    #[tokio::test]
    async fn test_unwritable_directory_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let store = DailyLogStore::new(&blocker);
        let res = store.append(&submission("Ada L")).await;

        assert!(matches!(res, Err(StorageError::Io { .. })));
        assert!(store.probe().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DailyLogStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..25 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append(&submission(&format!("Sender {i}"))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = store.read_partition(submission("x").partition_date()).await.unwrap();
        assert_eq!(records.len(), 25, "every concurrent append must survive");
    }

    #[tokio::test]
    async fn test_locks_are_released_after_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DailyLogStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.append(&submission(&format!("Sender {i}"))).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(store.locks.is_empty(), "per-day locks should not accumulate");
        assert_eq!(store.read_partition(submission("x").partition_date()).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        crate::telemetry::init_test_telemetry();
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::new(dir.path());
        let sub = submission("Ada L");

        // A directory squatting on the partition name makes the final rename fail.
        let path = store.partition_path(sub.partition_date());
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"").unwrap();

        let res = store.append(&sub).await;

        assert!(matches!(res, Err(StorageError::Io { .. })));
        assert!(!path.with_extension("json.tmp").exists());
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_readiness_checks_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DailyLogStore::new(dir.path().join("data")));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.probe().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let leftovers = std::fs::read_dir(dir.path().join("data")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
