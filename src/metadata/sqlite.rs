//! SQLite-backed metadata store.
//!
//! Uses `rusqlite` with the `bundled` feature so no system SQLite
//! library is required.  Every async trait method moves its rusqlite call
//! onto the blocking pool, so callers can put a deadline on it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};

use super::store::{MetadataStore, NewUploadRecord, UploadRecord};

/// Metadata store backed by a single SQLite database file.
pub struct SqliteMetadataStore {
    /// The database connection, shared with blocking tasks.
    conn: Arc<Mutex<Connection>>,
}

fn lock_conn(conn: &Mutex<Connection>) -> anyhow::Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| anyhow::anyhow!("metadata connection mutex poisoned"))
}

impl SqliteMetadataStore {
    /// Open (or create) the database at `path` and initialize the schema.
    ///
    /// Passing `":memory:"` creates an in-memory database (useful for tests).
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.apply_pragmas()?;
        store.init_db()?;
        Ok(store)
    }

    /// Apply recommended SQLite pragmas for durability and concurrency.
    fn apply_pragmas(&self) -> anyhow::Result<()> {
        let conn = lock_conn(&self.conn)?;
        // journal_mode reports the resulting mode as a row.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(
            "
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Ok(())
    }

    /// Create the `images` table if it does not already exist.
    /// This is idempotent -- safe to call on every startup (crash-only design).
    fn init_db(&self) -> anyhow::Result<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS images (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                filename  TEXT NOT NULL,
                s3url     TEXT NOT NULL,
                date      TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock_conn(&conn)?;
            f(&guard)
        })
        .await?
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn insert(
        &self,
        record: NewUploadRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<i64>> + Send + '_>> {
        Box::pin(self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO images (filename, s3url, date) VALUES (?1, ?2, ?3)",
                params![record.filename, record.locator, record.created_at],
            )?;
            Ok(conn.last_insert_rowid())
        }))
    }

    fn list_all(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<UploadRecord>>> + Send + '_>> {
        Box::pin(self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, filename, s3url, date FROM images ORDER BY id DESC")?;
            let records = stmt
                .query_map([], |row| {
                    Ok(UploadRecord {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        locator: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        }))
    }

    fn count(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<u64>> + Send + '_>> {
        Box::pin(self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
            Ok(count as u64)
        }))
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteMetadataStore {
        SqliteMetadataStore::new(":memory:").expect("failed to create in-memory store")
    }

    fn make_record(filename: &str, created_at: &str) -> NewUploadRecord {
        NewUploadRecord {
            filename: filename.to_string(),
            locator: format!("https://gallery.s3.us-east-1.amazonaws.com/{filename}"),
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_schema_idempotent() {
        let store = test_store();
        store.init_db().expect("second init_db failed");
        store.init_db().expect("third init_db failed");
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images.db");
        let path = path.to_str().unwrap();

        let store = SqliteMetadataStore::new(path).unwrap();
        store
            .insert(make_record("a.png", "2026-10-18T10:00:00.000Z"))
            .await
            .unwrap();
        drop(store);

        let reopened = SqliteMetadataStore::new(path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = test_store();
        let first = store
            .insert(make_record("a.png", "2026-10-18T10:00:00.000Z"))
            .await
            .unwrap();
        let second = store
            .insert(make_record("b.png", "2026-10-18T10:00:01.000Z"))
            .await
            .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_list_all_empty() {
        let store = test_store();
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_all_newest_first_even_with_equal_dates() {
        let store = test_store();
        let same = "2026-10-18T10:00:00.000Z";
        for name in ["one.png", "two.png", "three.png"] {
            store.insert(make_record(name, same)).await.unwrap();
        }
        let names: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, vec!["three.png", "two.png", "one.png"]);
    }

    #[tokio::test]
    async fn test_list_order_ignores_skewed_dates() {
        let store = test_store();
        store
            .insert(make_record("later-clock.png", "2030-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        store
            .insert(make_record("earlier-clock.png", "2020-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        let records = store.list_all().await.unwrap();
        assert_eq!(records[0].filename, "earlier-clock.png");
    }

    #[tokio::test]
    async fn test_duplicate_filenames_are_allowed() {
        let store = test_store();
        store
            .insert(make_record("dup.png", "2026-10-18T10:00:00.000Z"))
            .await
            .unwrap();
        store
            .insert(make_record("dup.png", "2026-10-18T10:00:00.000Z"))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_round_trips_fields() {
        let store = test_store();
        let id = store
            .insert(make_record("cat.png", "2026-10-18T10:00:00.123Z"))
            .await
            .unwrap();
        let records = store.list_all().await.unwrap();
        assert_eq!(
            records,
            vec![UploadRecord {
                id,
                filename: "cat.png".to_string(),
                locator: "https://gallery.s3.us-east-1.amazonaws.com/cat.png".to_string(),
                created_at: "2026-10-18T10:00:00.123Z".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_ping() {
        test_store().ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_deadline_fires_while_connection_is_busy() {
        let store = test_store();
        let guard = store.conn.lock().unwrap();

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), store.list_all()).await;
        assert!(result.is_err(), "list_all should not block the caller");

        drop(guard);
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
