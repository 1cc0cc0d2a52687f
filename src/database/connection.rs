/*!
 * Database connection management.
 *
 * Opens the SQLite catalog, applies the schema and hands the connection to
 * blocking tasks so repository calls never stall the async runtime.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::schema;

const DEFAULT_DB_FILENAME: &str = "polyglot-mt.db";

/// Directory under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "polyglot-mt";

/// How long a statement waits for a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared SQLite connection; clones point at the same connection
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the catalog at the default location
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the catalog at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening catalog database at {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Self::prepare(conn, db_path)
    }

    /// Open a private in-memory catalog
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory catalog database");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        Self::prepare(conn, PathBuf::from(":memory:"))
    }

    fn prepare(conn: Connection, db_path: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/polyglot-mt/polyglot-mt.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` with the connection on the current thread
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&self.connection.lock())
    }

    /// Run `f` with the connection on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        Self::blocking(move || f(&connection.lock())).await
    }

    /// Run `f` inside a transaction, committed only when `f` succeeds
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        Self::in_transaction(&mut self.connection.lock(), f)
    }

    /// `transaction` on the blocking pool
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        Self::blocking(move || Self::in_transaction(&mut connection.lock(), f)).await
    }

    fn in_transaction<F, T>(conn: &mut Connection, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    async fn blocking<F, T>(f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .context("Database task panicked")?
    }

    /// Count rows of the catalog tables
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.execute(|conn| {
            let count = |table: &str| -> Result<i64> {
                Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
            };

            Ok(DatabaseStats {
                project_count: count("projects")?,
                language_count: count("languages")?,
                key_count: count("keys")?,
                translation_count: count("translations")?,
            })
        })
    }
}

/// Row counts of the catalog tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub project_count: i64,
    pub language_count: i64,
    pub key_count: i64,
    pub translation_count: i64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Projects: {}, Languages: {}, Keys: {}, Translations: {}",
            self.project_count, self.language_count, self.key_count, self.translation_count
        )
    }
}
