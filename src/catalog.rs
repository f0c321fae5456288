//! Library catalog access.
//!
//! The migration engine only reads entries through the [`Catalog`] trait.
//! [`LibraryDatabase`] is the bundled `SQLite` implementation,
//! which also stores the liberated status written back after a migration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::migration::LibraryEntry;

/// Source of library entries for a migration batch.
pub trait Catalog {
    /// Entries that have a sidecar artifact which has previously been verified to exist,
    /// in a stable catalog order.
    ///
    /// # Errors
    /// Returns an error if the underlying storage cannot be queried.
    fn list_entries_with_verified_artifact(&self) -> Result<Vec<LibraryEntry>>;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn list_entries_with_verified_artifact(&self) -> Result<Vec<LibraryEntry>> {
        (**self).list_entries_with_verified_artifact()
    }
}

/// In-memory catalog, keeps the given order.
impl Catalog for Vec<LibraryEntry> {
    fn list_entries_with_verified_artifact(&self) -> Result<Vec<LibraryEntry>> {
        Ok(self
            .iter()
            .filter(|entry| entry.is_migration_candidate())
            .cloned()
            .collect())
    }
}

/// `SQLite` database wrapper for library entries.
pub struct LibraryDatabase {
    connection: Connection,
    path: Option<PathBuf>,
}

impl LibraryDatabase {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }

        let connection =
            Connection::open(path).with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Set busy timeout for concurrent access (5 seconds)
        connection
            .busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;

        let database = Self {
            connection,
            path: Some(path.to_path_buf()),
        };
        database.initialize()?;

        Ok(database)
    }

    /// Open an empty in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().context("Failed to open in-memory database")?;

        let database = Self { connection, path: None };
        database.initialize()?;

        Ok(database)
    }

    /// Database file path, `None` for an in-memory database.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert an entry, or update all fields of an existing entry with the same product id.
    ///
    /// New entries are appended to the end of the catalog order.
    pub fn upsert_entry(&self, entry: &LibraryEntry) -> Result<()> {
        let primary_artifact = entry.primary_artifact.as_deref().map(crate::path_to_string);

        self.connection
            .execute(
                r"
                INSERT INTO library_entries
                    (product_id, title, folder, file_stem, primary_artifact, has_artifact, artifact_liberated, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, (SELECT COALESCE(MAX(position), 0) + 1 FROM library_entries))
                ON CONFLICT(product_id) DO UPDATE SET
                    title = ?2,
                    folder = ?3,
                    file_stem = ?4,
                    primary_artifact = ?5,
                    has_artifact = ?6,
                    artifact_liberated = ?7
                ",
                params![
                    entry.product_id,
                    entry.title,
                    crate::path_to_string(&entry.folder),
                    entry.file_stem,
                    primary_artifact,
                    entry.has_artifact,
                    entry.artifact_verified,
                ],
            )
            .with_context(|| format!("Failed to upsert library entry {}", entry.product_id))?;

        Ok(())
    }

    /// Get a single entry by product id.
    pub fn get_entry(&self, product_id: &str) -> Result<Option<LibraryEntry>> {
        self.connection
            .query_row(
                r"
                SELECT product_id, title, folder, file_stem, primary_artifact, has_artifact, artifact_liberated
                FROM library_entries WHERE product_id = ?1
                ",
                params![product_id],
                Self::entry_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to get library entry {product_id}"))
    }

    /// Update the liberated status of the sidecar artifact.
    /// Returns false if there is no entry with the given product id.
    pub fn set_artifact_liberated(&self, product_id: &str, liberated: bool) -> Result<bool> {
        let rows_affected = self
            .connection
            .execute(
                "UPDATE library_entries SET artifact_liberated = ?2 WHERE product_id = ?1",
                params![product_id, liberated],
            )
            .with_context(|| format!("Failed to update liberated status for {product_id}"))?;

        Ok(rows_affected > 0)
    }

    /// Mark the artifacts of the given entries as liberated in one transaction.
    ///
    /// Entries are only selected for migration while already liberated,
    /// so this confirms the flag after relocation and restores it if it was cleared during the batch.
    /// Returns the number of entries that were found.
    pub fn mark_artifacts_liberated<'a>(&self, product_ids: impl IntoIterator<Item = &'a str>) -> Result<usize> {
        let transaction = self
            .connection
            .unchecked_transaction()
            .context("Failed to start transaction")?;

        let mut updated = 0;
        for product_id in product_ids {
            if self.set_artifact_liberated(product_id, true)? {
                updated += 1;
            }
        }

        transaction.commit().context("Failed to commit liberated status")?;
        Ok(updated)
    }

    /// Get the count of entries in the database.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM library_entries", [], |row| row.get(0))
            .context("Failed to count entries")?;

        #[allow(clippy::cast_sign_loss)]
        Ok(count as u64)
    }

    fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LibraryEntry> {
        let folder: String = row.get(2)?;
        let primary_artifact: Option<String> = row.get(4)?;
        Ok(LibraryEntry {
            product_id: row.get(0)?,
            title: row.get(1)?,
            folder: PathBuf::from(folder),
            file_stem: row.get(3)?,
            primary_artifact: primary_artifact.filter(|path| !path.is_empty()).map(PathBuf::from),
            has_artifact: row.get(5)?,
            artifact_verified: row.get(6)?,
        })
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<()> {
        self.connection
            .execute_batch(
                r"
                CREATE TABLE IF NOT EXISTS library_entries (
                    product_id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    folder TEXT NOT NULL,
                    file_stem TEXT NOT NULL,
                    primary_artifact TEXT,
                    has_artifact INTEGER NOT NULL DEFAULT 0,
                    artifact_liberated INTEGER NOT NULL DEFAULT 0,
                    position INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_library_entries_position ON library_entries(position);

                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA cache_size = -2000;
                ",
            )
            .context("Failed to initialize database schema")?;

        Ok(())
    }
}

impl Catalog for LibraryDatabase {
    fn list_entries_with_verified_artifact(&self) -> Result<Vec<LibraryEntry>> {
        let mut stmt = self
            .connection
            .prepare(
                r"
                SELECT product_id, title, folder, file_stem, primary_artifact, has_artifact, artifact_liberated
                FROM library_entries
                WHERE has_artifact = 1 AND artifact_liberated = 1
                ORDER BY position, title
                ",
            )
            .context("Failed to prepare query")?;

        let entries = stmt
            .query_map([], Self::entry_from_row)
            .context("Failed to execute query")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect results")?;

        Ok(entries)
    }
}
