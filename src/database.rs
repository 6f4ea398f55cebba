//! Database initialization, table definitions and link store operations
//!
//! This module handles the setup of the embedded redb database and every
//! read or write of link records. Each operation runs in its own short
//! transaction which is committed (or dropped) before the function returns.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;

use crate::config::Config;
use crate::model::LinkRecord;

/// Main table for storing link records
///
/// Key: Link identifier as string
/// Value: JSON-serialized LinkRecord as string
///
/// Example:
/// - Key: "Xk3pQ9aLm2Rt7ZbC"
/// - Value: '{"id":"Xk3pQ9aLm2Rt7ZbC","url":"https://example.com/file.zip",...}'
pub const TABLE_LINKS: TableDefinition<&str, &str> = TableDefinition::new("nimbaha");

/// Unique index from source URL to link identifier
///
/// Key: Source URL as submitted
/// Value: Link identifier
pub const TABLE_URL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("nimbaha_url_index");

/// Errors raised by the link store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage engine failed (I/O, transaction, table access)
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A stored value could not be (de)serialized
    #[error("corrupt link record: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// `insert` was given a URL that another record already serves
    #[error("{url} is already stored as {id}")]
    DuplicateUrl { url: String, id: String },
}

macro_rules! storage_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(err: $source) -> Self {
                    StoreError::Storage(err.into())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Application state shared across all request handlers
///
/// Built once at startup and cloned into every handler by axum.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,

    /// Shared outbound client (connection pool, redirects, timeouts)
    pub http: reqwest::Client,

    /// Runtime configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the state around an initialized database
    ///
    /// The outbound client follows redirects (reqwest's default policy) and
    /// applies the configured connect and read timeouts.
    pub fn new(db: Database, config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            db: Arc::new(db),
            http,
            config: Arc::new(config),
        })
    }
}

/// Initializes the embedded database and creates required tables
///
/// This function:
/// 1. Creates or opens the database file at the specified path
/// 2. Opens both the links table and the URL index table
/// 3. Commits the transaction to ensure tables are persisted
///
/// Opening a table inside a write transaction creates it when absent, so
/// calling this on an existing database file is harmless.
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Returns
///
/// * `Ok(Database)` - Successfully initialized database instance
/// * `Err(redb::Error)` - Database initialization error
///
/// # Example
///
/// ```no_run
/// # use nimbaha::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    // Create or open the database file
    let db = Database::create(db_path)?;

    // Begin a write transaction to create tables
    let write_txn = db.begin_write()?;
    {
        // Open (or create if not exists) the links table
        write_txn.open_table(TABLE_LINKS)?;

        // Open (or create if not exists) the URL index table
        write_txn.open_table(TABLE_URL_INDEX)?;
    }

    // Commit the transaction to persist the table structures
    write_txn.commit()?;

    Ok(db)
}

/// Looks up a record by its identifier
///
/// # Returns
///
/// * `Ok(Some(record))` - The identifier is known
/// * `Ok(None)` - No record carries this identifier
/// * `Err(StoreError)` - Storage failure or corrupt stored value
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<LinkRecord>, StoreError> {
    // Begin a read-only transaction
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_LINKS)?;

    // Deserialize the JSON record if the identifier exists
    let record = match table.get(id)? {
        Some(value) => Some(serde_json::from_str(value.value())?),
        None => None,
    };
    Ok(record)
}

/// Looks up a record by its source URL
///
/// Resolves the URL through the index table, then loads the record from the
/// links table inside the same read transaction.
pub fn find_by_url(db: &Database, url: &str) -> Result<Option<LinkRecord>, StoreError> {
    let read_txn = db.begin_read()?;
    let index = read_txn.open_table(TABLE_URL_INDEX)?;

    let id = match index.get(url)? {
        Some(id) => id.value().to_string(),
        None => return Ok(None),
    };

    let table = read_txn.open_table(TABLE_LINKS)?;
    let record = match table.get(id.as_str())? {
        Some(value) => Some(serde_json::from_str(value.value())?),
        None => None,
    };
    Ok(record)
}

/// Inserts a record whose URL is not stored yet
///
/// # Arguments
///
/// * `db` - Database handle
/// * `record` - Complete record to store under `record.id`
///
/// # Returns
///
/// * `Ok(())` - The record was written to both tables
/// * `Err(StoreError::DuplicateUrl)` - Another live record already serves
///   this URL; nothing was written
pub fn insert(db: &Database, record: &LinkRecord) -> Result<(), StoreError> {
    // Serialize the record to JSON for storage
    let record_json = serde_json::to_string(record)?;

    // Begin a write transaction
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_LINKS)?;
        let mut index = write_txn.open_table(TABLE_URL_INDEX)?;

        // Refuse a second record for an indexed URL; dropping the
        // uncommitted transaction discards it
        let existing_id = index.get(record.url.as_str())?.map(|id| id.value().to_string());
        if let Some(existing_id) = existing_id {
            if table.get(existing_id.as_str())?.is_some() {
                return Err(StoreError::DuplicateUrl {
                    url: record.url.clone(),
                    id: existing_id,
                });
            }
        }

        // Insert the record into the links table
        table.insert(record.id.as_str(), record_json.as_str())?;

        // Point the URL index at the new record
        index.insert(record.url.as_str(), record.id.as_str())?;
    }

    // Commit the transaction to persist the data
    write_txn.commit()?;

    Ok(())
}

/// Registers `record` unless its URL is already known
///
/// When the URL is indexed, only the stored record's expiry is replaced by
/// `record.expiry_date` and the stored identifier is returned. Otherwise the
/// record is inserted and its own identifier is returned.
///
/// The lookup and the write share one write transaction; redb serializes
/// writers, so two concurrent registrations of a new URL cannot both insert.
///
/// # Returns
///
/// * `Ok(id)` - Identifier now serving `record.url`
/// * `Err(StoreError)` - Storage failure or corrupt stored value
pub fn upsert_by_url(db: &Database, record: &LinkRecord) -> Result<String, StoreError> {
    // Begin a write transaction; it also serializes concurrent registrations
    let write_txn = db.begin_write()?;
    let id = {
        let mut table = write_txn.open_table(TABLE_LINKS)?;
        let mut index = write_txn.open_table(TABLE_URL_INDEX)?;

        // Resolve the URL to its stored record, if any
        let existing_id = index.get(record.url.as_str())?.map(|id| id.value().to_string());
        let existing = match &existing_id {
            Some(id) => table
                .get(id.as_str())?
                .map(|value| serde_json::from_str::<LinkRecord>(value.value()))
                .transpose()?,
            None => None,
        };

        match existing {
            // Known URL: keep the identifier, move the expiry
            Some(mut stored) => {
                stored.expiry_date = record.expiry_date;
                let stored_json = serde_json::to_string(&stored)?;
                table.insert(stored.id.as_str(), stored_json.as_str())?;
                stored.id
            }
            // No index entry, or a dangling one: the new record takes the URL
            None => {
                let record_json = serde_json::to_string(record)?;
                table.insert(record.id.as_str(), record_json.as_str())?;
                index.insert(record.url.as_str(), record.id.as_str())?;
                record.id.clone()
            }
        }
    };

    // Commit the transaction to persist the data
    write_txn.commit()?;

    Ok(id)
}

/// Returns every stored record, in identifier order
///
/// WARNING: reads the whole table; meant for the analytics listing only
pub fn list_all(db: &Database) -> Result<Vec<LinkRecord>, StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_LINKS)?;

    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_str(value.value())?);
    }
    Ok(records)
}
