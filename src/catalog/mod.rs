//! The book catalog table and the sessions that reach it.
//!
//! Statements are built here as plain data ([`Statement`], [`Value`]) and
//! executed by a [`Session`]. The writer binds record fields by position, the
//! reader decodes rows by column name. Backends only translate statements to
//! their driver and rows back.

use crate::error::{Error, SessionError};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

pub mod memory;
mod reader;
mod writer;

#[cfg(feature = "aws")]
pub mod keyspaces;

pub use memory::{MemoryCatalog, MemoryProvider, MemorySession};
pub use reader::{DecodedRecords, RecordReader};
pub use writer::RecordWriter;

/// Catalog columns in bind order
pub const BOOK_COLUMNS: [&str; 5] = ["isbn", "title", "author", "pages", "year_of_publication"];

/// Replica acknowledgement requested for one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Consistency {
    /// One replica anywhere
    One,
    /// One replica in the local datacenter
    LocalOne,
    /// Majority of replicas in the local datacenter
    LocalQuorum,
    /// Majority of all replicas
    Quorum,
    /// Majority in every datacenter
    EachQuorum,
    /// Every replica
    All,
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::One => "ONE",
            Self::LocalOne => "LOCAL_ONE",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::Quorum => "QUORUM",
            Self::EachQuorum => "EACH_QUORUM",
            Self::All => "ALL",
        };
        f.write_str(name)
    }
}

/// `keyspace.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Keyspace name
    pub keyspace: String,
    /// Table name
    pub table: String,
}

impl TableRef {
    /// Build a reference from its two parts
    #[must_use]
    pub fn new(keyspace: &str, table: &str) -> Self {
        Self {
            keyspace: keyspace.to_owned(),
            table: table.to_owned(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.table)
    }
}

/// A column value as far as this crate cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `text`
    Text(String),
    /// `int`
    Int(i32),
    /// Unset or null
    Null,
}

/// A statement with its arguments bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `INSERT INTO table (columns) VALUES (?, ...)`
    Insert {
        /// Target table
        table: TableRef,
        /// Column list, same order as `values`
        columns: &'static [&'static str],
        /// Bound values
        values: Vec<Value>,
        /// Requested consistency
        consistency: Consistency,
    },
    /// `SELECT columns FROM table`, unbounded and unordered
    Select {
        /// Source table
        table: TableRef,
        /// Projected columns
        columns: &'static [&'static str],
        /// Requested consistency
        consistency: Consistency,
    },
}

impl Statement {
    /// CQL text with `?` placeholders
    #[must_use]
    pub fn cql(&self) -> String {
        match self {
            Self::Insert { table, columns, .. } => format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            ),
            Self::Select { table, columns, .. } => {
                format!("SELECT {} FROM {table}", columns.join(", "))
            }
        }
    }

    /// Values bound to the placeholders, empty for selects
    #[must_use]
    pub fn values(&self) -> &[Value] {
        match self {
            Self::Insert { values, .. } => values,
            Self::Select { .. } => &[],
        }
    }

    /// Consistency requested for this statement
    #[must_use]
    pub fn consistency(&self) -> Consistency {
        match self {
            Self::Insert { consistency, .. } | Self::Select { consistency, .. } => *consistency,
        }
    }

    /// Table the statement touches
    #[must_use]
    pub fn table(&self) -> &TableRef {
        match self {
            Self::Insert { table, .. } | Self::Select { table, .. } => table,
        }
    }
}

/// One result row, columns addressed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Build a row from `(name, value)` pairs
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    /// Value of the named column, if the row has it
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }
}

/// Rows returned by a statement, in backend order
pub type ResultSet = Vec<Row>;

/// A connected, authenticated database session
///
/// `close` is called exactly once by the pipeline. Statements executed after
/// that fail with [`SessionError::Closed`].
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// Run one statement and wait for its outcome
    async fn execute(&self, statement: &Statement) -> Result<ResultSet, SessionError>;

    /// Release the connection
    async fn close(&self);
}

/// Opens sessions against one configured database
#[async_trait]
pub trait SessionProvider: Send + Sync + fmt::Debug {
    /// Connect and authenticate
    ///
    /// # Errors
    /// - `Error::Authentication` - if credentials are missing or rejected
    /// - `Error::Connection` - if the endpoint cannot be reached
    async fn connect(&self) -> Result<Box<dyn Session>, Error>;
}
