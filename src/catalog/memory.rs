//! In-process catalog for tests and offline runs.
//!
//! Behaves like a table without primary key enforcement: every insert appends
//! a row, so importing the same file twice duplicates it.

use super::{ResultSet, Row, Session, SessionProvider, Statement, TableRef, Value};
use crate::error::{AuthenticationError, Error, SessionError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    tables: HashMap<TableRef, Vec<Row>>,
    statements: Vec<Statement>,
}

/// Shared table storage, clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<Mutex<State>>,
}

impl MemoryCatalog {
    /// Catalog with no tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding one empty table
    #[must_use]
    pub fn with_table(table: &TableRef) -> Self {
        let catalog = Self::new();
        catalog.create_table(table);
        catalog
    }

    /// Create `table` if it does not exist yet
    pub fn create_table(&self, table: &TableRef) {
        self.lock().tables.entry(table.clone()).or_default();
    }

    /// Snapshot of the rows in `table`, empty if it does not exist
    #[must_use]
    pub fn rows(&self, table: &TableRef) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Every statement executed so far, oldest first
    #[must_use]
    pub fn statements(&self) -> Vec<Statement> {
        self.lock().statements.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(&self, statement: &Statement) -> Result<ResultSet, SessionError> {
        let mut state = self.lock();
        state.statements.push(statement.clone());

        let rows = state
            .tables
            .get_mut(statement.table())
            .ok_or_else(|| {
                SessionError::Statement(format!("unconfigured table {}", statement.table()))
            })?;

        match statement {
            Statement::Insert {
                columns, values, ..
            } => {
                if columns.len() != values.len() {
                    return Err(SessionError::Statement(format!(
                        "{} columns but {} values",
                        columns.len(),
                        values.len()
                    )));
                }
                rows.push(Row::new(columns.iter().copied().zip(values.iter().cloned())));
                Ok(ResultSet::new())
            }
            Statement::Select { columns, .. } => Ok(rows
                .iter()
                .map(|row| {
                    Row::new(columns.iter().map(|&column| {
                        (column, row.get(column).cloned().unwrap_or(Value::Null))
                    }))
                })
                .collect()),
        }
    }
}

/// Hands out [`MemorySession`]s over one catalog and counts them
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    catalog: MemoryCatalog,
    fail_write_at: Option<usize>,
    reject: Option<AuthenticationError>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MemoryProvider {
    /// Provider over `catalog`
    #[must_use]
    pub fn new(catalog: MemoryCatalog) -> Self {
        Self {
            catalog,
            fail_write_at: None,
            reject: None,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the `n`th insert (1-based) of every session fail
    #[must_use]
    pub fn fail_write_at(mut self, n: usize) -> Self {
        self.fail_write_at = Some(n);
        self
    }

    /// Refuse every connection attempt with `error`
    #[must_use]
    pub fn reject_with(mut self, error: AuthenticationError) -> Self {
        self.reject = Some(error);
        self
    }

    /// Sessions handed out so far
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Calls to [`Session::close`] so far, across sessions
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MemoryProvider {
    async fn connect(&self) -> Result<Box<dyn Session>, Error> {
        if let Some(error) = &self.reject {
            return Err(error.clone().into());
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        debug!("memory session opened");
        Ok(Box::new(MemorySession {
            catalog: self.catalog.clone(),
            fail_write_at: self.fail_write_at,
            writes: AtomicUsize::new(0),
            is_closed: AtomicBool::new(false),
            close_calls: Arc::clone(&self.closed),
        }))
    }
}

/// Session over a [`MemoryCatalog`]
#[derive(Debug)]
pub struct MemorySession {
    catalog: MemoryCatalog,
    fail_write_at: Option<usize>,
    writes: AtomicUsize,
    is_closed: AtomicBool,
    close_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet, SessionError> {
        if self.is_closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        if let Statement::Insert { .. } = statement {
            let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_write_at == Some(n) {
                return Err(SessionError::Statement(format!(
                    "write {n} timed out waiting for replicas"
                )));
            }
        }
        self.catalog.execute(statement)
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.is_closed.store(true, Ordering::SeqCst);
        debug!("memory session closed");
    }
}
