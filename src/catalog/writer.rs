use super::{Consistency, Session, Statement, TableRef, Value, BOOK_COLUMNS};
use crate::config::Config;
use crate::error::WriteError;
use crate::record::Record;
use tracing::{debug, info};

/// Inserts records one bound statement at a time
///
/// There is no batch or transaction around the inserts. The first failure
/// stops the run and earlier rows stay written.
#[derive(Debug)]
pub struct RecordWriter<'a> {
    session: &'a dyn Session,
    table: TableRef,
    consistency: Consistency,
}

impl<'a> RecordWriter<'a> {
    /// Writer for the configured table and write consistency
    #[must_use]
    pub fn new(session: &'a dyn Session, config: &Config) -> Self {
        Self {
            session,
            table: config.table_ref(),
            consistency: config.write_consistency,
        }
    }

    /// Insert every record in order, stopping at the first failure
    ///
    /// Returns the number of rows written.
    /// # Errors
    /// - `WriteError::Encode` - if a page count does not fit a CQL `int`
    /// - `WriteError::Insert` - if the session rejects an insert
    pub async fn write_all<I>(&self, records: I) -> Result<usize, WriteError>
    where
        I: IntoIterator<Item = Record>,
    {
        info!(table = %self.table, consistency = %self.consistency, "inserting records");
        let mut committed = 0;
        for record in records {
            let statement = self.insert_statement(&record, committed)?;
            self.session
                .execute(&statement)
                .await
                .map_err(|source| WriteError::Insert {
                    identifier: record.identifier.clone(),
                    committed,
                    source,
                })?;
            committed += 1;
            debug!(isbn = %record.identifier, "inserted");
        }
        info!(rows = committed, "insert done");
        Ok(committed)
    }

    fn insert_statement(&self, record: &Record, committed: usize) -> Result<Statement, WriteError> {
        let pages = i32::try_from(record.page_count).map_err(|_| WriteError::Encode {
            identifier: record.identifier.clone(),
            committed,
            reason: format!("page count {} exceeds the int column", record.page_count),
        })?;

        Ok(Statement::Insert {
            table: self.table.clone(),
            columns: &BOOK_COLUMNS,
            values: vec![
                Value::Text(record.identifier.clone()),
                Value::Text(record.title.clone()),
                Value::Text(record.author.clone()),
                Value::Int(pages),
                Value::Int(record.publication_year),
            ],
            consistency: self.consistency,
        })
    }
}
