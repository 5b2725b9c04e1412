use super::{Consistency, Row, Session, Statement, TableRef, Value, BOOK_COLUMNS};
use crate::config::Config;
use crate::error::ReadError;
use crate::record::Record;
use tracing::info;

/// Reads the whole catalog back into records
#[derive(Debug)]
pub struct RecordReader<'a> {
    session: &'a dyn Session,
    table: TableRef,
}

impl<'a> RecordReader<'a> {
    /// Reader for the configured table
    #[must_use]
    pub fn new(session: &'a dyn Session, config: &Config) -> Self {
        Self {
            session,
            table: config.table_ref(),
        }
    }

    /// Select every row, decoding lazily as the iterator is consumed
    ///
    /// Row order is whatever the backend returns.
    /// # Errors
    /// - `ReadError::Query` - if the select fails
    pub async fn read_all(&self) -> Result<DecodedRecords, ReadError> {
        info!(table = %self.table, "querying catalog");
        let statement = Statement::Select {
            table: self.table.clone(),
            columns: &BOOK_COLUMNS,
            consistency: Consistency::LocalOne,
        };
        let rows = self.session.execute(&statement).await?;
        Ok(DecodedRecords {
            rows: rows.into_iter(),
        })
    }
}

/// Rows of a select, decoded into records on demand
#[derive(Debug)]
pub struct DecodedRecords {
    rows: std::vec::IntoIter<Row>,
}

impl Iterator for DecodedRecords {
    type Item = Result<Record, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| decode(&row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

fn decode(row: &Row) -> Result<Record, ReadError> {
    let pages = int(row, "pages")?;
    Ok(Record {
        identifier: text(row, "isbn")?,
        title: text(row, "title")?,
        author: text(row, "author")?,
        page_count: u32::try_from(pages).map_err(|_| ReadError::Decode {
            column: "pages".to_owned(),
            reason: format!("negative page count {pages}"),
        })?,
        publication_year: int(row, "year_of_publication")?,
    })
}

fn column<'r>(row: &'r Row, name: &str) -> Result<&'r Value, ReadError> {
    match row.get(name) {
        None => Err(decode_error(name, "missing from row")),
        Some(Value::Null) => Err(decode_error(name, "is null")),
        Some(value) => Ok(value),
    }
}

fn text(row: &Row, name: &str) -> Result<String, ReadError> {
    match column(row, name)? {
        Value::Text(value) => Ok(value.clone()),
        other => Err(decode_error(name, &format!("expected text, got {other:?}"))),
    }
}

fn int(row: &Row, name: &str) -> Result<i32, ReadError> {
    match column(row, name)? {
        Value::Int(value) => Ok(*value),
        other => Err(decode_error(name, &format!("expected int, got {other:?}"))),
    }
}

fn decode_error(column: &str, reason: &str) -> ReadError {
    ReadError::Decode {
        column: column.to_owned(),
        reason: reason.to_owned(),
    }
}
