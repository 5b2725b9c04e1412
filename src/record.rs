//! Book records and the `;` delimited line format they are staged in.
//!
//! A line is `identifier;title;author;pageCount;publicationYear`. There is no
//! header, no quoting and no comment syntax. [`parse_records`] turns any
//! [`BufRead`] into a lazy iterator of records that stops at the first bad line.

use crate::error::FormatError;
use std::fmt;
use std::io::{BufRead, Lines};
use std::str::FromStr;
use tracing::debug;

/// Separator between fields of a staged line
pub const FIELD_DELIMITER: char = ';';

/// Fields per line
pub const FIELD_COUNT: usize = 5;

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// ISBN, expected unique per catalog but not checked here
    pub identifier: String,
    /// Book title
    pub title: String,
    /// Author name
    pub author: String,
    /// Number of pages
    pub page_count: u32,
    /// Year of publication
    pub publication_year: i32,
}

impl Record {
    /// Parse a single staged line
    ///
    /// # Arguments
    /// * `line` - the raw line without its terminator, for example
    /// > 9780135957059;Effective Java;Joshua Bloch;412;2017
    /// * `line_number` - 1-based position, reported in errors
    ///
    /// # Examples
    /// ```
    /// # use keyspaces_import::Record;
    /// let record = Record::from_line("9780135957059;Effective Java;Joshua Bloch;412;2017", 1).unwrap();
    /// assert_eq!(record.page_count, 412);
    /// ```
    /// # Errors
    /// - `FormatError::FieldCount` - if the line does not hold exactly five fields
    /// - `FormatError::InvalidNumber` - if `pageCount` or `publicationYear` is not an integer
    pub fn from_line(line: &str, line_number: usize) -> Result<Record, FormatError> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(FormatError::FieldCount {
                line: line_number,
                found: fields.len(),
            });
        }

        Ok(Record {
            identifier: fields[0].to_owned(),
            title: fields[1].to_owned(),
            author: fields[2].to_owned(),
            page_count: parse_number(fields[3], "pageCount", line_number)?,
            publication_year: parse_number(fields[4], "publicationYear", line_number)?,
        })
    }

    /// Render the record back into a staged line, without a terminator
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}{d}{}{d}{}{d}{}{d}{}",
            self.identifier,
            self.title,
            self.author,
            self.page_count,
            self.publication_year,
            d = FIELD_DELIMITER
        )
    }
}

impl FromStr for Record {
    type Err = FormatError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        Record::from_line(line, 1)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ISBN= {} AUTHOR= {} PAGES= {} TITLE= {} YEAR_OF_PUBLICATION= {}",
            self.identifier, self.author, self.page_count, self.title, self.publication_year
        )
    }
}

fn parse_number<T>(value: &str, field: &'static str, line: usize) -> Result<T, FormatError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    value
        .parse()
        .map_err(|source| FormatError::InvalidNumber {
            line,
            field,
            value: value.to_owned(),
            source,
        })
}

/// Lazy record decoder over a line oriented stream
///
/// Yields one `Result` per line. After the first error it yields nothing more,
/// the remaining input is left unread.
#[derive(Debug)]
pub struct RecordParser<R> {
    lines: Lines<R>,
    line_number: usize,
    failed: bool,
}

/// Decode `reader` line by line into records
pub fn parse_records<R: BufRead>(reader: R) -> RecordParser<R> {
    RecordParser {
        lines: reader.lines(),
        line_number: 0,
        failed: false,
    }
}

impl<R: BufRead> Iterator for RecordParser<R> {
    type Item = Result<Record, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let line = self.lines.next()?;
        self.line_number += 1;

        let result = match line {
            Ok(line) => {
                debug!(line = self.line_number, "{line}");
                Record::from_line(&line, self.line_number)
            }
            Err(source) => Err(FormatError::Io {
                line: self.line_number,
                source,
            }),
        };
        self.failed = result.is_err();
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn effective_java() -> Record {
        Record {
            identifier: "9780135957059".to_owned(),
            title: "Effective Java".to_owned(),
            author: "Joshua Bloch".to_owned(),
            page_count: 412,
            publication_year: 2017,
        }
    }

    #[test]
    fn parses_a_well_formed_line() {
        let record: Record = "9780135957059;Effective Java;Joshua Bloch;412;2017"
            .parse()
            .unwrap();
        assert_eq!(record, effective_java());
    }

    #[test]
    fn two_fields_is_a_format_error() {
        let err = Record::from_line("123;Short", 7).unwrap_err();
        assert!(matches!(err, FormatError::FieldCount { line: 7, found: 2 }));
    }

    #[test]
    fn six_fields_is_a_format_error() {
        let err = Record::from_line("1;a;b;2;3;extra", 1).unwrap_err();
        assert!(matches!(err, FormatError::FieldCount { found: 6, .. }));
    }

    #[test]
    fn empty_line_is_a_format_error() {
        let err = Record::from_line("", 3).unwrap_err();
        assert!(matches!(err, FormatError::FieldCount { line: 3, found: 1 }));
    }

    #[test]
    fn non_numeric_pages_is_a_format_error() {
        let err = Record::from_line("1;Title;Author;many;2001", 1).unwrap_err();
        assert!(matches!(
            err,
            FormatError::InvalidNumber {
                field: "pageCount",
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_year_is_a_format_error() {
        let err = Record::from_line("1;Title;Author;100;MMI", 1).unwrap_err();
        assert!(matches!(
            err,
            FormatError::InvalidNumber {
                field: "publicationYear",
                ..
            }
        ));
    }

    #[test]
    fn negative_page_count_is_rejected() {
        assert!(Record::from_line("1;Title;Author;-3;2001", 1).is_err());
    }

    #[test]
    fn negative_year_is_accepted() {
        let record = Record::from_line("0;Histories;Herodotus;700;-430", 1).unwrap();
        assert_eq!(record.publication_year, -430);
    }

    #[test]
    fn records_keep_line_order() {
        let input = "1;A;X;10;2000\n2;B;Y;20;2001\r\n3;C;Z;30;2002\n";
        let records: Vec<Record> = parse_records(Cursor::new(input))
            .collect::<Result<_, _>>()
            .unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(records[1].title, "B");
        assert_eq!(records[2].page_count, 30);
    }

    #[test]
    fn parsing_stops_at_the_first_bad_line() {
        let input = "1;A;X;10;2000\n123;Short\n3;C;Z;30;2002\n";
        let mut parser = parse_records(Cursor::new(input));

        assert!(parser.next().unwrap().is_ok());
        let err = parser.next().unwrap().unwrap_err();
        assert_eq!(err.line(), 2);
        assert!(parser.next().is_none());
    }

    #[test]
    fn invalid_utf8_is_reported_with_its_line() {
        let input: &[u8] = b"1;A;X;10;2000\n\xff\xfe;B;Y;1;2\n";
        let result: Result<Vec<Record>, _> = parse_records(input).collect();
        assert!(matches!(result, Err(FormatError::Io { line: 2, .. })));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(parse_records(Cursor::new("")).count(), 0);
    }

    #[test]
    fn to_line_matches_the_input_format() {
        assert_eq!(
            effective_java().to_line(),
            "9780135957059;Effective Java;Joshua Bloch;412;2017"
        );
    }

    #[test]
    fn display_lists_every_column() {
        assert_eq!(
            effective_java().to_string(),
            "ISBN= 9780135957059 AUTHOR= Joshua Bloch PAGES= 412 TITLE= Effective Java YEAR_OF_PUBLICATION= 2017"
        );
    }
}
