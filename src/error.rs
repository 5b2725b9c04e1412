//! Error taxonomy for the import pipeline.
//!
//! Every phase has its own error type so callers can tell a malformed input
//! line from a rejected insert. [`Error`] wraps them all for the binary, which
//! prints the failure and exits non-zero. Nothing here is retried or recovered.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Top level error returned by the pipeline operations
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials were missing, malformed or rejected
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// The database or storage endpoint could not be reached
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// An input line could not be turned into a record
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// An insert into the catalog failed
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// Querying or decoding the catalog failed
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// An object storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors when decoding a `Sigv4` credential string
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialScopeError {
    /// Provided Access Key ID is invalid
    #[error("Access Key ID invalid length, expected more than 12 chars got: {0}")]
    AccessKeyIdLength(usize),
    /// Couldn't extract the account id from the access key id
    #[error("Could not find account id in access key, decoded length: {0}")]
    AccountMissingFromAccessKeyId(usize),
    /// Decoding Base32 failed
    #[error("Base32 decode error: {0}")]
    Base32Decode(String),
    /// The credential is not `key/date/region/service/aws4_request`
    #[error("Credential component missing parts: {0}")]
    MissingParts(String),
    /// Failed to parse the date, not in %Y%m%d format
    #[error("Could not parse date {0}")]
    Date(String),
}

/// Errors raised while authenticating a database session
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// No credentials could be resolved
    #[error("no AWS credentials available: {0}")]
    MissingCredentials(String),
    /// The access key id or region cannot produce a valid credential scope
    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] CredentialScopeError),
    /// The server challenge did not carry a nonce
    #[error("server challenge has no nonce: {0:?}")]
    MissingNonce(String),
    /// The server refused the signed response
    #[error("authentication rejected: {0}")]
    Rejected(String),
}

/// Errors raised while establishing a session
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The endpoint did not accept a connection
    #[error("could not connect to {endpoint}: {reason}")]
    Unreachable {
        /// `host:port` that was dialed
        endpoint: String,
        /// Driver supplied reason
        reason: String,
    },
    /// TLS could not be configured
    #[error("TLS setup failed: {0}")]
    Tls(String),
}

/// Errors produced by a session when executing a single statement
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session was already closed
    #[error("session is closed")]
    Closed,
    /// The backend rejected or failed the statement
    #[error("statement failed: {0}")]
    Statement(String),
}

/// A delimited input line could not be parsed
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FormatError {
    /// Wrong number of `;` separated fields
    #[error("line {line}: expected 5 fields, found {found}")]
    FieldCount {
        /// 1-based line number
        line: usize,
        /// Number of fields on the line
        found: usize,
    },
    /// A numeric field is not a base-10 integer
    #[error("line {line}: {field} {value:?} is not a valid integer: {source}")]
    InvalidNumber {
        /// 1-based line number
        line: usize,
        /// Name of the offending field
        field: &'static str,
        /// Raw field text
        value: String,
        /// Integer parse failure
        #[source]
        source: ParseIntError,
    },
    /// The underlying stream failed or was not UTF-8
    #[error("line {line}: could not read input: {source}")]
    Io {
        /// 1-based line number
        line: usize,
        /// Read failure
        #[source]
        source: io::Error,
    },
}

impl FormatError {
    /// Line number the error was raised on
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::FieldCount { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::Io { line, .. } => *line,
        }
    }
}

/// Inserting records into the catalog failed
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WriteError {
    /// The session failed the insert; `committed` rows were already written
    #[error("insert of {identifier} failed after {committed} rows were written: {source}")]
    Insert {
        /// Identifier of the record that failed
        identifier: String,
        /// Rows written before the failure, they are not rolled back
        committed: usize,
        /// Session failure
        #[source]
        source: SessionError,
    },
    /// The record holds a value the column type cannot store
    #[error("record {identifier} cannot be encoded after {committed} rows were written: {reason}")]
    Encode {
        /// Identifier of the record that failed
        identifier: String,
        /// Rows written before the failure
        committed: usize,
        /// What was out of range
        reason: String,
    },
}

impl WriteError {
    /// Number of rows written before the batch aborted
    #[must_use]
    pub fn committed(&self) -> usize {
        match self {
            Self::Insert { committed, .. } | Self::Encode { committed, .. } => *committed,
        }
    }
}

/// Reading records back from the catalog failed
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReadError {
    /// The select statement failed
    #[error("query failed: {0}")]
    Query(#[from] SessionError),
    /// A row could not be decoded into a record
    #[error("column {column}: {reason}")]
    Decode {
        /// Column name
        column: String,
        /// Why decoding failed
        reason: String,
    },
}

/// Object storage failures
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StorageError {
    /// The key does not exist in the bucket
    #[error("object {key} not found in bucket {bucket}")]
    NotFound {
        /// Bucket that was searched
        bucket: String,
        /// Missing key
        key: String,
    },
    /// Local file access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },
    /// The storage service failed the request
    #[error("{operation} {key} failed: {reason}")]
    Backend {
        /// `put`, `get`, `delete` or `list`
        operation: &'static str,
        /// Object key (or bucket for listings)
        key: String,
        /// Service supplied reason
        reason: String,
    },
}

/// Errors for loading the YAML config
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO Error when trying to read file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serde_YAML error with parsing
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// A value is present but unusable
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Config key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
