#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unsafe_op_in_unsafe_fn)]
#![warn(unused_qualifications)]

//! This crate stages a book catalog file in S3 and imports it into an Amazon Keyspaces
//! table, authenticating the CQL session with `Sigv4` instead of a username and password.
//!
//! The input is one book per line, `isbn;title;author;pages;year`. A run uploads the file,
//! downloads it again, parses every line, inserts each record with `LOCAL_QUORUM` and reads
//! the table back.
//!
//! Keyspaces answers the CQL `AUTHENTICATE` frame with a nonce. The driver passes it to a
//! [`RequestSigner`], which returns a presigned `PUT /authenticate` for the `cassandra`
//! service.
//!
//! The AWS backends live behind the `aws` feature. Without it the crate still carries the
//! whole pipeline with an in-memory catalog and a filesystem object store.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod storage;

pub use auth::{CredentialScope, Credentials, RequestSigner, SigV4Signer};
pub use catalog::{Consistency, RecordReader, RecordWriter, Session, SessionProvider};
pub use config::Config;
pub use error::{Error, Result};
pub use record::{parse_records, Record};
pub use storage::{ObjectStore, StoredObject};
