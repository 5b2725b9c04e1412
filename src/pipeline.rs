//! The phases of an import run, in order.
//!
//! `upload` → `fetch_records` → `import` → `list`, each awaited before the
//! next starts. Database phases run inside [`with_session`], which closes
//! the session whatever the outcome.

use crate::catalog::{RecordReader, RecordWriter, Session, SessionProvider};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::{parse_records, Record};
use crate::storage::ObjectStore;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// What a full run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Records parsed from the staged object
    pub parsed: usize,
    /// Rows inserted
    pub inserted: usize,
    /// Catalog contents after the import, in backend order
    pub catalog: Vec<Record>,
}

/// Stage the configured local file in the bucket
/// # Errors
/// - `Error::Storage` - if the upload fails
pub async fn upload(store: &dyn ObjectStore, config: &Config) -> Result<()> {
    info!(
        file = %config.local_file.display(),
        bucket = store.bucket(),
        key = %config.object_name,
        "uploading"
    );
    store.put(&config.object_name, &config.local_file).await?;
    info!("upload done");
    Ok(())
}

/// Download the staged object and parse every line
///
/// The whole object is validated before anything is written, so a bad line
/// leaves the catalog untouched.
/// # Errors
/// - `Error::Storage` - if the download fails
/// - `Error::Format` - on the first malformed line
pub async fn fetch_records(store: &dyn ObjectStore, config: &Config) -> Result<Vec<Record>> {
    info!(bucket = store.bucket(), key = %config.object_name, "downloading");
    let object = store.get(&config.object_name).await?;
    info!(
        content_type = object.content_type.as_deref().unwrap_or("unknown"),
        bytes = object.bytes.len(),
        "downloaded"
    );
    let records = parse_records(object.reader()).collect::<Result<Vec<_>, _>>()?;
    info!(records = records.len(), "parsed");
    Ok(records)
}

/// Closes the session when dropped without an explicit `close`
///
/// Covers a panicking or cancelled closure. The close then runs as a task on
/// the current runtime, if there is one.
struct SessionGuard {
    session: Option<Arc<dyn Session>>,
}

impl SessionGuard {
    async fn close(mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        warn!("session abandoned, closing in the background");
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move { session.close().await });
        }
    }
}

/// Open a session, run `f` with it, then close it
///
/// The session is closed exactly once, after `f` completes, whether it
/// succeeded or not. A failed connect opens nothing and closes nothing. If
/// `f` panics or the returned future is dropped early, the close is spawned
/// on the current runtime instead.
/// # Errors
/// - `Error::Authentication` or `Error::Connection` - if the session cannot be opened
/// - whatever `f` returns
pub async fn with_session<T, F, Fut>(provider: &dyn SessionProvider, f: F) -> Result<T>
where
    F: FnOnce(Arc<dyn Session>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let session: Arc<dyn Session> = Arc::from(provider.connect().await?);
    let guard = SessionGuard {
        session: Some(Arc::clone(&session)),
    };
    let outcome = f(session).await;
    if let Err(e) = &outcome {
        warn!(error = %e, "closing session after failure");
    }
    guard.close().await;
    outcome
}

/// Insert `records` one at a time
/// # Errors
/// - `Error::Write` - on the first failed insert, earlier rows stay written
pub async fn import(session: &dyn Session, config: &Config, records: Vec<Record>) -> Result<usize> {
    Ok(RecordWriter::new(session, config).write_all(records).await?)
}

/// Read every record in the catalog
/// # Errors
/// - `Error::Read` - if the query or a row decode fails
pub async fn list(session: &dyn Session, config: &Config) -> Result<Vec<Record>> {
    let records = RecordReader::new(session, config)
        .read_all()
        .await?
        .collect::<Result<Vec<_>, _>>()?;
    info!(records = records.len(), "catalog read");
    Ok(records)
}

/// Upload, parse, import and read back
/// # Errors
/// The first failing phase aborts the run, see the individual phases.
pub async fn run(
    store: &dyn ObjectStore,
    provider: &dyn SessionProvider,
    config: &Config,
) -> Result<RunReport> {
    upload(store, config).await?;
    let records = fetch_records(store, config).await?;
    let parsed = records.len();

    let (inserted, catalog) = with_session(provider, |session| async move {
        let inserted = import(session.as_ref(), config, records).await?;
        let catalog = list(session.as_ref(), config).await?;
        Ok::<_, Error>((inserted, catalog))
    })
    .await?;

    Ok(RunReport {
        parsed,
        inserted,
        catalog,
    })
}
