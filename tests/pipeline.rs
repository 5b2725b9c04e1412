use keyspaces_import::catalog::{MemoryCatalog, MemoryProvider};
use keyspaces_import::error::{AuthenticationError, FormatError, WriteError};
use keyspaces_import::storage::FsObjectStore;
use keyspaces_import::{pipeline, Config, Error, Record};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const BOOKS: &str = "\
9780135957059;Effective Java;Joshua Bloch;412;2017
9781593278281;The Rust Programming Language;Steve Klabnik;552;2018
9780201633610;Design Patterns;Erich Gamma;395;1994
";

struct Fixture {
    _dir: TempDir,
    config: Config,
    store: FsObjectStore,
    catalog: MemoryCatalog,
}

fn fixture(contents: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let local_file = dir.path().join("cassandra-data-example.csv");
    std::fs::File::create(&local_file)
        .unwrap()
        .write_all(contents.as_bytes())
        .unwrap();

    let config = Config {
        local_file,
        ..Config::default()
    };
    let store = FsObjectStore::new(dir.path().join("buckets"), &config.bucket_name);
    let catalog = MemoryCatalog::with_table(&config.table_ref());

    Fixture {
        _dir: dir,
        config,
        store,
        catalog,
    }
}

fn effective_java() -> Record {
    "9780135957059;Effective Java;Joshua Bloch;412;2017"
        .parse()
        .unwrap()
}

fn staged(root: &Path, config: &Config) -> bool {
    root.join("buckets")
        .join(&config.bucket_name)
        .join(&config.object_name)
        .exists()
}

#[tokio::test]
async fn run_uploads_imports_and_lists() {
    let f = fixture(BOOKS);
    let provider = MemoryProvider::new(f.catalog.clone());

    let report = pipeline::run(&f.store, &provider, &f.config).await.unwrap();

    assert!(staged(f._dir.path(), &f.config));
    assert_eq!(report.parsed, 3);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.catalog.len(), 3);
    assert!(report.catalog.contains(&effective_java()));
    assert_eq!(provider.sessions_opened(), 1);
    assert_eq!(provider.close_calls(), 1);
}

#[tokio::test]
async fn read_back_is_a_superset_of_what_was_written() {
    let f = fixture("9780135957059;Effective Java;Joshua Bloch;412;2017\n");
    let provider = MemoryProvider::new(f.catalog.clone());

    pipeline::run(&f.store, &provider, &f.config).await.unwrap();

    let other = fixture("9781593278281;The Rust Programming Language;Steve Klabnik;552;2018\n");
    let report = pipeline::run(&other.store, &provider, &other.config)
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.catalog.len(), 2);
    assert!(report.catalog.contains(&effective_java()));
}

#[tokio::test]
async fn importing_twice_duplicates_rows() {
    let f = fixture(BOOKS);
    let provider = MemoryProvider::new(f.catalog.clone());

    pipeline::run(&f.store, &provider, &f.config).await.unwrap();
    let report = pipeline::run(&f.store, &provider, &f.config).await.unwrap();

    assert_eq!(report.catalog.len(), 6);
    let copies = report
        .catalog
        .iter()
        .filter(|r| **r == effective_java())
        .count();
    assert_eq!(copies, 2);
    assert_eq!(provider.close_calls(), 2);
}

#[tokio::test]
async fn malformed_line_aborts_before_any_write() {
    let f = fixture("9780135957059;Effective Java;Joshua Bloch;412;2017\n123;Short\n");
    let provider = MemoryProvider::new(f.catalog.clone());

    let err = pipeline::run(&f.store, &provider, &f.config)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Format(FormatError::FieldCount { line: 2, found: 2 })
    ));
    assert_eq!(provider.sessions_opened(), 0);
    assert!(f.catalog.rows(&f.config.table_ref()).is_empty());
    // the upload already happened and stays
    assert!(staged(f._dir.path(), &f.config));
}

#[tokio::test]
async fn failed_insert_keeps_earlier_rows_and_closes_the_session() {
    let f = fixture(BOOKS);
    let provider = MemoryProvider::new(f.catalog.clone()).fail_write_at(2);

    let err = pipeline::run(&f.store, &provider, &f.config)
        .await
        .unwrap_err();

    match err {
        Error::Write(WriteError::Insert {
            identifier,
            committed,
            ..
        }) => {
            assert_eq!(identifier, "9781593278281");
            assert_eq!(committed, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(f.catalog.rows(&f.config.table_ref()).len(), 1);
    assert_eq!(provider.close_calls(), 1);
}

#[tokio::test]
async fn rejected_authentication_opens_nothing() {
    let f = fixture(BOOKS);
    let provider = MemoryProvider::new(f.catalog.clone())
        .reject_with(AuthenticationError::Rejected("signature expired".into()));

    let err = pipeline::run(&f.store, &provider, &f.config)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(provider.sessions_opened(), 0);
    assert_eq!(provider.close_calls(), 0);
}

#[tokio::test]
async fn missing_object_is_a_storage_error() {
    let f = fixture(BOOKS);
    let err = pipeline::fetch_records(&f.store, &f.config)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}

#[tokio::test]
async fn empty_catalog_reads_as_empty() {
    let f = fixture("");
    let provider = MemoryProvider::new(f.catalog.clone());

    let report = pipeline::run(&f.store, &provider, &f.config).await.unwrap();

    assert_eq!(report.parsed, 0);
    assert!(report.catalog.is_empty());
}
