use keyspaces_import::catalog::{MemoryCatalog, MemoryProvider};
use keyspaces_import::storage::FsObjectStore;
use keyspaces_import::{pipeline, Config};
use std::path::PathBuf;

/// Run the whole import against a local bucket directory and an in-memory catalog
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let buckets = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    };

    let config = Config {
        local_file: PathBuf::from("data/cassandra-data-example.csv"),
        ..Config::default()
    };
    let store = FsObjectStore::new(buckets.path(), &config.bucket_name);
    let provider = MemoryProvider::new(MemoryCatalog::with_table(&config.table_ref()));

    let report = match pipeline::run(&store, &provider, &config).await {
        Ok(report) => report,
        Err(e) => {
            println!("Error {e}");
            std::process::exit(1);
        }
    };

    println!(
        "Parsed {} records, inserted {} into {}",
        report.parsed,
        report.inserted,
        config.table_ref()
    );
    for record in &report.catalog {
        println!(" {record}");
    }
}
