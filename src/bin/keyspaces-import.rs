use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use keyspaces_import::catalog::keyspaces::KeyspacesProvider;
use keyspaces_import::error::StorageError;
use keyspaces_import::storage::S3ObjectStore;
use keyspaces_import::{pipeline, Config, Credentials, ObjectStore, Record, Result, SigV4Signer};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Stage a `;` delimited book catalog in S3 and import it into Amazon Keyspaces,
/// authenticating with SigV4
#[derive(Parser, Debug)]
#[command(version, about = "Keyspaces catalog importer", long_about = None)]
struct CliArgs {
    /// Location of the YAML config file, built-in defaults otherwise
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// AWS region
    #[clap(long)]
    region: Option<String>,

    /// Staging bucket
    #[clap(long)]
    bucket: Option<String>,

    /// Object key of the staged file
    #[clap(long)]
    object: Option<String>,

    /// Local file to upload
    #[clap(long)]
    file: Option<PathBuf>,

    /// Keyspaces endpoint host
    #[clap(long)]
    host: Option<String>,

    /// Keyspaces endpoint port
    #[clap(long)]
    port: Option<u16>,

    /// Log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload, import and list the catalog (default)
    Run,
    /// Upload the local file to the bucket
    Upload,
    /// Download the staged file and insert its records
    Import,
    /// Print every record in the catalog
    List,
    /// Write the catalog to a local `;` delimited file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Delete the staged object
    DeleteObject,
    /// Print the buckets visible to the caller
    ListBuckets,
}

fn load_config(args: &CliArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::read(path)?,
        None => Config::default(),
    };

    if let Some(region) = &args.region {
        config.region.clone_from(region);
    }
    if let Some(bucket) = &args.bucket {
        config.bucket_name.clone_from(bucket);
    }
    if let Some(object) = &args.object {
        config.object_name.clone_from(object);
    }
    if let Some(file) = &args.file {
        config.local_file.clone_from(file);
    }
    if let Some(host) = &args.host {
        config.database_host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.database_port = port;
    }
    config.validate()?;
    Ok(config)
}

async fn session_provider(config: &Config) -> Result<KeyspacesProvider> {
    let credentials = Credentials::from_default_chain(&config.region).await?;
    let signer = SigV4Signer::new(&config.region, credentials)?;
    info!(account = signer.account_id(), region = signer.region(), "using SigV4 credentials");
    Ok(KeyspacesProvider::new(config, Arc::new(signer)))
}

fn print_records(records: &[Record]) {
    for record in records {
        println!(" {record}");
    }
}

async fn execute(args: CliArgs) -> Result<()> {
    let config = load_config(&args)?;
    let store = S3ObjectStore::from_config(&config).await;
    let config = &config;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let provider = session_provider(config).await?;
            let report = pipeline::run(&store, &provider, config).await?;
            println!(
                "parsed {} records, inserted {}",
                report.parsed, report.inserted
            );
            print_records(&report.catalog);
        }
        Command::Upload => pipeline::upload(&store, config).await?,
        Command::Import => {
            let records = pipeline::fetch_records(&store, config).await?;
            let provider = session_provider(config).await?;
            let inserted = pipeline::with_session(&provider, |session| async move {
                pipeline::import(session.as_ref(), config, records).await
            })
            .await?;
            println!("inserted {inserted} records");
        }
        Command::List => {
            let provider = session_provider(config).await?;
            let records = pipeline::with_session(&provider, |session| async move {
                pipeline::list(session.as_ref(), config).await
            })
            .await?;
            print_records(&records);
        }
        Command::Export { path } => {
            let provider = session_provider(config).await?;
            let records = pipeline::with_session(&provider, |session| async move {
                pipeline::list(session.as_ref(), config).await
            })
            .await?;
            let mut contents = String::new();
            for record in &records {
                contents.push_str(&record.to_line());
                contents.push('\n');
            }
            fs::write(&path, contents).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            println!("exported {} records to {}", records.len(), path.display());
        }
        Command::DeleteObject => {
            info!(bucket = store.bucket(), key = %config.object_name, "deleting object");
            store.delete(&config.object_name).await?;
        }
        Command::ListBuckets => {
            println!("Buckets:");
            for bucket in store.list_buckets().await? {
                println!("* {bucket}");
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed setting tracing");

    if let Err(e) = execute(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
