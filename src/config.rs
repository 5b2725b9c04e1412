//! Run configuration.
//!
//! A [`Config`] is read from YAML, every key is optional and falls back to
//! the values below. The binary overlays command line flags on top.

use crate::catalog::{Consistency, TableRef};
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Everything the pipeline needs to reach storage and the database
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// AWS region used for S3 and for the SigV4 credential scope
    pub region: String,
    /// Bucket the input file is staged in
    pub bucket_name: String,
    /// Object key of the staged file
    pub object_name: String,
    /// Local file uploaded under `object_name`
    pub local_file: PathBuf,
    /// Keyspaces endpoint host
    pub database_host: String,
    /// Keyspaces endpoint port (TLS)
    pub database_port: u16,
    /// Datacenter preferred by the load balancing policy
    pub local_datacenter: String,
    /// Keyspace holding the catalog table
    pub keyspace: String,
    /// Catalog table
    pub table: String,
    /// Consistency requested for every insert
    pub write_consistency: Consistency,
    /// Ask S3 to encrypt the upload with the account KMS key
    pub sse_kms: bool,
    /// PEM bundle used to verify the database certificate, system roots otherwise
    pub ca_certificate: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: "sa-east-1".to_owned(),
            bucket_name: "keyspace-bucket-dev".to_owned(),
            object_name: "cassandra-data-example.csv".to_owned(),
            local_file: PathBuf::from("cassandra-data-example.csv"),
            database_host: "cassandra.sa-east-1.amazonaws.com".to_owned(),
            database_port: 9142,
            local_datacenter: "sa-east-1".to_owned(),
            keyspace: "bookstore".to_owned(),
            table: "books".to_owned(),
            write_consistency: Consistency::LocalQuorum,
            sse_kms: true,
            ca_certificate: None,
        }
    }
}

impl Config {
    /// Read the YAML config from `file_path` and validate it
    /// # Arguments
    /// * `file_path` - location of the file
    /// # Errors
    /// * `ConfigError` - File read error, YAML parsing error or an invalid value
    pub fn read(file_path: &Path) -> Result<Config, ConfigError> {
        let mut file = File::open(file_path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Config::from_yaml(&contents)
    }

    /// Parse and validate a YAML document
    /// # Errors
    /// * `ConfigError` - YAML parsing error or an invalid value
    pub fn from_yaml(contents: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that would otherwise fail deep inside a client
    /// # Errors
    /// * `ConfigError::Invalid` - naming the first offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("region", &self.region),
            ("bucket_name", &self.bucket_name),
            ("object_name", &self.object_name),
            ("database_host", &self.database_host),
            ("local_datacenter", &self.local_datacenter),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_owned(),
                });
            }
        }

        if self.database_port == 0 {
            return Err(ConfigError::Invalid {
                field: "database_port",
                reason: "must not be 0".to_owned(),
            });
        }

        // keyspace and table end up inside CQL text
        for (field, value) in [("keyspace", &self.keyspace), ("table", &self.table)] {
            if !is_cql_identifier(value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value:?} is not a plain CQL identifier"),
                });
            }
        }
        Ok(())
    }

    /// `host:port` of the database endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.database_host, self.database_port)
    }

    /// Table the records are written to and read from
    #[must_use]
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.keyspace, &self.table)
    }
}

fn is_cql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file_with_content(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn defaults_match_the_sample_deployment() {
        let config = Config::default();
        assert_eq!(config.endpoint(), "cassandra.sa-east-1.amazonaws.com:9142");
        assert_eq!(config.table_ref().to_string(), "bookstore.books");
        assert_eq!(config.write_consistency, Consistency::LocalQuorum);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let file = temp_file_with_content(
            "region: eu-west-1\nbucket_name: books-staging\nwrite_consistency: LOCAL_ONE\n",
        );
        let config = Config::read(file.path()).unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.bucket_name, "books-staging");
        assert_eq!(config.write_consistency, Consistency::LocalOne);
        assert_eq!(config.database_port, 9142);
        assert_eq!(config.object_name, "cassandra-data-example.csv");
    }

    #[test]
    fn test_read_yaml_invalid() {
        let file = temp_file_with_content("not a valid yaml");
        let result = Config::read(file.path());
        assert!(matches!(result, Err(ConfigError::YamlParse(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = Config::from_yaml("bucket: typo\n");
        assert!(matches!(result, Err(ConfigError::YamlParse(_))));
    }

    #[test]
    fn test_read_yaml_file_not_found() {
        let result = Config::read(Path::new("non_existent_file.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn zero_port_is_invalid() {
        let result = Config::from_yaml("database_port: 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "database_port",
                ..
            })
        ));
    }

    #[test]
    fn table_must_be_an_identifier() {
        let result = Config::from_yaml("table: \"books; DROP TABLE x\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid { field: "table", .. })));

        let result = Config::from_yaml("keyspace: 1books\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "keyspace",
                ..
            })
        ));
    }
}
