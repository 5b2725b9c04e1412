//! Amazon Keyspaces through the `scylla` driver.
//!
//! TLS is mandatory on the Keyspaces endpoint. Authentication goes through the
//! driver's pluggable authenticator, which hands each server challenge to a
//! [`RequestSigner`].

use super::{Consistency, ResultSet, Row, Session, SessionProvider, Statement, Value};
use crate::auth::{RequestSigner, SigningRequest, INITIAL_RESPONSE};
use crate::config::Config;
use crate::error::{AuthenticationError, ConnectionError, Error, SessionError};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode};
use scylla::authentication::{AuthError, AuthenticatorProvider, AuthenticatorSession};
use scylla::frame::response::result::CqlValue;
use scylla::load_balancing::DefaultPolicy;
use scylla::prepared_statement::PreparedStatement;
use scylla::statement::Consistency as CqlConsistency;
use scylla::transport::errors::{DbError, NewSessionError};
use scylla::{ExecutionProfile, SessionBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug)]
struct SigV4AuthenticatorProvider {
    signer: Arc<dyn RequestSigner>,
}

#[async_trait]
impl AuthenticatorProvider for SigV4AuthenticatorProvider {
    async fn start_authentication_session(
        &self,
        authenticator_name: &str,
    ) -> Result<(Option<Vec<u8>>, Box<dyn AuthenticatorSession>), AuthError> {
        debug!(authenticator_name, "starting SigV4 authentication");
        Ok((
            Some(INITIAL_RESPONSE.to_vec()),
            Box::new(SigV4AuthenticatorSession {
                signer: Arc::clone(&self.signer),
            }),
        ))
    }
}

struct SigV4AuthenticatorSession {
    signer: Arc<dyn RequestSigner>,
}

#[async_trait]
impl AuthenticatorSession for SigV4AuthenticatorSession {
    async fn evaluate_challenge(
        &mut self,
        token: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, AuthError> {
        let challenge = token.ok_or_else(|| "empty SigV4 challenge".to_owned())?;
        let request =
            SigningRequest::from_challenge(challenge, Utc::now()).map_err(|e| e.to_string())?;
        let signed = self.signer.sign(&request).map_err(|e| e.to_string())?;
        Ok(Some(signed.to_bytes()))
    }

    async fn success(&mut self, _token: Option<&[u8]>) -> Result<(), AuthError> {
        debug!("SigV4 authentication accepted");
        Ok(())
    }
}

/// Opens TLS sessions to a Keyspaces endpoint
#[derive(Debug)]
pub struct KeyspacesProvider {
    config: Config,
    signer: Arc<dyn RequestSigner>,
}

impl KeyspacesProvider {
    /// Provider for the configured endpoint, signing with `signer`
    #[must_use]
    pub fn new(config: &Config, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            config: config.clone(),
            signer,
        }
    }

    fn ssl_context(&self) -> Result<SslContext, ConnectionError> {
        let tls = |e: openssl::error::ErrorStack| ConnectionError::Tls(e.to_string());

        let mut builder = SslContextBuilder::new(SslMethod::tls()).map_err(tls)?;
        builder.set_verify(SslVerifyMode::PEER);
        match &self.config.ca_certificate {
            Some(path) => builder.set_ca_file(path).map_err(tls)?,
            None => builder.set_default_verify_paths().map_err(tls)?,
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl SessionProvider for KeyspacesProvider {
    async fn connect(&self) -> Result<Box<dyn Session>, Error> {
        let endpoint = self.config.endpoint();
        info!(%endpoint, datacenter = %self.config.local_datacenter, "opening session");

        let policy = DefaultPolicy::builder()
            .prefer_datacenter(self.config.local_datacenter.clone())
            .token_aware(true)
            .permit_dc_failover(false)
            .build();
        let profile = ExecutionProfile::builder()
            .load_balancing_policy(policy)
            .build();

        let session = SessionBuilder::new()
            .known_node(&endpoint)
            .ssl_context(Some(self.ssl_context()?))
            .authenticator_provider(Arc::new(SigV4AuthenticatorProvider {
                signer: Arc::clone(&self.signer),
            }))
            .default_execution_profile_handle(profile.into_handle())
            .build()
            .await
            .map_err(|e| match e {
                NewSessionError::DbError(DbError::AuthenticationError, message) => {
                    Error::from(AuthenticationError::Rejected(message))
                }
                other => Error::from(ConnectionError::Unreachable {
                    endpoint: endpoint.clone(),
                    reason: other.to_string(),
                }),
            })?;

        info!("session open");
        Ok(Box::new(KeyspacesSession {
            inner: Mutex::new(Some(session)),
            prepared: Mutex::new(HashMap::new()),
        }))
    }
}

/// A live `scylla` session
///
/// Prepared statements are cached by CQL text for the life of the session.
pub struct KeyspacesSession {
    inner: Mutex<Option<scylla::Session>>,
    prepared: Mutex<HashMap<String, PreparedStatement>>,
}

impl std::fmt::Debug for KeyspacesSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyspacesSession").finish_non_exhaustive()
    }
}

impl KeyspacesSession {
    async fn prepare(
        &self,
        session: &scylla::Session,
        statement: &Statement,
    ) -> Result<PreparedStatement, SessionError> {
        let cql = statement.cql();
        let mut cache = self.prepared.lock().await;
        let mut prepared = match cache.get(&cql) {
            Some(prepared) => prepared.clone(),
            None => {
                let prepared = session.prepare(cql.as_str()).await.map_err(statement_error)?;
                cache.insert(cql, prepared.clone());
                prepared
            }
        };
        prepared.set_consistency(cql_consistency(statement.consistency()));
        Ok(prepared)
    }
}

fn statement_error(error: impl std::fmt::Display) -> SessionError {
    SessionError::Statement(error.to_string())
}

fn cql_consistency(consistency: Consistency) -> CqlConsistency {
    match consistency {
        Consistency::One => CqlConsistency::One,
        Consistency::LocalOne => CqlConsistency::LocalOne,
        Consistency::LocalQuorum => CqlConsistency::LocalQuorum,
        Consistency::Quorum => CqlConsistency::Quorum,
        Consistency::EachQuorum => CqlConsistency::EachQuorum,
        Consistency::All => CqlConsistency::All,
    }
}

fn cql_value(value: &Value) -> Option<CqlValue> {
    match value {
        Value::Text(text) => Some(CqlValue::Text(text.clone())),
        Value::Int(int) => Some(CqlValue::Int(*int)),
        Value::Null => None,
    }
}

fn value(column: &str, cql: Option<CqlValue>) -> Result<Value, SessionError> {
    match cql {
        None => Ok(Value::Null),
        Some(CqlValue::Text(text) | CqlValue::Ascii(text)) => Ok(Value::Text(text)),
        Some(CqlValue::Int(int)) => Ok(Value::Int(int)),
        Some(other) => Err(SessionError::Statement(format!(
            "column {column} has unsupported type: {other:?}"
        ))),
    }
}

#[async_trait]
impl Session for KeyspacesSession {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet, SessionError> {
        let guard = self.inner.lock().await;
        let session = guard.as_ref().ok_or(SessionError::Closed)?;
        let prepared = self.prepare(session, statement).await?;

        match statement {
            Statement::Insert { values, .. } => {
                let bound: Vec<Option<CqlValue>> = values.iter().map(cql_value).collect();
                session
                    .execute(&prepared, bound)
                    .await
                    .map_err(statement_error)?;
                Ok(ResultSet::new())
            }
            Statement::Select { .. } => {
                let pages = session
                    .execute_iter(prepared, ())
                    .await
                    .map_err(statement_error)?;
                let names: Vec<String> = pages
                    .get_column_specs()
                    .iter()
                    .map(|spec| spec.name.clone())
                    .collect();
                let rows: Vec<scylla::frame::response::result::Row> =
                    pages.try_collect().await.map_err(statement_error)?;

                rows.into_iter()
                    .map(|row| {
                        let columns = names
                            .iter()
                            .zip(row.columns)
                            .map(|(name, cql)| Ok((name.clone(), value(name, cql)?)))
                            .collect::<Result<Vec<_>, SessionError>>()?;
                        Ok(Row::new(columns))
                    })
                    .collect()
            }
        }
    }

    async fn close(&self) {
        if self.inner.lock().await.take().is_some() {
            info!("session closed");
        }
    }
}
