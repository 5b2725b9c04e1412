//! Authentication for the database session.
//!
//! The session provider does not know how requests are signed. It is handed a
//! [`RequestSigner`] and feeds it the nonce from the server challenge. The
//! signer in this crate, [`SigV4Signer`], answers the Keyspaces SigV4
//! handshake.

use crate::error::AuthenticationError;
use chrono::{DateTime, Utc};
use std::fmt;

mod scope;
mod sigv4;

pub use scope::CredentialScope;
pub use sigv4::{SigV4Signer, INITIAL_RESPONSE, SERVICE};

/// Capability that turns a server challenge into a signed answer
pub trait RequestSigner: Send + Sync + fmt::Debug {
    /// Sign one challenge
    /// # Errors
    /// - `AuthenticationError` - if the credentials cannot sign the request
    fn sign(&self, request: &SigningRequest) -> Result<SignedRequest, AuthenticationError>;
}

/// AWS credentials, the secret is never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    /// Static credentials
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Resolve credentials from the default AWS provider chain
    /// (environment, profile, web identity, instance metadata)
    /// # Errors
    /// - `AuthenticationError::MissingCredentials` - if no provider yields credentials
    #[cfg(feature = "aws")]
    pub async fn from_default_chain(region: &str) -> Result<Self, AuthenticationError> {
        use aws_config::BehaviorVersion;
        use aws_credential_types::provider::ProvideCredentials;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_owned()))
            .load()
            .await;
        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            AuthenticationError::MissingCredentials("no credentials provider configured".into())
        })?;
        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| AuthenticationError::MissingCredentials(e.to_string()))?;

        Ok(Self::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token().map(str::to_owned),
        ))
    }

    /// Access key id
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Temporary session token, if any
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

/// A server challenge waiting to be signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// Nonce sent by the server
    pub nonce: String,
    /// Signing time
    pub timestamp: DateTime<Utc>,
}

impl SigningRequest {
    /// Extract the nonce from a raw challenge such as `nonce=ab12...`
    /// # Errors
    /// - `AuthenticationError::MissingNonce` - if the challenge carries no `nonce=`
    pub fn from_challenge(
        challenge: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<SigningRequest, AuthenticationError> {
        const NONCE_KEY: &str = "nonce=";

        let text = String::from_utf8_lossy(challenge);
        let missing = || AuthenticationError::MissingNonce(text.to_string());

        let start = text.find(NONCE_KEY).ok_or_else(missing)? + NONCE_KEY.len();
        let nonce = text[start..].split(',').next().unwrap_or_default();
        if nonce.is_empty() {
            return Err(missing());
        }

        Ok(SigningRequest {
            nonce: nonce.to_owned(),
            timestamp,
        })
    }
}

/// The answer sent back to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Hex encoded signature
    pub signature: String,
    /// Access key id the signature was made with
    pub access_key_id: String,
    /// Signing time as sent in `amzdate`
    pub amz_date: String,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
}

impl SignedRequest {
    /// Wire form: `signature=..,access_key=..,amzdate=..[,session_token=..]`
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut response = format!(
            "signature={},access_key={},amzdate={}",
            self.signature, self.access_key_id, self.amz_date
        );
        if let Some(token) = &self.session_token {
            response.push_str(",session_token=");
            response.push_str(token);
        }
        response.into_bytes()
    }
}
