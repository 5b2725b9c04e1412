use super::{CredentialScope, Credentials, RequestSigner, SignedRequest, SigningRequest};
use crate::error::AuthenticationError;
use aws_sigv4::sign::v4::{calculate_signature, generate_signing_key};
use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::time::SystemTime;
use tracing::debug;

/// First token sent to the server, selects the SigV4 mechanism
pub const INITIAL_RESPONSE: &[u8] = b"SigV4\0\0";

/// Signing name of Amazon Keyspaces
pub const SERVICE: &str = "cassandra";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const EXPIRES_SECONDS: u32 = 900;

/// RFC 3986 unreserved characters pass through, everything else is `%XX`
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Answers Keyspaces challenges with a SigV4 presigned `PUT /authenticate`
///
/// The nonce is the payload: its SHA-256 goes where a request body hash
/// would. Key derivation and the HMAC come from `aws-sigv4`.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    region: String,
    credentials: Credentials,
    account_id: String,
}

impl SigV4Signer {
    /// Signer for `region`
    /// # Errors
    /// - `AuthenticationError::InvalidCredential` - if the access key id cannot
    ///   form a credential scope for `region`
    pub fn new(region: &str, credentials: Credentials) -> Result<Self, AuthenticationError> {
        let scope = CredentialScope::new(
            credentials.access_key_id(),
            Utc::now().date_naive(),
            region,
            SERVICE,
        )?;

        Ok(Self {
            region: region.to_owned(),
            credentials,
            account_id: scope.account_id,
        })
    }

    /// Account the access key belongs to
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Region the signatures are scoped to
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    fn credential_scope(
        &self,
        timestamp: &DateTime<Utc>,
    ) -> Result<CredentialScope, AuthenticationError> {
        Ok(CredentialScope::new(
            self.credentials.access_key_id(),
            timestamp.date_naive(),
            &self.region,
            SERVICE,
        )?)
    }
}

impl RequestSigner for SigV4Signer {
    fn sign(&self, request: &SigningRequest) -> Result<SignedRequest, AuthenticationError> {
        let amz_date = amz_date(&request.timestamp);
        let scope = self.credential_scope(&request.timestamp)?.scope();

        let canonical = canonical_request(
            self.credentials.access_key_id(),
            &scope,
            &amz_date,
            &request.nonce,
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical.as_bytes())
        );

        let signing_key = generate_signing_key(
            self.credentials.secret_access_key(),
            SystemTime::from(request.timestamp),
            &self.region,
            SERVICE,
        );
        let signature = calculate_signature(signing_key, string_to_sign.as_bytes());
        debug!(account = %self.account_id, %scope, "signed authentication challenge");

        Ok(SignedRequest {
            signature,
            access_key_id: self.credentials.access_key_id().to_owned(),
            amz_date,
            session_token: self.credentials.session_token().map(str::to_owned),
        })
    }
}

fn amz_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn canonical_request(access_key_id: &str, scope: &str, amz_date: &str, nonce: &str) -> String {
    let query = format!(
        "X-Amz-Algorithm={ALGORITHM}&X-Amz-Credential={}&X-Amz-Date={}&X-Amz-Expires={EXPIRES_SECONDS}",
        uri_encode(&format!("{access_key_id}/{scope}")),
        uri_encode(amz_date)
    );
    format!(
        "PUT\n/authenticate\n{query}\nhost:{SERVICE}\n\nhost\n{}",
        sha256_hex(nonce.as_bytes())
    )
}

fn sha256_hex(bytes: &[u8]) -> String {
    HEXLOWER.encode(&Sha256::digest(bytes))
}

fn uri_encode(value: &str) -> String {
    percent_encode(value.as_bytes(), QUERY_ENCODE_SET).to_string()
}
