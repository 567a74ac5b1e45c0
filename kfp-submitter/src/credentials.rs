//! Bearer tokens for the Kubeflow Pipelines API.
//!
//! Authentication is best effort: a provider that fails never aborts a submission, the request
//! simply goes out without a token.

use secrecy::{ExposeSecret, SecretString};
use std::env::VarError;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable holding an identity-aware proxy token.
pub const IAP_TOKEN_ENV_NAME: &str = "KFP_IAP_TOKEN";

/// Environment variable holding a Dex session cookie value.
pub const DEX_SESSION_ENV_NAME: &str = "KFP_DEX_SESSION";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("environment variable `{name}` does not contain valid unicode")]
    InvalidEnvironmentVariable { name: String },
}

/// A source of bearer tokens.
pub trait CredentialProvider {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns a token, `None` when this provider has nothing to offer.
    fn obtain_token(
        &self,
    ) -> impl Future<Output = Result<Option<SecretString>, CredentialError>> + Send;
}

/// Never yields a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn obtain_token(&self) -> Result<Option<SecretString>, CredentialError> {
        Ok(None)
    }
}

/// Always yields the same token.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

impl CredentialProvider for StaticTokenProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn obtain_token(&self) -> Result<Option<SecretString>, CredentialError> {
        Ok(Some(SecretString::from(self.token.expose_secret())))
    }
}

/// Reads the token from an environment variable. Unset or empty variables yield no token.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var_name: String,
}

impl EnvTokenProvider {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl CredentialProvider for EnvTokenProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn obtain_token(&self) -> Result<Option<SecretString>, CredentialError> {
        match std::env::var(&self.var_name) {
            Ok(token) if token.is_empty() => {
                debug!(var_name = self.var_name, "token variable is empty");
                Ok(None)
            }
            Ok(token) => Ok(Some(SecretString::from(token))),
            Err(VarError::NotPresent) => {
                debug!(var_name = self.var_name, "token variable is not set");
                Ok(None)
            }
            Err(VarError::NotUnicode(_)) => Err(CredentialError::InvalidEnvironmentVariable {
                name: self.var_name.clone(),
            }),
        }
    }
}

/// Asks `first`, then `second`. A failing provider is logged and skipped.
///
/// Chains of more than two providers are built by nesting.
#[derive(Debug, Clone)]
pub struct FirstAvailable<A, B> {
    first: A,
    second: B,
}

impl<A, B> FirstAvailable<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> CredentialProvider for FirstAvailable<A, B>
where
    A: CredentialProvider + Sync,
    B: CredentialProvider + Sync,
{
    fn name(&self) -> &'static str {
        "first-available"
    }

    async fn obtain_token(&self) -> Result<Option<SecretString>, CredentialError> {
        match self.first.obtain_token().await {
            Ok(Some(token)) => return Ok(Some(token)),
            Ok(None) => {}
            Err(err) => {
                warn!(
                    provider = self.first.name(),
                    "skipping credential provider: {err}"
                );
            }
        }

        self.second.obtain_token().await
    }
}

/// Obtains a token from `provider`, degrading any failure to an unauthenticated request.
pub async fn obtain_token_or_none<P>(provider: &P) -> Option<SecretString>
where
    P: CredentialProvider,
{
    match provider.obtain_token().await {
        Ok(token) => token,
        Err(err) => {
            warn!(
                provider = provider.name(),
                "failed to obtain credentials, continuing without a token: {err}"
            );
            None
        }
    }
}
