//! API key resolution.
//!
//! Lookup order is explicit argument, then the host's secret context, then the
//! environment. Blank values count as absent at every step.

use std::collections::HashMap;

use crate::{
    config::Config,
    error::{Result, WeatherError},
};

/// Resolves named credentials on behalf of the host platform.
pub trait SecretContext: Send + Sync {
    fn secret(&self, name: &str) -> Option<String>;
}

impl SecretContext for HashMap<String, String> {
    fn secret(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// The stored config answers for the configured key name only.
impl SecretContext for Config {
    fn secret(&self, name: &str) -> Option<String> {
        if name == self.api_key_env { self.api_key.clone() } else { None }
    }
}

/// Where a resolved key came from. Logged instead of the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Context,
    Environment,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Explicit => "explicit",
            CredentialSource::Context => "context",
            CredentialSource::Environment => "environment",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub key: String,
    pub source: CredentialSource,
}

impl std::fmt::Debug for ResolvedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedKey").field("key", &"<redacted>").field("source", &self.source).finish()
    }
}

/// Resolve against the process environment.
pub fn resolve_api_key(
    explicit: Option<&str>,
    context: Option<&dyn SecretContext>,
    env_var: &str,
) -> Result<ResolvedKey> {
    resolve_api_key_with(explicit, context, env_var, |name| std::env::var(name).ok())
}

/// Prioritized lookup with an injectable environment reader.
///
/// `env_var` doubles as the secret name asked of `context`.
pub fn resolve_api_key_with<E>(
    explicit: Option<&str>,
    context: Option<&dyn SecretContext>,
    env_var: &str,
    env_lookup: E,
) -> Result<ResolvedKey>
where
    E: Fn(&str) -> Option<String>,
{
    let found = |source: CredentialSource, value: Option<String>| {
        value
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(|key| ResolvedKey { key, source })
    };

    found(CredentialSource::Explicit, explicit.map(str::to_string))
        .or_else(|| found(CredentialSource::Context, context.and_then(|ctx| ctx.secret(env_var))))
        .or_else(|| found(CredentialSource::Environment, env_lookup(env_var)))
        .ok_or_else(|| WeatherError::MissingCredential { env_var: env_var.to_string() })
}
