use async_trait::async_trait;
use eyre::{bail, Result, WrapErr};

/// Source of bearer credentials for the catalog API.
///
/// Token acquisition itself lives elsewhere; the client only asks for the
/// current token before each request.
#[async_trait]
pub trait TokenSupplier: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}

/// Always hands out the same token
#[derive(Clone)]
pub struct StaticTokenSupplier {
    token: String,
}

impl StaticTokenSupplier {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for StaticTokenSupplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenSupplier").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl TokenSupplier for StaticTokenSupplier {
    async fn bearer_token(&self) -> Result<String> {
        if self.token.is_empty() {
            bail!("Static token is empty");
        }
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvTokenSupplier {
    var: String,
}

impl EnvTokenSupplier {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenSupplier for EnvTokenSupplier {
    async fn bearer_token(&self) -> Result<String> {
        let token = std::env::var(&self.var)
            .wrap_err_with(|| format!("Environment variable {} is not set", self.var))?;
        if token.trim().is_empty() {
            bail!("Environment variable {} is empty", self.var);
        }
        Ok(token.trim().to_string())
    }
}
