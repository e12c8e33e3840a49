//! Short code generation against the URL store.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::utils::code_generator::{
    DEFAULT_ALPHABET, DEFAULT_CODE_LENGTH, generate_code, validate_custom_alias,
};
use crate::utils::deadline::{DEFAULT_STORE_TIMEOUT, with_deadline};

/// Default bound on random generation attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Alphabet, length and retry bound for generated codes.
#[derive(Debug, Clone)]
pub struct CodeSettings {
    pub alphabet: Vec<u8>,
    pub length: usize,
    pub max_attempts: usize,
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.as_bytes().to_vec(),
            length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Produces short codes that are free in the store at the time of the check.
///
/// The existence check is an optimization; the store's unique index is the
/// authoritative guard, and callers must still handle
/// [`AppError::CodeExists`] from `create`.
pub struct CodeGenerator<U: UrlRepository> {
    url_repository: Arc<U>,
    settings: CodeSettings,
    store_timeout: Duration,
}

impl<U: UrlRepository> CodeGenerator<U> {
    pub fn new(url_repository: Arc<U>, settings: CodeSettings) -> Self {
        Self {
            url_repository,
            settings,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Sets the deadline applied to each existence check.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.settings.max_attempts
    }

    /// Validates `alias` and returns it verbatim if no live record uses it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidAliasFormat`] if the alias breaks the format rules.
    /// Returns [`AppError::AliasExists`] if the alias is taken. There is no retry.
    /// Returns [`AppError::StoreUnavailable`] if the existence check fails.
    pub async fn generate_custom(&self, alias: &str) -> Result<String, AppError> {
        validate_custom_alias(alias, &self.settings.alphabet)?;

        if self.exists(alias).await? {
            return Err(AppError::AliasExists {
                alias: alias.to_string(),
            });
        }

        Ok(alias.to_string())
    }

    /// Draws random codes until one is free, up to `max_attempts` draws.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::GenerationExhausted`] once every attempt collided.
    /// Returns [`AppError::StoreUnavailable`] if an existence check fails.
    pub async fn generate_random(&self) -> Result<String, AppError> {
        for _ in 0..self.settings.max_attempts {
            if let Some(code) = self.try_random_code().await? {
                return Ok(code);
            }
        }

        tracing::warn!(
            attempts = self.settings.max_attempts,
            "Random code generation exhausted"
        );

        Err(AppError::GenerationExhausted {
            attempts: self.settings.max_attempts,
        })
    }

    /// Draws one random code and checks it against the store.
    ///
    /// Returns `None` on a collision. Callers that also insert the code use
    /// this to charge insert-time conflicts to the same attempt budget.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] if the existence check fails.
    pub async fn try_random_code(&self) -> Result<Option<String>, AppError> {
        let code = generate_code(&self.settings.alphabet, self.settings.length);

        if self.exists(&code).await? {
            tracing::debug!(code = %code, "Random code collision");
            return Ok(None);
        }

        Ok(Some(code))
    }

    async fn exists(&self, code: &str) -> Result<bool, AppError> {
        with_deadline(
            self.store_timeout,
            "exists_by_code",
            self.url_repository.exists_by_code(code),
        )
        .await
    }
}
