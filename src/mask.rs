//! Secret redaction for log lines and error messages.
//!
//! Every string that may carry the API token (git command lines, git output,
//! clone URLs) goes through [`SecretMasker::mask`] before it is logged or
//! stored in a result.

use std::borrow::Cow;

use reqwest::Url;

/// Replacement written in place of every secret occurrence.
pub const REDACTED: &str = "###";

/// Redacts a fixed set of secrets from arbitrary text.
#[derive(Clone, Default)]
pub struct SecretMasker {
    /// Longest first, so a secret that contains another is masked whole.
    secrets: Vec<String>,
}

impl SecretMasker {
    /// Masker for the given secrets. Empty strings are ignored.
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    /// Masker for an optional API token.
    ///
    /// Besides the raw token this also covers the percent-encoded form that
    /// ends up inside clone URLs when the token contains reserved characters.
    pub fn for_secret(secret: Option<&str>) -> Self {
        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        let mut secrets = vec![secret.to_string()];
        if let Some(encoded) = url_encoded_user(secret) {
            if encoded != secret {
                secrets.push(encoded);
            }
        }
        Self::new(secrets)
    }

    /// Replace every occurrence of every secret with [`REDACTED`].
    pub fn mask<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut masked = Cow::Borrowed(text);
        for secret in &self.secrets {
            if masked.contains(secret.as_str()) {
                masked = Cow::Owned(masked.replace(secret.as_str(), REDACTED));
            }
        }
        masked
    }
}

// Secrets are never printed, not even by `{:?}`.
impl std::fmt::Debug for SecretMasker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretMasker")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

fn url_encoded_user(secret: &str) -> Option<String> {
    let mut url = Url::parse("https://example.invalid/").ok()?;
    url.set_username(secret).ok()?;
    Some(url.username().to_string())
}
