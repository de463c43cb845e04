//! Configuration validation.
//!
//! Configuration problems are reported before any remote call is made: a
//! missing required setting, the two mutually exclusive credential flags
//! given together, or inline credential JSON that does not parse. Everything
//! here is plain validation - actually exchanging credentials for tokens is
//! the providers' concern.

use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Where provider credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Application-default credentials resolved by the provider SDK.
    Default,
    /// A service account credentials file on disk.
    File(PathBuf),
    /// The JSON content of a service account credentials file, passed inline.
    Inline(String),
}

impl CredentialsSource {
    /// Resolve the two credential flags into one source.
    ///
    /// # Errors
    ///
    /// Fails when both flags are given, or when the inline JSON is not a
    /// plausible credentials document.
    pub fn resolve(
        file: Option<PathBuf>,
        inline: Option<String>,
    ) -> Result<Self, ConfigError> {
        match (file, inline) {
            (Some(_), Some(_)) => Err(ConfigError::Conflict(
                "credentials-file",
                "credentials-json",
            )),
            (Some(path), None) => Ok(Self::File(path)),
            (None, Some(json)) => {
                validate_credentials_json(&json)?;
                Ok(Self::Inline(json))
            }
            (None, None) => Ok(Self::Default),
        }
    }
}

/// Minimal shape of a Google credentials document. Only the fields needed to
/// reject obviously wrong input early; the SDK does the real parsing.
#[derive(Debug, Deserialize)]
struct CredentialsDocument {
    #[serde(rename = "type")]
    credential_type: Option<String>,
}

fn validate_credentials_json(raw: &str) -> Result<(), ConfigError> {
    let document: CredentialsDocument = serde_json::from_str(raw)
        .map_err(|err| ConfigError::InvalidCredentials(err.to_string()))?;
    if document
        .credential_type
        .as_deref()
        .unwrap_or("")
        .is_empty()
    {
        return Err(ConfigError::InvalidCredentials(
            "missing \"type\" field".to_string(),
        ));
    }
    Ok(())
}

/// A configuration problem. Always fatal, always reported before any remote
/// call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not provided.
    Missing(&'static str),
    /// Two mutually exclusive settings were both provided.
    Conflict(&'static str, &'static str),
    /// Inline credential JSON failed validation.
    InvalidCredentials(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "missing flag: {name}"),
            Self::Conflict(a, b) => write!(f, "conflict: use either {a} or {b}"),
            Self::InvalidCredentials(cause) => {
                write!(f, "invalid credentials JSON: {cause}")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_resolves_to_default() {
        let source = CredentialsSource::resolve(None, None).expect("resolve failed");
        assert_eq!(source, CredentialsSource::Default);
    }

    #[test]
    fn test_both_flags_conflict() {
        let result = CredentialsSource::resolve(
            Some(PathBuf::from("/tmp/key.json")),
            Some("{}".to_string()),
        );
        assert_eq!(
            result,
            Err(ConfigError::Conflict("credentials-file", "credentials-json"))
        );
    }

    #[test]
    fn test_inline_json_must_parse() {
        let result = CredentialsSource::resolve(None, Some("not json".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidCredentials(_))));
    }

    #[test]
    fn test_inline_json_needs_a_type() {
        let result = CredentialsSource::resolve(None, Some("{}".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidCredentials(_))));
    }

    #[test]
    fn test_valid_inline_json_accepted() {
        let json = r#"{"type":"service_account","client_email":"svc@example.iam.gserviceaccount.com"}"#;
        let source = CredentialsSource::resolve(None, Some(json.to_string()))
            .expect("resolve failed");
        assert!(matches!(source, CredentialsSource::Inline(_)));
    }
}
