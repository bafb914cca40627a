//! API credential lookup
//!
//! Sources are tried in order. A source that fails is logged and skipped, and
//! an empty value counts as absent.

use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variables consulted by [`default_sources`], in order
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["ROOM_RESTYLE_API_KEY", "API_KEY"];

/// A resolved API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no API key configured (tried: {})", .tried.join(", "))]
    NotConfigured { tried: Vec<String> },

    #[error("{source_name}: {message}")]
    Source { source_name: String, message: String },
}

/// Somewhere a credential may be found
pub trait CredentialSource {
    /// Human-readable name used in logs and errors
    fn name(&self) -> String;

    /// `Ok(None)` when this source holds no credential
    fn fetch(&self) -> Result<Option<String>, CredentialError>;
}

/// Environment variable
#[derive(Debug, Clone)]
pub struct EnvSource {
    pub var: String,
}

impl EnvSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvSource {
    fn name(&self) -> String {
        format!("env:{}", self.var)
    }

    fn fetch(&self) -> Result<Option<String>, CredentialError> {
        match std::env::var(&self.var) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(CredentialError::Source {
                source_name: self.name(),
                message: e.to_string(),
            }),
        }
    }
}

/// File holding the key on its first line
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for FileSource {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch(&self) -> Result<Option<String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().next().map(str::to_string)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CredentialError::Source {
                source_name: self.name(),
                message: e.to_string(),
            }),
        }
    }
}

/// Explicit value, e.g. from a command-line flag
#[derive(Debug, Clone)]
pub struct ValueSource {
    pub label: String,
    pub value: Option<String>,
}

impl ValueSource {
    pub fn new(label: impl Into<String>, value: Option<String>) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

impl CredentialSource for ValueSource {
    fn name(&self) -> String {
        self.label.clone()
    }

    fn fetch(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.value.clone())
    }
}

/// The environment variables in [`CREDENTIAL_ENV_VARS`]
pub fn default_sources() -> Vec<Box<dyn CredentialSource>> {
    CREDENTIAL_ENV_VARS
        .iter()
        .map(|var| Box::new(EnvSource::new(*var)) as Box<dyn CredentialSource>)
        .collect()
}

/// First non-empty credential from `sources`
pub fn resolve_credential(
    sources: &[Box<dyn CredentialSource>],
) -> Result<Credential, CredentialError> {
    let mut tried = Vec::with_capacity(sources.len());

    for source in sources {
        let name = source.name();
        match source.fetch() {
            Ok(Some(value)) if !value.trim().is_empty() => {
                debug!("API key taken from {}", name);
                return Ok(Credential(value.trim().to_string()));
            }
            Ok(_) => debug!("no API key in {}", name),
            Err(e) => warn!("skipping credential source: {}", e),
        }
        tried.push(name);
    }

    Err(CredentialError::NotConfigured { tried })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl CredentialSource for Broken {
        fn name(&self) -> String {
            "broken".to_string()
        }

        fn fetch(&self) -> Result<Option<String>, CredentialError> {
            Err(CredentialError::Source {
                source_name: self.name(),
                message: "unreadable".to_string(),
            })
        }
    }

    fn value(v: Option<&str>) -> Box<dyn CredentialSource> {
        Box::new(ValueSource::new("value", v.map(str::to_string)))
    }

    #[test]
    fn test_first_non_empty_wins() {
        let sources: Vec<Box<dyn CredentialSource>> = vec![
            value(None),
            value(Some("  ")),
            Box::new(Broken),
            value(Some("k1")),
            value(Some("k2")),
        ];
        assert_eq!(resolve_credential(&sources).unwrap().expose(), "k1");
    }

    #[test]
    fn test_nothing_found_lists_sources() {
        let sources: Vec<Box<dyn CredentialSource>> = vec![Box::new(Broken), value(Some(""))];
        match resolve_credential(&sources) {
            Err(CredentialError::NotConfigured { tried }) => {
                assert_eq!(tried, vec!["broken", "value"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_debug_is_redacted() {
        let sources = vec![value(Some("secret"))];
        let key = resolve_credential(&sources).unwrap();
        assert!(!format!("{:?}", key).contains("secret"));
    }

    #[test]
    fn test_default_sources_follow_env_var_order() {
        let names: Vec<String> = default_sources().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["env:ROOM_RESTYLE_API_KEY", "env:API_KEY"]);
    }

    #[test]
    fn test_missing_file_is_absent() {
        let source = FileSource::new("/nonexistent/room-restyle/key");
        assert!(source.fetch().unwrap().is_none());
    }
}
