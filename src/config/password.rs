use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::ConfigError;

/// How the `api-key` setting names its secret.
///
/// ```toml
/// api-key = "key-inline"
/// api-key = { env = "MAILGUN_API_KEY" }
/// api-key = { file = "mailgun.key" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretSpec {
    Literal(String),
    Env { env: String },
    File { file: PathBuf },
}

/// Turns a [`SecretSpec`] into the secret itself.
///
/// `host` and `username` identify the credential for resolvers backed by a
/// keyring or netrc-like store; `configpath` is the file the spec came from.
pub trait PasswordResolver {
    fn resolve(
        &self,
        spec: &SecretSpec,
        host: &str,
        username: &str,
        configpath: Option<&Path>,
    ) -> Result<String, ConfigError>;
}

/// Resolves literals, environment variables and secret files.
///
/// Relative file paths are taken relative to the directory of the
/// configuration file. A single trailing newline is dropped from file
/// contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPasswordResolver;

impl PasswordResolver for DefaultPasswordResolver {
    fn resolve(
        &self,
        spec: &SecretSpec,
        host: &str,
        username: &str,
        configpath: Option<&Path>,
    ) -> Result<String, ConfigError> {
        tracing::debug!(host, username, "resolving Mailgun API key");
        match spec {
            SecretSpec::Literal(value) => Ok(value.clone()),
            SecretSpec::Env { env } => {
                std::env::var(env).map_err(|_| ConfigError::MissingEnv { name: env.clone() })
            }
            SecretSpec::File { file } => {
                let path = match configpath.and_then(Path::parent) {
                    Some(dir) if file.is_relative() => dir.join(file),
                    _ => file.clone(),
                };
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::SecretFile { path, source })?;
                let contents = contents.strip_suffix('\n').unwrap_or(&contents);
                let contents = contents.strip_suffix('\r').unwrap_or(contents);
                Ok(contents.to_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_is_returned_verbatim() {
        let spec = SecretSpec::Literal("hunter2".to_owned());
        let secret = DefaultPasswordResolver
            .resolve(&spec, "api.mailgun.net", "example.nil", None)
            .unwrap();
        assert_eq!(secret, "hunter2");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let spec = SecretSpec::Env {
            env: "MAILGUN_SENDER_TEST_SURELY_UNSET".to_owned(),
        };
        let err = DefaultPasswordResolver
            .resolve(&spec, "api.mailgun.net", "example.nil", None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { name } if name == "MAILGUN_SENDER_TEST_SURELY_UNSET"));
    }

    #[test]
    fn file_is_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mailgun.key"), "key-12345\n").unwrap();
        let spec = SecretSpec::File {
            file: PathBuf::from("mailgun.key"),
        };
        let configpath = dir.path().join("outgoing.toml");
        let secret = DefaultPasswordResolver
            .resolve(&spec, "api.mailgun.net", "example.nil", Some(&configpath))
            .unwrap();
        assert_eq!(secret, "key-12345");
    }

    #[test]
    fn unreadable_file_reports_path() {
        let spec = SecretSpec::File {
            file: PathBuf::from("/nonexistent/mailgun.key"),
        };
        let err = DefaultPasswordResolver
            .resolve(&spec, "api.mailgun.net", "example.nil", None)
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mailgun.key"));
    }

    #[test]
    fn spec_deserializes_from_each_shape() {
        let literal: SecretSpec = serde_json::from_value(serde_json::json!("abc")).unwrap();
        assert_eq!(literal, SecretSpec::Literal("abc".to_owned()));
        let env: SecretSpec = serde_json::from_value(serde_json::json!({"env": "KEY"})).unwrap();
        assert_eq!(
            env,
            SecretSpec::Env {
                env: "KEY".to_owned()
            }
        );
        let file: SecretSpec = serde_json::from_value(serde_json::json!({"file": "k"})).unwrap();
        assert_eq!(
            file,
            SecretSpec::File {
                file: PathBuf::from("k")
            }
        );
    }
}
