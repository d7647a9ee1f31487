//! Configuration loading
//!
//! Layers, lowest first: optional TOML file, `POLLEN__*` environment
//! variables, then the providers' conventional credential variables for any
//! field still unset.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use pollen_common::PollenConfig;
use std::path::Path;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "pollen.toml";

const AWS_VARS: [&str; 4] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_REGION",
];
const AZURE_VARS: [&str; 3] = [
    "AZURE_STORAGE_CONNECTION_STRING",
    "AZURE_STORAGE_ACCOUNT_NAME",
    "AZURE_STORAGE_ACCOUNT_KEY",
];
const GCS_VARS: [&str; 2] = ["GCLOUD_STORAGE_PROJECT_ID", "GOOGLE_APPLICATION_CREDENTIALS"];

/// Load configuration from file and environment
///
/// A missing default file is fine; a missing explicit `--config` file is not.
pub fn load(path: Option<&Path>) -> Result<PollenConfig> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };

    let settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(required))
        .add_source(
            Environment::with_prefix("POLLEN")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("backends")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    let mut config: PollenConfig = settings
        .try_deserialize()
        .context("invalid configuration")?;
    apply_provider_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Fill unset credential fields from provider environment variables
pub fn apply_provider_env(config: &mut PollenConfig, var: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| var(name).filter(|v| !v.is_empty());

    if let Some(aws) = section(&mut config.aws, AWS_VARS.iter().any(|&n| var(n).is_some())) {
        fill(&mut aws.access_key_id, var("AWS_ACCESS_KEY_ID"));
        fill(&mut aws.secret_access_key, var("AWS_SECRET_ACCESS_KEY"));
        fill(&mut aws.session_token, var("AWS_SESSION_TOKEN"));
        fill(&mut aws.region, var("AWS_REGION"));
    }

    if let Some(azure) = section(
        &mut config.azure,
        AZURE_VARS.iter().any(|&n| var(n).is_some()),
    ) {
        fill(
            &mut azure.connection_string,
            var("AZURE_STORAGE_CONNECTION_STRING"),
        );
        fill(&mut azure.account_name, var("AZURE_STORAGE_ACCOUNT_NAME"));
        fill(&mut azure.account_key, var("AZURE_STORAGE_ACCOUNT_KEY"));
    }

    if let Some(gcs) = section(
        &mut config.gcs,
        GCS_VARS.iter().any(|&n| var(n).is_some()),
    ) {
        fill(&mut gcs.project_id, var("GCLOUD_STORAGE_PROJECT_ID"));
        fill(
            &mut gcs.credentials_file,
            var("GOOGLE_APPLICATION_CREDENTIALS"),
        );
    }
}

/// Existing sub-config, or a fresh one when the environment has values for it
fn section<T: Default>(slot: &mut Option<T>, from_env: bool) -> Option<&mut T> {
    if slot.is_none() && from_env {
        *slot = Some(T::default());
    }
    slot.as_mut()
}

fn fill(field: &mut Option<String>, value: Option<String>) {
    if field.is_none() {
        *field = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollen_common::{AwsConfig, BackendKind, PartialPutPolicy};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pollen.toml");
        std::fs::write(
            &path,
            r#"
backends = ["gcs", "aws"]
threshold = 1
partial_put = "rollback"

[read_retry]
attempts = 5

[aws]
access_key_id = "AKID"
secret_access_key = "secret"
region = "eu-west-1"
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.backends, vec![BackendKind::Gcs, BackendKind::Aws]);
        assert_eq!(config.threshold, 1);
        assert_eq!(config.partial_put, PartialPutPolicy::Rollback);
        assert_eq!(config.read_retry.attempts, 5);
        assert_eq!(config.read_retry.delay_ms, 200);
        let aws = config.aws.unwrap();
        assert_eq!(aws.region(), "eu-west-1");
        assert_eq!(aws.access_key_id.as_deref(), Some("AKID"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_provider_env_fills_missing_fields() {
        let mut config = PollenConfig {
            aws: Some(AwsConfig {
                access_key_id: Some("from-file".into()),
                ..AwsConfig::default()
            }),
            ..PollenConfig::default()
        };
        apply_provider_env(
            &mut config,
            env(&[
                ("AWS_ACCESS_KEY_ID", "from-env"),
                ("AWS_SECRET_ACCESS_KEY", "secret"),
                ("GCLOUD_STORAGE_PROJECT_ID", "project"),
                ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/pollen/gcs.json"),
                ("AZURE_STORAGE_ACCOUNT_KEY", ""),
            ]),
        );

        let aws = config.aws.unwrap();
        assert_eq!(aws.access_key_id.as_deref(), Some("from-file"));
        assert_eq!(aws.secret_access_key.as_deref(), Some("secret"));
        assert_eq!(aws.region(), AwsConfig::DEFAULT_REGION);

        let gcs = config.gcs.unwrap();
        assert_eq!(gcs.project_id.as_deref(), Some("project"));
        assert_eq!(gcs.credentials_file.as_deref(), Some("/etc/pollen/gcs.json"));

        // Empty values do not create a section
        assert!(config.azure.is_none());
    }
}
