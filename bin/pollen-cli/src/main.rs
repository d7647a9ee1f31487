//! Pollen CLI - Threshold-shared object storage from the command line
//!
//! One subcommand per client operation. All logic lives in `pollen-client`;
//! this binary only builds commands and prints their results.

mod settings;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use clap::{ArgGroup, Parser, Subcommand};
use pollen_backend::{NativeMethod, Subresource};
use pollen_client::PollenClient;
use pollen_client::commands::NativeRequest;
use pollen_common::BackendKind;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pollen")]
#[command(about = "Object storage shared across clouds")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "POLLEN_CONFIG")]
    config: Option<PathBuf>,

    /// Backend to use; repeat to select several, in share placement order
    #[arg(short, long = "backend", value_name = "aws|azure|gcs")]
    backends: Vec<BackendKind>,

    /// Shares needed to reconstruct an object
    #[arg(short = 'k', long)]
    threshold: Option<u8>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a bucket on every backend
    CreateBucket { bucket: String },
    /// Empty and delete a bucket on every backend
    DeleteBucket {
        bucket: String,
        /// Confirm deletion of the bucket and everything in it
        #[arg(long)]
        yes: bool,
    },
    /// List buckets per backend
    ListBuckets,
    /// Share an object across the backends
    #[command(group(ArgGroup::new("source").required(true).args(["body", "file"])))]
    PutObject {
        bucket: String,
        /// Object key (defaults to the file name with --file)
        key: Option<String>,
        /// Object body as text
        #[arg(long)]
        body: Option<String>,
        /// Read the object body from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Reconstruct an object
    GetObject {
        bucket: String,
        key: String,
        /// Write the body to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete an object from every backend
    DeleteObject {
        bucket: String,
        key: String,
        #[arg(long)]
        yes: bool,
    },
    /// List object keys per backend
    ListObjects { bucket: String },
    /// Server-side copy on the native backend (source is `bucket/key`)
    CopyObject {
        bucket: String,
        key: String,
        source: String,
    },
    /// Raw request to the native backend's own API
    Native {
        /// get, put, delete or head
        method: NativeMethod,
        bucket: String,
        #[arg(long)]
        key: Option<String>,
        /// Administrative subresource (acl, policy, lifecycle, ...)
        #[arg(long)]
        subresource: Option<Subresource>,
        /// Request body file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = settings::load(args.config.as_deref())?;
    if !args.backends.is_empty() {
        config.backends = args.backends.clone();
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }

    let client = PollenClient::new(&config)
        .await
        .context("failed to set up backends")?;
    let result = run(&client, args.command, &mut std::io::stdout().lock()).await;
    if let Err(e) = client.shutdown().await {
        tracing::warn!("Shutdown failed: {}", e);
    }
    result
}

async fn run(client: &PollenClient, command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::CreateBucket { bucket } => {
            client.create_bucket(&bucket).await?;
            writeln!(out, "Bucket {bucket} created on {}", backend_list(client))?;
        }
        Commands::DeleteBucket { bucket, yes } => {
            if !yes {
                bail!("refusing to delete bucket {bucket} and all its objects without --yes");
            }
            client.delete_bucket(&bucket).await?;
            writeln!(out, "Bucket {bucket} deleted from {}", backend_list(client))?;
        }
        Commands::ListBuckets => {
            let report = client.list_buckets().await?;
            write!(out, "{}", report.render())?;
            if !report.is_complete() {
                bail!("bucket listing incomplete");
            }
        }
        Commands::PutObject {
            bucket,
            key,
            body,
            file,
        } => match (body, file) {
            (Some(body), _) => {
                let key = key.context("a key is required with --body")?;
                client.put_object(&bucket, &key, body).await?;
                writeln!(out, "Stored {bucket}/{key}")?;
            }
            (None, Some(path)) => {
                client.put_file(&bucket, &path, key.as_deref()).await?;
                writeln!(out, "Stored {} in {bucket}", path.display())?;
            }
            (None, None) => bail!("one of --body or --file is required"),
        },
        Commands::GetObject {
            bucket,
            key,
            output,
        } => {
            let body = client.get_object(&bucket, &key).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &body)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    writeln!(out, "Wrote {} bytes to {}", body.len(), path.display())?;
                }
                None => out.write_all(&body)?,
            }
        }
        Commands::DeleteObject { bucket, key, yes } => {
            if !yes {
                bail!("refusing to delete {bucket}/{key} without --yes");
            }
            client.delete_object(&bucket, &key).await?;
            writeln!(out, "Deleted {bucket}/{key}")?;
        }
        Commands::ListObjects { bucket } => {
            let report = client.list_objects(&bucket).await?;
            write!(out, "{}", report.render())?;
            if !report.is_complete() {
                bail!("object listing of {bucket} incomplete");
            }
        }
        Commands::CopyObject {
            bucket,
            key,
            source,
        } => {
            let copied = client.copy_object(&bucket, &key, &source).await?;
            writeln!(
                out,
                "Object copied successfully from {} to {}",
                copied.source, copied.destination
            )?;
        }
        Commands::Native {
            method,
            bucket,
            key,
            subresource,
            body_file,
        } => {
            let mut request = NativeRequest::new(method, bucket);
            request.key = key;
            request.subresource = subresource;
            if let Some(path) = body_file {
                let body = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                request.body = Some(Bytes::from(body));
            }
            let response = client.native(request).await?;
            writeln!(out, "{} {}", response.backend.display_name(), response.status)?;
            if !response.body.is_empty() {
                writeln!(out, "{}", response.text())?;
            }
        }
    }
    Ok(())
}

fn backend_list(client: &PollenClient) -> String {
    client
        .backends()
        .iter()
        .map(BackendKind::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollen_backend::{BackendRegistry, MemoryBackend, StorageBackend};
    use pollen_client::ClientOptions;
    use std::sync::Arc;

    fn memory_client() -> (PollenClient, Vec<Arc<MemoryBackend>>) {
        let backends: Vec<_> = BackendKind::ALL
            .iter()
            .map(|k| Arc::new(MemoryBackend::new(*k)))
            .collect();
        let adapters = backends
            .iter()
            .map(|b| Arc::clone(b) as Arc<dyn StorageBackend>)
            .collect();
        let registry = BackendRegistry::from_adapters(adapters, Some(BackendKind::Aws)).unwrap();
        let client = PollenClient::from_registry(Arc::new(registry), ClientOptions::default())
            .unwrap();
        (client, backends)
    }

    async fn run_args(client: &PollenClient, argv: &[&str]) -> Result<String> {
        let args = Args::try_parse_from(std::iter::once("pollen").chain(argv.iter().copied()))?;
        let mut out = Vec::new();
        run(client, args.command, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_parse_global_flags() {
        let args = Args::try_parse_from([
            "pollen", "-b", "gcs", "--backend", "aws", "-k", "1", "list-buckets",
        ])
        .unwrap();
        assert_eq!(args.backends, vec![BackendKind::Gcs, BackendKind::Aws]);
        assert_eq!(args.threshold, Some(1));
        assert!(Args::try_parse_from(["pollen", "-b", "dropbox", "list-buckets"]).is_err());
        assert!(Args::try_parse_from(["pollen", "put-object", "b", "k"]).is_err());
    }

    #[tokio::test]
    async fn test_object_workflow() {
        let (client, backends) = memory_client();

        let out = run_args(&client, &["create-bucket", "bucket1"]).await.unwrap();
        assert_eq!(out, "Bucket bucket1 created on AWS, Azure, GCS\n");

        run_args(&client, &["put-object", "bucket1", "k1", "--body", "hello world"])
            .await
            .unwrap();
        let out = run_args(&client, &["get-object", "bucket1", "k1"]).await.unwrap();
        assert_eq!(out, "hello world");

        let out = run_args(&client, &["list-objects", "bucket1"]).await.unwrap();
        assert!(out.contains("bucket1 objects in Azure:\n\tk1\n"));

        backends[2].set_offline(true);
        let err = run_args(&client, &["list-objects", "bucket1"]).await.unwrap_err();
        assert!(err.to_string().contains("incomplete"));
        backends[2].set_offline(false);

        assert!(run_args(&client, &["delete-bucket", "bucket1"]).await.is_err());
        run_args(&client, &["delete-bucket", "bucket1", "--yes"])
            .await
            .unwrap();
        assert!(backends.iter().all(|b| !b.has_bucket("bucket1")));
    }

    #[tokio::test]
    async fn test_put_file_and_get_to_file() {
        let (client, _backends) = memory_client();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.bin");
        let output = dir.path().join("restored.bin");
        std::fs::write(&input, [0u8, 159, 146, 150, 255]).unwrap();

        run_args(&client, &["create-bucket", "docs"]).await.unwrap();
        run_args(&client, &["put-object", "docs", "--file", input.to_str().unwrap()])
            .await
            .unwrap();
        run_args(
            &client,
            &["get-object", "docs", "report.bin", "-o", output.to_str().unwrap()],
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), [0u8, 159, 146, 150, 255]);
    }

    #[tokio::test]
    async fn test_passthrough_commands() {
        let (client, backends) = memory_client();
        run_args(&client, &["create-bucket", "b"]).await.unwrap();
        run_args(&client, &["put-object", "b", "src", "--body", "x"])
            .await
            .unwrap();

        let out = run_args(&client, &["copy-object", "b", "dst", "b/src"])
            .await
            .unwrap();
        assert_eq!(out, "Object copied successfully from b/src to b/dst\n");
        assert!(backends[0].object("b", "dst").is_some());

        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("tags.xml");
        std::fs::write(&policy, "<Tagging/>").unwrap();
        run_args(
            &client,
            &[
                "native",
                "put",
                "b",
                "--subresource",
                "tagging",
                "--body-file",
                policy.to_str().unwrap(),
            ],
        )
        .await
        .unwrap();
        let out = run_args(&client, &["native", "get", "b", "--subresource", "tagging"])
            .await
            .unwrap();
        assert_eq!(out, "AWS 200\n<Tagging/>\n");
    }
}
