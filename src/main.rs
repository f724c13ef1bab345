//! Blob Uploader
//!
//! Command-line front end: uploads one file, or every file in a directory,
//! to the first blob server in a shuffled pool that accepts it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use blob_uploader::{Credentials, HashAlgorithm, UploadReport, Uploader, UploaderConfig};

#[derive(Debug, Parser)]
#[command(name = "blob-uploader", version, about = "Upload files to blob servers")]
struct Cli {
    /// URL to blobber server to upload to (repeatable)
    #[arg(short = 'u', long = "url", value_name = "URL", required = true)]
    urls: Vec<Url>,

    /// Credentials file for signing the calls
    #[arg(short = 'a', long = "auth", value_name = "AUTH_FILE")]
    auth: PathBuf,

    /// Branch for the file (e.g. try, mozilla-central)
    #[arg(short = 'b', long = "branch")]
    branch: String,

    /// Increase verbosity
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Instead of a file, upload every file in a directory
    #[arg(short = 'd', long = "dir")]
    dir: bool,

    /// Digest algorithm used to address the blob
    #[arg(long = "hash-algo", value_name = "NAME")]
    hash_algo: Option<HashAlgorithm>,

    /// Attempt budget per file
    #[arg(long = "attempts", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Extra PEM root certificates to trust
    #[arg(long = "ca-bundle", value_name = "PATH")]
    ca_bundle: Option<PathBuf>,

    /// Local file (or directory with --dir) to upload
    #[arg(value_name = "FILE")]
    path: PathBuf,
}

impl Cli {
    fn apply(&self, config: &mut UploaderConfig) {
        if let Some(algorithm) = self.hash_algo {
            config.hash_algorithm = algorithm;
        }
        if let Some(attempts) = self.attempts {
            config.max_attempts = attempts as usize;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = &self.ca_bundle {
            config.ca_bundle = Some(path.clone());
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "blob_uploader=debug,reqwest=warn,hyper=warn"
    } else {
        "blob_uploader=info,reqwest=warn,hyper=warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every file was uploaded and verified
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = UploaderConfig::from_env().context("Invalid BLOBBER_* environment")?;
    cli.apply(&mut config);

    let credentials = Credentials::from_file(&cli.auth)?;
    let uploader = Uploader::http(credentials, config).context("Failed to build HTTP client")?;

    let config = uploader.config();
    tracing::debug!(
        hosts = cli.urls.len(),
        algorithm = %config.hash_algorithm,
        max_attempts = config.max_attempts,
        timeout = ?config.request_timeout,
        "Starting blob uploader v{}",
        env!("CARGO_PKG_VERSION")
    );

    let reports = if cli.dir {
        if !cli.path.is_dir() {
            bail!("{} is not a directory", cli.path.display());
        }
        uploader.upload_dir(&cli.urls, &cli.path, &cli.branch).await?
    } else {
        if !cli.path.is_file() {
            bail!("{} is not a file", cli.path.display());
        }
        vec![uploader.upload_file(&cli.urls, &cli.path, &cli.branch).await?]
    };

    Ok(summarize(&reports))
}

fn summarize(reports: &[UploadReport]) -> bool {
    let mut all_ok = true;
    for report in reports {
        match report.outcome.blob_url() {
            Some(url) => println!("{} {}", report.path.display(), url),
            None => all_ok = false,
        }
    }
    all_ok
}
