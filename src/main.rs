//! engage-core command line
//!
//! Establishes a session against the configured API and optionally
//! prefetches media into the cache.
//!
//! ```text
//! engage-core [--prefetch URL ...]
//! ```

use std::env;
use std::sync::Arc;

use engage_core::session::FileCredentialStore;
use engage_core::{EngageConfig, EngageCore, NAME, VERSION};
use log::{error, info};

const DEFAULT_CREDENTIAL_PATH: &str = ".engage_credential";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let prefetch = match parse_args(&args) {
        Ok(urls) => urls,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: {NAME} [--prefetch URL ...]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(prefetch).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Vec<String>, String> {
    match args.split_first() {
        None => Ok(Vec::new()),
        Some((flag, urls)) if flag == "--prefetch" => {
            if urls.is_empty() {
                Err("--prefetch needs at least one URL".to_string())
            } else {
                Ok(urls.to_vec())
            }
        }
        Some((other, _)) => Err(format!("unknown argument {other:?}")),
    }
}

async fn run(prefetch: Vec<String>) -> engage_core::Result<()> {
    info!("{} v{}", NAME, VERSION);

    let config = EngageConfig::from_env()?;
    let credential_path =
        env::var("ENGAGE_CREDENTIAL_PATH").unwrap_or_else(|_| DEFAULT_CREDENTIAL_PATH.to_string());
    let core = EngageCore::with_defaults(config, Arc::new(FileCredentialStore::new(credential_path)))?;

    let identity = core.session().identity().await?;
    println!("user {} ({})", identity.user_id, identity.nickname);

    if !prefetch.is_empty() {
        let report = core.media().prefetch_batch(&prefetch).await;
        println!("prefetched {}/{} urls", report.succeeded(), report.requested);
        for (url, e) in &report.failed {
            error!("prefetch {} failed: {}", url, e);
        }
    }

    Ok(())
}
