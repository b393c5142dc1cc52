// src/fetch/mod.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use reqwest::Client;
use tokio::fs;
use url::Url;

/// Download the source CSV and save it under `dest_dir` using the original
/// filename from the URL path. Returns the full path of the saved file.
///
/// Pure byte retrieval: parsing and validation happen downstream in the
/// source loader.
pub async fn download_source(
    client: &Client,
    url_str: &str,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let url = Url::parse(url_str)?;
    let filename = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or("source.csv");
    let dest_path = dest_dir.as_ref().join(filename);

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let resp = client.get(url.as_str()).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    fs::write(&dest_path, &bytes).await?;

    Ok(dest_path)
}
