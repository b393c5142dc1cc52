use anyhow::Result;
use iaenp_etl::{fetch, pipeline, warehouse::ParquetWarehouse};
use reqwest::Client;
use std::{env, fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Public location of the SRI IAENP monthly dataset. Override with the
/// IAENP_SOURCE_URL environment variable, or skip the download entirely by
/// passing a local file path as the first argument.
static DEFAULT_SOURCE_URL: &str =
    "https://storage.googleapis.com/bucket_etl_iaenp/SRI_IAENP_Mensual.csv";

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configure dirs ───────────────────────────────────────────
    let source_dir = PathBuf::from("source");
    let warehouse_dir = PathBuf::from("warehouse");
    for d in [&source_dir, &warehouse_dir] {
        fs::create_dir_all(d)?;
    }

    // ─── 3) stage the source file ────────────────────────────────────
    let csv_path = match env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let url =
                env::var("IAENP_SOURCE_URL").unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string());
            info!(%url, "downloading source");
            let client = Client::new();
            fetch::download_source(&client, &url, &source_dir).await?
        }
    };

    // ─── 4) transform ────────────────────────────────────────────────
    let star = pipeline::run(&csv_path).await?;
    info!(
        time_rows = star.time.len(),
        sector_rows = star.sectors.len(),
        fact_rows = star.facts.len(),
        "star schema built"
    );

    // ─── 5) publish ──────────────────────────────────────────────────
    let sink = ParquetWarehouse::new(&warehouse_dir)?;
    sink.publish(&star)?;
    info!("wrote tables to {}", warehouse_dir.display());

    Ok(())
}
