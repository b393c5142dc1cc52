//! Star-schema ETL for the SRI IAENP monthly economic-indicator dataset:
//! parse the wide `;`-delimited source CSV, derive the time and sector
//! dimensions, melt the indicator columns into fact rows with resolved
//! surrogate keys, and publish the three tables as Parquet.

pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod source;
pub mod star;
pub mod warehouse;
