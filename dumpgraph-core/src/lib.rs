//! # dumpgraph-core
//!
//! Core library for dumpgraph - long-term activity statistics charts from
//! archived dump files.
//!
//! This library provides:
//! - Domain types for content types, guilds, and members
//! - Corpus enumeration and per-content-type scanners
//! - Time series, tabular artifacts, and chart composition
//! - The request pipeline with single-flight and rate-limit throttling
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! A request flows through one pipeline:
//! validate -> throttle -> snapshot corpus -> scan series -> tabular
//! artifact -> chart -> image artifact -> deliver -> cleanup.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dumpgraph_core::{Config, Guild, Member, RequestPipeline};
//!
//! # async fn example() -> dumpgraph_core::Result<()> {
//! let config = Config::load()?;
//! let pipeline = RequestPipeline::new(&config)?;
//!
//! let guild = Guild { id: 1, name: "example".into() };
//! let me = Member { id: 42, display_name: "me".into() };
//! let image = pipeline.run_multi_metric(&guild, &["messages"], &me).await?;
//! std::fs::write(&image.filename, &image.bytes)?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use chart::{ChartEngine, ChartModel, PlottedSeries, SvgChartEngine};
pub use config::Config;
pub use corpus::{CorpusHandle, CorpusScanner};
pub use error::{ArgSlot, Error, Result};
pub use pipeline::{ChartImage, RequestPipeline, MAX_OVERLAYS};
pub use scanners::{ContentScanner, ScannerRegistry};
pub use series::{CsvTable, TimeSeries};
pub use types::{ContentType, Guild, Member};

// Public modules
pub mod chart;
pub mod config;
pub mod corpus;
pub mod error;
pub mod gate;
pub mod logging;
pub mod pipeline;
pub mod scanners;
pub mod series;
pub mod types;
