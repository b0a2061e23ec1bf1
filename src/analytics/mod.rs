//! Analytics aggregation engine
//!
//! The core of the product: date-range resolution, visitor fingerprinting,
//! beacon ingestion, time-bucketed counting, top-page ranking, and chart
//! geometry. Everything here is request-scoped and stateless between calls;
//! all shared state lives behind the [`crate::storage::Storage`] trait.

pub mod chart;
pub mod daterange;
pub mod ingest;
pub mod models;
pub mod timeseries;
pub mod toppages;
pub mod visitor;

pub use chart::BarChart;
pub use daterange::{BucketGranularity, DateRangeSelector, ResolvedRange};
pub use ingest::{IngestError, PageViewCollector, RawPageView};
pub use models::{NewPageView, PageViewRecord, PaginatedPageRow, TimeSeriesPoint};
pub use timeseries::TimeSeriesAggregator;
pub use toppages::TopPagesPaginator;
