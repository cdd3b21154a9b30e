//! Rolling-window statistics estimators used for jitter/latency metrics
//! (spec.md §4.M).

pub mod mov_avg;
pub mod mov_histogram;
pub mod mov_minmax;
pub mod mov_quantile;

pub use mov_avg::MovAvg;
pub use mov_histogram::MovHistogram;
pub use mov_minmax::MovMinMax;
pub use mov_quantile::MovQuantile;
