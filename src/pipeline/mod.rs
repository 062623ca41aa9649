//! Client-side data pipeline for speed-meter verification records.
//!
//! raw rows → [`normalize`] → records → [`index`] (once per record set) and
//! [`filter`] (per criteria change) → [`metrics`] and [`sort`] /
//! [`paginate`] → [`export`] views.

pub mod app_state;
pub mod cache;
pub mod debounce;
pub mod export;
pub mod filter;
pub mod index;
pub mod metrics;
pub mod normalize;
pub mod paginate;
pub mod presets;
pub mod record;
pub mod sample;
pub mod sort;
pub mod source;
pub mod states;

#[cfg(feature = "cache")]
pub mod storage;
