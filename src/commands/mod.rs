mod export;
mod filter;
mod metrics;
mod normalize;
mod page;
mod sort;
mod top;
mod util;

pub use export::Export;
pub use filter::Filter;
pub use metrics::Metrics;
pub use normalize::Normalize;
pub use page::Page;
pub use sort::Sort;
pub use top::Top;
