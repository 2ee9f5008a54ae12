//! X (Twitter) API adapters

mod read;

pub use read::XTimelineSource;
