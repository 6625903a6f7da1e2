pub mod bucket;

pub use bucket::StagingBucket;
