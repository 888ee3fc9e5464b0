pub mod annotate;
pub mod inspector;
pub mod temporal;

pub use annotate::{annotate_series, annotate_series_json};
pub use inspector::{has_no_hits, hit_count, is_response_empty};
pub use temporal::{compute_date_buckets, generate_buckets, DateBucket, Granularity};
