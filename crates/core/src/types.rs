/// Project, dataset and video identifiers are opaque strings. Backends with
/// numeric ids render them as text.
pub type EntityId = String;

/// All occurrence and frame counts.
pub type Count = u64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
