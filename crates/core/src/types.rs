/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Preparation ids are the upstream payment/order identifiers.
pub type PreparationId = String;

/// 1-based rank among RECEIVED preparations.
pub type Position = i32;
