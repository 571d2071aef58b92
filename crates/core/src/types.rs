/// Images and generation jobs use PostgreSQL BIGSERIAL keys.
pub type DbId = i64;

/// Users are owned by the external auth provider and identified by UUID.
pub type UserId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
