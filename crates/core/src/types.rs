/// Every apply flow instance is identified by a random UUID.
pub type FlowId = uuid::Uuid;

/// Children inside a flow carry their own UUID.
pub type ChildId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
