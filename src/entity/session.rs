//! Session entity model.
//!
//! Maps the `session` table. Membership changes go through conditional
//! updates keyed on `revision`, see `SeaOrmStore`.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing one live session.
///
/// # Database Schema
///
/// | Column       | Type               | Description                               |
/// |--------------|--------------------|-------------------------------------------|
/// | id           | TEXT (Primary Key) | Session ID (UUID)                         |
/// | join_key     | TEXT (Unique)      | Short human-shareable join key            |
/// | filters      | BYTEA              | MessagePack serialized search filters     |
/// | latitude     | DOUBLE             | Session location                          |
/// | longitude    | DOUBLE             | Session location                          |
/// | participants | BYTEA              | MessagePack serialized participant list   |
/// | status       | TEXT               | `waiting`, `active` or `completed`        |
/// | revision     | BIGINT             | Bumped on every membership/status write   |
/// | created_at   | TIMESTAMPTZ        | Creation timestamp                        |
/// | expiry_date  | TIMESTAMPTZ        | End of the retention window               |
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    /// Unique across all stored sessions; expired holders are cleared on creation.
    #[sea_orm(column_type = "Text", unique)]
    pub join_key: String,

    pub filters: Vec<u8>,

    pub latitude: f64,

    pub longitude: f64,

    /// Ordered participant list, at most two entries.
    pub participants: Vec<u8>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Optimistic concurrency token for conditional membership updates.
    pub revision: i64,

    pub created_at: DateTimeWithTimeZone,

    /// Rows past this instant read as missing and are removed by the sweep.
    pub expiry_date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
