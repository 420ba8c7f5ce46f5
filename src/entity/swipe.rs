//! Swipe entity model.

use sea_orm::entity::prelude::*;

/// One row per `(session_id, participant_handle, candidate_id)`.
///
/// The triple carries a UNIQUE index (created by the migration), which is what
/// makes the first decision win even under concurrent submissions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "swipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub session_id: String,

    #[sea_orm(column_type = "Text")]
    pub participant_handle: String,

    #[sea_orm(column_type = "Text")]
    pub candidate_id: String,

    /// `left` or `right`.
    #[sea_orm(column_type = "Text")]
    pub direction: String,

    /// MessagePack serialized candidate snapshot.
    pub candidate_snapshot: Vec<u8>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
