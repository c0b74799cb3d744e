use sea_orm::entity::prelude::*;

/// A database model that represents the last fully processed block for an event stream.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "watermark")]
pub struct Model {
    /// The watermark key, composed of the direction and the event kind.
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// The highest processed block number.
    pub block_number: i64,
}

/// The relation for the watermark model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the watermark model.
impl ActiveModelBehavior for ActiveModel {}
