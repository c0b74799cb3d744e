use postman_primitives::{AnchoringEvent, Direction};
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents an anchoring event observed on the destination chain.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "anchoring")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    direction: String,
    #[sea_orm(primary_key, auto_increment = false)]
    anchoring_key: Vec<u8>,
    pub(crate) block_number: i64,
}

/// The relation for the anchoring model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the anchoring model.
impl ActiveModelBehavior for ActiveModel {}

impl From<(Direction, AnchoringEvent)> for ActiveModel {
    fn from((direction, event): (Direction, AnchoringEvent)) -> Self {
        Self {
            direction: ActiveValue::Set(direction.to_string()),
            anchoring_key: ActiveValue::Set(event.id.key().to_vec()),
            block_number: ActiveValue::Set(event.block_number as i64),
        }
    }
}
