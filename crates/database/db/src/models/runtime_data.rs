use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that persists the runtime identity of the syncer that owns
/// the database. A single row with id 1 exists at most.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "runtime_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    id: i32,
    chain_id: i64,
    /// JSON-encoded list of contract addresses.
    addresses: String,
}

/// The relation for the runtime data model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the runtime data model.
impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<aggkit_primitives::RuntimeData> for ActiveModel {
    type Error = serde_json::Error;

    fn try_from(value: aggkit_primitives::RuntimeData) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(1),
            chain_id: ActiveValue::Set(
                value.chain_id.try_into().expect("chain id should fit in i64"),
            ),
            addresses: ActiveValue::Set(serde_json::to_string(&value.addresses)?),
        })
    }
}

impl TryFrom<Model> for aggkit_primitives::RuntimeData {
    type Error = serde_json::Error;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            chain_id: value.chain_id as u64,
            addresses: serde_json::from_str(&value.addresses)?,
        })
    }
}
