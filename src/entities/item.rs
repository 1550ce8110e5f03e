use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Catalogue grouping for stocked items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemGroup {
    GroupOne,
    GroupTwo,
}

impl ItemGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemGroup::GroupOne => "G-1",
            ItemGroup::GroupTwo => "G-2",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "G-1" => Some(ItemGroup::GroupOne),
            "G-2" => Some(ItemGroup::GroupTwo),
            _ => None,
        }
    }
}

/// Unit of measurement an item is stocked and requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemUnit {
    UnitOne,
    UnitTwo,
}

impl ItemUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemUnit::UnitOne => "U-1",
            ItemUnit::UnitTwo => "U-2",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "U-1" => Some(ItemUnit::UnitOne),
            "U-2" => Some(ItemUnit::UnitTwo),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub item_id: i64,
    #[sea_orm(unique)]
    pub item_name: String,
    pub item_group: String,
    pub unit_of_measurement: String,
    /// Quantity on hand. Never negative; decremented only by the status
    /// transition engine or direct item edits.
    pub quantity: i32,
    pub price_without_vat: Decimal,
    pub status: String,
    pub storage_location: Option<String>,
    pub contact_person: Option<String>,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::request::Entity")]
    Request,
    #[sea_orm(has_many = "super::request_row::Entity")]
    RequestRow,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl Related<super::request_row::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequestRow.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_group_round_trips_codes() {
        assert_eq!(ItemGroup::GroupOne.as_str(), "G-1");
        assert_eq!(ItemGroup::from_str("G-2"), Some(ItemGroup::GroupTwo));
        assert_eq!(ItemGroup::from_str("G-9"), None);
    }

    #[test]
    fn item_unit_round_trips_codes() {
        assert_eq!(ItemUnit::UnitTwo.as_str(), "U-2");
        assert_eq!(ItemUnit::from_str("U-1"), Some(ItemUnit::UnitOne));
        assert_eq!(ItemUnit::from_str(""), None);
    }
}
