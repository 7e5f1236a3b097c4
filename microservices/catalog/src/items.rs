//! Catalog item entity and HTTP transfer types.

use chrono::{DateTime, Utc};
use mercato_core::Entity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog item as stored in the `items` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Entity for Item {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemDto {
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemDto {
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

/// Outward shape of an item; the storage key is exposed as `id`.
#[derive(Debug, Serialize)]
pub struct ItemDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            price: item.price,
            created_at: item.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercato_mongo::bson;
    use rust_decimal_macros::dec;

    #[test]
    fn item_stores_its_id_under_underscore_id() {
        let item = Item {
            id: Uuid::new_v4(),
            name: "Potion".to_string(),
            description: "Restores HP".to_string(),
            price: dec!(5),
            created_at: Utc::now(),
        };

        let doc = bson::to_document(&item).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), item.id.to_string());
        assert!(doc.get("id").is_none());
    }
}
