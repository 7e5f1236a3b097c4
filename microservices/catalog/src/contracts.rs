//! Bus contracts published and consumed by the catalog service.
//!
//! Published events carry the state other services cache; the price
//! adjustment command comes in from the pricing side and is applied to the
//! stored item.

use async_trait::async_trait;
use mercato_bus::{Consumer, Message};
use mercato_mongo::Repository;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::items::Item;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreated {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

impl Message for ItemCreated {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

impl Message for ItemUpdated {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDeleted {
    pub id: Uuid,
}

impl Message for ItemDeleted {}

/// Price change decided elsewhere; the catalog applies it to the stored item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAdjusted {
    pub id: Uuid,
    pub price: Decimal,
}

impl Message for PriceAdjusted {}

pub struct PriceAdjustedConsumer {
    items: Arc<dyn Repository<Item>>,
}

impl PriceAdjustedConsumer {
    pub fn new(items: Arc<dyn Repository<Item>>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl Consumer<PriceAdjusted> for PriceAdjustedConsumer {
    async fn consume(&self, message: PriceAdjusted) -> anyhow::Result<()> {
        let Some(mut item) = self.items.get(message.id).await? else {
            anyhow::bail!("price adjustment for unknown item {}", message.id);
        };

        item.price = message.price;
        self.items.update(&item).await?;

        info!(item_id = %message.id, price = %message.price, "Item price adjusted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mercato_mongo::InMemoryRepository;
    use rust_decimal_macros::dec;

    fn item(price: Decimal) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: "Antidote".to_string(),
            description: "Cures poison".to_string(),
            price,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn price_adjustment_updates_the_stored_item() {
        let items: Arc<dyn Repository<Item>> = Arc::new(InMemoryRepository::new());
        let stored = item(dec!(10));
        items.create(&stored).await.unwrap();

        let consumer = PriceAdjustedConsumer::new(items.clone());
        consumer
            .consume(PriceAdjusted { id: stored.id, price: dec!(12.50) })
            .await
            .unwrap();

        let reloaded = items.get(stored.id).await.unwrap().unwrap();
        assert_eq!(reloaded.price, dec!(12.50));
        assert_eq!(reloaded.name, "Antidote");
    }

    #[tokio::test]
    async fn price_adjustment_for_unknown_item_fails() {
        let items: Arc<dyn Repository<Item>> = Arc::new(InMemoryRepository::new());
        let consumer = PriceAdjustedConsumer::new(items);

        let result = consumer
            .consume(PriceAdjusted { id: Uuid::new_v4(), price: dec!(1) })
            .await;
        assert!(result.is_err());
    }
}
