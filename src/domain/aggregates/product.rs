//! Product aggregate.

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Money, Quantity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Product {
    id: String,
    name: String,
    description: String,
    brand: Option<String>,
    category: Option<String>,
    original_price: Money,
    discounted_price: Option<Money>,
    stock: Quantity,
    stock_status: StockStatus,
    status: ProductStatus,
    image_urls: Vec<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

/// Operator-set shelf label. Deliberately not derived from the stock count:
/// merchandising sets it independently of warehouse numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_stock" => Some(StockStatus::InStock),
            "low_stock" => Some(StockStatus::LowStock),
            "out_of_stock" => Some(StockStatus::OutOfStock),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProductStatus::Draft),
            "active" => Some(ProductStatus::Active),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

impl Product {
    pub fn create(name: impl Into<String>, original_price: Money) -> Result<Self, ProductError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProductError::MissingName);
        }
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let mut product = Self {
            id: id.clone(),
            name,
            description: String::new(),
            brand: None,
            category: None,
            original_price,
            discounted_price: None,
            stock: Quantity::default(),
            stock_status: StockStatus::OutOfStock,
            status: ProductStatus::Draft,
            image_urls: vec![],
            tags: vec![],
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id }));
        Ok(product)
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn original_price(&self) -> Money {
        self.original_price
    }
    pub fn discounted_price(&self) -> Option<Money> {
        self.discounted_price
    }
    pub fn stock(&self) -> Quantity {
        self.stock
    }
    pub fn stock_status(&self) -> StockStatus {
        self.stock_status
    }
    pub fn status(&self) -> ProductStatus {
        self.status
    }

    /// Price a buyer actually pays.
    pub fn effective_price(&self) -> Money {
        self.discounted_price.unwrap_or(self.original_price)
    }

    pub fn set_prices(
        &mut self,
        original: Money,
        discounted: Option<Money>,
    ) -> Result<(), ProductError> {
        if let Some(d) = discounted {
            if d > original {
                return Err(ProductError::DiscountAbovePrice);
            }
        }
        self.original_price = original;
        self.discounted_price = discounted;
        self.touch();
        Ok(())
    }

    pub fn set_stock_status(&mut self, status: StockStatus) {
        self.stock_status = status;
        self.touch();
    }

    pub fn publish(&mut self) -> Result<(), ProductError> {
        if self.name.is_empty() {
            return Err(ProductError::MissingName);
        }
        self.status = ProductStatus::Active;
        self.touch();
        Ok(())
    }

    pub fn archive(&mut self) {
        self.status = ProductStatus::Archived;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Archived {
            product_id: self.id.clone(),
        }));
    }

    pub fn add_stock(&mut self, qty: u32) {
        self.stock = self.stock.add(qty);
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockAdjusted {
            product_id: self.id.clone(),
            delta: i64::from(qty),
        }));
    }

    pub fn remove_stock(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock = self
            .stock
            .subtract(qty)
            .ok_or(ProductError::InsufficientStock)?;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockAdjusted {
            product_id: self.id.clone(),
            delta: -i64::from(qty),
        }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, e: DomainEvent) {
        self.events.push(e);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("discounted price exceeds original price")]
    DiscountAbovePrice,
    #[error("insufficient stock")]
    InsufficientStock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_prefers_discount() {
        let mut p = Product::create("Rose Serum", Money::from_minor(12_000_00)).unwrap();
        assert_eq!(p.effective_price().minor(), 12_000_00);
        p.set_prices(Money::from_minor(12_000_00), Some(Money::from_minor(9_500_00)))
            .unwrap();
        assert_eq!(p.effective_price().minor(), 9_500_00);
    }

    #[test]
    fn discount_cannot_exceed_original() {
        let mut p = Product::create("Toner", Money::from_minor(1000)).unwrap();
        let err = p
            .set_prices(Money::from_minor(1000), Some(Money::from_minor(1001)))
            .unwrap_err();
        assert_eq!(err, ProductError::DiscountAbovePrice);
    }

    #[test]
    fn stock_never_goes_negative() {
        let mut p = Product::create("Clay Mask", Money::from_minor(1000)).unwrap();
        p.add_stock(3);
        assert_eq!(p.remove_stock(4), Err(ProductError::InsufficientStock));
        p.remove_stock(3).unwrap();
        assert!(p.stock().is_zero());
    }

    #[test]
    fn stock_status_is_operator_set() {
        let mut p = Product::create("Lip Oil", Money::from_minor(1000)).unwrap();
        p.add_stock(100);
        // Plenty of stock, but the operator can still label it low.
        p.set_stock_status(StockStatus::LowStock);
        assert_eq!(p.stock_status(), StockStatus::LowStock);
    }

    #[test]
    fn create_requires_name() {
        assert!(Product::create("  ", Money::from_minor(1)).is_err());
    }
}
