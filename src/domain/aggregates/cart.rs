//! Cart aggregate.
//!
//! Line items carry a denormalized snapshot of the product (name, price,
//! image) taken at add time, so carts render without a catalog join and a
//! later price change does not silently reprice an existing cart.

use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Cart {
    user_id: String,
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CartItem {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

impl Cart {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            items: vec![],
            updated_at: Utc::now(),
        }
    }

    pub fn from_items(user_id: impl Into<String>, items: Vec<CartItem>) -> Self {
        Self {
            user_id: user_id.into(),
            items,
            updated_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, i| acc.add(i.line_total()))
    }

    /// Adds an item, merging quantity when the product is already present.
    /// The existing snapshot wins on merge.
    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id)
        {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        self.updated_at = Utc::now();
    }

    /// Quantity 0 removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(CartError::ItemNotFound)?;
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else {
            item.quantity = quantity;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(CartError::ItemNotFound);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }
}

pub fn new_item_id() -> String {
    Uuid::now_v7().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("item not found in cart")]
    ItemNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, qty: u32, price: i64) -> CartItem {
        CartItem {
            id: new_item_id(),
            product_id: product_id.into(),
            name: format!("product {product_id}"),
            unit_price: Money::from_minor(price),
            quantity: qty,
            image_url: None,
        }
    }

    #[test]
    fn add_merges_same_product() {
        let mut cart = Cart::new("u1");
        cart.add_item(item("P1", 2, 1_500_00));
        cart.add_item(item("P1", 1, 1_500_00));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.subtotal().minor(), 4_500_00);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::new("u1");
        cart.add_item(item("P1", 2, 100));
        cart.update_quantity("P1", 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_missing_item_errors() {
        let mut cart = Cart::new("u1");
        assert_eq!(cart.remove_item("nope"), Err(CartError::ItemNotFound));
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let mut cart = Cart::new("u1");
        cart.add_item(item("P1", 2, 1_000_00));
        cart.add_item(item("P2", 1, 2_500_00));
        assert_eq!(cart.subtotal().minor(), 4_500_00);
    }
}
