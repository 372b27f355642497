//! Aggregates module
pub mod cart;
pub mod consultation;
pub mod order;
pub mod product;

pub use cart::{Cart, CartError, CartItem};
pub use consultation::{Consultation, ConsultationError, ConsultationStatus};
pub use order::{Order, OrderError, OrderLine, OrderStatus, PaymentState, ShippingAddress};
pub use product::{Product, ProductError, ProductStatus, StockStatus};
