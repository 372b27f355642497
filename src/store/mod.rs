//! Persistence layer: one module per table, row structs plus query
//! functions. Single-statement helpers take `impl PgExecutor` so the
//! checkout transaction can drive them; multi-statement operations own
//! their transaction.

pub mod carts;
pub mod consultations;
pub mod favorites;
pub mod orders;
pub mod outbox;
pub mod products;
pub mod sessions;
