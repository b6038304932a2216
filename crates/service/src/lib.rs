//! Storage layer for stock entries.
//! - `stock::gateway` defines the `StockGateway` seam handlers depend on.
//! - `SeaOrmStockGateway` runs parameterized statements on the shared pool.
//! - `stock::mock` holds an in-memory double for handler tests.

pub mod errors;
pub mod stock;
#[cfg(test)]
pub mod test_support;
