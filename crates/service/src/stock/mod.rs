pub mod gateway;
pub mod mock;

pub use gateway::{FetchOutcome, SeaOrmStockGateway, StockGateway};
