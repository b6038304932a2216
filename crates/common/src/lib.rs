//! Shared building blocks for the stocks service crates.

pub mod types;

pub mod utils {
    pub mod logging;
}
