pub mod connection;
pub mod errors;
pub mod memory;
pub mod postgres;
pub mod seed;
pub mod store;


pub use connection::*;
pub use errors::*;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use seed::{PoolSeed, SeedData};
pub use store::EntityStore;

#[cfg(test)]
pub use store::MockEntityStore;
