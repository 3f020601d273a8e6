pub mod ledger;
pub mod orders;
pub mod pool;
pub mod registry;
pub mod schema;

pub use pool::create_pool;
pub use schema::ensure_schema;
