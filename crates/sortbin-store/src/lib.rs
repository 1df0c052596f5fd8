pub mod database;
pub mod dustbins;
pub mod error;
pub mod schema;
pub mod users;
pub mod wastes;

pub use database::Database;
pub use error::StoreError;
