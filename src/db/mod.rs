pub mod connection;
pub mod cursor;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::DatabaseConnection;
pub use error::DbError;
