pub mod db;
pub mod incidents;
pub mod models;
pub mod schema;
pub mod settings;
pub mod vector;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
