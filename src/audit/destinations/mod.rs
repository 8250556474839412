//! Destination adapters.

pub mod api;
pub mod cloud;
pub mod console;
pub mod database;
pub mod file;
pub mod local_store;

pub use api::ApiDestination;
pub use cloud::CloudDestination;
pub use console::ConsoleDestination;
pub use database::DatabaseDestination;
pub use file::FileDestination;
pub use local_store::LocalStoreDestination;
