mod errors;
pub mod migration;
mod models;
mod resolver;
mod schema;
mod store;
mod trait_def;

pub use errors::{CatalogError, CatalogResult};
pub use migration::{migrate, MigrationReport, CATALOG_MIGRATIONS, CURRENT_CATALOG_VERSION};
pub use models::*;
pub use schema::CATALOG_TABLES;
pub use store::{SqliteCatalogStore, DEFAULT_READ_POOL_SIZE};
pub use trait_def::CatalogStore;
