//! SQLite storage: pool setup, migrations, the read-only query
//! executor, cost persistence, and demo fixtures.

pub mod connection;
pub mod cost;
pub mod executor;
pub mod fixtures;
pub mod migrations;

pub use connection::{connect_from_config, connect_with_settings, DbPool};
pub use cost::SqliteCostRecorder;
pub use executor::SqliteQueryExecutor;
pub use fixtures::{seed_demo_data, SeedResult};
