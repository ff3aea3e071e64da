//! SQLite database management

pub mod claims;
pub mod connection;
pub mod ledger;
pub mod sessions;
pub mod settings;

pub use claims::*;
pub use connection::Database;
pub use ledger::*;
pub use sessions::*;
pub use settings::*;
