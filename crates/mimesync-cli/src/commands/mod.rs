//! Command implementations for the mimesync CLI

mod append;
mod get;
mod list;
mod refresh;
mod watch;

pub use append::execute as append_extensions;
pub use get::execute as get_types;
pub use list::execute as list_types;
pub use refresh::execute as refresh_feeds;
pub use watch::execute as watch_feeds;
