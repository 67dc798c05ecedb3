//! CLI command implementations

pub mod download;
pub mod error;
pub mod list;

pub use download::{Cli, Commands, DownloadArgs, OutputFormat};
pub use error::CliError;
pub use list::{list_catalog, CatalogListing, ListArgs, ListedEntry};
