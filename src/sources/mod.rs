//! Item sources that feed the grouping engine

pub mod cloud;
pub mod filesystem;

pub use cloud::{CloudAsset, CloudAssetResolver, CloudLibraryExport};
pub use filesystem::{DiscoveryOptions, FileDiscovery, FileRecord, FileResolver};
