//! # Capture Moment Grouping
//!
//! Reconstructs which files belong to one captured moment: the main asset,
//! an optional edited variant and an optional live (motion) clip. Matching
//! uses only file names, capture days and media kinds.

pub mod adapter;
pub mod context;
pub mod data;
pub mod detector;
pub mod error;
pub mod grouping;
pub mod key;
pub mod sources;

// Re-export main API types
pub use adapter::{ItemResolver, LookupTable, MediaAdapter, ResolvedGroup, ResolvedItem};
pub use context::ScanContext;
pub use data::{DayBucket, MediaGroup, MediaKind, SourceDescriptor};
pub use detector::{DetectorConfig, MomentDetector};
pub use error::{DetectorError, DetectorResult};
pub use grouping::{EditedSlotPolicy, GroupingConfig, group_related_media, group_related_media_with};
pub use key::{KeyMode, extract_canonical_key, is_edited_label};
