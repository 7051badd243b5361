//! Core value types: media kinds, day buckets, source descriptors and groups

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::key::{KeyMode, extract_canonical_key};

/// Type class of a capture file.
///
/// Only stills and motion clips take part in grouping. Anything else is
/// unsupported and never becomes a [`SourceDescriptor`]; classification
/// functions return `None` for it.
///
/// ```rust
/// use moments::data::MediaKind;
///
/// assert_eq!(MediaKind::from_extension("HEIC"), Some(MediaKind::Image));
/// assert_eq!(MediaKind::from_extension("mov"), Some(MediaKind::Video));
/// assert_eq!(MediaKind::from_extension("aae"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
	/// Still images (JPEG, HEIC, RAW, ...)
	Image,
	/// Motion clips (MOV, MP4, ...)
	Video,
}

impl MediaKind {
	/// Classify a bare extension, case-insensitively.
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_ascii_lowercase().as_str() {
			"jpg" | "jpeg" | "heic" | "heif" | "png" | "gif" | "tif" | "tiff" | "webp" | "dng"
			| "raw" | "cr2" | "nef" | "arw" | "bmp" => Some(MediaKind::Image),
			"mov" | "mp4" | "m4v" | "avi" | "3gp" | "mkv" | "mts" | "m2ts" | "hevc" | "webm" => {
				Some(MediaKind::Video)
			}
			_ => None,
		}
	}

	/// Classify a file name or path by its extension.
	pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
		path.as_ref()
			.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}
}

impl std::fmt::Display for MediaKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			MediaKind::Image => write!(f, "image"),
			MediaKind::Video => write!(f, "video"),
		}
	}
}

/// Calendar day a capture falls on. Time of day is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayBucket(NaiveDate);

impl DayBucket {
	pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
		NaiveDate::from_ymd_opt(year, month, day).map(Self)
	}

	pub fn year(&self) -> i32 {
		self.0.year()
	}

	pub fn month(&self) -> u32 {
		self.0.month()
	}

	pub fn day(&self) -> u32 {
		self.0.day()
	}
}

impl From<NaiveDate> for DayBucket {
	fn from(date: NaiveDate) -> Self {
		Self(date)
	}
}

impl From<NaiveDateTime> for DayBucket {
	fn from(timestamp: NaiveDateTime) -> Self {
		Self(timestamp.date())
	}
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DayBucket {
	fn from(timestamp: DateTime<Tz>) -> Self {
		Self(timestamp.date_naive())
	}
}

impl std::fmt::Display for DayBucket {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0.format("%Y-%m-%d"))
	}
}

/// Grouping identity of a descriptor: day bucket plus canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IdentityKey {
	pub day: DayBucket,
	pub canonical_key: String,
}

/// One file as seen by the grouping engine.
///
/// Equality and hashing only consider the day bucket and the canonical key,
/// so an original and its edit compare equal. `full_name` and `kind` are
/// carried along for ordering and for mapping results back to real files.
/// Use [`SourceDescriptor::same_file`] to compare actual files and
/// [`SourceDescriptor::cmp_precedence`] for the total order.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDescriptor {
	day: DayBucket,
	canonical_key: String,
	full_name: String,
	kind: MediaKind,
}

impl SourceDescriptor {
	/// Build a descriptor, deriving the canonical key from `full_name`.
	pub fn new(
		taken_at: impl Into<DayBucket>,
		full_name: impl Into<String>,
		kind: MediaKind,
		mode: KeyMode,
	) -> Self {
		let full_name = full_name.into();
		let canonical_key = extract_canonical_key(&full_name, mode);
		Self {
			day: taken_at.into(),
			canonical_key,
			full_name,
			kind,
		}
	}

	pub fn day(&self) -> DayBucket {
		self.day
	}

	pub fn canonical_key(&self) -> &str {
		&self.canonical_key
	}

	pub fn full_name(&self) -> &str {
		&self.full_name
	}

	pub fn kind(&self) -> MediaKind {
		self.kind
	}

	pub fn identity(&self) -> IdentityKey {
		IdentityKey {
			day: self.day,
			canonical_key: self.canonical_key.clone(),
		}
	}

	/// Same physical file: identity, full name and kind all match.
	pub fn same_file(&self, other: &SourceDescriptor) -> bool {
		self == other && self.full_name == other.full_name && self.kind == other.kind
	}

	/// Total precedence order used to elect the main asset.
	///
	/// Earlier day first, then shorter full name, then byte-wise full name,
	/// then images before videos.
	pub fn cmp_precedence(&self, other: &SourceDescriptor) -> Ordering {
		self.day
			.cmp(&other.day)
			.then_with(|| self.full_name.len().cmp(&other.full_name.len()))
			.then_with(|| self.full_name.cmp(&other.full_name))
			.then_with(|| self.kind.cmp(&other.kind))
	}
}

impl PartialEq for SourceDescriptor {
	fn eq(&self, other: &Self) -> bool {
		self.day == other.day && self.canonical_key == other.canonical_key
	}
}

impl Eq for SourceDescriptor {}

impl Hash for SourceDescriptor {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.day.hash(state);
		self.canonical_key.hash(state);
	}
}

/// Files that belong to one captured moment.
///
/// `edited` and `live`, when present, share the identity of `main` but name a
/// different file. `live` is always a video.
#[derive(Debug, Clone, Serialize)]
pub struct MediaGroup {
	pub main: SourceDescriptor,
	pub edited: Option<SourceDescriptor>,
	pub live: Option<SourceDescriptor>,
}

impl MediaGroup {
	pub fn singleton(main: SourceDescriptor) -> Self {
		Self {
			main,
			edited: None,
			live: None,
		}
	}

	/// Total order over groups: `main`, then `edited`, then `live`, with an
	/// empty slot sorting before a filled one.
	pub fn cmp_precedence(&self, other: &MediaGroup) -> Ordering {
		self.main
			.cmp_precedence(&other.main)
			.then_with(|| cmp_slot(self.edited.as_ref(), other.edited.as_ref()))
			.then_with(|| cmp_slot(self.live.as_ref(), other.live.as_ref()))
	}

	/// Every descriptor in the group, main first.
	pub fn members(&self) -> impl Iterator<Item = &SourceDescriptor> {
		std::iter::once(&self.main)
			.chain(self.edited.as_ref())
			.chain(self.live.as_ref())
	}
}

fn cmp_slot(a: Option<&SourceDescriptor>, b: Option<&SourceDescriptor>) -> Ordering {
	match (a, b) {
		(None, None) => Ordering::Equal,
		(None, Some(_)) => Ordering::Less,
		(Some(_), None) => Ordering::Greater,
		(Some(a), Some(b)) => a.cmp_precedence(b),
	}
}
