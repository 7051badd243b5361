//! Canonical-key extraction from file names.
//!
//! A canonical key is what is left of a file name once cosmetic decorations
//! are removed: the extension, edit markers and sequence suffixes. Two files
//! whose keys match on the same day are candidates for the same capture.
//!
//! Two naming conventions are supported:
//!
//! - [`KeyMode::Standard`] for device and filesystem names such as
//!   `IMG_1234.HEIC`, `IMG_E1234.JPG` or `IMG_1234 (Edited).JPG`.
//! - [`KeyMode::CloudLibrary`] for cloud-library exports where assets are
//!   named by UUID and companions carry a numeric `_<n>` suffix.
//!
//! Everything here is pure and total.

use serde::{Deserialize, Serialize};

/// Suffix appended by desktop photo tools to exported edits.
const EDITED_SUFFIX: &str = " (Edited)";

/// Suffix some export tools use to label edited copies.
const EDITED_LABEL_SUFFIX: &str = "_Edited";

/// Marker inserted by iOS in front of the sequence number of an edited copy.
const INSERTED_EDIT_MARKER: char = 'E';

/// Naming convention used to derive canonical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
	/// Device / filesystem names (`IMG_1234.JPG`)
	#[default]
	Standard,
	/// Cloud-library UUID names (`<uuid>.jpeg`, `<uuid>_3.mov`)
	CloudLibrary,
}

impl std::fmt::Display for KeyMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			KeyMode::Standard => write!(f, "standard"),
			KeyMode::CloudLibrary => write!(f, "cloud-library"),
		}
	}
}

/// Derive the canonical matching key for `full_name` under `mode`.
///
/// ```rust
/// use moments::key::{extract_canonical_key, KeyMode};
///
/// assert_eq!(extract_canonical_key("IMG_E1234.JPG", KeyMode::Standard), "IMG_1234");
/// assert_eq!(extract_canonical_key("IMG_1234 (Edited).JPG", KeyMode::Standard), "IMG_1234");
/// assert_eq!(extract_canonical_key("AB12_3.mov", KeyMode::CloudLibrary), "AB12");
/// ```
pub fn extract_canonical_key(full_name: &str, mode: KeyMode) -> String {
	let stem = strip_extension(full_name);
	match mode {
		KeyMode::Standard => {
			let stem = stem.strip_suffix(EDITED_SUFFIX).unwrap_or(stem);
			collapse_inserted_edit_marker(stem)
		}
		KeyMode::CloudLibrary => strip_sequence_suffix(stem).to_string(),
	}
}

/// Whether an extension-less file name is labelled as an edited copy.
///
/// Recognizes the ` (Edited)` and `_Edited` suffixes. This is a scan-time
/// classification and plays no part in key extraction.
pub fn is_edited_label(base: &str) -> bool {
	base.ends_with(EDITED_SUFFIX) || base.ends_with(EDITED_LABEL_SUFFIX)
}

/// Remove the text after the final `.`, whatever it is.
///
/// Names without a dot and dotfiles (`.hidden`) are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
	match name.rfind('.') {
		None | Some(0) => name,
		Some(idx) => &name[..idx],
	}
}

/// `IMG_E1234` -> `IMG_1234`. Requires a non-empty prefix before the `E` and
/// a non-empty run of ASCII digits after it.
fn collapse_inserted_edit_marker(stem: &str) -> String {
	let digits_start = stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
	if digits_start == stem.len() {
		return stem.to_string();
	}

	match stem[..digits_start].strip_suffix(INSERTED_EDIT_MARKER) {
		Some(prefix) if !prefix.is_empty() => {
			let mut key = String::with_capacity(stem.len() - 1);
			key.push_str(prefix);
			key.push_str(&stem[digits_start..]);
			key
		}
		_ => stem.to_string(),
	}
}

/// `<base>_<digits>` -> `<base>`; any other suffix is kept.
fn strip_sequence_suffix(stem: &str) -> &str {
	if let Some((base, sequence)) = stem.rsplit_once('_')
		&& !base.is_empty()
		&& !sequence.is_empty()
		&& sequence.bytes().all(|b| b.is_ascii_digit())
	{
		return base;
	}
	stem
}
