//! Three-pass grouping of descriptors into capture moments.
//!
//! Images are grouped first, videos are then attached as live companions, and
//! any remaining videos are folded into existing groups or stand alone. The
//! engine holds no state between calls and never fails.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, trace};

use crate::data::{IdentityKey, MediaGroup, MediaKind, SourceDescriptor};
use crate::key::KeyMode;

/// What happens when a third file competes for the `edited` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditedSlotPolicy {
	/// The most recently processed loser takes the slot. Depends on input order.
	#[default]
	LastWins,
	/// The two order-minimal files keep `main` and `edited`. Independent of
	/// input order.
	KeepOrderMinimal,
}

/// Caller-supplied settings for a grouping run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingConfig {
	/// Naming convention used when adapters build descriptors. Set by the
	/// source, never read from persisted config.
	#[serde(skip)]
	pub key_mode: KeyMode,
	/// Resolution of contended `edited` slots
	pub edited_policy: EditedSlotPolicy,
}

impl GroupingConfig {
	pub fn with_key_mode(mut self, key_mode: KeyMode) -> Self {
		self.key_mode = key_mode;
		self
	}

	pub fn with_edited_policy(mut self, policy: EditedSlotPolicy) -> Self {
		self.edited_policy = policy;
		self
	}
}

/// Group descriptors with the default configuration.
///
/// ```rust
/// use moments::data::{DayBucket, MediaKind, SourceDescriptor};
/// use moments::grouping::group_related_media;
/// use moments::key::KeyMode;
///
/// let day = DayBucket::from_ymd(2024, 5, 1).unwrap();
/// let groups = group_related_media(vec![
///     SourceDescriptor::new(day, "IMG_1234.HEIC", MediaKind::Image, KeyMode::Standard),
///     SourceDescriptor::new(day, "IMG_1234.MOV", MediaKind::Video, KeyMode::Standard),
/// ]);
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].live.as_ref().unwrap().full_name(), "IMG_1234.MOV");
/// ```
pub fn group_related_media(descriptors: Vec<SourceDescriptor>) -> Vec<MediaGroup> {
	group_related_media_with(descriptors, &GroupingConfig::default())
}

/// Group descriptors into moments, sorted by group precedence.
pub fn group_related_media_with(
	descriptors: Vec<SourceDescriptor>,
	config: &GroupingConfig,
) -> Vec<MediaGroup> {
	let total = descriptors.len();
	let (images, videos): (Vec<_>, Vec<_>) = descriptors
		.into_iter()
		.partition(|d| d.kind() == MediaKind::Image);
	let mut records: HashMap<IdentityKey, MediaGroup> = HashMap::with_capacity(images.len());

	for image in images {
		match records.entry(image.identity()) {
			Entry::Occupied(mut entry) => {
				assign_variant(entry.get_mut(), image, config.edited_policy)
			}
			Entry::Vacant(entry) => {
				entry.insert(MediaGroup::singleton(image));
			}
		}
	}

	let mut linked = 0usize;
	for video in &videos {
		if let Some(record) = records.get_mut(&video.identity()) {
			if record.live.as_ref().is_some_and(|live| live.same_file(video)) {
				debug!("Grouping: dropping duplicate {}", video.full_name());
				continue;
			}
			trace!("Grouping: {} is live for {}", video.full_name(), record.main.full_name());
			record.live = Some(video.clone());
			linked += 1;
		}
	}

	for video in videos {
		match records.entry(video.identity()) {
			Entry::Occupied(mut entry) => {
				let record = entry.get_mut();
				// Consumed in pass 2
				if record.live.as_ref().is_some_and(|live| *live == video) {
					trace!("Grouping: {} already linked", video.full_name());
					continue;
				}
				assign_variant(record, video, config.edited_policy);
			}
			Entry::Vacant(entry) => {
				entry.insert(MediaGroup::singleton(video));
			}
		}
	}

	let mut groups: Vec<MediaGroup> = records.into_values().collect();
	groups.sort_by(|a, b| a.cmp_precedence(b));
	debug!(
		"Grouping: {} descriptors -> {} groups ({} live links)",
		total,
		groups.len(),
		linked
	);
	groups
}

/// Fold `candidate` into a record that already has a `main`.
///
/// Members of a record share its identity, so a repeated full name is a
/// duplicate even when the media kinds differ.
fn assign_variant(record: &mut MediaGroup, candidate: SourceDescriptor, policy: EditedSlotPolicy) {
	if record
		.members()
		.any(|member| member.full_name() == candidate.full_name())
	{
		debug!("Grouping: dropping duplicate {}", candidate.full_name());
		return;
	}

	let mut demoted = candidate;
	if demoted.cmp_precedence(&record.main).is_lt() {
		std::mem::swap(&mut record.main, &mut demoted);
	}

	let keep_current = policy == EditedSlotPolicy::KeepOrderMinimal
		&& record
			.edited
			.as_ref()
			.is_some_and(|current| current.cmp_precedence(&demoted).is_lt());
	if keep_current {
		debug!(
			"Grouping: {} not kept for {}",
			demoted.full_name(),
			record.main.full_name()
		);
		return;
	}

	if let Some(replaced) = record.edited.replace(demoted) {
		debug!(
			"Grouping: {} displaced from edited of {}",
			replaced.full_name(),
			record.main.full_name()
		);
	}
}
