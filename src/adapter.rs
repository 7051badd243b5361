//! Adapters between domain items and the grouping engine.
//!
//! An adapter resolves each domain item to a name, capture date and media
//! kind, groups the resulting descriptors, and maps every group back to the
//! original items through a [`LookupTable`]. The table is keyed by day, full
//! name and kind, which is finer than the grouping identity, so two files that
//! share a canonical key are never mixed up when results are rebuilt.
//!
//! Items that fail to resolve, are unsupported, or are skipped because the
//! scan was cancelled are left out before grouping starts.

use async_executor::LocalExecutor;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

use crate::context::{ScanContext, ScanProgress};
use crate::data::{DayBucket, MediaGroup, MediaKind, SourceDescriptor};
use crate::error::DetectorResult;
use crate::grouping::{GroupingConfig, group_related_media_with};

/// Name, capture time and kind of one domain item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
	pub taken_at: NaiveDateTime,
	pub full_name: String,
	pub kind: MediaKind,
}

/// Per-item metadata lookup supplied by a source.
///
/// Return `Ok(None)` for items that should not take part in grouping
/// (unsupported types). Errors are logged by the adapter and the item is
/// dropped.
#[async_trait]
pub trait ItemResolver<T: Sync>: Send + Sync {
	async fn resolve(&self, item: &T) -> DetectorResult<Option<ResolvedItem>>;

	/// Short label for log messages
	fn describe(&self, item: &T) -> String;
}

/// Key of the lookup table: one physical file on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
	pub day: DayBucket,
	pub full_name: String,
	pub kind: MediaKind,
}

impl FileKey {
	pub fn of(descriptor: &SourceDescriptor) -> Self {
		Self {
			day: descriptor.day(),
			full_name: descriptor.full_name().to_string(),
			kind: descriptor.kind(),
		}
	}
}

/// Maps descriptors back to the items they were built from.
#[derive(Debug)]
pub struct LookupTable<T> {
	entries: HashMap<FileKey, T>,
}

impl<T> Default for LookupTable<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> LookupTable<T> {
	pub fn new() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			entries: HashMap::with_capacity(capacity),
		}
	}

	/// Register `item` under `key`. The first item for a key is kept; a later
	/// one is handed back.
	pub fn insert(&mut self, key: FileKey, item: T) -> Result<(), T> {
		match self.entries.entry(key) {
			std::collections::hash_map::Entry::Occupied(_) => Err(item),
			std::collections::hash_map::Entry::Vacant(slot) => {
				slot.insert(item);
				Ok(())
			}
		}
	}

	/// Remove and return the item behind `descriptor`.
	pub fn take(&mut self, descriptor: &SourceDescriptor) -> Option<T> {
		self.entries.remove(&FileKey::of(descriptor))
	}

	/// Turn a group of descriptors into a group of items. Returns `None` when
	/// the main item is missing.
	pub fn resolve_group(&mut self, group: &MediaGroup) -> Option<ResolvedGroup<T>> {
		let main = self.take(&group.main)?;
		Some(ResolvedGroup {
			main,
			edited: group.edited.as_ref().and_then(|d| self.take(d)),
			live: group.live.as_ref().and_then(|d| self.take(d)),
		})
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// A capture moment expressed in domain items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGroup<T> {
	pub main: T,
	pub edited: Option<T>,
	pub live: Option<T>,
}

impl<T> ResolvedGroup<T> {
	pub fn members(&self) -> impl Iterator<Item = &T> {
		std::iter::once(&self.main)
			.chain(self.edited.as_ref())
			.chain(self.live.as_ref())
	}
}

/// Runs resolution, grouping and mapping for any item type.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaAdapter {
	pub config: GroupingConfig,
}

impl MediaAdapter {
	pub fn new(config: GroupingConfig) -> Self {
		Self { config }
	}

	/// Group `items` into capture moments.
	pub async fn group_items<T, R>(
		&self,
		items: Vec<T>,
		resolver: &R,
		context: &ScanContext,
	) -> Vec<ResolvedGroup<T>>
	where
		T: Sync,
		R: ItemResolver<T>,
	{
		info!(
			"Adapter: grouping {} items ({} keys)",
			items.len(),
			self.config.key_mode
		);
		let resolved = resolve_all(&items, resolver, context).await;

		let mut table = LookupTable::with_capacity(items.len());
		let mut descriptors = Vec::with_capacity(items.len());
		for (item, resolved) in items.into_iter().zip(resolved) {
			let Some(resolved) = resolved else {
				continue;
			};
			let descriptor = SourceDescriptor::new(
				resolved.taken_at,
				resolved.full_name,
				resolved.kind,
				self.config.key_mode,
			);
			if table.insert(FileKey::of(&descriptor), item).is_err() {
				warn!(
					"Adapter: {} already seen on {}, skipping",
					descriptor.full_name(),
					descriptor.day()
				);
				continue;
			}
			descriptors.push(descriptor);
		}

		let groups = group_related_media_with(descriptors, &self.config);
		let mut resolved_groups = Vec::with_capacity(groups.len());
		for group in &groups {
			match table.resolve_group(group) {
				Some(resolved) => resolved_groups.push(resolved),
				None => warn!(
					"Adapter: no item behind {}, dropping group",
					group.main.full_name()
				),
			}
		}
		debug!(
			"Adapter: {} groups, {} items left unassigned",
			resolved_groups.len(),
			table.len()
		);
		resolved_groups
	}
}

/// Resolve every item, at most `max_concurrent_files` at a time. The output
/// is aligned with `items`.
async fn resolve_all<T, R>(
	items: &[T],
	resolver: &R,
	context: &ScanContext,
) -> Vec<Option<ResolvedItem>>
where
	T: Sync,
	R: ItemResolver<T>,
{
	let mut resolved = Vec::with_capacity(items.len());
	let mut progress = ScanProgress::new("Resolve".to_string(), items.len());
	let executor = LocalExecutor::new();

	for chunk in items.chunks(context.max_concurrent_files.max(1)) {
		let tasks: Vec<_> = chunk
			.iter()
			.map(|item| executor.spawn(resolve_one(item, resolver, context)))
			.collect();
		let outcomes = executor
			.run(async {
				let mut outcomes = Vec::with_capacity(tasks.len());
				for task in tasks {
					outcomes.push(task.await);
				}
				outcomes
			})
			.await;
		resolved.extend(outcomes);

		progress.update(resolved.len(), chunk.last().map(|item| resolver.describe(item)));
		context.report_progress(progress.clone());
	}

	resolved
}

async fn resolve_one<T, R>(item: &T, resolver: &R, context: &ScanContext) -> Option<ResolvedItem>
where
	T: Sync,
	R: ItemResolver<T>,
{
	if context.is_cancelled() {
		trace!("Adapter: cancelled before {}", resolver.describe(item));
		return None;
	}
	match resolver.resolve(item).await {
		Ok(Some(resolved)) => {
			trace!("Adapter: resolved {} ({})", resolved.full_name, resolved.kind);
			Some(resolved)
		}
		Ok(None) => {
			trace!("Adapter: {} is not media", resolver.describe(item));
			None
		}
		Err(e) => {
			warn!("Adapter: skipping {} ({})", resolver.describe(item), e);
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::DetectorError;
	use crate::key::KeyMode;
	use chrono::NaiveDate;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Stand-in for a capture-device object listing.
	#[derive(Debug, Clone, PartialEq, Eq)]
	struct DeviceObject {
		handle: u32,
		name: &'static str,
		day: u32,
	}

	struct DeviceResolver {
		calls: AtomicUsize,
	}

	impl DeviceResolver {
		fn new() -> Self {
			Self {
				calls: AtomicUsize::new(0),
			}
		}
	}

	#[async_trait]
	impl ItemResolver<DeviceObject> for DeviceResolver {
		async fn resolve(&self, item: &DeviceObject) -> DetectorResult<Option<ResolvedItem>> {
			self.calls.fetch_add(1, Ordering::Relaxed);
			if item.name.starts_with("BROKEN") {
				return Err(DetectorError::Resolve {
					item: item.name.to_string(),
					reason: "unreadable".to_string(),
				});
			}
			let Some(kind) = MediaKind::from_path(item.name) else {
				return Ok(None);
			};
			smol::future::yield_now().await;
			Ok(Some(ResolvedItem {
				taken_at: NaiveDate::from_ymd_opt(2024, 5, item.day)
					.unwrap()
					.and_hms_opt(12, 30, 0)
					.unwrap(),
				full_name: item.name.to_string(),
				kind,
			}))
		}

		fn describe(&self, item: &DeviceObject) -> String {
			format!("#{} {}", item.handle, item.name)
		}
	}

	fn object(handle: u32, name: &'static str) -> DeviceObject {
		DeviceObject { handle, name, day: 1 }
	}

	fn names(groups: &[ResolvedGroup<DeviceObject>]) -> Vec<Vec<u32>> {
		groups
			.iter()
			.map(|g| g.members().map(|o| o.handle).collect())
			.collect()
	}

	#[test]
	fn test_lookup_table_keeps_first_item() {
		let day = DayBucket::from_ymd(2024, 5, 1).unwrap();
		let descriptor =
			SourceDescriptor::new(day, "IMG_0001.JPG", MediaKind::Image, KeyMode::Standard);
		let mut table = LookupTable::new();
		assert!(table.insert(FileKey::of(&descriptor), "first").is_ok());
		assert_eq!(table.insert(FileKey::of(&descriptor), "second"), Err("second"));
		assert_eq!(table.len(), 1);
		assert_eq!(table.take(&descriptor), Some("first"));
		assert!(table.is_empty());
	}

	#[test]
	fn test_lookup_table_distinguishes_same_key_files() {
		let day = DayBucket::from_ymd(2024, 5, 1).unwrap();
		let still = SourceDescriptor::new(day, "IMG_0001.JPG", MediaKind::Image, KeyMode::Standard);
		let edit = SourceDescriptor::new(day, "IMG_E0001.JPG", MediaKind::Image, KeyMode::Standard);
		assert_eq!(still, edit);

		let mut table = LookupTable::new();
		table.insert(FileKey::of(&still), 1).unwrap();
		table.insert(FileKey::of(&edit), 2).unwrap();
		let group = MediaGroup {
			main: still,
			edited: Some(edit),
			live: None,
		};
		let resolved = table.resolve_group(&group).unwrap();
		assert_eq!(resolved.main, 1);
		assert_eq!(resolved.edited, Some(2));
		assert_eq!(resolved.live, None);
	}

	#[smol_potat::test]
	async fn test_group_items_maps_back_to_objects() {
		let items = vec![
			object(1, "IMG_E1234.JPG"),
			object(2, "IMG_1234.MOV"),
			object(3, "IMG_1234.JPG"),
			object(4, "IMG_1234.AAE"),
			object(5, "IMG_2000.HEIC"),
		];
		let resolver = DeviceResolver::new();
		let context = ScanContext::new().with_max_concurrent_files(2);
		let groups = MediaAdapter::default()
			.group_items(items, &resolver, &context)
			.await;

		assert_eq!(names(&groups), vec![vec![3, 1, 2], vec![5]]);
		assert_eq!(resolver.calls.load(Ordering::Relaxed), 5);
	}

	#[test_log::test(smol_potat::test)]
	async fn test_failed_items_are_omitted() {
		let items = vec![
			object(1, "IMG_1234.JPG"),
			object(2, "BROKEN_1234.MOV"),
			object(3, "IMG_1234.MOV"),
		];
		let groups = MediaAdapter::default()
			.group_items(items, &DeviceResolver::new(), &ScanContext::new())
			.await;
		assert_eq!(names(&groups), vec![vec![1, 3]]);
	}

	#[smol_potat::test]
	async fn test_cancelled_scan_resolves_nothing() {
		let context = ScanContext::new();
		context.cancel();
		let resolver = DeviceResolver::new();
		let groups = MediaAdapter::default()
			.group_items(vec![object(1, "IMG_1234.JPG")], &resolver, &context)
			.await;
		assert!(groups.is_empty());
		assert_eq!(resolver.calls.load(Ordering::Relaxed), 0);
	}

	#[smol_potat::test]
	async fn test_duplicate_names_on_same_day_keep_first() {
		let items = vec![object(1, "IMG_1234.JPG"), object(2, "IMG_1234.JPG")];
		let groups = MediaAdapter::default()
			.group_items(items, &DeviceResolver::new(), &ScanContext::new())
			.await;
		assert_eq!(names(&groups), vec![vec![1]]);
	}

	#[smol_potat::test]
	async fn test_progress_is_reported_per_chunk() {
		let reports = std::sync::Arc::new(AtomicUsize::new(0));
		let sink = reports.clone();
		let context = ScanContext::new()
			.with_max_concurrent_files(2)
			.with_progress_callback(move |_| {
				sink.fetch_add(1, Ordering::Relaxed);
			});
		let items: Vec<DeviceObject> = (0..5).map(|i| object(i, "IMG_0001.JPG")).collect();
		MediaAdapter::default()
			.group_items(items, &DeviceResolver::new(), &context)
			.await;
		assert_eq!(reports.load(Ordering::Relaxed), 3);
	}
}
