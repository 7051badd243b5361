//! Local filesystem source: directory discovery and per-file resolution

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::adapter::{ItemResolver, ResolvedItem};
use crate::context::{ScanContext, ScanProgress, yield_periodically_with_cancellation};
use crate::data::MediaKind;
use crate::error::{DetectorError, DetectorResult};
use crate::key::is_edited_label;

/// A media file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
	pub path: PathBuf,
	pub size: u64,
	pub modified: DateTime<Utc>,
	pub kind: MediaKind,
}

impl FileRecord {
	pub fn file_name(&self) -> Option<&str> {
		self.path.file_name().and_then(|name| name.to_str())
	}

	/// Whether the file name carries an edited-copy label.
	pub fn is_edited_label(&self) -> bool {
		self.path
			.file_stem()
			.and_then(|stem| stem.to_str())
			.is_some_and(is_edited_label)
	}
}

/// Walk settings for [`FileDiscovery`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
	/// Whether to follow symbolic links
	pub follow_links: bool,
	/// Maximum depth to scan (None for unlimited)
	pub max_depth: Option<usize>,
	/// File extensions to include (None for every media extension)
	pub include_extensions: Option<Vec<String>>,
	/// File extensions to exclude
	pub exclude_extensions: Vec<String>,
}

impl DiscoveryOptions {
	pub fn follow_links(mut self, follow: bool) -> Self {
		self.follow_links = follow;
		self
	}

	pub fn max_depth(mut self, depth: usize) -> Self {
		self.max_depth = Some(depth);
		self
	}

	pub fn include_extensions(mut self, extensions: Vec<String>) -> Self {
		self.include_extensions = Some(extensions);
		self
	}

	pub fn exclude_extensions(mut self, extensions: Vec<String>) -> Self {
		self.exclude_extensions = extensions;
		self
	}
}

/// Finds image and video files under a set of roots
#[derive(Debug, Clone)]
pub struct FileDiscovery {
	pub scan_paths: Vec<PathBuf>,
	pub options: DiscoveryOptions,
}

impl FileDiscovery {
	pub fn new(scan_paths: Vec<PathBuf>) -> Self {
		Self {
			scan_paths,
			options: DiscoveryOptions::default(),
		}
	}

	pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
		self.options = options;
		self
	}

	/// Discover media files in the configured paths
	pub async fn discover_files(&self, context: &ScanContext) -> DetectorResult<Vec<FileRecord>> {
		info!(
			"Discovery: starting scan of {} paths",
			self.scan_paths.len()
		);
		let mut all_files = Vec::new();
		let mut progress = ScanProgress::new("Discovery".to_string(), 0);
		let mut last_yield = std::time::Instant::now();

		for scan_path in &self.scan_paths {
			debug!("Discovery: scanning {}", scan_path.display());
			smol::fs::metadata(scan_path).await?;
			let files = self
				.discover_files_in_path(scan_path, context, &mut progress, &mut last_yield)
				.await?;
			all_files.extend(files);
		}

		info!("Discovery: found {} media files", all_files.len());
		Ok(all_files)
	}

	async fn discover_files_in_path(
		&self,
		path: &Path,
		context: &ScanContext,
		progress: &mut ScanProgress,
		last_yield: &mut std::time::Instant,
	) -> DetectorResult<Vec<FileRecord>> {
		let mut files = Vec::new();

		let mut walker = WalkDir::new(path).follow_links(self.options.follow_links);
		if let Some(max_depth) = self.options.max_depth {
			walker = walker.max_depth(max_depth);
		}

		for entry in walker.into_iter() {
			yield_periodically_with_cancellation(last_yield, context).await?;

			let entry = match entry {
				Ok(e) => e,
				Err(e) => {
					warn!("Discovery walk error: {}", e);
					continue;
				}
			};

			if entry.file_type().is_dir() {
				continue;
			}

			let path = entry.path();
			let Some(kind) = self.media_kind(path) else {
				trace!("Discovery: ignoring {}", path.display());
				continue;
			};

			let metadata = match entry.metadata() {
				Ok(m) => m,
				Err(e) => {
					warn!("Skipping {} (metadata error: {})", path.display(), e);
					continue;
				}
			};

			let modified = match metadata.modified() {
				Ok(ts) => DateTime::<Utc>::from(ts),
				Err(e) => {
					warn!("Skipping {} (mtime error: {})", path.display(), e);
					continue;
				}
			};

			files.push(FileRecord {
				path: path.to_path_buf(),
				size: metadata.len(),
				modified,
				kind,
			});
			trace!("Discovery: found {} ({})", path.display(), kind);

			progress.update(files.len(), Some(path.to_string_lossy().to_string()));
			context.report_progress(progress.clone());
		}

		Ok(files)
	}

	/// Media kind of `path` if it passes the extension filters.
	fn media_kind(&self, path: &Path) -> Option<MediaKind> {
		let extension = path.extension().and_then(|ext| ext.to_str())?;

		if self
			.options
			.exclude_extensions
			.iter()
			.any(|e| e.eq_ignore_ascii_case(extension))
		{
			return None;
		}

		if let Some(ref include_list) = self.options.include_extensions
			&& !include_list.iter().any(|e| e.eq_ignore_ascii_case(extension))
		{
			return None;
		}

		MediaKind::from_extension(extension)
	}
}

/// Resolves discovered files by re-reading their modification time.
///
/// Capture dates come from the filesystem; EXIF extraction lives outside this
/// crate and can be plugged in with another [`ItemResolver`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

#[async_trait]
impl ItemResolver<FileRecord> for FileResolver {
	async fn resolve(&self, item: &FileRecord) -> DetectorResult<Option<ResolvedItem>> {
		let Some(kind) = MediaKind::from_path(&item.path) else {
			return Ok(None);
		};
		let full_name = item
			.file_name()
			.ok_or_else(|| DetectorError::Resolve {
				item: item.path.display().to_string(),
				reason: "file name is not valid UTF-8".to_string(),
			})?
			.to_string();

		let modified = smol::fs::metadata(&item.path).await?.modified()?;
		Ok(Some(ResolvedItem {
			taken_at: DateTime::<Utc>::from(modified).naive_utc(),
			full_name,
			kind,
		}))
	}

	fn describe(&self, item: &FileRecord) -> String {
		item.path.display().to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	fn create_test_directory() -> TempDir {
		let temp_dir = TempDir::new().unwrap();
		let base_path = temp_dir.path();

		fs::write(base_path.join("IMG_0001.JPG"), b"fake image data").unwrap();
		fs::write(base_path.join("IMG_0001.MOV"), b"fake video data").unwrap();
		fs::write(base_path.join("IMG_0001.AAE"), b"<plist/>").unwrap();
		fs::write(base_path.join("notes.txt"), "not media").unwrap();

		let sub_dir = base_path.join("edits");
		fs::create_dir(&sub_dir).unwrap();
		fs::write(sub_dir.join("IMG_E0001.JPG"), b"edited").unwrap();

		temp_dir
	}

	fn sorted_names(files: &[FileRecord]) -> Vec<String> {
		let mut names: Vec<String> = files
			.iter()
			.filter_map(|f| f.file_name().map(str::to_string))
			.collect();
		names.sort();
		names
	}

	#[smol_potat::test]
	async fn test_discovery_keeps_only_media() {
		let temp_dir = create_test_directory();
		let discovery = FileDiscovery::new(vec![temp_dir.path().to_path_buf()]);

		let files = discovery.discover_files(&ScanContext::new()).await.unwrap();
		assert_eq!(
			sorted_names(&files),
			vec!["IMG_0001.JPG", "IMG_0001.MOV", "IMG_E0001.JPG"]
		);
		let movie = files
			.iter()
			.find(|f| f.file_name() == Some("IMG_0001.MOV"))
			.unwrap();
		assert_eq!(movie.kind, MediaKind::Video);
		assert_eq!(movie.size, 15);
	}

	#[smol_potat::test]
	async fn test_discovery_filters() {
		let temp_dir = create_test_directory();
		let options = DiscoveryOptions::default()
			.max_depth(1)
			.exclude_extensions(vec!["mov".to_string()]);
		let discovery =
			FileDiscovery::new(vec![temp_dir.path().to_path_buf()]).with_options(options);
		let files = discovery.discover_files(&ScanContext::new()).await.unwrap();
		assert_eq!(sorted_names(&files), vec!["IMG_0001.JPG"]);

		let options = DiscoveryOptions::default().include_extensions(vec!["MOV".to_string()]);
		let discovery =
			FileDiscovery::new(vec![temp_dir.path().to_path_buf()]).with_options(options);
		let files = discovery.discover_files(&ScanContext::new()).await.unwrap();
		assert_eq!(sorted_names(&files), vec!["IMG_0001.MOV"]);
	}

	#[smol_potat::test]
	async fn test_discovery_missing_root_is_an_error() {
		let temp_dir = TempDir::new().unwrap();
		let discovery = FileDiscovery::new(vec![temp_dir.path().join("missing")]);
		let result = discovery.discover_files(&ScanContext::new()).await;
		assert!(matches!(result, Err(DetectorError::Io(_))));
	}

	#[smol_potat::test]
	async fn test_discovery_honours_cancellation() {
		let temp_dir = create_test_directory();
		let context = ScanContext::new();
		context.cancel();
		let discovery = FileDiscovery::new(vec![temp_dir.path().to_path_buf()]);
		let result = discovery.discover_files(&context).await;
		assert!(matches!(result, Err(DetectorError::Cancelled)));
	}

	#[smol_potat::test]
	async fn test_file_resolver() {
		let temp_dir = create_test_directory();
		let path = temp_dir.path().join("IMG_0001.JPG");
		let record = FileRecord {
			path: path.clone(),
			size: 15,
			modified: Utc::now(),
			kind: MediaKind::Image,
		};
		let resolved = FileResolver.resolve(&record).await.unwrap().unwrap();
		assert_eq!(resolved.full_name, "IMG_0001.JPG");
		assert_eq!(resolved.kind, MediaKind::Image);

		let gone = FileRecord {
			path: temp_dir.path().join("IMG_0002.JPG"),
			..record.clone()
		};
		assert!(matches!(
			FileResolver.resolve(&gone).await,
			Err(DetectorError::Io(_))
		));

		let sidecar = FileRecord {
			path: temp_dir.path().join("IMG_0001.AAE"),
			..record
		};
		assert_eq!(FileResolver.resolve(&sidecar).await.unwrap(), None);
	}

	#[test]
	fn test_file_record_edited_label() {
		let record = |name: &str| FileRecord {
			path: PathBuf::from("/dcim").join(name),
			size: 0,
			modified: Utc::now(),
			kind: MediaKind::Image,
		};
		assert!(record("IMG_0001 (Edited).JPG").is_edited_label());
		assert!(record("IMG_0001_Edited.JPG").is_edited_label());
		assert!(!record("IMG_E0001.JPG").is_edited_label());
		assert_eq!(record("IMG_0001.JPG").file_name(), Some("IMG_0001.JPG"));
	}
}
