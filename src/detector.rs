//! Main API for grouping capture moments

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

use crate::adapter::{MediaAdapter, ResolvedGroup};
use crate::context::ScanContext;
use crate::error::{DetectorError, DetectorResult};
use crate::grouping::GroupingConfig;
use crate::key::KeyMode;
use crate::sources::{
	CloudAsset, CloudAssetResolver, CloudLibraryExport, DiscoveryOptions, FileDiscovery,
	FileRecord, FileResolver,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
	/// Edited-slot policy; the key mode is chosen per source
	pub grouping: GroupingConfig,
	pub discovery: DiscoveryOptions,
	/// Concurrent per-file resolutions (None for one per CPU)
	pub max_concurrent_files: Option<usize>,
}

impl DetectorConfig {
	pub fn with_grouping(mut self, grouping: GroupingConfig) -> Self {
		self.grouping = grouping;
		self
	}

	pub fn with_discovery(mut self, discovery: DiscoveryOptions) -> Self {
		self.discovery = discovery;
		self
	}

	pub fn with_max_concurrent_files(mut self, max: usize) -> Self {
		self.max_concurrent_files = Some(max);
		self
	}
}

/// Moments found on disk
pub type FileMoment = ResolvedGroup<FileRecord>;

/// Moments found in a cloud-library export
pub type CloudMoment = ResolvedGroup<CloudAsset>;

pub struct MomentDetector {
	config: DetectorConfig,
	cancellation_token: Arc<AtomicBool>,
}

impl MomentDetector {
	pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
		if config.max_concurrent_files == Some(0) {
			return Err(DetectorError::Config(
				"max_concurrent_files must be greater than 0".to_string(),
			));
		}
		Ok(Self {
			config,
			cancellation_token: Arc::new(AtomicBool::new(false)),
		})
	}

	/// Share a cancellation flag with the caller (UI, signal handler).
	pub fn with_cancellation_token(mut self, token: Arc<AtomicBool>) -> Self {
		self.cancellation_token = token;
		self
	}

	pub fn config(&self) -> &DetectorConfig {
		&self.config
	}

	/// Discover media under `path` and group it with device naming rules.
	pub async fn scan_directory(&self, path: PathBuf) -> DetectorResult<Vec<FileMoment>> {
		info!("Detector: scan_directory {}", path.display());
		let context = self.context();
		let files = FileDiscovery::new(vec![path])
			.with_options(self.config.discovery.clone())
			.discover_files(&context)
			.await?;

		let adapter = MediaAdapter::new(self.config.grouping.with_key_mode(KeyMode::Standard));
		let moments = adapter.group_items(files, &FileResolver, &context).await;
		self.finish(moments, &context)
	}

	/// Group the assets listed in a cloud-library export manifest.
	pub async fn group_cloud_export(&self, manifest: &Path) -> DetectorResult<Vec<CloudMoment>> {
		info!("Detector: group_cloud_export {}", manifest.display());
		let context = self.context();
		let export = CloudLibraryExport::load(manifest).await?;

		let adapter = MediaAdapter::new(self.config.grouping.with_key_mode(KeyMode::CloudLibrary));
		let moments = adapter
			.group_items(export.assets, &CloudAssetResolver, &context)
			.await;
		self.finish(moments, &context)
	}

	fn context(&self) -> ScanContext {
		let context = ScanContext::new().with_cancellation_token(self.cancellation_token.clone());
		match self.config.max_concurrent_files {
			Some(max) => context.with_max_concurrent_files(max),
			None => context,
		}
	}

	fn finish<T>(
		&self,
		moments: Vec<ResolvedGroup<T>>,
		context: &ScanContext,
	) -> DetectorResult<Vec<ResolvedGroup<T>>> {
		if context.is_cancelled() {
			info!("Detector: operation cancelled");
			return Err(DetectorError::Cancelled);
		}
		info!("Detector: {} moments", moments.len());
		Ok(moments)
	}
}
