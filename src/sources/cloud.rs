//! Cloud-library export source.
//!
//! Exports name assets by UUID: `<uuid>.jpeg` for the still, `<uuid>_3.mov`
//! for its motion clip, `<uuid>_L.HEIC` for a distinct derived asset. The
//! export ships a JSON manifest listing every asset with its creation time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::adapter::{ItemResolver, ResolvedItem};
use crate::data::MediaKind;
use crate::error::DetectorResult;

/// One asset entry of an export manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAsset {
	pub filename: String,
	pub created_at: DateTime<Utc>,
	/// Name the asset had on the capturing device, if the export kept it
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub original_filename: Option<String>,
}

/// Parsed export manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudLibraryExport {
	pub assets: Vec<CloudAsset>,
}

impl CloudLibraryExport {
	pub fn from_json(json: &str) -> DetectorResult<Self> {
		let export: Self = serde_json::from_str(json)?;
		debug!("Cloud export: {} assets in manifest", export.assets.len());
		Ok(export)
	}

	pub async fn load(path: impl AsRef<Path>) -> DetectorResult<Self> {
		let json = smol::fs::read_to_string(path.as_ref()).await?;
		Self::from_json(&json)
	}
}

/// Resolves manifest entries from their own fields; no I/O involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudAssetResolver;

#[async_trait]
impl ItemResolver<CloudAsset> for CloudAssetResolver {
	async fn resolve(&self, item: &CloudAsset) -> DetectorResult<Option<ResolvedItem>> {
		Ok(MediaKind::from_path(&item.filename).map(|kind| ResolvedItem {
			taken_at: item.created_at.naive_utc(),
			full_name: item.filename.clone(),
			kind,
		}))
	}

	fn describe(&self, item: &CloudAsset) -> String {
		match item.original_filename {
			Some(ref original) => format!("{} ({})", item.filename, original),
			None => item.filename.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adapter::MediaAdapter;
	use crate::context::ScanContext;
	use crate::error::DetectorError;
	use crate::grouping::GroupingConfig;
	use crate::key::KeyMode;

	const MANIFEST: &str = r#"{
		"assets": [
			{ "filename": "9F1B6C2E-4D3A-4B7E-8C21-5A0F3E7D9B44.jpeg", "created_at": "2024-05-01T09:15:00Z", "original_filename": "IMG_1234.HEIC" },
			{ "filename": "9F1B6C2E-4D3A-4B7E-8C21-5A0F3E7D9B44_3.mov", "created_at": "2024-05-01T09:15:01Z" },
			{ "filename": "9F1B6C2E-4D3A-4B7E-8C21-5A0F3E7D9B44_L.HEIC", "created_at": "2024-05-01T09:15:00Z" },
			{ "filename": "0C5D2A11-7E44-4F0B-9D13-2B6A8E1C7F90.jpeg", "created_at": "2024-05-02T18:00:00Z" },
			{ "filename": "0C5D2A11-7E44-4F0B-9D13-2B6A8E1C7F90.json", "created_at": "2024-05-02T18:00:00Z" }
		]
	}"#;

	#[test]
	fn test_manifest_parsing() {
		let export = CloudLibraryExport::from_json(MANIFEST).unwrap();
		assert_eq!(export.assets.len(), 5);
		assert_eq!(
			export.assets[0].original_filename.as_deref(),
			Some("IMG_1234.HEIC")
		);
		assert!(export.assets[1].original_filename.is_none());

		assert!(matches!(
			CloudLibraryExport::from_json("{\"assets\": 3}"),
			Err(DetectorError::Json(_))
		));
	}

	#[smol_potat::test]
	async fn test_load_from_file() {
		let temp_dir = tempfile::TempDir::new().unwrap();
		let path = temp_dir.path().join("manifest.json");
		std::fs::write(&path, MANIFEST).unwrap();
		let export = CloudLibraryExport::load(&path).await.unwrap();
		assert_eq!(export.assets.len(), 5);
	}

	#[smol_potat::test]
	async fn test_cloud_assets_group_by_uuid() {
		let export = CloudLibraryExport::from_json(MANIFEST).unwrap();
		let adapter =
			MediaAdapter::new(GroupingConfig::default().with_key_mode(KeyMode::CloudLibrary));
		let groups = adapter
			.group_items(export.assets, &CloudAssetResolver, &ScanContext::new())
			.await;

		let shapes: Vec<(String, Option<String>)> = groups
			.iter()
			.map(|g| {
				(
					g.main.filename.clone(),
					g.live.as_ref().map(|a| a.filename.clone()),
				)
			})
			.collect();
		assert_eq!(
			shapes,
			vec![
				(
					"9F1B6C2E-4D3A-4B7E-8C21-5A0F3E7D9B44.jpeg".to_string(),
					Some("9F1B6C2E-4D3A-4B7E-8C21-5A0F3E7D9B44_3.mov".to_string())
				),
				(
					"9F1B6C2E-4D3A-4B7E-8C21-5A0F3E7D9B44_L.HEIC".to_string(),
					None
				),
				("0C5D2A11-7E44-4F0B-9D13-2B6A8E1C7F90.jpeg".to_string(), None),
			]
		);
		assert!(groups.iter().all(|g| g.edited.is_none()));
	}

	#[test]
	fn test_describe_prefers_original_name() {
		let export = CloudLibraryExport::from_json(MANIFEST).unwrap();
		assert_eq!(
			CloudAssetResolver.describe(&export.assets[0]),
			"9F1B6C2E-4D3A-4B7E-8C21-5A0F3E7D9B44.jpeg (IMG_1234.HEIC)"
		);
	}
}
