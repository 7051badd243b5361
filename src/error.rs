//! Error types for the moment grouping system

use thiserror::Error;

/// Error type covering the failure modes of sources and adapters.
///
/// The grouping engine and the canonical-key extractor never fail. Everything
/// that can go wrong lives at the boundary: walking directories, reading file
/// metadata, parsing cloud-library manifests, or a resolver giving up on an
/// item.
///
/// ## Error Categories
///
/// ### I/O Errors
/// Directory walks, metadata reads and manifest reads.
///
/// ### Manifest Errors
/// Malformed cloud-library export manifests.
///
/// ### Resolution Errors
/// A per-item resolver could not produce a name, date or type. Adapters log
/// these and drop the item; they never reach the grouping engine.
///
/// ### Configuration Errors
/// Invalid detector settings, such as a zero concurrency limit.
///
/// ```rust
/// use moments::{DetectorError, MomentDetector, DetectorConfig};
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let detector = MomentDetector::new(DetectorConfig::default())?;
///
/// match detector.scan_directory(PathBuf::from("./DCIM")).await {
///     Ok(groups) => println!("{} moments", groups.len()),
///     Err(DetectorError::Io(io_err)) => eprintln!("I/O error during scan: {}", io_err),
///     Err(DetectorError::Cancelled) => eprintln!("scan cancelled"),
///     Err(err) => eprintln!("Unexpected error: {}", err),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Error)]
pub enum DetectorError {
	/// File system I/O errors
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Cloud-library manifest could not be parsed
	#[error("Manifest error: {0}")]
	Json(#[from] serde_json::Error),

	/// Configuration validation errors with descriptive messages
	#[error("Configuration error: {0}")]
	Config(String),

	/// A resolver failed to produce name/date/type for one item
	#[error("Failed to resolve {item}: {reason}")]
	Resolve { item: String, reason: String },

	/// The operation was cancelled through the context token
	#[error("Operation was cancelled")]
	Cancelled,
}

/// Convenience type alias for Results in the moment grouping system.
pub type DetectorResult<T> = Result<T, DetectorError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test_log::test]
	fn test_detector_error_display() {
		let error = DetectorError::Config("test config error".to_string());
		assert_eq!(error.to_string(), "Configuration error: test config error");

		let error = DetectorError::Resolve {
			item: "IMG_0001.JPG".to_string(),
			reason: "permission denied".to_string(),
		};
		assert_eq!(
			error.to_string(),
			"Failed to resolve IMG_0001.JPG: permission denied"
		);

		assert_eq!(
			DetectorError::Cancelled.to_string(),
			"Operation was cancelled"
		);
	}

	#[test_log::test]
	fn test_error_conversion() {
		let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
		let detector_error: DetectorError = io_error.into();
		assert!(matches!(detector_error, DetectorError::Io(_)));

		let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
		let detector_error: DetectorError = json_error.into();
		assert!(matches!(detector_error, DetectorError::Json(_)));
	}
}
