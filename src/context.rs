//! Execution context shared by sources and adapters

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{DetectorError, DetectorResult};

/// Progress information for a resolution or discovery run
#[derive(Debug, Clone)]
pub struct ScanProgress {
	pub stage: String,
	pub total_items: usize,
	pub processed_items: usize,
	pub current_item: Option<String>,
}

impl ScanProgress {
	pub fn new(stage: String, total_items: usize) -> Self {
		Self {
			stage,
			total_items,
			processed_items: 0,
			current_item: None,
		}
	}

	pub fn update(&mut self, processed: usize, current_item: Option<String>) {
		self.processed_items = processed;
		self.current_item = current_item;
	}
}

/// Caller-owned settings for one scan: concurrency, progress reporting and
/// cancellation. Nothing in here is global.
pub struct ScanContext {
	pub max_concurrent_files: usize,
	pub yield_interval: Duration,
	pub progress_callback: Option<Box<dyn Fn(ScanProgress) + Send + Sync>>,
	pub cancellation_token: Arc<AtomicBool>,
}

impl Default for ScanContext {
	fn default() -> Self {
		Self {
			max_concurrent_files: num_cpus::get(),
			yield_interval: Duration::from_millis(100),
			progress_callback: None,
			cancellation_token: Arc::new(AtomicBool::new(false)),
		}
	}
}

impl std::fmt::Debug for ScanContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ScanContext")
			.field("max_concurrent_files", &self.max_concurrent_files)
			.field("yield_interval", &self.yield_interval)
			.field("has_progress_callback", &self.progress_callback.is_some())
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}

impl ScanContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_max_concurrent_files(mut self, max: usize) -> Self {
		self.max_concurrent_files = max;
		self
	}

	pub fn with_progress_callback<F>(mut self, callback: F) -> Self
	where
		F: Fn(ScanProgress) + Send + Sync + 'static,
	{
		self.progress_callback = Some(Box::new(callback));
		self
	}

	pub fn with_cancellation_token(mut self, token: Arc<AtomicBool>) -> Self {
		self.cancellation_token = token;
		self
	}

	pub fn report_progress(&self, progress: ScanProgress) {
		if let Some(ref callback) = self.progress_callback {
			callback(progress);
		}
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancellation_token.load(Ordering::Relaxed)
	}

	pub fn cancel(&self) {
		self.cancellation_token.store(true, Ordering::Relaxed);
	}
}

/// Yield to the executor every `yield_interval` and bail out once cancelled.
pub async fn yield_periodically_with_cancellation(
	last_yield: &mut Instant,
	context: &ScanContext,
) -> DetectorResult<()> {
	if last_yield.elapsed() >= context.yield_interval {
		smol::future::yield_now().await;
		*last_yield = Instant::now();
	}

	if context.is_cancelled() {
		return Err(DetectorError::Cancelled);
	}

	Ok(())
}
