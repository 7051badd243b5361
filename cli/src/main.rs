use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, subscriber::set_global_default};
use tracing_subscriber::EnvFilter;

use moments::detector::{CloudMoment, FileMoment};
use moments::sources::DiscoveryOptions;
use moments::{DetectorConfig, EditedSlotPolicy, GroupingConfig, MomentDetector};

fn init_tracing(verbosity: i8) {
	// Map -q/-v to tracing levels; default WARN
	let level = match verbosity {
		i8::MIN..=-1 => Level::ERROR,
		0 => Level::WARN,
		1 => Level::INFO,
		2 => Level::DEBUG,
		_ => Level::TRACE,
	};

	let env_filter = EnvFilter::from_default_env().add_directive(level.into());

	let subscriber = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_level(true)
		.compact()
		.finish();

	let _ = set_global_default(subscriber);
}

fn main() {
	let opts = Opts::parse();
	init_tracing(opts.verbose as i8 - opts.quiet as i8);
	smol::block_on(async move {
		if let Err(e) = run(opts).await {
			eprintln!("error: {e}");
			std::process::exit(1);
		}
	});
}

async fn run(opts: Opts) -> anyhow::Result<()> {
	let policy = if opts.keep_order_minimal {
		EditedSlotPolicy::KeepOrderMinimal
	} else {
		EditedSlotPolicy::LastWins
	};
	let mut config = DetectorConfig::default()
		.with_grouping(GroupingConfig::default().with_edited_policy(policy));
	if let Some(jobs) = opts.jobs {
		config = config.with_max_concurrent_files(jobs);
	}

	match opts.command {
		Command::Scan {
			path,
			follow_links,
			max_depth,
		} => {
			let mut discovery = DiscoveryOptions::default().follow_links(follow_links);
			if let Some(depth) = max_depth {
				discovery = discovery.max_depth(depth);
			}
			let detector = MomentDetector::new(config.with_discovery(discovery))?;
			let moments = detector.scan_directory(path).await?;
			if opts.json {
				println!("{}", serde_json::to_string_pretty(&moments)?);
			} else {
				print_file_moments(&moments);
			}
		}
		Command::Cloud { manifest } => {
			let detector = MomentDetector::new(config)?;
			let moments = detector.group_cloud_export(&manifest).await?;
			if opts.json {
				println!("{}", serde_json::to_string_pretty(&moments)?);
			} else {
				print_cloud_moments(&moments);
			}
		}
	}
	Ok(())
}

fn print_file_moments(moments: &[FileMoment]) {
	println!("Moments: {}", moments.len());
	for moment in moments {
		println!("{}", moment.main.path.display());
		if let Some(ref edited) = moment.edited {
			let marker = if edited.is_edited_label() { " [labelled]" } else { "" };
			println!("  edited: {}{}", edited.path.display(), marker);
		}
		if let Some(ref live) = moment.live {
			println!("  live:   {}", live.path.display());
		}
	}
}

fn print_cloud_moments(moments: &[CloudMoment]) {
	println!("Moments: {}", moments.len());
	for moment in moments {
		match moment.main.original_filename {
			Some(ref original) => println!("{} ({})", moment.main.filename, original),
			None => println!("{}", moment.main.filename),
		}
		if let Some(ref edited) = moment.edited {
			println!("  edited: {}", edited.filename);
		}
		if let Some(ref live) = moment.live {
			println!("  live:   {}", live.filename);
		}
	}
}

#[derive(Parser)]
#[command(version, about = "Group photos, edits and live clips into capture moments")]
pub struct Opts {
	/// Increase verbosity (-v, -vv). Default WARN.
	#[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
	pub verbose: u8,
	/// Decrease verbosity (-q).
	#[arg(short = 'q', action = clap::ArgAction::Count, global = true)]
	pub quiet: u8,
	/// Print moments as JSON
	#[arg(long, global = true)]
	pub json: bool,
	/// Keep the two order-minimal files when 3+ share a key
	#[arg(long, global = true)]
	pub keep_order_minimal: bool,
	/// Concurrent per-file resolutions (default: one per CPU)
	#[arg(short = 'j', long, global = true)]
	pub jobs: Option<usize>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// Scan a directory of device/filesystem captures
	Scan {
		/// Path to scan
		path: PathBuf,
		/// Follow symbolic links
		#[arg(long)]
		follow_links: bool,
		/// Maximum directory depth
		#[arg(long)]
		max_depth: Option<usize>,
	},
	/// Group the assets of a cloud-library export manifest
	Cloud {
		/// Path to the export's JSON manifest
		manifest: PathBuf,
	},
}
