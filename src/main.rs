//! `hc-extract` command-line entry point.

// std
use std::{path::PathBuf, sync::Arc, time::Duration};
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use tracing_subscriber::EnvFilter;
// self
use hc_extract::{
	browser::{ChromeLauncher, DEFAULT_DEBUG_PORT},
	config::{DEFAULT_CLIENT_ID, DEFAULT_REDIRECT_URI, Region, VendorConfig},
	extract::Extractor,
	url::Url,
};

/// Extract appliance connection credentials and device description archives.
///
/// Opens a browser for the vendor login, then writes one archive per credentialed appliance
/// and a `profiles.json` manifest into the output directory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// Vendor cloud region: EU, NA, CN, or RU.
	#[arg(long, env = "HC_EXTRACT_REGION", default_value = "EU")]
	region: Region,
	/// Directory receiving the archives and the manifest.
	#[arg(long, env = "HC_EXTRACT_OUTPUT", default_value = "./output")]
	output: PathBuf,
	/// Chrome/Chromium executable; searched in well-known locations when omitted.
	#[arg(long, env = "HC_EXTRACT_CHROME")]
	chrome: Option<PathBuf>,
	/// DevTools remote debugging port.
	#[arg(long, env = "HC_EXTRACT_DEBUG_PORT", default_value_t = DEFAULT_DEBUG_PORT)]
	debug_port: u16,
	/// Give up when the login is not finished within this many seconds.
	#[arg(long, env = "HC_EXTRACT_LOGIN_TIMEOUT", value_name = "SECONDS")]
	login_timeout: Option<u64>,
	/// OAuth client identifier.
	#[arg(long, env = "HC_EXTRACT_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
	client_id: String,
	/// Redirect target registered for the client.
	#[arg(long, env = "HC_EXTRACT_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI)]
	redirect_uri: Url,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	init_tracing("info");

	let cli = Cli::parse();
	let config = VendorConfig::builder()
		.region(cli.region)
		.client_id(cli.client_id)
		.redirect_uri(cli.redirect_uri)
		.login_timeout(cli.login_timeout.map(Duration::from_secs))
		.build()?;
	let mut launcher = ChromeLauncher::with_port(cli.debug_port);

	if let Some(chrome) = cli.chrome {
		launcher = launcher.with_executable(chrome);
	}

	let extractor = Extractor::new(config, Arc::new(launcher), cli.output)?;

	tracing::info!(region = %cli.region, "Starting extraction; log in using the browser window.");

	// Dropping the run aborts in-flight requests and kills the browser.
	tokio::select! {
		summary = extractor.run() => {
			let summary = summary?;

			for path in &summary.archives {
				tracing::info!(path = %path.display(), "Archive written.");
			}

			tracing::info!(
				profiles = summary.profiles.len(),
				skipped = summary.skipped.len(),
				manifest = %summary.manifest.display(),
				"Done."
			);

			Ok(())
		},
		signal = tokio::signal::ctrl_c() => {
			signal?;

			Err(eyre!("Interrupted before the extraction finished."))
		},
	}
}

fn init_tracing(default_level: &str) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}
