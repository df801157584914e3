//! End-to-end extraction run.
//!
//! Stages run strictly in order: interactive login, token exchange, directory fetch, then
//! one appliance at a time (archive rewrite and save), and finally the manifest. The first
//! failure aborts the run; no manifest is written for a partial run. Appliances without
//! credentials are skipped.

// self
use crate::{
	_prelude::*,
	appliance::{ApplianceDirectoryClient, ApplianceId},
	auth::{InteractiveSession, TokenExchangeClient, TokenResponse},
	browser::BrowserLauncher,
	bundle::{DeviceBundleTransformer, DeviceProfile},
	config::VendorConfig,
	error::ConfigError,
	http::ReqwestHttpClient,
	obs::{Stage, StageOutcome, StageSpan, record_stage_outcome},
	registry::{OutputDirectory, ProfileRegistry},
	secret::Secret,
};

/// What a completed run produced.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
	/// Profiles written to the manifest, in processing order.
	pub profiles: Vec<DeviceProfile>,
	/// Saved archive paths, parallel to `profiles`.
	pub archives: Vec<PathBuf>,
	/// Appliances skipped for lack of credentials.
	pub skipped: Vec<ApplianceId>,
	/// Manifest path.
	pub manifest: PathBuf,
}

/// Drives a whole extraction run.
pub struct Extractor {
	config: VendorConfig,
	http: ReqwestHttpClient,
	launcher: Arc<dyn BrowserLauncher>,
	output: PathBuf,
}
impl Extractor {
	/// Creates an extractor writing into `output` with the default HTTP client.
	pub fn new(
		config: VendorConfig,
		launcher: Arc<dyn BrowserLauncher>,
		output: impl Into<PathBuf>,
	) -> Result<Self, ConfigError> {
		Ok(Self { config, http: ReqwestHttpClient::new()?, launcher, output: output.into() })
	}

	/// Overrides the HTTP client used for every vendor endpoint.
	pub fn with_http_client(mut self, http: ReqwestHttpClient) -> Self {
		self.http = http;

		self
	}

	/// Configuration in use.
	pub fn config(&self) -> &VendorConfig {
		&self.config
	}

	/// Logs in interactively and extracts every credentialed appliance.
	pub async fn run(&self) -> Result<RunSummary> {
		let output = OutputDirectory::create(&self.output)?;
		let token = self.authorize().await?;

		self.extract(&output, &token.access_token).await
	}

	/// Runs the interactive login and exchanges the captured code for a token.
	pub async fn authorize(&self) -> Result<TokenResponse> {
		let mut session = InteractiveSession::new(&self.config)?;
		let code = observe(StageSpan::new(Stage::Authorization), Stage::Authorization, async {
			session.run(self.launcher.as_ref()).await
		})
		.await?;
		let exchange =
			TokenExchangeClient::<ReqwestHttpClient>::new(&self.config, self.http.clone())?;

		observe(StageSpan::new(Stage::TokenExchange), Stage::TokenExchange, async {
			exchange.exchange(&code, session.pkce().verifier()).await
		})
		.await
	}

	/// Fetches the directory with `access_token` and writes archives plus the manifest.
	pub async fn extract(
		&self,
		output: &OutputDirectory,
		access_token: &Secret,
	) -> Result<RunSummary> {
		let directory_client = ApplianceDirectoryClient::new(&self.config, self.http.clone());
		let directory = observe(StageSpan::new(Stage::Directory), Stage::Directory, async {
			directory_client.fetch(access_token).await
		})
		.await?;
		let transformer = DeviceBundleTransformer::new(&self.config, self.http.clone());
		let mut registry = ProfileRegistry::default();
		let mut summary = RunSummary::default();

		for record in directory.appliances() {
			let Some(profile) = DeviceProfile::from_record(record, OffsetDateTime::now_utc()) else {
				tracing::info!(
					appliance = %record.identifier,
					"Appliance has neither a TLS nor an AES credential; skipping."
				);

				summary.skipped.push(record.identifier.clone());

				continue;
			};

			tracing::info!(
				appliance = %record.identifier,
				kind = %record.kind,
				serial_number = %record.serial_number,
				connection_type = %profile.connection_type,
				"Processing appliance."
			);
			tracing::debug!(
				appliance = %record.identifier,
				key = "present",
				iv = profile.iv.is_some(),
				"Appliance credential material."
			);

			let path = self
				.save_bundle(&transformer, output, access_token, &profile)
				.await
				.map_err(|e| e.for_device(record.identifier.as_str()))?;

			summary.archives.push(path);
			registry.push(profile);
		}

		summary.manifest = observe(StageSpan::new(Stage::Registry), Stage::Registry, async {
			output.write_manifest(&registry).map_err(Error::from)
		})
		.await?;
		summary.profiles = registry.profiles().to_vec();

		tracing::info!(
			profiles = summary.profiles.len(),
			skipped = summary.skipped.len(),
			manifest = %summary.manifest.display(),
			"Extraction finished."
		);

		Ok(summary)
	}

	async fn save_bundle(
		&self,
		transformer: &DeviceBundleTransformer,
		output: &OutputDirectory,
		access_token: &Secret,
		profile: &DeviceProfile,
	) -> Result<PathBuf> {
		let id = profile.ha_id.as_str();
		let archive = observe(StageSpan::for_device(Stage::Bundle, id), Stage::Bundle, async {
			transformer.transform(access_token, profile).await
		})
		.await?;

		observe(StageSpan::for_device(Stage::Registry, id), Stage::Registry, async {
			output.write_archive(profile, &archive).map_err(Error::from)
		})
		.await
	}
}
impl Debug for Extractor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Extractor")
			.field("config", &self.config)
			.field("output", &self.output)
			.finish_non_exhaustive()
	}
}

async fn observe<T, Fut>(span: StageSpan, stage: Stage, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	record_stage_outcome(stage, StageOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_stage_outcome(stage, StageOutcome::Success),
		Err(e) => {
			record_stage_outcome(stage, StageOutcome::Failure);

			tracing::debug!(stage = stage.as_str(), error = %e, "Stage failed.");
		},
	}

	result
}
