//! Immutable vendor configuration: client identity, scopes, redirect target, and regional
//! endpoints.
//!
//! Regional base URLs are treated as data to validate rather than trusted shapes. Every base
//! must be HTTPS (plain HTTP is tolerated for loopback hosts so local mocks work), must be able
//! to carry a path, and must not carry a query or fragment. The authorization base is
//! normalized to a directory-style path so `authorize` and `token` resolve as its children.

// self
use crate::{_prelude::*, error::ConfigError};

/// OAuth client identifier registered for the vendor's mobile application.
pub const DEFAULT_CLIENT_ID: &str =
	"9B75AC9EC512F36C84256AC47D813E2C1DD0D6520DF774B020E1E6E2EB29B1F3";
/// Redirect target registered for [`DEFAULT_CLIENT_ID`].
pub const DEFAULT_REDIRECT_URI: &str = "https://app.home-connect.com/auth/prod";
/// Scopes requested by default.
pub const DEFAULT_SCOPES: [&str; 10] = [
	"ReadAccount",
	"Settings",
	"IdentifyAppliance",
	"Control",
	"DeleteAppliance",
	"WriteAppliance",
	"ReadOrigApi",
	"Monitor",
	"WriteOrigApi",
	"Images",
];

const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Vendor cloud regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
	/// Europe (default).
	#[default]
	#[serde(rename = "EU")]
	Eu,
	/// North America.
	#[serde(rename = "NA")]
	Na,
	/// China.
	#[serde(rename = "CN")]
	Cn,
	/// Russia.
	#[serde(rename = "RU")]
	Ru,
}
impl Region {
	/// Every supported region.
	pub const ALL: [Region; 4] = [Region::Eu, Region::Na, Region::Cn, Region::Ru];

	/// Returns the short region code.
	pub const fn as_str(self) -> &'static str {
		match self {
			Region::Eu => "EU",
			Region::Na => "NA",
			Region::Cn => "CN",
			Region::Ru => "RU",
		}
	}

	const fn base_urls(self) -> (&'static str, &'static str) {
		match self {
			Region::Eu => (
				"https://api.home-connect.com/security/oauth/",
				"https://prod.reu.rest.homeconnectegw.com",
			),
			Region::Na =>
				("https://api-rna.home-connect.com", "https://prod.rna.rest.homeconnectegw.com"),
			Region::Cn =>
				("https://api.home-connect.cn", "https://prod.rgc.rest.homeconnectegw.cn"),
			Region::Ru =>
				("https://api-rus.home-connect.com", "https://prod.rus.rest.homeconnectegw.com"),
		}
	}
}
impl Display for Region {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Region {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Region::ALL
			.into_iter()
			.find(|region| region.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| ConfigError::UnknownRegion { value: s.to_owned() })
	}
}

/// Validated endpoint set for one region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionEndpoints {
	asset_base: Url,
	authorize: Url,
	token: Url,
}
impl RegionEndpoints {
	/// Builds the built-in endpoint set for `region`.
	pub fn for_region(region: Region) -> Result<Self, ConfigError> {
		let (authorization_base, asset_base) = region.base_urls();

		Self::parse(authorization_base, asset_base)
	}

	/// Parses and validates a custom endpoint pair.
	pub fn parse(authorization_base: &str, asset_base: &str) -> Result<Self, ConfigError> {
		let authorization_base = Url::parse(authorization_base)
			.map_err(|source| ConfigError::InvalidUrl { name: "authorization base", source })?;
		let asset_base = Url::parse(asset_base)
			.map_err(|source| ConfigError::InvalidUrl { name: "asset base", source })?;

		Self::new(authorization_base, asset_base)
	}

	/// Validates and normalizes a custom endpoint pair.
	pub fn new(authorization_base: Url, asset_base: Url) -> Result<Self, ConfigError> {
		let authorization_base =
			as_directory(validate_base("authorization base", authorization_base)?);
		let asset_base = as_directory(validate_base("asset base", asset_base)?);
		let authorize = authorization_base
			.join("authorize")
			.map_err(|source| ConfigError::InvalidUrl { name: "authorization", source })?;
		let token = authorization_base
			.join("token")
			.map_err(|source| ConfigError::InvalidUrl { name: "token", source })?;

		Ok(Self { asset_base, authorize, token })
	}

	/// Interactive login endpoint.
	pub fn authorize_url(&self) -> &Url {
		&self.authorize
	}

	/// Code-for-token endpoint.
	pub fn token_url(&self) -> &Url {
		&self.token
	}

	/// Account details endpoint listing enrolled appliances.
	pub fn account_details_url(&self) -> Url {
		self.asset_url(&["account", "details"])
	}

	/// Device description archive endpoint for one appliance.
	pub fn device_description_url(&self, identifier: &str) -> Url {
		self.asset_url(&["api", "iddf", "v1", "iddf", identifier])
	}

	fn asset_url(&self, segments: &[&str]) -> Url {
		let mut url = self.asset_base.clone();

		// Validation rejects cannot-be-a-base URLs, so the segments are always available.
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}

		url
	}
}

/// Immutable configuration passed into every component.
#[derive(Clone, Debug)]
pub struct VendorConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// Requested scopes, joined with spaces on the wire.
	pub scopes: Vec<String>,
	/// Registered redirect target.
	pub redirect_uri: Url,
	/// Region the endpoints were derived from, when built from the built-in table.
	pub region: Option<Region>,
	/// Validated endpoint set.
	pub endpoints: RegionEndpoints,
	/// Optional deadline for the user to finish the interactive login.
	pub login_timeout: Option<Duration>,
	/// Hard deadline for tearing down the browser context.
	pub teardown_timeout: Duration,
}
impl VendorConfig {
	/// Creates a builder seeded with the vendor defaults.
	pub fn builder() -> VendorConfigBuilder {
		VendorConfigBuilder::default()
	}

	/// Default configuration for `region`.
	pub fn for_region(region: Region) -> Result<Self, ConfigError> {
		Self::builder().region(region).build()
	}

	/// Scopes joined with a single space, as sent to the authorization endpoint.
	pub fn scope_string(&self) -> String {
		self.scopes.join(" ")
	}
}

/// Builder for [`VendorConfig`] values.
#[derive(Debug)]
pub struct VendorConfigBuilder {
	client_id: String,
	scopes: Vec<String>,
	redirect_uri: Option<Url>,
	region: Region,
	endpoints: Option<RegionEndpoints>,
	login_timeout: Option<Duration>,
	teardown_timeout: Duration,
}
impl Default for VendorConfigBuilder {
	fn default() -> Self {
		Self {
			client_id: DEFAULT_CLIENT_ID.into(),
			scopes: DEFAULT_SCOPES.iter().map(|scope| (*scope).to_owned()).collect(),
			redirect_uri: None,
			region: Region::default(),
			endpoints: None,
			login_timeout: None,
			teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
		}
	}
}
impl VendorConfigBuilder {
	/// Overrides the OAuth client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = client_id.into();

		self
	}

	/// Replaces the requested scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the registered redirect target.
	pub fn redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Selects a region from the built-in endpoint table.
	pub fn region(mut self, region: Region) -> Self {
		self.region = region;

		self
	}

	/// Uses a custom endpoint set instead of the built-in table.
	pub fn endpoints(mut self, endpoints: RegionEndpoints) -> Self {
		self.endpoints = Some(endpoints);

		self
	}

	/// Bounds how long the interactive login may take.
	pub fn login_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.login_timeout = timeout;

		self
	}

	/// Overrides the browser teardown deadline (defaults to 10 seconds).
	pub fn teardown_timeout(mut self, timeout: Duration) -> Self {
		self.teardown_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<VendorConfig, ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::EmptyClientId);
		}
		if self.scopes.is_empty() {
			return Err(ConfigError::EmptyScopes);
		}
		if let Some(scope) =
			self.scopes.iter().find(|scope| scope.is_empty() || scope.contains(char::is_whitespace))
		{
			return Err(ConfigError::InvalidScope { scope: scope.clone() });
		}

		let redirect_uri = match self.redirect_uri {
			Some(url) => url,
			None => Url::parse(DEFAULT_REDIRECT_URI)
				.map_err(|source| ConfigError::InvalidUrl { name: "redirect", source })?,
		};

		if redirect_uri.host_str().is_none() {
			return Err(ConfigError::InvalidEndpoint {
				name: "redirect",
				url: redirect_uri.to_string(),
				reason: "a host is required to recognize the redirect",
			});
		}

		let (region, endpoints) = match self.endpoints {
			Some(endpoints) => (None, endpoints),
			None => (Some(self.region), RegionEndpoints::for_region(self.region)?),
		};

		Ok(VendorConfig {
			client_id: self.client_id,
			scopes: self.scopes,
			redirect_uri,
			region,
			endpoints,
			login_timeout: self.login_timeout,
			teardown_timeout: self.teardown_timeout,
		})
	}
}

fn validate_base(name: &'static str, url: Url) -> Result<Url, ConfigError> {
	if url.cannot_be_a_base() || url.host_str().is_none() {
		return Err(ConfigError::InvalidEndpoint {
			name,
			url: url.to_string(),
			reason: "a hierarchical URL with a host is required",
		});
	}
	if url.query().is_some() || url.fragment().is_some() {
		return Err(ConfigError::InvalidEndpoint {
			name,
			url: url.to_string(),
			reason: "query strings and fragments are not allowed",
		});
	}

	match url.scheme() {
		"https" => Ok(url),
		"http" if is_loopback(&url) => Ok(url),
		_ => Err(ConfigError::InsecureEndpoint { name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

fn as_directory(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builtin_regions_validate() {
		for region in Region::ALL {
			let endpoints = RegionEndpoints::for_region(region)
				.unwrap_or_else(|e| panic!("Region {region} should validate: {e}."));

			assert!(endpoints.authorize_url().as_str().ends_with("/authorize"));
			assert!(endpoints.token_url().as_str().ends_with("/token"));
		}
	}

	#[test]
	fn bare_host_authorization_bases_are_normalized() {
		let endpoints = RegionEndpoints::for_region(Region::Na).expect("NA endpoints should parse.");

		assert_eq!(endpoints.authorize_url().as_str(), "https://api-rna.home-connect.com/authorize");
		assert_eq!(endpoints.token_url().as_str(), "https://api-rna.home-connect.com/token");

		let endpoints = RegionEndpoints::for_region(Region::Eu).expect("EU endpoints should parse.");

		assert_eq!(
			endpoints.token_url().as_str(),
			"https://api.home-connect.com/security/oauth/token"
		);
	}

	#[test]
	fn asset_urls_are_joined_per_segment() {
		let endpoints = RegionEndpoints::for_region(Region::Eu).expect("EU endpoints should parse.");

		assert_eq!(
			endpoints.account_details_url().as_str(),
			"https://prod.reu.rest.homeconnectegw.com/account/details"
		);
		assert_eq!(
			endpoints.device_description_url("BOSCH-SMV68TX06E-68A40E000001").as_str(),
			"https://prod.reu.rest.homeconnectegw.com/api/iddf/v1/iddf/BOSCH-SMV68TX06E-68A40E000001"
		);

		let custom =
			RegionEndpoints::parse("https://auth.example.com/oauth", "https://assets.example.com/v2")
				.expect("Custom endpoints should parse.");

		assert_eq!(
			custom.account_details_url().as_str(),
			"https://assets.example.com/v2/account/details"
		);
		assert_eq!(custom.authorize_url().as_str(), "https://auth.example.com/oauth/authorize");
	}

	#[test]
	fn endpoints_reject_insecure_and_decorated_bases() {
		let err = RegionEndpoints::parse("http://auth.example.com/", "https://assets.example.com")
			.expect_err("Plain HTTP must be rejected for remote hosts.");

		assert!(matches!(err, ConfigError::InsecureEndpoint { name: "authorization base", .. }));

		let err = RegionEndpoints::parse("https://auth.example.com/?x=1", "https://assets.example.com")
			.expect_err("Query strings must be rejected.");

		assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
		assert!(RegionEndpoints::parse("http://127.0.0.1:8080/oauth/", "http://localhost:8080").is_ok());
	}

	#[test]
	fn region_parsing_is_case_insensitive() {
		assert_eq!("eu".parse::<Region>().expect("eu should parse."), Region::Eu);
		assert_eq!("NA".parse::<Region>().expect("NA should parse."), Region::Na);
		assert!(matches!("mars".parse::<Region>(), Err(ConfigError::UnknownRegion { .. })));
	}

	#[test]
	fn builder_validates_identity_and_scopes() {
		let config = VendorConfig::builder().build().expect("Defaults should build.");

		assert_eq!(config.region, Some(Region::Eu));
		assert_eq!(config.redirect_uri.as_str(), DEFAULT_REDIRECT_URI);
		assert_eq!(config.teardown_timeout, Duration::from_secs(10));
		assert!(config.scope_string().starts_with("ReadAccount Settings "));
		assert!(matches!(
			VendorConfig::builder().client_id(" ").build(),
			Err(ConfigError::EmptyClientId)
		));
		assert!(matches!(
			VendorConfig::builder().scopes(Vec::<String>::new()).build(),
			Err(ConfigError::EmptyScopes)
		));
		assert!(matches!(
			VendorConfig::builder().scopes(["Read Account"]).build(),
			Err(ConfigError::InvalidScope { .. })
		));
	}
}
