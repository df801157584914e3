//! Run-level error types shared by the authorization, directory, and bundle stages.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced by every public API.
///
/// Every variant is fatal to the run; nothing here is retried.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The vendor broke the OAuth contract; the user must restart the login.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// Network, HTTP status, or I/O failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// A response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// The device description archive could not be rewritten.
	#[error(transparent)]
	Archive(#[from] crate::bundle::ArchiveError),
	/// The controlled browser failed.
	#[error(transparent)]
	Browser(#[from] crate::browser::BrowserError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Output files could not be written.
	#[error(transparent)]
	Output(#[from] crate::registry::OutputError),

	/// Failure raised while processing a single appliance.
	#[error("Failed to process appliance `{identifier}`.")]
	Device {
		/// Identifier of the appliance being processed.
		identifier: String,
		/// Underlying failure.
		#[source]
		source: Box<Error>,
	},
	/// The user did not finish the interactive login before the configured deadline.
	#[error("Login was not completed within {seconds} seconds.")]
	LoginTimedOut {
		/// Configured deadline in seconds.
		seconds: u64,
	},
}
impl Error {
	/// Attributes this failure to the appliance identified by `identifier`.
	pub fn for_device(self, identifier: impl Into<String>) -> Self {
		Self::Device { identifier: identifier.into(), source: Box::new(self) }
	}
}

/// OAuth protocol violations.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// The redirect target was reached without a `code` query parameter.
	#[error("Authorization redirect is missing the code parameter: {url}.")]
	MissingCode {
		/// Redirect URL observed in the browser.
		url: String,
	},
	/// The authorization server redirected back with an OAuth error.
	#[error("Authorization was denied: {error}{}.", describe(.description))]
	AuthorizationDenied {
		/// OAuth `error` value.
		error: String,
		/// Optional `error_description` value.
		description: Option<String>,
	},
	/// The `state` value on the redirect does not belong to this session.
	#[error("Authorization redirect carried a foreign state value.")]
	StateMismatch,
	/// The token endpoint answered with an OAuth error body.
	#[error("Token endpoint rejected the authorization code: {error}{}.", describe(.description))]
	TokenRejected {
		/// OAuth `error` value.
		error: String,
		/// Optional `error_description` value.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The token endpoint answered with a response the OAuth client could not accept.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	UnexpectedTokenResponse {
		/// Client-supplied description of the mismatch.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The token endpoint answered without a usable access token.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken,
}

fn describe(description: &Option<String>) -> String {
	description.as_deref().map(|value| format!(" ({value})")).unwrap_or_default()
}

/// Transport-level failures (network, HTTP status, I/O).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Endpoint answered with a non-success HTTP status.
	#[error("The {endpoint} endpoint answered with HTTP {status}.")]
	Status {
		/// Endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
	},
	/// Underlying I/O failure surfaced during transport.
	#[error("I/O error occurred while calling the {endpoint} endpoint.")]
	Io {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying failure.
		#[source]
		source: std::io::Error,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Response decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// The body is not the JSON document the endpoint is expected to return.
	#[error("The {endpoint} endpoint returned malformed JSON at `{}`.", .source.path())]
	Json {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl DecodeError {
	/// Decodes `bytes` as `T`, keeping the failing JSON path on error.
	pub fn decode_json<T>(endpoint: &'static str, bytes: &[u8]) -> Result<T, Self>
	where
		T: serde::de::DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut de).map_err(|source| Self::Json { endpoint, source })
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured URL cannot be parsed.
	#[error("The {name} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed to parse.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured base URL has an unsupported shape.
	#[error("The {name} URL {url} is not usable: {reason}.")]
	InvalidEndpoint {
		/// Which URL failed validation.
		name: &'static str,
		/// URL that failed validation.
		url: String,
		/// Short reason.
		reason: &'static str,
	},
	/// Endpoints must use HTTPS outside of loopback testing.
	#[error("The {name} URL must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which URL failed validation.
		name: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// The region name is not one of the supported regions.
	#[error("Unknown region `{value}`; expected one of EU, NA, CN, RU.")]
	UnknownRegion {
		/// Rejected input.
		value: String,
	},
	/// The OAuth client identifier is empty.
	#[error("Client identifier cannot be empty.")]
	EmptyClientId,
	/// At least one scope must be requested.
	#[error("At least one scope must be requested.")]
	EmptyScopes,
	/// Scopes are space-joined, so they cannot contain whitespace.
	#[error("Scope `{scope}` is empty or contains whitespace.")]
	InvalidScope {
		/// Rejected scope.
		scope: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn device_errors_name_the_appliance() {
		let err = Error::from(ProtocolError::EmptyAccessToken)
			.for_device("SIEMENS-HB678GBS6-68A40E000001");
		let cause = err.source().map(ToString::to_string).unwrap_or_default();

		assert_eq!(
			err.to_string(),
			"Failed to process appliance `SIEMENS-HB678GBS6-68A40E000001`."
		);
		assert_eq!(cause, "Token endpoint returned an empty access token.");
	}

	#[test]
	fn decode_errors_report_the_json_path() {
		#[derive(Debug, Deserialize)]
		struct Document {
			#[allow(dead_code)]
			data: Vec<u32>,
		}

		let err = DecodeError::decode_json::<Document>("account details", br#"{"data":[1,"x"]}"#)
			.expect_err("Mistyped element should fail to decode.");

		assert!(err.to_string().contains("data[1]"), "Unexpected message: {err}.");
	}

	#[test]
	fn denial_messages_include_descriptions() {
		let err = ProtocolError::AuthorizationDenied {
			error: "access_denied".into(),
			description: Some("user cancelled".into()),
		};

		assert_eq!(err.to_string(), "Authorization was denied: access_denied (user cancelled).");
	}
}
