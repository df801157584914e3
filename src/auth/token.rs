//! Authorization-code-for-token exchange.

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthorizationCode, Client, ClientId, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RequestTokenError, StandardRevocableToken,
	StandardTokenResponse, TokenResponse as _, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	config::VendorConfig,
	error::{ConfigError, DecodeError, ProtocolError, TransportError},
	http::{Endpoint, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	secret::Secret,
};

type VendorTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;
type VendorOAuthClient = Client<
	BasicErrorResponse,
	VendorTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// OpenID fields the vendor adds to its token responses.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IdTokenFields {
	/// Optional OpenID Connect ID token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

/// Decoded token endpoint response. Only the access token is consumed downstream.
#[derive(Clone, Debug)]
pub struct TokenResponse {
	/// Bearer token for the asset endpoints; never empty.
	pub access_token: Secret,
	/// Lifetime reported by the server.
	pub expires_in: Option<Duration>,
	/// OpenID Connect ID token.
	pub id_token: Option<Secret>,
	/// Refresh token. Not stored or used.
	pub refresh_token: Option<Secret>,
	/// Granted scopes, when the server echoes them.
	pub scope: Option<Vec<String>>,
	/// Token type, normally `Bearer`.
	pub token_type: String,
}

/// Exchanges a captured authorization code and its PKCE verifier for an access token.
///
/// One form-encoded POST, no retry. `C` is the HTTP transport; tests substitute recording
/// transports through [`TokenHttpClient`].
pub struct TokenExchangeClient<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	oauth_client: VendorOAuthClient,
	redirect_uri: RedirectUrl,
	http_client: Arc<C>,
}
impl<C> TokenExchangeClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Builds a client for the token endpoint of `config`.
	pub fn new(config: &VendorConfig, http_client: impl Into<Arc<C>>) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(config.endpoints.token_url().to_string())
			.map_err(|source| ConfigError::InvalidUrl { name: "token", source })?;
		let redirect_uri = RedirectUrl::new(config.redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidUrl { name: "redirect", source })?;
		let oauth_client: VendorOAuthClient = Client::new(ClientId::new(config.client_id.clone()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, redirect_uri, http_client: http_client.into() })
	}

	/// Sends `grant_type=authorization_code` with `code`, `code_verifier`, `client_id`, and
	/// `redirect_uri`.
	///
	/// A body that is not a token response, an OAuth error body, and a response without an
	/// access token are all fatal.
	pub async fn exchange(&self, code: &Secret, verifier: &Secret) -> Result<TokenResponse> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.expose().to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(verifier.expose().to_owned()))
			.set_redirect_uri(Cow::Borrowed(&self.redirect_uri))
			.request_async(&instrumented)
			.await
			.map_err(|e| map_request_error(meta.take(), e))?;
		let token = into_token_response(response)?;

		tracing::info!(
			token_type = %token.token_type,
			expires_in = token.expires_in.map(|value| value.as_secs()),
			"Obtained access token."
		);

		Ok(token)
	}
}
impl<C> Debug for TokenExchangeClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchangeClient")
			.field("redirect_uri", &self.redirect_uri.as_str())
			.finish_non_exhaustive()
	}
}

fn into_token_response(response: VendorTokenResponse) -> Result<TokenResponse> {
	let access_token = response.access_token().secret();

	if access_token.trim().is_empty() {
		return Err(ProtocolError::EmptyAccessToken.into());
	}

	Ok(TokenResponse {
		access_token: Secret::new(access_token.as_str()),
		expires_in: response.expires_in(),
		id_token: response.extra_fields().id_token.clone().map(Secret::new),
		refresh_token: response.refresh_token().map(|token| Secret::new(token.secret().as_str())),
		scope: response.scopes().map(|scopes| scopes.iter().map(|scope| (**scope).clone()).collect()),
		token_type: response.token_type().as_ref().to_owned(),
	})
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<E>, BasicErrorResponse>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);
	let endpoint = Endpoint::Token.as_str();

	match err {
		RequestTokenError::ServerResponse(response) => ProtocolError::TokenRejected {
			error: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
			status,
		}
		.into(),
		RequestTokenError::Request(error) => map_transport_error(error, status),
		RequestTokenError::Parse(source, _body) => DecodeError::Json { endpoint, source }.into(),
		RequestTokenError::Other(message) =>
			ProtocolError::UnexpectedTokenResponse { message, status }.into(),
	}
}

fn map_transport_error<E>(err: HttpClientError<E>, status: Option<u16>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let endpoint = Endpoint::Token.as_str();

	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(endpoint, *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(source) => TransportError::Io { endpoint, source }.into(),
		HttpClientError::Other(message) =>
			ProtocolError::UnexpectedTokenResponse { message, status }.into(),
		other => ProtocolError::UnexpectedTokenResponse { message: other.to_string(), status }
			.into(),
	}
}
