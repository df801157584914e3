//! Interactive login URL composition.

// self
use crate::{_prelude::*, auth::PkceMaterial, config::VendorConfig};

/// Builds the authorization endpoint URL for `pkce` under `config`.
///
/// Only the challenge is sent; the verifier stays with the session.
pub fn build_authorize_url(config: &VendorConfig, pkce: &PkceMaterial) -> Url {
	let mut url = config.endpoints.authorize_url().clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("prompt", "login");
	pairs.append_pair("code_challenge", pkce.challenge());
	pairs.append_pair("code_challenge_method", pkce.method().as_str());
	pairs.append_pair("client_id", &config.client_id);
	pairs.append_pair("scope", &config.scope_string());
	pairs.append_pair("nonce", pkce.nonce());
	pairs.append_pair("state", pkce.state());
	pairs.append_pair("redirect_uri", config.redirect_uri.as_str());

	drop(pairs);

	url
}
