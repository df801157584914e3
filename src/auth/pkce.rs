//! PKCE (RFC 7636) material generated once per authorization session.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, secret::Secret};

const PKCE_VERIFIER_LEN: usize = 64;
const NONCE_LEN: usize = 32;
const STATE_LEN: usize = 32;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Verifier, challenge, nonce, and state for one authorization session.
///
/// The verifier only ever leaves the process in the token request; the authorization
/// endpoint sees the challenge.
#[derive(Clone)]
pub struct PkceMaterial {
	verifier: Secret,
	challenge: String,
	method: PkceCodeChallengeMethod,
	nonce: String,
	state: String,
}
impl PkceMaterial {
	/// Draws fresh material from the thread-local CSPRNG.
	pub fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self {
			verifier: Secret::new(verifier),
			challenge,
			method: PkceCodeChallengeMethod::S256,
			nonce: random_string(NONCE_LEN),
			state: random_string(STATE_LEN),
		}
	}

	/// Secret code verifier, sent only to the token endpoint.
	pub fn verifier(&self) -> &Secret {
		&self.verifier
	}

	/// `base64url(SHA-256(verifier))`.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}

	/// OpenID nonce sent with the authorization request.
	pub fn nonce(&self) -> &str {
		&self.nonce
	}

	/// Opaque state value that must round-trip via the redirect.
	pub fn state(&self) -> &str {
		&self.state
	}
}
impl Debug for PkceMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkceMaterial")
			.field("verifier", &self.verifier)
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.field("nonce", &self.nonce)
			.field("state", &self.state)
			.finish()
	}
}

/// Computes the S256 challenge for `verifier`.
pub fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(verifier.as_bytes());
	let digest = hasher.finalize();
	URL_SAFE_NO_PAD.encode(digest)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
