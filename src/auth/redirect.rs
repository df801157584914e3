//! Recognition of the OAuth redirect among browser navigations.

// self
use crate::{_prelude::*, error::ProtocolError, secret::Secret};

/// Matches navigations against the registered redirect target.
///
/// Matching is scheme-agnostic and compares host and path only; query strings and fragments
/// never influence the decision. A single trailing `/` is not significant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectMatcher {
	host: String,
	path: String,
}
impl RedirectMatcher {
	/// Builds a matcher for `redirect_uri`. Returns `None` when the URL has no host.
	pub fn new(redirect_uri: &Url) -> Option<Self> {
		let host = redirect_uri.host_str()?.to_ascii_lowercase();
		let path = normalize_path(redirect_uri.path()).to_owned();

		Some(Self { host, path })
	}

	/// Whether `candidate` points at the redirect target.
	pub fn matches(&self, candidate: &Url) -> bool {
		candidate.host_str().is_some_and(|host| host.eq_ignore_ascii_case(&self.host))
			&& normalize_path(candidate.path()) == self.path
	}

	/// Tests a raw navigation URL and, on a match, extracts the authorization code.
	///
	/// Returns `None` for navigations that are not the redirect. A matching navigation that
	/// carries an OAuth error, no code, or a foreign `state` yields the protocol violation.
	pub fn capture(&self, raw: &str, expected_state: &str) -> Option<Result<Secret, ProtocolError>> {
		let candidate = Url::parse(raw).ok()?;

		if !self.matches(&candidate) {
			return None;
		}

		Some(extract_code(&candidate, expected_state))
	}
}

fn extract_code(redirect: &Url, expected_state: &str) -> Result<Secret, ProtocolError> {
	let pairs: HashMap<String, String> = redirect.query_pairs().into_owned().collect();

	if pairs.get("state").is_some_and(|state| state != expected_state) {
		return Err(ProtocolError::StateMismatch);
	}

	match pairs.get("code").filter(|code| !code.is_empty()) {
		Some(code) => Ok(Secret::new(code.as_str())),
		None => match pairs.get("error") {
			Some(error) => Err(ProtocolError::AuthorizationDenied {
				error: error.clone(),
				description: pairs.get("error_description").cloned(),
			}),
			None => Err(ProtocolError::MissingCode { url: redacted(redirect) }),
		},
	}
}

fn redacted(url: &Url) -> String {
	let mut url = url.clone();

	url.set_query(None);
	url.set_fragment(None);

	url.to_string()
}

fn normalize_path(path: &str) -> &str {
	match path.strip_suffix('/') {
		Some(stripped) if !stripped.is_empty() => stripped,
		_ => path,
	}
}
