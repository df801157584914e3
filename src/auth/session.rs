//! Browser-driven interactive authorization session.
//!
//! The session owns one browser context for its whole life and moves through
//! `Created -> Navigated -> AwaitingRedirect -> CodeCaptured -> Closed`. A watcher task
//! tests each observed navigation against the redirect target and hands the first match
//! to the session through a one-shot channel. The context is closed on every exit path,
//! bounded by the teardown timeout; teardown failures are logged and swallowed.

// crates.io
use tokio::{sync::oneshot, task::JoinHandle, time};
// self
use crate::{
	_prelude::*,
	auth::{PkceMaterial, RedirectMatcher, build_authorize_url},
	browser::{BrowserContext, BrowserError, BrowserLauncher, NavigationEvents},
	config::VendorConfig,
	error::{ConfigError, ProtocolError},
	secret::Secret,
};

type CodeSender = oneshot::Sender<Result<Secret, ProtocolError>>;

/// Lifecycle of an [`InteractiveSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	/// PKCE material and the login URL exist; no browser yet.
	Created,
	/// The browser was sent to the login URL.
	Navigated,
	/// Waiting for the user to finish logging in.
	AwaitingRedirect,
	/// The authorization code was intercepted.
	CodeCaptured,
	/// The browser context was torn down.
	Closed,
}

/// One interactive login, bound to one browser context.
pub struct InteractiveSession {
	state: SessionState,
	pkce: PkceMaterial,
	authorize_url: Url,
	matcher: RedirectMatcher,
	login_timeout: Option<Duration>,
	teardown_timeout: Duration,
}
impl InteractiveSession {
	/// Prepares a session: fresh PKCE material and the login URL.
	pub fn new(config: &VendorConfig) -> Result<Self, ConfigError> {
		let matcher = RedirectMatcher::new(&config.redirect_uri).ok_or_else(|| {
			ConfigError::InvalidEndpoint {
				name: "redirect",
				url: config.redirect_uri.to_string(),
				reason: "the redirect target has no host",
			}
		})?;
		let pkce = PkceMaterial::generate();
		let authorize_url = build_authorize_url(config, &pkce);

		Ok(Self {
			state: SessionState::Created,
			pkce,
			authorize_url,
			matcher,
			login_timeout: config.login_timeout,
			teardown_timeout: config.teardown_timeout,
		})
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SessionState {
		self.state
	}

	/// Login URL the browser is sent to.
	pub fn authorize_url(&self) -> &Url {
		&self.authorize_url
	}

	/// PKCE material; the verifier is needed for the token exchange.
	pub fn pkce(&self) -> &PkceMaterial {
		&self.pkce
	}

	/// Launches a browser, waits for the user to log in, and returns the authorization code.
	///
	/// Without a login timeout this waits for as long as the user takes.
	pub async fn run(&mut self, launcher: &dyn BrowserLauncher) -> Result<Secret> {
		let mut context = launcher.launch().await?;
		let outcome = self.drive(context.as_mut()).await;

		match time::timeout(self.teardown_timeout, context.close()).await {
			Ok(Ok(())) => tracing::debug!("Browser context closed."),
			Ok(Err(e)) => tracing::warn!(error = %e, "Failed to close the browser context."),
			Err(_) => tracing::warn!(
				seconds = self.teardown_timeout.as_secs(),
				"Timed out closing the browser context."
			),
		}

		self.state = SessionState::Closed;

		outcome
	}

	async fn drive(&mut self, context: &mut dyn BrowserContext) -> Result<Secret> {
		let events = context.observe().await?;
		let (tx, rx) = oneshot::channel();
		let watcher = spawn_watcher(events, self.matcher.clone(), self.pkce.state().to_owned(), tx);
		let outcome = self.await_code(context, rx).await;

		watcher.abort();

		outcome
	}

	async fn await_code(
		&mut self,
		context: &mut dyn BrowserContext,
		rx: oneshot::Receiver<Result<Secret, ProtocolError>>,
	) -> Result<Secret> {
		context.navigate(&self.authorize_url).await?;

		self.state = SessionState::Navigated;

		tracing::info!("Waiting for the login to complete in the browser.");

		self.state = SessionState::AwaitingRedirect;

		let received = match self.login_timeout {
			Some(limit) => time::timeout(limit, rx)
				.await
				.map_err(|_| Error::LoginTimedOut { seconds: limit.as_secs() })?,
			None => rx.await,
		};
		let code = received.map_err(|_| BrowserError::Disconnected)??;

		self.state = SessionState::CodeCaptured;

		tracing::info!("Captured the authorization code.");

		Ok(code)
	}
}
impl Debug for InteractiveSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InteractiveSession")
			.field("state", &self.state)
			.field("authorize_url", &self.authorize_url)
			.field("pkce", &self.pkce)
			.finish_non_exhaustive()
	}
}

fn spawn_watcher(
	mut events: NavigationEvents,
	matcher: RedirectMatcher,
	expected_state: String,
	tx: CodeSender,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		while let Some(url) = events.recv().await {
			if let Some(captured) = matcher.capture(&url, &expected_state) {
				// The first match is the only one that counts.
				let _ = tx.send(captured);

				return;
			}
		}
	})
}
