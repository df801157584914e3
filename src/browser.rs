//! Controlled, user-visible browser contexts used by the interactive login.
//!
//! [`BrowserLauncher`] and [`BrowserContext`] are the only seam between the authorization
//! session and a concrete browser. [`ChromeLauncher`] drives a Chromium-family browser over
//! the Chrome DevTools Protocol.

pub mod chrome;

pub use chrome::*;

// crates.io
use tokio::sync::mpsc::UnboundedReceiver;
// self
use crate::_prelude::*;

/// Future returned by browser operations.
pub type BrowserFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BrowserError>> + 'a + Send>>;

/// Stream of URLs the browser's pages navigated to, in observation order.
pub type NavigationEvents = UnboundedReceiver<String>;

/// Starts fresh browser contexts.
pub trait BrowserLauncher
where
	Self: Send + Sync,
{
	/// Launches a visible browser context owned exclusively by the caller.
	fn launch(&self) -> BrowserFuture<'_, Box<dyn BrowserContext>>;
}

/// One browser context, owned by a single authorization session.
pub trait BrowserContext
where
	Self: Send,
{
	/// Starts forwarding page navigations.
	///
	/// Every navigation that happens after this resolves is delivered, so callers register
	/// before navigating.
	fn observe(&mut self) -> BrowserFuture<'_, NavigationEvents>;

	/// Opens `url` in the context.
	fn navigate<'a>(&'a mut self, url: &'a Url) -> BrowserFuture<'a, ()>;

	/// Destroys the context and everything it owns.
	fn close(self: Box<Self>) -> BrowserFuture<'static, ()>;
}

/// Browser launch and DevTools protocol failures.
#[derive(Debug, ThisError)]
pub enum BrowserError {
	/// No browser executable was configured or found on the system.
	#[error("Could not find a Chrome/Chromium executable; pass one explicitly.")]
	ExecutableNotFound,
	/// The browser process could not be started.
	#[error("Failed to launch the browser at `{path}`.")]
	Launch {
		/// Executable that failed to start.
		path: String,
		/// Underlying failure.
		#[source]
		source: std::io::Error,
	},
	/// The DevTools endpoint did not come up in time.
	#[error("The browser DevTools endpoint did not become reachable within {seconds} seconds.")]
	StartupTimeout {
		/// Deadline in seconds.
		seconds: u64,
	},
	/// The DevTools endpoint answered with something unexpected.
	#[error("The browser DevTools endpoint is unusable: {reason}.")]
	DevTools {
		/// Short description.
		reason: String,
	},
	/// The DevTools WebSocket failed.
	#[error("The browser DevTools connection failed.")]
	Connection {
		/// Underlying failure.
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
	/// A DevTools command returned an error.
	#[error("DevTools command `{method}` failed: {message}.")]
	Command {
		/// CDP method.
		method: &'static str,
		/// CDP error message.
		message: String,
	},
	/// A DevTools command got no answer in time.
	#[error("DevTools command `{method}` timed out.")]
	CommandTimeout {
		/// CDP method.
		method: &'static str,
	},
	/// The navigation event stream ended before the redirect was observed.
	#[error("The browser closed before the authorization redirect was observed.")]
	Disconnected,
	/// Tearing the browser down failed.
	#[error("Failed to shut the browser down.")]
	Shutdown {
		/// Underlying failure.
		#[source]
		source: std::io::Error,
	},
}
impl BrowserError {
	/// Wraps a WebSocket or serialization failure.
	pub fn connection(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Connection { source: Box::new(src) }
	}
}
