//! Chromium-family browser driven over the Chrome DevTools Protocol.
//!
//! 1. Launch the browser visibly with `--remote-debugging-port` and a throw-away profile.
//! 2. Poll `http://127.0.0.1:{port}/json/version` until the browser-level WebSocket URL is
//!    published, then connect to it.
//! 3. A reader task routes command replies by message ID and forwards page target URL
//!    changes (`Target.targetCreated` / `Target.targetInfoChanged`) to the observer.

// std
use std::process::Stdio;
// crates.io
use futures::{
	SinkExt, StreamExt,
	stream::{SplitSink, SplitStream},
};
use serde_json::{Value, json};
use tokio::{
	net::TcpStream,
	process::{Child, Command},
	sync::{
		mpsc::{self, UnboundedSender},
		oneshot,
	},
	task::JoinHandle,
	time::{self, Instant},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
// self
use crate::{
	_prelude::*,
	browser::{BrowserContext, BrowserError, BrowserFuture, BrowserLauncher, NavigationEvents},
};

/// Default Chrome DevTools Protocol debug port.
pub const DEFAULT_DEBUG_PORT: u16 = 9222;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(250);
const EXIT_GRACE: Duration = Duration::from_secs(3);

type DevToolsSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, String>>>>>;
type NavigationSink = Arc<Mutex<Option<UnboundedSender<String>>>>;

/// Launches a visible Chromium-family browser per login.
#[derive(Clone, Debug)]
pub struct ChromeLauncher {
	executable: Option<PathBuf>,
	debug_port: u16,
	client: ReqwestClient,
}
impl ChromeLauncher {
	/// Creates a launcher that uses the default debug port.
	pub fn new() -> Self {
		Self::with_port(DEFAULT_DEBUG_PORT)
	}

	/// Creates a launcher that uses a custom debug port.
	pub fn with_port(debug_port: u16) -> Self {
		let client = ReqwestClient::builder()
			.timeout(Duration::from_secs(2))
			.build()
			.unwrap_or_default();

		Self { executable: None, debug_port, client }
	}

	/// Uses an explicit browser executable instead of searching well-known locations.
	pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
		self.executable = Some(path.into());

		self
	}

	fn find_executable(&self) -> Result<PathBuf, BrowserError> {
		if let Some(path) = &self.executable {
			return Ok(path.clone());
		}

		let candidates: &[&str] = if cfg!(target_os = "macos") {
			&[
				"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
				"/Applications/Chromium.app/Contents/MacOS/Chromium",
				"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
			]
		} else if cfg!(target_os = "windows") {
			&[
				r"C:\Program Files\Google\Chrome\Application\chrome.exe",
				r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
				r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
			]
		} else {
			&["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
		};

		candidates
			.iter()
			.find_map(|candidate| locate(candidate))
			.ok_or(BrowserError::ExecutableNotFound)
	}

	async fn wait_for_devtools(&self) -> Result<String, BrowserError> {
		let url = format!("http://127.0.0.1:{}/json/version", self.debug_port);
		let deadline = Instant::now() + STARTUP_TIMEOUT;

		loop {
			if let Ok(response) = self.client.get(&url).send().await {
				let body = response
					.bytes()
					.await
					.map_err(|e| BrowserError::DevTools { reason: e.to_string() })?;
				let version: Value =
					serde_json::from_slice(&body).map_err(BrowserError::connection)?;

				return version
					.get("webSocketDebuggerUrl")
					.and_then(Value::as_str)
					.map(str::to_owned)
					.ok_or_else(|| BrowserError::DevTools {
						reason: "`/json/version` has no webSocketDebuggerUrl".into(),
					});
			}
			if Instant::now() >= deadline {
				return Err(BrowserError::StartupTimeout { seconds: STARTUP_TIMEOUT.as_secs() });
			}

			time::sleep(POLL_INTERVAL).await;
		}
	}

	async fn connect(&self, profile_dir: ProfileDir) -> Result<ChromeContext, BrowserError> {
		let executable = self.find_executable()?;

		tracing::info!(
			executable = %executable.display(),
			port = self.debug_port,
			"Launching browser for the interactive login."
		);

		let child = Command::new(&executable)
			.arg(format!("--remote-debugging-port={}", self.debug_port))
			.arg(format!("--user-data-dir={}", profile_dir.path().display()))
			.arg("--no-first-run")
			.arg("--no-default-browser-check")
			.arg("about:blank")
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true)
			.spawn()
			.map_err(|source| BrowserError::Launch {
				path: executable.display().to_string(),
				source,
			})?;
		let ws_url = self.wait_for_devtools().await?;
		let (socket, _) = connect_async(ws_url.as_str()).await.map_err(BrowserError::connection)?;

		tracing::debug!(%ws_url, "Connected to the browser DevTools endpoint.");

		Ok(ChromeContext::start(child, socket, profile_dir))
	}
}
impl Default for ChromeLauncher {
	fn default() -> Self {
		Self::new()
	}
}
impl BrowserLauncher for ChromeLauncher {
	fn launch(&self) -> BrowserFuture<'_, Box<dyn BrowserContext>> {
		Box::pin(async move {
			let context = self.connect(ProfileDir::new()).await?;

			Ok(Box::new(context) as Box<dyn BrowserContext>)
		})
	}
}

/// Throw-away `--user-data-dir`, removed on drop.
struct ProfileDir(PathBuf);
impl ProfileDir {
	fn new() -> Self {
		Self(std::env::temp_dir().join(format!(
			"hc-extract-profile-{}-{}",
			std::process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos()
		)))
	}

	fn path(&self) -> &Path {
		&self.0
	}
}
impl Drop for ProfileDir {
	fn drop(&mut self) {
		let _ = std::fs::remove_dir_all(&self.0);
	}
}

/// Browser process plus its DevTools connection.
pub struct ChromeContext {
	child: Child,
	sink: SplitSink<DevToolsSocket, Message>,
	pending: PendingReplies,
	navigations: NavigationSink,
	reader: JoinHandle<()>,
	next_id: u64,
	// Declared last so the directory goes after the process is killed.
	_profile_dir: ProfileDir,
}
impl ChromeContext {
	fn start(child: Child, socket: DevToolsSocket, profile_dir: ProfileDir) -> Self {
		let (sink, stream) = socket.split();
		let pending = PendingReplies::default();
		let navigations = NavigationSink::default();
		let reader = tokio::spawn(read_frames(stream, pending.clone(), navigations.clone()));

		Self { child, sink, pending, navigations, reader, next_id: 0, _profile_dir: profile_dir }
	}

	async fn command(&mut self, method: &'static str, params: Value) -> Result<Value, BrowserError> {
		self.next_id += 1;

		let id = self.next_id;
		let (tx, rx) = oneshot::channel();

		self.pending.lock().insert(id, tx);

		tracing::debug!(method, id, "Sending DevTools command.");

		let frame = json!({ "id": id, "method": method, "params": params });

		self.sink
			.send(Message::Text(frame.to_string().into()))
			.await
			.map_err(BrowserError::connection)?;

		match time::timeout(COMMAND_TIMEOUT, rx).await {
			Ok(Ok(Ok(result))) => Ok(result),
			Ok(Ok(Err(message))) => Err(BrowserError::Command { method, message }),
			Ok(Err(_)) => Err(BrowserError::Disconnected),
			Err(_) => {
				self.pending.lock().remove(&id);

				Err(BrowserError::CommandTimeout { method })
			},
		}
	}
}
impl BrowserContext for ChromeContext {
	fn observe(&mut self) -> BrowserFuture<'_, NavigationEvents> {
		Box::pin(async move {
			let (tx, rx) = mpsc::unbounded_channel();

			*self.navigations.lock() = Some(tx);
			self.command("Target.setDiscoverTargets", json!({ "discover": true })).await?;

			Ok(rx)
		})
	}

	fn navigate<'a>(&'a mut self, url: &'a Url) -> BrowserFuture<'a, ()> {
		Box::pin(async move {
			let result = self.command("Target.createTarget", json!({ "url": url.as_str() })).await?;

			tracing::debug!(target = ?result.get("targetId"), "Opened the login page.");

			Ok(())
		})
	}

	fn close(self: Box<Self>) -> BrowserFuture<'static, ()> {
		Box::pin(async move {
			let mut this = *self;

			if let Err(e) = this.command("Browser.close", json!({})).await {
				tracing::debug!(error = %e, "Browser.close failed; killing the process.");
			}

			this.reader.abort();

			match time::timeout(EXIT_GRACE, this.child.wait()).await {
				Ok(Ok(_)) => Ok(()),
				_ => this.child.kill().await.map_err(|source| BrowserError::Shutdown { source }),
			}
		})
	}
}
impl Drop for ChromeContext {
	fn drop(&mut self) {
		self.reader.abort();

		let _ = self.child.start_kill();
	}
}

async fn read_frames(
	mut stream: SplitStream<DevToolsSocket>,
	pending: PendingReplies,
	navigations: NavigationSink,
) {
	while let Some(message) = stream.next().await {
		let text = match message {
			Ok(Message::Text(text)) => text,
			Ok(Message::Close(_)) => break,
			Ok(_) => continue,
			Err(e) => {
				tracing::debug!(error = %e, "DevTools connection ended.");

				break;
			},
		};
		let Ok(frame) = serde_json::from_str::<Value>(&text) else {
			continue;
		};

		if let Some(id) = frame.get("id").and_then(Value::as_u64) {
			let reply = pending.lock().remove(&id);

			if let Some(reply) = reply {
				let _ = reply.send(command_outcome(&frame));
			}

			continue;
		}
		if let Some(url) = navigation_url(&frame) {
			tracing::trace!(%url, "Observed page navigation.");

			if let Some(sink) = navigations.lock().as_ref() {
				let _ = sink.send(url);
			}
		}
	}

	// Dropping the sender ends the observer's stream.
	navigations.lock().take();
	pending.lock().clear();
}

fn command_outcome(frame: &Value) -> Result<Value, String> {
	match frame.get("error") {
		Some(error) => Err(error
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or("unknown DevTools error")
			.to_owned()),
		None => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
	}
}

fn navigation_url(frame: &Value) -> Option<String> {
	let method = frame.get("method")?.as_str()?;

	if method != "Target.targetInfoChanged" && method != "Target.targetCreated" {
		return None;
	}

	let info = frame.get("params")?.get("targetInfo")?;

	if info.get("type")?.as_str()? != "page" {
		return None;
	}

	info.get("url")?.as_str().map(str::to_owned)
}

fn locate(candidate: &str) -> Option<PathBuf> {
	let path = Path::new(candidate);

	if path.is_absolute() {
		return path.exists().then(|| path.to_path_buf());
	}

	std::env::var_os("PATH").and_then(|paths| {
		std::env::split_paths(&paths).map(|dir| dir.join(candidate)).find(|path| path.is_file())
	})
}
