#![allow(dead_code)]

// std
use std::{
	io::{Cursor, Read, Write},
	net::TcpListener,
};
// crates.io
use httpmock::MockServer;
use tokio::sync::mpsc::{self, UnboundedSender};
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};
// self
use hc_extract::{
	browser::{BrowserContext, BrowserError, BrowserFuture, BrowserLauncher, NavigationEvents},
	config::{RegionEndpoints, VendorConfig},
	url::Url,
};

pub const REDIRECT_URI: &str = "https://app.home-connect.com/auth/prod";

/// Config whose authorization and asset endpoints point at `server`.
pub fn mock_config(server: &MockServer) -> VendorConfig {
	let endpoints = RegionEndpoints::parse(&server.url("/security/oauth/"), &server.url(""))
		.expect("Mock endpoints should validate.");

	VendorConfig::builder()
		.endpoints(endpoints)
		.build()
		.expect("Mock config should build.")
}

/// Config whose endpoints point at a loopback port nothing listens on.
pub fn unreachable_config() -> VendorConfig {
	let port = TcpListener::bind("127.0.0.1:0")
		.and_then(|listener| listener.local_addr())
		.expect("A loopback port should be free.")
		.port();
	let base = format!("http://127.0.0.1:{port}");
	let endpoints = RegionEndpoints::parse(&format!("{base}/security/oauth/"), &base)
		.expect("Loopback endpoints should validate.");

	VendorConfig::builder()
		.endpoints(endpoints)
		.build()
		.expect("Loopback config should build.")
}

/// Browser that immediately redirects back with `auth-code` and the session state.
pub struct RedirectingBrowser;
impl BrowserLauncher for RedirectingBrowser {
	fn launch(&self) -> BrowserFuture<'_, Box<dyn BrowserContext>> {
		let context = RedirectingContext { sink: None };

		Box::pin(async move { Ok(Box::new(context) as Box<dyn BrowserContext>) })
	}
}

struct RedirectingContext {
	sink: Option<UnboundedSender<String>>,
}
impl BrowserContext for RedirectingContext {
	fn observe(&mut self) -> BrowserFuture<'_, NavigationEvents> {
		let (tx, rx) = mpsc::unbounded_channel();

		self.sink = Some(tx);

		Box::pin(async move { Ok(rx) })
	}

	fn navigate<'a>(&'a mut self, url: &'a Url) -> BrowserFuture<'a, ()> {
		Box::pin(async move {
			let sink = self.sink.as_ref().ok_or(BrowserError::Disconnected)?;
			let redirect =
				format!("{REDIRECT_URI}?code=auth-code&state={}", query_value(url, "state"));

			let _ = sink.send(redirect);

			Ok(())
		})
	}

	fn close(self: Box<Self>) -> BrowserFuture<'static, ()> {
		Box::pin(async { Ok(()) })
	}
}

pub fn query_value(url: &Url, key: &str) -> String {
	url.query_pairs()
		.find(|(name, _)| name == key)
		.map(|(_, value)| value.into_owned())
		.unwrap_or_default()
}

/// Builds a vendor-style device description archive.
pub fn device_archive(id: &str) -> Vec<u8> {
	let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

	for (name, body, method) in [
		(format!("{id}_FeatureMapping.xml"), "<featureMapping/>", CompressionMethod::Deflated),
		(format!("{id}_DeviceDescription.xml"), "<device/>", CompressionMethod::Stored),
	] {
		writer
			.start_file(name, SimpleFileOptions::default().compression_method(method))
			.expect("Fixture entry should start.");
		writer.write_all(body.as_bytes()).expect("Fixture entry should write.");
	}

	writer.finish().expect("Fixture archive should seal.").into_inner()
}

/// Every entry of `bytes` as `(name, contents)`, in archive order.
pub fn archive_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
	let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Archive should open.");

	(0..archive.len())
		.map(|index| {
			let mut entry = archive.by_index(index).expect("Entry should open.");
			let mut contents = Vec::new();

			entry.read_to_end(&mut contents).expect("Entry should read.");

			(entry.name().to_owned(), contents)
		})
		.collect()
}
