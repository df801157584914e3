mod common;

// crates.io
use httpmock::prelude::*;
use time::macros::datetime;
// self
use hc_extract::{
	appliance::ApplianceDirectory,
	bundle::{DeviceBundleTransformer, DeviceProfile},
	error::{Error, TransportError},
	http::ReqwestHttpClient,
	secret::Secret,
};

fn profile(directory: &str) -> DeviceProfile {
	let directory: ApplianceDirectory =
		serde_json::from_str(directory).expect("Directory fixture should decode.");

	DeviceProfile::from_record(&directory.appliances()[0], datetime!(2024-05-06 07:08:09 UTC))
		.expect("Fixture appliance should have a credential.")
}

fn transformer(server: &MockServer) -> DeviceBundleTransformer {
	let http = ReqwestHttpClient::new().expect("HTTP client should build.");

	DeviceBundleTransformer::new(&common::mock_config(server), http)
}

#[tokio::test]
async fn transform_downloads_and_injects_the_profile() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/iddf/v1/iddf/BOSCH-1")
				.header("authorization", "Bearer tok-1");
			then.status(200)
				.header("content-type", "application/zip")
				.body(common::device_archive("BOSCH-1"));
		})
		.await;
	let profile = profile(
		r#"{"data":{"homeAppliances":[
			{"identifier":"BOSCH-1","type":"Oven","serialnumber":"S1","aes":{"key":"K","iv":"I"}}
		]}}"#,
	);
	let archive = transformer(&server)
		.transform(&Secret::new("tok-1"), &profile)
		.await
		.expect("Archive should be rewritten.");

	mock.assert_async().await;

	let entries = common::archive_entries(&archive);
	let names: Vec<_> = entries.iter().map(|(name, _)| name.as_str()).collect();

	assert_eq!(
		names,
		["BOSCH-1_FeatureMapping.xml", "BOSCH-1_DeviceDescription.xml", "BOSCH-1.json"]
	);
	assert_eq!(entries[0].1, b"<featureMapping/>");
	assert_eq!(entries[1].1, b"<device/>");

	let injected: serde_json::Value =
		serde_json::from_slice(&entries[2].1).expect("Injected profile should be JSON.");

	assert_eq!(injected["haId"], "BOSCH-1");
	assert_eq!(injected["connectionType"], "AES");
	assert_eq!(injected["key"], "K");
	assert_eq!(injected["iv"], "I");
}

#[tokio::test]
async fn missing_archives_fail_with_the_status() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/iddf/v1/iddf/BOSCH-1");
			then.status(404);
		})
		.await;
	let profile = profile(
		r#"{"data":{"homeAppliances":[{"identifier":"BOSCH-1","tls":{"key":"ABCD"}}]}}"#,
	);
	let err = transformer(&server)
		.transform(&Secret::new("tok-1"), &profile)
		.await
		.expect_err("Missing archive must fail.");

	assert!(
		matches!(
			err,
			Error::Transport(TransportError::Status { endpoint: "device description", status: 404 })
		),
		"Got {err:?}."
	);
}

#[tokio::test]
async fn non_zip_payloads_are_archive_failures() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/iddf/v1/iddf/BOSCH-1");
			then.status(200).body("<html>maintenance</html>");
		})
		.await;
	let profile = profile(
		r#"{"data":{"homeAppliances":[{"identifier":"BOSCH-1","tls":{"key":"ABCD"}}]}}"#,
	);
	let err = transformer(&server)
		.transform(&Secret::new("tok-1"), &profile)
		.await
		.expect_err("Non-zip payload must fail.");

	assert!(matches!(err, Error::Archive(_)), "Got {err:?}.");
}
