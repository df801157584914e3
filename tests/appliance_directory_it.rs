mod common;

// crates.io
use httpmock::prelude::*;
// self
use hc_extract::{
	appliance::{ApplianceDirectoryClient, Credential},
	error::{DecodeError, Error, TransportError},
	http::ReqwestHttpClient,
	secret::Secret,
};

const DETAILS_PATH: &str = "/account/details";

fn directory_client(server: &MockServer) -> ApplianceDirectoryClient {
	let http = ReqwestHttpClient::new().expect("HTTP client should build.");

	ApplianceDirectoryClient::new(&common::mock_config(server), http)
}

#[tokio::test]
async fn fetch_sends_the_bearer_token_and_decodes_the_directory() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(DETAILS_PATH).header("authorization", "Bearer tok-1");
			then.status(200).header("content-type", "application/json").body(
				r#"{
					"data": {
						"homeAppliances": [
							{ "identifier": "BOSCH-1", "type": "Dishwasher", "serialnumber": "S1", "tls": { "key": "ABCD" } },
							{ "identifier": "BOSCH-2", "type": "Oven", "serialnumber": "S2" }
						]
					}
				}"#,
			);
		})
		.await;
	let directory = directory_client(&server)
		.fetch(&Secret::new("tok-1"))
		.await
		.expect("Directory should be fetched.");

	mock.assert_async().await;

	let appliances = directory.appliances();

	assert_eq!(appliances.len(), 2);
	assert_eq!(appliances[0].identifier.as_str(), "BOSCH-1");
	assert_eq!(appliances[0].credential, Credential::Tls { key: Secret::new("ABCD") });
	assert!(appliances[1].credential.is_none());
}

#[tokio::test]
async fn rejected_tokens_surface_the_status() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path(DETAILS_PATH);
			then.status(401);
		})
		.await;
	let err = directory_client(&server)
		.fetch(&Secret::new("expired"))
		.await
		.expect_err("Unauthorized fetch must fail.");

	assert!(
		matches!(
			err,
			Error::Transport(TransportError::Status { endpoint: "account details", status: 401 })
		),
		"Got {err:?}."
	);
}

#[tokio::test]
async fn malformed_appliance_lists_are_decode_failures() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path(DETAILS_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"data":{"homeAppliances":{"identifier":"BOSCH-1"}}}"#);
		})
		.await;
	let err = directory_client(&server)
		.fetch(&Secret::new("tok-1"))
		.await
		.expect_err("A non-list appliance field must fail.");

	assert!(
		matches!(err, Error::Decode(DecodeError::Json { endpoint: "account details", .. })),
		"Got {err:?}."
	);
}
