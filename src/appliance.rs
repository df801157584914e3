//! Appliance directory: enrolled devices and their connection credentials.

pub mod id;

pub use id::*;

// self
use crate::{
	_prelude::*,
	config::{RegionEndpoints, VendorConfig},
	error::DecodeError,
	http::{Endpoint, ReqwestHttpClient},
	secret::Secret,
};

/// Account details document returned by the directory endpoint.
///
/// Nested user and smart device data is ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct ApplianceDirectory {
	/// Account identifier.
	#[serde(rename = "hcId", default)]
	pub hc_id: Option<String>,
	/// Directory payload.
	#[serde(default)]
	pub data: DirectoryData,
}
impl ApplianceDirectory {
	/// Enrolled appliances, in the order the endpoint listed them.
	pub fn appliances(&self) -> &[ApplianceRecord] {
		&self.data.home_appliances
	}
}

/// `data` member of the account details document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryData {
	/// Enrolled appliances.
	#[serde(default)]
	pub home_appliances: Vec<ApplianceRecord>,
	/// Login type of the account (e.g. `SingleKeyID`).
	#[serde(default)]
	pub login_type: Option<String>,
}

/// Connection credential material of one appliance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
	/// TLS-PSK connection.
	Tls {
		/// Pre-shared key.
		key: Secret,
	},
	/// AES-encrypted WebSocket connection.
	Aes {
		/// Symmetric key.
		key: Secret,
		/// Initialization vector.
		iv: Secret,
	},
	/// No usable credential; the appliance is skipped.
	None,
}
impl Credential {
	/// Whether this is [`Credential::None`].
	pub fn is_none(&self) -> bool {
		matches!(self, Credential::None)
	}
}

/// One enrolled appliance.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "WireAppliance")]
pub struct ApplianceRecord {
	/// Vendor identifier.
	pub identifier: ApplianceId,
	/// Appliance type, e.g. `Dishwasher`.
	pub kind: String,
	/// Serial number.
	pub serial_number: String,
	/// Brand name.
	pub brand: Option<String>,
	/// User-facing name.
	pub name: Option<String>,
	/// E-number (model number).
	pub enumber: Option<String>,
	/// VIB (model family).
	pub vib: Option<String>,
	/// MAC address.
	pub mac: Option<String>,
	/// Credential material; TLS wins when both are present.
	pub credential: Credential,
}

#[derive(Deserialize)]
struct WireAppliance {
	identifier: ApplianceId,
	#[serde(rename = "type", default, deserialize_with = "null_as_empty")]
	kind: String,
	#[serde(rename = "serialnumber", default, deserialize_with = "null_as_empty")]
	serial_number: String,
	#[serde(default)]
	brand: Option<String>,
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	enumber: Option<String>,
	#[serde(default)]
	vib: Option<String>,
	#[serde(default)]
	mac: Option<String>,
	#[serde(default)]
	tls: Option<WireTls>,
	#[serde(default)]
	aes: Option<WireAes>,
}

#[derive(Deserialize)]
struct WireTls {
	#[serde(default, deserialize_with = "null_as_empty")]
	key: String,
}

#[derive(Deserialize)]
struct WireAes {
	#[serde(default, deserialize_with = "null_as_empty")]
	key: String,
	#[serde(default, deserialize_with = "null_as_empty")]
	iv: String,
}

impl From<WireAppliance> for ApplianceRecord {
	fn from(wire: WireAppliance) -> Self {
		let credential = match (wire.tls, wire.aes) {
			(Some(tls), _) => Credential::Tls { key: Secret::new(tls.key) },
			(None, Some(aes)) => Credential::Aes { key: Secret::new(aes.key), iv: Secret::new(aes.iv) },
			(None, None) => Credential::None,
		};

		Self {
			identifier: wire.identifier,
			kind: wire.kind,
			serial_number: wire.serial_number,
			brand: wire.brand,
			name: wire.name,
			enumber: wire.enumber,
			vib: wire.vib,
			mac: wire.mac,
			credential,
		}
	}
}

// Missing and `null` strings read as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fetches the appliance directory with a bearer token.
#[derive(Clone, Debug)]
pub struct ApplianceDirectoryClient {
	http: ReqwestHttpClient,
	endpoints: RegionEndpoints,
}
impl ApplianceDirectoryClient {
	/// Creates a client for the asset endpoints of `config`.
	pub fn new(config: &VendorConfig, http: ReqwestHttpClient) -> Self {
		Self { http, endpoints: config.endpoints.clone() }
	}

	/// One authenticated GET against the account details endpoint.
	pub async fn fetch(&self, access_token: &Secret) -> Result<ApplianceDirectory> {
		let endpoint = Endpoint::AccountDetails;
		let body = self
			.http
			.get_authorized(endpoint, self.endpoints.account_details_url(), access_token)
			.await?;
		let directory: ApplianceDirectory = DecodeError::decode_json(endpoint.as_str(), &body)?;

		tracing::info!(
			appliances = directory.appliances().len(),
			login_type = directory.data.login_type.as_deref().unwrap_or("unknown"),
			"Fetched the appliance directory."
		);

		Ok(directory)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const DIRECTORY: &str = r#"{
		"hcId": "account-1",
		"data": {
			"loginType": "SingleKeyID",
			"user": { "email": "someone@example.com" },
			"smartDevices": [{ "identifier": "phone" }],
			"homeAppliances": [
				{ "identifier": "BOSCH-1", "type": "Washer", "serialnumber": "S1", "tls": { "key": "ABCD" } },
				{ "identifier": "BOSCH-2", "type": "Oven", "serialnumber": "S2", "aes": { "key": "K", "iv": "I" }, "pairingTime": 1 },
				{ "identifier": "BOSCH-3", "type": "Hood", "serialnumber": "S3", "tls": { "key": "T" }, "aes": { "key": "K", "iv": "I" } },
				{ "identifier": "BOSCH-4", "type": "Fridge", "serialnumber": "S4", "tls": null }
			]
		}
	}"#;

	#[test]
	fn directory_decodes_credentials_in_order() {
		let directory: ApplianceDirectory =
			DecodeError::decode_json("account details", DIRECTORY.as_bytes())
				.expect("Directory fixture should decode.");
		let appliances = directory.appliances();

		assert_eq!(directory.hc_id.as_deref(), Some("account-1"));
		assert_eq!(directory.data.login_type.as_deref(), Some("SingleKeyID"));
		assert_eq!(
			appliances.iter().map(|record| record.identifier.as_str()).collect::<Vec<_>>(),
			["BOSCH-1", "BOSCH-2", "BOSCH-3", "BOSCH-4"]
		);
		assert_eq!(appliances[0].credential, Credential::Tls { key: Secret::new("ABCD") });
		assert_eq!(
			appliances[1].credential,
			Credential::Aes { key: Secret::new("K"), iv: Secret::new("I") }
		);
		assert_eq!(appliances[2].credential, Credential::Tls { key: Secret::new("T") });
		assert!(appliances[3].credential.is_none());
		assert_eq!(appliances[1].kind, "Oven");
		assert_eq!(appliances[1].serial_number, "S2");
	}

	#[test]
	fn sparse_records_decode_like_empty_fields() {
		let directory: ApplianceDirectory = DecodeError::decode_json(
			"account details",
			br#"{"data":{"homeAppliances":[
				{ "identifier": "BOSCH-1", "type": null, "serialnumber": null, "tls": {} },
				{ "identifier": "BOSCH-2", "aes": { "key": "K", "iv": null } },
				{ "identifier": "BOSCH-3", "tls": { "key": null } }
			]}}"#,
		)
		.expect("Sparse records should decode.");
		let appliances = directory.appliances();

		assert_eq!(appliances[0].kind, "");
		assert_eq!(appliances[0].serial_number, "");
		assert_eq!(appliances[0].credential, Credential::Tls { key: Secret::new("") });
		assert_eq!(
			appliances[1].credential,
			Credential::Aes { key: Secret::new("K"), iv: Secret::new("") }
		);
		assert_eq!(appliances[2].credential, Credential::Tls { key: Secret::new("") });
	}

	#[test]
	fn documents_without_data_list_no_appliances() {
		let directory: ApplianceDirectory =
			DecodeError::decode_json("account details", br#"{"hcId":"account-1"}"#)
				.expect("A document without data should decode.");

		assert!(directory.appliances().is_empty());
		assert!(directory.data.login_type.is_none());
	}

	#[test]
	fn unsafe_identifiers_fail_to_decode() {
		let err = DecodeError::decode_json::<ApplianceDirectory>(
			"account details",
			br#"{"data":{"homeAppliances":[{"identifier":"../../x"}]}}"#,
		)
		.expect_err("Path-like identifier must be rejected.");

		assert!(err.to_string().contains("homeAppliances[0]"), "Unexpected message: {err}.");
	}
}
