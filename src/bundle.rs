//! Device profiles and the device description archive rewrite.
//!
//! The vendor archive is treated as an opaque list of named entries. Every entry is
//! raw-copied (compressed bytes and header untouched, order preserved) into a new archive,
//! then `<identifier>.json` holding the pretty-printed [`DeviceProfile`] is appended.

// std
use std::io::{Cursor, Write};
// crates.io
use zip::{ZipArchive, ZipWriter, result::ZipError, write::SimpleFileOptions};
// self
use crate::{
	_prelude::*,
	appliance::{ApplianceId, ApplianceRecord, Credential},
	config::{RegionEndpoints, VendorConfig},
	error::TransportError,
	http::{Endpoint, ReqwestHttpClient},
	secret::Secret,
};

/// Device archive rewrite failures.
#[derive(Debug, ThisError)]
pub enum ArchiveError {
	/// The response body is not a readable archive.
	#[error("The device description archive is malformed.")]
	Malformed {
		/// Underlying archive failure.
		#[source]
		source: ZipError,
	},
	/// An entry of the source archive could not be read.
	#[error("Failed to read entry #{index} of the device description archive.")]
	ReadEntry {
		/// Zero-based entry position.
		index: usize,
		/// Underlying archive failure.
		#[source]
		source: ZipError,
	},
	/// An entry could not be copied into the new archive.
	#[error("Failed to copy archive entry `{name}`.")]
	CopyEntry {
		/// Entry name.
		name: String,
		/// Underlying archive failure.
		#[source]
		source: ZipError,
	},
	/// The profile could not be serialized.
	#[error("Failed to serialize the device profile.")]
	SerializeProfile {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// The profile entry could not be written.
	#[error("Failed to add `{name}` to the archive.")]
	InjectProfile {
		/// Entry name.
		name: String,
		/// Underlying archive failure.
		#[source]
		source: ZipError,
	},
	/// The new archive could not be finalized.
	#[error("Failed to seal the rewritten archive.")]
	Seal {
		/// Underlying archive failure.
		#[source]
		source: ZipError,
	},
}

/// How downstream tooling connects to an appliance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
	/// TLS-PSK.
	#[serde(rename = "TLS")]
	Tls,
	/// AES-encrypted WebSocket.
	#[serde(rename = "AES")]
	Aes,
}
impl ConnectionType {
	/// Wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			ConnectionType::Tls => "TLS",
			ConnectionType::Aes => "AES",
		}
	}
}
impl Display for ConnectionType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Profile of one credentialed appliance.
///
/// Written twice: inside the device archive and into the run manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
	/// Appliance identifier.
	pub ha_id: ApplianceId,
	/// Appliance type.
	#[serde(rename = "type")]
	pub kind: String,
	/// Serial number.
	pub serial_number: String,
	/// `<identifier>_FeatureMapping.xml`.
	pub feature_mapping_file_name: String,
	/// `<identifier>_DeviceDescription.xml`.
	pub device_description_file_name: String,
	/// Creation time of this profile.
	#[serde(with = "time::serde::rfc3339")]
	pub created: OffsetDateTime,
	/// Connection mode.
	pub connection_type: ConnectionType,
	/// TLS pre-shared key or AES key.
	pub key: Secret,
	/// AES initialization vector.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iv: Option<Secret>,
}
impl DeviceProfile {
	/// Derives the profile of `record`; `None` when the appliance has no credential.
	pub fn from_record(record: &ApplianceRecord, created: OffsetDateTime) -> Option<Self> {
		let (connection_type, key, iv) = match &record.credential {
			Credential::Tls { key } => (ConnectionType::Tls, key.clone(), None),
			Credential::Aes { key, iv } => (ConnectionType::Aes, key.clone(), Some(iv.clone())),
			Credential::None => return None,
		};
		let id = &record.identifier;

		Some(Self {
			ha_id: id.clone(),
			kind: record.kind.clone(),
			serial_number: record.serial_number.clone(),
			feature_mapping_file_name: format!("{id}_FeatureMapping.xml"),
			device_description_file_name: format!("{id}_DeviceDescription.xml"),
			created,
			connection_type,
			key,
			iv,
		})
	}

	/// Name of the entry injected into the device archive.
	pub fn archive_entry_name(&self) -> String {
		format!("{}.json", self.ha_id)
	}
}

/// Copies every entry of `source` verbatim and appends the profile entry.
pub fn inject_profile(source: &[u8], profile: &DeviceProfile) -> Result<Vec<u8>, ArchiveError> {
	let mut archive =
		ZipArchive::new(Cursor::new(source)).map_err(|source| ArchiveError::Malformed { source })?;
	let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(source.len() + 1024)));

	for index in 0..archive.len() {
		let entry = archive
			.by_index_raw(index)
			.map_err(|source| ArchiveError::ReadEntry { index, source })?;
		let name = entry.name().to_owned();

		writer.raw_copy_file(entry).map_err(|source| ArchiveError::CopyEntry { name, source })?;
	}

	let name = profile.archive_entry_name();
	let body = serde_json::to_vec_pretty(profile)
		.map_err(|source| ArchiveError::SerializeProfile { source })?;

	writer
		.start_file(name.as_str(), SimpleFileOptions::default())
		.map_err(|source| ArchiveError::InjectProfile { name: name.clone(), source })?;
	writer
		.write_all(&body)
		.map_err(|e| ArchiveError::InjectProfile { name, source: e.into() })?;

	let sealed = writer.finish().map_err(|source| ArchiveError::Seal { source })?;

	Ok(sealed.into_inner())
}

/// Fetches device description archives and rewrites them with the injected profile.
#[derive(Clone, Debug)]
pub struct DeviceBundleTransformer {
	http: ReqwestHttpClient,
	endpoints: RegionEndpoints,
}
impl DeviceBundleTransformer {
	/// Creates a transformer for the asset endpoints of `config`.
	pub fn new(config: &VendorConfig, http: ReqwestHttpClient) -> Self {
		Self { http, endpoints: config.endpoints.clone() }
	}

	/// Downloads the raw description archive of `identifier`.
	pub async fn fetch_description(
		&self,
		access_token: &Secret,
		identifier: &ApplianceId,
	) -> Result<Vec<u8>, TransportError> {
		self.http
			.get_authorized(
				Endpoint::DeviceDescription,
				self.endpoints.device_description_url(identifier),
				access_token,
			)
			.await
	}

	/// Fetches the archive of `profile`'s appliance and returns the rewritten archive bytes.
	pub async fn transform(
		&self,
		access_token: &Secret,
		profile: &DeviceProfile,
	) -> Result<Vec<u8>> {
		let source = self.fetch_description(access_token, &profile.ha_id).await?;
		let rewritten = inject_profile(&source, profile)?;

		tracing::debug!(
			source_bytes = source.len(),
			rewritten_bytes = rewritten.len(),
			"Rewrote the device description archive."
		);

		Ok(rewritten)
	}
}
