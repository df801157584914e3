//! Rewrites a device description archive on disk the way a run does.
//!
//! Usage: `inject_profile <archive.zip> <identifier> <tls-key>`.

// std
use std::{env, fs};
// crates.io
use color_eyre::{Result, eyre::eyre};
use time::OffsetDateTime;
// self
use hc_extract::{
	appliance::{ApplianceId, ApplianceRecord, Credential},
	bundle::{DeviceProfile, inject_profile},
	registry::{OutputDirectory, ProfileRegistry},
	secret::Secret,
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let mut args = env::args().skip(1);
	let (Some(archive), Some(identifier), Some(key)) = (args.next(), args.next(), args.next())
	else {
		return Err(eyre!("Usage: inject_profile <archive.zip> <identifier> <tls-key>."));
	};
	let record = ApplianceRecord {
		identifier: ApplianceId::new(identifier)?,
		kind: "Unknown".into(),
		serial_number: String::new(),
		brand: None,
		name: None,
		enumber: None,
		vib: None,
		mac: None,
		credential: Credential::Tls { key: Secret::new(key) },
	};
	let profile = DeviceProfile::from_record(&record, OffsetDateTime::now_utc())
		.ok_or_else(|| eyre!("The record carries no credential."))?;
	let rewritten = inject_profile(&fs::read(&archive)?, &profile)?;
	let output = OutputDirectory::create("output")?;
	let path = output.write_archive(&profile, &rewritten)?;
	let mut registry = ProfileRegistry::default();

	registry.push(profile);

	let manifest = output.write_manifest(&registry)?;

	println!("Wrote {} and {}.", path.display(), manifest.display());

	Ok(())
}
