//! Output directory and the `profiles.json` manifest.
//!
//! Everything written here contains key material, so files are created with mode `0600` on
//! Unix and land atomically (temporary file, sync, rename).

// std
use std::{
	fs::{self, File, OpenOptions},
	io::Write,
};
// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, bundle::DeviceProfile};

/// File name of the run manifest.
pub const MANIFEST_FILE_NAME: &str = "profiles.json";

/// Output persistence failures.
#[derive(Debug, ThisError)]
pub enum OutputError {
	/// The output directory could not be created.
	#[error("Failed to create the output directory {}.", .path.display())]
	CreateDir {
		/// Directory path.
		path: PathBuf,
		/// Underlying failure.
		#[source]
		source: std::io::Error,
	},
	/// A file could not be written.
	#[error("Failed to write {}.", .path.display())]
	Write {
		/// Destination path.
		path: PathBuf,
		/// Underlying failure.
		#[source]
		source: std::io::Error,
	},
	/// The manifest could not be serialized.
	#[error("Failed to serialize the profile manifest.")]
	Serialize {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// A profile timestamp cannot be rendered as RFC 3339.
	#[error("Failed to format the profile timestamp.")]
	Timestamp {
		/// Underlying formatting failure.
		#[source]
		source: time::error::Format,
	},
}

/// Single destination directory for archives and the manifest. Writes are sequential.
#[derive(Clone, Debug)]
pub struct OutputDirectory {
	root: PathBuf,
}
impl OutputDirectory {
	/// Opens `root`, creating it (and its parents) when missing.
	pub fn create(root: impl Into<PathBuf>) -> Result<Self, OutputError> {
		let root = root.into();

		fs::create_dir_all(&root)
			.map_err(|source| OutputError::CreateDir { path: root.clone(), source })?;

		Ok(Self { root })
	}

	/// Directory path.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Path of the manifest inside this directory.
	pub fn manifest_path(&self) -> PathBuf {
		self.root.join(MANIFEST_FILE_NAME)
	}

	/// Writes the rewritten archive of `profile` and returns its path.
	pub fn write_archive(
		&self,
		profile: &DeviceProfile,
		archive: &[u8],
	) -> Result<PathBuf, OutputError> {
		let path = self.root.join(archive_file_name(profile)?);

		write_atomic(&path, archive)?;

		tracing::info!(path = %path.display(), bytes = archive.len(), "Saved device archive.");

		Ok(path)
	}

	/// Writes the manifest and returns its path.
	pub fn write_manifest(&self, registry: &ProfileRegistry) -> Result<PathBuf, OutputError> {
		let path = self.manifest_path();

		write_atomic(&path, &registry.to_json()?)?;

		tracing::info!(path = %path.display(), profiles = registry.len(), "Saved profile manifest.");

		Ok(path)
	}
}

/// `<identifier>_<RFC 3339 creation time>.zip`.
///
/// `:` is not allowed in Windows file names, so it is replaced by `-` there.
pub fn archive_file_name(profile: &DeviceProfile) -> Result<String, OutputError> {
	let created =
		profile.created.format(&Rfc3339).map_err(|source| OutputError::Timestamp { source })?;
	let created = if cfg!(windows) { created.replace(':', "-") } else { created };

	Ok(format!("{}_{created}.zip", profile.ha_id))
}

/// Ordered collection of the profiles produced by one run.
#[derive(Clone, Debug, Default)]
pub struct ProfileRegistry {
	profiles: Vec<DeviceProfile>,
}
impl ProfileRegistry {
	/// Appends a profile; insertion order is manifest order.
	pub fn push(&mut self, profile: DeviceProfile) {
		self.profiles.push(profile);
	}

	/// Collected profiles.
	pub fn profiles(&self) -> &[DeviceProfile] {
		&self.profiles
	}

	/// Number of collected profiles.
	pub fn len(&self) -> usize {
		self.profiles.len()
	}

	/// Whether no profile was collected.
	pub fn is_empty(&self) -> bool {
		self.profiles.is_empty()
	}

	/// Pretty-printed JSON list of every profile.
	pub fn to_json(&self) -> Result<Vec<u8>, OutputError> {
		serde_json::to_vec_pretty(&self.profiles).map_err(|source| OutputError::Serialize { source })
	}
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
	let mut tmp_path = path.as_os_str().to_owned();

	tmp_path.push(".tmp");

	let tmp_path = PathBuf::from(tmp_path);
	let written = open_private(&tmp_path)
		.and_then(|mut file| {
			file.write_all(bytes)?;
			file.sync_all()
		})
		.and_then(|()| fs::rename(&tmp_path, path));

	written.map_err(|source| {
		let _ = fs::remove_file(&tmp_path);

		OutputError::Write { path: path.to_path_buf(), source }
	})
}

fn open_private(path: &Path) -> std::io::Result<File> {
	let mut options = OpenOptions::new();

	options.write(true).create(true).truncate(true);

	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;

		options.mode(0o600);
	}

	options.open(path)
}
