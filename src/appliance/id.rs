//! Appliance identifiers as issued by the vendor.
//!
//! Identifiers end up in request paths and output file names, so they are validated when
//! decoded instead of being trusted as-is.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Appliance identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace or control characters.
	#[error("Appliance identifier contains whitespace or control characters.")]
	ContainsWhitespace,
	/// The identifier could escape the output directory.
	#[error("Appliance identifier contains a path separator or a relative path component.")]
	PathLike,
	/// The identifier exceeded the allowed character count.
	#[error("Appliance identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Vendor identifier of one enrolled appliance (`haId`), e.g. `BOSCH-WAT28400-68A40E000001`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplianceId(String);
impl ApplianceId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for ApplianceId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ApplianceId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<ApplianceId> for String {
	fn from(value: ApplianceId) -> Self {
		value.0
	}
}
impl TryFrom<String> for ApplianceId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for ApplianceId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for ApplianceId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ApplianceId({})", self.0)
	}
}
impl Display for ApplianceId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for ApplianceId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(|c| c.is_whitespace() || c.is_control()) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.contains(['/', '\\', ':']) || view == "." || view == ".." {
		return Err(IdentifierError::PathLike);
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_validate() {
		let id = ApplianceId::new("SIEMENS-HB678GBS6-68A40E000001")
			.expect("Vendor identifier should be valid.");

		assert_eq!(id.as_str(), "SIEMENS-HB678GBS6-68A40E000001");
		assert_eq!(ApplianceId::new(""), Err(IdentifierError::Empty));
		assert_eq!(ApplianceId::new("with space"), Err(IdentifierError::ContainsWhitespace));
		assert_eq!(ApplianceId::new("../etc"), Err(IdentifierError::PathLike));
		assert_eq!(ApplianceId::new(".."), Err(IdentifierError::PathLike));
		assert_eq!(ApplianceId::new("C:evil"), Err(IdentifierError::PathLike));
		assert!(matches!(
			ApplianceId::new("x".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { .. })
		));
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let id: ApplianceId = serde_json::from_str("\"BOSCH-SMV68TX06E-68A40E000002\"")
			.expect("Identifier should deserialize.");

		assert_eq!(
			serde_json::to_string(&id).expect("Identifier should serialize."),
			"\"BOSCH-SMV68TX06E-68A40E000002\""
		);
		assert!(serde_json::from_str::<ApplianceId>("\"a/b\"").is_err());
	}
}
