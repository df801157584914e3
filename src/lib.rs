//! Interactive OAuth 2.0 + PKCE extraction of appliance connection credentials and device
//! description bundles, ready for local-network integration tooling.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod appliance;
pub mod auth;
pub mod browser;
pub mod bundle;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod obs;
pub mod registry;
pub mod secret;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
// Binary-only dependencies.
use {clap as _, color_eyre as _, tracing_subscriber as _};
#[cfg(test)] use {httpmock as _, tempfile as _};
