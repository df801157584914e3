//! Prints the login URL and PKCE material a session would open, without launching a browser.

// crates.io
use color_eyre::Result;
// self
use hc_extract::{
	auth::InteractiveSession,
	config::{Region, VendorConfig},
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let region = std::env::args().nth(1).map(|value| value.parse::<Region>()).transpose()?;
	let config = VendorConfig::for_region(region.unwrap_or(Region::Eu))?;
	let session = InteractiveSession::new(&config)?;

	println!("Log in at {}.", session.authorize_url());
	println!("PKCE challenge (S256): {}.", session.pkce().challenge());
	println!("Waiting for a redirect to {}.", config.redirect_uri);

	Ok(())
}
