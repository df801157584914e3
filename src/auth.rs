//! Interactive authorization: PKCE material, the login URL, redirect interception, the
//! browser-driven session, and the code-for-token exchange.

pub mod authorize;
pub mod pkce;
pub mod redirect;
pub mod session;
pub mod token;

pub use authorize::*;
pub use pkce::*;
pub use redirect::*;
pub use session::*;
pub use token::*;
