//! Macaroons: bearer credentials with contextual caveats.
//!
//! A macaroon is minted from a secret root key, an identifier and a
//! location hint. Caveats can then be added by anyone holding it, each one
//! narrowing what it authorizes and folding into its HMAC-SHA256 signature.
//!
//! - First-party caveats are opaque conditions checked by the verifier.
//! - Third-party caveats must be discharged by a separate macaroon, minted
//!   by a third party and bound to the primary macaroon before both are
//!   sent together.
//!
//! ```
//! use macaroons::Macaroon;
//!
//! let mut m = Macaroon::new(b"root key", b"id", b"https://example.com").unwrap();
//! m.add_first_party_caveat(b"account = 3735928559").unwrap();
//!
//! let wire = m.to_base64().unwrap();
//! let m = Macaroon::from_base64(&wire).unwrap();
//!
//! m.verify(b"root key", |caveat: &[u8]| {
//!     if caveat == b"account = 3735928559" { Ok(()) } else { Err("unknown caveat") }
//! }, &[]).unwrap();
//! ```
//!
//! The binary and JSON encodings are compatible with the other macaroon
//! implementations using the same (version 1) format.

extern crate crypto;
#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;
extern crate rand_core;
extern crate rustc_serialize;
extern crate zeroize;

mod error;
mod macaroon;
pub mod packet;
mod primitives;
mod serialize;
mod verifier;

pub use error::{MacaroonError, Result};
pub use macaroon::{CaveatInfo, Macaroon};
pub use serialize::Slice;
pub use verifier::Verifier;
