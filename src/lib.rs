//! Bindings and a command line client for the tado° home-climate API.
//!
//! ```no_run
//! use tado_control::{Config, Credentials, TadoClient};
//! use tado_control::models::tado::{Termination, ZoneId};
//!
//! let cfg = Config::from_env()?;
//! let client = TadoClient::connect(&cfg, Credentials::new("user@example.com", "secret"))?;
//! println!("{}", client.get_zones()?);
//! client.set_temperature(ZoneId(1), 21.0, Termination::Auto)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This crate is not affiliated with or supported by tado GmbH.

pub mod models {
    pub mod tado;
}

pub mod client;
pub mod config;
pub mod output;
pub mod session;
pub mod transport;
pub mod utils;

pub use client::{ApiError, ApiErrorKind, TadoClient};
pub use config::Config;
pub use session::{AuthError, AuthFlow, Credentials, Session, SessionManager};
