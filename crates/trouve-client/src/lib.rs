//! # trouve-client
//!
//! Aggregate chat client for the Trouvé lost-and-found platform: owns the
//! session, the REST and push transports, the in-memory stores and every
//! timer, and exposes snapshots plus an event stream to the UI layer. The UI
//! is a read-only subscriber; all mutation goes through [`ChatClient`]
//! methods, and [`ChatClient::shutdown`] releases everything the client
//! owns.

pub mod client;
pub mod config;
pub mod error;
pub mod events;

use tracing_subscriber::{fmt, EnvFilter};

pub use client::ChatClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::ClientEvent;
pub use trouve_shared::types::Session;

/// Install the process-wide tracing subscriber, filterable via `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("trouve_client=debug,trouve_net=debug,trouve_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
