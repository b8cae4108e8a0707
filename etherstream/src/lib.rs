//! A client that discovers an Etherdream DAC on the local network and keeps
//! its playback buffer streaming, reconnecting from scratch on any failure.
pub mod command;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod record;
pub mod session;
pub mod source;

// Convenience exports
pub use command::Command;
pub use config::Config;
pub use discovery::{ Discovered, Listener as Discovery };
pub use engine::{ Engine, Phase };
pub use error::{ Error, Result };
pub use record::{ Beacon, Point, Response, Status };
pub use session::Session;
pub use source::PointSource;
