use std::io;

use thiserror::Error;

use crate::record::{ NakReason, Response };

pub type Result<T> = std::result::Result<T,Error>;

/// Every failure the protocol engine can observe. All of them are recovered
/// the same way: the session is dropped and the engine returns to discovery.
#[derive( Debug, Error )]
pub enum Error {
  #[error( "discovery failed: {0}" )]
  Discovery( #[source] io::Error ),

  #[error( "failed to connect to the DAC: {0}" )]
  Connect( #[source] io::Error ),

  #[error( "malformed {record}: expected {expected} bytes, got {actual}" )]
  Malformed { record: &'static str, expected: usize, actual: usize },

  #[error( "the DAC refused command {command:#04x}: {reason:?}" )]
  Nak { reason: NakReason, command: u8 },

  #[error( "expected a response to command {expected:#04x}, got {actual:#04x}" )]
  UnexpectedCommand { expected: u8, actual: u8 },

  #[error( "the DAC reported an emergency stop" )]
  EmergencyStop( Response ),

  #[error( "I/O error: {0}" )]
  Io( #[from] io::Error ),

  #[error( "timed out waiting on the DAC" )]
  Timeout,

  #[error( "a frame of {0} points does not fit in a single data command" )]
  FrameTooLarge( usize ),

  #[error( "the version command replies with text and must be sent with `Session::version`" )]
  TextReply,

  #[error( "the session is closed" )]
  Closed
}

impl From<tokio::time::error::Elapsed> for Error {
  fn from( _: tokio::time::error::Elapsed ) -> Error {
    Error::Timeout
  }
}
