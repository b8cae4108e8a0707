use std::io;
use std::net::{ IpAddr, Ipv4Addr, SocketAddr };

use tokio::net::UdpSocket;
use tokio::time::{ self, Duration };
use tracing::{ debug, info };

use crate::constants::*;
use crate::error::{ Error, Result };
use crate::record::Beacon;

// Large enough for any broadcast a DAC sends, including the status block.
const RECEIVE_BUFFER_BYTES: usize = 512;

/// A DAC that announced itself, and the address it announced itself from.
#[derive( Clone, Copy, Debug, PartialEq )]
pub struct Discovered {
  pub address: SocketAddr,
  pub beacon: Beacon
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Discovery Listener

/// Receives a single DAC broadcast. Each call to `listen` binds a fresh socket
/// and keeps nothing afterwards, so it may be called again after any failure.
#[derive( Clone, Copy, Debug )]
pub struct Listener {
  /// The local address that the listener binds. Defaults to `0.0.0.0:7654`.
  address: SocketAddr,

  /// The optional length of time a single `listen` waits for a broadcast.
  duration: Option<Duration>
}

impl Default for Listener {
  fn default() -> Self {
    Self::new()
  }
}

impl Listener {
  pub fn new() -> Self {
    Self{
      address: SocketAddr::new( IpAddr::V4( Ipv4Addr::UNSPECIFIED ), ETHERDREAM_BROADCAST_PORT ),
      duration: None
    }
  }

  /// Overrides the default address that the listener binds.
  pub fn address( mut self, address: SocketAddr ) -> Self {
    self.address = address;
    self
  }

  /// Limits the time that a single `listen` waits for a broadcast.
  pub fn duration( mut self, duration: Duration ) -> Self {
    self.duration = Some( duration );
    self
  }

  /// Blocks until one broadcast arrives and decodes it.
  pub async fn listen( &self ) -> Result<Discovered> {
    let socket = UdpSocket::bind( self.address ).await.map_err( Error::Discovery )?;
    debug!( address = %socket.local_addr().map_err( Error::Discovery )?, "listening for DAC broadcasts" );

    let mut buffer = [0u8; RECEIVE_BUFFER_BYTES];

    let ( length, address ) =
      match self.duration {
        Some( duration ) =>
          time::timeout( duration, socket.recv_from( &mut buffer ) ).await
            .map_err(|_|{ Error::Discovery( io::Error::new( io::ErrorKind::TimedOut, "no DAC broadcast received" ) ) })?,
        None =>
          socket.recv_from( &mut buffer ).await
      }.map_err( Error::Discovery )?;

    let beacon = Beacon::from_bytes( &buffer[..length] )?;
    info!( %address, %beacon, "discovered a DAC" );

    Ok( Discovered{ address, beacon } )
  }
}
