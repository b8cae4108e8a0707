#![allow( dead_code )]

mod beacon_builder;
mod emulator;

pub use beacon_builder::BeaconBuilder;
pub use emulator::{ EMULATOR_VERSION, Emulator, Fault, Received };

use std::net::{ IpAddr, Ipv4Addr, SocketAddr };
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use etherstream::{ Beacon, Config };

pub fn localhost( port: u16 ) -> SocketAddr {
  SocketAddr::new( IpAddr::V4( Ipv4Addr::LOCALHOST ), port )
}

// Returns a UDP port on localhost that was free a moment ago.
pub fn free_udp_port() -> u16 {
  let socket = std::net::UdpSocket::bind( localhost( 0 ) ).expect( "Failed to bind a UDP socket" );
  socket.local_addr().unwrap().port()
}

// Sends `bytes` to `address` every few milliseconds, the way a DAC announces
// itself, until dropped.
pub struct Broadcaster {
  handle: JoinHandle<()>
}

impl Broadcaster {
  pub fn start( bytes: Vec<u8>, address: SocketAddr ) -> Self {
    let handle = tokio::spawn( async move {
      let socket = UdpSocket::bind( localhost( 0 ) ).await.expect( "Failed to bind a UDP socket" );

      loop {
        let _ = socket.send_to( &bytes, address ).await;
        tokio::time::sleep( Duration::from_millis( 5 ) ).await;
      }
    });

    Self{ handle }
  }

  pub fn beacon( beacon: Beacon, address: SocketAddr ) -> Self {
    Self::start( beacon.to_bytes(), address )
  }
}

impl Drop for Broadcaster {
  fn drop( &mut self ) {
    self.handle.abort();
  }
}

// An emulated DAC announcing `beacon`, and an engine configuration that will
// find it.
pub async fn setup_dac( beacon: Beacon ) -> ( Emulator, Broadcaster, Config ) {
  let emulator = Emulator::start_with_capacity( beacon.buffer_capacity ).await
    .expect( "Failed to start the emulator" );

  let discovery_address = localhost( free_udp_port() );
  let broadcaster = Broadcaster::beacon( beacon, discovery_address );

  let config = Config::default()
    .discovery_address( discovery_address )
    .discovery_timeout( Some( Duration::from_secs( 2 ) ) )
    .control_port( emulator.port() )
    .io_timeout( Duration::from_millis( 500 ) );

  ( emulator, broadcaster, config )
}
