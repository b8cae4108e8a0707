use std::io;

use tokio::net::UdpSocket;
use tokio::time::Duration;

use etherstream::record::{ MacAddress, Status, Version };
use etherstream::{ Discovery, Error };

mod support;
use support::{ BeaconBuilder, Broadcaster, free_udp_port, localhost };

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Test Helpers

// A listener bound to a fresh localhost port, and that port's address.
fn setup_discovery() -> ( Discovery, std::net::SocketAddr ) {
  let address = localhost( free_udp_port() );
  let listener = Discovery::new().address( address ).duration( Duration::from_secs( 5 ) );
  ( listener, address )
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Unit Tests

#[tokio::test]
async fn receives_an_etherdream_broadcast() -> io::Result<()> {
  let ( listener, address ) = setup_discovery();

  let beacon = BeaconBuilder::default().to_beacon();
  let _broadcaster = Broadcaster::beacon( beacon, address );

  let discovered = listener.listen().await.expect( "no broadcast received" );

  assert_eq!( discovered.address.ip(), address.ip() );
  assert_eq!( discovered.beacon.buffer_capacity, 1799 );
  assert_eq!( discovered.beacon.mac_address, MacAddress::new([ 0, 1, 2, 3, 4, 5 ]) );
  assert_eq!( discovered.beacon.max_point_rate, 30000 );
  assert_eq!( discovered.beacon.version, Version::new( 2, 14 ) );
  assert_eq!( discovered.beacon.status, None );

  Ok(())
}

#[tokio::test]
async fn decodes_the_status_of_a_full_broadcast() -> io::Result<()> {
  let ( listener, address ) = setup_discovery();

  let status = Status{ light_engine_state: 3, playback_state: 2, point_rate: 30000, ..Status::default() };
  let beacon = BeaconBuilder::default().status( status ).to_beacon();
  let _broadcaster = Broadcaster::beacon( beacon, address );

  let discovered = listener.listen().await.expect( "no broadcast received" );
  assert_eq!( discovered.beacon, beacon );
  assert!( discovered.beacon.status.unwrap().is_estopped() );

  Ok(())
}

#[tokio::test]
async fn a_short_broadcast_is_malformed() -> io::Result<()> {
  let ( listener, address ) = setup_discovery();
  let _broadcaster = Broadcaster::start( vec![ 0u8; 10 ], address );

  match listener.listen().await {
    Err( Error::Malformed{ record: "beacon", expected: 14, actual: 10 } ) => Ok(()),
    other => panic!( "expected a malformed beacon, got {other:?}" )
  }
}

#[tokio::test]
async fn gives_up_after_its_duration() {
  let address = localhost( free_udp_port() );
  let listener = Discovery::new().address( address ).duration( Duration::from_millis( 50 ) );

  assert!( matches!( listener.listen().await, Err( Error::Discovery( _ ) ) ) );
}

#[tokio::test]
async fn reports_a_port_that_is_already_bound() -> io::Result<()> {
  let socket = UdpSocket::bind( localhost( 0 ) ).await?;
  let listener = Discovery::new().address( socket.local_addr()? );

  assert!( matches!( listener.listen().await, Err( Error::Discovery( _ ) ) ) );
  Ok(())
}

#[tokio::test]
async fn can_listen_again_after_a_failure() -> io::Result<()> {
  let ( listener, address ) = setup_discovery();
  let quick = listener.duration( Duration::from_millis( 50 ) );

  assert!( quick.listen().await.is_err() );

  let beacon = BeaconBuilder::default().mac_address([ 10; 6 ]).to_beacon();
  let _broadcaster = Broadcaster::beacon( beacon, address );

  let discovered = listener.listen().await.expect( "no broadcast received" );
  assert_eq!( discovered.beacon.mac_address, MacAddress::new([ 10; 6 ]) );

  Ok(())
}
