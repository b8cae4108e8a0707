//! Fixed-layout records exchanged with an Etherdream DAC: the UDP beacon, the
//! TCP response and the point sample. Every multi-byte field is little-endian
//! on the wire regardless of the host.
use std::fmt;

use zerocopy::{ FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned };
use zerocopy::byteorder::little_endian::{ I16, U16, U32 };

use crate::constants::*;
use crate::error::{ Error, Result };

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -  Enums

#[repr( u8 )]
#[derive( Clone, Copy, Debug, PartialEq, Eq )]
pub enum LightEngineState {
  Ready = 0,
  WarmUp = 1,
  CoolDown = 2,
  Estop = 3,
  Unknown = u8::MAX
}

#[repr( u8 )]
#[derive( Clone, Copy, Debug, PartialEq, Eq )]
pub enum PlaybackState {
  Idle = 0,
  Prepared = 1,
  Playing = 2,
  Unknown = u8::MAX
}

#[repr( u8 )]
#[derive( Clone, Copy, Debug, PartialEq, Eq )]
pub enum Source {
  Network = 0,
  Ilda = 1,
  Internal = 2,
  Unknown = u8::MAX
}

#[derive( Clone, Copy, Debug, PartialEq, Eq )]
pub enum ControlSignal {
  Ack,
  Nak( NakReason )
}

#[derive( Clone, Copy, Debug, PartialEq, Eq )]
pub enum NakReason {
  /// The DAC command was refused as the DAC is in an E-stop.
  Estop,
  /// The DAC point data command was ignored because the point buffer is full.
  Full,
  /// The DAC command was malformed.
  Invalid,
  /// A response code outside of the protocol.
  Unknown( u8 )
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Wire Layouts

#[repr( C )]
#[derive( FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned )]
struct WireBeacon {
  mac_address: [u8;6],
  hardware_revision: U16,
  software_revision: U16,
  buffer_capacity: U16,
  max_point_rate: U16
}

#[repr( C )]
#[derive( FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned )]
struct WireStatus {
  protocol: u8,
  light_engine_state: u8,
  playback_state: u8,
  source: u8,
  light_engine_flags: U16,
  playback_flags: U16,
  source_flags: U16,
  buffer_fullness: U16,
  point_rate: U32,
  point_count: U32
}

#[repr( C )]
#[derive( FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned )]
struct WireResponse {
  response: u8,
  command: u8,
  status: WireStatus
}

#[repr( C )]
#[derive( FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned )]
struct WirePoint {
  control: U16,
  x: I16,
  y: I16,
  r: U16,
  g: U16,
  b: U16,
  i: U16,
  u1: U16,
  u2: U16
}

// Reads a fixed record from the front of `bytes`, reporting a short read as a
// malformed `record`.
fn read_prefix<T: FromBytes>( record: &'static str, expected: usize, bytes: &[u8] ) -> Result<T> {
  match T::read_from_prefix( bytes ) {
    Ok( ( wire, _rest ) ) => Ok( wire ),
    Err( _ ) => Err( Error::Malformed{ record, expected, actual: bytes.len() } )
  }
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Beacon

#[derive( Clone, Copy, Debug, Default, PartialEq, Eq, Hash )]
pub struct MacAddress( pub [u8;6] );

impl MacAddress {
  pub fn new( address: [u8;6] ) -> MacAddress {
    MacAddress( address )
  }

  pub fn as_slice( &self ) -> &[u8] {
    &self.0
  }
}

impl fmt::Display for MacAddress {
  fn fmt( &self, f: &mut fmt::Formatter ) -> fmt::Result {
    let [ a, b, c, d, e, g ] = self.0;
    write!( f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}" )
  }
}

#[derive( Clone, Copy, Debug, Default, PartialEq, Eq )]
pub struct Version {
  pub hardware: u16,
  pub software: u16
}

impl Version {
  pub fn new( hardware: u16, software: u16 ) -> Self {
    Self{ hardware, software }
  }
}

/// The broadcast a DAC emits once per second to announce itself.
#[derive( Clone, Copy, Debug, Default, PartialEq, Eq )]
pub struct Beacon {
  pub mac_address: MacAddress,
  pub version: Version,

  /// The number of points the DAC can hold in its playback buffer.
  pub buffer_capacity: u16,

  /// The maximum point rate the DAC can sustain, in points per second. This
  /// reflects the DAC and not the galvos attached to it.
  pub max_point_rate: u16,

  /// The DAC status embedded in full-length broadcasts.
  pub status: Option<Status>
}

impl Beacon {
  /// Decodes a beacon from a broadcast payload. Only the 14 byte header is
  /// required; the trailing status block is parsed when present.
  pub fn from_bytes( bytes: &[u8] ) -> Result<Beacon> {
    let wire: WireBeacon = read_prefix( "beacon", ETHERDREAM_BEACON_BYTES, bytes )?;

    let status =
      if bytes.len() >= ETHERDREAM_BROADCAST_BYTES {
        Some( Status::from_bytes( &bytes[ETHERDREAM_BROADCAST_STATE_OFFSET..] )? )
      } else {
        None
      };

    Ok( Beacon{
      mac_address: MacAddress( wire.mac_address ),
      version: Version::new( wire.hardware_revision.get(), wire.software_revision.get() ),
      buffer_capacity: wire.buffer_capacity.get(),
      max_point_rate: wire.max_point_rate.get(),
      status
    })
  }

  /// Encodes the beacon as a DAC would broadcast it. The status block (and
  /// the two reserved bytes before it) is only written when `status` is set.
  pub fn to_bytes( &self ) -> Vec<u8> {
    let wire = WireBeacon{
      mac_address: self.mac_address.0,
      hardware_revision: U16::new( self.version.hardware ),
      software_revision: U16::new( self.version.software ),
      buffer_capacity: U16::new( self.buffer_capacity ),
      max_point_rate: U16::new( self.max_point_rate )
    };

    let mut bytes = wire.as_bytes().to_vec();

    if let Some( status ) = self.status {
      bytes.resize( ETHERDREAM_BROADCAST_STATE_OFFSET, 0 );
      bytes.extend_from_slice( &status.to_bytes() );
    }

    bytes
  }
}

impl fmt::Display for Beacon {
  fn fmt( &self, f: &mut fmt::Formatter ) -> fmt::Result {
    write!(
      f,
      "{} (hardware: {}; software: {}; buffer capacity: {}; max points per second: {})",
      self.mac_address,
      self.version.hardware,
      self.version.software,
      self.buffer_capacity,
      self.max_point_rate
    )
  }
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Status

#[derive( Clone, Copy, Debug, Default, PartialEq, Eq )]
pub struct Status {
  pub protocol: u8,

  // 0: Ready
  // 1: Warm-up
  // 2: Cool-down
  // 3: E-Stop
  pub light_engine_state: u8,

  // 0: Idle
  // 1: Prepared
  // 2: Currently playing
  pub playback_state: u8,

  // 0: Network streaming (default).
  // 1: ILDA playback from SD card.
  // 2: Internal abstract generator.
  pub source: u8,

  // Light engine is ready if all flags are set to zero. Else, each bit:
  // [0]: Emergency stop occurred due to E-Stop packet or invalid command.
  // [1]: Emergency stop occurred due to E-Stop input to projector.
  // [2]: Emergency stop input to projector is currently active.
  // [3]: Emergency stop occurred due to overtemperature condition.
  // [4]: Overtemperature condition is currently active.
  // [5]: Emergency stop occurred due to loss of Ethernet link.
  pub light_engine_flags: u16,

  // [0]: Shutter state: 0 = closed, 1 = open.
  // [1]: Underflow. 1 if the last stream ended with underflow, rather than a
  //      Stop command. Reset to zero by the Prepare command.
  // [2]: E-Stop. 1 if the last stream ended because the E-Stop state was
  //      entered. Reset to zero by the Prepare command.
  pub playback_flags: u16,

  pub source_flags: u16,

  /// Number of points currently queued in the DAC.
  pub buffer_fullness: u16,

  /// Number of points the DAC is processing per second.
  pub point_rate: u32,

  /// The total number of points the DAC has played in this stream.
  pub point_count: u32
}

impl Status {
  pub fn from_bytes( bytes: &[u8] ) -> Result<Status> {
    let wire: WireStatus = read_prefix( "status", ETHERDREAM_STATE_BYTES, bytes )?;
    Ok( Status::from( &wire ) )
  }

  pub fn to_bytes( &self ) -> [u8; ETHERDREAM_STATE_BYTES] {
    let mut bytes = [0u8; ETHERDREAM_STATE_BYTES];
    bytes.copy_from_slice( self.to_wire().as_bytes() );
    bytes
  }

  pub fn light_engine( &self ) -> LightEngineState {
    match self.light_engine_state {
      0 => LightEngineState::Ready,
      1 => LightEngineState::WarmUp,
      2 => LightEngineState::CoolDown,
      3 => LightEngineState::Estop,
      _ => LightEngineState::Unknown
    }
  }

  pub fn playback( &self ) -> PlaybackState {
    match self.playback_state {
      0 => PlaybackState::Idle,
      1 => PlaybackState::Prepared,
      2 => PlaybackState::Playing,
      _ => PlaybackState::Unknown
    }
  }

  pub fn source( &self ) -> Source {
    match self.source {
      0 => Source::Network,
      1 => Source::Ilda,
      2 => Source::Internal,
      _ => Source::Unknown
    }
  }

  #[inline]
  pub fn is_estopped( &self ) -> bool {
    self.light_engine() == LightEngineState::Estop
  }

  fn to_wire( &self ) -> WireStatus {
    WireStatus{
      protocol: self.protocol,
      light_engine_state: self.light_engine_state,
      playback_state: self.playback_state,
      source: self.source,
      light_engine_flags: U16::new( self.light_engine_flags ),
      playback_flags: U16::new( self.playback_flags ),
      source_flags: U16::new( self.source_flags ),
      buffer_fullness: U16::new( self.buffer_fullness ),
      point_rate: U32::new( self.point_rate ),
      point_count: U32::new( self.point_count )
    }
  }
}

impl From<&WireStatus> for Status {
  fn from( wire: &WireStatus ) -> Status {
    Status{
      protocol: wire.protocol,
      light_engine_state: wire.light_engine_state,
      playback_state: wire.playback_state,
      source: wire.source,
      light_engine_flags: wire.light_engine_flags.get(),
      playback_flags: wire.playback_flags.get(),
      source_flags: wire.source_flags.get(),
      buffer_fullness: wire.buffer_fullness.get(),
      point_rate: wire.point_rate.get(),
      point_count: wire.point_count.get()
    }
  }
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Response

/// The 22 byte reply the DAC sends for every command except `version`.
#[derive( Clone, Copy, Debug, Default, PartialEq, Eq )]
pub struct Response {
  /// The response code, one of `a`, `F`, `I` or `!`.
  pub response: u8,

  /// The opcode of the command this response acknowledges.
  pub command: u8,

  pub status: Status
}

impl Response {
  pub fn from_bytes( bytes: &[u8] ) -> Result<Response> {
    let wire: WireResponse = read_prefix( "response", ETHERDREAM_RESPONSE_BYTES, bytes )?;

    Ok( Response{
      response: wire.response,
      command: wire.command,
      status: Status::from( &wire.status )
    })
  }

  pub fn to_bytes( &self ) -> [u8; ETHERDREAM_RESPONSE_BYTES] {
    let wire = WireResponse{
      response: self.response,
      command: self.command,
      status: self.status.to_wire()
    };

    let mut bytes = [0u8; ETHERDREAM_RESPONSE_BYTES];
    bytes.copy_from_slice( wire.as_bytes() );
    bytes
  }

  #[inline]
  pub fn signal( &self ) -> ControlSignal {
    ControlSignal::from( self.response )
  }

  #[inline]
  pub fn is_ack( &self ) -> bool {
    self.response == ETHERDREAM_CONTROL_ACK
  }
}

impl From<u8> for ControlSignal {
  fn from( byte: u8 ) -> ControlSignal {
    match byte {
      ETHERDREAM_CONTROL_ACK => ControlSignal::Ack,
      ETHERDREAM_CONTROL_NAK_FULL => ControlSignal::Nak( NakReason::Full ),
      ETHERDREAM_CONTROL_NAK_ESTOP => ControlSignal::Nak( NakReason::Estop ),
      ETHERDREAM_CONTROL_NAK_INVALID => ControlSignal::Nak( NakReason::Invalid ),
      byte => ControlSignal::Nak( NakReason::Unknown( byte ) )
    }
  }
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Point

/// A single laser sample. Colour and the extended channels are unsigned 16 bit
/// intensities; `x` and `y` span the full signed range of the galvos.
#[derive( Clone, Copy, Debug, Default, PartialEq, Eq )]
pub struct Point {
  pub control: u16,
  pub x: i16,
  pub y: i16,
  pub r: u16,
  pub g: u16,
  pub b: u16,
  pub i: u16,
  pub u1: u16,
  pub u2: u16
}

impl Point {
  /// Creates a point at full intensity with the user channels left blank.
  pub fn new( x: i16, y: i16, r: u16, g: u16, b: u16 ) -> Point {
    Point{ x, y, r, g, b, i: u16::MAX, ..Point::default() }
  }

  pub fn from_bytes( bytes: &[u8] ) -> Result<Point> {
    let wire: WirePoint = read_prefix( "point", ETHERDREAM_POINT_DATA_BYTES, bytes )?;

    Ok( Point{
      control: wire.control.get(),
      x: wire.x.get(),
      y: wire.y.get(),
      r: wire.r.get(),
      g: wire.g.get(),
      b: wire.b.get(),
      i: wire.i.get(),
      u1: wire.u1.get(),
      u2: wire.u2.get()
    })
  }

  pub fn to_bytes( &self ) -> [u8; ETHERDREAM_POINT_DATA_BYTES] {
    let wire = WirePoint{
      control: U16::new( self.control ),
      x: I16::new( self.x ),
      y: I16::new( self.y ),
      r: U16::new( self.r ),
      g: U16::new( self.g ),
      b: U16::new( self.b ),
      i: U16::new( self.i ),
      u1: U16::new( self.u1 ),
      u2: U16::new( self.u2 )
    };

    let mut bytes = [0u8; ETHERDREAM_POINT_DATA_BYTES];
    bytes.copy_from_slice( wire.as_bytes() );
    bytes
  }
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -  Tests

#[cfg( test )]
mod tests {
  use super::*;

  const RESPONSE_BYTES: [u8; 22] = [
    0x61, 0x64, 0x01, 0x02, 0x03, 0x04,
    0x0A, 0x00, 0x0B, 0x00, 0x0C, 0x00, 0x0D, 0x00,
    0x64, 0x00, 0x00, 0x00,
    0xE8, 0x03, 0x00, 0x00
  ];

  #[test]
  fn decodes_a_captured_response() {
    let response = Response::from_bytes( &RESPONSE_BYTES ).unwrap();

    assert_eq!( response.response, b'a' );
    assert_eq!( response.command, b'd' );
    assert_eq!( response.status.protocol, 1 );
    assert_eq!( response.status.light_engine_state, 2 );
    assert_eq!( response.status.playback_state, 3 );
    assert_eq!( response.status.source, 4 );
    assert_eq!( response.status.light_engine_flags, 10 );
    assert_eq!( response.status.playback_flags, 11 );
    assert_eq!( response.status.source_flags, 12 );
    assert_eq!( response.status.buffer_fullness, 13 );
    assert_eq!( response.status.point_rate, 100 );
    assert_eq!( response.status.point_count, 1000 );

    assert_eq!( response.signal(), ControlSignal::Ack );
    assert_eq!( response.status.light_engine(), LightEngineState::CoolDown );
    assert_eq!( response.status.playback(), PlaybackState::Unknown );
    assert_eq!( response.to_bytes(), RESPONSE_BYTES );
  }

  #[test]
  fn rejects_a_short_response() {
    match Response::from_bytes( &RESPONSE_BYTES[..21] ) {
      Err( Error::Malformed{ expected, actual, .. } ) => {
        assert_eq!( expected, 22 );
        assert_eq!( actual, 21 );
      },
      other => panic!( "expected a malformed record, got {other:?}" )
    }
  }

  #[test]
  fn maps_response_codes_to_control_signals() {
    assert_eq!( ControlSignal::from( b'F' ), ControlSignal::Nak( NakReason::Full ) );
    assert_eq!( ControlSignal::from( b'I' ), ControlSignal::Nak( NakReason::Invalid ) );
    assert_eq!( ControlSignal::from( b'!' ), ControlSignal::Nak( NakReason::Estop ) );
    assert_eq!( ControlSignal::from( b'x' ), ControlSignal::Nak( NakReason::Unknown( b'x' ) ) );
  }

  #[test]
  fn a_point_survives_encoding() {
    let point = Point{
      control: 0x8000,
      x: -32767,
      y: -1,
      r: 65535,
      g: 1,
      b: 256,
      i: 7,
      u1: 8,
      u2: 9
    };

    let bytes = point.to_bytes();
    assert_eq!( bytes.len(), ETHERDREAM_POINT_DATA_BYTES );
    assert_eq!( &bytes[2..4], &( -32767i16 ).to_le_bytes() );
    assert_eq!( Point::from_bytes( &bytes ).unwrap(), point );
  }

  #[test]
  fn a_new_point_is_at_full_intensity() {
    let point = Point::new( 1, -1, 2, 3, 4 );
    assert_eq!( point.i, u16::MAX );
    assert_eq!( ( point.control, point.u1, point.u2 ), ( 0, 0, 0 ) );
  }

  #[test]
  fn decodes_a_beacon_header() {
    let bytes = [ 0, 1, 2, 3, 4, 5, 0x02, 0x00, 0x0E, 0x00, 0xE8, 0x03, 0xC0, 0x5D ];
    let beacon = Beacon::from_bytes( &bytes ).unwrap();

    assert_eq!( beacon.mac_address, MacAddress::new([ 0, 1, 2, 3, 4, 5 ]) );
    assert_eq!( beacon.version, Version::new( 2, 14 ) );
    assert_eq!( beacon.buffer_capacity, 1000 );
    assert_eq!( beacon.max_point_rate, 24000 );
    assert_eq!( beacon.status, None );
    assert_eq!( beacon.mac_address.to_string(), "00:01:02:03:04:05" );
  }

  #[test]
  fn decodes_the_status_embedded_in_a_full_broadcast() {
    let status = Status{ light_engine_state: 3, buffer_fullness: 12, point_count: 99, ..Status::default() };
    let beacon = Beacon{
      mac_address: MacAddress::new([ 9; 6 ]),
      buffer_capacity: 1799,
      max_point_rate: 30000,
      status: Some( status ),
      ..Beacon::default()
    };

    let bytes = beacon.to_bytes();
    assert_eq!( bytes.len(), ETHERDREAM_BROADCAST_BYTES );

    let decoded = Beacon::from_bytes( &bytes ).unwrap();
    assert_eq!( decoded, beacon );
    assert!( decoded.status.unwrap().is_estopped() );
  }

  #[test]
  fn rejects_a_short_beacon() {
    assert!( matches!( Beacon::from_bytes( &[0u8; 13] ), Err( Error::Malformed{ record: "beacon", .. } ) ) );
  }
}
