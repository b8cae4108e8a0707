//! Outbound command frames. Each frame is a single opcode byte followed by a
//! payload whose shape depends on the opcode.
use crate::constants::*;
use crate::error::{ Error, Result };
use crate::record::Point;

/// Commands recognized by an Etherdream DAC.
#[derive( Clone, Copy, Debug, PartialEq )]
pub enum Command<'a> {
  Ping,
  Version,
  Prepare,
  Clear,
  Stop,
  Estop,
  EstopAlt,

  /// Starts playback once `low_water_mark` points are buffered.
  Begin { low_water_mark: u16, point_rate: u32 },

  /// Queues a point rate change, applied at the next point flagged for it.
  QueueRate { point_rate: u32 },

  Data( &'a [Point] )
}

#[derive( Clone, Copy, Debug, PartialEq )]
pub enum Scalar {
  U16( u16 ),
  U32( u32 )
}

/// The payload carried after the opcode byte.
#[derive( Clone, Copy, Debug, PartialEq )]
pub enum Payload<'a> {
  None,
  Scalars( &'a [Scalar] ),
  Points( &'a [Point] )
}

impl<'a> Command<'a> {
  /// Returns the canonical opcode byte for this command.
  pub fn opcode( &self ) -> u8 {
    match self {
      Command::Ping => ETHERDREAM_COMMAND_PING,
      Command::Version => ETHERDREAM_COMMAND_VERSION,
      Command::Prepare => ETHERDREAM_COMMAND_PREPARE,
      Command::Clear => ETHERDREAM_COMMAND_CLEAR,
      Command::Stop => ETHERDREAM_COMMAND_STOP,
      Command::Estop => ETHERDREAM_COMMAND_ESTOP,
      Command::EstopAlt => ETHERDREAM_COMMAND_ESTOP_ALT,
      Command::Begin{ .. } => ETHERDREAM_COMMAND_BEGIN,
      Command::QueueRate{ .. } => ETHERDREAM_COMMAND_QUEUE_RATE,
      Command::Data( _ ) => ETHERDREAM_COMMAND_DATA
    }
  }

  /// Writes the payload shape of this command into `scratch` (for scalar
  /// payloads) and returns it.
  pub fn payload<'s>( &self, scratch: &'s mut [Scalar; 2] ) -> Payload<'s>
    where 'a: 's
  {
    match *self {
      Command::Begin{ low_water_mark, point_rate } => {
        *scratch = [ Scalar::U16( low_water_mark ), Scalar::U32( point_rate ) ];
        Payload::Scalars( &scratch[..] )
      },

      Command::QueueRate{ point_rate } => {
        scratch[0] = Scalar::U32( point_rate );
        Payload::Scalars( &scratch[..1] )
      },

      Command::Data( points ) => Payload::Points( points ),

      _ => Payload::None
    }
  }

  /// Appends the encoded frame to `buf` and returns the number of bytes
  /// written.
  pub fn encode_into( &self, buf: &mut Vec<u8> ) -> Result<usize> {
    let start = buf.len();
    let mut scratch = [ Scalar::U16( 0 ); 2 ];

    match self.payload( &mut scratch ) {
      Payload::None => {
        buf.push( self.opcode() );
      },

      Payload::Scalars( scalars ) => {
        buf.push( self.opcode() );

        for scalar in scalars {
          match *scalar {
            Scalar::U16( value ) => buf.extend_from_slice( &value.to_le_bytes() ),
            Scalar::U32( value ) => buf.extend_from_slice( &value.to_le_bytes() )
          }
        }
      },

      Payload::Points( points ) => {
        let count = u16::try_from( points.len() ).map_err(|_|{ Error::FrameTooLarge( points.len() ) })?;

        buf.reserve( 3 + points.len() * ETHERDREAM_POINT_DATA_BYTES );
        buf.push( self.opcode() );
        buf.extend_from_slice( &count.to_le_bytes() );

        for point in points {
          buf.extend_from_slice( &point.to_bytes() );
        }
      }
    }

    Ok( buf.len() - start )
  }

  /// Encodes this command into a new frame.
  pub fn encode( &self ) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    self.encode_into( &mut buf )?;
    Ok( buf )
  }
}

/// Returns a readable name for an opcode byte, used when logging echoed
/// opcodes that may not match anything this client sent.
pub fn opcode_name( opcode: u8 ) -> &'static str {
  match opcode {
    ETHERDREAM_COMMAND_BEGIN => "begin",
    ETHERDREAM_COMMAND_CLEAR => "clear",
    ETHERDREAM_COMMAND_DATA => "data",
    ETHERDREAM_COMMAND_ESTOP | ETHERDREAM_COMMAND_ESTOP_ALT => "estop",
    ETHERDREAM_COMMAND_PING => "ping",
    ETHERDREAM_COMMAND_PREPARE => "prepare",
    ETHERDREAM_COMMAND_QUEUE_RATE => "queue-rate",
    ETHERDREAM_COMMAND_STOP => "stop",
    ETHERDREAM_COMMAND_VERSION => "version",
    _ => "unknown"
  }
}

#[inline]
pub fn is_estop( opcode: u8 ) -> bool {
  opcode == ETHERDREAM_COMMAND_ESTOP || opcode == ETHERDREAM_COMMAND_ESTOP_ALT
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -  Tests

#[cfg( test )]
mod tests {
  use super::*;

  #[test]
  fn single_byte_commands() {
    let cases = [
      ( Command::Ping, b'?' ),
      ( Command::Version, b'v' ),
      ( Command::Prepare, b'p' ),
      ( Command::Clear, b'c' ),
      ( Command::Stop, b's' ),
      ( Command::Estop, 0x00 ),
      ( Command::EstopAlt, 0xFF )
    ];

    for ( command, opcode ) in cases {
      assert_eq!( command.encode().unwrap(), vec![ opcode ], "{command:?}" );
    }
  }

  #[test]
  fn begin_carries_the_low_water_mark_and_rate() {
    let bytes = Command::Begin{ low_water_mark: 0x0102, point_rate: 24000 }.encode().unwrap();
    assert_eq!( bytes, vec![ b'b', 0x02, 0x01, 0xC0, 0x5D, 0x00, 0x00 ] );
  }

  #[test]
  fn queue_rate_carries_the_rate() {
    let bytes = Command::QueueRate{ point_rate: 30000 }.encode().unwrap();
    assert_eq!( bytes, vec![ b'q', 0x30, 0x75, 0x00, 0x00 ] );
  }

  #[test]
  fn data_is_prefixed_by_its_point_count() {
    for len in [ 0usize, 1, 7, 600 ] {
      let points: Vec<Point> = ( 0..len ).map(| i |{ Point::new( i as i16, -( i as i16 ), 0, 0, 0 ) }).collect();
      let bytes = Command::Data( &points ).encode().unwrap();

      assert_eq!( bytes.len(), 1 + 2 + 18 * len );
      assert_eq!( bytes[0], b'd' );
      assert_eq!( u16::from_le_bytes([ bytes[1], bytes[2] ]) as usize, len );

      if len > 0 {
        assert_eq!( Point::from_bytes( &bytes[3..] ).unwrap(), points[0] );
        assert_eq!( Point::from_bytes( &bytes[bytes.len() - 18..] ).unwrap(), points[len - 1] );
      }
    }
  }

  #[test]
  fn data_accepts_the_largest_count() {
    let points = vec![ Point::default(); u16::MAX as usize ];
    let bytes = Command::Data( &points ).encode().unwrap();
    assert_eq!( bytes.len(), 3 + 18 * u16::MAX as usize );
  }

  #[test]
  fn data_rejects_frames_that_overflow_the_count() {
    let points = vec![ Point::default(); u16::MAX as usize + 1 ];
    assert!( matches!( Command::Data( &points ).encode(), Err( Error::FrameTooLarge( 65536 ) ) ) );
  }

  #[test]
  fn encode_into_appends() {
    let mut buf = vec![ 0xAA ];
    assert_eq!( Command::Ping.encode_into( &mut buf ).unwrap(), 1 );
    assert_eq!( buf, vec![ 0xAA, b'?' ] );
  }
}
