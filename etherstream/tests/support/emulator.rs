//! A local server that emulates an Etherdream DAC for testing.
use std::io;
use std::net::{ IpAddr, Ipv4Addr, SocketAddr };
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::net::{ TcpListener, TcpStream };
use tokio::task;

use etherstream::constants::*;
use etherstream::record::{ Response, Status };

pub const EMULATOR_VERSION: &str = "EtherDream emulator 1.0";

/// A command as the emulator received it.
#[derive( Clone, Debug, PartialEq )]
pub enum Received {
  Begin{ low_water_mark: u16, point_rate: u32 },
  Clear,
  Data( usize ),
  Estop,
  Ping,
  Prepare,
  QueueRate( u32 ),
  Stop,
  Version,
  Unknown( u8 )
}

/// A misbehaviour applied to the next command carrying a given opcode.
#[derive( Clone, Copy, Debug, PartialEq )]
pub enum Fault {
  /// Reply with a negative response code.
  Nak( u8 ),
  /// Acknowledge, but echo an opcode that was not sent.
  WrongEcho,
  /// Reply as if the DAC had entered an emergency stop on its own.
  EstopNotification,
  /// Send part of a response, then close the connection.
  Truncate,
  /// Close the connection without replying.
  Disconnect,
  /// Never reply.
  Silence
}

struct Shared {
  capacity: u16,
  status: Status,
  received: Vec<Received>,
  connections: usize,
  faults: Vec<( u8, Fault )>
}

pub struct Emulator {
  /// The local socket address that the emulator is running on.
  address: SocketAddr,

  /// The real-time device state and the commands received so far.
  shared: Arc<Mutex<Shared>>,

  /// The join handle that owns the asynchronous server task.
  handle: task::JoinHandle<io::Result<()>>
}

impl Emulator {
  /// Starts an emulator with a point buffer of `capacity` on any available
  /// port.
  pub async fn start_with_capacity( capacity: u16 ) -> io::Result<Self> {
    let shared = Arc::new( Mutex::new( Shared{
      capacity,
      status: Status::default(),
      received: Vec::new(),
      connections: 0,
      faults: Vec::new()
    }));

    let listener = TcpListener::bind( SocketAddr::new( IpAddr::V4( Ipv4Addr::LOCALHOST ), 0 ) ).await?;
    let address = listener.local_addr()?;

    let handle = tokio::spawn({
      let shared = shared.clone();

      async move {
        // Connections are served one at a time, like a real DAC.
        loop {
          let ( stream, _remote ) = listener.accept().await?;
          shared.lock().connections += 1;

          let _ = serve( stream, &shared ).await;
        }
      }
    });

    Ok( Self{ address, shared, handle } )
  }

  pub fn address( &self ) -> SocketAddr {
    self.address
  }

  pub fn port( &self ) -> u16 {
    self.address.port()
  }

  /// Returns every command received, across all connections, in order.
  pub fn received( &self ) -> Vec<Received> {
    self.shared.lock().received.clone()
  }

  /// Returns the received commands and forgets them.
  pub fn take_received( &self ) -> Vec<Received> {
    std::mem::take( &mut self.shared.lock().received )
  }

  /// Returns the number of connections accepted so far.
  pub fn connections( &self ) -> usize {
    self.shared.lock().connections
  }

  pub fn status( &self ) -> Status {
    self.shared.lock().status
  }

  pub fn set_buffer_fullness( &self, points: u16 ) {
    self.shared.lock().status.buffer_fullness = points;
  }

  pub fn set_light_engine_state( &self, state: u8 ) {
    self.shared.lock().status.light_engine_state = state;
  }

  /// Applies `fault` to the next command carrying `opcode`.
  pub fn fail_next( &self, opcode: u8, fault: Fault ) {
    self.shared.lock().faults.push( ( opcode, fault ) );
  }
}

impl Drop for Emulator {
  fn drop( &mut self ) {
    self.handle.abort();
  }
}

async fn serve( mut stream: TcpStream, shared: &Mutex<Shared> ) -> io::Result<()> {
  // A DAC pushes its state as soon as a client connects.
  let greeting = response( ETHERDREAM_CONTROL_ACK, ETHERDREAM_COMMAND_PING, shared.lock().status );
  stream.write_all( &greeting.to_bytes() ).await?;

  loop {
    let cmd = stream.read_u8().await?;

    let received =
      match cmd {
        ETHERDREAM_COMMAND_BEGIN => {
          let low_water_mark = stream.read_u16_le().await?;
          let point_rate = stream.read_u32_le().await?;
          Received::Begin{ low_water_mark, point_rate }
        },
        ETHERDREAM_COMMAND_QUEUE_RATE => Received::QueueRate( stream.read_u32_le().await? ),
        ETHERDREAM_COMMAND_DATA => {
          let point_count = stream.read_u16_le().await? as usize;
          let mut points = vec![0u8; point_count * ETHERDREAM_POINT_DATA_BYTES];
          stream.read_exact( &mut points ).await?;
          Received::Data( point_count )
        },
        ETHERDREAM_COMMAND_CLEAR => Received::Clear,
        ETHERDREAM_COMMAND_ESTOP | ETHERDREAM_COMMAND_ESTOP_ALT => Received::Estop,
        ETHERDREAM_COMMAND_PING => Received::Ping,
        ETHERDREAM_COMMAND_PREPARE => Received::Prepare,
        ETHERDREAM_COMMAND_STOP => Received::Stop,
        ETHERDREAM_COMMAND_VERSION => Received::Version,
        unknown => Received::Unknown( unknown )
      };

    let fault = {
      let mut shared = shared.lock();
      shared.received.push( received.clone() );

      let index = shared.faults.iter().position(| ( opcode, _ ) |{ *opcode == cmd });
      index.map(| index |{ shared.faults.remove( index ).1 })
    };

    if received == Received::Version && fault.is_none() {
      let mut text = [0u8; ETHERDREAM_VERSION_BYTES];
      text[..EMULATOR_VERSION.len()].copy_from_slice( EMULATOR_VERSION.as_bytes() );
      stream.write_all( &text ).await?;
      continue;
    }

    let reply =
      match fault {
        None => apply( &received, cmd, &mut shared.lock() ),
        Some( Fault::Nak( code ) ) => response( code, cmd, shared.lock().status ),
        Some( Fault::WrongEcho ) => {
          let echo = if cmd == ETHERDREAM_COMMAND_STOP { ETHERDREAM_COMMAND_PREPARE } else { ETHERDREAM_COMMAND_STOP };
          response( ETHERDREAM_CONTROL_ACK, echo, shared.lock().status )
        },
        Some( Fault::EstopNotification ) => {
          let mut shared = shared.lock();
          shared.status.light_engine_state = 3;
          response( ETHERDREAM_CONTROL_ACK, ETHERDREAM_COMMAND_ESTOP, shared.status )
        },
        Some( Fault::Truncate ) => {
          let bytes = response( ETHERDREAM_CONTROL_ACK, cmd, shared.lock().status ).to_bytes();
          stream.write_all( &bytes[..10] ).await?;
          return Ok(());
        },
        Some( Fault::Disconnect ) => return Ok(()),
        Some( Fault::Silence ) => {
          // Hold the connection open until the client gives up on it.
          let mut sink = [0u8; 64];
          while stream.read( &mut sink ).await? > 0 {}
          return Ok(());
        }
      };

    stream.write_all( &reply.to_bytes() ).await?;
  }
}

// Updates the emulated DAC for a well-formed command and builds its reply.
fn apply( received: &Received, cmd: u8, shared: &mut Shared ) -> Response {
  let mut control_signal = ETHERDREAM_CONTROL_ACK;
  let status = &mut shared.status;

  match *received {
    Received::Prepare => {
      status.playback_state = 1;
      status.buffer_fullness = 0;
      status.point_count = 0;
    },
    Received::Data( point_count ) => {
      if point_count as u16 <= shared.capacity.saturating_sub( status.buffer_fullness ) {
        status.buffer_fullness += point_count as u16;
      } else {
        control_signal = ETHERDREAM_CONTROL_NAK_FULL;
      }
    },
    Received::Begin{ point_rate, .. } => {
      status.point_rate = point_rate;
      status.playback_state = 2;
    },
    Received::QueueRate( point_rate ) => {
      status.point_rate = point_rate;
    },
    Received::Clear => {
      status.light_engine_state = 0;
      status.light_engine_flags = 0;
    },
    Received::Stop | Received::Estop => {
      status.playback_state = 0;
    },
    Received::Ping | Received::Version => { /* no-op */ },
    Received::Unknown( _ ) => {
      control_signal = ETHERDREAM_CONTROL_NAK_INVALID;
    }
  }

  response( control_signal, cmd, *status )
}

fn response( control_signal: u8, command: u8, status: Status ) -> Response {
  Response{ response: control_signal, command, status }
}
