use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::net::TcpStream;
use tokio::time;
use tracing::{ debug, trace };

use crate::command::{ self, Command };
use crate::constants::*;
use crate::error::{ Error, Result };
use crate::record::{ ControlSignal, Point, Response };

/// A TCP control connection to a single DAC.
///
/// Requests are strictly sequential: every command is written and its reply
/// read before the call returns. Any error leaves the session broken, after
/// which every call fails with `Error::Closed`; drop it and `open` a new one.
pub struct Session {
  stream: TcpStream,
  peer: SocketAddr,
  timeout: Duration,
  greeting: Response,
  broken: bool,

  // Reused for every outbound frame.
  buf: Vec<u8>
}

impl Session {
  /// Connects to the DAC at `address` and consumes the response it pushes
  /// immediately after every connect.
  pub async fn open( address: SocketAddr, timeout: Duration ) -> Result<Session> {
    let stream =
      time::timeout( timeout, TcpStream::connect( address ) ).await
        .map_err(|_|{ Error::Connect( std::io::ErrorKind::TimedOut.into() ) })?
        .map_err( Error::Connect )?;

    stream.set_nodelay( true ).map_err( Error::Connect )?;

    let mut session = Session{
      stream,
      peer: address,
      timeout,
      greeting: Response::default(),
      broken: false,
      buf: Vec::new()
    };

    session.greeting = session.read_response().await?;
    debug!( peer = %address, greeting = ?session.greeting, "connected" );

    Ok( session )
  }

  /// Returns the socket address of the DAC.
  #[inline]
  pub fn peer_addr( &self ) -> SocketAddr {
    self.peer
  }

  /// Returns the response the DAC pushed when the connection was opened.
  #[inline]
  pub fn greeting( &self ) -> &Response {
    &self.greeting
  }

  #[inline]
  pub fn is_broken( &self ) -> bool {
    self.broken
  }

  /// Sends `command` and returns the DAC's acknowledgement.
  ///
  /// The response must be an ack that echoes the opcode just sent. A response
  /// echoing an emergency stop is the DAC reporting that it entered that state
  /// on its own, and is returned as `Error::EmergencyStop`.
  pub async fn request( &mut self, command: &Command<'_> ) -> Result<Response> {
    if *command == Command::Version {
      return Err( Error::TextReply );
    }

    self.guard()?;

    let result = self.do_request( command ).await;
    self.broken = result.is_err();
    result
  }

  /// Queries the DAC's firmware version string.
  pub async fn version( &mut self ) -> Result<String> {
    self.guard()?;

    let result = self.do_version().await;
    self.broken = result.is_err();
    result
  }

  /// Pings the DAC, returning its current state without changing it.
  pub async fn ping( &mut self ) -> Result<Response> {
    self.request( &Command::Ping ).await
  }

  /// Prepares the DAC to receive point data, clearing its buffer.
  pub async fn prepare( &mut self ) -> Result<Response> {
    self.request( &Command::Prepare ).await
  }

  /// Starts playback at `point_rate` once `low_water_mark` points are buffered.
  pub async fn begin( &mut self, low_water_mark: u16, point_rate: u32 ) -> Result<Response> {
    self.request( &Command::Begin{ low_water_mark, point_rate } ).await
  }

  pub async fn queue_rate( &mut self, point_rate: u32 ) -> Result<Response> {
    self.request( &Command::QueueRate{ point_rate } ).await
  }

  /// Appends `points` to the DAC's playback buffer.
  pub async fn write( &mut self, points: &[Point] ) -> Result<Response> {
    self.request( &Command::Data( points ) ).await
  }

  /// Clears an emergency stop, returning the light engine to ready.
  pub async fn clear_estop( &mut self ) -> Result<Response> {
    self.request( &Command::Clear ).await
  }

  pub async fn stop( &mut self ) -> Result<Response> {
    self.request( &Command::Stop ).await
  }

  pub async fn estop( &mut self ) -> Result<Response> {
    self.request( &Command::Estop ).await
  }

  /// Shuts the connection down and consumes `self`.
  pub async fn close( mut self ) -> Result<()> {
    self.stream.shutdown().await?;
    Ok(())
  }

  fn guard( &self ) -> Result<()> {
    if self.broken { Err( Error::Closed ) } else { Ok(()) }
  }

  async fn do_request( &mut self, command: &Command<'_> ) -> Result<Response> {
    let opcode = command.opcode();
    self.send( command ).await?;

    let response = self.read_response().await?;
    trace!( command = command::opcode_name( opcode ), ?response, "response" );

    // An echoed emergency stop is only expected when we asked for one.
    if command::is_estop( response.command ) && !command::is_estop( opcode ) {
      return Err( Error::EmergencyStop( response ) );
    }

    if let ControlSignal::Nak( reason ) = response.signal() {
      return Err( Error::Nak{ reason, command: response.command } );
    }

    if response.command != opcode {
      return Err( Error::UnexpectedCommand{ expected: opcode, actual: response.command } );
    }

    Ok( response )
  }

  async fn do_version( &mut self ) -> Result<String> {
    self.send( &Command::Version ).await?;

    let mut buf = [0u8; ETHERDREAM_VERSION_BYTES];
    time::timeout( self.timeout, self.stream.read_exact( &mut buf ) ).await??;

    let end = buf.iter().position(| &b |{ b == 0 }).unwrap_or( buf.len() );
    Ok( String::from_utf8_lossy( &buf[..end] ).trim().to_string() )
  }

  async fn send( &mut self, command: &Command<'_> ) -> Result<()> {
    self.buf.clear();
    command.encode_into( &mut self.buf )?;

    debug!( command = command::opcode_name( command.opcode() ), bytes = self.buf.len(), "send" );
    time::timeout( self.timeout, self.stream.write_all( &self.buf ) ).await??;
    Ok(())
  }

  async fn read_response( &mut self ) -> Result<Response> {
    let mut buf = [0u8; ETHERDREAM_RESPONSE_BYTES];
    time::timeout( self.timeout, self.stream.read_exact( &mut buf ) ).await??;
    Response::from_bytes( &buf )
  }
}
