//! The streaming state machine. The engine discovers a DAC, opens a session,
//! hands it a first frame and then keeps its playback buffer topped up one
//! frame at a time. Any failure drops everything learned about the DAC and
//! starts over at discovery.
use std::net::SocketAddr;

use tokio::time;
use tracing::{ debug, info, trace, warn };

use crate::config::Config;
use crate::discovery::Listener;
use crate::error::{ Error, Result };
use crate::record::{ Beacon, Point };
use crate::session::Session;
use crate::source::PointSource;

/// The observable phase of the engine.
#[derive( Clone, Copy, Debug, PartialEq, Eq )]
pub enum Phase {
  Discovering,
  Initializing,
  Streaming
}

// A connected DAC and what it told us about itself.
struct Link {
  session: Session,
  beacon: Beacon
}

// The session and the look-ahead frame only exist inside the stage that uses
// them, so returning to `Discovering` drops both.
enum Stage {
  Discovering,
  Initializing( Link ),
  Streaming( Link, Vec<Point> )
}

pub struct Engine<S> {
  config: Config,
  listener: Listener,
  source: S,
  stage: Stage
}

impl<S> Engine<S>
  where S: PointSource
{
  pub fn new( config: Config, source: S ) -> Self {
    let mut listener = Listener::new().address( config.discovery_address );

    if let Some( duration ) = config.discovery_timeout {
      listener = listener.duration( duration );
    }

    Self{ config, listener, source, stage: Stage::Discovering }
  }

  pub fn phase( &self ) -> Phase {
    phase_of( &self.stage )
  }

  /// Returns the beacon of the DAC the engine is connected to, if any.
  pub fn beacon( &self ) -> Option<&Beacon> {
    match &self.stage {
      Stage::Discovering => None,
      Stage::Initializing( link ) | Stage::Streaming( link, _ ) => Some( &link.beacon )
    }
  }

  /// Returns the number of points in the frame held back for the next write.
  pub fn pending_points( &self ) -> usize {
    match &self.stage {
      Stage::Streaming( _, frame ) => frame.len(),
      _ => 0
    }
  }

  pub fn source( &self ) -> &S {
    &self.source
  }

  /// Advances the engine by one phase, or by one cycle while streaming, and
  /// returns the phase it ends in. On error the engine is back in
  /// `Phase::Discovering` and the error is returned for inspection.
  pub async fn step( &mut self ) -> Result<Phase> {
    let stage = std::mem::replace( &mut self.stage, Stage::Discovering );
    let phase = phase_of( &stage );

    let result =
      match stage {
        Stage::Discovering => self.discover().await,
        Stage::Initializing( link ) => self.initialize( link ).await,
        Stage::Streaming( link, frame ) => self.stream( link, frame ).await
      };

    match result {
      Ok( stage ) => {
        self.stage = stage;
        Ok( self.phase() )
      },

      Err( err ) => {
        match ( phase, &err ) {
          ( Phase::Discovering, Error::Discovery( _ ) ) => debug!( error = %err, "no DAC found" ),
          _ => warn!( ?phase, error = %err, "restarting discovery" )
        }

        Err( err )
      }
    }
  }

  /// Runs the engine until the process exits.
  pub async fn run( &mut self ) {
    loop {
      let _ = self.step().await;
    }
  }

  async fn discover( &mut self ) -> Result<Stage> {
    let discovered = self.listener.listen().await?;
    let address = SocketAddr::new( discovered.address.ip(), self.config.control_port );

    let session = Session::open( address, self.config.io_timeout ).await?;
    info!( %address, "session opened" );

    Ok( Stage::Initializing( Link{ session, beacon: discovered.beacon } ) )
  }

  async fn initialize( &mut self, mut link: Link ) -> Result<Stage> {
    let max_len = self.frame_limit( &link.beacon );
    let point_rate = self.config.point_rate.unwrap_or( link.beacon.max_point_rate as u32 );
    let session = &mut link.session;

    let status = session.ping().await?.status;

    let version = session.version().await?;
    info!( %version, light_engine = ?status.light_engine(), playback = ?status.playback(), "DAC state" );

    if status.is_estopped() {
      info!( flags = status.light_engine_flags, "clearing emergency stop" );
      session.clear_estop().await?;
    }

    session.prepare().await?;

    let frame = self.next_frame( max_len );
    session.write( &frame ).await?;

    // Render the next frame while the first one plays.
    let next = self.next_frame( max_len );

    session.begin( 0, point_rate ).await?;
    info!( point_rate, first_frame = frame.len(), "playback started" );

    Ok( Stage::Streaming( link, next ) )
  }

  async fn stream( &mut self, mut link: Link, frame: Vec<Point> ) -> Result<Stage> {
    let status = link.session.ping().await?.status;
    let fullness = status.buffer_fullness as usize;
    let capacity = link.beacon.buffer_capacity as usize;

    let frame =
      if has_room( fullness, capacity, frame.len() ) {
        link.session.write( &frame ).await?;

        let max_len = self.frame_limit( &link.beacon );
        self.next_frame( max_len )
      } else {
        trace!( fullness, capacity, pending = frame.len(), "DAC buffer full" );
        frame
      };

    if !self.config.poll_interval.is_zero() {
      time::sleep( self.config.poll_interval ).await;
    }

    Ok( Stage::Streaming( link, frame ) )
  }

  // A frame must leave at least one point of room even in an empty buffer,
  // otherwise it could never be written.
  fn frame_limit( &self, beacon: &Beacon ) -> usize {
    self.config.max_frame_points.min( beacon.buffer_capacity.saturating_sub( 1 ) ) as usize
  }

  fn next_frame( &mut self, max_len: usize ) -> Vec<Point> {
    let mut frame = self.source.next_frame( max_len );

    if frame.len() > max_len {
      warn!( len = frame.len(), max_len, "truncating an oversized frame" );
      frame.truncate( max_len );
    }

    frame
  }
}

fn phase_of( stage: &Stage ) -> Phase {
  match stage {
    Stage::Discovering => Phase::Discovering,
    Stage::Initializing( .. ) => Phase::Initializing,
    Stage::Streaming( .. ) => Phase::Streaming
  }
}

/// A frame is written only when the DAC can take all of it without
/// exceeding its capacity.
#[inline]
pub fn has_room( fullness: usize, capacity: usize, frame_len: usize ) -> bool {
  fullness + frame_len < capacity
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -  Tests

#[cfg( test )]
mod tests {
  use super::*;

  #[test]
  fn room_requires_fullness_below_capacity_less_the_frame() {
    assert!( has_room( 399, 1000, 600 ) );
    assert!( !has_room( 400, 1000, 600 ) );
    assert!( !has_room( 1000, 1000, 600 ) );
    assert!( has_room( 0, 1000, 999 ) );
    assert!( !has_room( 0, 1000, 1000 ) );
    assert!( !has_room( 0, 500, 600 ) );
  }

  #[test]
  fn a_new_engine_is_discovering() {
    let engine = Engine::new( Config::default(), | _max: usize |{ Vec::<Point>::new() } );
    assert_eq!( engine.phase(), Phase::Discovering );
    assert!( engine.beacon().is_none() );
    assert_eq!( engine.pending_points(), 0 );
  }
}
