//! Streams a rotating cross to the first Etherdream DAC that announces itself
//! on the local network, reconnecting whenever the DAC goes away.
use std::net::{ IpAddr, Ipv4Addr, SocketAddr };
use std::time::Duration;

use anyhow::ensure;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use etherstream::constants::*;
use etherstream::{ Config, Engine };
use etherstream_cli::generators::Cross;

// The rate the shape is animated at when the DAC's own rate is not overridden.
const DEFAULT_POINT_RATE: u32 = 30_000;

#[derive( Debug, Parser )]
#[command( name = "etherstream", version, about = "Streams a test shape to an Etherdream DAC." )]
struct Args {
  /// The local address to listen for DAC broadcasts on.
  #[arg( long, default_value_t = IpAddr::V4( Ipv4Addr::UNSPECIFIED ) )]
  bind: IpAddr,

  /// The UDP port DACs broadcast to.
  #[arg( long, default_value_t = ETHERDREAM_BROADCAST_PORT )]
  discovery_port: u16,

  /// Seconds to wait for a broadcast before listening again.
  #[arg( long, default_value_t = 10 )]
  discovery_timeout: u64,

  /// The TCP control port of the DAC.
  #[arg( long, default_value_t = ETHERDREAM_CLIENT_PORT )]
  control_port: u16,

  /// Milliseconds to wait on any single read or write before reconnecting.
  #[arg( long, default_value_t = 2000 )]
  timeout_ms: u64,

  /// Points per frame.
  #[arg( long, default_value_t = 500 )]
  frame_points: u16,

  /// Overrides the point rate the DAC advertises.
  #[arg( long )]
  point_rate: Option<u32>,

  /// Milliseconds to sleep between buffer polls.
  #[arg( long, default_value_t = 0 )]
  poll_ms: u64,

  /// Size of the shape, as a fraction of the full deflection range.
  #[arg( long, default_value_t = 0.5 )]
  scale: f64,

  #[arg( long, default_value_t = 0.25 )]
  rotations_per_second: f64
}

impl Args {
  fn config( &self ) -> Config {
    Config::default()
      .discovery_address( SocketAddr::new( self.bind, self.discovery_port ) )
      .discovery_timeout( Some( Duration::from_secs( self.discovery_timeout ) ) )
      .control_port( self.control_port )
      .io_timeout( Duration::from_millis( self.timeout_ms ) )
      .max_frame_points( self.frame_points )
      .point_rate( self.point_rate )
      .poll_interval( Duration::from_millis( self.poll_ms ) )
  }
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Main

#[tokio::main( flavor="current_thread" )]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  tracing_subscriber::fmt()
    .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_|{ EnvFilter::new( "info" ) }) )
    .init();

  ensure!( args.frame_points > 0, "--frame-points must be at least 1" );
  ensure!( args.scale > 0.0 && args.scale <= 1.0, "--scale must be within (0, 1]" );
  ensure!( args.timeout_ms > 0, "--timeout-ms must be at least 1" );

  let point_rate = args.point_rate.unwrap_or( DEFAULT_POINT_RATE );
  let source = Cross::new( point_rate as usize, args.scale, args.rotations_per_second )
    .frame_points( args.frame_points as usize );

  let config = args.config();
  info!( discovery = %config.discovery_address, control_port = config.control_port, "waiting for a DAC" );

  Engine::new( config, source ).run().await;
  Ok(())
}
