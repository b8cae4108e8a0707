use std::net::{ IpAddr, Ipv4Addr, SocketAddr };
use std::time::Duration;

use crate::constants::*;

/// Tunables for the streaming engine. `Config::default()` matches the
/// Etherdream defaults; the builder methods override single values.
#[derive( Clone, Copy, Debug, PartialEq )]
pub struct Config {
  /// The local address the discovery listener binds for each attempt.
  pub discovery_address: SocketAddr,

  /// How long a single discovery attempt waits for a beacon. An expired
  /// attempt simply starts over.
  pub discovery_timeout: Option<Duration>,

  /// The TCP port of the control channel on the discovered DAC.
  pub control_port: u16,

  /// The bound on every session read and write.
  pub io_timeout: Duration,

  /// The largest frame requested from the point source. The DAC's buffer
  /// capacity bounds this further.
  pub max_frame_points: u16,

  /// Overrides the point rate advertised by the DAC's beacon.
  pub point_rate: Option<u32>,

  /// A fixed delay between streaming cycles. Zero paces the cycle by the
  /// round trip alone.
  pub poll_interval: Duration
}

impl Default for Config {
  fn default() -> Self {
    Self{
      discovery_address: SocketAddr::new( IpAddr::V4( Ipv4Addr::UNSPECIFIED ), ETHERDREAM_BROADCAST_PORT ),
      discovery_timeout: Some( Duration::from_secs( 10 ) ),
      control_port: ETHERDREAM_CLIENT_PORT,
      io_timeout: Duration::from_secs( 2 ),
      max_frame_points: 1000,
      point_rate: None,
      poll_interval: Duration::ZERO
    }
  }
}

impl Config {
  pub fn discovery_address( mut self, address: SocketAddr ) -> Self {
    self.discovery_address = address;
    self
  }

  pub fn discovery_timeout( mut self, timeout: Option<Duration> ) -> Self {
    self.discovery_timeout = timeout;
    self
  }

  pub fn control_port( mut self, port: u16 ) -> Self {
    self.control_port = port;
    self
  }

  pub fn io_timeout( mut self, timeout: Duration ) -> Self {
    self.io_timeout = timeout;
    self
  }

  pub fn max_frame_points( mut self, points: u16 ) -> Self {
    self.max_frame_points = points;
    self
  }

  pub fn point_rate( mut self, rate: Option<u32> ) -> Self {
    self.point_rate = rate;
    self
  }

  pub fn poll_interval( mut self, interval: Duration ) -> Self {
    self.poll_interval = interval;
    self
  }
}
