use etherstream::record::{ Beacon, MacAddress, Status, Version };

// A convenience beacon builder for testing.
#[derive( Clone, Copy )]
pub struct BeaconBuilder {
  beacon: Beacon
}

impl BeaconBuilder {
  // Creates a new beacon builder with all fields set to zero.
  pub fn new() -> Self {
    Self{ beacon: Beacon::default() }
  }

  // Creates a new beacon builder with typical default values for an Etherdream DAC.
  pub fn default() -> Self {
    Self::new()
      .buffer_capacity( 1799 )
      .mac_address([ 0, 1, 2, 3, 4, 5 ])
      .max_point_rate( 30000 )
      .version( 2, 14 )
  }

  // Returns the `Beacon` constructed. Consumes self.
  pub fn to_beacon( self ) -> Beacon {
    self.beacon
  }

  pub fn buffer_capacity( mut self, capacity: u16 ) -> Self {
    self.beacon.buffer_capacity = capacity;
    self
  }

  pub fn mac_address( mut self, address: [u8;6] ) -> Self {
    self.beacon.mac_address = MacAddress::new( address );
    self
  }

  pub fn max_point_rate( mut self, points_per_second: u16 ) -> Self {
    self.beacon.max_point_rate = points_per_second;
    self
  }

  pub fn status( mut self, status: Status ) -> Self {
    self.beacon.status = Some( status );
    self
  }

  pub fn version( mut self, hardware: u16, software: u16 ) -> Self {
    self.beacon.version = Version::new( hardware, software );
    self
  }
}
