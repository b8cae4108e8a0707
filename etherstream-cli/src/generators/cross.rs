use std::f64::consts::TAU;

use nalgebra as na;

use etherstream::{ Point, PointSource };

use crate::page::Page;

const W: f64 = 0.25; // width

const SHAPE: [na::Point3<f64>; 12] = [
  // left arm (starting from top-left, counter clock-wise)
  na::Point3::new( -1.0,      0.0 + W,  0.0 ),
  na::Point3::new( -1.0,      0.0 - W,  0.0 ),
  na::Point3::new(  0.0 - W,  0.0 - W,  0.0 ),

  // bottom arm
  na::Point3::new(  0.0 - W, -1.0,      0.0 ),
  na::Point3::new(  0.0 + W, -1.0,      0.0 ),
  na::Point3::new(  0.0 + W,  0.0 - W,  0.0 ),

  // right arm
  na::Point3::new(  1.0,      0.0 - W,  0.0 ),
  na::Point3::new(  1.0,      0.0 + W,  0.0 ),
  na::Point3::new(  0.0 + W,  0.0 + W,  0.0 ),

  // top arm
  na::Point3::new(  0.0 + W,  1.0,      0.0 ),
  na::Point3::new(  0.0 - W,  1.0,      0.0 ),
  na::Point3::new(  0.0 - W,  0.0 + W,  0.0 )
];

/// Fills `buf` with the rotating cross, starting at `page`, and returns the
/// page the next call should start from.
pub fn generate( buf: &mut [na::Point3<f64>], page: Page, point_rate: usize, scale: f64, rotations_per_second: f64 ) -> Page {
  if buf.is_empty() {
    return page;
  }

  let mut buf_index: usize = 0;
  let mut frame: usize = 0;
  let scale = na::Scale3::new( scale, scale, scale );

  // We start rendering at the page-defined offset for the first "frame". This
  // gets reset to `0` on every subsequent "frame".
  assert!( page.offset < SHAPE.len(), "page offset must be less than shape's length" );
  let mut point_index: usize = page.offset;

  loop {
    // Calculate the start time for this frame
    let time = page.time + ( ( frame * SHAPE.len() ) as f64 / point_rate as f64 );

    // Calculate our transformation matrix
    let rotation = na::Rotation3::from_axis_angle( &na::Vector3::z_axis(), time * rotations_per_second * -1.0 * TAU );
    let matrix = rotation.to_homogeneous() * scale.to_homogeneous();

    for ( i, point ) in SHAPE[point_index..].iter().enumerate() {
      buf[buf_index] = matrix.transform_point( point );
      buf_index += 1;

      if buf.len() == buf_index {
        let offset = point_index + i + 1;

        return if offset == SHAPE.len() {
          Page{ time: time + ( SHAPE.len() as f64 / point_rate as f64 ), offset: 0 }
        } else {
          Page{ time, offset }
        };
      }
    }

    // Reset `point_index` and increment our `frame`
    point_index = 0;
    frame += 1;
  }
}

/// Maps a unit coordinate onto the full deflection range of the galvos.
#[inline]
pub fn to_deflection( value: f64 ) -> i16 {
  ( value.clamp( -1.0, 1.0 ) * i16::MAX as f64 ).round() as i16
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - Point Source

/// A cross spinning about its center, drawn in a single colour. Consecutive
/// frames continue the outline where the previous frame stopped.
pub struct Cross {
  buf: Vec<na::Point3<f64>>,
  color: ( u16, u16, u16 ),
  frame_points: usize,
  page: Page,
  point_rate: usize,
  rotations_per_second: f64,
  scale: f64
}

impl Cross {
  pub fn new( point_rate: usize, scale: f64, rotations_per_second: f64 ) -> Self {
    Self{
      buf: Vec::new(),
      color: ( 0, u16::MAX, 0 ),
      frame_points: 500,
      page: Page::default(),
      point_rate,
      rotations_per_second,
      scale
    }
  }

  pub fn color( mut self, r: u16, g: u16, b: u16 ) -> Self {
    self.color = ( r, g, b );
    self
  }

  /// The number of points rendered per frame, when the engine allows it.
  pub fn frame_points( mut self, points: usize ) -> Self {
    self.frame_points = points;
    self
  }

  pub fn page( &self ) -> Page {
    self.page
  }
}

impl PointSource for Cross {
  fn next_frame( &mut self, max_len: usize ) -> Vec<Point> {
    let len = self.frame_points.min( max_len );
    let ( r, g, b ) = self.color;

    self.buf.resize( len, na::Point3::origin() );
    self.page = generate( &mut self.buf, self.page, self.point_rate, self.scale, self.rotations_per_second );

    self.buf.iter()
      .map(| point |{ Point::new( to_deflection( point.x ), to_deflection( point.y ), r, g, b ) })
      .collect()
  }
}
