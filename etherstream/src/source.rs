use crate::record::Point;

/// Produces the frames the engine streams to the DAC.
///
/// The engine calls `next_frame` synchronously between protocol round trips
/// and always keeps one rendered frame in hand, so a source may take a little
/// time to render without starving the DAC. A frame longer than `max_len` is
/// truncated by the engine.
pub trait PointSource {
  fn next_frame( &mut self, max_len: usize ) -> Vec<Point>;
}

impl<F> PointSource for F
  where F: FnMut( usize ) -> Vec<Point>
{
  fn next_frame( &mut self, max_len: usize ) -> Vec<Point> {
    self( max_len )
  }
}
