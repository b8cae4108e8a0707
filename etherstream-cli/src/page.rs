/// Where a generator left off: the time of the shape pass in progress and the
/// index of the next shape point to draw.
#[derive( Clone, Copy, Debug, PartialEq )]
pub struct Page {
  pub time: f64,
  pub offset: usize
}

impl Default for Page {
  fn default() -> Self {
    Self{ time: 0.0, offset: 0 }
  }
}
