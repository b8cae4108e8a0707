pub mod cross;

pub use cross::Cross;
