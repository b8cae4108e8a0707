pub mod generators;
pub mod page;
