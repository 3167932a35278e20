mod bars;
pub use bars::*;
pub mod batch;
pub mod names;
pub mod persist;
pub mod scanner;
pub mod splitter;
pub mod structs;

#[cfg(test)]
mod test_util;
