pub mod fixtures;
pub mod utils;

pub use fixtures::*;
pub use utils::*;
