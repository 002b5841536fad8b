pub mod indicators;
pub mod patterns;
pub mod analyzer;
pub mod trinity;
pub mod scanner;
pub mod exits;
pub mod sectors;

#[cfg(test)]
mod test_support;

pub use indicators::*;
pub use patterns::*;
pub use analyzer::*;
pub use trinity::*;
pub use scanner::*;
pub use exits::*;
pub use sectors::*;
