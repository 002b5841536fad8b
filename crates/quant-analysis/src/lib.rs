pub mod momentum;
pub mod ranker;
pub mod universe;

pub use momentum::{momentum, MomentumReading, DEFAULT_LOOKBACK};
pub use ranker::{FactorRankingModel, FactorWeights};
pub use universe::{assemble, FactorFundamentals};
