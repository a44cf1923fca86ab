pub mod analysis;
pub mod builder;
pub mod executor;
pub mod scorer;

pub use analysis::{QueryAnalysis, clean_repetitions};
pub use builder::{CompoundQuery, Occur, QueryStrategyBuilder, StrategyKind, TermStrategy};
pub use executor::QueryExecutor;
pub use scorer::{CoefficientTable, PayloadAccumulator};
