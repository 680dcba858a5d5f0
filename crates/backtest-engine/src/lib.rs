pub mod evaluator;
pub mod models;
pub mod stats;


pub use evaluator::BacktestEvaluator;
pub use models::*;
