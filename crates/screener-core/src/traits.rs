/// Text sentiment collaborator.
///
/// Implementations return a compound score in `[-1.0, 1.0]` for a piece of
/// text (a headline, a commentary snippet). The engine treats the scorer as a
/// black box and only ever sees the resulting numbers.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;

    /// Name used in logs.
    fn name(&self) -> &str {
        "sentiment"
    }
}
