use metrics::Counter;
use metrics_derive::Metrics;

/// The metrics for the [`super::AggSender`].
#[derive(Metrics, Clone)]
#[metrics(scope = "aggsender")]
pub struct AggsenderMetrics {
    /// A counter on the certificates submitted.
    pub certificates_sent: Counter,
    /// A counter on the certificates settled.
    pub certificates_settled: Counter,
    /// A counter on the certificates reported in error.
    pub certificates_in_error: Counter,
    /// A counter on the submission failures.
    pub send_errors: Counter,
}
