//! Step tracing and timing shared by the orchestrators.

use std::time::Instant;

use crate::error::SagaError;

/// One execution of a saga.
pub(crate) struct SagaRun {
    saga: &'static str,
    started: Instant,
}

impl SagaRun {
    pub(crate) fn start(saga: &'static str) -> Self {
        tracing::debug!(saga, "saga started");
        Self {
            saga,
            started: Instant::now(),
        }
    }

    pub(crate) fn step(&self, step: &'static str) {
        tracing::info!(saga = self.saga, step, "saga step started");
    }

    /// Logs `err` against `step` and hands it back for `?`.
    pub(crate) fn fail(&self, step: &'static str, err: SagaError) -> SagaError {
        match &err {
            SagaError::ServiceUnavailable { .. }
            | SagaError::UpstreamInvalid { .. }
            | SagaError::PeerRejected { .. }
            | SagaError::Persistence(_)
            | SagaError::Internal(_) => {
                tracing::error!(saga = self.saga, step, error = %err, "saga step failed")
            }
            _ => tracing::warn!(saga = self.saga, step, error = %err, "saga rejected"),
        }
        err
    }

    pub(crate) fn finish(self, outcome: &'static str) {
        let duration = self.started.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds", "saga" => self.saga).record(duration);
        tracing::info!(saga = self.saga, outcome, duration, "saga finished");
    }
}
