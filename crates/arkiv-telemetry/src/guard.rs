//! Guards framing long-running units of work.

use std::time::Instant;

use tracing::span::EnteredSpan;

/// Logs the start and completion of a unit of work inside its span.
///
/// The span stays entered until the guard is dropped, so every event logged
/// by the unit carries the span's fields.
pub struct RunGuard {
    unit: &'static str,
    started: Instant,
    /// Held to keep the span active until the guard is dropped.
    #[allow(dead_code)]
    span: EnteredSpan,
}

impl std::fmt::Debug for RunGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunGuard")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

impl RunGuard {
    /// Enter `span` and log the start of `unit`.
    #[must_use]
    pub fn enter(unit: &'static str, span: tracing::Span) -> Self {
        let span = span.entered();
        tracing::debug!(unit, "run started");
        Self {
            unit,
            started: Instant::now(),
            span,
        }
    }

    /// Milliseconds since the run started.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        tracing::debug!(unit = self.unit, elapsed_ms = self.elapsed_ms(), "run completed");
    }
}
