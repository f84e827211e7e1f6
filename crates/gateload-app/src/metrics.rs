//! Append-only metric sink shared by every virtual user.

use gateload_types::{Metric, MetricSample, Tags};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MetricsSink {
    samples: Arc<Mutex<Vec<MetricSample>>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, metric: Metric, value: f64, tags: Tags) {
        self.samples.lock().push(MetricSample {
            metric,
            value,
            tags,
        });
    }

    /// Moves a VU's buffered samples in under a single lock.
    pub fn extend(&self, batch: &mut Vec<MetricSample>) {
        if batch.is_empty() {
            return;
        }
        self.samples.lock().append(batch);
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes everything recorded so far, leaving the sink empty.
    pub fn drain(&self) -> Vec<MetricSample> {
        std::mem::take(&mut *self.samples.lock())
    }
}

impl std::fmt::Debug for MetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSink")
            .field("samples", &self.len())
            .finish()
    }
}
