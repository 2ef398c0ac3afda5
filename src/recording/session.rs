use super::{Sample, SampleStore};

/// One recording interval: when it started and what it captured.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    /// Seconds since the Unix epoch at which recording started. Only used for display offsets.
    pub started_at: f64,
    pub(crate) samples: SampleStore,
}

impl Session {
    pub(crate) fn new(started_at: f64) -> Self {
        Self {
            started_at,
            samples: SampleStore::new(),
        }
    }

    pub fn samples(&self) -> &SampleStore {
        &self.samples
    }

    /// Chart coordinates for each sample: seconds since the session started, speed.
    pub fn chart_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.samples
            .iter()
            .map(|sample| self.chart_point(sample))
    }

    pub fn chart_point(&self, sample: &Sample) -> (f64, f64) {
        (sample.timestamp_s - self.started_at, sample.speed_mps)
    }

    /// One live readout line: timestamp, signed offset from the session start, speed.
    pub fn reading_line(&self, sample: &Sample) -> String {
        let (offset_s, speed_mps) = self.chart_point(sample);
        format!(
            "{:.2}  {:+.1}s  {} m/s",
            sample.timestamp_s, offset_s, speed_mps
        )
    }

    /// Time covered by the captured samples, zero for fewer than two samples
    pub fn duration_s(&self) -> f64 {
        match (self.samples.iter().next(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp_s - first.timestamp_s,
            _ => 0.,
        }
    }
}
