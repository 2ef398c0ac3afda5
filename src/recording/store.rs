use std::slice::Iter;

use super::Sample;

/// Ordered, append-only list of the samples captured during a session.
///
/// Anyone can read it; only the [`super::SessionController`] can append to or clear it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleStore {
    samples: Vec<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Samples appended after the first `cursor` ones. Lets a live view pick up only what is new
    /// since its last refresh.
    pub fn since(&self, cursor: usize) -> &[Sample] {
        self.samples.get(cursor..).unwrap_or(&[])
    }

    pub(crate) fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub(crate) fn clear(&mut self) {
        self.samples.clear();
    }
}
