use crate::math::RealNumber;
use crate::stats::IterationRecord;

/// End-of-iteration notification. Observers receive a read-only snapshot
/// after the statistics record is logged; they must not feed anything
/// back into the solve, which keeps runs deterministic under observation.
pub trait IterationObserver<T: RealNumber> {
    fn end_of_iteration(&mut self, record: &IterationRecord<T>);
}

/// Collects snapshots verbatim. Handy in tests and for callers that want
/// the full trace without wiring their own observer.
#[derive(Debug)]
pub struct RecordingObserver<T: RealNumber> {
    pub records: Vec<IterationRecord<T>>,
}

impl<T> Default for RecordingObserver<T>
where
    T: RealNumber,
{
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T> IterationObserver<T> for RecordingObserver<T>
where
    T: RealNumber,
{
    fn end_of_iteration(&mut self, record: &IterationRecord<T>) {
        self.records.push(record.clone());
    }
}
