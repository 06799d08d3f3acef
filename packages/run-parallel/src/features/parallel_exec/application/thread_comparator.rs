//! Cross-worker value comparison
//!
//! Every worker of a parallel run calls [`ThreadComparator::compare`] with the
//! value it computed. Once all have arrived, the round's leader checks every
//! value against the first one deposited and every worker receives the same
//! verdict. Rounds may repeat, one per `compare` call.

use std::fmt::Debug;

use parking_lot::Mutex;
use thiserror::Error;

use crate::features::parallel_exec::domain::TestSignal;
use crate::features::parallel_exec::infrastructure::Barrier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("values differ across threads: {first} != {other}")]
    Mismatch { first: String, other: String },

    #[error("comparison aborted before every thread arrived")]
    Aborted,
}

impl From<ComparisonError> for TestSignal {
    fn from(err: ComparisonError) -> Self {
        TestSignal::Failure(err.to_string())
    }
}

pub struct ThreadComparator<T> {
    values: Mutex<Vec<T>>,
    verdict: Mutex<Result<(), ComparisonError>>,
    collected: Barrier,
    published: Barrier,
}

impl<T> ThreadComparator<T>
where
    T: PartialEq + Debug + Clone + Send,
{
    /// Comparator for `workers` participants
    pub fn new(workers: usize) -> Self {
        Self {
            values: Mutex::new(Vec::with_capacity(workers)),
            verdict: Mutex::new(Ok(())),
            collected: Barrier::new(workers),
            published: Barrier::new(workers),
        }
    }

    pub fn workers(&self) -> usize {
        self.collected.parties()
    }

    /// Deposit `value` and wait for the round's verdict
    pub fn compare(&self, value: T) -> Result<(), ComparisonError> {
        self.values.lock().push(value);

        let arrival = self
            .collected
            .wait()
            .map_err(|_| ComparisonError::Aborted)?;
        if arrival.is_leader() {
            let values = std::mem::take(&mut *self.values.lock());
            *self.verdict.lock() = check_equal(&values);
        }

        self.published
            .wait()
            .map_err(|_| ComparisonError::Aborted)?;
        self.verdict.lock().clone()
    }

    /// Release every waiting worker with [`ComparisonError::Aborted`]
    pub fn abort(&self) {
        self.collected.abort();
        self.published.abort();
    }
}

fn check_equal<T: PartialEq + Debug>(values: &[T]) -> Result<(), ComparisonError> {
    let Some((first, rest)) = values.split_first() else {
        return Ok(());
    };
    match rest.iter().find(|value| *value != first) {
        Some(other) => Err(ComparisonError::Mismatch {
            first: format!("{:?}", first),
            other: format!("{:?}", other),
        }),
        None => Ok(()),
    }
}
