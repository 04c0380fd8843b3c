use thiserror::Error;

use crate::vocabulary::TagId;

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    /// `finalize` was reached before any user produced a value.
    #[error("cannot compute a mean over zero evaluated users")]
    EmptyAggregate,
    #[error("tag index {index} is outside a vocabulary of {domain_size} tags")]
    IndexOutOfDomain { index: TagId, domain_size: usize },
    #[error("cannot combine tag vectors over {left} and {right} tags")]
    DomainMismatch { left: usize, right: usize },
}
