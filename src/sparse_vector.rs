use std::collections::BTreeMap;

use crate::error::MetricError;
use crate::vocabulary::TagId;

/// Sparse vector of reals keyed by tag index. Unset indices read as 0.
///
/// The addressable keys are exactly `0..domain_size`, the index space of the
/// vocabulary that created the vector. Entries are kept sorted by index, so `sum`
/// adds them in the same order on every run.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseTagVector {
    domain_size: usize,
    entries: BTreeMap<TagId, f64>,
}

impl SparseTagVector {
    pub(crate) fn zeros(domain_size: usize) -> SparseTagVector {
        SparseTagVector {
            domain_size,
            entries: BTreeMap::new(),
        }
    }

    pub fn domain_size(&self) -> usize {
        self.domain_size
    }

    /// Number of explicitly set keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: TagId) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, index: TagId, value: f64) -> Result<(), MetricError> {
        if index >= self.domain_size {
            return Err(MetricError::IndexOutOfDomain {
                index,
                domain_size: self.domain_size,
            });
        }
        self.entries.insert(index, value);
        Ok(())
    }

    /// Explicitly set every index of the domain to `value`.
    pub fn fill(&mut self, value: f64) {
        for index in 0..self.domain_size {
            self.entries.insert(index, value);
        }
    }

    /// Element-wise addition over the union of set keys.
    pub fn add(&mut self, other: &SparseTagVector) -> Result<(), MetricError> {
        if self.domain_size != other.domain_size {
            return Err(MetricError::DomainMismatch {
                left: self.domain_size,
                right: other.domain_size,
            });
        }
        for (index, value) in other.entries.iter() {
            *self.entries.entry(*index).or_insert(0.0) += *value;
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        // start from +0.0 so that zero entries never sum to -0.0
        self.entries.values().fold(0.0, |total, value| total + value)
    }
}
