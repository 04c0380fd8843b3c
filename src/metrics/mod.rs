pub mod evaluation_reporter;
pub mod tag_entropy;

use crate::io::UserId;
use crate::sources::{ItemTagSource, RecommendationSource};
use crate::vocabulary::TagVocabulary;

/// Identifies one evaluation run: a single algorithm evaluated on a single data set.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationRun {
    pub algorithm: String,
    pub dataset: String,
}

impl EvaluationRun {
    pub fn new(algorithm: &str, dataset: &str) -> Self {
        EvaluationRun {
            algorithm: algorithm.to_string(),
            dataset: dataset.to_string(),
        }
    }
}

/// Everything a metric may look at for one test user.
#[derive(Clone, Copy)]
pub struct TestUser<'a> {
    pub user_id: UserId,
    pub recommender: &'a dyn RecommendationSource,
    pub item_tags: &'a dyn ItemTagSource,
    pub vocabulary: &'a TagVocabulary,
}

pub trait UserMetric {
    type Accumulator: UserMetricAccumulator;

    /// A fresh accumulator; one per evaluation run, never shared between runs.
    fn make_accumulator(&self, run: &EvaluationRun) -> Self::Accumulator;
    fn column_labels(&self) -> Vec<String>;
    fn user_column_labels(&self) -> Vec<String>;
}

pub trait UserMetricAccumulator {
    /// Measures one user and folds the result into the global statistic. Returns the
    /// per-user row; `None` cells mean no value.
    fn evaluate(&mut self, test_user: &TestUser) -> anyhow::Result<Vec<Option<f64>>>;
    fn final_results(&self) -> anyhow::Result<Vec<f64>>;
}
