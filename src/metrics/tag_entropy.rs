use hashbrown::HashSet;
use itertools::Itertools;
use log::{debug, info, trace};

use crate::error::MetricError;
use crate::metrics::{EvaluationRun, TestUser, UserMetric, UserMetricAccumulator};
use crate::sources::{ItemTagSource, ScoredItem};
use crate::vocabulary::{TagId, TagVocabulary};

/// Entropy of a list without any distinct item. Nothing was recommended, so nothing
/// can be diverse.
pub const EMPTY_LIST_ENTROPY: f64 = 0.0;

/// Tag entropy of one recommendation list.
///
/// Items are visited in rank order, skipping repeated ids, and each item's tags in
/// the order the tag source returns them, skipping repeats. A vocabulary tag is
/// attributed to the first item that carries it only. With `L` distinct items and
/// `S` distinct tags on the attributing item, the tag contributes `-p log2 p` with
/// `p = 1/S * 1/L`. `S` counts every distinct tag of the item, in the vocabulary
/// or not.
///
/// Returns `Ok(None)` when no list is available. Errors of the tag source are
/// passed through unchanged.
pub fn tag_entropy<T>(
    recommendations: Option<&[ScoredItem]>,
    vocabulary: &TagVocabulary,
    item_tags: &T,
) -> anyhow::Result<Option<f64>>
where
    T: ItemTagSource + ?Sized,
{
    let recommendations = match recommendations {
        Some(recommendations) => recommendations,
        None => return Ok(None),
    };

    let distinct_items = recommendations
        .iter()
        .map(|scored| scored.id)
        .unique()
        .collect_vec();
    if distinct_items.is_empty() {
        return Ok(Some(EMPTY_LIST_ENTROPY));
    }
    let list_size = distinct_items.len() as f64;

    let mut entropy_vec = vocabulary.new_tag_vector();
    let mut seen: HashSet<TagId> = HashSet::new();
    for item_id in distinct_items {
        let tags = item_tags.item_tags(item_id)?.into_iter().unique().collect_vec();
        if tags.is_empty() {
            trace!("item {} has no tags", item_id);
            continue;
        }
        let size = tags.len() as f64;

        let mut work = vocabulary.new_tag_vector();
        for tag in tags.iter() {
            let tag_id = match vocabulary.tag_id(tag) {
                Some(tag_id) => tag_id,
                None => continue,
            };
            if !seen.insert(tag_id) {
                continue;
            }
            let p = (1.0 / size) * (1.0 / list_size);
            trace!("item {} contributes tag '{}' with p={}", item_id, tag, p);
            work.set(tag_id, -p * p.log2())?;
        }
        entropy_vec.add(&work)?;
    }

    Ok(Some(entropy_vec.sum()))
}

/// Running mean over the users that produced a value.
#[derive(Debug, Default)]
pub struct TagEntropyAggregator {
    total_entropy: f64,
    user_count: usize,
}

impl TagEntropyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unavailable results change neither the total nor the count.
    pub fn accumulate(&mut self, entropy: Option<f64>) {
        if let Some(entropy) = entropy {
            self.total_entropy += entropy;
            self.user_count += 1;
        }
    }

    pub fn total(&self) -> f64 {
        self.total_entropy
    }

    pub fn count(&self) -> usize {
        self.user_count
    }

    pub fn finalize(&self) -> Result<f64, MetricError> {
        if self.user_count == 0 {
            return Err(MetricError::EmptyAggregate);
        }
        Ok(self.total_entropy / self.user_count as f64)
    }
}

pub struct TagEntropyMetric {
    list_size: usize,
    columns: Vec<String>,
}

impl TagEntropyMetric {
    /// `list_size` is the number of recommendations requested per user.
    pub fn new(list_size: usize) -> TagEntropyMetric {
        TagEntropyMetric {
            list_size,
            columns: vec![format!("TagEntropy@{}", list_size)],
        }
    }

    pub fn list_size(&self) -> usize {
        self.list_size
    }

    /// Requests the user's top-N list and measures it, without accumulating.
    pub fn evaluate_user(&self, test_user: &TestUser) -> anyhow::Result<Option<f64>> {
        let recommendations = test_user
            .recommender
            .recommend(test_user.user_id, self.list_size)?;
        let entropy = tag_entropy(
            recommendations.as_deref(),
            test_user.vocabulary,
            test_user.item_tags,
        )?;
        debug!("user {} tag entropy {:?}", test_user.user_id, entropy);
        Ok(entropy)
    }
}

impl UserMetric for TagEntropyMetric {
    type Accumulator = TagEntropyAccumulator;

    fn make_accumulator(&self, run: &EvaluationRun) -> TagEntropyAccumulator {
        info!(
            "{} accumulator for algorithm '{}' on data set '{}'",
            self.columns[0], run.algorithm, run.dataset
        );
        TagEntropyAccumulator {
            metric: TagEntropyMetric::new(self.list_size),
            aggregator: TagEntropyAggregator::new(),
        }
    }

    fn column_labels(&self) -> Vec<String> {
        self.columns.clone()
    }

    // per-user and global share the column, they only differ in aggregation
    fn user_column_labels(&self) -> Vec<String> {
        self.columns.clone()
    }
}

pub struct TagEntropyAccumulator {
    metric: TagEntropyMetric,
    aggregator: TagEntropyAggregator,
}

impl TagEntropyAccumulator {
    /// Folds an already computed per-user result into the aggregate and returns the
    /// per-user row.
    pub fn accumulate(&mut self, entropy: Option<f64>) -> Vec<Option<f64>> {
        self.aggregator.accumulate(entropy);
        vec![entropy]
    }

    pub fn aggregator(&self) -> &TagEntropyAggregator {
        &self.aggregator
    }
}

impl UserMetricAccumulator for TagEntropyAccumulator {
    fn evaluate(&mut self, test_user: &TestUser) -> anyhow::Result<Vec<Option<f64>>> {
        let entropy = self.metric.evaluate_user(test_user)?;
        Ok(self.accumulate(entropy))
    }

    fn final_results(&self) -> anyhow::Result<Vec<f64>> {
        Ok(vec![self.aggregator.finalize()?])
    }
}

#[cfg(test)]
mod tag_entropy_test {
    use super::*;
    use crate::io::{ItemId, UserId};
    use crate::sources::{InMemoryItemTags, RecommendationSource};
    use anyhow::anyhow;
    use float_cmp::approx_eq;
    use hashbrown::HashMap;

    fn term(p: f64) -> f64 {
        -p * p.log2()
    }

    fn item_tags(items: Vec<(ItemId, Vec<&str>)>) -> InMemoryItemTags {
        let item_to_tags: HashMap<ItemId, Vec<String>> = items
            .into_iter()
            .map(|(item_id, tags)| (item_id, tags.into_iter().map(String::from).collect()))
            .collect();
        InMemoryItemTags::new(item_to_tags)
    }

    fn recos(item_ids: &[ItemId]) -> Vec<ScoredItem> {
        item_ids
            .iter()
            .enumerate()
            .map(|(rank, item_id)| ScoredItem::new(*item_id, 1.0 / (rank as f64 + 1.0)))
            .collect()
    }

    struct FailingTags;

    impl ItemTagSource for FailingTags {
        fn item_tags(&self, item_id: ItemId) -> anyhow::Result<Vec<String>> {
            Err(anyhow!("tag store unreachable for item {}", item_id))
        }
    }

    struct FixedRecommendations(HashMap<UserId, Vec<ScoredItem>>);

    impl RecommendationSource for FixedRecommendations {
        fn recommend(
            &self,
            user_id: UserId,
            how_many: usize,
        ) -> anyhow::Result<Option<Vec<ScoredItem>>> {
            Ok(self
                .0
                .get(&user_id)
                .map(|recommendations| recommendations.iter().take(how_many).cloned().collect()))
        }
    }

    #[test]
    fn should_attribute_shared_tag_to_first_item_only() {
        let vocabulary = TagVocabulary::new(vec!["action", "drama"]);
        let tags = item_tags(vec![(1, vec!["action", "comedy"]), (2, vec!["action", "drama"])]);
        let entropy = tag_entropy(Some(recos(&[1, 2]).as_slice()), &vocabulary, &tags)
            .unwrap()
            .unwrap();
        assert!(approx_eq!(f64, 1.0, entropy, ulps = 2));
    }

    #[test]
    fn should_count_single_shared_tag_once() {
        let vocabulary = TagVocabulary::new(vec!["noir"]);
        let tags = item_tags(vec![
            (1, vec!["noir"]),
            (2, vec!["noir"]),
            (3, vec!["noir"]),
            (4, vec!["noir"]),
        ]);
        let entropy = tag_entropy(Some(recos(&[1, 2, 3, 4]).as_slice()), &vocabulary, &tags)
            .unwrap()
            .unwrap();
        assert!(approx_eq!(f64, term(1.0 / 4.0), entropy, epsilon = 1e-12));
        assert!(approx_eq!(f64, 0.5, entropy, epsilon = 1e-12));
    }

    #[test]
    fn should_follow_rank_order_when_items_compete_for_a_tag() {
        let vocabulary = TagVocabulary::new(vec!["x", "y"]);
        let tags = item_tags(vec![(1, vec!["x"]), (2, vec!["x", "y", "z"])]);

        let first_narrow = tag_entropy(Some(recos(&[1, 2]).as_slice()), &vocabulary, &tags)
            .unwrap()
            .unwrap();
        let expected = term(1.0 / 2.0) + term(1.0 / 6.0);
        assert!(approx_eq!(f64, expected, first_narrow, epsilon = 1e-12));

        let first_broad = tag_entropy(Some(recos(&[2, 1]).as_slice()), &vocabulary, &tags)
            .unwrap()
            .unwrap();
        let expected = 2.0 * term(1.0 / 6.0);
        assert!(approx_eq!(f64, expected, first_broad, epsilon = 1e-12));
    }

    #[test]
    fn should_ignore_duplicate_recommendations() {
        let vocabulary = TagVocabulary::new(vec!["action", "drama", "war"]);
        let tags = item_tags(vec![
            (1, vec!["action", "war"]),
            (2, vec!["drama"]),
            (3, vec!["war", "drama"]),
        ]);
        let deduplicated =
            tag_entropy(Some(recos(&[1, 2, 3]).as_slice()), &vocabulary, &tags).unwrap();
        let with_duplicates = tag_entropy(
            Some(recos(&[1, 1, 2, 3, 2, 1]).as_slice()),
            &vocabulary,
            &tags,
        )
        .unwrap();
        assert_eq!(deduplicated, with_duplicates);
    }

    #[test]
    fn should_ignore_repeated_tags_of_an_item() {
        let vocabulary = TagVocabulary::new(vec!["action", "drama"]);
        let repeated = item_tags(vec![(1, vec!["action", "drama", "action"])]);
        let distinct = item_tags(vec![(1, vec!["action", "drama"])]);
        assert_eq!(
            tag_entropy(Some(recos(&[1]).as_slice()), &vocabulary, &distinct).unwrap(),
            tag_entropy(Some(recos(&[1]).as_slice()), &vocabulary, &repeated).unwrap()
        );
    }

    #[test]
    fn should_never_score_tags_outside_vocabulary() {
        let vocabulary = TagVocabulary::new(vec!["action", "drama"]);
        let tags = item_tags(vec![
            (1, vec!["action", "drama"]),
            (2, vec!["drama"]),
            (3, vec!["cult", "anime"]),
        ]);
        let entropy =
            tag_entropy(Some(recos(&[1, 2, 3]).as_slice()), &vocabulary, &tags).unwrap();

        // item 2 has nothing left to attribute, item 3 only unknown tags
        let more_tags = item_tags(vec![
            (1, vec!["action", "drama"]),
            (2, vec!["drama", "comedy"]),
            (3, vec!["cult", "anime", "classic"]),
        ]);
        let with_unknown =
            tag_entropy(Some(recos(&[1, 2, 3]).as_slice()), &vocabulary, &more_tags).unwrap();

        assert_eq!(entropy, with_unknown);
        assert!(approx_eq!(f64, 2.0 * term(1.0 / 6.0), entropy.unwrap(), epsilon = 1e-12));
    }

    #[test]
    fn should_be_unavailable_without_recommendations() {
        let vocabulary = TagVocabulary::new(vec!["action"]);
        let tags = item_tags(vec![]);
        assert_eq!(None, tag_entropy(None, &vocabulary, &tags).unwrap());
    }

    #[test]
    fn should_score_empty_list_as_zero() {
        let vocabulary = TagVocabulary::new(vec!["action"]);
        let tags = item_tags(vec![]);
        assert_eq!(
            Some(EMPTY_LIST_ENTROPY),
            tag_entropy(Some(Vec::new().as_slice()), &vocabulary, &tags).unwrap()
        );
    }

    #[test]
    fn should_score_item_without_tags_as_zero() {
        let vocabulary = TagVocabulary::new(vec!["action"]);
        let tags = item_tags(vec![(1, vec![])]);
        let entropy = tag_entropy(Some(recos(&[1]).as_slice()), &vocabulary, &tags).unwrap();
        assert_eq!(Some(0.0), entropy);

        let mut aggregator = TagEntropyAggregator::new();
        aggregator.accumulate(entropy);
        assert_eq!(Ok(0.0), aggregator.finalize());
    }

    #[test]
    fn should_never_be_negative() {
        let vocabulary = TagVocabulary::new((0..20).map(|tag| format!("t{}", tag)));
        let items: Vec<(ItemId, Vec<String>)> = (0..10)
            .map(|item_id| {
                let tags = (0..(item_id % 4 + 1))
                    .map(|offset| format!("t{}", (item_id * 3 + offset) % 20))
                    .collect();
                (item_id, tags)
            })
            .collect();
        let tags = InMemoryItemTags::new(items.into_iter().collect());
        for list_size in 1..10 {
            let item_ids = (0..list_size).collect_vec();
            let entropy = tag_entropy(Some(recos(&item_ids).as_slice()), &vocabulary, &tags)
                .unwrap()
                .unwrap();
            assert!(entropy >= 0.0);
        }
    }

    #[test]
    fn should_propagate_tag_source_errors() {
        let vocabulary = TagVocabulary::new(vec!["action"]);
        let err = tag_entropy(Some(recos(&[7]).as_slice()), &vocabulary, &FailingTags).unwrap_err();
        assert_eq!("tag store unreachable for item 7", err.to_string());
    }

    #[test]
    fn should_not_count_unavailable_users() {
        let mut undertest = TagEntropyAggregator::new();
        undertest.accumulate(Some(1.0));
        undertest.accumulate(None);
        undertest.accumulate(Some(0.5));
        assert_eq!(2, undertest.count());
        assert_eq!(1.5, undertest.total());
        assert_eq!(Ok(0.75), undertest.finalize());
    }

    #[test]
    fn should_fail_loudly_on_empty_aggregate() {
        let mut undertest = TagEntropyAggregator::new();
        undertest.accumulate(None);
        assert_eq!(Err(MetricError::EmptyAggregate), undertest.finalize());
    }

    #[test]
    fn should_label_columns_with_list_size() {
        let undertest = TagEntropyMetric::new(10);
        assert_eq!(vec!["TagEntropy@10".to_string()], undertest.column_labels());
        assert_eq!(undertest.column_labels(), undertest.user_column_labels());
        assert_eq!(10, undertest.list_size());
    }

    #[test]
    fn should_evaluate_users_through_fresh_accumulators() {
        let vocabulary = TagVocabulary::new(vec!["action", "drama"]);
        let tags = item_tags(vec![
            (1, vec!["action", "comedy"]),
            (2, vec!["action", "drama"]),
            (3, vec![]),
        ]);
        let mut lists = HashMap::new();
        lists.insert(100, recos(&[1, 2, 3]));
        lists.insert(200, recos(&[3]));
        let recommender = FixedRecommendations(lists);
        let test_user = |user_id| TestUser {
            user_id,
            recommender: &recommender,
            item_tags: &tags,
            vocabulary: &vocabulary,
        };

        let metric = TagEntropyMetric::new(2);
        let mut accumulator = metric.make_accumulator(&EvaluationRun::new("popular", "movielens"));
        // list truncated to items 1 and 2
        assert_eq!(vec![Some(1.0)], accumulator.evaluate(&test_user(100)).unwrap());
        assert_eq!(vec![Some(0.0)], accumulator.evaluate(&test_user(200)).unwrap());
        assert_eq!(vec![None], accumulator.evaluate(&test_user(300)).unwrap());
        assert_eq!(vec![0.5], accumulator.final_results().unwrap());

        let fresh = metric.make_accumulator(&EvaluationRun::new("popular", "lastfm"));
        assert_eq!(0, fresh.aggregator().count());
        assert!(fresh.final_results().is_err());
    }
}
