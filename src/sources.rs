use hashbrown::{HashMap, HashSet};
use itertools::Itertools;

use crate::io::{self, ItemId, Score, UserId};

/// One entry of a recommendation list. Only the id matters for tag entropy.
#[derive(Clone, PartialEq, Debug)]
pub struct ScoredItem {
    pub id: ItemId,
    pub score: Score,
}

impl ScoredItem {
    pub fn new(id: ItemId, score: Score) -> Self {
        ScoredItem { id, score }
    }
}

/// Looks up the free-text tags of an item.
pub trait ItemTagSource: Sync {
    /// Tags may repeat; an item without tags yields an empty list.
    fn item_tags(&self, item_id: ItemId) -> anyhow::Result<Vec<String>>;
}

/// Produces the top-N list of the recommender under evaluation.
pub trait RecommendationSource: Sync {
    /// At most `how_many` items in rank order, never containing the user's training
    /// items. `Ok(None)` means no list could be produced for this user.
    fn recommend(&self, user_id: UserId, how_many: usize)
        -> anyhow::Result<Option<Vec<ScoredItem>>>;
}

pub struct InMemoryItemTags {
    item_to_tags: HashMap<ItemId, Vec<String>>,
}

impl InMemoryItemTags {
    pub fn new(item_to_tags: HashMap<ItemId, Vec<String>>) -> Self {
        InMemoryItemTags { item_to_tags }
    }

    pub fn from_file(item_tags_path: &str) -> anyhow::Result<Self> {
        Ok(InMemoryItemTags::new(io::read_item_tags(item_tags_path)?))
    }
}

impl ItemTagSource for InMemoryItemTags {
    fn item_tags(&self, item_id: ItemId) -> anyhow::Result<Vec<String>> {
        Ok(self
            .item_to_tags
            .get(&item_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Recommendation lists computed offline by the recommender under test.
pub struct PrecomputedRecommendations {
    user_to_recommendations: HashMap<UserId, Vec<ScoredItem>>,
    user_to_training_items: HashMap<UserId, HashSet<ItemId>>,
}

impl PrecomputedRecommendations {
    pub fn new(
        user_to_recommendations: HashMap<UserId, Vec<ScoredItem>>,
        user_to_training_items: HashMap<UserId, HashSet<ItemId>>,
    ) -> Self {
        PrecomputedRecommendations {
            user_to_recommendations,
            user_to_training_items,
        }
    }

    pub fn from_files(
        recommendations_path: &str,
        training_data_path: Option<&str>,
    ) -> anyhow::Result<Self> {
        let user_to_recommendations = io::read_recommendations(recommendations_path)?;
        let user_to_training_items = match training_data_path {
            Some(path) => io::read_training_data(path)?,
            None => HashMap::new(),
        };
        Ok(PrecomputedRecommendations::new(
            user_to_recommendations,
            user_to_training_items,
        ))
    }

    /// Every user that has a recommendation list or training items, ascending.
    pub fn users(&self) -> Vec<UserId> {
        let mut users = self
            .user_to_recommendations
            .keys()
            .chain(self.user_to_training_items.keys())
            .copied()
            .collect_vec();
        users.sort_unstable();
        users.dedup();
        users
    }
}

impl RecommendationSource for PrecomputedRecommendations {
    fn recommend(
        &self,
        user_id: UserId,
        how_many: usize,
    ) -> anyhow::Result<Option<Vec<ScoredItem>>> {
        let recommendations = match self.user_to_recommendations.get(&user_id) {
            Some(recommendations) => recommendations,
            None => return Ok(None),
        };
        let training_items = self.user_to_training_items.get(&user_id);
        let top_recos = recommendations
            .iter()
            .filter(|scored| training_items.map_or(true, |items| !items.contains(&scored.id)))
            .take(how_many)
            .cloned()
            .collect();
        Ok(Some(top_recos))
    }
}
