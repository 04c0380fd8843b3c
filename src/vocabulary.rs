use hashbrown::HashMap;

use crate::sparse_vector::SparseTagVector;

pub type TagId = usize;

/// The controlled set of tags recognised by the metric.
///
/// Every tag gets a stable index in `0..len()`, assigned in the order the tags were
/// first seen during construction. Matching is exact: `"Action"` and `"action"` are
/// different tags.
#[derive(Clone, Debug, Default)]
pub struct TagVocabulary {
    tag_to_id: HashMap<String, TagId>,
    id_to_tag: Vec<String>,
}

impl TagVocabulary {
    pub fn new<I, S>(tags: I) -> TagVocabulary
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = TagVocabulary::default();
        for tag in tags {
            let tag = tag.into();
            if tag.trim().is_empty() || vocabulary.tag_to_id.contains_key(&tag) {
                continue;
            }
            vocabulary.tag_to_id.insert(tag.clone(), vocabulary.id_to_tag.len());
            vocabulary.id_to_tag.push(tag);
        }
        vocabulary
    }

    pub fn len(&self) -> usize {
        self.id_to_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_tag.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_to_id.contains_key(tag)
    }

    pub fn tag_id(&self, tag: &str) -> Option<TagId> {
        self.tag_to_id.get(tag).copied()
    }

    pub fn tag(&self, tag_id: TagId) -> Option<&str> {
        self.id_to_tag.get(tag_id).map(String::as_str)
    }

    /// A zero-valued vector over this vocabulary's index space.
    pub fn new_tag_vector(&self) -> SparseTagVector {
        SparseTagVector::zeros(self.len())
    }
}
