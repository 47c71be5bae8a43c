use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use crate::{partition::DEFAULT_LANGUAGE, walker::DiscoveredPage};

/// Wiki-style reference to one page variant: partition, space, page
/// name, and language.
///
/// The textual form is `Space.Name` for default-language pages and
/// `Space.Name.lang` for translations. It is what the index stores as
/// the upsert key and what search hits report back, so two translations
/// of the same page are distinct references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub partition: String,
    pub space: String,
    pub name: String,
    pub language: String,
}

impl PageRef {
    pub fn new(
        partition: impl Into<String>,
        space: impl Into<String>,
        name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            space: space.into(),
            name: name.into(),
            language: language.into(),
        }
    }

    /// Reference for a discovered page file within a partition.
    pub fn from_page(partition: &str, page: &DiscoveredPage) -> Self {
        Self::new(partition, &page.space, &page.name, &page.language)
    }

    /// `Space.Name`, with the language code appended for translations.
    pub fn full_name(&self) -> String {
        if self.language == DEFAULT_LANGUAGE {
            format!("{}.{}", self.space, self.name)
        } else {
            format!("{}.{}.{}", self.space, self.name, self.language)
        }
    }

    /// Stable numeric id for fast-field storage, hashed over every
    /// coordinate so translations of one page stay distinct.
    pub fn numeric_id(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.partition.hash(&mut hasher);
        self.space.hash(&mut hasher);
        self.name.hash(&mut hasher);
        self.language.hash(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Display for PageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.partition, self.full_name())
    }
}
