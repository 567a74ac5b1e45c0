use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::merge::MergeStrategy;
use crate::shared::ValidationErrors;
use crate::shared::document::{FromDocument, Section, field_path, join};

/// Reserved node pool name holding the fallback entry of an [`OverrideTable`].
pub const DEFAULT_NODE_POOL: &str = "__default__";

/// Per node pool overrides of one configuration domain.
///
/// Keys are node pool names known only when tasks are built, plus the reserved
/// [`DEFAULT_NODE_POOL`] entry. Entries are stored exactly as written in the document; combining
/// the default with a pool specific entry happens in [`OverrideTable::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OverrideTable<V> {
    entries: BTreeMap<String, V>,
}

impl<V> OverrideTable<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the [`DEFAULT_NODE_POOL`] entry, if configured.
    pub fn default_entry(&self) -> Option<&V> {
        self.entries.get(DEFAULT_NODE_POOL)
    }

    /// Returns the entry written for exactly `node_pool`, without falling back to the default.
    pub fn get(&self, node_pool: &str) -> Option<&V> {
        self.entries.get(node_pool)
    }

    /// Iterates over every pool name with an entry, including [`DEFAULT_NODE_POOL`].
    pub fn node_pools(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves the value for `node_pool` by handing the default and the pool specific entry to
    /// `strategy`.
    ///
    /// Resolving [`DEFAULT_NODE_POOL`] itself passes the default entry as both arguments.
    pub fn resolve<S>(&self, node_pool: &str, strategy: &S) -> S::Output
    where
        S: MergeStrategy<V>,
    {
        strategy.merge(self.default_entry(), self.get(node_pool))
    }
}

impl<V> Default for OverrideTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for OverrideTable<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V> FromDocument for OverrideTable<V>
where
    V: FromDocument,
{
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;
        let before = errors.len();

        let mut entries = BTreeMap::new();
        for (node_pool, entry) in section.entries() {
            if node_pool.trim().is_empty() {
                errors.invalid_value(
                    field_path(section.path()),
                    "node pool name must not be empty",
                );
                continue;
            }

            let entry_path = join(section.path(), node_pool);

            if let Some(entry) = V::parse(entry, &entry_path, errors) {
                entries.insert(node_pool.clone(), entry);
            }
        }

        (errors.len() == before).then_some(Self { entries })
    }
}
