//! Rules combining the default entry of an override table with a node pool specific one.
//!
//! Each domain needs a different rule: resource requests are additive key/value bags where a
//! partial override makes sense, while toleration lists and retry policies are coherent values
//! that must never be mixed field by field.

use std::collections::BTreeMap;

/// Combines the `default` and `specific` entries of an override table.
///
/// Strategies are stateless and pure. The output type encodes what "nothing configured" means
/// for the domain: an empty collection or `None`.
pub trait MergeStrategy<V> {
    type Output;

    fn merge(&self, default: Option<&V>, specific: Option<&V>) -> Self::Output;
}

/// Field level union: starts from the default pairs and overlays every specific pair.
///
/// Yields an empty map when neither entry exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMerge;

impl<K, T> MergeStrategy<BTreeMap<K, T>> for FieldMerge
where
    K: Ord + Clone,
    T: Clone,
{
    type Output = BTreeMap<K, T>;

    fn merge(
        &self,
        default: Option<&BTreeMap<K, T>>,
        specific: Option<&BTreeMap<K, T>>,
    ) -> Self::Output {
        let mut merged = default.cloned().unwrap_or_default();
        if let Some(specific) = specific {
            merged.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        merged
    }
}

/// The specific sequence wins whenever it exists, even when empty; otherwise the default one.
///
/// Sequences are never concatenated. Yields an empty sequence when neither entry exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceOrDefault;

impl<T> MergeStrategy<Vec<T>> for ReplaceOrDefault
where
    T: Clone,
{
    type Output = Vec<T>;

    fn merge(&self, default: Option<&Vec<T>>, specific: Option<&Vec<T>>) -> Self::Output {
        specific.or(default).cloned().unwrap_or_default()
    }
}

/// The specific record wins as a whole whenever it exists; otherwise the default one.
///
/// Yields `None` when neither entry exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeRecordOrDefault;

impl<V> MergeStrategy<V> for WholeRecordOrDefault
where
    V: Clone,
{
    type Output = Option<V>;

    fn merge(&self, default: Option<&V>, specific: Option<&V>) -> Self::Output {
        specific.or(default).cloned()
    }
}
