use std::collections::HashMap;
use std::hash::Hash;

/// Partition items into buckets by key. Buckets come out in the order their
/// key was first seen, items keep their relative order inside a bucket.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = vec![];

    for item in items {
        let k = key(&item);
        match positions.get(&k) {
            Some(&position) => groups[position].1.push(item),
            None => {
                positions.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}
