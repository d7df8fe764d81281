//! Ordered collections with membership decided by a policy's `equals`.

use crate::policy::ResourcePolicy;
use crate::record::Record;

pub fn contains<P>(policy: &P, items: &[Record], record: &Record) -> bool
where
    P: ResourcePolicy + ?Sized,
{
    items.iter().any(|item| policy.equals(item, record))
}

/// Keep the first record of each equality class.
pub fn dedup<P>(policy: &P, items: &[Record]) -> Vec<Record>
where
    P: ResourcePolicy + ?Sized,
{
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        add(policy, &mut result, item.clone());
    }
    result
}

/// Append `record` unless an equal one is already present.
pub fn add<P>(policy: &P, items: &mut Vec<Record>, record: Record)
where
    P: ResourcePolicy + ?Sized,
{
    if !contains(policy, items, &record) {
        items.push(record);
    }
}

/// Remove every record equal to `record`.
pub fn remove<P>(policy: &P, items: &mut Vec<Record>, record: &Record)
where
    P: ResourcePolicy + ?Sized,
{
    items.retain(|item| !policy.equals(item, record));
}

pub fn move_to<P>(policy: &P, record: Record, from: &mut Vec<Record>, to: &mut Vec<Record>)
where
    P: ResourcePolicy + ?Sized,
{
    remove(policy, from, &record);
    add(policy, to, record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FieldPolicy;
    use crate::record::{from_value, key};
    use serde_json::json;

    fn named(name: &str, id: u64) -> Record {
        from_value(json!({"name": name, "id": id})).unwrap()
    }

    fn ids(items: &[Record]) -> Vec<String> {
        items.iter().filter_map(|r| key(r, "id")).collect()
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let policy = FieldPolicy::new(["name"]);
        let items = vec![named("a", 1), named("b", 2), named("a", 3), named("c", 4), named("b", 5)];
        assert_eq!(ids(&dedup(&policy, &items)), ["1", "2", "4"]);
    }

    #[test]
    fn add_is_idempotent() {
        let policy = FieldPolicy::new(["name"]);
        let mut items = vec![named("a", 1)];
        add(&policy, &mut items, named("a", 2));
        add(&policy, &mut items, named("b", 3));
        assert_eq!(ids(&items), ["1", "3"]);
        assert!(contains(&policy, &items, &named("b", 99)));
        assert!(!contains(&policy, &items, &named("z", 1)));
    }

    #[test]
    fn remove_drops_every_equal_record() {
        let policy = FieldPolicy::new(["name"]);
        let mut items = vec![named("a", 1), named("b", 2), named("a", 3)];
        remove(&policy, &mut items, &named("a", 0));
        assert_eq!(ids(&items), ["2"]);

        remove(&policy, &mut items, &named("missing", 0));
        assert_eq!(ids(&items), ["2"]);
    }

    #[test]
    fn move_between_collections() {
        let policy = FieldPolicy::new(["name"]);
        let mut from = vec![named("a", 1), named("b", 2)];
        let mut to = vec![];

        move_to(&policy, named("a", 1), &mut from, &mut to);
        assert_eq!(ids(&from), ["2"]);
        assert_eq!(ids(&to), ["1"]);

        // absent from the source, still added to the target
        move_to(&policy, named("c", 3), &mut from, &mut to);
        assert_eq!(ids(&from), ["2"]);
        assert_eq!(ids(&to), ["1", "3"]);
    }
}
