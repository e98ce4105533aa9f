//! Cache key scheme.
//!
//! ```text
//! entity:{kind}:{id}
//! list:{kind}:{owner}:{canonical filters}
//! stats:{kind}:{owner}
//! ```
//!
//! IDs and owner scopes are percent-encoded so a `:` inside them can never
//! make one owner's prefix match another owner's keys.

use url::form_urlencoded::byte_serialize;

use crate::domain::entity::{EntityKind, QueryFilters};
use crate::domain::foundation::{EntityId, OwnerScope};

fn encode(segment: &str) -> String {
    byte_serialize(segment.as_bytes()).collect()
}

pub fn entity_key(kind: EntityKind, id: &EntityId) -> String {
    format!("entity:{}:{}", kind, encode(&id.to_string()))
}

pub fn list_key(kind: EntityKind, owner: &OwnerScope, filters: &QueryFilters) -> String {
    format!("{}{}", owner_list_prefix(kind, owner), filters.canonical())
}

pub fn stats_key(kind: EntityKind, owner: &OwnerScope) -> String {
    format!("stats:{}:{}", kind, encode(owner.as_str()))
}

/// Every list cache of `kind`, across owners.
pub fn list_prefix(kind: EntityKind) -> String {
    format!("list:{}:", kind)
}

/// Every list cache of `kind` for one owner.
pub fn owner_list_prefix(kind: EntityKind, owner: &OwnerScope) -> String {
    format!("list:{}:{}:", kind, encode(owner.as_str()))
}

/// Every stats cache of `kind`, across owners.
pub fn stats_prefix(kind: EntityKind) -> String {
    format!("stats:{}:", kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owner(scope: &str) -> OwnerScope {
        OwnerScope::new(scope).unwrap()
    }

    #[test]
    fn keys_have_expected_shape() {
        let filters = QueryFilters::new().with("status", "pending");

        assert_eq!(entity_key(EntityKind::Client, &EntityId::Int(1)), "entity:client:1");
        assert_eq!(
            list_key(EntityKind::Client, &owner("agency-1"), &filters),
            "list:client:agency-1:status=pending"
        );
        assert_eq!(
            list_key(EntityKind::Task, &owner("agency-1"), &QueryFilters::new()),
            "list:task:agency-1:all"
        );
        assert_eq!(stats_key(EntityKind::Client, &owner("agency-1")), "stats:client:agency-1");
    }

    #[test]
    fn colons_in_owner_do_not_leak_across_prefixes() {
        let nested = list_key(EntityKind::Client, &owner("a:b"), &QueryFilters::new());
        assert!(!nested.starts_with(&owner_list_prefix(EntityKind::Client, &owner("a"))));
    }

    #[test]
    fn list_keys_fall_under_kind_prefix() {
        let key = list_key(EntityKind::Commission, &owner("x"), &QueryFilters::new());
        assert!(key.starts_with(&list_prefix(EntityKind::Commission)));
        assert!(!key.starts_with(&list_prefix(EntityKind::Client)));
    }

    proptest! {
        #[test]
        fn list_key_ignores_filter_order(
            pairs in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9 &=]{0,6}", 0..5),
            scope in "[a-z0-9:-]{1,10}",
        ) {
            let forward = pairs.iter().fold(QueryFilters::new(), |f, (k, v)| f.with(k.clone(), v.clone()));
            let backward = pairs.iter().rev().fold(QueryFilters::new(), |f, (k, v)| f.with(k.clone(), v.clone()));
            let scope = owner(&scope);

            prop_assert_eq!(
                list_key(EntityKind::Client, &scope, &forward),
                list_key(EntityKind::Client, &scope, &backward)
            );
            prop_assert!(list_key(EntityKind::Client, &scope, &forward)
                .starts_with(&owner_list_prefix(EntityKind::Client, &scope)));
        }
    }
}
