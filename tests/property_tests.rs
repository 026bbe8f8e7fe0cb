//! Property tests for result ordering, deduplication and hostname checks

use hostsweep::{
    engine::{is_valid_hostname, sort_records},
    Record, ResultSet,
};
use proptest::prelude::*;
use std::net::Ipv4Addr;

fn any_ip() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => any::<u32>().prop_map(|v| Ipv4Addr::from(v).to_string()),
        1 => any::<u128>().prop_map(|v| std::net::Ipv6Addr::from(v).to_string()),
        1 => "[a-z]{1,8}",
    ]
}

fn any_record() -> impl Strategy<Value = Record> {
    (
        prop::sample::select(vec!["reverse", "tls", "headers", "ns"]),
        any_ip(),
        "[a-z]{1,6}\\.example",
    )
        .prop_map(|(source, ip, hostname)| Record::new(source, ip, hostname))
}

proptest! {
    #[test]
    fn sorted_records_put_non_ipv4_first_then_ascend(
        mut records in prop::collection::vec(any_record(), 0..64)
    ) {
        sort_records(&mut records);

        let values: Vec<Option<u32>> = records
            .iter()
            .map(|r| r.ip.parse::<Ipv4Addr>().ok().map(u32::from))
            .collect();

        let first_v4 = values.iter().position(Option::is_some).unwrap_or(values.len());
        prop_assert!(values[..first_v4].iter().all(Option::is_none));
        prop_assert!(values[first_v4..].iter().all(Option::is_some));

        let v4: Vec<u32> = values.into_iter().flatten().collect();
        prop_assert!(v4.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn result_set_holds_each_triple_once(records in prop::collection::vec(any_record(), 0..64)) {
        let mut doubled = records.clone();
        doubled.extend(records.iter().cloned());

        let set: ResultSet = doubled.into_iter().collect();
        let unique: std::collections::HashSet<Record> = records.into_iter().collect();
        prop_assert_eq!(set.len(), unique.len());

        let sorted = set.into_sorted();
        prop_assert_eq!(sorted.len(), unique.len());
        prop_assert!(sorted.iter().all(|r| unique.contains(r)));
    }

    #[test]
    fn uppercase_or_punctuated_names_are_invalid(name in "[a-z]{1,5}[A-Z_!@ ][a-z]{0,5}") {
        prop_assert!(!is_valid_hostname(&name));
    }

    #[test]
    fn dotted_lowercase_labels_are_valid(
        labels in prop::collection::vec("[a-z0-9]([a-z0-9-]{0,8}[a-z0-9])?", 1..5)
    ) {
        let name = labels.join(".");
        prop_assert!(is_valid_hostname(&name), "{} should be valid", name);
    }
}
