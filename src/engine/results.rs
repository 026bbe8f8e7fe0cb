//! Deduplicated result storage and final ordering

use crate::engine::probe::Record;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Set of unique records gathered during a run
///
/// Owned by the aggregator while probes are in flight and handed back to
/// the caller once shutdown completes.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: HashSet<Record>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning false if the exact triple was already present
    pub fn insert(&mut self, record: Record) -> bool {
        self.entries.insert(record)
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.entries.contains(record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.entries.iter()
    }

    /// Materialize the set into a sequence ordered by IPv4 value
    pub fn into_sorted(self) -> Vec<Record> {
        let mut records: Vec<Record> = self.entries.into_iter().collect();
        sort_records(&mut records);
        records
    }
}

impl FromIterator<Record> for ResultSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<Record> for ResultSet {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

/// Order two records by their IPv4 address
///
/// Anything that is not a dotted quad (IPv6 literals, garbage) sorts first.
/// Such entries compare equal to each other, so their relative order is
/// whatever order they arrived in.
pub fn compare_by_ipv4(a: &Record, b: &Record) -> Ordering {
    match (ipv4_value(&a.ip), ipv4_value(&b.ip)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort records in place by IPv4 value
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(compare_by_ipv4);
}

fn ipv4_value(ip: &str) -> Option<u32> {
    ip.parse::<Ipv4Addr>().ok().map(u32::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ip: &str) -> Record {
        Record::new("test", ip, format!("host-{}", ip))
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = ResultSet::new();
        assert!(set.insert(rec("1.1.1.1")));
        assert!(!set.insert(rec("1.1.1.1")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_numeric_not_lexical_order() {
        let set: ResultSet = ["10.0.0.1", "9.255.255.255", "10.0.0.10", "10.0.0.2"]
            .into_iter()
            .map(rec)
            .collect();

        let ips: Vec<String> = set.into_sorted().into_iter().map(|r| r.ip).collect();
        assert_eq!(ips, vec!["9.255.255.255", "10.0.0.1", "10.0.0.2", "10.0.0.10"]);
    }

    #[test]
    fn test_unparsable_addresses_come_first() {
        let set: ResultSet = ["192.168.0.1", "2001:db8::1", "0.0.0.1", "not-an-ip"]
            .into_iter()
            .map(rec)
            .collect();

        let sorted = set.into_sorted();
        let head: HashSet<&str> = sorted[..2].iter().map(|r| r.ip.as_str()).collect();
        assert!(head.contains("2001:db8::1"));
        assert!(head.contains("not-an-ip"));
        assert_eq!(sorted[2].ip, "0.0.0.1");
        assert_eq!(sorted[3].ip, "192.168.0.1");
    }

    #[test]
    fn test_empty_set_sorts_to_empty_vec() {
        assert!(ResultSet::new().into_sorted().is_empty());
    }
}
