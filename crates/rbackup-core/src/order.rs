//! Host-fair ordering of resolved paths.
//!
//! Paths are grouped per host (keeping declaration order within a host) and
//! emitted round-robin over the hosts in lexicographic order. While `k`
//! distinct hosts still have pending paths, no `k` consecutive entries target
//! the same host, so a pool of at most `k` workers rarely runs two rsyncs
//! against one machine.

use std::collections::{BTreeMap, VecDeque};

use crate::resolve::ResolvedPath;

/// Reorder `paths` to interleave hosts. A single host is emitted as one run.
pub fn interleave_hosts(paths: Vec<ResolvedPath>) -> Vec<ResolvedPath> {
    let total = paths.len();
    let mut queues: BTreeMap<String, VecDeque<ResolvedPath>> = BTreeMap::new();
    for p in paths {
        queues.entry(p.host.clone()).or_default().push_back(p);
    }

    let mut ordered = Vec::with_capacity(total);
    while !queues.is_empty() {
        for queue in queues.values_mut() {
            if let Some(p) = queue.pop_front() {
                ordered.push(p);
            }
        }
        queues.retain(|_, q| !q.is_empty());
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(host: &str, path: &str) -> ResolvedPath {
        ResolvedPath {
            host: host.to_string(),
            path: path.to_string(),
            retention_days: 7,
            concurrency_limit: 3,
            bandwidth_limit: None,
            login_user: None,
        }
    }

    fn labels(paths: &[ResolvedPath]) -> Vec<String> {
        paths
            .iter()
            .map(|x| format!("{}{}", x.host, x.path))
            .collect()
    }

    #[test]
    fn round_robin_across_sorted_hosts() {
        let input = vec![
            p("A", "1"),
            p("A", "2"),
            p("A", "3"),
            p("B", "1"),
            p("C", "1"),
            p("C", "2"),
        ];
        let out = interleave_hosts(input);
        assert_eq!(labels(&out), vec!["A1", "B1", "C1", "A2", "C2", "A3"]);
    }

    #[test]
    fn host_order_is_lexicographic_not_declaration() {
        let input = vec![p("zeta", "/a"), p("alpha", "/a"), p("zeta", "/b")];
        let out = interleave_hosts(input);
        assert_eq!(labels(&out), vec!["alpha/a", "zeta/a", "zeta/b"]);
    }

    #[test]
    fn single_host_keeps_declaration_order() {
        let input = vec![p("h", "/c"), p("h", "/a"), p("h", "/b")];
        assert_eq!(labels(&interleave_hosts(input)), vec!["h/c", "h/a", "h/b"]);
    }

    #[test]
    fn empty_input() {
        assert!(interleave_hosts(Vec::new()).is_empty());
    }

    #[test]
    fn no_adjacent_same_host_while_others_pending() {
        let mut input = Vec::new();
        for (host, n) in [("a", 5), ("b", 2), ("c", 4), ("d", 1)] {
            for i in 0..n {
                input.push(p(host, &format!("/{i}")));
            }
        }
        let out = interleave_hosts(input.clone());
        assert_eq!(out.len(), input.len());

        for (i, pair) in out.windows(2).enumerate() {
            let remaining_hosts: std::collections::HashSet<&str> =
                out[i..].iter().map(|x| x.host.as_str()).collect();
            if remaining_hosts.len() >= 2 {
                assert_ne!(pair[0].host, pair[1].host, "adjacent at {i}");
            }
        }
    }
}
