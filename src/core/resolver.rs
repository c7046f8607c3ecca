//! # Dependency cycle detection.
//!
//! Depth-first walk over the dependency subgraph reachable from one service,
//! tracking the names currently on the walk path. Reaching a name that is
//! already on the path is a cycle. Unknown names are skipped; the start walk
//! reports them as dependency failures.

use std::collections::HashSet;

use crate::core::registry::Registry;

/// Returns the first cycle reachable from `root`, with its entry name repeated
/// at the end (`["a", "b", "a"]`), or `None` if the subgraph is acyclic.
pub(crate) fn find_cycle<'a>(registry: &'a Registry, root: &'a str) -> Option<Vec<String>> {
    let mut done: HashSet<&str> = HashSet::new();
    let mut on_path: HashSet<&str> = HashSet::from([root]);
    let mut path: Vec<(&str, usize)> = vec![(root, 0)];

    while let Some((name, next)) = path.last_mut() {
        let deps = registry
            .get(*name)
            .map(|e| e.spec.dependencies())
            .unwrap_or_default();

        let Some(dep) = deps.get(*next) else {
            let name = *name;
            on_path.remove(name);
            done.insert(name);
            path.pop();
            continue;
        };
        *next += 1;

        let dep = dep.as_str();
        if on_path.contains(dep) {
            let from = path.iter().position(|(n, _)| *n == dep).unwrap_or(0);
            let mut cycle: Vec<String> = path[from..].iter().map(|(n, _)| n.to_string()).collect();
            cycle.push(dep.to_string());
            return Some(cycle);
        }
        if !done.contains(dep) && registry.contains(dep) {
            on_path.insert(dep);
            path.push((dep, 0));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ServiceFn, ServiceSpec};

    fn registry(edges: &[(&str, &[&str])]) -> Registry {
        let mut reg = Registry::new(None);
        for (name, deps) in edges {
            let spec = ServiceSpec::new(*name, ServiceFn::new().arc())
                .with_dependencies(deps.iter().copied());
            reg.insert(spec).unwrap();
        }
        reg
    }

    #[test]
    fn chain_is_acyclic() {
        let reg = registry(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(find_cycle(&reg, "a"), None);
    }

    #[test]
    fn diamond_is_acyclic() {
        let reg = registry(&[
            ("app", &["left", "right"]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("base", &[]),
        ]);
        assert_eq!(find_cycle(&reg, "app"), None);
    }

    #[test]
    fn reports_cycle_path() {
        let reg = registry(&[("a", &["b"]), ("b", &["c"]), ("c", &["b"])]);
        assert_eq!(
            find_cycle(&reg, "a"),
            Some(vec!["b".to_string(), "c".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let reg = registry(&[("a", &["a"])]);
        assert_eq!(
            find_cycle(&reg, "a"),
            Some(vec!["a".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn unknown_dependencies_are_ignored() {
        let reg = registry(&[("a", &["ghost"])]);
        assert_eq!(find_cycle(&reg, "a"), None);
    }
}
