//! Ancestor/descendant queries over the flat task collection.
//!
//! Children are never stored; they are found by scanning for tasks whose
//! `parent_id` points at the parent. Every walk here is bounded by the number of
//! tasks so a corrupted (cyclic) input cannot loop forever.

use std::collections::{HashMap, HashSet};

use crate::task::{Task, TaskId};

fn parent_map(tasks: &[Task]) -> HashMap<&TaskId, Option<&TaskId>> {
    tasks.iter().map(|t| (&t.id, t.parent_id.as_ref())).collect()
}

/// Walk upward from `start` and report whether `task_id` is met on the way.
///
/// `start` itself counts, so `is_descendant(x, x, ..)` is true. To ask whether
/// making `y` the parent of `x` would close a cycle, call `is_descendant(y, x, ..)`.
pub fn is_descendant(start: &TaskId, task_id: &TaskId, tasks: &[Task]) -> bool {
    let parents = parent_map(tasks);
    let mut current = Some(start);
    let mut hops = 0usize;
    while let Some(id) = current {
        if id == task_id {
            return true;
        }
        hops += 1;
        if hops > tasks.len() {
            break;
        }
        current = parents.get(id).copied().flatten();
    }
    false
}

/// Parent id to child ids, children in collection order.
pub fn build_children_map(tasks: &[Task]) -> HashMap<&TaskId, Vec<&TaskId>> {
    let mut map: HashMap<&TaskId, Vec<&TaskId>> = HashMap::new();
    for t in tasks {
        if let Some(p) = &t.parent_id {
            map.entry(p).or_default().push(&t.id);
        }
    }
    map
}

/// Immediate children of `id`, in collection order.
pub fn children_of<'a>(id: &TaskId, tasks: &'a [Task]) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.parent_id.as_ref() == Some(id))
        .collect()
}

pub fn has_children(id: &TaskId, tasks: &[Task]) -> bool {
    tasks.iter().any(|t| t.parent_id.as_ref() == Some(id))
}

/// Every task below `id`, excluding `id` itself.
///
/// Expands the frontier one generation at a time until no new ids turn up.
pub fn descendants_of(id: &TaskId, tasks: &[Task]) -> HashSet<TaskId> {
    let children = build_children_map(tasks);
    let mut found: HashSet<TaskId> = HashSet::new();
    let mut frontier: Vec<&TaskId> = vec![id];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for parent in frontier {
            for &child in children.get(parent).map(Vec::as_slice).unwrap_or_default() {
                if child != id && found.insert(child.clone()) {
                    next.push(child);
                }
            }
        }
        frontier = next;
    }
    found
}

/// Number of ancestors above `id`; roots have depth 0.
pub fn depth_of(id: &TaskId, tasks: &[Task]) -> usize {
    let parents = parent_map(tasks);
    let mut depth = 0usize;
    let mut current = parents.get(id).copied().flatten();
    while let Some(p) = current {
        depth += 1;
        if depth > tasks.len() {
            break;
        }
        current = parents.get(p).copied().flatten();
    }
    depth
}

/// Ancestor chain of `id`, closest first.
pub fn ancestors_of<'a>(id: &TaskId, tasks: &'a [Task]) -> Vec<&'a TaskId> {
    let parents = parent_map(tasks);
    let mut chain = Vec::new();
    let mut current = parents.get(id).copied().flatten();
    while let Some(p) = current {
        if chain.len() >= tasks.len() {
            break;
        }
        chain.push(p);
        current = parents.get(p).copied().flatten();
    }
    chain
}

/// Depth-first, parent-first ordering of the whole forest as `(task, depth)`.
///
/// Roots appear in collection order and each task's children follow it, also in
/// collection order.
pub fn forest(tasks: &[Task]) -> Vec<(&Task, usize)> {
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let children = build_children_map(tasks);
    let mut out = Vec::with_capacity(tasks.len());
    let mut seen: HashSet<&TaskId> = HashSet::new();

    let mut stack: Vec<(&Task, usize)> = tasks
        .iter()
        .filter(|t| t.parent_id.as_ref().map_or(true, |p| !by_id.contains_key(p)))
        .rev()
        .map(|t| (t, 0))
        .collect();

    while let Some((task, depth)) = stack.pop() {
        if !seen.insert(&task.id) {
            continue;
        }
        out.push((task, depth));
        if let Some(kids) = children.get(&task.id) {
            for child in kids.iter().rev() {
                if let Some(&t) = by_id.get(child) {
                    stack.push((t, depth + 1));
                }
            }
        }
    }
    out
}

/// First task whose parent is not in the collection, as `(task, parent)`.
pub fn find_dangling_parent(tasks: &[Task]) -> Option<(TaskId, TaskId)> {
    let ids: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
    tasks.iter().find_map(|t| match &t.parent_id {
        Some(p) if !ids.contains(p) => Some((t.id.clone(), p.clone())),
        _ => None,
    })
}

/// A task that is its own ancestor, if the parent relation has a cycle.
pub fn find_cycle(tasks: &[Task]) -> Option<TaskId> {
    tasks.iter().find_map(|t| {
        let parent = t.parent_id.as_ref()?;
        is_descendant(parent, &t.id, tasks).then(|| t.id.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_timestamp;

    fn task(id: &str, parent: Option<&str>) -> Task {
        let at = parse_timestamp("2030-01-01T10:00").unwrap();
        Task {
            id: id.into(),
            title: format!("task {id}"),
            description: "d".into(),
            assigned_to: String::new(),
            created_at: at,
            due_at: at,
            duration_days: 0,
            parent_id: parent.map(TaskId::from),
            progress: 0,
        }
    }

    fn sample() -> Vec<Task> {
        // a -> b -> c, a -> d, e
        vec![
            task("a", None),
            task("b", Some("a")),
            task("c", Some("b")),
            task("d", Some("a")),
            task("e", None),
        ]
    }

    #[test]
    fn test_is_descendant_walks_upward() {
        let tasks = sample();
        assert!(is_descendant(&"c".into(), &"a".into(), &tasks));
        assert!(!is_descendant(&"a".into(), &"c".into(), &tasks));
        assert!(is_descendant(&"b".into(), &"b".into(), &tasks));
        assert!(!is_descendant(&"e".into(), &"a".into(), &tasks));
    }

    #[test]
    fn test_descendants_of() {
        let tasks = sample();
        let got = descendants_of(&"a".into(), &tasks);
        let want: HashSet<TaskId> = ["b", "c", "d"].into_iter().map(TaskId::from).collect();
        assert_eq!(got, want);
        assert!(descendants_of(&"e".into(), &tasks).is_empty());
    }

    #[test]
    fn test_forest_is_parent_first() {
        let tasks = sample();
        let order: Vec<(&str, usize)> = forest(&tasks)
            .into_iter()
            .map(|(t, d)| (t.id.as_str(), d))
            .collect();
        assert_eq!(order, vec![("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 0)]);
    }

    #[test]
    fn test_depth_and_ancestors() {
        let tasks = sample();
        assert_eq!(depth_of(&"c".into(), &tasks), 2);
        assert_eq!(depth_of(&"e".into(), &tasks), 0);
        let chain: Vec<&str> = ancestors_of(&"c".into(), &tasks).iter().map(|i| i.as_str()).collect();
        assert_eq!(chain, vec!["b", "a"]);
    }

    #[test]
    fn test_cycle_and_dangling_detection() {
        let mut tasks = sample();
        assert_eq!(find_cycle(&tasks), None);
        assert_eq!(find_dangling_parent(&tasks), None);

        tasks[0].parent_id = Some("c".into());
        assert!(find_cycle(&tasks).is_some());
        // Walks still terminate on cyclic input.
        assert!(depth_of(&"c".into(), &tasks) <= tasks.len() + 1);

        let orphan = vec![task("x", Some("missing"))];
        assert_eq!(
            find_dangling_parent(&orphan),
            Some((TaskId::from("x"), TaskId::from("missing")))
        );
    }
}
