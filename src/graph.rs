//! Node/edge view of the task forest for graph renderers.

use std::fmt::Write;

use crate::task::{Task, TaskId};

const COLUMNS: usize = 4;
const COLUMN_WIDTH: usize = 250;
const ROW_HEIGHT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode<'a> {
    pub id: &'a TaskId,
    pub title: &'a str,
    pub assigned_to: &'a str,
    /// Grid position, four nodes per row.
    pub x: usize,
    pub y: usize,
}

/// Parent to child link.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge<'a> {
    pub source: &'a TaskId,
    pub target: &'a TaskId,
}

impl GraphEdge<'_> {
    pub fn key(&self) -> String {
        format!("e{}-{}", self.source, self.target)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGraph<'a> {
    pub nodes: Vec<GraphNode<'a>>,
    pub edges: Vec<GraphEdge<'a>>,
}

impl<'a> TaskGraph<'a> {
    pub fn build(tasks: &'a [Task]) -> Self {
        let nodes = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| GraphNode {
                id: t.id(),
                title: &t.title,
                assigned_to: &t.assigned_to,
                x: (i % COLUMNS) * COLUMN_WIDTH,
                y: (i / COLUMNS) * ROW_HEIGHT,
            })
            .collect();
        let edges = tasks
            .iter()
            .filter_map(|t| {
                t.parent_id().map(|p| GraphEdge {
                    source: p,
                    target: t.id(),
                })
            })
            .collect();
        TaskGraph { nodes, edges }
    }

    /// Graphviz DOT rendering.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph tasks {\n  node [shape=box];\n");
        for n in &self.nodes {
            let label = if n.assigned_to.is_empty() {
                escape(n.title)
            } else {
                format!("{}\\nAssigned: {}", escape(n.title), escape(n.assigned_to))
            };
            let _ = writeln!(out, "  \"{}\" [label=\"{label}\"];", escape(n.id.as_str()));
        }
        for e in &self.edges {
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [id=\"{}\"];",
                escape(e.source.as_str()),
                escape(e.target.as_str()),
                escape(&e.key())
            );
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_timestamp;
    use crate::store::TaskStore;
    use crate::task::TaskDraft;

    #[test]
    fn test_nodes_and_edges() {
        let now = parse_timestamp("2030-01-01T09:00").unwrap();
        let mut store = TaskStore::default();
        let window = ("2030-01-01T10:00", "2030-01-02T10:00");
        let root = store
            .create_at(&TaskDraft::new("Root \"A\"", "x").window(window.0, window.1), now)
            .unwrap();
        for title in ["b", "c", "d", "e"] {
            store
                .create_at(
                    &TaskDraft::new(title, "x")
                        .window(window.0, window.1)
                        .assigned_to("Bob Brown")
                        .parent(root.id().clone()),
                    now,
                )
                .unwrap();
        }

        let graph = TaskGraph::build(store.tasks());
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.edges.len(), 4);
        assert_eq!((graph.nodes[3].x, graph.nodes[3].y), (750, 0));
        assert_eq!((graph.nodes[4].x, graph.nodes[4].y), (0, 200));
        assert!(graph.edges.iter().all(|e| e.source == root.id()));
        assert_eq!(graph.edges[0].key(), format!("e{}-{}", root.id(), graph.nodes[1].id));

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph tasks {"));
        assert!(dot.contains("Root \\\"A\\\""));
        assert!(dot.contains("Assigned: Bob Brown"));
        assert!(dot.contains(&format!("[id=\"e{}-{}\"]", root.id(), graph.nodes[4].id)));
    }
}
