//! Task tree: parent/child relations of initial, implicit and explicit tasks
//!
//! Built from the links and timestamps recorded while constructing chunk
//! graphs. Nodes are held in an ordered map keyed by task id; parents refer
//! to children by id, never by pointer.

use crate::error::{GraphError, Result};
use crate::event::{TaskId, TaskType, Timestamp};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{trace, warn};

/// Parent/child relation observed in one chunk; `parent == None` hangs the
/// child off the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskLink {
    pub parent: Option<TaskId>,
    pub child: TaskId,
    pub child_type: TaskType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub parent: Option<TaskId>,
    pub task_type: TaskType,
    pub creation_timestamp: Timestamp,
    /// Earliest recorded enter of the task body; `None` for a task never
    /// seen to run
    pub start_timestamp: Option<Timestamp>,
    /// Latest recorded leave; `None` for a task never seen to finish
    pub end_timestamp: Option<Timestamp>,
    pub children: Vec<TaskId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTree {
    nodes: BTreeMap<TaskId, TaskNode>,
}

impl TaskTree {
    pub fn build(
        links: &[TaskLink],
        creation_timestamps: &[(TaskId, Timestamp)],
        start_timestamps: &[(TaskId, Timestamp)],
        leave_timestamps: &[(TaskId, Timestamp)],
    ) -> Result<Self> {
        let mut created: HashMap<TaskId, Timestamp> = HashMap::new();
        for &(task, time) in creation_timestamps {
            created
                .entry(task)
                .and_modify(|t| *t = (*t).min(time))
                .or_insert(time);
        }

        let mut nodes: BTreeMap<TaskId, TaskNode> = BTreeMap::new();
        for link in links {
            if let Some(existing) = nodes.get(&link.child) {
                if existing.parent != link.parent || existing.task_type != link.child_type {
                    warn!(
                        task = link.child,
                        kept_parent = ?existing.parent,
                        ignored_parent = ?link.parent,
                        "conflicting task link ignored"
                    );
                }
                continue;
            }
            let creation_timestamp = created.get(&link.child).copied().unwrap_or_else(|| {
                warn!(task = link.child, "task has no recorded creation time");
                0
            });
            nodes.insert(
                link.child,
                TaskNode {
                    id: link.child,
                    parent: link.parent,
                    task_type: link.child_type,
                    creation_timestamp,
                    start_timestamp: None,
                    end_timestamp: None,
                    children: Vec::new(),
                },
            );
        }

        for &(task, time) in start_timestamps {
            match nodes.get_mut(&task) {
                Some(node) => {
                    node.start_timestamp = Some(node.start_timestamp.map_or(time, |t| t.min(time)));
                }
                None => trace!(task, "start of a task outside the tree"),
            }
        }

        for &(task, time) in leave_timestamps {
            match nodes.get_mut(&task) {
                Some(node) => {
                    node.end_timestamp = Some(node.end_timestamp.map_or(time, |t| t.max(time)));
                }
                None => trace!(task, "leave of a task outside the tree"),
            }
        }

        let edges: Vec<(TaskId, TaskId)> = nodes
            .values()
            .filter_map(|n| n.parent.map(|p| (p, n.id)))
            .collect();
        for (parent, child) in edges {
            match nodes.get_mut(&parent) {
                Some(node) => node.children.push(child),
                None => return Err(GraphError::OrphanTask { task: child, parent }),
            }
        }

        let tree = Self { nodes };
        tree.check_acyclic()?;
        Ok(tree)
    }

    /// Walk each parent chain once; a chain that reaches a task already on
    /// the current walk is a cycle
    fn check_acyclic(&self) -> Result<()> {
        let mut settled: HashSet<TaskId> = HashSet::with_capacity(self.nodes.len());
        for &start in self.nodes.keys() {
            let mut walk = Vec::new();
            let mut on_walk = HashSet::new();
            let mut current = Some(start);
            while let Some(task) = current {
                if settled.contains(&task) {
                    break;
                }
                if !on_walk.insert(task) {
                    return Err(GraphError::CyclicTaskTree { task: start });
                }
                walk.push(task);
                current = self.nodes.get(&task).and_then(|n| n.parent);
            }
            settled.extend(walk);
        }
        Ok(())
    }

    pub fn get(&self, task: TaskId) -> Option<&TaskNode> {
        self.nodes.get(&task)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    /// Tasks attached directly to the root
    pub fn roots(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values().filter(|n| n.parent.is_none())
    }

    /// Child nodes of `task`, in ascending id order
    pub fn children(&self, task: TaskId) -> impl Iterator<Item = &TaskNode> {
        self.nodes
            .get(&task)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.nodes.get(id))
    }

    /// `task` and every descendant reachable through nodes satisfying `keep`
    ///
    /// `task` itself is always included; a child failing `keep` is neither
    /// included nor descended into.
    pub fn descendants_if<F>(&self, task: TaskId, keep: F) -> Vec<TaskId>
    where
        F: Fn(&TaskNode) -> bool,
    {
        let mut found = Vec::new();
        let mut stack = vec![task];
        while let Some(id) = stack.pop() {
            if !self.nodes.contains_key(&id) {
                continue;
            }
            found.push(id);
            for child in self.children(id).filter(|c| keep(c)) {
                stack.push(child.id);
            }
        }
        found
    }

    pub fn count_by_type(&self) -> BTreeMap<TaskType, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.task_type).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(parent: Option<TaskId>, child: TaskId, child_type: TaskType) -> TaskLink {
        TaskLink {
            parent,
            child,
            child_type,
        }
    }

    fn sample() -> TaskTree {
        let links = [
            link(None, 1, TaskType::Initial),
            link(Some(1), 10, TaskType::Implicit),
            link(Some(10), 100, TaskType::Explicit),
            link(Some(100), 101, TaskType::Explicit),
            link(Some(100), 102, TaskType::Implicit),
        ];
        let created = [(1, 0), (10, 1), (100, 2), (101, 3), (102, 4)];
        let starts = [(1, 0), (10, 1), (100, 5), (100, 4), (102, 4)];
        let leaves = [(100, 9), (100, 12), (101, 8)];
        TaskTree::build(&links, &created, &starts, &leaves).unwrap()
    }

    #[test]
    fn test_build_links_children_and_timestamps() {
        let tree = sample();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.roots().map(|n| n.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(tree.get(100).unwrap().children, vec![101, 102]);
        assert_eq!(tree.get(100).unwrap().end_timestamp, Some(12));
        assert_eq!(tree.get(10).unwrap().end_timestamp, None);
        assert_eq!(tree.get(101).unwrap().creation_timestamp, 3);
    }

    #[test]
    fn test_start_is_earliest_recorded_enter() {
        let tree = sample();
        assert_eq!(tree.get(100).unwrap().start_timestamp, Some(4));
        assert_eq!(tree.get(101).unwrap().start_timestamp, None);
        assert_eq!(tree.get(10).unwrap().start_timestamp, Some(1));
    }

    #[test]
    fn test_deep_chain_is_accepted() {
        let mut links = vec![link(None, 0, TaskType::Initial)];
        links.extend((1..5000).map(|t| link(Some(t - 1), t, TaskType::Explicit)));
        let created: Vec<_> = (0..5000).map(|t| (t, t)).collect();
        let tree = TaskTree::build(&links, &created, &[], &[]).unwrap();
        assert_eq!(tree.len(), 5000);
        assert_eq!(tree.get(4999).unwrap().parent, Some(4998));
    }

    #[test]
    fn test_descendants_stop_at_implicit_tasks() {
        let tree = sample();
        let mut found = tree.descendants_if(100, |n| n.task_type != TaskType::Implicit);
        found.sort_unstable();
        assert_eq!(found, vec![100, 101]);
    }

    #[test]
    fn test_duplicate_link_keeps_first() {
        let links = [
            link(None, 1, TaskType::Initial),
            link(None, 2, TaskType::Initial),
            link(Some(1), 5, TaskType::Explicit),
            link(Some(2), 5, TaskType::Explicit),
        ];
        let tree = TaskTree::build(&links, &[(1, 0), (2, 0), (5, 3)], &[], &[]).unwrap();
        assert_eq!(tree.get(5).unwrap().parent, Some(1));
        assert!(tree.get(2).unwrap().children.is_empty());
    }

    #[test]
    fn test_unknown_parent_is_orphan() {
        let links = [link(Some(99), 5, TaskType::Explicit)];
        let err = TaskTree::build(&links, &[(5, 1)], &[], &[]).unwrap_err();
        assert_eq!(err, GraphError::OrphanTask { task: 5, parent: 99 });
    }

    #[test]
    fn test_parent_cycle_is_rejected() {
        let links = [
            link(Some(2), 1, TaskType::Explicit),
            link(Some(1), 2, TaskType::Explicit),
        ];
        let err = TaskTree::build(&links, &[(1, 0), (2, 0)], &[], &[]).unwrap_err();
        assert!(matches!(err, GraphError::CyclicTaskTree { .. }));
    }

    #[test]
    fn test_counts_by_type() {
        let counts = sample().count_by_type();
        assert_eq!(counts[&TaskType::Explicit], 2);
        assert_eq!(counts[&TaskType::Implicit], 2);
        assert_eq!(counts[&TaskType::Initial], 1);
    }
}
