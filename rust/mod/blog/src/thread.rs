//! Comment thread construction.
//!
//! Turns a flat, ordered list of records with optional parent references
//! into a forest. The input is treated as an arena: positions are indexed by
//! id, children are resolved through a position → child-positions index, and
//! the nested output is assembled bottom-up from that index. Nothing recurses
//! on thread depth.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

/// A record that can be placed in a thread.
pub trait Threaded {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
}

/// One record with its direct replies, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<ThreadNode<T>>,
}

impl<T> ThreadNode<T> {
    /// A node with no children, used where a list is returned flat.
    pub fn leaf(item: T) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
        }
        total
    }
}

/// Total node count of a forest.
pub fn forest_size<T>(forest: &[ThreadNode<T>]) -> usize {
    forest.iter().map(ThreadNode::count).sum()
}

/// Build a forest from `items`.
///
/// - Records without a parent, or whose parent is not in `items`, become
///   roots in their input position.
/// - Siblings keep their relative input order.
/// - Every input record appears exactly once in the output.
///
/// Records caught in a parent cycle (including a record naming itself as
/// parent) are unreachable from any root. They are promoted to roots after
/// the regular ones, in input order, and a warning is logged.
pub fn build_thread<T: Threaded>(items: Vec<T>) -> Vec<ThreadNode<T>> {
    let n = items.len();

    // Pass 1: index ids. Pass 2: link each record to its parent's position.
    let (children, mut roots) = {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
        for (pos, item) in items.iter().enumerate() {
            index.entry(item.id()).or_insert(pos);
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for (pos, item) in items.iter().enumerate() {
            match item.parent_id().and_then(|p| index.get(p).copied()) {
                Some(parent) if parent != pos => children[parent].push(pos),
                // Self-parented: left unlinked, picked up below.
                Some(_) => {}
                None => roots.push(pos),
            }
        }
        (children, roots)
    };

    let mut walk = Walk {
        visited: vec![false; n],
        kept: vec![Vec::new(); n],
        order: Vec::with_capacity(n),
    };
    for &root in &roots {
        walk.visit(root, &children);
    }

    let stranded: Vec<usize> = (0..n).filter(|&pos| !walk.visited[pos]).collect();
    if !stranded.is_empty() {
        warn!(
            count = stranded.len(),
            "thread contains a parent cycle; promoting unreachable records to roots"
        );
        for pos in stranded {
            // An earlier promotion may already have reached this one.
            if !walk.visited[pos] {
                walk.visit(pos, &children);
                roots.push(pos);
            }
        }
    }

    // Pre-order reversed puts every node after all of its descendants,
    // so children are always built before their parent.
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut built: Vec<Option<ThreadNode<T>>> = (0..n).map(|_| None).collect();
    for &pos in walk.order.iter().rev() {
        let children = std::mem::take(&mut walk.kept[pos])
            .into_iter()
            .filter_map(|c| built[c].take())
            .collect();
        if let Some(item) = slots[pos].take() {
            built[pos] = Some(ThreadNode { item, children });
        }
    }

    roots.into_iter().filter_map(|pos| built[pos].take()).collect()
}

/// Depth-first traversal state. `kept` holds the tree edges actually used,
/// so a node reachable twice (only possible through a cycle) is placed once.
struct Walk {
    visited: Vec<bool>,
    kept: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl Walk {
    fn visit(&mut self, start: usize, children: &[Vec<usize>]) {
        self.visited[start] = true;
        let mut stack = vec![start];
        while let Some(pos) = stack.pop() {
            self.order.push(pos);
            for &child in &children[pos] {
                if !self.visited[child] {
                    self.visited[child] = true;
                    self.kept[pos].push(child);
                    stack.push(child);
                }
            }
        }
    }
}
