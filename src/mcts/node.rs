//! Search tree vertices.
//!
//! Each node owns a snapshot of the puzzle state reached by some move sequence
//! from the root, plus the raw `(visits, total_reward)` statistics.

use super::DeadEndPolicy;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct SearchNode<S> {
    /// Owned snapshot; never shared with another node.
    pub state: S,

    /// Back reference used only for backpropagation (None for the root).
    pub parent: Option<NodeId>,

    /// Index-aligned with `Move::ALL` once expanded; empty before.
    pub children: Vec<NodeId>,

    pub visit_count: u32,

    pub total_reward: f64,

    /// Set once the node has passed the expansion decision. Never reverts.
    pub expanded: bool,
}

impl<S> SearchNode<S> {
    pub fn new(parent: Option<NodeId>, state: S, expanded: bool) -> Self {
        Self {
            state,
            parent,
            children: Vec::new(),
            visit_count: 0,
            total_reward: 0.0,
            expanded,
        }
    }

    /// Mean reward `w / n`, or −∞ if never visited.
    #[inline]
    pub fn mean_reward(&self) -> f64 {
        if self.visit_count == 0 {
            f64::NEG_INFINITY
        } else {
            self.total_reward / self.visit_count as f64
        }
    }

    /// Expanded without children: the move that produced this node was illegal.
    #[inline]
    pub fn is_dead_end(&self) -> bool {
        self.expanded && self.children.is_empty()
    }

    /// Selection stops here: not yet expanded, or nothing below.
    #[inline]
    pub fn is_frontier(&self) -> bool {
        !self.expanded || self.children.is_empty()
    }

    /// UCB1 priority of this node as a child of a parent visited `parent_visits` times.
    ///
    /// `C * sqrt(ln(max(N / n, 1))) + w / n`; unvisited nodes get +∞, except
    /// dead ends under [`DeadEndPolicy::Avoid`] which get −∞.
    pub fn ucb_score(&self, parent_visits: u32, exploration: f64, dead_end: DeadEndPolicy) -> f64 {
        if self.visit_count == 0 {
            return match (dead_end, self.is_dead_end()) {
                (DeadEndPolicy::Avoid, true) => f64::NEG_INFINITY,
                _ => f64::INFINITY,
            };
        }
        let n = self.visit_count as f64;
        let ratio = (parent_visits as f64 / n).max(1.0);
        exploration * ratio.ln().sqrt() + self.total_reward / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::SQRT_2;

    fn visited(visit_count: u32, total_reward: f64) -> SearchNode<()> {
        let mut node = SearchNode::new(Some(NodeId::ROOT), (), false);
        node.visit_count = visit_count;
        node.total_reward = total_reward;
        node
    }

    #[test]
    fn test_new_node() {
        let node = SearchNode::new(None, 7u8, false);
        assert!(node.parent.is_none());
        assert_eq!(node.visit_count, 0);
        assert_eq!(node.total_reward, 0.0);
        assert!(node.children.is_empty());
        assert!(node.is_frontier());
        assert!(!node.is_dead_end());
        assert_eq!(node.state, 7);
    }

    #[test]
    fn test_mean_reward() {
        assert_eq!(visited(0, 0.0).mean_reward(), f64::NEG_INFINITY);
        assert!((visited(4, 2.0).mean_reward() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unvisited_priority_depends_on_dead_end_policy() {
        let fresh = SearchNode::new(Some(NodeId::ROOT), (), false);
        let dead = SearchNode::new(Some(NodeId::ROOT), (), true);
        assert_eq!(fresh.ucb_score(10, SQRT_2, DeadEndPolicy::Avoid), f64::INFINITY);
        assert_eq!(fresh.ucb_score(10, SQRT_2, DeadEndPolicy::Explore), f64::INFINITY);
        assert_eq!(dead.ucb_score(10, SQRT_2, DeadEndPolicy::Avoid), f64::NEG_INFINITY);
        assert_eq!(dead.ucb_score(10, SQRT_2, DeadEndPolicy::Explore), f64::INFINITY);
    }

    #[test]
    fn test_ucb_score() {
        // sqrt(2) * sqrt(ln(100 / 10)) + 5 / 10
        let node = visited(10, 5.0);
        let expected = SQRT_2 * (10f64).ln().sqrt() + 0.5;
        assert!((node.ucb_score(100, SQRT_2, DeadEndPolicy::Avoid) - expected).abs() < 1e-12);
    }

    #[test]
    fn ucb_uses_real_division() {
        // 3 / 2 must not truncate to 1.
        let node = visited(2, 0.0);
        let score = node.ucb_score(3, 1.0, DeadEndPolicy::Avoid);
        assert!((score - (1.5f64).ln().sqrt()).abs() < 1e-12);
        assert!(score > 0.0);
    }

    #[test]
    fn ucb_clamps_ratio_below_one() {
        // A child visited more often than its parent saw would give ln(<1).
        let node = visited(8, -4.0);
        let score = node.ucb_score(2, SQRT_2, DeadEndPolicy::Avoid);
        assert!(score.is_finite());
        assert!((score - (-0.5)).abs() < 1e-12);
    }
}
