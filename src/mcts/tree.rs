//! MCTS tree structure with arena allocation.
//!
//! Nodes live in a contiguous `Vec` and refer to each other by [`NodeId`].
//! Children are owned by the arena; parent links are plain indices, so
//! dropping the tree releases every node at once.

use rand::Rng;
use tracing::trace;

use crate::engine::{GameState, Move};

use super::node::{NodeId, SearchNode};
use super::rollout::RolloutPolicy;
use super::{BranchStats, MctsConfig};

/// MCTS tree with arena-based node storage.
#[derive(Debug, Clone)]
pub struct SearchTree<S> {
    nodes: Vec<SearchNode<S>>,
}

impl<S> SearchTree<S> {
    /// Create a tree holding only an unexpanded root.
    pub fn new(root_state: S) -> Self {
        Self { nodes: vec![SearchNode::new(None, root_state, false)] }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode<S> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode<S> {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a child under `parent` and return its id.
    pub fn add_child(&mut self, parent: NodeId, state: S, expanded: bool) -> NodeId {
        let id = match u32::try_from(self.nodes.len()) {
            Ok(index) => NodeId(index),
            Err(_) => panic!("search tree is full: node ids are u32"),
        };
        self.nodes.push(SearchNode::new(Some(parent), state, expanded));
        self.get_mut(parent).children.push(id);
        id
    }

    /// Descend from the root by UCB1 until reaching a frontier node.
    ///
    /// Ties go to the lowest child index, i.e. the earliest direction in `Move::ALL`.
    pub fn select(&self, cfg: &MctsConfig) -> NodeId {
        let mut current = self.root();
        loop {
            let node = self.get(current);
            if node.is_frontier() {
                return current;
            }
            let priority = |id: NodeId| self.get(id).ucb_score(node.visit_count, cfg.exploration, cfg.dead_end);
            let mut best = node.children[0];
            let mut best_score = priority(best);
            for &child in &node.children[1..] {
                let score = priority(child);
                if score > best_score {
                    best = child;
                    best_score = score;
                }
            }
            current = best;
        }
    }

    /// Add `reward` to `leaf` and every ancestor up to and including the root.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.total_reward += reward;
            node.visit_count += 1;
            current = node.parent;
        }
    }

    /// Root statistics per direction, in `Move::ALL` order.
    ///
    /// Before the root is expanded every branch reads as illegal and unvisited.
    pub fn root_branches(&self) -> [BranchStats; 4] {
        let mut out = Move::ALL.map(|dir| BranchStats { dir, visits: 0, total_reward: 0.0, legal: false });
        let root = self.get(self.root());
        for (slot, &child) in out.iter_mut().zip(&root.children) {
            let node = self.get(child);
            slot.visits = node.visit_count;
            slot.total_reward = node.total_reward;
            slot.legal = !node.is_dead_end();
        }
        out
    }

    /// Length of the longest root-to-node path.
    pub fn max_depth(&self) -> u32 {
        let mut deepest = 0;
        let mut stack = vec![(self.root(), 0u32)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(self.get(id).children.iter().map(|&c| (c, depth + 1)));
        }
        deepest
    }
}

impl<S: GameState> SearchTree<S> {
    /// Create one child per direction, in `Move::ALL` order.
    ///
    /// A legal move gets a fresh tile spawned and an unexpanded child; an
    /// illegal one gets a dead-end child that is already marked expanded.
    /// Expanding twice is a no-op.
    pub fn expand<R: Rng + ?Sized>(&mut self, id: NodeId, rng: &mut R) {
        if self.get(id).expanded {
            return;
        }
        for dir in Move::ALL {
            let mut state = self.get(id).state.clone();
            let legal = state.apply_move(dir);
            if legal {
                state.spawn_tile(rng);
            }
            self.add_child(id, state, !legal);
        }
        self.get_mut(id).expanded = true;
    }

    /// Expand the root, then run `cfg.iterations` rounds of
    /// select → expand → rollout → backpropagate.
    ///
    /// The rollout starts from the selected node itself, even when that node
    /// was expanded in the same round.
    pub fn grow<P, R>(&mut self, cfg: &MctsConfig, policy: &P, rng: &mut R)
    where
        P: RolloutPolicy<S>,
        R: Rng + ?Sized,
    {
        self.expand(self.root(), rng);
        for iteration in 0..cfg.iterations {
            let leaf = self.select(cfg);
            if !self.get(leaf).expanded {
                self.expand(leaf, rng);
            }
            let reward = policy.rollout(&self.get(leaf).state, rng);
            self.backpropagate(leaf, reward);
            trace!(iteration = iteration, leaf = leaf.0, reward = reward, "mcts iteration complete");
        }
    }
}
