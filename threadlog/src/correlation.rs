//! Anchor ↔ context association graph
//!
//! A logical operation can pass through several execution contexts when
//! propagation breaks at an asynchronous boundary. Stable *anchors* (one per
//! operation, owned by the caller) are associated with every context the
//! operation runs in; walking the resulting bipartite graph from any anchor
//! or context recovers the whole connected component, i.e. every context
//! that belongs to the same operation.
//!
//! Edges are only ever created by [`associate`](AnchorContextGraph::associate).
//! Nothing here removes them implicitly; the owning collaborator calls
//! [`forget_anchor`](AnchorContextGraph::forget_anchor) or
//! [`forget_context`](AnchorContextGraph::forget_context) when an identity's
//! lifetime ends, so the graph never pins identities alive on its own.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Opaque identity of an externally owned anchor object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AnchorId(Uuid);

impl AnchorId {
    /// Mint a fresh anchor identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor:{}", self.0)
    }
}

/// Opaque identity of one contiguous execution context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Mint a fresh context identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context:{}", self.0)
    }
}

/// Starting point of a traversal: either kind of graph node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    /// An anchor node.
    Anchor(AnchorId),
    /// A context node.
    Context(ContextId),
}

impl From<AnchorId> for GraphNode {
    fn from(anchor: AnchorId) -> Self {
        GraphNode::Anchor(anchor)
    }
}

impl From<ContextId> for GraphNode {
    fn from(context: ContextId) -> Self {
        GraphNode::Context(context)
    }
}

#[derive(Debug, Default)]
struct GraphEdges {
    // Vec-based edge sets keep edge-insertion order, which is the order
    // traversal discovers nodes in.
    anchor_to_contexts: HashMap<AnchorId, Vec<ContextId>>,
    context_to_anchors: HashMap<ContextId, Vec<AnchorId>>,
}

/// Bidirectional anchor ↔ context association store.
///
/// Interior mutability behind an `RwLock`: every operation is synchronous
/// and safe to call from multiple threads, and traversal takes only the
/// read side.
#[derive(Debug, Default)]
pub struct AnchorContextGraph {
    edges: RwLock<GraphEdges>,
}

impl AnchorContextGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the bidirectional edge `anchor` ↔ `context`.
    ///
    /// Idempotent: re-associating an existing pair leaves the graph
    /// unchanged. `context` must be the context active at the moment of the
    /// call; associating a stale context silently degrades traversal
    /// correctness and is not defended against here.
    pub fn associate(&self, anchor: AnchorId, context: ContextId) {
        let mut edges = self.write();
        let contexts = edges.anchor_to_contexts.entry(anchor).or_default();
        if contexts.contains(&context) {
            return;
        }
        contexts.push(context);
        edges
            .context_to_anchors
            .entry(context)
            .or_default()
            .push(anchor);
        debug!("Associated {} with {}", anchor, context);
    }

    /// Every context in the connected component of `start`.
    ///
    /// Breadth-first over the bipartite graph: visiting a context collects
    /// it and enqueues its anchors, visiting an anchor enqueues its
    /// contexts. Per-kind visited sets guarantee termination on cycles.
    /// Discovery order follows edge-insertion order but carries no semantic
    /// guarantee; callers needing a total order must re-sort. Read-only,
    /// O(V+E) over the reachable subgraph.
    pub fn associated_contexts(&self, start: impl Into<GraphNode>) -> Vec<ContextId> {
        let edges = self.read();

        let mut found = Vec::new();
        let mut seen_anchors: HashSet<AnchorId> = HashSet::new();
        let mut seen_contexts: HashSet<ContextId> = HashSet::new();
        let mut queue: VecDeque<GraphNode> = VecDeque::new();
        queue.push_back(start.into());

        while let Some(node) = queue.pop_front() {
            match node {
                GraphNode::Context(context) => {
                    if !seen_contexts.insert(context) {
                        continue;
                    }
                    // A context counts only once it has at least one edge;
                    // an unassociated starting context yields nothing.
                    if let Some(anchors) = edges.context_to_anchors.get(&context) {
                        found.push(context);
                        queue.extend(anchors.iter().map(|&a| GraphNode::Anchor(a)));
                    }
                }
                GraphNode::Anchor(anchor) => {
                    if !seen_anchors.insert(anchor) {
                        continue;
                    }
                    if let Some(contexts) = edges.anchor_to_contexts.get(&anchor) {
                        queue.extend(contexts.iter().map(|&c| GraphNode::Context(c)));
                    }
                }
            }
        }

        found
    }

    /// Number of recorded associations.
    pub fn edge_count(&self) -> usize {
        self.read().anchor_to_contexts.values().map(Vec::len).sum()
    }

    /// Drop an anchor and every edge touching it. Called by the owning
    /// collaborator once the anchor's lifetime has ended.
    pub fn forget_anchor(&self, anchor: AnchorId) {
        let mut edges = self.write();
        let Some(contexts) = edges.anchor_to_contexts.remove(&anchor) else {
            return;
        };
        for context in contexts {
            if let Some(anchors) = edges.context_to_anchors.get_mut(&context) {
                anchors.retain(|&a| a != anchor);
                if anchors.is_empty() {
                    edges.context_to_anchors.remove(&context);
                }
            }
        }
        debug!("Forgot {}", anchor);
    }

    /// Drop a context and every edge touching it.
    pub fn forget_context(&self, context: ContextId) {
        let mut edges = self.write();
        let Some(anchors) = edges.context_to_anchors.remove(&context) else {
            return;
        };
        for anchor in anchors {
            if let Some(contexts) = edges.anchor_to_contexts.get_mut(&anchor) {
                contexts.retain(|&c| c != context);
                if contexts.is_empty() {
                    edges.anchor_to_contexts.remove(&anchor);
                }
            }
        }
        debug!("Forgot {}", context);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GraphEdges> {
        self.edges.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GraphEdges> {
        self.edges.write().unwrap_or_else(PoisonError::into_inner)
    }
}
