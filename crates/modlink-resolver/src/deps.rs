//! Module dependency graph, learned from cross-module resolutions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use modlink_core::ModuleId;
use tracing::debug;

#[derive(Debug, Default)]
struct Edges {
    /// requester -> providers it resolved symbols from.
    forward: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
    /// provider -> requesters that resolved symbols from it.
    reverse: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
}

/// Directed "needs" graph between modules.
///
/// Edges are recorded at runtime: whenever module A resolves a symbol that
/// module B provides, the edge A -> B is added.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: Mutex<Edges>,
}

impl DependencyGraph {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Edges> {
        self.edges.lock().unwrap_or_else(|e| {
            tracing::warn!("Dependency graph lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Record that `requester` needs `provider`. Self-edges are ignored.
    ///
    /// Returns `true` if the edge is new.
    pub fn record(&self, requester: &ModuleId, provider: &ModuleId) -> bool {
        if requester == provider {
            return false;
        }
        let mut edges = self.lock();
        let added = edges
            .forward
            .entry(requester.clone())
            .or_default()
            .insert(provider.clone());
        if added {
            edges
                .reverse
                .entry(provider.clone())
                .or_default()
                .insert(requester.clone());
            debug!(requester = %requester, provider = %provider, "Recorded module dependency");
        }
        added
    }

    /// Remove every edge that touches `id`.
    pub fn clear(&self, id: &ModuleId) {
        let mut edges = self.lock();
        let Edges { forward, reverse } = &mut *edges;
        Self::unlink(forward, reverse, id);
        Self::unlink(reverse, forward, id);
    }

    /// Remove only the edges going out of `id` (what it needs).
    pub fn clear_outgoing(&self, id: &ModuleId) {
        let mut edges = self.lock();
        let Edges { forward, reverse } = &mut *edges;
        Self::unlink(forward, reverse, id);
    }

    /// Drop `id`'s entry in `side` and the mirrored entries in `mirror`.
    fn unlink(
        side: &mut BTreeMap<ModuleId, BTreeSet<ModuleId>>,
        mirror: &mut BTreeMap<ModuleId, BTreeSet<ModuleId>>,
        id: &ModuleId,
    ) {
        let Some(targets) = side.remove(id) else {
            return;
        };
        for target in targets {
            if let Some(set) = mirror.get_mut(&target) {
                set.remove(id);
                if set.is_empty() {
                    mirror.remove(&target);
                }
            }
        }
    }

    /// Direct providers of `id`, sorted.
    #[must_use]
    pub fn direct_dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.lock()
            .forward
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Everything `id` needs, transitively, excluding `id`.
    ///
    /// Depth-first order, neighbors visited in sorted order.
    #[must_use]
    pub fn dependencies_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        Self::walk(&self.lock().forward, id)
    }

    /// Everything that needs `id`, transitively, excluding `id`.
    ///
    /// Depth-first order, neighbors visited in sorted order.
    #[must_use]
    pub fn dependents_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        Self::walk(&self.lock().reverse, id)
    }

    /// Everything that needs `id`, transitively, ordered so each module
    /// comes after every other dependent it needs. Excludes `id`.
    ///
    /// Loading in this order (after `id`) never starts a module before one
    /// of its providers; unloading runs it in reverse.
    #[must_use]
    pub fn dependents_in_load_order(&self, id: &ModuleId) -> Vec<ModuleId> {
        let edges = self.lock();
        let members: BTreeSet<ModuleId> = Self::walk(&edges.reverse, id).into_iter().collect();

        let mut seen = BTreeSet::new();
        let mut order = Vec::with_capacity(members.len());
        for member in &members {
            Self::post_order(&edges.forward, &members, member, &mut seen, &mut order);
        }
        order
    }

    /// Depth-first post-order over `graph`, restricted to `members`:
    /// providers are emitted before the modules that need them.
    fn post_order(
        graph: &BTreeMap<ModuleId, BTreeSet<ModuleId>>,
        members: &BTreeSet<ModuleId>,
        start: &ModuleId,
        seen: &mut BTreeSet<ModuleId>,
        order: &mut Vec<ModuleId>,
    ) {
        // (node, whether its providers are already on the stack)
        let mut stack = vec![(start, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node.clone());
                continue;
            }
            if !seen.insert(node.clone()) {
                continue;
            }
            stack.push((node, true));
            if let Some(providers) = graph.get(node) {
                stack.extend(
                    providers
                        .iter()
                        .rev()
                        .filter(|p| members.contains(*p) && !seen.contains(*p))
                        .map(|p| (p, false)),
                );
            }
        }
    }

    fn walk(graph: &BTreeMap<ModuleId, BTreeSet<ModuleId>>, start: &ModuleId) -> Vec<ModuleId> {
        let mut visited = BTreeSet::new();
        let mut order = Vec::new();
        visited.insert(start.clone());

        // Reverse-push so the smallest neighbor is popped first.
        let mut stack: Vec<&ModuleId> = graph
            .get(start)
            .map(|n| n.iter().rev().collect())
            .unwrap_or_default();

        while let Some(next) = stack.pop() {
            if !visited.insert(next.clone()) {
                continue;
            }
            order.push(next.clone());
            if let Some(neighbors) = graph.get(next) {
                stack.extend(neighbors.iter().rev().filter(|n| !visited.contains(*n)));
            }
        }
        order
    }
}
