//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The distance-vector RIB (§4.F).
//!
//! Computes, for every router reachable from this router, the shortest-path
//! next hop by relaxing the union of the local neighbor-cost edges and
//! every received router's advertised edges, Bellman-Ford style, saturating
//! at [`Cost::INFINITE`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::debug::Debug;
use crate::name::Name;

/// A DV cost in `[0, CostInfinity]`. `CostInfinity` (16) represents
/// unreachable and is never installed as a RIB entry (§3, §8 invariant 2/3).
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct Cost(u8);

impl Cost {
    pub const INFINITE: u8 = 16;

    pub fn new(cost: u8) -> Option<Cost> {
        (cost < Self::INFINITE).then_some(Cost(cost))
    }

    pub const fn zero() -> Cost {
        Cost(0)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Adds two costs, saturating at [`Self::INFINITE`]. Returns `None` if
    /// the sum reaches or exceeds infinity (unreachable, §4.F).
    pub fn checked_add(&self, other: Cost) -> Option<Cost> {
        let sum = self.0.saturating_add(other.0);
        (sum < Self::INFINITE).then_some(Cost(sum))
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single RIB entry (§3).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RibEntry {
    pub next_hop: Name,
    pub cost: Cost,
    pub hops: u32,
}

/// A change to the RIB, reported to the forwarder client and the
/// prefix-table installer (§4.F "Change notification").
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RibChange {
    Installed(Name, RibEntry),
    Removed(Name),
}

/// The router's view of the network graph and its derived shortest-path
/// table.
#[derive(Debug, Default)]
pub struct Rib {
    self_name: Option<Name>,
    /// This router's directly-configured neighbor costs; only neighbors
    /// currently alive appear here (§4.F: "self's outgoing edges are
    /// local_neighbor_costs only").
    local_edges: BTreeMap<Name, Cost>,
    /// Advertised edge lists received from each router, keyed by the
    /// advertising router (§4.F).
    remote_edges: BTreeMap<Name, BTreeMap<Name, Cost>>,
    /// Routers currently known to be alive; a remote edge list whose
    /// advertiser isn't alive is ignored during relaxation.
    alive: BTreeMap<Name, bool>,
    table: BTreeMap<Name, RibEntry>,
}

impl Rib {
    pub fn new(self_name: Name) -> Rib {
        Rib {
            self_name: Some(self_name),
            ..Default::default()
        }
    }

    pub fn table(&self) -> &BTreeMap<Name, RibEntry> {
        &self.table
    }

    pub fn entry(&self, dest: &Name) -> Option<&RibEntry> {
        self.table.get(dest)
    }

    pub fn set_local_edge(&mut self, neighbor: Name, cost: Cost) {
        self.local_edges.insert(neighbor, cost);
        self.alive.insert(neighbor, true);
    }

    pub fn remove_local_edge(&mut self, neighbor: &Name) {
        self.local_edges.remove(neighbor);
        self.alive.remove(neighbor);
    }

    pub fn set_alive(&mut self, router: &Name, alive: bool) {
        if let Some(slot) = self.alive.get_mut(router) {
            *slot = alive;
        } else {
            self.alive.insert(router.clone(), alive);
        }
    }

    /// Replaces the full advertised-edge set received from `router` (§4.E
    /// "Output": validated advertisements replace any earlier entry).
    pub fn set_remote_edges(
        &mut self,
        router: Name,
        edges: BTreeMap<Name, Cost>,
    ) {
        self.remote_edges.insert(router, edges);
    }

    pub fn remove_remote_edges(&mut self, router: &Name) {
        self.remote_edges.remove(router);
    }

    /// Recomputes the RIB via Bellman-Ford relaxation and returns the diff
    /// against the previous table (§4.F "Change notification").
    pub fn recompute(&mut self) -> Vec<RibChange> {
        let self_name = match &self.self_name {
            Some(name) => name.clone(),
            None => return Vec::new(),
        };

        // Collect the vertex set: self, every alive local neighbor, and
        // every router we've heard an advertisement from.
        let mut vertices: Vec<Name> = vec![self_name.clone()];
        for name in self.local_edges.keys() {
            if !vertices.contains(name) {
                vertices.push(name.clone());
            }
        }
        for name in self.remote_edges.keys() {
            if !vertices.contains(name) {
                vertices.push(name.clone());
            }
        }

        // dist[v] = (cost from self, next hop toward v, hop count). The
        // next hop is propagated from the predecessor along the relaxed
        // edge: a direct neighbor of self is its own next hop, and every
        // other vertex inherits its predecessor's next hop.
        let mut dist: BTreeMap<Name, (Cost, Option<Name>, u32)> =
            BTreeMap::new();
        dist.insert(self_name.clone(), (Cost::zero(), None, 0));

        // Bellman-Ford: relax until a fixpoint or |V| rounds, whichever
        // comes first (§4.F).
        for _round in 0..vertices.len() {
            let mut changed = false;
            for u in &vertices {
                let Some((u_cost, u_next, u_hops)) = dist.get(u).cloned()
                else {
                    continue;
                };
                for (v, edge_cost) in self.edges_of(u) {
                    if !self.is_alive(&v) && v != self_name {
                        continue;
                    }
                    let Some(new_cost) = u_cost.checked_add(edge_cost) else {
                        continue;
                    };
                    // The next hop to reach `v` via `u`: if `u` is self,
                    // `v` itself is the next hop; otherwise inherit `u`'s
                    // next hop.
                    let candidate_next =
                        if u == &self_name { v.clone() } else { u_next.clone().expect("non-self vertex always has a next hop once reachable") };
                    let better = match dist.get(&v) {
                        None => true,
                        Some(&(cur_cost, ref cur_next, _)) => {
                            new_cost < cur_cost
                                || (new_cost == cur_cost
                                    && cur_next
                                        .as_ref()
                                        .is_some_and(|cur| &candidate_next < cur))
                        }
                    };
                    if better {
                        dist.insert(
                            v.clone(),
                            (new_cost, Some(candidate_next), u_hops + 1),
                        );
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let mut new_table = BTreeMap::new();
        for (dest, (cost, next_hop, hops)) in dist {
            if dest == self_name {
                continue;
            }
            let Some(next_hop) = next_hop else { continue };
            if !self.is_alive(&next_hop) {
                continue;
            }
            new_table.insert(dest, RibEntry {
                next_hop,
                cost,
                hops,
            });
        }

        let changes = self.diff(&new_table);
        self.table = new_table;
        Debug::RibRecompute(self.table.len()).log();
        changes
    }

    fn edges_of(&self, from: &Name) -> Vec<(Name, Cost)> {
        if Some(from) == self.self_name.as_ref() {
            self.local_edges
                .iter()
                .map(|(n, c)| (n.clone(), *c))
                .collect()
        } else {
            self.remote_edges
                .get(from)
                .map(|edges| {
                    edges.iter().map(|(n, c)| (n.clone(), *c)).collect()
                })
                .unwrap_or_default()
        }
    }

    fn is_alive(&self, router: &Name) -> bool {
        self.alive.get(router).copied().unwrap_or(false)
    }

    fn diff(&self, new_table: &BTreeMap<Name, RibEntry>) -> Vec<RibChange> {
        let mut changes = Vec::new();
        for (dest, new_entry) in new_table {
            match self.table.get(dest) {
                Some(old_entry) if old_entry == new_entry => {}
                _ => {
                    changes.push(RibChange::Installed(
                        dest.clone(),
                        new_entry.clone(),
                    ));
                }
            }
        }
        for dest in self.table.keys() {
            if !new_table.contains_key(dest) {
                changes.push(RibChange::Removed(dest.clone()));
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Component;

    fn router(name: &str) -> Name {
        Name::from_str_generic("/net").append_one(Component::generic(name))
    }

    #[test]
    fn two_node_convergence() {
        let mut rib = Rib::new(router("a"));
        rib.set_local_edge(router("b"), Cost::new(1).unwrap());
        let changes = rib.recompute();
        assert_eq!(
            changes,
            vec![RibChange::Installed(router("b"), RibEntry {
                next_hop: router("b"),
                cost: Cost::new(1).unwrap(),
                hops: 1,
            })]
        );
    }

    #[test]
    fn triangle_tie_break_prefers_lexicographically_smaller_next_hop() {
        // `a` reaches both `b` and `c` directly at cost 1, and `b`/`c` each
        // advertise a further router `d` at cost 1 — so `d` is reachable
        // from `a` at the same total cost (2) via either next hop.
        let mut rib = Rib::new(router("a"));
        rib.set_local_edge(router("b"), Cost::new(1).unwrap());
        rib.set_local_edge(router("c"), Cost::new(1).unwrap());
        rib.set_remote_edges(
            router("b"),
            BTreeMap::from([(router("d"), Cost::new(1).unwrap())]),
        );
        rib.set_remote_edges(
            router("c"),
            BTreeMap::from([(router("d"), Cost::new(1).unwrap())]),
        );
        rib.set_alive(&router("d"), true);
        rib.recompute();
        let entry = rib.entry(&router("d")).unwrap();
        assert_eq!(entry.next_hop, router("b"));
        assert_eq!(entry.cost.get(), 2);
    }

    #[test]
    fn cost_saturation_omits_unreachable_routers() {
        // Linear chain a-b-c-...-q (17 routers), unit edges.
        let names: Vec<Name> =
            ('a'..='q').map(|c| router(&c.to_string())).collect();
        let mut rib = Rib::new(names[0].clone());
        rib.set_local_edge(names[1].clone(), Cost::new(1).unwrap());
        for w in names.windows(2).skip(1) {
            let mut edges = BTreeMap::new();
            edges.insert(w[1].clone(), Cost::new(1).unwrap());
            rib.set_remote_edges(w[0].clone(), edges);
        }
        for name in &names[1..] {
            rib.set_alive(name, true);
        }
        rib.recompute();
        // Reachable within cost < 16: hops 1..=15 (names[1..=15]).
        for name in &names[1..=15] {
            assert!(rib.entry(name).is_some(), "{name} should be reachable");
        }
        for name in &names[16..] {
            assert!(rib.entry(name).is_none(), "{name} should be unreachable");
        }
    }

    #[test]
    fn neighbor_death_removes_dependent_entries() {
        let mut rib = Rib::new(router("a"));
        rib.set_local_edge(router("b"), Cost::new(1).unwrap());
        rib.set_remote_edges(
            router("b"),
            BTreeMap::from([(router("c"), Cost::new(1).unwrap())]),
        );
        rib.set_alive(&router("c"), true);
        rib.recompute();
        assert!(rib.entry(&router("c")).is_some());

        rib.remove_local_edge(&router("b"));
        rib.remove_remote_edges(&router("b"));
        let changes = rib.recompute();
        assert!(rib.entry(&router("b")).is_none());
        assert!(rib.entry(&router("c")).is_none());
        assert!(changes.contains(&RibChange::Removed(router("b"))));
        assert!(changes.contains(&RibChange::Removed(router("c"))));
    }
}
