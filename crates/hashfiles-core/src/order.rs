//! Move Order - dependency-aware batching of eligible assets
//!
//! Renaming an asset changes the bytes of every asset that references it, so
//! a file can only be hashed once everything it embeds has its final URL.
//! The order is computed in two steps:
//! - [`DependencySnapshot::capture`] records, once per pass, which eligible
//!   assets each eligible asset depends on (and through which relations)
//! - [`DependencySnapshot::peel`] repeatedly removes every asset whose
//!   remaining dependencies are all gone, yielding one batch per round
//!
//! When a round removes nothing, the remaining assets form one or more
//! cycles. They are reported, not broken.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::asset::AssetId;
use crate::graph::AssetGraph;
use crate::relation::{RelationId, RelationType, RelationView};

/// One edge of the snapshot: `relation` makes its owner depend on `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub relation: RelationId,
    pub target: AssetId,
}

/// Dependency sets of all eligible assets, frozen before a pass starts.
#[derive(Debug, Clone, Default)]
pub struct DependencySnapshot {
    dependencies: BTreeMap<AssetId, Vec<Dependency>>,
}

/// Eligible assets caught in a dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CyclicDependency {
    /// Assets left unprocessed.
    pub assets: BTreeSet<AssetId>,
    /// Relations between them that could not be resolved.
    pub relations: Vec<RelationId>,
}

/// Batches in processing order, plus the cycle that stopped the peel, if any.
#[derive(Debug, Clone, Default)]
pub struct MoveOrder {
    pub batches: Vec<BTreeSet<AssetId>>,
    pub cycle: Option<CyclicDependency>,
}

impl MoveOrder {
    /// All batched assets, batch by batch.
    pub fn assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.batches.iter().flat_map(|batch| batch.iter().copied())
    }
}

/// Relations that make `asset` depend on the target's final URL.
///
/// The source map `file` back-reference is skipped: the map names the file
/// it describes without embedding its content, and following it would turn
/// every script/map pair into a cycle.
fn is_content_dependency(asset: AssetId, relation: &RelationView, graph: &AssetGraph) -> bool {
    relation.relation_type != RelationType::SourceMapFile
        && relation.to != asset
        && !graph.asset(relation.to).is_inline()
}

/// Outgoing relations of `asset` and its inline descendants that point at
/// other file assets.
pub fn content_dependencies(graph: &AssetGraph, asset: AssetId) -> Vec<RelationView> {
    graph
        .outgoing_with_inline(asset)
        .into_iter()
        .filter(|relation| is_content_dependency(asset, relation, graph))
        .collect()
}

impl DependencySnapshot {
    /// Record the dependency sets of every file asset `is_eligible` accepts,
    /// restricted to eligible targets.
    pub fn capture<F>(graph: &AssetGraph, is_eligible: F) -> Self
    where
        F: Fn(&AssetGraph, AssetId) -> bool,
    {
        let eligible: BTreeSet<AssetId> = graph
            .file_assets()
            .filter(|&id| is_eligible(graph, id))
            .collect();

        let dependencies = eligible
            .iter()
            .map(|&asset| {
                let deps = content_dependencies(graph, asset)
                    .into_iter()
                    .filter(|relation| eligible.contains(&relation.to))
                    .map(|relation| Dependency {
                        relation: relation.id,
                        target: relation.to,
                    })
                    .collect();
                (asset, deps)
            })
            .collect();

        Self { dependencies }
    }

    /// Build a snapshot from explicit edges.
    pub fn from_edges(
        edges: impl IntoIterator<Item = (AssetId, Vec<Dependency>)>,
    ) -> Self {
        Self {
            dependencies: edges.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn contains(&self, asset: AssetId) -> bool {
        self.dependencies.contains_key(&asset)
    }

    /// Eligible assets `asset` depends on.
    pub fn dependencies(&self, asset: AssetId) -> impl Iterator<Item = AssetId> + '_ {
        self.dependencies
            .get(&asset)
            .into_iter()
            .flatten()
            .map(|dep| dep.target)
    }

    /// Peel the snapshot into batches, dependencies first.
    pub fn peel(&self) -> MoveOrder {
        let mut remaining: BTreeMap<AssetId, &[Dependency]> = self
            .dependencies
            .iter()
            .map(|(asset, deps)| (*asset, deps.as_slice()))
            .collect();
        let mut order = MoveOrder::default();

        while !remaining.is_empty() {
            let batch: BTreeSet<AssetId> = remaining
                .iter()
                .filter(|(_, deps)| !deps.iter().any(|dep| remaining.contains_key(&dep.target)))
                .map(|(asset, _)| *asset)
                .collect();

            if batch.is_empty() {
                let relations = remaining
                    .values()
                    .flat_map(|deps| deps.iter())
                    .filter(|dep| remaining.contains_key(&dep.target))
                    .map(|dep| dep.relation)
                    .collect();

                order.cycle = Some(CyclicDependency {
                    assets: remaining.keys().copied().collect(),
                    relations,
                });
                break;
            }

            for asset in &batch {
                remaining.remove(asset);
            }
            order.batches.push(batch);
        }

        order
    }
}

/// Snapshot the graph and compute the order for one pass.
pub fn generate_move_order<F>(graph: &AssetGraph, is_eligible: F) -> MoveOrder
where
    F: Fn(&AssetGraph, AssetId) -> bool,
{
    DependencySnapshot::capture(graph, is_eligible).peel()
}
