//! Orchestrator - placement pass, then hashing pass
//!
//! Each pass snapshots the dependencies of the movable assets, peels them
//! into batches and moves the assets batch by batch. A cycle stops the pass
//! after the acyclic part has been moved; nothing is rolled back.

use tracing::{debug, info, warn};

use crate::asset::AssetId;
use crate::config::Options;
use crate::error::Result;
use crate::filter::is_movable;
use crate::fingerprint::HashingPolicy;
use crate::graph::AssetGraph;
use crate::mover::{move_asset, MoveOutcome, MovePolicy};
use crate::order::{generate_move_order, MoveOrder};
use crate::placement::PlacementPolicy;
use crate::report::{Pass, PassReport, Report, Warning};

/// Relocate and fingerprint every movable asset of `graph`.
///
/// Options are validated before the graph is touched; an invalid option
/// fails the call without any mutation.
pub fn process(graph: &mut AssetGraph, options: &Options) -> Result<Report> {
    let resolved = options.resolve(graph.root())?;
    let placement_policy = PlacementPolicy::new(resolved);

    let placement = run_pass(graph, Pass::Placement, &placement_policy)?;
    let hashing = run_pass(graph, Pass::Hashing, &HashingPolicy)?;

    Ok(Report { placement, hashing })
}

/// The batches a pass would process, without moving anything.
pub fn plan(graph: &AssetGraph) -> MoveOrder {
    generate_move_order(graph, is_movable)
}

/// Run one pass with a fresh dependency snapshot.
pub fn run_pass<P>(graph: &mut AssetGraph, pass: Pass, policy: &P) -> Result<PassReport>
where
    P: MovePolicy + ?Sized,
{
    let order = plan(graph);
    let mut report = PassReport::new(pass);
    report.batches = order.batches.len();

    let assets: Vec<AssetId> = order.assets().collect();
    for asset in assets {
        match move_asset(graph, asset, policy)? {
            MoveOutcome::Unchanged => {}
            MoveOutcome::Moved(moved) => {
                debug!(
                    "{}: {} -> {} ({} references)",
                    pass,
                    moved.from,
                    moved.to,
                    moved.retargeted.len()
                );
                report.moved.push(moved);
            }
            MoveOutcome::Conflict(conflict) => {
                warn!("{}: {}", pass, conflict);
                report.warnings.push(conflict);
            }
        }
    }

    if let Some(cycle) = order.cycle {
        let warning = Warning::CyclicDependency {
            assets: cycle.assets,
            relations: cycle.relations,
        };
        warn!("{}: {}", pass, warning);
        report.warnings.push(warning);
    }

    info!(
        "{} pass: {} moved in {} batches, {} warnings",
        pass,
        report.moved.len(),
        report.batches,
        report.warnings.len()
    );

    Ok(report)
}
