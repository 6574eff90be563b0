//! Fingerprint - second pass: content-addressed file names
//!
//! `main.js` becomes `main.0123456789.js`, where the ten hex characters are
//! the start of the digest of the asset's serialized bytes. By the time this
//! pass runs, placement has fixed every URL the asset embeds.

use crate::asset::{Asset, AssetId};
use crate::graph::AssetGraph;
use crate::hasher::ContentDigest;
use crate::mover::MovePolicy;

/// `{base}.{fingerprint}{ext}{query_and_fragment}` for an asset with the
/// given digest.
pub fn hashed_file_name(asset: &Asset, digest: &ContentDigest) -> String {
    format!(
        "{}.{}{}{}",
        asset.base_name(),
        digest.fingerprint(),
        asset.extension(),
        asset.query_and_fragment()
    )
}

/// New-URL producer for the hashing pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashingPolicy;

impl MovePolicy for HashingPolicy {
    fn new_url(&self, graph: &AssetGraph, id: AssetId) -> Option<String> {
        let asset = graph.asset(id);
        asset.url()?;

        // "./" keeps a colon in the name from being read as a scheme.
        Some(format!(
            "./{}",
            hashed_file_name(asset, &graph.content_digest(id))
        ))
    }
}
