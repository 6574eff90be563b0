//! Asset Graph - petgraph-based store of assets and the references between them
//!
//! Nodes are assets, edges are relations. Each relation is also a reference
//! chunk in its source asset's content, so serializing an asset renders the
//! current URL of everything it references. Renaming an asset therefore
//! changes the bytes (and digest) of every asset pointing at it without any
//! explicit rewrite step.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::path::Path;
use url::{Position, Url};

use crate::asset::{Asset, AssetId, AssetSpec, Chunk};
use crate::error::{Error, Result};
use crate::hasher::ContentDigest;
use crate::relation::{ReferenceStyle, Relation, RelationId, RelationType, RelationView};

/// In-memory build graph rooted at a directory URL.
#[derive(Debug)]
pub struct AssetGraph {
    root: Url,
    graph: StableDiGraph<Asset, Relation>,
    by_url: HashMap<Url, AssetId>,
}

impl AssetGraph {
    /// Create an empty graph. `root` is a directory URL (`file:///site/`) or
    /// an absolute filesystem path.
    pub fn new(root: &str) -> Result<Self> {
        let mut root_url = match Url::parse(root) {
            Ok(url) => url,
            Err(_) => Url::from_directory_path(Path::new(root))
                .map_err(|_| Error::InvalidRoot(root.to_string()))?,
        };

        if root_url.cannot_be_a_base() {
            return Err(Error::InvalidRoot(root.to_string()));
        }
        if !root_url.path().ends_with('/') {
            let path = format!("{}/", root_url.path());
            root_url.set_path(&path);
        }
        root_url.set_query(None);
        root_url.set_fragment(None);

        Ok(Self {
            root: root_url,
            graph: StableDiGraph::new(),
            by_url: HashMap::new(),
        })
    }

    /// Create an empty graph rooted at a filesystem directory.
    pub fn with_root_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let url = Url::from_directory_path(dir)
            .map_err(|_| Error::InvalidRoot(dir.display().to_string()))?;
        Self::new(url.as_str())
    }

    /// The build root, always ending in `/`.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Resolve a URL reference against the root.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.root.join(url).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }

    /// True when `url` lives inside the build root.
    pub fn is_under_root(&self, url: &Url) -> bool {
        url.as_str().starts_with(self.root.as_str())
    }

    /// Add an asset. File assets must have a URL that no other file asset uses.
    pub fn add_asset(&mut self, spec: AssetSpec) -> Result<AssetId> {
        let url = match spec.url.as_deref() {
            Some("") => return Err(Error::MissingUrl),
            Some(url) => Some(self.resolve(url)?),
            None => None,
        };

        if let Some(url) = &url {
            if self.by_url.contains_key(url) {
                return Err(Error::UrlInUse(url.clone()));
            }
        }

        let mut content = Vec::new();
        if !spec.body.is_empty() {
            content.push(Chunk::Raw(spec.body));
        }

        let idx = self.graph.add_node(Asset {
            url: url.clone(),
            asset_type: spec.asset_type,
            is_loaded: spec.is_loaded,
            is_redirect: spec.is_redirect,
            is_fragment: spec.is_fragment,
            is_initial: spec.is_initial,
            parent: None,
            content,
            dirty: false,
        });
        let id = AssetId(idx.index());

        if let Some(url) = url {
            self.by_url.insert(url, id);
        }

        Ok(id)
    }

    /// Add a relation with the default (relative) reference style.
    pub fn add_relation(
        &mut self,
        from: AssetId,
        to: AssetId,
        relation_type: RelationType,
    ) -> RelationId {
        self.add_relation_with(from, to, relation_type, ReferenceStyle::default())
    }

    /// Add a relation; its reference is appended to the source's content.
    ///
    /// The first relation pointing at an inline asset makes its source the
    /// inline asset's parent.
    pub fn add_relation_with(
        &mut self,
        from: AssetId,
        to: AssetId,
        relation_type: RelationType,
        reference_style: ReferenceStyle,
    ) -> RelationId {
        let edge = self.graph.add_edge(
            node(from),
            node(to),
            Relation {
                relation_type,
                reference_style,
                cross_origin: false,
            },
        );
        let id = RelationId(edge.index());

        self.graph[node(from)].content.push(Chunk::Reference(id));

        let target = &mut self.graph[node(to)];
        if target.is_inline() && target.parent.is_none() && from != to {
            target.parent = Some(from);
        }

        id
    }

    /// Append literal bytes to an asset's content.
    pub fn push_text(&mut self, id: AssetId, text: impl AsRef<[u8]>) {
        let content = &mut self.graph[node(id)].content;
        match content.last_mut() {
            Some(Chunk::Raw(bytes)) => bytes.extend_from_slice(text.as_ref()),
            _ => content.push(Chunk::Raw(text.as_ref().to_vec())),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Panics if `id` does not belong to this graph.
    pub fn asset(&self, id: AssetId) -> &Asset {
        &self.graph[node(id)]
    }

    /// Panics if `id` does not belong to this graph.
    pub fn relation(&self, id: RelationId) -> RelationView {
        let edge = EdgeIndex::new(id.0);
        let (from, to) = self
            .graph
            .edge_endpoints(edge)
            .expect("relation id from another graph");
        let relation = &self.graph[edge];
        RelationView {
            id,
            from: AssetId(from.index()),
            to: AssetId(to.index()),
            relation_type: relation.relation_type,
            reference_style: relation.reference_style,
            cross_origin: relation.cross_origin,
        }
    }

    /// All assets in insertion order.
    pub fn assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.graph.node_indices().map(|idx| AssetId(idx.index()))
    }

    /// All non-inline assets in insertion order.
    pub fn file_assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.assets().filter(|&id| !self.asset(id).is_inline())
    }

    pub fn find_assets(&self, predicate: impl Fn(&Asset) -> bool) -> Vec<AssetId> {
        self.assets().filter(|&id| predicate(self.asset(id))).collect()
    }

    /// Look up a file asset by URL (resolved against the root).
    pub fn find_by_url(&self, url: &str) -> Option<AssetId> {
        let url = self.resolve(url).ok()?;
        self.by_url.get(&url).copied()
    }

    pub fn asset_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Relations pointing at `id`, ordered by id.
    pub fn incoming(&self, id: AssetId) -> Vec<RelationView> {
        let mut relations: Vec<RelationView> = self
            .graph
            .edges_directed(node(id), Direction::Incoming)
            .map(|edge| self.relation(RelationId(edge.id().index())))
            .collect();
        relations.sort_by_key(|relation| relation.id);
        relations
    }

    /// Relations from `id`'s own content, in content order.
    pub fn outgoing(&self, id: AssetId) -> Vec<RelationView> {
        self.asset(id)
            .content
            .iter()
            .filter_map(|chunk| match chunk {
                Chunk::Reference(rel) => Some(self.relation(*rel)),
                Chunk::Raw(_) => None,
            })
            .collect()
    }

    /// Inline assets owned by `id`, transitively, in post-order.
    pub fn inline_descendants(&self, id: AssetId) -> Vec<AssetId> {
        let mut found = Vec::new();
        self.collect_inline(id, &mut found);
        found
    }

    fn collect_inline(&self, id: AssetId, found: &mut Vec<AssetId>) {
        for relation in self.outgoing(id) {
            let target = self.asset(relation.to);
            if target.is_inline() && target.parent == Some(id) && !found.contains(&relation.to) {
                self.collect_inline(relation.to, found);
                found.push(relation.to);
            }
        }
    }

    /// Relations from `id` and all of its inline descendants.
    pub fn outgoing_with_inline(&self, id: AssetId) -> Vec<RelationView> {
        let mut relations = self.outgoing(id);
        for inline in self.inline_descendants(id) {
            relations.extend(self.outgoing(inline));
        }
        relations
    }

    /// Nearest file-level asset owning `id` (itself if not inline).
    pub fn non_inline_ancestor(&self, id: AssetId) -> Option<AssetId> {
        let mut current = id;
        // Bounded by the node count so a malformed parent chain cannot loop.
        for _ in 0..=self.graph.node_count() {
            let asset = self.asset(current);
            if !asset.is_inline() {
                return Some(current);
            }
            current = asset.parent?;
        }
        None
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Rename a file asset.
    ///
    /// Every relation pointing at the asset follows it automatically; their
    /// ids are returned and their owning files are marked dirty.
    pub fn set_url(&mut self, id: AssetId, url: Url) -> Result<Vec<RelationId>> {
        if let Some(&holder) = self.by_url.get(&url) {
            if holder != id {
                return Err(Error::UrlInUse(url));
            }
        }

        let old = self.graph[node(id)].url.replace(url.clone());
        if let Some(old) = old {
            self.by_url.remove(&old);
        }
        self.by_url.insert(url, id);
        self.mark_dirty(id);

        let incoming = self.incoming(id);
        for relation in &incoming {
            self.mark_dirty(relation.from);
        }

        Ok(incoming.into_iter().map(|relation| relation.id).collect())
    }

    pub fn set_reference_style(&mut self, id: RelationId, style: ReferenceStyle) {
        self.graph[EdgeIndex::new(id.0)].reference_style = style;
    }

    pub fn set_cross_origin(&mut self, id: RelationId, cross_origin: bool) {
        self.graph[EdgeIndex::new(id.0)].cross_origin = cross_origin;
    }

    /// Mark the file owning `id` as needing re-serialization.
    pub fn mark_dirty(&mut self, id: AssetId) {
        if let Some(owner) = self.non_inline_ancestor(id) {
            self.graph[node(owner)].dirty = true;
        }
    }

    /// File assets marked dirty, clearing the marker.
    pub fn take_dirty(&mut self) -> Vec<AssetId> {
        let dirty: Vec<AssetId> = self.find_assets(Asset::is_dirty);
        for &id in &dirty {
            self.graph[node(id)].dirty = false;
        }
        dirty
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// The href a relation renders, or `None` for inline targets.
    pub fn href(&self, id: RelationId) -> Option<String> {
        let relation = self.relation(id);
        let target = self.asset(relation.to).url()?;
        let base = self
            .non_inline_ancestor(relation.from)
            .and_then(|owner| self.asset(owner).url())
            .unwrap_or(&self.root);

        Some(self.render_href(base, target, relation.reference_style))
    }

    fn render_href(&self, base: &Url, target: &Url, style: ReferenceStyle) -> String {
        match style {
            ReferenceStyle::Relative => base
                .make_relative(target)
                .filter(|href| !href.is_empty())
                .unwrap_or_else(|| target.to_string()),
            ReferenceStyle::RootRelative if self.is_under_root(target) => {
                format!("/{}", &target.as_str()[self.root.as_str().len()..])
            }
            ReferenceStyle::RootRelative | ReferenceStyle::Absolute => target.to_string(),
            ReferenceStyle::ProtocolRelative => {
                format!("//{}", &target[Position::BeforeUsername..])
            }
        }
    }

    /// Current serialized bytes of an asset, inline children included.
    pub fn serialize(&self, id: AssetId) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_content(id, &mut out);
        out
    }

    /// Serialized content as (lossy) UTF-8.
    pub fn text(&self, id: AssetId) -> String {
        String::from_utf8_lossy(&self.serialize(id)).into_owned()
    }

    fn write_content(&self, id: AssetId, out: &mut Vec<u8>) {
        for chunk in &self.asset(id).content {
            match chunk {
                Chunk::Raw(bytes) => out.extend_from_slice(bytes),
                Chunk::Reference(rel) => self.write_reference(*rel, out),
            }
        }
    }

    fn write_reference(&self, id: RelationId, out: &mut Vec<u8>) {
        let relation = self.relation(id);
        let target = self.asset(relation.to);

        if target.is_inline() {
            if target.parent == Some(relation.from) {
                let (open, close) = relation.relation_type.inline_wrapper();
                out.extend_from_slice(open.as_bytes());
                self.write_content(relation.to, out);
                out.extend_from_slice(close.as_bytes());
            }
        } else if let Some(href) = self.href(id) {
            let rendered = relation.relation_type.render(&href, relation.cross_origin);
            out.extend_from_slice(rendered.as_bytes());
        }
    }

    /// Digest of the current serialized bytes.
    pub fn content_digest(&self, id: AssetId) -> ContentDigest {
        ContentDigest::of(&self.serialize(id))
    }
}

fn node(id: AssetId) -> NodeIndex {
    NodeIndex::new(id.0)
}
