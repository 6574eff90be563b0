//! Eligibility - which assets may be renamed or relocated
//!
//! Rules are small predicates over an [`AssetView`], combined with
//! [`and`], [`or`] and [`not`]. The first rule that matches pins the asset
//! in place; an asset no rule matches is movable.

use serde::Serialize;
use std::fmt;

use crate::asset::{Asset, AssetId, AssetType};
use crate::graph::AssetGraph;
use crate::relation::{RelationType, RelationView};

/// Types that are never renamed: their URLs are published contracts.
pub const FIXED_TYPES: &[AssetType] = &[
    AssetType::CacheManifest,
    AssetType::Rss,
    AssetType::Atom,
];

/// File names crawlers and servers look up at well-known locations.
pub const RESERVED_FILE_NAMES: &[&str] = &[".htaccess", "humans.txt", "robots.txt"];

/// An asset together with the graph facts the rules look at.
pub struct AssetView<'a> {
    graph: &'a AssetGraph,
    id: AssetId,
    incoming: Vec<RelationView>,
}

impl<'a> AssetView<'a> {
    pub fn new(graph: &'a AssetGraph, id: AssetId) -> Self {
        Self {
            graph,
            id,
            incoming: graph.incoming(id),
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn asset(&self) -> &'a Asset {
        self.graph.asset(self.id)
    }

    pub fn graph(&self) -> &'a AssetGraph {
        self.graph
    }

    pub fn incoming(&self) -> &[RelationView] {
        &self.incoming
    }
}

// =============================================================================
// Predicate combinators
// =============================================================================

pub fn and<P, Q>(p: P, q: Q) -> impl Fn(&AssetView<'_>) -> bool
where
    P: Fn(&AssetView<'_>) -> bool,
    Q: Fn(&AssetView<'_>) -> bool,
{
    move |view: &AssetView<'_>| p(view) && q(view)
}

pub fn or<P, Q>(p: P, q: Q) -> impl Fn(&AssetView<'_>) -> bool
where
    P: Fn(&AssetView<'_>) -> bool,
    Q: Fn(&AssetView<'_>) -> bool,
{
    move |view: &AssetView<'_>| p(view) || q(view)
}

pub fn not<P>(p: P) -> impl Fn(&AssetView<'_>) -> bool
where
    P: Fn(&AssetView<'_>) -> bool,
{
    move |view: &AssetView<'_>| !p(view)
}

/// Asset type is one of `types`.
pub fn of_type(types: &'static [AssetType]) -> impl Fn(&AssetView<'_>) -> bool {
    move |view: &AssetView<'_>| view.asset().asset_type().is_in(types)
}

/// At least one incoming relation has a type in `types`.
pub fn any_incoming(types: &'static [RelationType]) -> impl Fn(&AssetView<'_>) -> bool {
    move |view: &AssetView<'_>| {
        view.incoming()
            .iter()
            .any(|relation| relation.relation_type.is_in(types))
    }
}

/// Every incoming relation has a type in `types`; true when there are none.
pub fn all_incoming(types: &'static [RelationType]) -> impl Fn(&AssetView<'_>) -> bool {
    move |view: &AssetView<'_>| {
        view.incoming()
            .iter()
            .all(|relation| relation.relation_type.is_in(types))
    }
}

pub fn is_referenced(view: &AssetView<'_>) -> bool {
    !view.incoming().is_empty()
}

pub fn is_initial(view: &AssetView<'_>) -> bool {
    view.asset().is_initial()
}

pub fn is_fragment(view: &AssetView<'_>) -> bool {
    view.asset().is_fragment()
}

// =============================================================================
// Rules
// =============================================================================

/// Why an asset has to keep its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixedReason {
    NotLoaded,
    Redirect,
    Inline,
    FixedType,
    ReservedName,
    Favicon,
    Worker,
    NavigationTarget,
    Entrypoint,
    HintsOnly,
}

impl fmt::Display for FixedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FixedReason::NotLoaded => "not loaded",
            FixedReason::Redirect => "redirect",
            FixedReason::Inline => "inline",
            FixedReason::FixedType => "cache manifest or feed",
            FixedReason::ReservedName => "well-known file name",
            FixedReason::Favicon => "root favicon",
            FixedReason::Worker => "service worker or web worker script",
            FixedReason::NavigationTarget => "linked page",
            FixedReason::Entrypoint => "entrypoint",
            FixedReason::HintsOnly => "only referenced by resource hints",
        };
        f.write_str(reason)
    }
}

type Rule = (FixedReason, fn(&AssetView<'_>) -> bool);

const RULES: &[Rule] = &[
    (FixedReason::NotLoaded, not_loaded),
    (FixedReason::Redirect, redirect),
    (FixedReason::Inline, inline),
    (FixedReason::FixedType, fixed_type),
    (FixedReason::ReservedName, reserved_name),
    (FixedReason::Favicon, root_favicon),
    (FixedReason::Worker, worker_script),
    (FixedReason::NavigationTarget, navigation_target),
    (FixedReason::Entrypoint, entrypoint),
    (FixedReason::HintsOnly, hints_only),
];

fn not_loaded(view: &AssetView<'_>) -> bool {
    !view.asset().is_loaded()
}

fn redirect(view: &AssetView<'_>) -> bool {
    view.asset().is_redirect()
}

fn inline(view: &AssetView<'_>) -> bool {
    view.asset().is_inline()
}

fn fixed_type(view: &AssetView<'_>) -> bool {
    of_type(FIXED_TYPES)(view)
}

fn reserved_name(view: &AssetView<'_>) -> bool {
    RESERVED_FILE_NAMES.contains(&view.asset().file_name())
}

fn root_favicon(view: &AssetView<'_>) -> bool {
    let favicon = view.graph().root().join("favicon.ico").ok();
    view.asset().url() == favicon.as_ref()
}

/// Service workers must be served from the origin under a stable name.
fn worker_script(view: &AssetView<'_>) -> bool {
    and(
        of_type(&[AssetType::JavaScript]),
        any_incoming(RelationType::WORKER_REGISTRATIONS),
    )(view)
}

fn navigation_target(view: &AssetView<'_>) -> bool {
    and(
        of_type(&[AssetType::Html]),
        any_incoming(RelationType::NAVIGATIONS),
    )(view)
}

/// Referenced markup fragments are templates, movable even if loaded directly.
fn entrypoint(view: &AssetView<'_>) -> bool {
    let template = and(of_type(&[AssetType::Html]), and(is_fragment, is_referenced));
    and(is_initial, not(template))(view)
}

/// Something we cannot see may load it by its current URL.
fn hints_only(view: &AssetView<'_>) -> bool {
    all_incoming(RelationType::RESOURCE_HINTS)(view)
}

/// First rule pinning the asset in place, or `None` if it is movable.
pub fn fixed_reason(graph: &AssetGraph, id: AssetId) -> Option<FixedReason> {
    let view = AssetView::new(graph, id);
    RULES
        .iter()
        .find(|(_, rule)| rule(&view))
        .map(|(reason, _)| *reason)
}

/// True when the asset may be renamed or relocated.
pub fn is_movable(graph: &AssetGraph, id: AssetId) -> bool {
    fixed_reason(graph, id).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetSpec;

    struct Site {
        graph: AssetGraph,
        index: AssetId,
    }

    impl Site {
        fn new() -> Self {
            let mut graph = AssetGraph::new("file:///site/").unwrap();
            let index = graph
                .add_asset(AssetSpec::file("index.html", AssetType::Html).initial())
                .unwrap();
            Self { graph, index }
        }

        fn referenced(&mut self, spec: AssetSpec, via: RelationType) -> AssetId {
            let id = self.graph.add_asset(spec).unwrap();
            self.graph.add_relation(self.index, id, via);
            id
        }

        fn reason(&self, id: AssetId) -> Option<FixedReason> {
            fixed_reason(&self.graph, id)
        }
    }

    #[test]
    fn test_referenced_script_is_movable() {
        let mut site = Site::new();
        let js = site.referenced(
            AssetSpec::file("main.js", AssetType::JavaScript),
            RelationType::HtmlScript,
        );
        assert!(is_movable(&site.graph, js));
        assert_eq!(site.reason(site.index), Some(FixedReason::Entrypoint));
    }

    #[test]
    fn test_basic_exclusions() {
        let mut site = Site::new();
        let external = site.referenced(
            AssetSpec::file("https://example.com/lib.js", AssetType::JavaScript).unloaded(),
            RelationType::HtmlScript,
        );
        let redirect = site.referenced(
            AssetSpec::file("old.html", AssetType::Html).redirect(),
            RelationType::HtmlIFrame,
        );
        let inline = site.referenced(AssetSpec::inline(AssetType::Css), RelationType::HtmlStyle);
        let feed = site.referenced(
            AssetSpec::file("rss.xml", AssetType::Rss),
            RelationType::Other,
        );
        let appcache = site.referenced(
            AssetSpec::file("site.appcache", AssetType::CacheManifest),
            RelationType::Other,
        );
        let robots = site.referenced(
            AssetSpec::file("robots.txt", AssetType::Text),
            RelationType::Other,
        );
        let favicon = site.referenced(
            AssetSpec::file("favicon.ico", AssetType::Image),
            RelationType::Other,
        );
        let nested_favicon = site.referenced(
            AssetSpec::file("img/favicon.ico", AssetType::Image),
            RelationType::Other,
        );

        assert_eq!(site.reason(external), Some(FixedReason::NotLoaded));
        assert_eq!(site.reason(redirect), Some(FixedReason::Redirect));
        assert_eq!(site.reason(inline), Some(FixedReason::Inline));
        assert_eq!(site.reason(feed), Some(FixedReason::FixedType));
        assert_eq!(site.reason(appcache), Some(FixedReason::FixedType));
        assert_eq!(site.reason(robots), Some(FixedReason::ReservedName));
        assert_eq!(site.reason(favicon), Some(FixedReason::Favicon));
        assert_eq!(site.reason(nested_favicon), None);
    }

    #[test]
    fn test_workers_stay_put() {
        let mut site = Site::new();
        let sw = site.referenced(
            AssetSpec::file("sw.js", AssetType::JavaScript),
            RelationType::HtmlServiceWorkerRegistration,
        );
        let worker = site.referenced(
            AssetSpec::file("worker.js", AssetType::JavaScript),
            RelationType::JavaScriptWebWorker,
        );
        assert_eq!(site.reason(sw), Some(FixedReason::Worker));
        assert_eq!(site.reason(worker), Some(FixedReason::Worker));
    }

    #[test]
    fn test_linked_pages_stay_put() {
        let mut site = Site::new();
        let page = site.referenced(
            AssetSpec::file("about.html", AssetType::Html),
            RelationType::HtmlAnchor,
        );
        let frame = site.referenced(
            AssetSpec::file("frame.html", AssetType::Html),
            RelationType::HtmlIFrame,
        );
        assert_eq!(site.reason(page), Some(FixedReason::NavigationTarget));
        assert_eq!(site.reason(frame), None);
    }

    #[test]
    fn test_referenced_fragment_entrypoint_is_template() {
        let mut site = Site::new();
        let template = site.referenced(
            AssetSpec::file("main.tpl.html", AssetType::Html).initial().fragment(),
            RelationType::Other,
        );
        let lonely = site
            .graph
            .add_asset(AssetSpec::file("lonely.tpl.html", AssetType::Html).initial().fragment())
            .unwrap();
        let image = site.referenced(
            AssetSpec::file("turtle.jpg", AssetType::Image).initial(),
            RelationType::HtmlImage,
        );

        assert_eq!(site.reason(template), None);
        assert_eq!(site.reason(lonely), Some(FixedReason::Entrypoint));
        assert_eq!(site.reason(image), Some(FixedReason::Entrypoint));
    }

    #[test]
    fn test_hint_only_assets_stay_put() {
        let mut site = Site::new();
        let hinted = site.referenced(
            AssetSpec::file("page-data.json", AssetType::Json),
            RelationType::HtmlPreloadLink,
        );
        let used = site.referenced(
            AssetSpec::file("page-data-2.json", AssetType::Json),
            RelationType::HtmlPrefetchLink,
        );
        site.graph
            .add_relation(site.index, used, RelationType::JavaScriptStaticUrl);
        let orphan = site
            .graph
            .add_asset(AssetSpec::file("orphan.css", AssetType::Css))
            .unwrap();

        assert_eq!(site.reason(hinted), Some(FixedReason::HintsOnly));
        assert_eq!(site.reason(used), None);
        assert_eq!(site.reason(orphan), Some(FixedReason::HintsOnly));
    }

    #[test]
    fn test_combinators() {
        let site = Site::new();
        let view = AssetView::new(&site.graph, site.index);
        let html = of_type(&[AssetType::Html]);
        let css = of_type(&[AssetType::Css]);

        assert!(or(&html, &css)(&view));
        assert!(!and(&html, &css)(&view));
        assert!(not(&css)(&view));
        assert!(!is_referenced(&view));
        assert!(is_initial(&view));
    }
}
