//! Navigation and route composition for Cartograph.
//!
//! Turns the configured content collections, sidebar specifications and
//! standalone pages into one validated [`SiteMap`]: a route table, one
//! navigation tree per section and previous/next sibling links.
//!
//! A build runs five stages in order and stops at the first one that
//! reports an error:
//!
//! 1. Scanning: load every collection into a [`Catalog`].
//! 2. Tree building: expand sidebar specifications into [`NavTree`]s.
//! 3. Resolving: assign every routable entity a unique path.
//! 4. Validating: check navigation links and cross-references.
//! 5. Assembling: produce the immutable [`SiteMap`].
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//! use std::sync::Arc;
//! use cartograph_config::Config;
//! use cartograph_site::Site;
//! use cartograph_storage::FsStorage;
//!
//! let config = Config::load(Some(Path::new("cartograph.toml")), None)?;
//! let site = Site::new(Arc::new(FsStorage::new()), Arc::new(config));
//!
//! let outcome = site.build();
//! for diagnostic in outcome.diagnostics() {
//!     eprintln!("{diagnostic}");
//! }
//! if let Some(site_map) = outcome.site_map() {
//!     println!("{}", site_map.to_json_pretty()?);
//! }
//! # Ok(())
//! # }
//! ```

mod build;
mod context;
mod diagnostics;
pub mod links;
pub mod navigation;
pub mod registry;
pub mod routes;
pub mod sidebar;
mod site;
pub mod sitemap;
pub mod slug;

pub use build::{BuildOutcome, build};
pub use context::{BuildContext, GenerationTicket, Rejected, Stage};
pub use diagnostics::{BuildError, Diagnostic, Severity, SourceLocation, error_count};
pub use navigation::{NavNode, NavNodeId, NavTree, SectionKind};
pub use registry::{Catalog, ContentId, ContentItem, ContentMetadata, ItemKind};
pub use routes::{RouteEntry, RouteKind, RouteTable, RouteTarget};
pub use site::Site;
pub use sitemap::{ContentSummary, Renderer, SiblingLinks, SiteMap};
