//! Site index, page statistics and rebuild scheduling for Mesh.
//!
//! A [`Site`] owns the current [`SiteIndex`] snapshot. Snapshots are built
//! by walking a [`ContentSource`](mesh_storage::ContentSource), are never
//! mutated after publication, and are replaced by swapping a single
//! reference. Requests take one `Arc<SiteIndex>` at the start and use it
//! throughout, so they see either the old or the new index, never a mix.
//!
//! Per-page hit counters ([`PageStats`]) are shared by reference between
//! consecutive snapshots, so rebuilding never resets them.
//!
//! # Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use mesh_site::{Site, SiteSettings};
//! use mesh_storage::FsSource;
//!
//! let source = Arc::new(FsSource::new(PathBuf::from("site")));
//! let site = Arc::new(Site::new(source, SiteSettings::default()));
//!
//! let index = site.rebuild_now();
//! for page in index.ranked() {
//!     println!("/{} {}", page.path, page.title);
//! }
//!
//! // Later, from request handling:
//! site.refresh_if_stale();
//! ```

mod clock;
mod crawler;
mod index;
mod locale;
mod rank;
mod record;
mod redirect;
mod settings;
mod site;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use index::SiteIndex;
pub use locale::{Language, parse_locale};
pub use rank::{PageScores, SiteInfo};
pub use record::PageRecord;
pub use settings::SiteSettings;
pub use site::Site;
pub use stats::PageStats;
