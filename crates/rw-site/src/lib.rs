//! Route resolution, data caching and build orchestration for RW sites.
//!
//! This crate provides:
//! - [`Route`]: single, bulk and catch-all route definitions with memoized data
//! - [`Site`]: lookup, rendering and whole-site builds over a set of routes
//! - [`RouteTable`]: the path-to-route lookup structure behind [`Site::lookup`]
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn run() -> Result<(), rw_site::SiteError> {
//! use rw_site::{Route, SiteBuilder};
//!
//! let site = SiteBuilder::<()>::default()
//!     .route(Route::page("/about", |cx| async move {
//!         Ok(format!("<h1>About</h1><p>{}</p>", cx.path))
//!     }))
//!     .build();
//!
//! // Dev server style: look up and render one path
//! let html = site.render(&site.lookup("/about")?).await?;
//!
//! // Build style: render every route and write it to `dist/`
//! let paths = site.build_all(None).await?;
//! # Ok(())
//! # }
//! ```

mod data_cache;
mod error;
pub mod path;
mod route;
mod route_table;
mod site;
mod write;

pub use data_cache::{CacheState, DataCache, Pending};
pub use error::{BoxError, SiteError};
pub use route::{BulkData, RenderContext, Routable, Route};
pub use route_table::{Params, RouteTable, TableMatch};
pub use site::{DEFAULT_OUT_DIR, RouteMatch, Site, SiteBuilder};
