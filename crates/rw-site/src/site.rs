//! Site orchestration: lookup, rendering, writing and cache invalidation.
//!
//! [`Site`] owns the registered routes, the cached global data and the cached
//! [`RouteTable`]. It is the programmatic surface used by the CLI (`build`)
//! and by development servers (`lookup` + `render` + `clear_cache`).
//!
//! # Caching
//!
//! - Global data is computed by the site's global data function at most once
//!   per cache lifetime and shared by every route.
//! - The route table is built lazily on first lookup and reused until
//!   [`Site::clear_cache`].
//! - Each route caches its own data; [`Site::clear_cache`] can cascade to it.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> Result<(), rw_site::SiteError> {
//! use rw_site::{BulkData, Route, SiteBuilder};
//!
//! let site = SiteBuilder::<()>::default()
//!     .route(Route::single(
//!         "/",
//!         |_| async { Ok("index".to_owned()) },
//!         |cx| async move { Ok(format!("<h1>{}</h1>", cx.data)) },
//!     ))
//!     .route(Route::bulk(
//!         "/posts/:slug",
//!         |_| async { Ok(BulkData::from([("/posts/hello".to_owned(), "Hello".to_owned())])) },
//!         |cx| async move { Ok(format!("<p>{}</p>", cx.data)) },
//!     ))
//!     .build();
//!
//! let matched = site.lookup("/posts/hello")?;
//! let html = site.render(&matched).await?;
//! let built = site.build_all(None).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, try_join_all};

use crate::data_cache::{CacheState, DataCache, Pending};
use crate::error::{BoxError, SiteError};
use crate::route::{BulkData, Routable, Route};
use crate::route_table::{Params, RouteTable};
use crate::write::write_files;

/// Default output directory for [`Site::write_all`] and [`Site::build_all`].
pub const DEFAULT_OUT_DIR: &str = "dist";

type GlobalDataFn<G> = Box<dyn Fn() -> BoxFuture<'static, Result<G, BoxError>> + Send + Sync>;

/// Route resolved by [`Site::lookup`].
pub struct RouteMatch<G> {
    /// Requested path.
    pub path: String,
    /// Named parameters bound by the route pattern.
    pub params: Params,
    /// Route responsible for the path.
    pub route: Arc<dyn Routable<G>>,
}

impl<G> Clone for RouteMatch<G> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            params: self.params.clone(),
            route: Arc::clone(&self.route),
        }
    }
}

impl<G> std::fmt::Debug for RouteMatch<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("pattern", &self.route.pattern())
            .finish()
    }
}

/// Builder for [`Site`].
pub struct SiteBuilder<G> {
    routes: Vec<Arc<dyn Routable<G>>>,
    global_data: GlobalDataFn<G>,
    out_dir: PathBuf,
}

impl<G: Default + Send + Sync + 'static> Default for SiteBuilder<G> {
    /// Builder whose global data is `G::default()`.
    fn default() -> Self {
        Self::new(|| async { Ok(G::default()) })
    }
}

impl<G: Send + Sync + 'static> SiteBuilder<G> {
    /// Create a builder with the function computing site-wide data.
    pub fn new<F, Fut>(global_data: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<G, BoxError>> + Send + 'static,
    {
        Self {
            routes: Vec::new(),
            global_data: Box::new(move || global_data().boxed()),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }

    /// Register a route. Registration order decides lookup and output
    /// collisions: earlier routes win.
    #[must_use]
    pub fn route<D: Send + Sync + 'static>(self, route: Route<G, D>) -> Self {
        self.routable(Arc::new(route))
    }

    /// Register an already type-erased route.
    #[must_use]
    pub fn routable(mut self, route: Arc<dyn Routable<G>>) -> Self {
        self.routes.push(route);
        self
    }

    /// Default output directory (default: `dist`).
    #[must_use]
    pub fn out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    /// Build the site.
    #[must_use]
    pub fn build(self) -> Site<G> {
        tracing::debug!(routes = self.routes.len(), "created site");
        Site {
            routes: self.routes,
            global_data_fn: self.global_data,
            global_data: DataCache::new(),
            route_table: Mutex::new(None),
            out_dir: self.out_dir,
        }
    }
}

/// A set of routes ready to be looked up, rendered and built.
///
/// # Thread Safety
///
/// All caches sit behind internal locks that are never held across an
/// `.await`, so a `Site` can be shared (e.g. in an `Arc`) between concurrent
/// renders.
pub struct Site<G> {
    routes: Vec<Arc<dyn Routable<G>>>,
    global_data_fn: GlobalDataFn<G>,
    global_data: DataCache<G>,
    route_table: Mutex<Option<Arc<RouteTable>>>,
    out_dir: PathBuf,
}

impl<G: Send + Sync + 'static> Site<G> {
    /// Registered routes in registration order.
    pub fn routes(&self) -> &[Arc<dyn Routable<G>>] {
        &self.routes
    }

    /// Default output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Look up the route responsible for `path`.
    ///
    /// # Errors
    ///
    /// Returns `SiteError::NotFound` (no cause) when no route matches.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub fn lookup(&self, path: &str) -> Result<RouteMatch<G>, SiteError> {
        let matched = self.route_table().lookup(path);

        let Some((table_match, route)) = matched
            .and_then(|m| self.routes.get(m.index).map(|route| (m, Arc::clone(route))))
        else {
            tracing::debug!(path, "not found");
            return Err(SiteError::not_found(path));
        };

        Ok(RouteMatch {
            path: path.to_owned(),
            params: table_match.params,
            route,
        })
    }

    /// Render a match returned by [`Site::lookup`].
    ///
    /// # Errors
    ///
    /// A `SiteError::NotFound` raised while rendering passes through as-is
    /// (404). Any other failure of the route is wrapped in
    /// `SiteError::NotFound` with the failure attached as its cause (500).
    /// A global data failure is returned unwrapped.
    pub async fn render(&self, matched: &RouteMatch<G>) -> Result<String, SiteError> {
        tracing::debug!(path = %matched.path, "rendering");

        let global_data = self.global_data().await?;
        let result = matched
            .route
            .render(matched.path.clone(), matched.params.clone(), global_data)
            .await;

        match result {
            Ok(content) => {
                tracing::debug!(path = %matched.path, "rendered");
                Ok(content)
            }
            Err(e) if e.is_not_found() => Err(e),
            Err(e) => {
                tracing::debug!(path = %matched.path, error = %e, "could not render");
                Err(SiteError::render_failed(matched.path.clone(), e))
            }
        }
    }

    /// Render every route, keyed by concrete path.
    ///
    /// Routes render concurrently. When two routes produce the same path,
    /// the earlier registered route wins and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any route, unmodified; no partial result
    /// is returned.
    pub async fn render_all(&self) -> Result<BulkData<String>, SiteError> {
        tracing::debug!("rendering all files");
        let global_data = self.global_data().await?;

        let renders = self.routes.iter().map(|route| {
            let global_data = Arc::clone(&global_data);
            async move {
                route.render_all(global_data).await.inspect_err(|e| {
                    tracing::error!(pattern = %route.pattern(), error = %e, "failed to build");
                })
            }
        });
        let rendered = try_join_all(renders).await?;

        let mut files = BulkData::new();
        for (route, route_files) in self.routes.iter().zip(rendered) {
            for (path, content) in route_files {
                if files.contains_key(&path) {
                    tracing::warn!(
                        path = %path,
                        pattern = %route.pattern(),
                        "multiple routes built the same path, only the first one is preserved"
                    );
                    continue;
                }
                files.insert(path, content);
            }
        }

        tracing::debug!(count = files.len(), "rendered all files");
        Ok(files)
    }

    /// Write rendered files under `out_dir` (default: the site's output
    /// directory).
    ///
    /// # Errors
    ///
    /// Returns the first `SiteError::Write`. Writes still in flight are
    /// aborted; files already written are kept.
    pub async fn write_all(
        &self,
        files: &BulkData<String>,
        out_dir: Option<&Path>,
    ) -> Result<(), SiteError> {
        let out_dir = out_dir.unwrap_or(self.out_dir.as_path());
        tracing::debug!(out_dir = %out_dir.display(), "writing all files");

        let written = write_files(out_dir, files).await?;

        tracing::debug!(count = written, "wrote all files");
        Ok(())
    }

    /// Render and write every route. Returns the built paths.
    ///
    /// Nothing is written when rendering fails.
    ///
    /// # Errors
    ///
    /// Returns the render or write failure.
    pub async fn build_all(&self, out_dir: Option<&Path>) -> Result<Vec<String>, SiteError> {
        let files = self.render_all().await?;
        self.write_all(&files, out_dir).await?;
        Ok(files.into_keys().collect())
    }

    /// Cached global data, computing it on first call.
    ///
    /// The global data function is invoked eagerly by the first call; later
    /// calls, including ones made while the first computation is pending,
    /// share that computation.
    pub fn global_data(&self) -> Pending<G> {
        self.global_data.get_or_init(|| {
            tracing::debug!("retrieving global data");
            (self.global_data_fn)().map(|result| result.map_err(SiteError::from))
        })
    }

    /// Lifecycle of the cached global data.
    pub fn cache_state(&self) -> CacheState {
        self.global_data.state()
    }

    /// Drop the cached route table and global data, and optionally every
    /// route's cached data.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub fn clear_cache(&self, also_clear_route_caches: bool) {
        tracing::debug!(also_clear_route_caches, "clearing cache");

        self.global_data.clear();
        self.route_table.lock().unwrap().take();

        if also_clear_route_caches {
            for route in &self.routes {
                route.clear_cache();
            }
        }
    }

    /// Cached route table, building it on first access.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub fn route_table(&self) -> Arc<RouteTable> {
        let mut slot = self.route_table.lock().unwrap();
        if let Some(table) = slot.as_ref() {
            return Arc::clone(table);
        }

        let table = Arc::new(RouteTable::build(self.routes.iter().map(|r| r.pattern())));
        *slot = Some(Arc::clone(&table));
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::route::RenderContext;

    async fn echo<D: std::fmt::Debug>(cx: RenderContext<(), D>) -> Result<String, BoxError> {
        Ok(format!("Rendered: path={} data={:?}", cx.path, cx.data))
    }

    fn index() -> Route<(), String> {
        Route::single("/", |_| async { Ok("index".to_owned()) }, echo)
    }

    fn about() -> Route<(), ()> {
        Route::page("/about", echo)
    }

    fn posts() -> Route<(), String> {
        Route::bulk(
            "/posts/:slug",
            |_| async {
                Ok(BulkData::from([
                    ("/posts/foo".to_owned(), "F".to_owned()),
                    ("/posts/bar".to_owned(), "B".to_owned()),
                ]))
            },
            echo,
        )
    }

    fn jsons() -> Route<(), String> {
        Route::bulk(
            "/:slug.json",
            |_| async {
                Ok(BulkData::from([
                    ("/foo.json".to_owned(), "foo".to_owned()),
                    ("/bar.json".to_owned(), "bar".to_owned()),
                ]))
            },
            echo,
        )
    }

    fn catch_all() -> Route<(), ()> {
        Route::bulk(
            "/blog/**",
            |_| async {
                Ok(BulkData::from([
                    ("/blog".to_owned(), ()),
                    ("/blog/x".to_owned(), ()),
                    ("/blog/x/y".to_owned(), ()),
                ]))
            },
            echo,
        )
    }

    fn site() -> Site<()> {
        SiteBuilder::default()
            .route(index())
            .route(about())
            .route(posts())
            .route(jsons())
            .route(catch_all())
            .build()
    }

    #[test]
    fn test_lookup_single_routes() {
        let site = site();

        assert_eq!(site.lookup("/").unwrap().route.pattern(), "/");
        assert_eq!(site.lookup("/about").unwrap().route.pattern(), "/about");
    }

    #[test]
    fn test_lookup_unknown_path_is_plain_not_found() {
        let err = site().lookup("/missing").unwrap_err();

        assert!(err.is_not_found());
        assert!(err.cause().is_none());
    }

    #[test]
    fn test_lookup_binds_params() {
        let matched = site().lookup("/foo.json").unwrap();

        assert_eq!(matched.route.pattern(), "/:slug.json");
        assert_eq!(matched.params.get("slug").map(String::as_str), Some("foo"));
    }

    #[test]
    fn test_lookup_catch_all() {
        let site = site();

        for path in ["/blog", "/blog/x", "/blog/x/y"] {
            assert_eq!(site.lookup(path).unwrap().route.pattern(), "/blog/**");
        }
    }

    #[test]
    fn test_lookup_catch_all_beside_parameter_route() {
        let site = SiteBuilder::<()>::default()
            .route(Route::page("/posts/:slug", echo))
            .route(Route::page("/posts/**", echo))
            .build();

        assert_eq!(site.lookup("/posts/a").unwrap().route.pattern(), "/posts/:slug");
        assert_eq!(site.lookup("/posts/a/b").unwrap().route.pattern(), "/posts/**");
        assert_eq!(site.lookup("/posts").unwrap().route.pattern(), "/posts/**");
    }

    #[test]
    fn test_route_table_is_cached_until_cleared() {
        let site = site();

        let first = site.route_table();
        let second = site.route_table();
        assert!(Arc::ptr_eq(&first, &second));

        site.clear_cache(false);
        let third = site.route_table();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_catch_all_route_registered_twice() {
        let site = SiteBuilder::<()>::default().route(catch_all()).build();

        assert_eq!(site.route_table().registered().len(), 2);
    }

    #[tokio::test]
    async fn test_global_data_computed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let site = SiteBuilder::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(true) }
        })
        .build();

        let first = site.global_data();
        let second = site.global_data();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(*first.await.unwrap());
        assert!(*second.await.unwrap());
    }

    #[tokio::test]
    async fn test_global_data_pending_computation_is_shared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let site = SiteBuilder::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok(42_u32)
            }
        })
        .build();

        let pending = [site.global_data(), site.global_data(), site.global_data()];
        assert_eq!(site.cache_state(), CacheState::Populating);
        let values = join_all(pending).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| matches!(v.as_deref(), Ok(&42))));
        assert_eq!(site.cache_state(), CacheState::Populated);
    }

    #[tokio::test]
    async fn test_clear_cache_recomputes_global_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let site = SiteBuilder::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .build();

        site.global_data().await.unwrap();
        site.clear_cache(false);
        assert_eq!(site.cache_state(), CacheState::Empty);
        site.global_data().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_renders_compute_data_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let site = SiteBuilder::<()>::default()
            .route(Route::bulk(
                "/posts/:slug",
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async {
                        tokio::task::yield_now().await;
                        Ok(BulkData::from([
                            ("/posts/foo".to_owned(), 1),
                            ("/posts/bar".to_owned(), 2),
                        ]))
                    }
                },
                echo,
            ))
            .build();

        let matches: Vec<_> = ["/posts/foo", "/posts/bar", "/posts/foo"]
            .iter()
            .map(|path| site.lookup(path).unwrap())
            .collect();
        let renders = join_all(matches.iter().map(|m| site.render(m))).await;
        site.render_all().await.unwrap();

        assert!(renders.iter().all(Result::is_ok));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_cascades_to_routes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let site = SiteBuilder::<()>::default()
            .route(Route::single(
                "/",
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                echo,
            ))
            .build();

        site.render_all().await.unwrap();
        site.clear_cache(false);
        site.render_all().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        site.clear_cache(true);
        site.render_all().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_render_matched_route() {
        let site = site();

        let matched = site.lookup("/posts/foo").unwrap();
        let content = site.render(&matched).await.unwrap();

        assert_eq!(content, "Rendered: path=/posts/foo data=\"F\"");
    }

    #[tokio::test]
    async fn test_render_failure_is_not_found_with_cause() {
        let site = SiteBuilder::<()>::default()
            .route(Route::page("/boom", |_| async { Err("render error".into()) }))
            .build();

        let matched = site.lookup("/boom").unwrap();
        let err = site.render(&matched).await.unwrap_err();

        assert!(err.is_render_failure());
        assert_eq!(err.cause().unwrap().to_string(), "render error");
    }

    #[tokio::test]
    async fn test_render_global_data_failure_is_not_wrapped() {
        let site = SiteBuilder::<()>::new(|| async { Err("no global data".into()) })
            .route(about())
            .build();

        let matched = site.lookup("/about").unwrap();
        let err = site.render(&matched).await.unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "no global data");
    }

    #[tokio::test]
    async fn test_render_missing_bulk_path_is_plain_not_found() {
        let site = site();

        // Matches the pattern, but bulk data has no such entry.
        let matched = site.lookup("/posts/baz").unwrap();
        let err = site.render(&matched).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(err.cause().is_none());
    }

    #[tokio::test]
    async fn test_render_raised_not_found_passes_through() {
        let site = SiteBuilder::<()>::default()
            .route(Route::page("/gone", |cx| async move {
                Err(Box::new(SiteError::not_found(cx.path)) as BoxError)
            }))
            .build();

        let matched = site.lookup("/gone").unwrap();
        let err = site.render(&matched).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(!err.is_render_failure());
    }

    #[tokio::test]
    async fn test_render_all_bulk_route() {
        let site = SiteBuilder::<()>::default().route(posts()).build();

        let files = site.render_all().await.unwrap();

        assert_eq!(
            files,
            BulkData::from([
                (
                    "/posts/bar".to_owned(),
                    "Rendered: path=/posts/bar data=\"B\"".to_owned()
                ),
                (
                    "/posts/foo".to_owned(),
                    "Rendered: path=/posts/foo data=\"F\"".to_owned()
                ),
            ])
        );
    }

    #[tokio::test]
    async fn test_render_all_collision_keeps_first_registered() {
        let site = SiteBuilder::<()>::default()
            .route(Route::page("/dup", |_| async {
                tokio::task::yield_now().await;
                Ok("first".to_owned())
            }))
            .route(Route::page("/dup", |_| async { Ok("second".to_owned()) }))
            .build();

        let files = site.render_all().await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files.get("/dup").map(String::as_str), Some("first"));
    }

    #[tokio::test]
    async fn test_render_all_fails_when_any_route_fails() {
        let site = SiteBuilder::<()>::default()
            .route(index())
            .route(Route::bulk(
                "/render-error/:slug",
                |_| async { Err::<BulkData<()>, BoxError>("render error".into()) },
                echo,
            ))
            .build();

        let err = site.render_all().await.unwrap_err();

        assert_eq!(err.to_string(), "render error");
    }

    #[tokio::test]
    async fn test_build_all_writes_index() {
        let tmp = TempDir::new().unwrap();
        let site = SiteBuilder::<()>::default().route(index()).build();

        let built = site.build_all(Some(tmp.path())).await.unwrap();

        assert_eq!(built, vec!["/".to_owned()]);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("index.html")).unwrap(),
            "Rendered: path=/ data=\"index\""
        );
    }

    #[tokio::test]
    async fn test_build_all_uses_configured_out_dir() {
        let tmp = TempDir::new().unwrap();
        let out_dir = tmp.path().join("public");
        let site = SiteBuilder::<()>::default()
            .route(index())
            .route(posts())
            .out_dir(&out_dir)
            .build();

        let built = site.build_all(None).await.unwrap();

        assert_eq!(built, vec!["/", "/posts/bar", "/posts/foo"]);
        assert!(out_dir.join("index.html").is_file());
        assert!(out_dir.join("posts/foo.html").is_file());
        assert!(out_dir.join("posts/bar.html").is_file());
    }

    #[tokio::test]
    async fn test_build_all_writes_nothing_when_render_fails() {
        let tmp = TempDir::new().unwrap();
        let site = SiteBuilder::<()>::default()
            .route(index())
            .route(Route::page("/boom", |_| async { Err("render error".into()) }))
            .build();

        assert!(site.build_all(Some(tmp.path())).await.is_err());
        assert!(!tmp.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_write_all_reports_single_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("blocked"), "").unwrap();
        let site = SiteBuilder::<()>::default().build();
        let files = BulkData::from([
            ("/a".to_owned(), "a".to_owned()),
            ("/blocked/b".to_owned(), "b".to_owned()),
            ("/c".to_owned(), "c".to_owned()),
        ]);

        let err = site.write_all(&files, Some(tmp.path())).await.unwrap_err();

        assert!(matches!(err, SiteError::Write { .. }));
    }
}
