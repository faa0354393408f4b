//! Route definitions.
//!
//! A [`Route`] ties a path pattern to a data source and a render function.
//! Two kinds exist:
//!
//! - **single**: one path, one data value (`Route::single`, `Route::page`)
//! - **bulk**: one pattern, many concrete paths discovered from a bulk data
//!   function returning `path -> data` (`Route::bulk`); catch-all patterns
//!   (`/docs/**`) are bulk routes too
//!
//! Data producers run at most once until [`Routable::clear_cache`] is called,
//! no matter how many renders request the data concurrently.
//!
//! Routes with different data types are stored side by side as
//! `Arc<dyn Routable<G>>`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, try_join_all};

use crate::data_cache::{CacheState, DataCache};
use crate::error::{BoxError, SiteError};
use crate::route_table::{Params, extract_params};

/// Data produced by a bulk route: concrete path to that path's data.
pub type BulkData<D> = BTreeMap<String, D>;

type DataFn<G, D> = Box<dyn Fn(Arc<G>) -> BoxFuture<'static, Result<D, BoxError>> + Send + Sync>;
type BulkDataFn<G, D> =
    Box<dyn Fn(Arc<G>) -> BoxFuture<'static, Result<BulkData<D>, BoxError>> + Send + Sync>;
type RenderFn<G, D> =
    Box<dyn Fn(RenderContext<G, D>) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>;

/// Everything a render function receives.
pub struct RenderContext<G, D> {
    /// Concrete path being rendered.
    pub path: String,
    /// Named parameters bound by the route pattern.
    pub params: Params,
    /// Site-wide data shared by all routes.
    pub global_data: Arc<G>,
    /// Data for this path.
    pub data: Arc<D>,
}

/// Object-safe interface shared by every route kind.
pub trait Routable<G>: Send + Sync {
    /// Declared path pattern.
    fn pattern(&self) -> &str;

    /// Render one concrete path.
    fn render(
        &self,
        path: String,
        params: Params,
        global_data: Arc<G>,
    ) -> BoxFuture<'_, Result<String, SiteError>>;

    /// Render every path this route produces, keyed by path.
    fn render_all(&self, global_data: Arc<G>)
    -> BoxFuture<'_, Result<BulkData<String>, SiteError>>;

    /// Drop cached data.
    fn clear_cache(&self);

    /// Lifecycle of the cached data.
    fn cache_state(&self) -> CacheState;
}

/// Where a route's data comes from.
enum Source<G, D> {
    Single {
        data: DataFn<G, D>,
        cache: DataCache<D>,
    },
    Bulk {
        bulk_data: BulkDataFn<G, D>,
        cache: DataCache<BulkData<Arc<D>>>,
    },
}

/// A route definition: pattern, data source and render function.
pub struct Route<G, D> {
    pattern: String,
    source: Source<G, D>,
    render: RenderFn<G, D>,
}

impl<G, D> Route<G, D>
where
    G: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    /// Single route: `data` produces the value for the one path `pattern`.
    pub fn single<DF, DFut, RF, RFut>(pattern: impl Into<String>, data: DF, render: RF) -> Self
    where
        DF: Fn(Arc<G>) -> DFut + Send + Sync + 'static,
        DFut: Future<Output = Result<D, BoxError>> + Send + 'static,
        RF: Fn(RenderContext<G, D>) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        Self {
            pattern: pattern.into(),
            source: Source::Single {
                data: Box::new(move |global| data(global).boxed()),
                cache: DataCache::new(),
            },
            render: Box::new(move |cx| render(cx).boxed()),
        }
    }

    /// Bulk route: `bulk_data` produces every concrete path and its data.
    ///
    /// The produced paths are expected to match `pattern`; paths that don't
    /// are still rendered by [`Routable::render_all`] but can't be looked up.
    pub fn bulk<BF, BFut, RF, RFut>(pattern: impl Into<String>, bulk_data: BF, render: RF) -> Self
    where
        BF: Fn(Arc<G>) -> BFut + Send + Sync + 'static,
        BFut: Future<Output = Result<BulkData<D>, BoxError>> + Send + 'static,
        RF: Fn(RenderContext<G, D>) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        Self {
            pattern: pattern.into(),
            source: Source::Bulk {
                bulk_data: Box::new(move |global| bulk_data(global).boxed()),
                cache: DataCache::new(),
            },
            render: Box::new(move |cx| render(cx).boxed()),
        }
    }

    /// Whether this route produces many paths.
    pub fn is_bulk(&self) -> bool {
        matches!(self.source, Source::Bulk { .. })
    }

    /// Data for `path`, computing the route's data on first access.
    ///
    /// # Errors
    ///
    /// Returns the producer's failure, or `SiteError::NotFound` (no cause)
    /// when a bulk route did not produce `path`.
    pub async fn data(&self, path: &str, global_data: Arc<G>) -> Result<Arc<D>, SiteError> {
        match &self.source {
            Source::Single { data, cache } => {
                cache
                    .get_or_init(|| data(global_data).map(|r| r.map_err(SiteError::from)))
                    .await
            }
            Source::Bulk { bulk_data, cache } => {
                let all = Self::bulk_entries(bulk_data, cache, global_data).await?;
                all.get(path)
                    .cloned()
                    .ok_or_else(|| SiteError::not_found(path))
            }
        }
    }

    async fn bulk_entries(
        bulk_data: &BulkDataFn<G, D>,
        cache: &DataCache<BulkData<Arc<D>>>,
        global_data: Arc<G>,
    ) -> Result<Arc<BulkData<Arc<D>>>, SiteError> {
        cache
            .get_or_init(|| {
                bulk_data(global_data).map(|result| {
                    result
                        .map(|entries| {
                            entries
                                .into_iter()
                                .map(|(path, data)| (path, Arc::new(data)))
                                .collect()
                        })
                        .map_err(SiteError::from)
                })
            })
            .await
    }

    async fn render_with(
        &self,
        path: String,
        params: Params,
        global_data: Arc<G>,
        data: Arc<D>,
    ) -> Result<String, SiteError> {
        let cx = RenderContext {
            path,
            params,
            global_data,
            data,
        };
        (self.render)(cx).await.map_err(SiteError::from)
    }
}

impl<G> Route<G, ()>
where
    G: Send + Sync + 'static,
{
    /// Single route without data.
    pub fn page<RF, RFut>(pattern: impl Into<String>, render: RF) -> Self
    where
        RF: Fn(RenderContext<G, ()>) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        Self::single(pattern, |_| async { Ok(()) }, render)
    }
}

impl<G, D> Routable<G> for Route<G, D>
where
    G: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn render(
        &self,
        path: String,
        params: Params,
        global_data: Arc<G>,
    ) -> BoxFuture<'_, Result<String, SiteError>> {
        async move {
            let data = self.data(&path, Arc::clone(&global_data)).await?;
            self.render_with(path, params, global_data, data).await
        }
        .boxed()
    }

    fn render_all(
        &self,
        global_data: Arc<G>,
    ) -> BoxFuture<'_, Result<BulkData<String>, SiteError>> {
        async move {
            match &self.source {
                Source::Single { .. } => {
                    let path = self.pattern.clone();
                    let data = self.data(&path, Arc::clone(&global_data)).await?;
                    let content = self
                        .render_with(path.clone(), Params::new(), global_data, data)
                        .await?;
                    Ok(BulkData::from([(path, content)]))
                }
                Source::Bulk { bulk_data, cache } => {
                    let entries =
                        Self::bulk_entries(bulk_data, cache, Arc::clone(&global_data)).await?;
                    let renders = entries.iter().map(|(path, data)| {
                        let params = extract_params(&self.pattern, path);
                        let global_data = Arc::clone(&global_data);
                        async move {
                            let content = self
                                .render_with(path.clone(), params, global_data, Arc::clone(data))
                                .await?;
                            Ok::<_, SiteError>((path.clone(), content))
                        }
                    });
                    let rendered = try_join_all(renders).await?;
                    tracing::debug!(pattern = %self.pattern, count = rendered.len(), "rendered bulk route");
                    Ok(rendered.into_iter().collect())
                }
            }
        }
        .boxed()
    }

    fn clear_cache(&self) {
        match &self.source {
            Source::Single { cache, .. } => cache.clear(),
            Source::Bulk { cache, .. } => cache.clear(),
        }
    }

    fn cache_state(&self) -> CacheState {
        match &self.source {
            Source::Single { cache, .. } => cache.state(),
            Source::Bulk { cache, .. } => cache.state(),
        }
    }
}
