//! Pluggable route providers used by the dispatcher and the rider tick.
//!
//! - **`SearchRouteProvider`**: runs [`crate::search`] with a fixed strategy.
//! - **`CachedRouteProvider`**: LRU wrapper keyed by grid revision, so a wall
//!   edit implicitly invalidates every cached route.
//!
//! The provider is stored as a `Box<dyn RouteProvider>` ECS resource, built
//! from the scenario's strategy and cache capacity.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use bevy_ecs::prelude::{Resource, World};
use lru::LruCache;

use crate::grid::{Grid, GridPos};
use crate::search::{find_path, SearchStrategy};

/// Default number of cached routes.
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 2_048;

/// Trait for routing backends. Implementations must be `Send + Sync` so the
/// provider can be stored as a shared ECS resource.
pub trait RouteProvider: Send + Sync {
    /// Cells from `from` to `to` inclusive, or `None` if no route exists.
    fn route(&self, grid: &Grid, from: GridPos, to: GridPos) -> Option<Vec<GridPos>>;

    /// Strategy used for live routing.
    fn strategy(&self) -> SearchStrategy;
}

/// ECS resource wrapping a boxed route provider.
#[derive(Resource)]
pub struct RouteProviderResource(pub Box<dyn RouteProvider>);

impl std::ops::Deref for RouteProviderResource {
    type Target = dyn RouteProvider;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Uncached search with a fixed strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchRouteProvider {
    pub strategy: SearchStrategy,
}

impl SearchRouteProvider {
    pub fn new(strategy: SearchStrategy) -> Self {
        Self { strategy }
    }
}

impl RouteProvider for SearchRouteProvider {
    fn route(&self, grid: &Grid, from: GridPos, to: GridPos) -> Option<Vec<GridPos>> {
        find_path(grid, from, to, self.strategy).map(|result| result.path)
    }

    fn strategy(&self) -> SearchStrategy {
        self.strategy
    }
}

type RouteKey = (u64, GridPos, GridPos);

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// Cache key is `(grid revision, from, to)` (directional). Only successful
/// routes are cached; failures are recomputed on the next request.
pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    cache: Mutex<LruCache<RouteKey, Vec<GridPos>>>,
}

impl CachedRouteProvider {
    pub fn new(inner: Box<dyn RouteProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of routes currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl RouteProvider for CachedRouteProvider {
    fn route(&self, grid: &Grid, from: GridPos, to: GridPos) -> Option<Vec<GridPos>> {
        let key = (grid.revision(), from, to);

        // Fast path: cache hit
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Some(cached.clone());
            }
        }

        let result = self.inner.route(grid, from, to);

        if let Some(ref route) = result {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, route.clone());
            }
        }

        result
    }

    fn strategy(&self) -> SearchStrategy {
        self.inner.strategy()
    }
}

/// Construct the live routing provider. A capacity of 0 disables caching.
pub fn build_route_provider(strategy: SearchStrategy, cache_capacity: usize) -> Box<dyn RouteProvider> {
    let inner: Box<dyn RouteProvider> = Box::new(SearchRouteProvider::new(strategy));
    if cache_capacity == 0 {
        return inner;
    }
    Box::new(CachedRouteProvider::new(inner, cache_capacity))
}

/// Route through the world's provider, falling back to uncached A* when none
/// is installed. `None` without a grid resource.
pub fn route_in_world(world: &World, from: GridPos, to: GridPos) -> Option<Vec<GridPos>> {
    let grid = world.get_resource::<Grid>()?;
    match world.get_resource::<RouteProviderResource>() {
        Some(provider) => provider.route(grid, from, to),
        None => SearchRouteProvider::default().route(grid, from, to),
    }
}
