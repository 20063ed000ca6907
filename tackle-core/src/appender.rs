use crate::{
    CachePolicy, CancellationToken, ExecutionListener, ExecutionToken, Executor, Link, Result,
    ResultCache, ResultCacheExt, cache_key,
};
use std::{sync::Arc, time::Duration};

/// Decorations applicable to any command before it runs.
///
/// Token adjustments return the command itself; cache decorations wrap it,
/// and wrapping composes: a command can be tagged, given a timeout and
/// cached, in any order.
pub trait LinkExt: Link + Sized {
    /// Appends a trailing comment to the command text for server-side log
    /// correlation.
    fn tagged(mut self, tag: &str) -> Self {
        self.token_mut().append_tag(tag);
        self
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.token_mut().set_timeout(timeout);
        self
    }

    fn with_listener(mut self, listener: Arc<dyn ExecutionListener>) -> Self {
        self.token_mut().add_listener(listener);
        self
    }

    /// Serves the materialized result from the cache when present, otherwise
    /// executes and stores it. The key covers the command text and every
    /// bound value.
    fn read_or_cache(self, cache: Arc<dyn ResultCache>, policy: CachePolicy) -> ReadOrCache<Self>
    where
        Self::Output: Clone + Sync + 'static,
    {
        let key = cache_key(self.token());
        ReadOrCache {
            inner: self,
            cache,
            policy,
            key,
        }
    }

    /// Always executes, refreshing the cached result.
    fn write_to_cache(self, cache: Arc<dyn ResultCache>, policy: CachePolicy) -> CacheWriter<Self>
    where
        Self::Output: Clone + Sync + 'static,
    {
        let key = cache_key(self.token());
        CacheWriter {
            inner: self,
            cache,
            policy,
            key,
        }
    }

    /// Drops the given cache keys after the command succeeds; an empty key
    /// list clears the whole cache. The write-side companion of
    /// [`read_or_cache`](Self::read_or_cache).
    fn invalidate_cache(self, cache: Arc<dyn ResultCache>, keys: Vec<String>) -> InvalidateCache<Self> {
        InvalidateCache {
            inner: self,
            cache,
            keys,
        }
    }
}

impl<C: Link> LinkExt for C {}

/// See [`LinkExt::read_or_cache`].
pub struct ReadOrCache<C: Link> {
    inner: C,
    cache: Arc<dyn ResultCache>,
    policy: CachePolicy,
    key: String,
}

impl<C: Link> Link for ReadOrCache<C>
where
    C::Output: Clone + Sync + 'static,
{
    type Output = C::Output;

    fn token(&self) -> &ExecutionToken {
        self.inner.token()
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        self.inner.token_mut()
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<C::Output> {
        if let Some(hit) = self.cache.read_typed::<C::Output>(&self.key) {
            return Ok((*hit).clone());
        }
        let output = self.inner.execute(executor, cancel).await?;
        self.cache
            .write_typed(self.key, output.clone(), &self.policy);
        Ok(output)
    }
}

/// See [`LinkExt::write_to_cache`].
pub struct CacheWriter<C: Link> {
    inner: C,
    cache: Arc<dyn ResultCache>,
    policy: CachePolicy,
    key: String,
}

impl<C: Link> Link for CacheWriter<C>
where
    C::Output: Clone + Sync + 'static,
{
    type Output = C::Output;

    fn token(&self) -> &ExecutionToken {
        self.inner.token()
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        self.inner.token_mut()
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<C::Output> {
        let output = self.inner.execute(executor, cancel).await?;
        self.cache
            .write_typed(self.key, output.clone(), &self.policy);
        Ok(output)
    }
}

/// See [`LinkExt::invalidate_cache`].
pub struct InvalidateCache<C: Link> {
    inner: C,
    cache: Arc<dyn ResultCache>,
    keys: Vec<String>,
}

impl<C: Link> Link for InvalidateCache<C> {
    type Output = C::Output;

    fn token(&self) -> &ExecutionToken {
        self.inner.token()
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        self.inner.token_mut()
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<C::Output> {
        let output = self.inner.execute(executor, cancel).await?;
        if self.keys.is_empty() {
            self.cache.clear();
        } else {
            for key in &self.keys {
                self.cache.invalidate(key);
            }
        }
        Ok(output)
    }
}
