//! Memoized, fallback-on-miss loading of translation bundles.

use std::collections::HashMap;
use std::sync::{ Arc, Mutex, PoisonError };

use futures_util::future::{ self, BoxFuture, FutureExt, Shared };

use crate::bundle::TranslationBundle;
use crate::locales::{ Locale, Namespace, ResourceKey };
use crate::normalize::normalize;
use crate::registry::{ embedded_bundle, ResourceRegistry };
use crate::store::ResourceStore;

/// A load in flight or already resolved. Every caller for a key polls the
/// same one.
pub type BundleFuture = Shared<BoxFuture<'static, Arc<TranslationBundle>>>;

/// Loads bundles on demand and caches one result per [`ResourceKey`].
///
/// - `en/common` is resolved at construction from the embedded bundle.
/// - Concurrent loads of the same key share a single underlying load.
/// - A missing or failing bundle falls back to the default locale's bundle
///   for the same namespace; if that fails too the result is an empty bundle.
///   Loads never fail from the caller's point of view.
/// - Each resolution is registered in the shared [`ResourceStore`].
#[derive(Clone)]
pub struct ResourceLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    registry: ResourceRegistry,
    store: Arc<ResourceStore>,
    cache: Mutex<HashMap<ResourceKey, BundleFuture>>,
}

impl ResourceLoader {
    pub fn new(registry: ResourceRegistry, store: Arc<ResourceStore>) -> Self {
        let embedded = Arc::new(embedded_bundle());
        let mut cache = HashMap::new();
        cache.insert(ResourceKey::EMBEDDED, future::ready(embedded.clone()).boxed().shared());
        store.add(ResourceKey::EMBEDDED, embedded);

        Self {
            inner: Arc::new(LoaderInner {
                registry,
                store,
                cache: Mutex::new(cache),
            }),
        }
    }

    /// Resolves the bundle for `(locale, namespace)`, loading it at most once.
    pub fn load(&self, locale: Locale, namespace: Namespace) -> BundleFuture {
        let key = ResourceKey::new(locale, namespace);
        let mut cache = self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = cache.get(&key) {
            return existing.clone();
        }

        let loader = self.clone();
        let pending = async move { loader.resolve(key).await }.boxed().shared();
        cache.insert(key, pending.clone());
        pending
    }

    /// String entry point for callers holding raw tags.
    ///
    /// An unknown namespace resolves to an empty bundle without touching the
    /// registry. An unsupported locale is redirected to the default locale.
    pub fn load_tag(&self, locale_tag: &str, namespace_tag: &str) -> BoxFuture<'static, Arc<TranslationBundle>> {
        let Some(namespace) = Namespace::from_code(namespace_tag) else {
            dev_error!("[i18n] Unknown namespace: {}", namespace_tag);
            return future::ready(Arc::new(TranslationBundle::empty())).boxed();
        };

        let locale = normalize(Some(locale_tag)).unwrap_or_else(|| {
            dev_warn!(
                "[i18n] Unsupported language: {}, falling back to '{}'",
                locale_tag,
                Locale::DEFAULT
            );
            Locale::DEFAULT
        });

        self.load(locale, namespace).boxed()
    }

    /// The bundle for `key` if its load has already resolved.
    pub fn get(&self, key: ResourceKey) -> Option<Arc<TranslationBundle>> {
        let cache = self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(&key)?.peek().cloned()
    }

    /// Whether a load for `key` has started but not resolved.
    pub fn is_pending(&self, key: ResourceKey) -> bool {
        let cache = self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(&key).is_some_and(|load| load.peek().is_none())
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.inner.store
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.inner.registry
    }

    async fn resolve(&self, key: ResourceKey) -> Arc<TranslationBundle> {
        let outcome = match self.inner.registry.loader(key) {
            Some(loader) => loader().await,
            None => Err(crate::error::LoadError::NotFound(key)),
        };

        match outcome {
            Ok(bundle) => {
                dev_info!("[i18n] Loaded {} successfully", key);
                let bundle = Arc::new(bundle);
                self.inner.store.add(key, bundle.clone());
                bundle
            }
            Err(e) => {
                dev_error!("[i18n] Failed to load {}: {}", key, e);

                let Some(fallback) = key.fallback() else {
                    return Arc::new(TranslationBundle::empty());
                };

                dev_warn!("[i18n] Falling back to {}", fallback);
                let bundle = self.load(fallback.locale, fallback.namespace).await;
                if !bundle.is_empty() {
                    self.inner.store.add(key, bundle.clone());
                }
                bundle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use bevy::tasks::{ block_on, futures_lite::future::{ poll_once, yield_now } };
    use std::sync::atomic::{ AtomicUsize, Ordering };

    fn loader_with(registry: ResourceRegistry) -> ResourceLoader {
        ResourceLoader::new(registry, Arc::new(ResourceStore::new()))
    }

    fn json_bundle(key: ResourceKey, json: &'static str) -> TranslationBundle {
        TranslationBundle::from_json_str(key, json).unwrap()
    }

    #[test]
    fn embedded_bundle_is_ready_before_any_load() {
        let loader = loader_with(ResourceRegistry::new());
        let bundle = loader.get(ResourceKey::EMBEDDED).unwrap();
        assert_eq!(bundle.get("navigation.settings"), Some("Settings"));
        assert!(loader.store().contains(ResourceKey::EMBEDDED));
        assert!(loader.get(ResourceKey::new(Locale::Ja, Namespace::Common)).is_none());
    }

    #[test]
    fn concurrent_loads_share_one_fetch() {
        let key = ResourceKey::new(Locale::Ja, Namespace::Workflows);
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ResourceRegistry::new();
        let counter = calls.clone();
        registry.register(key, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                yield_now().await;
                Ok::<_, LoadError>(json_bundle(key, r#"{ "title": "ワークフロー" }"#))
            }
        });
        let loader = loader_with(registry);

        let first = loader.load(Locale::Ja, Namespace::Workflows);
        let second = loader.load(Locale::Ja, Namespace::Workflows);
        assert!(loader.is_pending(key));
        let (a, b) = block_on(future::join(first, second));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &loader.get(key).unwrap()));

        // Later loads hit the cache
        let again = block_on(loader.load(Locale::Ja, Namespace::Workflows));
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_loader_falls_back_to_default_locale() {
        let loader = loader_with(ResourceRegistry::bundled());
        let ja_tasks = block_on(loader.load(Locale::Ja, Namespace::Tasks));
        let en_tasks = block_on(loader.load(Locale::En, Namespace::Tasks));

        assert!(Arc::ptr_eq(&ja_tasks, &en_tasks));
        assert_eq!(ja_tasks.get("status.queued"), Some("Queued"));
        assert!(loader.store().contains(ResourceKey::new(Locale::Ja, Namespace::Tasks)));
    }

    #[test]
    fn failing_loader_falls_back_then_degrades_to_empty() {
        let ja_errors = ResourceKey::new(Locale::Ja, Namespace::Errors);
        let en_errors = ResourceKey::new(Locale::En, Namespace::Errors);
        let mut registry = ResourceRegistry::new();
        registry.register(ja_errors, move || async move {
            Err::<TranslationBundle, _>(LoadError::Other { key: ja_errors, message: "offline".into() })
        });
        registry.register(en_errors, move || async move {
            Ok::<_, LoadError>(json_bundle(en_errors, r#"{ "generic": "Something went wrong." }"#))
        });
        let loader = loader_with(registry);

        let bundle = block_on(loader.load(Locale::Ja, Namespace::Errors));
        assert_eq!(bundle.get("generic"), Some("Something went wrong."));

        // Neither locale has workflows: empty, and nothing is registered
        let empty = block_on(loader.load(Locale::Ja, Namespace::Workflows));
        assert!(empty.is_empty());
        assert!(!loader.store().contains(ResourceKey::new(Locale::Ja, Namespace::Workflows)));
    }

    #[test]
    fn unknown_namespace_never_reaches_registry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ResourceRegistry::new();
        for key in ResourceKey::all() {
            let counter = calls.clone();
            registry.register(key, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, LoadError>(TranslationBundle::empty()) }
            });
        }
        let loader = loader_with(registry);

        let bundle = block_on(loader.load_tag("ja", "settings"));
        assert!(bundle.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsupported_locale_tag_loads_default() {
        let loader = loader_with(ResourceRegistry::bundled());
        let bundle = block_on(loader.load_tag("fr-FR", "common"));
        assert!(Arc::ptr_eq(&bundle, &loader.get(ResourceKey::EMBEDDED).unwrap()));

        let ja = block_on(loader.load_tag("ja-JP", "common"));
        assert_eq!(ja.get("loading"), Some("読み込み中..."));
    }

    #[test]
    fn stalled_key_does_not_block_others() {
        let stalled = ResourceKey::new(Locale::Ja, Namespace::Errors);
        let mut registry = ResourceRegistry::bundled();
        registry.register(stalled, || future::pending());
        let loader = loader_with(registry);

        let mut pending = loader.load(Locale::Ja, Namespace::Errors);
        assert!(block_on(poll_once(&mut pending)).is_none());

        let other = block_on(loader.load(Locale::Ja, Namespace::Workflows));
        assert_eq!(other.get("run.start"), Some("実行"));
        assert!(loader.is_pending(stalled));
    }
}
