//! Minimal translation engine: active locale, key lookup with language and
//! namespace fallback, and `{{name}}` interpolation.

use std::collections::BTreeSet;
use std::sync::{ Arc, PoisonError, RwLock };

use futures_util::future::{ join_all, BoxFuture, FutureExt };
use once_cell::sync::Lazy;
use regex::{ Captures, Regex };

use crate::locales::{ Locale, Namespace, ResourceKey };
use crate::loader::ResourceLoader;
use crate::store::{ LocaleObserver, ObserverId, ResourceStore };

/// Separates an explicit namespace from the key, as in `errors:network`.
pub const NS_SEPARATOR: char = ':';

/// Runs a detached future. Lets synchronous `t` calls start loads for
/// namespaces that are not cached yet.
pub type Spawner = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// Owns the active locale and answers `t` calls from the shared
/// [`ResourceStore`]. Cheap to clone.
#[derive(Clone)]
pub struct TranslationEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    loader: ResourceLoader,
    language: RwLock<Locale>,
    /// Namespaces some caller has asked for; loaded eagerly on a language switch.
    used: RwLock<BTreeSet<Namespace>>,
    spawner: Option<Spawner>,
}

impl TranslationEngine {
    pub fn new(loader: ResourceLoader) -> Self {
        Self::build(loader, None)
    }

    pub fn with_spawner(loader: ResourceLoader, spawner: Spawner) -> Self {
        Self::build(loader, Some(spawner))
    }

    fn build(loader: ResourceLoader, spawner: Option<Spawner>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                loader,
                language: RwLock::new(Locale::DEFAULT),
                used: RwLock::new(BTreeSet::from([Namespace::DEFAULT])),
                spawner,
            }),
        }
    }

    pub fn language(&self) -> Locale {
        *self.inner.language.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.inner.loader
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        self.inner.loader.store()
    }

    pub fn subscribe(&self, observer: Arc<dyn LocaleObserver>) -> ObserverId {
        self.store().subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.store().unsubscribe(id)
    }

    /// Switches the active locale.
    ///
    /// Every namespace in use is loaded for `locale` (and the default locale,
    /// for fallback) before the switch, so no caller ever sees the new locale
    /// paired with the old strings. Observers fire after the switch.
    pub async fn change_language(&self, locale: Locale) {
        let namespaces: Vec<Namespace> = self.inner.used
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect();

        join_all(
            lookup_chain(locale, &namespaces)
                .into_iter()
                .map(|key| self.inner.loader.load(key.locale, key.namespace))
        ).await;

        *self.inner.language.write().unwrap_or_else(PoisonError::into_inner) = locale;
        dev_info!("[i18n] Language changed to: {}", locale);
        self.store().notify_locale_changed(locale);
    }

    /// Loads everything `namespace` needs in the active locale and returns a
    /// translator scoped to it.
    pub async fn namespace(&self, namespace: Namespace) -> Translator {
        self.mark_used(namespace);
        let locale = self.language();
        join_all(
            lookup_chain(locale, &[namespace])
                .into_iter()
                .map(|key| self.inner.loader.load(key.locale, key.namespace))
        ).await;
        Translator { engine: self.clone(), namespace }
    }

    /// Translator for `namespace` without waiting for its bundles.
    pub fn translator(&self, namespace: Namespace) -> Translator {
        self.mark_used(namespace);
        Translator { engine: self.clone(), namespace }
    }

    /// Translates `key` in the default namespace, or the one named by an
    /// `ns:` prefix. Missing keys come back verbatim.
    pub fn t(&self, key: &str) -> String {
        let (namespace, key) = split_namespace(key, Namespace::DEFAULT);
        self.t_ns(namespace, key)
    }

    pub fn t_ns(&self, namespace: Namespace, key: &str) -> String {
        self.lookup(namespace, key).unwrap_or_else(|| key.to_string())
    }

    /// [`t`](Self::t) with `{{name}}` placeholders replaced from `args`.
    pub fn t_with_args(&self, key: &str, args: &[(&str, &dyn ToString)]) -> String {
        interpolate(&self.t(key), args)
    }

    pub fn exists(&self, key: &str) -> bool {
        let (namespace, key) = split_namespace(key, Namespace::DEFAULT);
        self.find(self.language(), namespace, key).is_some()
    }

    fn lookup(&self, namespace: Namespace, key: &str) -> Option<String> {
        let locale = self.language();
        self.ensure_loading(locale, namespace);

        let found = self.find(locale, namespace, key);
        if found.is_none() {
            dev_warn!("[i18n] Missing key: {}/{}/{}", locale, namespace, key);
        }
        found
    }

    fn find(&self, locale: Locale, namespace: Namespace, key: &str) -> Option<String> {
        let store = self.store();
        lookup_chain(locale, &[namespace])
            .into_iter()
            .filter_map(|resource| store.get(resource))
            .find_map(|bundle| bundle.get(key).map(str::to_string))
    }

    fn mark_used(&self, namespace: Namespace) {
        self.inner.used.write().unwrap_or_else(PoisonError::into_inner).insert(namespace);
    }

    // Kicks off background loads for uncached bundles, if a spawner exists.
    fn ensure_loading(&self, locale: Locale, namespace: Namespace) {
        self.mark_used(namespace);
        let Some(spawner) = &self.inner.spawner else {
            return;
        };

        let loader = &self.inner.loader;
        for key in lookup_chain(locale, &[namespace]) {
            if loader.get(key).is_none() && !loader.is_pending(key) {
                let load = loader.load(key.locale, key.namespace);
                spawner(
                    async move {
                        load.await;
                    }.boxed()
                );
            }
        }
    }
}

/// A [`TranslationEngine`] view scoped to one namespace. Lookups are live:
/// after a language switch the same translator returns the new strings.
#[derive(Clone)]
pub struct Translator {
    engine: TranslationEngine,
    namespace: Namespace,
}

impl Translator {
    /// Translates `key`; an `ns:` prefix overrides this translator's namespace.
    pub fn t(&self, key: &str) -> String {
        let (namespace, key) = split_namespace(key, self.namespace);
        self.engine.t_ns(namespace, key)
    }

    /// ```rust,ignore
    /// // "greeting": "Welcome back, {{name}}!"
    /// translator.t_with_args("greeting", &[("name", &"Ada")]);
    /// // "Welcome back, Ada!"
    /// ```
    pub fn t_with_args(&self, key: &str, args: &[(&str, &dyn ToString)]) -> String {
        interpolate(&self.t(key), args)
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn locale(&self) -> Locale {
        self.engine.language()
    }
}

/// Bundles consulted for a lookup, in order: the requested locale before the
/// default locale, and within each the requested namespace before the
/// default namespace.
fn lookup_chain(locale: Locale, namespaces: &[Namespace]) -> Vec<ResourceKey> {
    let mut chain = Vec::new();
    for lng in [locale, Locale::DEFAULT] {
        for &namespace in namespaces.iter().chain(std::iter::once(&Namespace::DEFAULT)) {
            let key = ResourceKey::new(lng, namespace);
            if !chain.contains(&key) {
                chain.push(key);
            }
        }
    }
    chain
}

/// Splits `errors:network` into its namespace and key. A prefix that is not
/// a known namespace is treated as part of the key.
fn split_namespace(key: &str, default: Namespace) -> (Namespace, &str) {
    match key.split_once(NS_SEPARATOR) {
        Some((prefix, rest)) =>
            match Namespace::from_code(prefix) {
                Some(namespace) => (namespace, rest),
                None => (default, key),
            }
        None => (default, key),
    }
}

// ---------- Text helpers ----------
static ARG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap());

/// Replaces `{{name}}` placeholders. Placeholders without a matching
/// argument are left in place.
pub fn interpolate(template: &str, args: &[(&str, &dyn ToString)]) -> String {
    ARG_RE.replace_all(template, |caps: &Captures| {
        args.iter()
            .find(|(name, _)| *name == &caps[1])
            .map(|(_, value)| value.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    }).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceRegistry;
    use bevy::tasks::block_on;
    use std::sync::Mutex;

    fn engine() -> TranslationEngine {
        let store = Arc::new(ResourceStore::new());
        TranslationEngine::new(ResourceLoader::new(ResourceRegistry::bundled(), store))
    }

    #[test]
    fn default_namespace_translates_before_any_load() {
        let engine = engine();
        assert_eq!(engine.language(), Locale::En);
        assert_eq!(engine.t("navigation.credentials"), "Credentials");
        assert!(engine.exists("language.select"));
    }

    #[test]
    fn missing_keys_render_verbatim() {
        let engine = engine();
        assert_eq!(engine.t("nope.not.here"), "nope.not.here");
        assert_eq!(engine.t("errors:generic"), "generic");
        assert!(!engine.exists("nope"));
    }

    #[test]
    fn namespace_prefix_and_fallback_namespace() {
        let engine = engine();
        let errors = block_on(engine.namespace(Namespace::Errors));
        assert_eq!(errors.t("generic"), "Something went wrong.");
        // Falls back to the default namespace for keys errors does not have
        assert_eq!(errors.t("actions.save"), "Save");
        assert_eq!(engine.t("errors:network"), errors.t("network"));
        // Unknown prefixes are part of the key
        assert_eq!(engine.t("settings:azure.clientId"), "settings:azure.clientId");
    }

    #[test]
    fn switch_loads_used_namespaces_before_announcing() {
        let engine = engine();
        let workflows = block_on(engine.namespace(Namespace::Workflows));

        let seen = Arc::new(Mutex::new(Vec::new()));
        struct Probe(TranslationEngine, Arc<Mutex<Vec<String>>>);
        impl LocaleObserver for Probe {
            fn locale_changed(&self, locale: Locale) {
                // Strings for the new locale are already in place
                let text = self.0.t_ns(Namespace::Workflows, "run.running");
                self.1.lock().unwrap().push(format!("{locale}:{text}"));
            }
        }
        engine.subscribe(Arc::new(Probe(engine.clone(), seen.clone())));

        block_on(engine.change_language(Locale::Ja));
        assert_eq!(*seen.lock().unwrap(), vec!["ja:実行中"]);
        assert_eq!(workflows.t("title"), "ワークフロー");
        assert_eq!(engine.t("navigation.settings"), "設定");
    }

    #[test]
    fn japanese_falls_back_to_english_for_missing_bundle() {
        let engine = engine();
        block_on(engine.change_language(Locale::Ja));
        let tasks = block_on(engine.namespace(Namespace::Tasks));
        assert_eq!(tasks.t("status.running"), "Running");
        assert_eq!(tasks.locale(), Locale::Ja);
    }

    #[test]
    fn spawner_starts_loads_for_sync_lookups() {
        let spawned = Arc::new(Mutex::new(Vec::<BoxFuture<'static, ()>>::new()));
        let queue = spawned.clone();
        let store = Arc::new(ResourceStore::new());
        let engine = TranslationEngine::with_spawner(
            ResourceLoader::new(ResourceRegistry::bundled(), store),
            Arc::new(move |fut: BoxFuture<'static, ()>| queue.lock().unwrap().push(fut))
        );

        // Not cached yet: the key comes back and a load is queued
        assert_eq!(engine.t("errors:network"), "network");
        let queued: Vec<_> = spawned.lock().unwrap().drain(..).collect();
        assert!(!queued.is_empty());
        for fut in queued {
            block_on(fut);
        }
        assert!(engine.t("errors:network").starts_with("Unable to reach"));
    }

    #[test]
    fn interpolation_fills_named_placeholders() {
        let engine = engine();
        assert_eq!(engine.t_with_args("greeting", &[("name", &"Ada")]), "Welcome back, Ada!");
        assert_eq!(interpolate("{{ a }}-{{b}}-{{c}}", &[("a", &1), ("b", &"two")]), "1-two-{{c}}");
    }

    #[test]
    fn lookup_chain_order() {
        let chain = lookup_chain(Locale::Ja, &[Namespace::Tasks]);
        let rendered: Vec<_> = chain.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["ja/tasks", "ja/common", "en/tasks", "en/common"]);
        assert_eq!(lookup_chain(Locale::En, &[Namespace::Common]), vec![ResourceKey::EMBEDDED]);
    }
}
