//! Registry of per-key loader thunks.
//!
//! The bundled registry is generated by `build.rs`, which enumerates
//! `locales/{locale}/{namespace}.json` and embeds each file. Only keys in the
//! catalog product are ever registered, so fallback logic stays total over a
//! known domain.

use std::collections::HashMap;
use std::future::Future;
use std::path::{ Path, PathBuf };
use std::sync::Arc;

use futures_util::future::{ BoxFuture, FutureExt };

use crate::bundle::TranslationBundle;
use crate::error::LoadError;
use crate::locales::{ Locale, Namespace, ResourceKey };

include!(concat!(env!("OUT_DIR"), "/resource_manifest.rs"));

/// The default locale's default namespace, compiled in for first paint.
const EMBEDDED_COMMON: &str = include_str!("../locales/en/common.json");

pub type LoadFuture = BoxFuture<'static, Result<TranslationBundle, LoadError>>;

/// Produces a fresh load of one bundle each time it is called.
pub type LoaderFn = Arc<dyn Fn() -> LoadFuture + Send + Sync>;

/// Mapping from [`ResourceKey`] to the thunk that loads it.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    loaders: HashMap<ResourceKey, LoaderFn>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry over the resource files embedded at build time.
    pub fn bundled() -> Self {
        let mut registry = Self::new();

        for &(locale_code, namespace_code, json) in EMBEDDED_RESOURCES {
            let (Some(locale), Some(namespace)) = (
                Locale::from_code(locale_code),
                Namespace::from_code(namespace_code),
            ) else {
                dev_warn!(
                    "[i18n] Ignoring bundled resource outside the catalog: {}/{}",
                    locale_code,
                    namespace_code
                );
                continue;
            };

            let key = ResourceKey::new(locale, namespace);
            registry.register(key, move || async move { TranslationBundle::from_json_str(key, json) });
        }

        registry
    }

    /// Registry over `{messages_folder}/{locale}/{namespace}.json` on disk.
    /// Files are read on first load, not here.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_dir(messages_folder: impl AsRef<Path>) -> Self {
        let root = messages_folder.as_ref();
        let mut registry = Self::new();

        if !root.is_dir() {
            bevy::log::warn!("Translations folder '{}' not found", root.display());
            return registry;
        }

        for key in ResourceKey::all() {
            let path = resource_path(root, key);
            if path.is_file() {
                registry.register(key, move || {
                    let path = path.clone();
                    async move {
                        let content = std::fs
                            ::read_to_string(&path)
                            .map_err(|source| LoadError::Io { path, source })?;
                        TranslationBundle::from_json_str(key, &content)
                    }
                });
            }
        }

        registry
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_dir(_messages_folder: impl AsRef<Path>) -> Self {
        bevy::log::warn!("Filesystem loading not available on WASM, using bundled translations");
        Self::bundled()
    }

    /// Registers (or replaces) the loader for `key`.
    pub fn register<F, Fut>(&mut self, key: ResourceKey, loader: F)
        where
            F: Fn() -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<TranslationBundle, LoadError>> + Send + 'static
    {
        self.loaders.insert(
            key,
            Arc::new(move || loader().boxed())
        );
    }

    pub fn loader(&self, key: ResourceKey) -> Option<LoaderFn> {
        self.loaders.get(&key).cloned()
    }

    pub fn contains(&self, key: ResourceKey) -> bool {
        self.loaders.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = ResourceKey> + '_ {
        self.loaders.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

/// `{root}/{locale}/{namespace}.json`
pub fn resource_path(root: &Path, key: ResourceKey) -> PathBuf {
    root.join(key.locale.code()).join(format!("{}.json", key.namespace.code()))
}

/// The bundle for [`ResourceKey::EMBEDDED`], available without any load.
pub fn embedded_bundle() -> TranslationBundle {
    TranslationBundle::from_json_str(ResourceKey::EMBEDDED, EMBEDDED_COMMON).unwrap_or_else(|e| {
        dev_error!("[i18n] Embedded bundle is unusable: {}", e);
        TranslationBundle::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::tasks::block_on;

    #[test]
    fn bundled_registry_only_holds_catalog_keys() {
        let registry = ResourceRegistry::bundled();
        assert!(registry.contains(ResourceKey::new(Locale::Ja, Namespace::Common)));
        assert!(registry.contains(ResourceKey::new(Locale::En, Namespace::Tasks)));
        // ja/tasks ships no file; loads for it fall back to English
        assert!(!registry.contains(ResourceKey::new(Locale::Ja, Namespace::Tasks)));
        assert!(registry.keys().all(|key| ResourceKey::all().any(|k| k == key)));
    }

    #[test]
    fn bundled_loader_parses_resource() {
        let registry = ResourceRegistry::bundled();
        let loader = registry.loader(ResourceKey::new(Locale::Ja, Namespace::Common)).unwrap();
        let bundle = block_on(loader()).unwrap();
        assert_eq!(bundle.get("navigation.settings"), Some("設定"));
    }

    #[test]
    fn embedded_bundle_is_english_common() {
        let bundle = embedded_bundle();
        assert_eq!(bundle.get("language.select"), Some("Select language"));
    }

    #[test]
    fn directory_registry_reads_lazily() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("ja")).unwrap();
        std::fs::create_dir_all(dir.path().join("fr")).unwrap();
        let ja_errors = dir.path().join("ja").join("errors.json");
        std::fs::write(&ja_errors, r#"{ "generic": "エラー" }"#).unwrap();
        std::fs::write(dir.path().join("fr").join("errors.json"), "{}").unwrap();

        let registry = ResourceRegistry::from_dir(dir.path());
        assert_eq!(registry.len(), 1);

        // Content is read at load time
        std::fs::write(&ja_errors, r#"{ "generic": "問題が発生しました。" }"#).unwrap();
        let loader = registry.loader(ResourceKey::new(Locale::Ja, Namespace::Errors)).unwrap();
        let bundle = block_on(loader()).unwrap();
        assert_eq!(bundle.get("generic"), Some("問題が発生しました。"));

        std::fs::remove_file(&ja_errors).unwrap();
        assert!(matches!(block_on(loader()), Err(LoadError::Io { .. })));
    }

    #[test]
    fn missing_directory_gives_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ResourceRegistry::from_dir(dir.path().join("absent")).is_empty());
    }
}
