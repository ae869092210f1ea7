#![doc = include_str!("../README.md")]

//! # bevy-locale
//!
//! Locale resolution and lazy translation loading for [Bevy](https://bevyengine.org/):
//!
//! - **Detection**: query parameter, cookie, local storage, system languages, default
//! - **Normalization**: `ja-JP`, `ja_JP` and `JA` all resolve to `ja`
//! - **Lazy namespaces**: bundles load on first use, once per `(locale, namespace)`
//! - **Fallback**: a missing or broken bundle falls back to English, then to an empty bundle
//! - **Synchronization**: a change updates strings, the saved preference and the
//!   document attributes, in that order
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use bevy_locale::{ LocalePlugin, Locale, Namespace, UseLocale };
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(LocalePlugin::default())
//!         .add_systems(Update, language_menu)
//!         .run();
//! }
//!
//! fn language_menu(mut locale: UseLocale, keys: Res<ButtonInput<KeyCode>>) {
//!     if keys.just_pressed(KeyCode::KeyJ) {
//!         locale.set_locale(Locale::Ja);
//!     }
//!     let nav = locale.translator(Namespace::Common);
//!     println!("{}", nav.t("navigation.settings"));
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::*;
use bevy::tasks::{ block_on, IoTaskPool };

/// Diagnostics for recoverable conditions; compiled out of release builds.
macro_rules! dev_info {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            ::bevy::log::info!($($arg)*);
        }
    };
}

macro_rules! dev_warn {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            ::bevy::log::warn!($($arg)*);
        }
    };
}

macro_rules! dev_error {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            ::bevy::log::error!($($arg)*);
        }
    };
}

pub mod bundle;
pub mod context;
pub mod detect;
pub mod dom;
pub mod engine;
pub mod error;
pub mod loader;
pub mod locales;
pub mod normalize;
pub mod persistence;
pub mod registry;
pub mod state;
pub mod store;

pub use bundle::TranslationBundle;
pub use context::{ use_locale, LocaleContext, PendingLocaleChanges, UseLocale };
pub use detect::{ Detection, DetectionSource, FixedLanguages, LocaleDetector, Navigation, SystemLanguages };
pub use dom::{ DocumentAttributes, DomSync, SharedDocument };
pub use engine::{ TranslationEngine, Translator };
pub use error::{ LoadError, LocaleError, PersistenceError };
pub use loader::ResourceLoader;
pub use locales::{ Direction, Locale, Namespace, ResourceKey };
pub use normalize::normalize;
pub use persistence::PersistenceAdapter;
pub use registry::ResourceRegistry;
pub use state::LocaleState;
pub use store::{ LocaleObserver, ResourceStore };

/// Configuration for the locale plugin.
///
/// # Example
///
/// ```rust
/// use bevy_locale::LocaleConfig;
///
/// let config = LocaleConfig {
///     launch_url: Some("https://app.example.com/?lng=ja".to_string()),
///     storage_dir: Some("prefs".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Resource)]
pub struct LocaleConfig {
    /// Use translations embedded at build time (true) or read from
    /// `messages_folder` on first load (false).
    /// Always treated as `true` for WASM targets or with the `bundle-only` feature.
    /// Default: true
    pub use_bundled_translations: bool,
    /// Folder holding `{locale}/{namespace}.json`.
    /// Default: "locales"
    pub messages_folder: String,
    /// Directory for the persisted preference. `None` keeps it in memory.
    pub storage_dir: Option<PathBuf>,
    /// Query parameter checked on the launch URL.
    /// Default: "lng"
    pub lookup_query: String,
    /// Default: "i18next"
    pub lookup_cookie: String,
    /// Default: "i18nextLng"
    pub lookup_local_storage: String,
    /// Default: one year
    pub cookie_max_age: Duration,
    /// URL or query string the session was opened with.
    pub launch_url: Option<String>,
    /// Overrides the system language list.
    pub ambient_languages: Option<Vec<String>>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            use_bundled_translations: true,
            messages_folder: "locales".to_string(),
            storage_dir: None,
            lookup_query: detect::LOOKUP_QUERY.to_string(),
            lookup_cookie: persistence::COOKIE_NAME.to_string(),
            lookup_local_storage: persistence::STORAGE_KEY.to_string(),
            cookie_max_age: persistence::COOKIE_MAX_AGE,
            launch_url: None,
            ambient_languages: None,
        }
    }
}

impl LocaleConfig {
    pub fn registry(&self) -> ResourceRegistry {
        let bundled = self.use_bundled_translations ||
            cfg!(target_arch = "wasm32") ||
            cfg!(feature = "bundle-only");
        if bundled {
            ResourceRegistry::bundled()
        } else {
            ResourceRegistry::from_dir(&self.messages_folder)
        }
    }

    pub fn persistence(&self) -> PersistenceAdapter {
        use persistence::{ CookieStore, FileBackend, KeyValueBackend, LocalStorage, MemoryBackend };

        let (cookies, local): (Arc<dyn KeyValueBackend>, Arc<dyn KeyValueBackend>) = match &self.storage_dir {
            Some(dir) =>
                (
                    Arc::new(FileBackend::new(dir.join("cookies.json"))),
                    Arc::new(FileBackend::new(dir.join("local_storage.json"))),
                ),
            None => (Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new())),
        };

        PersistenceAdapter::new(
            CookieStore::new(cookies, self.lookup_cookie.clone(), self.cookie_max_age),
            LocalStorage::new(local, self.lookup_local_storage.clone())
        )
    }

    pub fn navigation(&self) -> Navigation {
        self.launch_url.as_deref().map(Navigation::parse).unwrap_or_default()
    }

    /// Builds the whole pipeline, writing document attributes to `document`.
    pub fn build_state(&self, document: SharedDocument, spawner: Option<engine::Spawner>) -> LocaleState {
        let loader = ResourceLoader::new(self.registry(), Arc::new(ResourceStore::new()));
        let engine = match spawner {
            Some(spawner) => TranslationEngine::with_spawner(loader, spawner),
            None => TranslationEngine::new(loader),
        };
        LocaleState::new(engine, self.persistence(), DomSync::new(Arc::new(document)))
            .with_lookup_query(self.lookup_query.clone())
    }
}

// ---------- Bevy Plugin ----------

/// Adds [`LocaleContext`], [`SharedDocument`] and [`DocumentAttributes`]
/// resources, detects the startup locale and drives locale changes
/// requested through [`UseLocale`].
///
/// ```rust,ignore
/// App::new().add_plugins(LocalePlugin::with_config(LocaleConfig {
///     storage_dir: Some("prefs".into()),
///     ..Default::default()
/// }));
/// ```
#[derive(Default)]
pub struct LocalePlugin {
    pub config: LocaleConfig,
}

impl LocalePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LocaleConfig) -> Self {
        Self { config }
    }
}

impl Plugin for LocalePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .init_resource::<SharedDocument>()
            .init_resource::<LocaleContext>()
            .init_resource::<PendingLocaleChanges>()
            .init_resource::<DocumentAttributes>()
            .add_systems(Startup, detect_startup_locale)
            .add_systems(Update, (context::poll_locale_changes, sync_document_attributes).chain());
    }
}

impl FromWorld for LocaleContext {
    fn from_world(world: &mut World) -> Self {
        let config = world.get_resource::<LocaleConfig>().cloned().unwrap_or_default();
        let document = world.get_resource_or_insert_with(SharedDocument::new).clone();

        // Lets plain `t` calls start loads for namespaces not cached yet
        let spawner: engine::Spawner = Arc::new(|load| {
            if let Some(pool) = IoTaskPool::try_get() {
                pool.spawn(load).detach();
            }
        });

        LocaleContext::new(config.build_state(document, Some(spawner)))
    }
}

fn detect_startup_locale(context: Res<LocaleContext>, config: Res<LocaleConfig>) {
    let navigation = config.navigation();
    let state = context.state();

    let detection = match &config.ambient_languages {
        Some(languages) => state.detect(&navigation, &FixedLanguages(languages.clone())),
        None => state.detect(&navigation, &SystemLanguages),
    };
    info!("Detected language {} from {}", detection.locale, detection.source);

    // Only embedded bundles are involved unless the locale changes; either
    // way nothing here waits on the task pool
    block_on(state.apply_detected(detection.locale));
}

fn sync_document_attributes(
    document: Res<SharedDocument>,
    mut attributes: ResMut<DocumentAttributes>,
    mut seen: Local<Option<u64>>
) {
    let revision = document.revision();
    if *seen != Some(revision) {
        *seen = Some(revision);
        attributes.set_if_neq(document.snapshot());
    }
}
