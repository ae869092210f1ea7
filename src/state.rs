//! The single source of truth for the active locale.

use std::sync::Arc;

use futures_util::lock::Mutex;

use crate::detect::{ AmbientLanguages, Detection, LocaleDetector, Navigation };
use crate::dom::DomSync;
use crate::engine::TranslationEngine;
use crate::locales::Locale;
use crate::normalize::normalize;
use crate::persistence::PersistenceAdapter;

/// Owns the active locale and keeps the engine, the persisted preference
/// and the document attributes in agreement.
pub struct LocaleState {
    engine: TranslationEngine,
    persistence: PersistenceAdapter,
    dom: DomSync,
    lookup_query: String,
    /// Serializes explicit changes; a second `set` waits for the first.
    change: Mutex<()>,
}

impl LocaleState {
    /// Subscribes `dom` to the engine's change notifications and writes the
    /// engine's current locale to the document right away.
    pub fn new(engine: TranslationEngine, persistence: PersistenceAdapter, dom: DomSync) -> Self {
        engine.subscribe(Arc::new(dom.clone()));
        dom.apply(engine.language());

        Self {
            engine,
            persistence,
            dom,
            lookup_query: crate::detect::LOOKUP_QUERY.to_string(),
            change: Mutex::new(()),
        }
    }

    pub fn with_lookup_query(mut self, name: impl Into<String>) -> Self {
        self.lookup_query = name.into();
        self
    }

    pub fn current(&self) -> Locale {
        self.engine.language()
    }

    /// Explicit change, usually user-driven. Runs every step, in order, even
    /// when `locale` is already active:
    ///
    /// 1. switch the engine (loads bundles the mounted UI needs)
    /// 2. write the preference through to both stores
    /// 3. update the document attributes
    pub async fn set(&self, locale: Locale) {
        let _guard = self.change.lock().await;
        dev_info!("[i18n] User requested language change: {}", locale);

        self.engine.change_language(locale).await;

        if let Err(e) = self.persistence.write(locale) {
            dev_error!("[i18n] Failed to persist language {}: {}", locale, e);
        }

        self.dom.apply(locale);
        dev_info!("[i18n] Language change complete: {}", locale);
    }

    /// [`set`](Self::set) for a raw tag. An unsupported tag changes nothing
    /// and returns `None`.
    pub async fn set_tag(&self, tag: &str) -> Option<Locale> {
        let Some(locale) = normalize(Some(tag)) else {
            dev_error!("[i18n] Invalid language: {}", tag);
            return None;
        };
        self.set(locale).await;
        Some(locale)
    }

    /// Runs detection against this state's persisted preference.
    pub fn detect(&self, navigation: &Navigation, ambient: &dyn AmbientLanguages) -> Detection {
        LocaleDetector::new(navigation, &self.persistence, ambient)
            .with_lookup_query(&self.lookup_query)
            .detect_with_source()
    }

    /// Startup path: switches the engine to `detected` only when it differs
    /// from the active locale. Nothing is persisted. Returns whether a
    /// switch happened.
    pub async fn apply_detected(&self, detected: Locale) -> bool {
        let current = self.current();
        if current == detected {
            return false;
        }

        dev_info!("[i18n] Switching from {} to {}", current, detected);
        let _guard = self.change.lock().await;
        self.engine.change_language(detected).await;
        true
    }

    /// Detects once and applies the result.
    pub async fn initialize(&self, navigation: &Navigation, ambient: &dyn AmbientLanguages) -> Detection {
        let detection = self.detect(navigation, ambient);
        self.apply_detected(detection.locale).await;
        detection
    }

    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }
}
