//! Active resource registration shared by the loader and the engine, plus
//! the subscriber list that hears about locale changes and added bundles.

use std::collections::HashMap;
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Arc, PoisonError, RwLock };

use crate::bundle::TranslationBundle;
use crate::locales::{ Locale, ResourceKey };

/// Subscriber to engine notifications.
///
/// Observers fire in subscription order, after the state change they
/// describe is already visible.
pub trait LocaleObserver: Send + Sync {
    /// The active locale became `locale`.
    fn locale_changed(&self, locale: Locale);

    /// A bundle was registered (or replaced) for `key`.
    fn bundle_added(&self, _key: ResourceKey) {}
}

/// Handle returned by [`ResourceStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct ResourceStore {
    bundles: RwLock<HashMap<ResourceKey, Arc<TranslationBundle>>>,
    observers: RwLock<Vec<(ObserverId, Arc<dyn LocaleObserver>)>>,
    next_id: AtomicU64,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bundle` under `key` in place and notifies subscribers.
    pub fn add(&self, key: ResourceKey, bundle: Arc<TranslationBundle>) {
        self.bundles.write().unwrap_or_else(PoisonError::into_inner).insert(key, bundle);
        for observer in self.snapshot() {
            observer.bundle_added(key);
        }
    }

    pub fn get(&self, key: ResourceKey) -> Option<Arc<TranslationBundle>> {
        self.bundles.read().unwrap_or_else(PoisonError::into_inner).get(&key).cloned()
    }

    pub fn contains(&self, key: ResourceKey) -> bool {
        self.bundles.read().unwrap_or_else(PoisonError::into_inner).contains_key(&key)
    }

    pub fn subscribe(&self, observer: Arc<dyn LocaleObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().unwrap_or_else(PoisonError::into_inner).push((id, observer));
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub(crate) fn notify_locale_changed(&self, locale: Locale) {
        for observer in self.snapshot() {
            observer.locale_changed(locale);
        }
    }

    // Observers run outside the lock so they may subscribe or read bundles.
    fn snapshot(&self) -> Vec<Arc<dyn LocaleObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locales::Namespace;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl LocaleObserver for Recorder {
        fn locale_changed(&self, locale: Locale) {
            self.0.lock().unwrap().push(format!("locale:{locale}"));
        }

        fn bundle_added(&self, key: ResourceKey) {
            self.0.lock().unwrap().push(format!("added:{key}"));
        }
    }

    #[test]
    fn subscribers_hear_additions_and_changes_until_unsubscribed() {
        let store = ResourceStore::new();
        let recorder = Arc::new(Recorder::default());
        let id = store.subscribe(recorder.clone());

        let key = ResourceKey::new(Locale::Ja, Namespace::Errors);
        store.add(key, Arc::new(TranslationBundle::empty()));
        store.notify_locale_changed(Locale::Ja);
        assert!(store.contains(key));

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.notify_locale_changed(Locale::En);

        assert_eq!(*recorder.0.lock().unwrap(), vec!["added:ja/errors", "locale:ja"]);
    }
}
