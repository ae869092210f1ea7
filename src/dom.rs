//! Keeps document-level `lang` and `dir` attributes in line with the
//! active locale.

use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Arc, PoisonError, RwLock };

use bevy::prelude::Resource;

use crate::locales::{ Direction, Locale };
use crate::store::LocaleObserver;

/// The document whose root carries the locale attributes.
pub trait Document: Send + Sync {
    fn set_lang(&self, lang: &str);
    fn set_dir(&self, dir: Direction);
}

/// Root attributes of the rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Resource)]
pub struct DocumentAttributes {
    pub lang: String,
    pub dir: Direction,
}

impl Default for DocumentAttributes {
    fn default() -> Self {
        Self { lang: Locale::DEFAULT.code().to_string(), dir: Direction::Ltr }
    }
}

/// In-process [`Document`] that can be read back from any thread. Every
/// write bumps a revision counter so readers can tell when to copy it out.
#[derive(Debug, Clone, Default, Resource)]
pub struct SharedDocument {
    attributes: Arc<RwLock<DocumentAttributes>>,
    revision: Arc<AtomicU64>,
}

impl SharedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DocumentAttributes {
        self.attributes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn update(&self, apply: impl FnOnce(&mut DocumentAttributes)) {
        apply(&mut self.attributes.write().unwrap_or_else(PoisonError::into_inner));
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

impl Document for SharedDocument {
    fn set_lang(&self, lang: &str) {
        self.update(|attrs| {
            attrs.lang = lang.to_string();
        });
    }

    fn set_dir(&self, dir: Direction) {
        self.update(|attrs| {
            attrs.dir = dir;
        });
    }
}

/// Writes `lang` and `dir` for every locale change it hears about, whether
/// called directly or subscribed to the engine. Holds no locale itself.
#[derive(Clone)]
pub struct DomSync {
    document: Arc<dyn Document>,
}

impl DomSync {
    pub fn new(document: Arc<dyn Document>) -> Self {
        Self { document }
    }

    pub fn apply(&self, locale: Locale) {
        self.document.set_lang(locale.code());
        self.document.set_dir(locale.direction());
    }
}

impl LocaleObserver for DomSync {
    fn locale_changed(&self, locale: Locale) {
        self.apply(locale);
    }
}
