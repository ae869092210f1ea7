//! The locale capability handed to UI code.

use std::future::Future;
use std::sync::Arc;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::tasks::{ block_on, futures_lite::future, IoTaskPool, Task };

use crate::engine::{ TranslationEngine, Translator };
use crate::error::LocaleError;
use crate::locales::{ Locale, Namespace };
use crate::state::LocaleState;

/// Current locale, the explicit-change function and a loading flag.
///
/// Cloning shares the same [`LocaleState`]. Inserted as a resource by
/// [`LocalePlugin`](crate::LocalePlugin); outside Bevy, build one with
/// [`LocaleContext::new`].
#[derive(Clone, Resource)]
pub struct LocaleContext {
    state: Arc<LocaleState>,
}

impl LocaleContext {
    pub fn new(state: LocaleState) -> Self {
        Self { state: Arc::new(state) }
    }

    pub fn locale(&self) -> Locale {
        self.state.current()
    }

    /// Runs the full change sequence. The future owns what it needs, so it
    /// can be spawned.
    pub fn set_locale(&self, locale: Locale) -> impl Future<Output = ()> + Send + use<> {
        let state = self.state.clone();
        async move { state.set(locale).await }
    }

    /// Always `false`: every source is local. Reserved for network-backed
    /// resolution.
    pub fn is_loading(&self) -> bool {
        false
    }

    pub fn t(&self, key: &str) -> String {
        self.state.engine().t(key)
    }

    pub fn translator(&self, namespace: Namespace) -> Translator {
        self.state.engine().translator(namespace)
    }

    pub fn engine(&self) -> &TranslationEngine {
        self.state.engine()
    }

    pub fn state(&self) -> &Arc<LocaleState> {
        &self.state
    }
}

/// Fetches the locale capability from `world`.
///
/// Fails with [`LocaleError::OutsideProvider`] when the plugin was never
/// added; that is a wiring defect and callers should not try to recover.
pub fn use_locale(world: &World) -> Result<LocaleContext, LocaleError> {
    world.get_resource::<LocaleContext>().cloned().ok_or(LocaleError::OutsideProvider)
}

/// Locale changes requested from systems, still running.
#[derive(Resource, Default)]
pub struct PendingLocaleChanges {
    tasks: Vec<Task<Locale>>,
}

impl PendingLocaleChanges {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

/// System parameter form of [`LocaleContext`].
///
/// ```rust,ignore
/// fn language_menu(mut locale: UseLocale, keys: Res<ButtonInput<KeyCode>>) {
///     if keys.just_pressed(KeyCode::KeyJ) {
///         locale.set_locale(Locale::Ja);
///     }
/// }
/// ```
///
/// A system using it will not run in a world without
/// [`LocalePlugin`](crate::LocalePlugin).
#[derive(SystemParam)]
pub struct UseLocale<'w> {
    context: Res<'w, LocaleContext>,
    pending: ResMut<'w, PendingLocaleChanges>,
}

impl UseLocale<'_> {
    pub fn locale(&self) -> Locale {
        self.context.locale()
    }

    /// Starts the change on the IO task pool; it completes over the next
    /// frames.
    pub fn set_locale(&mut self, locale: Locale) {
        let change = self.context.set_locale(locale);
        let task = IoTaskPool::get().spawn(async move {
            change.await;
            locale
        });
        self.pending.tasks.push(task);
    }

    pub fn is_loading(&self) -> bool {
        self.context.is_loading()
    }

    pub fn t(&self, key: &str) -> String {
        self.context.t(key)
    }

    pub fn translator(&self, namespace: Namespace) -> Translator {
        self.context.translator(namespace)
    }
}

pub(crate) fn poll_locale_changes(mut pending: ResMut<PendingLocaleChanges>) {
    pending.tasks.retain_mut(|task| {
        match block_on(future::poll_once(task)) {
            Some(locale) => {
                info!("Language change complete: {}", locale);
                false
            }
            None => true,
        }
    });
}
