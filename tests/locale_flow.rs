use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::*;
use bevy::tasks::block_on;
use bevy_locale::{
    use_locale,
    DocumentAttributes,
    DomSync,
    FixedLanguages,
    Locale,
    LocaleConfig,
    LocaleContext,
    LocalePlugin,
    LocaleState,
    Namespace,
    Navigation,
    PendingLocaleChanges,
    PersistenceAdapter,
    ResourceKey,
    ResourceLoader,
    ResourceRegistry,
    ResourceStore,
    SharedDocument,
    TranslationEngine,
    UseLocale,
};

fn bundled_state(persistence: PersistenceAdapter) -> (LocaleState, SharedDocument) {
    let loader = ResourceLoader::new(ResourceRegistry::bundled(), Arc::new(ResourceStore::new()));
    let document = SharedDocument::new();
    let state = LocaleState::new(
        TranslationEngine::new(loader),
        persistence,
        DomSync::new(Arc::new(document.clone()))
    );
    (state, document)
}

#[test]
fn first_visit_with_japanese_system_language() {
    let (state, document) = bundled_state(PersistenceAdapter::in_memory());

    // Available before anything is awaited
    assert_eq!(state.engine().t("loading"), "Loading...");
    assert!(state.engine().loader().get(ResourceKey::EMBEDDED).is_some());

    let detection = block_on(state.initialize(&Navigation::none(), &FixedLanguages::new(["ja-JP", "en-US"])));
    assert_eq!(detection.locale, Locale::Ja);
    assert_eq!(document.snapshot().lang, "ja");
    assert_eq!(state.engine().t("loading"), "読み込み中...");

    let workflows = block_on(state.engine().namespace(Namespace::Workflows));
    assert_eq!(workflows.t("run.start"), "実行");
    assert_eq!(workflows.t("common:actions.save"), "保存");
}

#[test]
fn missing_namespace_falls_back_to_english() {
    let (state, _) = bundled_state(PersistenceAdapter::in_memory());
    block_on(state.set(Locale::Ja));

    let tasks = block_on(state.engine().namespace(Namespace::Tasks));
    assert_eq!(tasks.t("status.queued"), "Queued");
    assert!(state.engine().store().contains(ResourceKey::new(Locale::Ja, Namespace::Tasks)));
}

#[test]
fn explicit_change_is_remembered_across_sessions() {
    let dir = tempfile::tempdir().unwrap();

    let (session, document) = bundled_state(PersistenceAdapter::in_dir(dir.path()));
    block_on(session.set(Locale::Ja));
    assert_eq!(document.snapshot().lang, "ja");
    let cookie = session.persistence().cookie().read().unwrap();
    assert_eq!(cookie.as_deref(), Some("ja"));
    drop(session);

    // A query parameter still wins over the saved preference
    let (next, _) = bundled_state(PersistenceAdapter::in_dir(dir.path()));
    let navigation = Navigation::parse("https://app.example.com/?lng=en");
    let detection = block_on(next.initialize(&navigation, &FixedLanguages::default()));
    assert_eq!(detection.locale, Locale::En);

    let (last, _) = bundled_state(PersistenceAdapter::in_dir(dir.path()));
    let detection = block_on(last.initialize(&Navigation::none(), &FixedLanguages::new(["en-US"])));
    assert_eq!(detection.locale, Locale::Ja);
}

fn app_with(config: LocaleConfig) -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LocalePlugin::with_config(config)));
    app
}

#[test]
fn plugin_detects_locale_and_syncs_document() {
    let mut app = app_with(LocaleConfig {
        ambient_languages: Some(vec!["ja-JP".into()]),
        ..Default::default()
    });
    app.update();

    let context = use_locale(app.world()).unwrap();
    assert_eq!(context.locale(), Locale::Ja);
    assert!(!context.is_loading());
    assert_eq!(context.t("navigation.settings"), "設定");

    let attributes = app.world().resource::<DocumentAttributes>();
    assert_eq!(attributes.lang, "ja");
    assert_eq!(app.world().resource::<SharedDocument>().snapshot().lang, "ja");
}

#[test]
fn launch_url_overrides_system_language() {
    let mut app = app_with(LocaleConfig {
        launch_url: Some("https://app.example.com/workflows?lng=ja".into()),
        ambient_languages: Some(vec!["en-GB".into()]),
        ..Default::default()
    });
    app.update();

    assert_eq!(app.world().resource::<LocaleContext>().locale(), Locale::Ja);
}

fn request_english(mut locale: UseLocale, mut requested: Local<bool>) {
    if !*requested {
        *requested = true;
        locale.set_locale(Locale::En);
    }
}

#[test]
fn system_requested_change_completes() {
    let mut app = app_with(LocaleConfig {
        ambient_languages: Some(vec!["ja".into()]),
        ..Default::default()
    });
    app.add_systems(Update, request_english);
    app.update();

    for _ in 0..200 {
        if app.world().resource::<PendingLocaleChanges>().is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
        app.update();
    }
    // One more frame copies the document attributes out
    app.update();

    let context = app.world().resource::<LocaleContext>();
    assert_eq!(context.locale(), Locale::En);
    assert_eq!(context.state().persistence().read(), Some(Locale::En));
    assert_eq!(app.world().resource::<DocumentAttributes>().lang, "en");
}
