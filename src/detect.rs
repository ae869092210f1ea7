//! Startup locale detection over an ordered list of sources.

use std::fmt;

use url::{ form_urlencoded, Url };

use crate::locales::Locale;
use crate::normalize::{ first_supported, normalize };
use crate::persistence::PersistenceAdapter;

/// Query parameter carrying a one-off locale override, as in `?lng=ja`.
pub const LOOKUP_QUERY: &str = "lng";

/// Reports the environment's preferred languages, most preferred first.
pub trait AmbientLanguages: Send + Sync {
    fn preferred_languages(&self) -> Vec<String>;
}

/// The host's language preferences via `sys-locale`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLanguages;

impl AmbientLanguages for SystemLanguages {
    fn preferred_languages(&self) -> Vec<String> {
        sys_locale::get_locales().collect()
    }
}

/// A fixed preference list, e.g. from an `Accept-Language` header.
#[derive(Debug, Default, Clone)]
pub struct FixedLanguages(pub Vec<String>);

impl FixedLanguages {
    pub fn new<I, S>(tags: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        Self(tags.into_iter().map(Into::into).collect())
    }
}

impl AmbientLanguages for FixedLanguages {
    fn preferred_languages(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Query parameters of the navigation that launched the session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Navigation {
    params: Vec<(String, String)>,
}

impl Navigation {
    pub fn none() -> Self {
        Self::default()
    }

    /// Accepts a full URL or a bare query string (with or without `?`).
    pub fn parse(input: &str) -> Self {
        match Url::parse(input) {
            Ok(url) => Self { params: url.query_pairs().into_owned().collect() },
            Err(_) => Self::from_query(input),
        }
    }

    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self { params: form_urlencoded::parse(query.as_bytes()).into_owned().collect() }
    }

    /// First value of `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Where the detected locale came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    QueryString,
    Cookie,
    LocalStorage,
    Navigator,
    Default,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectionSource::QueryString => "URL parameter",
            DetectionSource::Cookie => "cookie",
            DetectionSource::LocalStorage => "local storage",
            DetectionSource::Navigator => "browser language",
            DetectionSource::Default => "default",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub locale: Locale,
    pub source: DetectionSource,
}

/// Picks the startup locale. Precedence, first supported value wins:
///
/// 1. query parameter on the launch navigation
/// 2. cookie
/// 3. local storage
/// 4. ambient language preferences, first one that normalizes
/// 5. [`Locale::DEFAULT`]
///
/// A source holding an unsupported or malformed tag counts as absent.
pub struct LocaleDetector<'a> {
    navigation: &'a Navigation,
    persistence: &'a PersistenceAdapter,
    ambient: &'a dyn AmbientLanguages,
    lookup_query: &'a str,
}

impl<'a> LocaleDetector<'a> {
    pub fn new(
        navigation: &'a Navigation,
        persistence: &'a PersistenceAdapter,
        ambient: &'a dyn AmbientLanguages
    ) -> Self {
        Self { navigation, persistence, ambient, lookup_query: LOOKUP_QUERY }
    }

    pub fn with_lookup_query(mut self, name: &'a str) -> Self {
        self.lookup_query = name;
        self
    }

    pub fn detect(&self) -> Locale {
        self.detect_with_source().locale
    }

    pub fn detect_with_source(&self) -> Detection {
        let detection = self.first_hit().unwrap_or(Detection {
            locale: Locale::DEFAULT,
            source: DetectionSource::Default,
        });
        dev_info!("[i18n] Using {}: {}", detection.source, detection.locale);
        detection
    }

    fn first_hit(&self) -> Option<Detection> {
        let hit = |locale: Option<Locale>, source| locale.map(|locale| Detection { locale, source });

        hit(normalize(self.navigation.param(self.lookup_query)), DetectionSource::QueryString)
            .or_else(|| hit(self.persistence.read_cookie(), DetectionSource::Cookie))
            .or_else(|| hit(self.persistence.read_local(), DetectionSource::LocalStorage))
            .or_else(|| {
                let languages = self.ambient.preferred_languages();
                hit(first_supported(languages.iter().map(String::as_str)), DetectionSource::Navigator)
            })
    }
}
