//! Closed catalog of supported locales and translation namespaces.
//!
//! Adding a language or a namespace means adding a variant here and a
//! matching `locales/{locale}/{namespace}.json` file; nothing outside this
//! catalog is ever registered or loaded.

use std::fmt;

use serde::{ Deserialize, Serialize };

/// Language codes rendered right-to-left. None of the current locales are,
/// but direction is always derived through this list.
pub const RTL_LANGUAGES: &[&str] = &["ar", "he"];

/// A supported locale, identified by its base language code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Ja,
}

impl Locale {
    /// Every supported locale, in display order.
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Ja];

    /// Locale used when nothing else resolves, and the fallback for missing bundles.
    pub const DEFAULT: Locale = Locale::En;

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ja => "ja",
        }
    }

    /// Exact, case-sensitive lookup of a base code. Use
    /// [`normalize`](crate::normalize::normalize) for arbitrary tags.
    pub fn from_code(code: &str) -> Option<Locale> {
        Locale::ALL.into_iter().find(|locale| locale.code() == code)
    }

    /// Name of the language in that language, for selectors.
    pub fn native_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Ja => "日本語",
        }
    }

    pub fn direction(self) -> Direction {
        Direction::for_language(self.code())
    }

    pub fn is_default(self) -> bool {
        self == Locale::DEFAULT
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A named group of translation keys, loaded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Common,
    Errors,
    Workflows,
    Tasks,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Common,
        Namespace::Errors,
        Namespace::Workflows,
        Namespace::Tasks,
    ];

    /// Namespace used by `t` when a key carries no `ns:` prefix, and the
    /// fallback namespace for missing keys.
    pub const DEFAULT: Namespace = Namespace::Common;

    pub fn code(self) -> &'static str {
        match self {
            Namespace::Common => "common",
            Namespace::Errors => "errors",
            Namespace::Workflows => "workflows",
            Namespace::Tasks => "tasks",
        }
    }

    pub fn from_code(code: &str) -> Option<Namespace> {
        Namespace::ALL.into_iter().find(|ns| ns.code() == code)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Identifies one loadable bundle, addressed as `{locale}/{namespace}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub locale: Locale,
    pub namespace: Namespace,
}

impl ResourceKey {
    pub const fn new(locale: Locale, namespace: Namespace) -> Self {
        Self { locale, namespace }
    }

    /// The bundle embedded in the binary so first paint never waits on a load.
    pub const EMBEDDED: ResourceKey = ResourceKey::new(Locale::DEFAULT, Namespace::DEFAULT);

    /// Same namespace in the default locale.
    pub fn fallback(self) -> Option<ResourceKey> {
        (!self.locale.is_default()).then(|| ResourceKey::new(Locale::DEFAULT, self.namespace))
    }

    /// Every key in the catalog product, locale-major.
    pub fn all() -> impl Iterator<Item = ResourceKey> {
        Locale::ALL.into_iter().flat_map(|locale| {
            Namespace::ALL.into_iter().map(move |namespace| ResourceKey::new(locale, namespace))
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.locale, self.namespace)
    }
}

/// Text direction written to the document's `dir` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn for_language(code: &str) -> Direction {
        if RTL_LANGUAGES.contains(&code) { Direction::Rtl } else { Direction::Ltr }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
