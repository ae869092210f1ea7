//! Reduces arbitrary language tags to a supported base locale.

use crate::locales::Locale;

/// Separators that end the primary language subtag (`ja-JP`, `ja_JP.UTF-8`).
const SUBTAG_SEPARATORS: [char; 2] = ['-', '_'];

/// Maps `tag` to a supported locale, or `None` when it is absent, empty or
/// names a language outside the catalog.
///
/// Region and script subtags are dropped: `ja-JP`, `JA_jp` and `ja` all
/// normalize to [`Locale::Ja`]. Never fails; an unusable tag is simply absent.
///
/// ```rust
/// use bevy_locale::{ normalize, Locale };
///
/// assert_eq!(normalize(Some("en-US")), Some(Locale::En));
/// assert_eq!(normalize(Some("fr-FR")), None);
/// assert_eq!(normalize(None), None);
/// ```
pub fn normalize(tag: Option<&str>) -> Option<Locale> {
    let primary = tag?.trim().split(SUBTAG_SEPARATORS).next()?.trim();
    if primary.is_empty() {
        return None;
    }
    Locale::from_code(&primary.to_ascii_lowercase())
}

/// First candidate in `tags` that normalizes, in order.
pub fn first_supported<'a>(tags: impl IntoIterator<Item = &'a str>) -> Option<Locale> {
    tags.into_iter().find_map(|tag| normalize(Some(tag)))
}
