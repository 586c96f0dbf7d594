use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A movie identifier in one of the two external catalog namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogRef {
    Kinopoisk(String),
    Imdb(String),
}

impl CatalogRef {
    pub fn id(&self) -> &str {
        match self {
            CatalogRef::Kinopoisk(id) | CatalogRef::Imdb(id) => id,
        }
    }
}

impl fmt::Display for CatalogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogRef::Kinopoisk(id) => write!(f, "kinopoisk:{}", id),
            CatalogRef::Imdb(id) => write!(f, "imdb:{}", id),
        }
    }
}

fn kinopoisk_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)kinopoisk\.ru/(?:film|series)/(\d+)").expect("valid kinopoisk url regex")
    })
}

fn imdb_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)imdb\.com/title/(tt\d+)").expect("valid imdb url regex"))
}

fn imdb_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^tt\d+$").expect("valid imdb id regex"))
}

/// Extracts a catalog id from a kinopoisk.ru / imdb.com URL or a bare id.
///
/// Bare digits are a kinopoisk id, `tt<digits>` an IMDb id. Anything else is
/// unsupported and yields `None`.
pub fn parse_movie_reference(input: &str) -> Option<CatalogRef> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.chars().all(|c| c.is_ascii_digit()) {
        return Some(CatalogRef::Kinopoisk(input.to_string()));
    }
    if imdb_id().is_match(input) {
        return Some(CatalogRef::Imdb(input.to_string()));
    }
    if let Some(caps) = kinopoisk_url().captures(input) {
        return Some(CatalogRef::Kinopoisk(caps[1].to_string()));
    }
    if let Some(caps) = imdb_url().captures(input) {
        return Some(CatalogRef::Imdb(caps[1].to_string()));
    }

    None
}
