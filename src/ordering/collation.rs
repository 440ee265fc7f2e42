//! Locale-aware string collation
//!
//! A primary-strength collation: strings compare by base letters only, so
//! case and accent differences compare equal, as in the store's `*_ci`
//! collations. Tailorings move or expand letters before weighting. Callers
//! that need a total order break ties themselves.

use std::cmp::Ordering;

/// Language-specific tailoring of the root collation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tailoring {
    /// Accented letters weigh as their base letter
    Root,
    /// Phonebook order: `ä`, `ö`, `ü` expand to `ae`, `oe`, `ue`
    German,
    /// Swedish and Finnish: `å`, `ä`, `ö` are letters after `z`
    Swedish,
    /// Danish and Norwegian: `æ`, `ø`, `å` are letters after `z`
    Danish,
}

/// Collation rules for one locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collation {
    locale: String,
    tailoring: Tailoring,
}

/// Sort key produced by a collation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: Vec<(u8, u32)>,
}

const GROUP_OTHER: u8 = 0;
const GROUP_DIGIT: u8 = 1;
const GROUP_LETTER: u8 = 2;

impl Collation {
    /// Resolves a BCP 47 / POSIX style locale tag (`de`, `sv_SE`, `nb-NO`)
    pub fn for_locale(tag: &str) -> Self {
        let language = tag
            .split(|c| c == '-' || c == '_' || c == '.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let tailoring = match language.as_str() {
            "de" => Tailoring::German,
            "sv" | "fi" => Tailoring::Swedish,
            "da" | "nb" | "nn" | "no" => Tailoring::Danish,
            _ => Tailoring::Root,
        };
        Self {
            locale: tag.to_string(),
            tailoring,
        }
    }

    /// The locale tag this collation was built from
    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn tailoring(&self) -> Tailoring {
        self.tailoring
    }

    /// Compares two strings under this collation
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }

    /// Builds the sort key for a string
    pub fn key(&self, s: &str) -> CollationKey {
        let mut key = CollationKey {
            primary: Vec::with_capacity(s.len()),
        };
        for lower in s.chars().flat_map(char::to_lowercase) {
            self.push_weights(lower, &mut key);
        }
        key
    }

    fn push_weights(&self, c: char, key: &mut CollationKey) {
        if let Some(rank) = self.extra_letter(c) {
            key.primary.push((GROUP_LETTER, 'z' as u32 + rank));
            return;
        }
        if let Some(expansion) = self.expansion(c) {
            for base in expansion.chars() {
                key.primary.push((GROUP_LETTER, base as u32));
            }
            return;
        }
        if let Some(digit) = c.to_digit(10) {
            key.primary.push((GROUP_DIGIT, digit));
        } else if c.is_alphabetic() {
            key.primary.push((GROUP_LETTER, c as u32));
        } else {
            key.primary.push((GROUP_OTHER, c as u32));
        }
    }

    /// Letters sorted after `z` by the tailoring, ranked from 1
    fn extra_letter(&self, c: char) -> Option<u32> {
        match (self.tailoring, c) {
            (Tailoring::Swedish, 'å') => Some(1),
            (Tailoring::Swedish, 'ä' | 'æ') => Some(2),
            (Tailoring::Swedish, 'ö' | 'ø') => Some(3),
            (Tailoring::Danish, 'æ' | 'ä') => Some(1),
            (Tailoring::Danish, 'ø' | 'ö') => Some(2),
            (Tailoring::Danish, 'å') => Some(3),
            _ => None,
        }
    }

    fn expansion(&self, c: char) -> Option<&'static str> {
        if self.tailoring == Tailoring::German {
            match c {
                'ä' => return Some("ae"),
                'ö' => return Some("oe"),
                'ü' => return Some("ue"),
                _ => {}
            }
        }
        fold(c)
    }
}

impl Default for Collation {
    fn default() -> Self {
        Self::for_locale("und")
    }
}

/// Base letters of common Latin letters with diacritics
fn fold(c: char) -> Option<&'static str> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' | 'ľ' | 'ĺ' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' | 'ŕ' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'þ' => "th",
        _ => return None,
    };
    Some(base)
}
