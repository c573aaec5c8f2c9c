//! Language roots.

use mesh_path::Path;

use crate::record::PageRecord;

/// ISO 639-1 language codes.
const LANGUAGE_CODES: &[&str] = &[
    "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg", "bh",
    "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy", "da",
    "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi", "fj", "fo", "fr",
    "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr", "ht", "hu", "hy", "hz",
    "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja", "jv", "ka", "kg", "ki", "kj",
    "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw", "ky", "la", "lb", "lg", "li", "ln",
    "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "na", "nb",
    "nd", "ne", "ng", "nl", "nn", "no", "nr", "nv", "ny", "oc", "oj", "om", "or", "os", "pa", "pi",
    "pl", "ps", "pt", "qu", "rm", "rn", "ro", "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk",
    "sl", "sm", "sn", "so", "sq", "sr", "ss", "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti",
    "tk", "tl", "tn", "to", "tr", "ts", "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo",
    "wa", "wo", "xh", "yi", "yo", "za", "zh", "zu",
];

/// A first-level site directory named after a locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// Directory name, e.g. `en` or `pt_BR`.
    pub code: String,
    /// Language part of the code.
    pub language: String,
    /// Region part of the code, if any.
    pub region: Option<String>,
    /// Root path of the language tree.
    pub path: Path,
    /// Title of the language root page.
    pub title: String,
}

impl Language {
    /// Language for a first-level record whose name is a locale code.
    pub(crate) fn from_record(record: &PageRecord) -> Option<Self> {
        if record.path.element_count() != 1 {
            return None;
        }
        let code = record.path.last();
        let (language, region) = parse_locale(code)?;
        Some(Self {
            code: code.to_owned(),
            language,
            region,
            path: record.path.clone(),
            title: record.title.clone(),
        })
    }
}

/// Split a locale code of the form `ll` or `ll_RR`.
///
/// The language part must be a lowercase ISO 639-1 code and the region two
/// uppercase ASCII letters.
#[must_use]
pub fn parse_locale(code: &str) -> Option<(String, Option<String>)> {
    let (language, region) = match code.split_once('_') {
        Some((language, region)) => (language, Some(region)),
        None => (code, None),
    };
    if !LANGUAGE_CODES.contains(&language) {
        return None;
    }
    if let Some(region) = region
        && (region.len() != 2 || !region.bytes().all(|b| b.is_ascii_uppercase()))
    {
        return None;
    }
    Some((language.to_owned(), region.map(str::to_owned)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_locale() {
        assert_eq!(parse_locale("en"), Some(("en".to_owned(), None)));
        assert_eq!(
            parse_locale("pt_BR"),
            Some(("pt".to_owned(), Some("BR".to_owned())))
        );
        assert_eq!(parse_locale("EN"), None);
        assert_eq!(parse_locale("xx"), None);
        assert_eq!(parse_locale("en_us"), None);
        assert_eq!(parse_locale("en_USA"), None);
        assert_eq!(parse_locale("news"), None);
        assert_eq!(parse_locale(""), None);
    }

    #[test]
    fn test_language_codes_sorted() {
        assert!(LANGUAGE_CODES.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
