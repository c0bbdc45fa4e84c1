//! Theme and Collectible Minifigure series classification.
//!
//! BrickLink inventory carries no theme field we can rely on, so every
//! catalog row is classified from its name and item number when it is
//! synced. The stages run in a fixed order and the first hit wins:
//!
//! 1. [`OVERRIDES`] - exact item numbers that the other stages get wrong
//! 2. [`PHRASES`] - substrings of the lower-cased name
//! 3. [`PREFIXES`] - BrickLink item number prefixes
//! 4. [`OTHER`]
//!
//! Within each table, entries are ordered most specific first.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Theme assigned when nothing matches.
pub const OTHER: &str = "Other";

/// Theme assigned to Collectible Minifigures.
pub const COLLECTIBLE_MINIFIGURES: &str = "Collectible Minifigures";

/// Exact item number overrides (lower-case item number, theme).
pub const OVERRIDES: &[(&str, &str)] = &[
    // Promotional figures filed under generic prefixes
    ("comcon001", "Star Wars"),
    ("comcon015", "Super Heroes"),
    ("sdcc2011", "Star Wars"),
    ("tlm157", "The LEGO Movie"),
    ("sh0653", "Super Heroes"),
];

/// Name phrases (lower-case substring, theme).
pub const PHRASES: &[(&str, &str)] = &[
    ("pirates of the caribbean", "Pirates of the Caribbean"),
    ("lord of the rings", "The Lord of the Rings"),
    ("the hobbit", "The Lord of the Rings"),
    ("teenage mutant ninja turtles", "Teenage Mutant Ninja Turtles"),
    ("the lego movie", "The LEGO Movie"),
    ("lego movie", "The LEGO Movie"),
    ("fantastic beasts", "Harry Potter"),
    ("harry potter", "Harry Potter"),
    ("hogwarts", "Harry Potter"),
    ("star wars", "Star Wars"),
    ("clone trooper", "Star Wars"),
    ("stormtrooper", "Star Wars"),
    ("mandalorian", "Star Wars"),
    ("jedi", "Star Wars"),
    ("spider-man", "Super Heroes"),
    ("spiderman", "Super Heroes"),
    ("batman", "Super Heroes"),
    ("avengers", "Super Heroes"),
    ("marvel", "Super Heroes"),
    ("super heroes", "Super Heroes"),
    ("ninjago", "Ninjago"),
    ("jurassic", "Jurassic World"),
    ("minecraft", "Minecraft"),
    ("simpsons", "The Simpsons"),
    ("toy story", "Toy Story"),
    ("disney", "Disney"),
    ("indiana jones", "Indiana Jones"),
    ("monkie kid", "Monkie Kid"),
    ("speed champions", "Speed Champions"),
    ("nexo knights", "Nexo Knights"),
    ("legends of chima", "Legends of Chima"),
    ("hidden side", "Hidden Side"),
    ("overwatch", "Overwatch"),
    ("collectible minifigure", COLLECTIBLE_MINIFIGURES),
    (", series ", COLLECTIBLE_MINIFIGURES),
];

/// BrickLink item number prefixes (regex on the lower-cased item number, theme).
pub const PREFIXES: &[(&str, &str)] = &[
    (r"^col", COLLECTIBLE_MINIFIGURES),
    (r"^sw\d", "Star Wars"),
    (r"^hp\d", "Harry Potter"),
    (r"^sh\d", "Super Heroes"),
    (r"^njo\d", "Ninjago"),
    (r"^lor\d", "The Lord of the Rings"),
    (r"^poc\d", "Pirates of the Caribbean"),
    (r"^tlm\d", "The LEGO Movie"),
    (r"^jw\d", "Jurassic World"),
    (r"^min\d", "Minecraft"),
    (r"^sim\d", "The Simpsons"),
    (r"^dis\d", "Disney"),
    (r"^toy\d", "Toy Story"),
    (r"^iaj\d", "Indiana Jones"),
    (r"^tnt\d", "Teenage Mutant Ninja Turtles"),
    (r"^mk\d", "Monkie Kid"),
    (r"^sc\d", "Speed Champions"),
    (r"^nex\d", "Nexo Knights"),
    (r"^loc\d", "Legends of Chima"),
    (r"^hs\d", "Hidden Side"),
    (r"^ow\d", "Overwatch"),
    (r"^frnd\d", "Friends"),
    (r"^cty\d", "City"),
    (r"^twn\d", "Town"),
    (r"^trn\d", "Train"),
    (r"^cas\d", "Castle"),
    (r"^pi\d", "Pirates"),
    (r"^sp\d", "Space"),
    (r"^adv\d", "Adventurers"),
    (r"^agt\d", "Agents"),
    (r"^idea\d", "Ideas"),
    (r"^dim\d", "Dimensions"),
    (r"^hol\d", "Holiday & Event"),
];

static PREFIX_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    PREFIXES
        .iter()
        .map(|(pattern, theme)| (Regex::new(pattern).expect("Invalid prefix regex"), *theme))
        .collect()
});

static COL_SERIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^col(\d{1,2})-\d+").expect("Invalid regex"));

static NAME_SERIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bseries\s+(\d{1,2})\b").expect("Invalid regex"));

/// Which classifier stage produced a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Override,
    Phrase,
    Prefix,
    Fallback,
}

/// Classifier output for one catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub theme: &'static str,
    pub source: MatchSource,
    /// CMF series number, when the item is a numbered Collectible Minifigure.
    pub series: Option<i32>,
}

/// Classify a catalog item by name and item number.
#[must_use]
pub fn classify(name: &str, item_no: &str) -> Classification {
    let (theme, source) = match_theme(name, item_no);
    Classification {
        theme,
        source,
        series: cmf_series(name, item_no),
    }
}

/// Theme for a catalog item; shorthand for `classify(..).theme`.
#[must_use]
pub fn classify_theme(name: &str, item_no: &str) -> &'static str {
    match_theme(name, item_no).0
}

fn match_theme(name: &str, item_no: &str) -> (&'static str, MatchSource) {
    let item_no = item_no.trim().to_ascii_lowercase();
    let name = name.to_lowercase();

    if let Some((_, theme)) = OVERRIDES.iter().find(|(no, _)| *no == item_no) {
        return (*theme, MatchSource::Override);
    }

    if let Some((_, theme)) = PHRASES.iter().find(|(phrase, _)| name.contains(phrase)) {
        return (*theme, MatchSource::Phrase);
    }

    if !item_no.is_empty()
        && let Some((_, theme)) = PREFIX_RES.iter().find(|(re, _)| re.is_match(&item_no))
    {
        return (*theme, MatchSource::Prefix);
    }

    (OTHER, MatchSource::Fallback)
}

/// Extract the Collectible Minifigure series number.
///
/// `colNN-M` item numbers take precedence; otherwise a `Series N` phrase in
/// the name is used. Three-digit `colNNN` numbers (the original sequential
/// scheme) carry no series on their own.
#[must_use]
pub fn cmf_series(name: &str, item_no: &str) -> Option<i32> {
    let item_no = item_no.trim().to_ascii_lowercase();

    COL_SERIES_RE
        .captures(&item_no)
        .and_then(|caps| caps.get(1))
        .or_else(|| NAME_SERIES_RE.captures(name).and_then(|caps| caps.get(1)))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|series| *series > 0)
}

/// Every theme the classifier can produce, in first-seen table order,
/// followed by [`OTHER`].
#[must_use]
pub fn known_themes() -> Vec<&'static str> {
    let mut themes: Vec<&'static str> = Vec::new();
    for theme in OVERRIDES
        .iter()
        .chain(PHRASES)
        .chain(PREFIXES)
        .map(|(_, theme)| *theme)
    {
        if !themes.contains(&theme) {
            themes.push(theme);
        }
    }
    themes.push(OTHER);
    themes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_table() {
        let cases = [
            ("Luke Skywalker (Tatooine)", "sw0778", "Star Wars"),
            ("Clone Trooper, Phase 2", "xyz1", "Star Wars"),
            ("Hermione Granger", "hp148", "Harry Potter"),
            ("Batman - Black Cowl", "sh0016", "Super Heroes"),
            ("Kai - Legacy", "njo489", "Ninjago"),
            ("Police Officer", "cty1214", "City"),
            ("Clown, Series 1", "col001", COLLECTIBLE_MINIFIGURES),
            ("Emmet", "tlm001", "The LEGO Movie"),
            ("Classic Spaceman Red", "sp001", "Space"),
            ("Plain Torso", "", OTHER),
            ("Unknown Figure", "zz999", OTHER),
        ];

        for (name, item_no, expected) in cases {
            assert_eq!(
                classify_theme(name, item_no),
                expected,
                "name={name:?} item_no={item_no:?}"
            );
        }
    }

    #[test]
    fn test_override_beats_phrase_and_prefix() {
        let result = classify("Batman Comic-Con Exclusive", "COMCON001");
        assert_eq!(result.theme, "Star Wars");
        assert_eq!(result.source, MatchSource::Override);
    }

    #[test]
    fn test_phrase_beats_prefix() {
        // A Harry Potter CMF figure: the licensed theme wins over the col prefix
        let result = classify("Hermione Granger, Harry Potter, Series 1", "colhp-2");
        assert_eq!(result.theme, "Harry Potter");
        assert_eq!(result.source, MatchSource::Phrase);
    }

    #[test]
    fn test_phrase_order_is_most_specific_first() {
        // "pirates of the caribbean" must win over anything matching "pirate"
        assert_eq!(
            classify_theme("Jack Sparrow, Pirates of the Caribbean", "poc001"),
            "Pirates of the Caribbean"
        );
    }

    #[test]
    fn test_prefix_requires_digit() {
        // "spd" is not the Space prefix "sp<digit>"
        assert_eq!(classify_theme("Figure", "spd001"), OTHER);
        assert_eq!(classify("Figure", "spd001").source, MatchSource::Fallback);
    }

    #[test]
    fn test_cmf_series_from_item_number() {
        assert_eq!(cmf_series("Diver", "col13-4"), Some(13));
        assert_eq!(cmf_series("Diver", "COL21-12"), Some(21));
    }

    #[test]
    fn test_cmf_series_from_name() {
        assert_eq!(cmf_series("Clown, Series 1", "col001"), Some(1));
        assert_eq!(cmf_series("Space Police Alien, series 26", ""), Some(26));
        assert_eq!(cmf_series("Luke Skywalker", "sw0778"), None);
    }

    #[test]
    fn test_cmf_series_item_number_wins_over_name() {
        assert_eq!(cmf_series("Series 3 lookalike", "col07-1"), Some(7));
    }

    #[test]
    fn test_known_themes_unique_and_ends_with_other() {
        let themes = known_themes();
        assert_eq!(themes.last(), Some(&OTHER));
        let mut deduped = themes.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), themes.len());
    }
}
