//! The built-in letter-fill puzzle catalog.
//!
//! Each clue reveals part of the answer with `_` placeholders for the hidden
//! letters; overlaying all clues of a puzzle spells the answer.

/// Prefix every clue text starts with.
pub const CLUE_PREFIX: &str = "The answer is ";

/// Placeholder character for an unrevealed letter.
pub const PLACEHOLDER: char = '_';

/// One catalog entry: a category, its clue texts and the canonical answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Category shown in the puzzle description.
    pub category: &'static str,
    /// Clue texts in assignment order.
    pub clues: &'static [&'static str],
    /// Canonical uppercase answer.
    pub answer: &'static str,
}

const fn entry(
    category: &'static str,
    clues: &'static [&'static str],
    answer: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        category,
        clues,
        answer,
    }
}

/// Every puzzle the engine can mint.
pub static CATALOG: &[CatalogEntry] = &[
    // Colors
    entry("color", &["The answer is BL__", "The answer is __UE"], "BLUE"),
    entry("color", &["The answer is R__", "The answer is _ED"], "RED"),
    entry("color", &["The answer is GR___", "The answer is __EEN"], "GREEN"),
    entry("color", &["The answer is YEL___", "The answer is ___LOW"], "YELLOW"),
    entry("color", &["The answer is PUR___", "The answer is ___PLE"], "PURPLE"),
    entry("color", &["The answer is OR____", "The answer is __ANGE"], "ORANGE"),
    entry("color", &["The answer is WH___", "The answer is __ITE"], "WHITE"),
    entry("color", &["The answer is BL___", "The answer is __ACK"], "BLACK"),
    entry("color", &["The answer is PI__", "The answer is __NK"], "PINK"),
    entry("color", &["The answer is GO__", "The answer is __LD"], "GOLD"),
    // Animals
    entry("animal", &["The answer is D__", "The answer is _OG"], "DOG"),
    entry("animal", &["The answer is C__", "The answer is _AT"], "CAT"),
    entry("animal", &["The answer is BI__", "The answer is __RD"], "BIRD"),
    entry("animal", &["The answer is FI__", "The answer is __SH"], "FISH"),
    entry("animal", &["The answer is SP____", "The answer is __IDER"], "SPIDER"),
    entry("animal", &["The answer is TUR___", "The answer is ___TLE"], "TURTLE"),
    entry("animal", &["The answer is ZE___", "The answer is __BRA"], "ZEBRA"),
    entry("animal", &["The answer is ELE_____", "The answer is ___PHANT"], "ELEPHANT"),
    entry("animal", &["The answer is KAN_____", "The answer is ___GAROO"], "KANGAROO"),
    entry("animal", &["The answer is LI__", "The answer is __ON"], "LION"),
    // Numbers
    entry("number", &["The answer is SE___", "The answer is __VEN"], "SEVEN"),
    entry("number", &["The answer is DO___", "The answer is __ZEN"], "DOZEN"),
    entry("number", &["The answer is TH___", "The answer is __REE"], "THREE"),
    entry("number", &["The answer is HUN____", "The answer is ___DRED"], "HUNDRED"),
    entry("number", &["The answer is THIR____", "The answer is ____TEEN"], "THIRTEEN"),
    entry("number", &["The answer is S__", "The answer is _IX"], "SIX"),
    entry("number", &["The answer is EI___", "The answer is __GHT"], "EIGHT"),
    entry("number", &["The answer is TWE___", "The answer is ___NTY"], "TWENTY"),
    entry("number", &["The answer is FI__", "The answer is __VE"], "FIVE"),
    entry("number", &["The answer is O__", "The answer is _NE"], "ONE"),
    // Objects
    entry("object", &["The answer is KET___", "The answer is ___TLE"], "KETTLE"),
    entry("object", &["The answer is BO__", "The answer is __OK"], "BOOK"),
    entry("object", &["The answer is CL___", "The answer is __OCK"], "CLOCK"),
    entry("object", &["The answer is PI___", "The answer is __ANO"], "PIANO"),
    entry("object", &["The answer is C__", "The answer is _UP"], "CUP"),
    entry("object", &["The answer is KN___", "The answer is __IFE"], "KNIFE"),
    entry("object", &["The answer is CH___", "The answer is __AIR"], "CHAIR"),
    entry("object", &["The answer is COM_____", "The answer is ___PUTER"], "COMPUTER"),
    entry("object", &["The answer is GUI___", "The answer is ___TAR"], "GUITAR"),
    entry("object", &["The answer is SI__", "The answer is __NK"], "SINK"),
    // Places (three clues)
    entry(
        "place",
        &["The answer is PA___", "The answer is __R_S", "The answer is ___IS"],
        "PARIS",
    ),
    entry(
        "place",
        &["The answer is JA___", "The answer is __P_N", "The answer is ___AN"],
        "JAPAN",
    ),
    entry(
        "place",
        &["The answer is EG___", "The answer is __Y_T", "The answer is ___PT"],
        "EGYPT",
    ),
    entry(
        "place",
        &["The answer is BR____", "The answer is __AZ__", "The answer is ____IL"],
        "BRAZIL",
    ),
    entry(
        "place",
        &["The answer is U__", "The answer is _S_", "The answer is __A"],
        "USA",
    ),
];

/// Catalog entries with exactly `clue_count` clues.
pub fn entries_with_clue_count(clue_count: u32) -> Vec<&'static CatalogEntry> {
    CATALOG
        .iter()
        .filter(|e| u32::try_from(e.clues.len()).is_ok_and(|n| n == clue_count))
        .collect()
}

/// The revealed letters of a clue: the text without its prefix and without
/// leading or trailing placeholders (`The answer is __UE` gives `UE`).
pub fn revealed_fragment(clue_text: &str) -> &str {
    clue_text
        .strip_prefix(CLUE_PREFIX)
        .unwrap_or(clue_text)
        .trim()
        .trim_matches(PLACEHOLDER)
}
