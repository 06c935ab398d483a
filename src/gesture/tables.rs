//! Zeichentabellen pro Stick, Slot und Modus
//!
//! Indiziert über [`Sector::index`] (im Uhrzeigersinn ab Norden). `None`
//! markiert einen Sektor ohne Zeichen.

use crate::controller::normalizer::{Sector, Stick};

type SectorTable = [Option<char>; 8];

/// Onsets des linken Sticks
const LEFT_ONSETS: SectorTable = [
    Some('h'),
    Some('k'),
    Some('t'),
    Some('s'),
    Some('n'),
    Some('m'),
    Some('r'),
    Some('l'),
];

/// Onsets des rechten Sticks
const RIGHT_ONSETS: SectorTable = [
    Some('p'),
    Some('b'),
    Some('d'),
    Some('g'),
    Some('f'),
    Some('v'),
    Some('z'),
    Some('w'),
];

const VOWELS: SectorTable = [
    Some('a'),
    Some('e'),
    Some('i'),
    Some('o'),
    Some('u'),
    Some('y'),
    None,
    None,
];

const CODAS: SectorTable = [
    Some('n'),
    Some('m'),
    Some('s'),
    Some('t'),
    Some('k'),
    Some('r'),
    Some('l'),
    Some('x'),
];

const LEFT_PUNCTUATION: SectorTable = [
    Some('.'),
    Some(','),
    Some('?'),
    Some('!'),
    Some(';'),
    Some(':'),
    Some('\''),
    Some('"'),
];

const RIGHT_PUNCTUATION: SectorTable = [
    Some('('),
    Some(')'),
    Some('-'),
    Some('/'),
    Some('&'),
    Some('@'),
    Some('#'),
    Some('*'),
];

/// Silben-Slot, in den ein Stick schreibt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Onset,
    Vowel,
    Coda,
}

/// Alle Tabellen, aus denen die Engine tippt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharTables {
    pub onsets: [SectorTable; 2],
    pub vowels: SectorTable,
    pub codas: SectorTable,
    pub punctuation: [SectorTable; 2],
    /// Vokal, der an einen einzeln committeten Onset angehängt wird
    pub default_vowel: char,
}

impl Default for CharTables {
    fn default() -> Self {
        Self {
            onsets: [LEFT_ONSETS, RIGHT_ONSETS],
            vowels: VOWELS,
            codas: CODAS,
            punctuation: [LEFT_PUNCTUATION, RIGHT_PUNCTUATION],
            default_vowel: 'o',
        }
    }
}

impl CharTables {
    pub fn with_default_vowel(mut self, vowel: char) -> Self {
        self.default_vowel = vowel;
        self
    }

    pub fn onset(&self, stick: Stick, sector: Sector) -> Option<char> {
        self.onsets[stick.index()][sector.index()]
    }

    pub fn punctuation(&self, stick: Stick, sector: Sector) -> Option<char> {
        self.punctuation[stick.index()][sector.index()]
    }

    pub fn vowel(&self, sector: Sector) -> Option<char> {
        self.vowels[sector.index()]
    }

    pub fn coda(&self, sector: Sector) -> Option<char> {
        self.codas[sector.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_north_is_h() {
        let tables = CharTables::default();
        assert_eq!(tables.onset(Stick::Left, Sector::North), Some('h'));
        assert_eq!(tables.onset(Stick::Left, Sector::NorthEast), Some('k'));
        assert_eq!(tables.default_vowel, 'o');
    }

    #[test]
    fn unassigned_vowel_sectors_type_nothing() {
        assert_eq!(CharTables::default().vowel(Sector::West), None);
    }
}
