use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// What a drawing depicts. Decides how it enters the scene (egg or seed) and
/// which spawners may pick it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Animal,
    Plant,
    Tree,
    Bush,
    Grass,
    TinyPatch,
    Bird,
    Flock,
    Building,
}

const KIND_CHARS: [(char, ImageKind); 9] = [
    ('a', ImageKind::Animal),
    ('p', ImageKind::Plant),
    ('t', ImageKind::Tree),
    ('b', ImageKind::Bush),
    ('g', ImageKind::Grass),
    ('z', ImageKind::TinyPatch),
    ('d', ImageKind::Bird),
    ('f', ImageKind::Flock),
    ('h', ImageKind::Building),
];

impl ImageKind {
    pub fn from_char(c: char) -> Result<Self, ParseError> {
        KIND_CHARS
            .iter()
            .find(|(ch, _)| *ch == c)
            .map(|(_, kind)| *kind)
            .ok_or(ParseError::KindChar(c))
    }

    pub fn to_char(self) -> char {
        KIND_CHARS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(ch, _)| *ch)
            .unwrap_or('a')
    }

    /// Animals hatch from eggs; every other kind grows from a seed.
    pub fn is_animal(self) -> bool {
        self == ImageKind::Animal
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageKind::Animal => "animal",
            ImageKind::Plant => "plant",
            ImageKind::Tree => "tree",
            ImageKind::Bush => "bush",
            ImageKind::Grass => "grass",
            ImageKind::TinyPatch => "tiny_patch",
            ImageKind::Bird => "bird",
            ImageKind::Flock => "flock",
            ImageKind::Building => "building",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn from_char(c: char) -> Result<Self, ParseError> {
        match c {
            'l' => Ok(Facing::Left),
            'r' => Ok(Facing::Right),
            other => Err(ParseError::FacingChar(other)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Facing::Left => 'l',
            Facing::Right => 'r',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_chars_map_both_ways() {
        for (ch, kind) in KIND_CHARS {
            assert_eq!(ImageKind::from_char(ch), Ok(kind));
            assert_eq!(kind.to_char(), ch);
        }
        assert_eq!(ImageKind::from_char('x'), Err(ParseError::KindChar('x')));
    }

    #[test]
    fn facing_chars_map_both_ways() {
        assert_eq!(Facing::from_char('l'), Ok(Facing::Left));
        assert_eq!(Facing::Right.to_char(), 'r');
        assert_eq!(Facing::from_char('L'), Err(ParseError::FacingChar('L')));
    }

    #[test]
    fn only_animals_hatch() {
        assert!(ImageKind::Animal.is_animal());
        assert!(!ImageKind::Bird.is_animal());
        assert!(!ImageKind::Plant.is_animal());
    }
}
