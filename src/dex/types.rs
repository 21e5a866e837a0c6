//! Pokemon types, effectiveness levels and the type chart.
//!
//! The chart is a fixed table of explicit `(attacking, defending)` rules.
//! Anything not listed is `Normal`. Dual-typed defenders combine two
//! pairwise results multiplicatively.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every type known to Pokemon Uranium, in dex order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PokemonType {
    Bug,
    Dark,
    Dragon,
    Electric,
    Fairy,
    Fighting,
    Fire,
    Flying,
    Ghost,
    Grass,
    Ground,
    Ice,
    Normal,
    Nuclear,
    Poison,
    Psychic,
    Rock,
    Steel,
    Water,
}

impl PokemonType {
    pub const ALL: [PokemonType; 19] = [
        PokemonType::Bug,
        PokemonType::Dark,
        PokemonType::Dragon,
        PokemonType::Electric,
        PokemonType::Fairy,
        PokemonType::Fighting,
        PokemonType::Fire,
        PokemonType::Flying,
        PokemonType::Ghost,
        PokemonType::Grass,
        PokemonType::Ground,
        PokemonType::Ice,
        PokemonType::Normal,
        PokemonType::Nuclear,
        PokemonType::Poison,
        PokemonType::Psychic,
        PokemonType::Rock,
        PokemonType::Steel,
        PokemonType::Water,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PokemonType::Bug => "Bug",
            PokemonType::Dark => "Dark",
            PokemonType::Dragon => "Dragon",
            PokemonType::Electric => "Electric",
            PokemonType::Fairy => "Fairy",
            PokemonType::Fighting => "Fighting",
            PokemonType::Fire => "Fire",
            PokemonType::Flying => "Flying",
            PokemonType::Ghost => "Ghost",
            PokemonType::Grass => "Grass",
            PokemonType::Ground => "Ground",
            PokemonType::Ice => "Ice",
            PokemonType::Normal => "Normal",
            PokemonType::Nuclear => "Nuclear",
            PokemonType::Poison => "Poison",
            PokemonType::Psychic => "Psychic",
            PokemonType::Rock => "Rock",
            PokemonType::Steel => "Steel",
            PokemonType::Water => "Water",
        }
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown type name '{0}'")]
pub struct UnknownTypeName(pub String);

impl FromStr for PokemonType {
    type Err = UnknownTypeName;

    /// Parses a type name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PokemonType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownTypeName(s.to_string()))
    }
}

impl TryFrom<String> for PokemonType {
    type Error = UnknownTypeName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Damage class of an attack against a defender.
///
/// Each level carries a percentage multiplier: dividing by 100 gives the
/// damage factor (DoubleResisted = 25 means the defender takes 25% damage).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effectiveness {
    Immune,
    DoubleResisted,
    Resisted,
    Normal,
    Weak,
    SuperWeak,
}

impl Effectiveness {
    pub const ALL: [Effectiveness; 6] = [
        Effectiveness::Immune,
        Effectiveness::DoubleResisted,
        Effectiveness::Resisted,
        Effectiveness::Normal,
        Effectiveness::Weak,
        Effectiveness::SuperWeak,
    ];

    pub fn multiplier(self) -> u32 {
        match self {
            Effectiveness::Immune => 0,
            Effectiveness::DoubleResisted => 25,
            Effectiveness::Resisted => 50,
            Effectiveness::Normal => 100,
            Effectiveness::Weak => 200,
            Effectiveness::SuperWeak => 400,
        }
    }

    /// Maps a percentage back to its level. Only the six defined values map.
    pub fn from_multiplier(multiplier: u32) -> Option<Self> {
        Effectiveness::ALL
            .into_iter()
            .find(|level| level.multiplier() == multiplier)
    }

    /// Human readable label, e.g. "Double Resisted".
    pub fn label(self) -> &'static str {
        match self {
            Effectiveness::Immune => "Immune",
            Effectiveness::DoubleResisted => "Double Resisted",
            Effectiveness::Resisted => "Resisted",
            Effectiveness::Normal => "Normal",
            Effectiveness::Weak => "Weak",
            Effectiveness::SuperWeak => "Super Weak",
        }
    }
}

impl fmt::Display for Effectiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}%)", self.label(), self.multiplier())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EffectivenessError {
    #[error(
        "{attacking} against {primary}/{secondary} gives {multiplier}%, which is not a defined effectiveness"
    )]
    UndefinedCombination {
        attacking: PokemonType,
        primary: PokemonType,
        secondary: PokemonType,
        multiplier: u32,
    },
}

use Effectiveness::{Immune, Resisted, Weak};
use PokemonType::*;

/// `(attacking, defenders, level)`: the defenders take `level` from `attacking`.
type Rule = (PokemonType, &'static [PokemonType], Effectiveness);

const URANIUM_RULES: &[Rule] = &[
    (Normal, &[Nuclear], Weak),
    (Normal, &[Rock, Steel], Resisted),
    (Normal, &[Ghost], Immune),
    (Fire, &[Bug, Grass, Ice, Steel, Nuclear], Weak),
    (Fire, &[Dragon, Fire, Rock, Water], Resisted),
    (Fighting, &[Dark, Ice, Normal, Rock, Steel, Nuclear], Weak),
    (Fighting, &[Bug, Flying, Poison, Psychic, Fairy], Resisted),
    (Fighting, &[Ghost], Immune),
    (Water, &[Fire, Rock, Nuclear], Weak),
    (Water, &[Dragon, Grass, Water], Resisted),
    (Flying, &[Bug, Fighting, Grass, Nuclear], Weak),
    (Flying, &[Electric, Rock, Steel], Resisted),
    (Grass, &[Ground, Rock, Water, Nuclear], Weak),
    (Grass, &[Bug, Dragon, Fire, Flying, Grass, Poison, Steel], Resisted),
    (Poison, &[Grass, Fairy, Nuclear], Weak),
    (Poison, &[Ghost, Ground, Poison, Rock], Resisted),
    (Poison, &[Steel], Immune),
    (Electric, &[Flying, Water, Nuclear], Weak),
    (Electric, &[Dragon, Electric, Grass], Resisted),
    (Electric, &[Ground], Immune),
    (Ground, &[Electric, Fire, Poison, Rock, Steel, Nuclear], Weak),
    (Ground, &[Bug, Grass], Resisted),
    (Ground, &[Flying], Immune),
    (Psychic, &[Fighting, Poison, Nuclear], Weak),
    (Psychic, &[Psychic, Steel], Resisted),
    (Psychic, &[Dark], Immune),
    (Rock, &[Bug, Fire, Flying, Ice, Nuclear], Weak),
    (Rock, &[Fighting, Ground, Steel], Resisted),
    (Ice, &[Dragon, Flying, Grass, Ground, Nuclear], Weak),
    (Ice, &[Fire, Ice, Steel, Water], Resisted),
    (Bug, &[Dark, Grass, Psychic, Nuclear], Weak),
    (Bug, &[Fighting, Fire, Flying, Ghost, Poison, Steel, Fairy], Resisted),
    (Dragon, &[Dragon, Nuclear], Weak),
    (Dragon, &[Steel], Resisted),
    (Dragon, &[Fairy], Immune),
    (Ghost, &[Ghost, Psychic, Nuclear], Weak),
    (Ghost, &[Dark], Resisted),
    (Ghost, &[Normal], Immune),
    (Dark, &[Ghost, Psychic, Nuclear], Weak),
    (Dark, &[Dark, Fighting, Fairy], Resisted),
    (Steel, &[Ice, Rock, Fairy, Nuclear], Weak),
    (Steel, &[Electric, Fire, Steel, Water], Resisted),
    (Fairy, &[Dark, Dragon, Fighting, Nuclear], Weak),
    (Fairy, &[Fire, Poison, Steel], Resisted),
    (
        Nuclear,
        &[
            Normal, Fire, Fighting, Water, Flying, Grass, Poison, Electric, Ground, Psychic, Rock,
            Ice, Bug, Dragon, Ghost, Dark, Fairy,
        ],
        Weak,
    ),
    (Nuclear, &[Steel, Nuclear], Resisted),
];

/// Asymmetric attacking/defending compatibility table.
#[derive(Clone, Debug, Default)]
pub struct TypeChart {
    rules: HashMap<(PokemonType, PokemonType), Effectiveness>,
}

impl TypeChart {
    /// An empty chart: every matchup is `Normal`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The Pokemon Uranium type chart.
    pub fn uranium() -> Self {
        URANIUM_RULES
            .iter()
            .fold(Self::new(), |chart, (attacking, defenders, level)| {
                chart.with_rule(*attacking, defenders, *level)
            })
    }

    /// Adds (or replaces) the level `attacking` has against each defender.
    pub fn with_rule(
        mut self,
        attacking: PokemonType,
        defenders: &[PokemonType],
        level: Effectiveness,
    ) -> Self {
        for defending in defenders {
            self.rules.insert((attacking, *defending), level);
        }
        self
    }

    /// Effectiveness of `attacking` against a defender whose only type is `defending`.
    pub fn pairwise(&self, attacking: PokemonType, defending: PokemonType) -> Effectiveness {
        self.rules
            .get(&(attacking, defending))
            .copied()
            .unwrap_or(Effectiveness::Normal)
    }

    /// Effectiveness of `attacking` against a dual-typed defender.
    ///
    /// Fails when the product of the two multipliers is not one of the six
    /// defined levels, which only happens for an inconsistent chart.
    pub fn compound(
        &self,
        attacking: PokemonType,
        primary: PokemonType,
        secondary: PokemonType,
    ) -> Result<Effectiveness, EffectivenessError> {
        let p = self.pairwise(attacking, primary).multiplier();
        let s = self.pairwise(attacking, secondary).multiplier();
        let multiplier = p * s / 100;

        Effectiveness::from_multiplier(multiplier).ok_or(EffectivenessError::UndefinedCombination {
            attacking,
            primary,
            secondary,
            multiplier,
        })
    }

    /// Effectiveness against a defender with an optional second type.
    pub fn against(
        &self,
        attacking: PokemonType,
        primary: PokemonType,
        secondary: Option<PokemonType>,
    ) -> Result<Effectiveness, EffectivenessError> {
        match secondary {
            Some(secondary) if secondary != primary => {
                self.compound(attacking, primary, secondary)
            }
            _ => Ok(self.pairwise(attacking, primary)),
        }
    }
}
