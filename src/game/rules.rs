//! Run Rules
//!
//! Balance table for a run: costs, limits, draw weights and unlock gates.
//! Carried inside the run state so every peer reduces with the same numbers.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::item::{ItemType, Rarity};
use crate::game::loadout::Loadout;

/// Largest hand a round can offer.
pub const MAX_HAND_SIZE: usize = 4;

/// Rules loading errors.
#[derive(Debug, Error)]
pub enum RulesError {
    /// File could not be read.
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for this table.
    #[error("invalid rules file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are inconsistent.
    #[error("invalid rules: {0}")]
    Invalid(String),
}

/// Balance configuration for a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRules {
    /// Requisition at run start
    pub starting_requisition: u32,
    /// Requisition granted per successful mission
    pub mission_reward: u32,
    /// Lives at run start
    pub starting_lives: u32,
    /// Cost of regenerating a round
    pub reroll_cost: u32,
    /// Cost of locking one loadout slot
    pub slot_lock_cost: u32,
    /// Locked slots allowed per player
    pub max_locked_slots: usize,
    /// Cards offered per round
    pub hand_size: usize,
    /// Highest difficulty tier
    pub max_difficulty: u8,
    /// Base draw weight per rarity (common, uncommon, rare, legendary)
    pub rarity_weights: [u32; 4],
    /// Difficulty at which each rarity enters the pool
    pub rarity_unlock: [u8; 4],
    /// Difficulty at which an item type enters the pool (absent = 1)
    pub type_unlock: BTreeMap<ItemType, u8>,
    /// Rare-and-above weight multiplier per subfaction, percent
    pub subfaction_rare_weight: BTreeMap<String, u32>,
    /// Boosters may be drafted again after being drafted once
    pub allow_duplicate_boosters: bool,
    /// Successful missions per operation in endurance mode
    pub endurance_missions_per_operation: u32,
    /// Warbonds enabled for new players
    pub default_warbonds: Vec<String>,
    /// Loadout handed to new players
    pub default_loadout: Loadout,
}

impl Default for RunRules {
    fn default() -> Self {
        let mut subfaction_rare_weight = BTreeMap::new();
        subfaction_rare_weight.insert("predator_strain".to_string(), 150);
        subfaction_rare_weight.insert("jet_brigade".to_string(), 150);
        subfaction_rare_weight.insert("incineration_corps".to_string(), 125);

        Self {
            starting_requisition: 0,
            mission_reward: 2,
            starting_lives: 3,
            reroll_cost: 1,
            slot_lock_cost: 2,
            max_locked_slots: 2,
            hand_size: 3,
            max_difficulty: 10,
            rarity_weights: [100, 50, 20, 8],
            rarity_unlock: [1, 1, 3, 5],
            type_unlock: BTreeMap::new(),
            subfaction_rare_weight,
            allow_duplicate_boosters: false,
            endurance_missions_per_operation: 3,
            default_warbonds: vec!["helldivers_mobilize".to_string()],
            default_loadout: Loadout::starter(),
        }
    }
}

impl RunRules {
    /// Parse rules from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, RulesError> {
        let rules: RunRules = toml::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load rules from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.max_difficulty == 0 {
            return Err(RulesError::Invalid("max_difficulty must be at least 1".into()));
        }
        if self.hand_size == 0 || self.hand_size > MAX_HAND_SIZE {
            return Err(RulesError::Invalid(format!(
                "hand_size must be within 1..={}",
                MAX_HAND_SIZE
            )));
        }
        if self.rarity_weights.windows(2).any(|w| w[0] <= w[1]) || self.rarity_weights[3] == 0 {
            return Err(RulesError::Invalid(
                "rarity_weights must be positive and strictly decreasing".into(),
            ));
        }
        if self.endurance_missions_per_operation == 0 {
            return Err(RulesError::Invalid(
                "endurance_missions_per_operation must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Hand size clamped to what a round can show.
    pub fn effective_hand_size(&self) -> usize {
        self.hand_size.clamp(1, MAX_HAND_SIZE)
    }

    /// Rare weight multiplier for a subfaction, percent.
    pub fn rare_multiplier(&self, subfaction: Option<&str>) -> u32 {
        subfaction
            .and_then(|s| self.subfaction_rare_weight.get(s))
            .copied()
            .unwrap_or(100)
    }

    /// Whether items of this type and rarity can be drawn at `difficulty`.
    pub fn is_unlocked(&self, item_type: ItemType, rarity: Rarity, difficulty: u8) -> bool {
        let type_gate = self.type_unlock.get(&item_type).copied().unwrap_or(1);
        difficulty >= type_gate && difficulty >= self.rarity_unlock[rarity.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let rules = RunRules::default();
        rules.validate().unwrap();
        assert_eq!(rules.effective_hand_size(), 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let rules = RunRules::from_toml_str("reroll_cost = 3\nmax_locked_slots = 4\n").unwrap();
        assert_eq!(rules.reroll_cost, 3);
        assert_eq!(rules.max_locked_slots, 4);
        assert_eq!(rules.slot_lock_cost, RunRules::default().slot_lock_cost);
    }

    #[test]
    fn test_rejects_non_decreasing_weights() {
        let err = RunRules::from_toml_str("rarity_weights = [10, 10, 5, 1]\n");
        assert!(matches!(err, Err(RulesError::Invalid(_))));
    }

    #[test]
    fn test_rejects_oversized_hand() {
        let err = RunRules::from_toml_str("hand_size = 6\n");
        assert!(matches!(err, Err(RulesError::Invalid(_))));
    }

    #[test]
    fn test_unlock_gates() {
        let mut rules = RunRules::default();
        assert!(rules.is_unlocked(ItemType::Primary, Rarity::Common, 1));
        assert!(!rules.is_unlocked(ItemType::Primary, Rarity::Rare, 2));
        assert!(rules.is_unlocked(ItemType::Primary, Rarity::Rare, 3));

        rules.type_unlock.insert(ItemType::Booster, 4);
        assert!(!rules.is_unlocked(ItemType::Booster, Rarity::Common, 3));
        assert!(rules.is_unlocked(ItemType::Booster, Rarity::Common, 4));
    }

    #[test]
    fn test_rare_multiplier_lookup() {
        let rules = RunRules::default();
        assert_eq!(rules.rare_multiplier(Some("jet_brigade")), 150);
        assert_eq!(rules.rare_multiplier(Some("unknown")), 100);
        assert_eq!(rules.rare_multiplier(None), 100);
    }
}
