//! Armor Combos
//!
//! Armor sets that share a passive and a weight class look the same in a
//! draft, whatever warbond they ship in. They are collapsed into one
//! drawable combo so a hand is never flooded with near-duplicates.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::game::item::{ArmorClass, Catalog, ItemId, ItemType, Rarity};

/// Grouping key: passive + class.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArmorComboKey {
    /// Armor passive
    pub passive: String,
    /// Armor class
    pub armor_class: ArmorClass,
}

/// A group of armor variants drawn as one card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorCombo {
    /// Shared passive + class
    pub key: ArmorComboKey,
    /// Variant item ids, catalog order
    pub item_ids: Vec<ItemId>,
    /// Most common rarity among the variants
    pub rarity: Rarity,
}

impl ArmorCombo {
    /// The variant equipped when this combo is picked.
    pub fn primary_item(&self) -> Option<&ItemId> {
        self.item_ids.first()
    }
}

/// Read-only index of armor combos derived from the catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArmorIndex {
    combos: Vec<ArmorCombo>,
    by_item: BTreeMap<ItemId, usize>,
}

impl ArmorIndex {
    /// Group every armor item in the catalog.
    ///
    /// Combos are ordered by the catalog position of their first variant.
    pub fn build(catalog: &Catalog) -> Self {
        let mut combos: Vec<ArmorCombo> = Vec::new();
        let mut by_key: BTreeMap<ArmorComboKey, usize> = BTreeMap::new();
        let mut by_item = BTreeMap::new();

        for item in catalog.items() {
            if item.item_type != ItemType::Armor {
                continue;
            }
            let (Some(passive), Some(armor_class)) = (&item.passive, item.armor_class) else {
                continue;
            };

            let key = ArmorComboKey { passive: passive.clone(), armor_class };
            let slot = *by_key.entry(key.clone()).or_insert_with(|| {
                combos.push(ArmorCombo {
                    key,
                    item_ids: Vec::new(),
                    rarity: item.rarity,
                });
                combos.len() - 1
            });

            let combo = &mut combos[slot];
            combo.item_ids.push(item.id.clone());
            combo.rarity = combo.rarity.min(item.rarity);
            by_item.insert(item.id.clone(), slot);
        }

        Self { combos, by_item }
    }

    /// All combos in catalog order.
    pub fn combos(&self) -> &[ArmorCombo] {
        &self.combos
    }

    /// The combo an armor item belongs to.
    pub fn combo_for(&self, item_id: &str) -> Option<&ArmorCombo> {
        self.by_item.get(item_id).map(|slot| &self.combos[*slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_by_passive_and_class() {
        let catalog = Catalog::builtin().unwrap();
        let index = ArmorIndex::build(&catalog);

        let combo = index.combo_for("ex03_prototype_3").unwrap();
        assert_eq!(combo.key.passive, "electrical_conduit");
        assert!(combo.item_ids.contains(&"ex16_prototype_16".to_string()));

        // Same passive, different class stays separate
        let tactical = index.combo_for("b01_tactical").unwrap();
        let wolf = index.combo_for("cw9_white_wolf").unwrap();
        assert_ne!(tactical.key, wolf.key);
    }

    #[test]
    fn test_every_armor_in_exactly_one_combo() {
        let catalog = Catalog::builtin().unwrap();
        let index = ArmorIndex::build(&catalog);

        let armor_count = catalog.items().iter().filter(|i| i.item_type == ItemType::Armor).count();
        let grouped: usize = index.combos().iter().map(|c| c.item_ids.len()).sum();
        assert_eq!(armor_count, grouped);
    }

    #[test]
    fn test_regrouping_is_idempotent() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(ArmorIndex::build(&catalog), ArmorIndex::build(&catalog));
    }

    #[test]
    fn test_combo_rarity_is_most_common_variant() {
        let catalog = Catalog::builtin().unwrap();
        let index = ArmorIndex::build(&catalog);

        // fs05 (uncommon) and fs37 (rare) share fortified/heavy
        let combo = index.combo_for("fs37_ravager").unwrap();
        assert_eq!(combo.rarity, Rarity::Uncommon);
    }
}
