//! Item Catalog
//!
//! Static lookup from item identifier to item metadata. Loaded once at
//! startup from a pre-validated table and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Catalog item identifier.
pub type ItemId = String;

/// Bundled catalog table.
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

// =============================================================================
// ITEM METADATA
// =============================================================================

/// Equipment category. Decides which loadout slot an item lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Primary weapon
    Primary,
    /// Sidearm
    Secondary,
    /// Throwable
    Grenade,
    /// Body armor
    Armor,
    /// Squad-wide booster
    Booster,
    /// Called-in stratagem
    Stratagem,
}

impl ItemType {
    /// All item types in slot order.
    pub const ALL: [ItemType; 6] = [
        ItemType::Primary,
        ItemType::Secondary,
        ItemType::Grenade,
        ItemType::Armor,
        ItemType::Booster,
        ItemType::Stratagem,
    ];
}

/// Item rarity tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rarity {
    /// Most frequent
    Common = 0,
    /// Second tier
    Uncommon = 1,
    /// Third tier
    Rare = 2,
    /// Rarest
    Legendary = 3,
}

impl Rarity {
    /// Table index for per-rarity rule arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Rare and above get the subfaction multiplier.
    #[inline]
    pub fn is_rare_or_better(self) -> bool {
        self >= Rarity::Rare
    }
}

/// Armor weight class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorClass {
    /// Fast, fragile
    Light,
    /// Balanced
    Medium,
    /// Slow, tough
    Heavy,
}

/// Immutable catalog record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Equipment category
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Rarity tier
    pub rarity: Rarity,
    /// Warbond this item ships in
    pub warbond: String,
    /// Sold in the superstore rather than a warbond
    #[serde(default)]
    pub superstore: bool,
    /// Armor passive (armor only)
    #[serde(default)]
    pub passive: Option<String>,
    /// Armor class (armor only)
    #[serde(default)]
    pub armor_class: Option<ArmorClass>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Item {
    /// Whether the item can be drawn by a player with these sources enabled.
    pub fn available_to(&self, warbonds: &BTreeSet<String>, superstore: bool) -> bool {
        if self.superstore {
            superstore
        } else {
            warbonds.contains(&self.warbond)
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Catalog ingestion errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Table could not be parsed.
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two records share an id.
    #[error("duplicate item id: {0}")]
    DuplicateId(ItemId),

    /// Armor record without passive or class.
    #[error("armor item {0} is missing passive or armor class")]
    IncompleteArmor(ItemId),
}

/// Read-only item table.
///
/// Keeps the ingestion order: that order is the stable tie-break for
/// draws, so two catalogs built from the same table draw identically.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    items: Vec<Item>,
    index: BTreeMap<ItemId, usize>,
}

impl Catalog {
    /// Build from records, validating ids and armor metadata.
    pub fn from_items(items: Vec<Item>) -> Result<Self, CatalogError> {
        let mut index = BTreeMap::new();
        for (pos, item) in items.iter().enumerate() {
            if item.item_type == ItemType::Armor
                && (item.passive.is_none() || item.armor_class.is_none())
            {
                return Err(CatalogError::IncompleteArmor(item.id.clone()));
            }
            if index.insert(item.id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self { items, index })
    }

    /// Parse a JSON array of item records.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let items: Vec<Item> = serde_json::from_str(json)?;
        Self::from_items(items)
    }

    /// The bundled catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Look up an item.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|pos| &self.items[*pos])
    }

    /// Position of an item in catalog order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Whether `id` exists and has the given type.
    pub fn is_type(&self, id: &str, item_type: ItemType) -> bool {
        self.get(id).is_some_and(|item| item.item_type == item_type)
    }

    /// All items in catalog order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.len() > 20);

        for item_type in ItemType::ALL {
            assert!(
                catalog.items().iter().any(|i| i.item_type == item_type),
                "no {:?} in builtin catalog",
                item_type
            );
        }
    }

    #[test]
    fn test_lookup_and_order() {
        let catalog = Catalog::builtin().unwrap();
        let first = &catalog.items()[0];
        assert_eq!(catalog.position(&first.id), Some(0));
        assert_eq!(catalog.get(&first.id), Some(first));
        assert!(catalog.get("no_such_item").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = r#"[
            {"id": "a", "name": "A", "type": "primary", "rarity": "common", "warbond": "w"},
            {"id": "a", "name": "A2", "type": "primary", "rarity": "rare", "warbond": "w"}
        ]"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_armor_requires_passive_and_class() {
        let json = r#"[
            {"id": "arm", "name": "Arm", "type": "armor", "rarity": "common", "warbond": "w"}
        ]"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::IncompleteArmor(_))));
    }

    #[test]
    fn test_available_to() {
        let catalog = Catalog::builtin().unwrap();
        let superstore_item = catalog.items().iter().find(|i| i.superstore).unwrap();
        let warbond_item = catalog.items().iter().find(|i| !i.superstore).unwrap();

        let mut warbonds = BTreeSet::new();
        assert!(!superstore_item.available_to(&warbonds, false));
        assert!(superstore_item.available_to(&warbonds, true));

        assert!(!warbond_item.available_to(&warbonds, true));
        warbonds.insert(warbond_item.warbond.clone());
        assert!(warbond_item.available_to(&warbonds, false));
    }
}
