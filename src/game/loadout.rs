//! Loadout Manager
//!
//! Owns the mutation rules for a single player's equipped slots and slot
//! locks. Operates on a borrowed [`Player`] handed in by the reducer; it
//! never keeps a copy of its own.

use serde::{Serialize, Deserialize};

use crate::game::error::RunError;
use crate::game::item::{Catalog, ItemId, ItemType};
use crate::game::rules::RunRules;
use crate::game::state::Player;

/// Number of stratagem slots per loadout.
pub const STRATAGEM_SLOTS: usize = 4;

// =============================================================================
// SLOTS
// =============================================================================

/// A single loadout slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Primary weapon slot
    Primary,
    /// Secondary weapon slot
    Secondary,
    /// Grenade slot
    Grenade,
    /// Armor slot
    Armor,
    /// Booster slot
    Booster,
    /// Stratagem slot (0..4)
    Stratagem(u8),
}

impl SlotKind {
    /// Every slot in display order.
    pub fn all() -> impl Iterator<Item = SlotKind> {
        [
            SlotKind::Primary,
            SlotKind::Secondary,
            SlotKind::Grenade,
            SlotKind::Armor,
            SlotKind::Booster,
        ]
        .into_iter()
        .chain((0..STRATAGEM_SLOTS as u8).map(SlotKind::Stratagem))
    }

    /// Slot for a non-stratagem item type.
    pub fn for_item_type(item_type: ItemType) -> Option<SlotKind> {
        match item_type {
            ItemType::Primary => Some(SlotKind::Primary),
            ItemType::Secondary => Some(SlotKind::Secondary),
            ItemType::Grenade => Some(SlotKind::Grenade),
            ItemType::Armor => Some(SlotKind::Armor),
            ItemType::Booster => Some(SlotKind::Booster),
            ItemType::Stratagem => None,
        }
    }

    /// Item type this slot accepts.
    pub fn item_type(self) -> ItemType {
        match self {
            SlotKind::Primary => ItemType::Primary,
            SlotKind::Secondary => ItemType::Secondary,
            SlotKind::Grenade => ItemType::Grenade,
            SlotKind::Armor => ItemType::Armor,
            SlotKind::Booster => ItemType::Booster,
            SlotKind::Stratagem(_) => ItemType::Stratagem,
        }
    }

    /// Whether the slot exists.
    pub fn is_valid(self) -> bool {
        match self {
            SlotKind::Stratagem(i) => (i as usize) < STRATAGEM_SLOTS,
            _ => true,
        }
    }
}

// =============================================================================
// LOADOUT
// =============================================================================

/// A player's equipped set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    /// Primary weapon
    pub primary: Option<ItemId>,
    /// Secondary weapon
    pub secondary: Option<ItemId>,
    /// Grenade
    pub grenade: Option<ItemId>,
    /// Armor
    pub armor: Option<ItemId>,
    /// Booster
    pub booster: Option<ItemId>,
    /// Stratagems, fixed length
    pub stratagems: [Option<ItemId>; STRATAGEM_SLOTS],
}

impl Loadout {
    /// Standard-issue kit for a fresh run.
    pub fn starter() -> Self {
        Self {
            primary: Some("ar23_liberator".to_string()),
            secondary: Some("p2_peacemaker".to_string()),
            grenade: Some("g12_high_explosive".to_string()),
            armor: Some("b01_tactical".to_string()),
            booster: None,
            stratagems: Default::default(),
        }
    }

    /// Item in a slot.
    pub fn get(&self, slot: SlotKind) -> Option<&ItemId> {
        match slot {
            SlotKind::Primary => self.primary.as_ref(),
            SlotKind::Secondary => self.secondary.as_ref(),
            SlotKind::Grenade => self.grenade.as_ref(),
            SlotKind::Armor => self.armor.as_ref(),
            SlotKind::Booster => self.booster.as_ref(),
            SlotKind::Stratagem(i) => self.stratagems.get(i as usize).and_then(|s| s.as_ref()),
        }
    }

    /// Mutable access to a slot. `None` for an out-of-range stratagem index.
    pub fn slot_mut(&mut self, slot: SlotKind) -> Option<&mut Option<ItemId>> {
        match slot {
            SlotKind::Primary => Some(&mut self.primary),
            SlotKind::Secondary => Some(&mut self.secondary),
            SlotKind::Grenade => Some(&mut self.grenade),
            SlotKind::Armor => Some(&mut self.armor),
            SlotKind::Booster => Some(&mut self.booster),
            SlotKind::Stratagem(i) => self.stratagems.get_mut(i as usize),
        }
    }

    /// First empty stratagem slot.
    pub fn free_stratagem_slot(&self) -> Option<usize> {
        self.stratagems.iter().position(|s| s.is_none())
    }

    /// Slot index holding a stratagem.
    pub fn stratagem_position(&self, item_id: &str) -> Option<usize> {
        self.stratagems
            .iter()
            .position(|s| s.as_deref() == Some(item_id))
    }

    /// Whether two stratagem slots hold the same id.
    pub fn has_duplicate_stratagems(&self) -> bool {
        let equipped: Vec<&ItemId> = self.stratagems.iter().flatten().collect();
        equipped
            .iter()
            .enumerate()
            .any(|(i, a)| equipped[i + 1..].contains(a))
    }

    /// Every equipped item id, slot order.
    pub fn equipped(&self) -> impl Iterator<Item = (SlotKind, &ItemId)> {
        SlotKind::all().filter_map(move |slot| self.get(slot).map(|id| (slot, id)))
    }

    /// Check every filled slot against the catalog.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), RunError> {
        for (slot, id) in self.equipped() {
            if !catalog.is_type(id, slot.item_type()) {
                return Err(RunError::InvalidLoadout(format!(
                    "{} is not a {:?} item",
                    id,
                    slot.item_type()
                )));
            }
        }
        if self.has_duplicate_stratagems() {
            return Err(RunError::InvalidLoadout("duplicate stratagem".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// LOADOUT MANAGER
// =============================================================================

/// Result of offering a stratagem to a loadout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StratagemEquip {
    /// Placed into a free slot.
    Equipped(usize),
    /// Already equipped; nothing changed.
    AlreadyEquipped(usize),
    /// All slots full; the caller must replace or cancel.
    Pending {
        /// The drafted stratagem
        candidate: ItemId,
        /// What is currently equipped
        equipped: [Option<ItemId>; STRATAGEM_SLOTS],
    },
}

/// Mutation rules for one player's loadout and locks.
pub struct LoadoutManager<'a> {
    player: &'a mut Player,
}

impl<'a> LoadoutManager<'a> {
    /// Wrap a player for the duration of one reduction.
    pub fn new(player: &'a mut Player) -> Self {
        Self { player }
    }

    /// Replace a non-stratagem slot. Returns what was there.
    pub fn equip(&mut self, slot: SlotKind, item_id: ItemId) -> Result<Option<ItemId>, RunError> {
        if matches!(slot, SlotKind::Stratagem(_)) || !slot.is_valid() {
            return Err(RunError::InvalidSlot(slot));
        }
        let target = self
            .player
            .loadout
            .slot_mut(slot)
            .ok_or(RunError::InvalidSlot(slot))?;
        Ok(target.replace(item_id))
    }

    /// Fill the first empty stratagem slot, or report that a replacement
    /// decision is needed.
    pub fn equip_stratagem(&mut self, item_id: ItemId) -> StratagemEquip {
        let loadout = &mut self.player.loadout;

        if let Some(existing) = loadout.stratagem_position(&item_id) {
            return StratagemEquip::AlreadyEquipped(existing);
        }

        match loadout.free_stratagem_slot() {
            Some(free) => {
                loadout.stratagems[free] = Some(item_id);
                StratagemEquip::Equipped(free)
            }
            None => StratagemEquip::Pending {
                candidate: item_id,
                equipped: loadout.stratagems.clone(),
            },
        }
    }

    /// Swap a stratagem slot to `item_id`. Returns the displaced id.
    pub fn replace_stratagem(
        &mut self,
        slot_index: usize,
        item_id: ItemId,
    ) -> Result<Option<ItemId>, RunError> {
        let slot = SlotKind::Stratagem(slot_index.min(u8::MAX as usize) as u8);
        if slot_index >= STRATAGEM_SLOTS {
            return Err(RunError::InvalidSlot(slot));
        }

        let loadout = &mut self.player.loadout;
        if let Some(existing) = loadout.stratagem_position(&item_id) {
            if existing != slot_index {
                return Err(RunError::DuplicateStratagem(item_id));
            }
        }

        Ok(loadout.stratagems[slot_index].replace(item_id))
    }

    /// Spend requisition to lock a slot.
    pub fn lock_slot(
        &mut self,
        slot: SlotKind,
        requisition: &mut u32,
        rules: &RunRules,
    ) -> Result<(), RunError> {
        if !slot.is_valid() {
            return Err(RunError::InvalidSlot(slot));
        }
        if *requisition < rules.slot_lock_cost {
            return Err(RunError::InsufficientRequisition {
                required: rules.slot_lock_cost,
                available: *requisition,
            });
        }
        if self.player.locked_slots.len() >= rules.max_locked_slots {
            return Err(RunError::SlotLimitReached { max: rules.max_locked_slots });
        }
        if self.player.locked_slots.contains(&slot) {
            return Err(RunError::AlreadyLocked(slot));
        }

        *requisition -= rules.slot_lock_cost;
        self.player.locked_slots.insert(slot);
        Ok(())
    }

    /// Release a lock. Free of charge.
    pub fn unlock_slot(&mut self, slot: SlotKind) -> Result<(), RunError> {
        if self.player.locked_slots.remove(&slot) {
            Ok(())
        } else {
            Err(RunError::NotLocked(slot))
        }
    }

    /// Filled slots that are not locked, i.e. what a sacrifice may take.
    pub fn sacrificable_slots(&self) -> Vec<SlotKind> {
        self.player
            .loadout
            .equipped()
            .map(|(slot, _)| slot)
            .filter(|slot| !self.player.locked_slots.contains(slot))
            .collect()
    }

    /// Give up the item in an unlocked slot.
    pub fn sacrifice(&mut self, slot: SlotKind) -> Result<ItemId, RunError> {
        if self.player.locked_slots.contains(&slot) {
            return Err(RunError::SlotLocked(slot));
        }
        self.player
            .loadout
            .slot_mut(slot)
            .ok_or(RunError::InvalidSlot(slot))?
            .take()
            .ok_or(RunError::SlotEmpty(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::PlayerId;

    fn player() -> Player {
        Player::new(PlayerId::new([1; 16]), "Alpha", Loadout::starter(), &RunRules::default())
    }

    #[test]
    fn test_equip_replaces_slot() {
        let mut p = player();
        let old = LoadoutManager::new(&mut p)
            .equip(SlotKind::Primary, "sg8_punisher".to_string())
            .unwrap();
        assert_eq!(old.as_deref(), Some("ar23_liberator"));
        assert_eq!(p.loadout.primary.as_deref(), Some("sg8_punisher"));
    }

    #[test]
    fn test_equip_refuses_stratagem_slot() {
        let mut p = player();
        let err = LoadoutManager::new(&mut p).equip(SlotKind::Stratagem(0), "x".to_string());
        assert_eq!(err, Err(RunError::InvalidSlot(SlotKind::Stratagem(0))));
    }

    #[test]
    fn test_equip_stratagem_fills_first_free() {
        let mut p = player();
        p.loadout.stratagems[0] = Some("s0".to_string());

        let mut manager = LoadoutManager::new(&mut p);
        assert_eq!(manager.equip_stratagem("s1".to_string()), StratagemEquip::Equipped(1));
        assert_eq!(manager.equip_stratagem("s1".to_string()), StratagemEquip::AlreadyEquipped(1));
    }

    #[test]
    fn test_full_stratagems_go_pending() {
        let mut p = player();
        p.loadout.stratagems = [
            Some("s0".to_string()),
            Some("s1".to_string()),
            Some("s2".to_string()),
            Some("s3".to_string()),
        ];
        let before = p.loadout.clone();

        let outcome = LoadoutManager::new(&mut p).equip_stratagem("s4".to_string());
        match outcome {
            StratagemEquip::Pending { candidate, equipped } => {
                assert_eq!(candidate, "s4");
                assert_eq!(equipped, before.stratagems);
            }
            other => panic!("expected pending, got {:?}", other),
        }
        assert_eq!(p.loadout, before);
    }

    #[test]
    fn test_replace_stratagem_rejects_duplicates() {
        let mut p = player();
        p.loadout.stratagems = [Some("a".into()), Some("b".into()), None, None];

        let mut manager = LoadoutManager::new(&mut p);
        assert_eq!(
            manager.replace_stratagem(2, "a".to_string()),
            Err(RunError::DuplicateStratagem("a".to_string()))
        );
        assert_eq!(manager.replace_stratagem(1, "c".to_string()), Ok(Some("b".to_string())));
        assert!(matches!(manager.replace_stratagem(4, "d".to_string()), Err(RunError::InvalidSlot(_))));
    }

    #[test]
    fn test_lock_slot_rules() {
        let rules = RunRules::default();
        let mut p = player();
        let mut requisition = 10;

        let mut manager = LoadoutManager::new(&mut p);
        manager.lock_slot(SlotKind::Primary, &mut requisition, &rules).unwrap();
        assert_eq!(requisition, 10 - rules.slot_lock_cost);

        assert_eq!(
            manager.lock_slot(SlotKind::Primary, &mut requisition, &rules),
            Err(RunError::AlreadyLocked(SlotKind::Primary))
        );

        manager.lock_slot(SlotKind::Armor, &mut requisition, &rules).unwrap();
        assert_eq!(
            manager.lock_slot(SlotKind::Grenade, &mut requisition, &rules),
            Err(RunError::SlotLimitReached { max: rules.max_locked_slots })
        );
    }

    #[test]
    fn test_lock_slot_insufficient_requisition() {
        let rules = RunRules::default();
        let mut p = player();
        let mut requisition = rules.slot_lock_cost - 1;

        let err = LoadoutManager::new(&mut p).lock_slot(SlotKind::Primary, &mut requisition, &rules);
        assert!(matches!(err, Err(RunError::InsufficientRequisition { .. })));
        assert_eq!(requisition, rules.slot_lock_cost - 1);
        assert!(p.locked_slots.is_empty());
    }

    #[test]
    fn test_unlock_slot() {
        let mut p = player();
        p.locked_slots.insert(SlotKind::Booster);

        let mut manager = LoadoutManager::new(&mut p);
        manager.unlock_slot(SlotKind::Booster).unwrap();
        assert_eq!(manager.unlock_slot(SlotKind::Booster), Err(RunError::NotLocked(SlotKind::Booster)));
    }

    #[test]
    fn test_sacrifice_respects_locks() {
        let mut p = player();
        p.locked_slots.insert(SlotKind::Primary);

        let mut manager = LoadoutManager::new(&mut p);
        assert!(!manager.sacrificable_slots().contains(&SlotKind::Primary));
        assert_eq!(manager.sacrifice(SlotKind::Primary), Err(RunError::SlotLocked(SlotKind::Primary)));
        assert_eq!(manager.sacrifice(SlotKind::Booster), Err(RunError::SlotEmpty(SlotKind::Booster)));
        assert_eq!(manager.sacrifice(SlotKind::Grenade).unwrap(), "g12_high_explosive");
        assert!(p.loadout.grenade.is_none());
    }

    #[test]
    fn test_starter_loadout_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        Loadout::starter().validate(&catalog).unwrap();
    }

    #[test]
    fn test_validate_rejects_wrong_type() {
        let catalog = Catalog::builtin().unwrap();
        let mut loadout = Loadout::starter();
        loadout.primary = Some("p2_peacemaker".to_string());
        assert!(matches!(loadout.validate(&catalog), Err(RunError::InvalidLoadout(_))));
    }
}
