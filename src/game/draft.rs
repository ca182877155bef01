//! Draft Engine
//!
//! Builds the eligible pool for a player, applies exclusions and draws a
//! hand by weighted sampling without replacement. Stateless: the only state
//! it touches is the RNG handed in by the caller.
//!
//! ## Draw order
//!
//! Candidates are kept in catalog order (an armor combo sits at the
//! position of its first variant). Each draw walks the cumulative weights in
//! that order, so equal weights resolve by catalog position and a fixed seed
//! always yields the same hand.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::armor::{ArmorCombo, ArmorComboKey, ArmorIndex};
use crate::game::item::{Catalog, ItemId, ItemType, Rarity};
use crate::game::rules::RunRules;
use crate::game::state::{Player, RunState};

// =============================================================================
// CARDS
// =============================================================================

/// One offered card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftCard {
    /// A single catalog item
    Item(ItemId),
    /// A group of equivalent armor variants
    Armor(ArmorCombo),
}

impl DraftCard {
    /// Every item id the card stands for.
    pub fn ids(&self) -> Vec<&ItemId> {
        match self {
            DraftCard::Item(id) => vec![id],
            DraftCard::Armor(combo) => combo.item_ids.iter().collect(),
        }
    }

    /// The id equipped when the card is picked.
    pub fn primary_id(&self) -> Option<&ItemId> {
        match self {
            DraftCard::Item(id) => Some(id),
            DraftCard::Armor(combo) => combo.primary_item(),
        }
    }
}

/// A drawable candidate with its weighting rarity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolCard {
    /// The card offered if drawn
    pub card: DraftCard,
    /// Rarity used for weighting
    pub rarity: Rarity,
    /// Item type of the card
    pub item_type: ItemType,
}

impl PoolCard {
    /// Drop excluded ids. `None` when nothing is left to offer.
    fn without(&self, excluded: &BTreeSet<ItemId>) -> Option<PoolCard> {
        match &self.card {
            DraftCard::Item(id) => (!excluded.contains(id)).then(|| self.clone()),
            DraftCard::Armor(combo) => {
                let item_ids: Vec<ItemId> = combo
                    .item_ids
                    .iter()
                    .filter(|id| !excluded.contains(*id))
                    .cloned()
                    .collect();
                if item_ids.is_empty() {
                    return None;
                }
                Some(PoolCard {
                    card: DraftCard::Armor(ArmorCombo {
                        key: combo.key.clone(),
                        item_ids,
                        rarity: combo.rarity,
                    }),
                    rarity: self.rarity,
                    item_type: self.item_type,
                })
            }
        }
    }
}

// =============================================================================
// WEIGHTS
// =============================================================================

/// Per-card draw weights for one run configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawWeights {
    base: [u32; 4],
    rare_multiplier: u32,
}

impl DrawWeights {
    /// Weights from the rules table and the run's subfaction.
    pub fn new(rules: &RunRules, subfaction: Option<&str>) -> Self {
        Self {
            base: rules.rarity_weights,
            rare_multiplier: rules.rare_multiplier(subfaction),
        }
    }

    /// Weights for the current run.
    pub fn for_state(state: &RunState) -> Self {
        Self::new(&state.rules, state.config.subfaction.as_deref())
    }

    /// Weight of a card of this rarity. Never zero.
    pub fn weight(&self, rarity: Rarity) -> u64 {
        let base = self.base[rarity.index()] as u64;
        let weight = if rarity.is_rare_or_better() {
            base * self.rare_multiplier as u64 / 100
        } else {
            base
        };
        weight.max(1)
    }
}

// =============================================================================
// POOL
// =============================================================================

/// Catalog filtered to what `player` may draw at the current difficulty.
///
/// Armor is grouped into combos holding only the eligible variants.
pub fn eligible_pool(
    catalog: &Catalog,
    armor: &ArmorIndex,
    state: &RunState,
    player: &Player,
) -> Vec<PoolCard> {
    let eligible = |id: &str| {
        catalog.get(id).is_some_and(|item| {
            item.available_to(&player.warbonds, player.superstore)
                && state.rules.is_unlocked(item.item_type, item.rarity, state.difficulty)
        })
    };

    let mut pool = Vec::new();
    let mut seen_combos: BTreeSet<ArmorComboKey> = BTreeSet::new();

    for item in catalog.items() {
        if !eligible(&item.id) {
            continue;
        }

        if item.item_type != ItemType::Armor {
            pool.push(PoolCard {
                card: DraftCard::Item(item.id.clone()),
                rarity: item.rarity,
                item_type: item.item_type,
            });
            continue;
        }

        let Some(combo) = armor.combo_for(&item.id) else {
            continue;
        };
        if !seen_combos.insert(combo.key.clone()) {
            continue;
        }

        let item_ids: Vec<ItemId> = combo
            .item_ids
            .iter()
            .filter(|id| eligible(id))
            .cloned()
            .collect();
        let rarity = item_ids
            .iter()
            .filter_map(|id| catalog.get(id))
            .map(|i| i.rarity)
            .min()
            .unwrap_or(combo.rarity);

        pool.push(PoolCard {
            card: DraftCard::Armor(ArmorCombo {
                key: combo.key.clone(),
                item_ids,
                rarity,
            }),
            rarity,
            item_type: ItemType::Armor,
        });
    }

    pool
}

/// Ids `player` must not be offered.
pub fn excluded_ids(catalog: &Catalog, state: &RunState, player: &Player) -> BTreeSet<ItemId> {
    let repeatable = |id: &ItemId| {
        state.rules.allow_duplicate_boosters && catalog.is_type(id, ItemType::Booster)
    };

    let mut excluded: BTreeSet<ItemId> = player
        .inventory
        .iter()
        .filter(|id| !repeatable(id))
        .cloned()
        .collect();

    if state.config.global_uniqueness {
        excluded.extend(
            state
                .all_inventories()
                .into_iter()
                .filter(|id| !repeatable(id))
                .cloned(),
        );
    }

    if state.config.burn_cards {
        excluded.extend(state.burned_cards.iter().cloned());
    }

    excluded
}

// =============================================================================
// ROUND GENERATION
// =============================================================================

/// Draw up to `hand_size` distinct cards.
///
/// Returns fewer cards when the filtered pool is smaller, and an empty hand
/// when nothing is eligible.
pub fn generate_round(
    pool: &[PoolCard],
    weights: &DrawWeights,
    excluded: &BTreeSet<ItemId>,
    hand_size: usize,
    rng: &mut DeterministicRng,
) -> Vec<DraftCard> {
    let mut candidates: Vec<PoolCard> = pool.iter().filter_map(|c| c.without(excluded)).collect();
    let draws = hand_size.min(candidates.len());
    let mut hand = Vec::with_capacity(draws);

    for _ in 0..draws {
        let card_weights: Vec<u64> = candidates.iter().map(|c| weights.weight(c.rarity)).collect();
        let Some(index) = rng.weighted_index(&card_weights) else {
            break;
        };
        hand.push(candidates.remove(index).card);
    }

    hand
}

/// Draw a fresh round for the player at `player_index`, advancing the run RNG.
pub fn draw_for_player(
    catalog: &Catalog,
    armor: &ArmorIndex,
    state: &mut RunState,
    player_index: usize,
) -> Vec<DraftCard> {
    let Some(player) = state.players.get(player_index) else {
        return Vec::new();
    };

    let pool = eligible_pool(catalog, armor, state, player);
    let excluded = excluded_ids(catalog, state, player);
    let weights = DrawWeights::for_state(state);
    let hand_size = state.rules.effective_hand_size();

    generate_round(&pool, &weights, &excluded, hand_size, &mut state.rng)
}

/// What `player` could currently be offered, when the run exposes it.
pub fn card_pool_preview(
    catalog: &Catalog,
    armor: &ArmorIndex,
    state: &RunState,
    player: &Player,
) -> Option<Vec<DraftCard>> {
    if !state.config.show_card_pool {
        return None;
    }
    let excluded = excluded_ids(catalog, state, player);
    Some(
        eligible_pool(catalog, armor, state, player)
            .iter()
            .filter_map(|c| c.without(&excluded))
            .map(|c| c.card)
            .collect(),
    )
}
