//! Incremental card grid reconciliation.
//!
//! [`GridReconciler`] remembers which card handle belongs to which student
//! and diffs each new card list against the previous one, so a card that
//! stays on screen is updated in place instead of being recreated.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::card::CardModel;
use super::DashboardView;

/// What one reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Cards created.
    pub created: usize,
    /// Cards updated in place.
    pub updated: usize,
    /// Cards removed.
    pub removed: usize,
}

impl RenderStats {
    /// Returns true if nothing changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0
    }
}

#[derive(Debug)]
struct Slot<C> {
    model: CardModel,
    card: C,
}

/// Card handles in display order.
#[derive(Debug)]
pub struct GridReconciler<C> {
    slots: Vec<Slot<C>>,
}

impl<C> Default for GridReconciler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> GridReconciler<C> {
    /// Creates an empty grid.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Returns the number of cards on screen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no card is on screen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the displayed client IDs in order.
    pub fn displayed_ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.model.client_id.as_str())
    }

    /// Returns the displayed cards and their models in order.
    pub fn cards(&self) -> impl Iterator<Item = (&CardModel, &C)> {
        self.slots.iter().map(|slot| (&slot.model, &slot.card))
    }

    /// Brings the grid in line with `models`.
    ///
    /// Cards no longer listed are removed, listed cards whose content changed
    /// are updated in place, and new cards are created. The resulting order
    /// follows `models`.
    pub fn reconcile<V>(&mut self, view: &mut V, models: Vec<CardModel>) -> RenderStats
    where
        V: DashboardView<Card = C>,
    {
        let mut stats = RenderStats::default();
        let wanted: HashSet<&str> = models.iter().map(|m| m.client_id.as_str()).collect();

        let mut kept: HashMap<String, Slot<C>> = HashMap::with_capacity(self.slots.len());
        for slot in self.slots.drain(..) {
            if wanted.contains(slot.model.client_id.as_str()) {
                kept.insert(slot.model.client_id.clone(), slot);
            } else {
                view.remove_card(slot.card);
                stats.removed += 1;
            }
        }

        let mut slots = Vec::with_capacity(models.len());
        for model in models {
            match kept.remove(&model.client_id) {
                Some(mut slot) => {
                    if slot.model != model {
                        view.update_card(&mut slot.card, &model);
                        slot.model = model;
                        stats.updated += 1;
                    }
                    slots.push(slot);
                }
                None => {
                    let card = view.create_card(&model);
                    stats.created += 1;
                    slots.push(Slot { model, card });
                }
            }
        }
        self.slots = slots;

        if !stats.is_empty() {
            debug!(
                "Grid reconciled: {} created, {} updated, {} removed",
                stats.created, stats.updated, stats.removed
            );
        }
        stats
    }
}
