//! Client-held matrix state: editable rules and weights with dirty tracking.
//!
//! Every mutation ends by recomputing dirtiness for the keys it touched, so a
//! key is in a dirty set exactly when its current value differs from the value
//! last loaded from or committed to the server. Reverting an edit by hand clears it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::matrix::error::MatrixError;
use crate::models::advertiser::{AdvertiserId, Weight};
use crate::models::matrix::{MatrixRow, MatrixSnapshot};
use crate::models::rule::RuleValue;
use crate::models::site::SiteId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub advertiser_id: AdvertiserId,
    pub site_id: SiteId,
}

impl CellKey {
    pub fn new(advertiser_id: AdvertiserId, site_id: SiteId) -> Self {
        Self {
            advertiser_id,
            site_id,
        }
    }
}

/// One matrix cell. `Absent` (no stored row) and `Default` are both undecided
/// but are distinct states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    #[default]
    Absent,
    Default,
    Allowed,
    Denied,
}

impl CellState {
    /// Next state when the operator clicks the cell. Never returns to undecided.
    pub fn cycled(self) -> Self {
        match self {
            Self::Absent | Self::Default => Self::Allowed,
            Self::Allowed => Self::Denied,
            Self::Denied => Self::Allowed,
        }
    }

    /// The value to write for this cell; `None` for `Absent`.
    pub fn rule(self) -> Option<RuleValue> {
        match self {
            Self::Absent => None,
            Self::Default => Some(RuleValue::Default),
            Self::Allowed => Some(RuleValue::Allowed),
            Self::Denied => Some(RuleValue::Denied),
        }
    }
}

impl From<RuleValue> for CellState {
    fn from(rule: RuleValue) -> Self {
        match rule {
            RuleValue::Allowed => Self::Allowed,
            RuleValue::Denied => Self::Denied,
            RuleValue::Default => Self::Default,
        }
    }
}

/// Which advertisers the next bulk action targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    Explicit(BTreeSet<AdvertiserId>),
    /// Everything the current filter matches, minus explicit exclusions.
    /// Resolved against the server only when a bulk action runs.
    AllMatching { excluded: BTreeSet<AdvertiserId> },
}

impl Default for Selection {
    fn default() -> Self {
        Self::Explicit(BTreeSet::new())
    }
}

impl Selection {
    pub fn contains(&self, id: AdvertiserId) -> bool {
        match self {
            Self::Explicit(ids) => ids.contains(&id),
            Self::AllMatching { excluded } => !excluded.contains(&id),
        }
    }

    pub fn is_all_matching(&self) -> bool {
        matches!(self, Self::AllMatching { .. })
    }

    /// Narrow a resolved match list to the selected ids, keeping its order.
    pub fn resolve(&self, matching: &[AdvertiserId]) -> Vec<AdvertiserId> {
        matching
            .iter()
            .copied()
            .filter(|id| self.contains(*id))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatrixState {
    sites: Vec<SiteId>,
    weights: BTreeMap<AdvertiserId, Option<Weight>>,
    original_weights: BTreeMap<AdvertiserId, Option<Weight>>,
    dirty_weights: BTreeSet<AdvertiserId>,
    // Missing keys are `Absent`.
    rules: BTreeMap<CellKey, CellState>,
    original_rules: BTreeMap<CellKey, CellState>,
    dirty_rules: BTreeSet<CellKey>,
    selection: Selection,
}

impl MatrixState {
    pub fn from_snapshot(snapshot: &MatrixSnapshot) -> Self {
        let mut state = Self::default();
        state.load(snapshot);
        state
    }

    /// Replace all state with `snapshot`. Pending edits and selection are dropped.
    pub fn load(&mut self, snapshot: &MatrixSnapshot) {
        *self = Self {
            sites: snapshot.sites.clone(),
            ..Self::default()
        };
        self.absorb(snapshot);
    }

    /// Merge advertisers the state does not know yet.
    ///
    /// Known advertisers keep their current and original values, so pending
    /// edits survive. Site columns seen for the first time are filled in for
    /// known advertisers present in `snapshot`; the others need a
    /// [`merge_columns`](Self::merge_columns) pass. Returns how many
    /// advertisers were added.
    pub fn absorb(&mut self, snapshot: &MatrixSnapshot) -> usize {
        let new_sites = self.unseen_sites(snapshot);
        self.sites.extend(&new_sites);

        let mut added = 0;
        for row in &snapshot.rows {
            if self.weights.contains_key(&row.advertiser_id) {
                self.merge_row_columns(row, &new_sites);
                continue;
            }
            self.weights.insert(row.advertiser_id, row.weight);
            self.original_weights.insert(row.advertiser_id, row.weight);
            for (site_id, rule) in &row.rules {
                let key = CellKey::new(row.advertiser_id, *site_id);
                self.rules.insert(key, CellState::from(*rule));
                self.original_rules.insert(key, CellState::from(*rule));
            }
            added += 1;
        }
        added
    }

    /// Active sites in `snapshot` that are not matrix columns yet.
    pub fn unseen_sites(&self, snapshot: &MatrixSnapshot) -> Vec<SiteId> {
        snapshot
            .sites
            .iter()
            .copied()
            .filter(|site_id| !self.sites.contains(site_id))
            .collect()
    }

    /// Load stored rules of known advertisers for the given columns.
    ///
    /// Unknown advertisers and sites that are not columns are skipped, and
    /// cells with a pending edit are left alone.
    pub fn merge_columns(&mut self, snapshot: &MatrixSnapshot, site_ids: &[SiteId]) {
        let site_ids: Vec<SiteId> = site_ids
            .iter()
            .copied()
            .filter(|site_id| self.sites.contains(site_id))
            .collect();
        for row in &snapshot.rows {
            if self.weights.contains_key(&row.advertiser_id) {
                self.merge_row_columns(row, &site_ids);
            }
        }
    }

    fn merge_row_columns(&mut self, row: &MatrixRow, site_ids: &[SiteId]) {
        for site_id in site_ids {
            let key = CellKey::new(row.advertiser_id, *site_id);
            if self.dirty_rules.contains(&key) {
                continue;
            }
            match row.rules.get(site_id) {
                Some(rule) => {
                    self.rules.insert(key, CellState::from(*rule));
                    self.original_rules.insert(key, CellState::from(*rule));
                }
                None => {
                    self.rules.remove(&key);
                    self.original_rules.remove(&key);
                }
            }
        }
    }

    fn require_advertiser(&self, id: AdvertiserId) -> Result<(), MatrixError> {
        if self.weights.contains_key(&id) {
            Ok(())
        } else {
            Err(MatrixError::UnknownAdvertiser(id))
        }
    }

    fn require_site(&self, site_id: SiteId) -> Result<(), MatrixError> {
        if self.sites.contains(&site_id) {
            Ok(())
        } else {
            Err(MatrixError::UnknownSite(site_id))
        }
    }

    fn refresh_weight(&mut self, id: AdvertiserId) {
        if self.weights.get(&id) == self.original_weights.get(&id) {
            self.dirty_weights.remove(&id);
        } else {
            self.dirty_weights.insert(id);
        }
    }

    fn refresh_cell(&mut self, key: CellKey) {
        let current = self.rules.get(&key).copied().unwrap_or_default();
        let original = self.original_rules.get(&key).copied().unwrap_or_default();
        if current == original {
            self.dirty_rules.remove(&key);
        } else {
            self.dirty_rules.insert(key);
        }
    }

    // -- Edits --

    pub fn set_weight(
        &mut self,
        id: AdvertiserId,
        weight: Option<Weight>,
    ) -> Result<(), MatrixError> {
        self.require_advertiser(id)?;
        self.weights.insert(id, weight);
        self.refresh_weight(id);
        Ok(())
    }

    /// Advance one cell through Absent/Default → Allowed → Denied → Allowed.
    pub fn cycle_rule(
        &mut self,
        id: AdvertiserId,
        site_id: SiteId,
    ) -> Result<CellState, MatrixError> {
        let next = self.cell(id, site_id)?.cycled();
        let key = CellKey::new(id, site_id);
        self.rules.insert(key, next);
        self.refresh_cell(key);
        Ok(next)
    }

    pub fn set_rule(
        &mut self,
        id: AdvertiserId,
        site_id: SiteId,
        rule: RuleValue,
    ) -> Result<(), MatrixError> {
        self.require_advertiser(id)?;
        self.require_site(site_id)?;
        let key = CellKey::new(id, site_id);
        self.rules.insert(key, CellState::from(rule));
        self.refresh_cell(key);
        Ok(())
    }

    /// Set one weight on every id. All ids are checked before anything changes.
    pub fn apply_bulk_weight(
        &mut self,
        ids: &[AdvertiserId],
        weight: Option<Weight>,
    ) -> Result<usize, MatrixError> {
        for id in ids {
            self.require_advertiser(*id)?;
        }
        for id in ids {
            self.weights.insert(*id, weight);
            self.refresh_weight(*id);
        }
        Ok(ids.len())
    }

    /// Set one site's cell on every id. All ids are checked before anything changes.
    pub fn apply_bulk_rule(
        &mut self,
        site_id: SiteId,
        ids: &[AdvertiserId],
        rule: RuleValue,
    ) -> Result<usize, MatrixError> {
        self.require_site(site_id)?;
        for id in ids {
            self.require_advertiser(*id)?;
        }
        for id in ids {
            let key = CellKey::new(*id, site_id);
            self.rules.insert(key, CellState::from(rule));
            self.refresh_cell(key);
        }
        Ok(ids.len())
    }

    /// Revert every pending edit. Selection is left as is.
    pub fn discard(&mut self) {
        self.weights = self.original_weights.clone();
        self.rules = self.original_rules.clone();
        self.dirty_weights.clear();
        self.dirty_rules.clear();
    }

    /// Accept every pending edit as stored: originals take the current
    /// values and both dirty sets are cleared.
    pub fn mark_synced(&mut self) {
        self.original_weights = self.weights.clone();
        self.original_rules = self.rules.clone();
        self.dirty_weights.clear();
        self.dirty_rules.clear();
    }

    // -- Selection --

    pub fn select(&mut self, id: AdvertiserId) {
        match &mut self.selection {
            Selection::Explicit(ids) => {
                ids.insert(id);
            }
            Selection::AllMatching { excluded } => {
                excluded.remove(&id);
            }
        }
    }

    pub fn deselect(&mut self, id: AdvertiserId) {
        match &mut self.selection {
            Selection::Explicit(ids) => {
                ids.remove(&id);
            }
            Selection::AllMatching { excluded } => {
                excluded.insert(id);
            }
        }
    }

    pub fn select_all_matching(&mut self) {
        self.selection = Selection::AllMatching {
            excluded: BTreeSet::new(),
        };
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }

    pub fn select_page(&mut self, page_ids: &[AdvertiserId]) {
        for id in page_ids {
            self.select(*id);
        }
    }

    pub fn deselect_page(&mut self, page_ids: &[AdvertiserId]) {
        for id in page_ids {
            self.deselect(*id);
        }
    }

    /// Whether the page checkbox should render checked.
    pub fn all_on_page_selected(&self, page_ids: &[AdvertiserId]) -> bool {
        !page_ids.is_empty() && page_ids.iter().all(|id| self.selection.contains(*id))
    }

    pub fn is_selected(&self, id: AdvertiserId) -> bool {
        self.selection.contains(id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    // -- Reads --

    pub fn is_dirty(&self) -> bool {
        !self.dirty_weights.is_empty() || !self.dirty_rules.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty_weights.len() + self.dirty_rules.len()
    }

    pub fn weight(&self, id: AdvertiserId) -> Result<Option<Weight>, MatrixError> {
        self.weights
            .get(&id)
            .copied()
            .ok_or(MatrixError::UnknownAdvertiser(id))
    }

    pub fn cell(&self, id: AdvertiserId, site_id: SiteId) -> Result<CellState, MatrixError> {
        self.require_advertiser(id)?;
        self.require_site(site_id)?;
        Ok(self
            .rules
            .get(&CellKey::new(id, site_id))
            .copied()
            .unwrap_or_default())
    }

    pub fn is_weight_dirty(&self, id: AdvertiserId) -> bool {
        self.dirty_weights.contains(&id)
    }

    pub fn is_cell_dirty(&self, id: AdvertiserId, site_id: SiteId) -> bool {
        self.dirty_rules.contains(&CellKey::new(id, site_id))
    }

    pub fn contains(&self, id: AdvertiserId) -> bool {
        self.weights.contains_key(&id)
    }

    /// Known advertiser ids, ascending.
    pub fn advertiser_ids(&self) -> impl Iterator<Item = AdvertiserId> + '_ {
        self.weights.keys().copied()
    }

    pub fn sites(&self) -> &[SiteId] {
        &self.sites
    }

    /// Pending weights, ascending by advertiser id.
    pub fn dirty_weights(&self) -> impl Iterator<Item = (AdvertiserId, Option<Weight>)> + '_ {
        self.dirty_weights
            .iter()
            .map(|id| (*id, self.weights.get(id).copied().flatten()))
    }

    /// Pending cells, ascending by (advertiser id, site id).
    pub fn dirty_rules(&self) -> impl Iterator<Item = (CellKey, CellState)> + '_ {
        self.dirty_rules
            .iter()
            .map(|key| (*key, self.rules.get(key).copied().unwrap_or_default()))
    }
}
