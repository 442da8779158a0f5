//! A grid editing session: matrix state bound to a transport and the current filter.

use std::collections::BTreeSet;

use crate::matrix::api::MatrixApi;
use crate::matrix::commit::{self, CommitPlan, CommitReport};
use crate::matrix::error::ClientError;
use crate::matrix::state::{MatrixState, Selection};
use crate::models::advertiser::{AdvertiserId, Weight};
use crate::models::filter::{AdvertiserFilters, SortParams};
use crate::models::matrix::{AdvertiserPage, MatrixSnapshot};
use crate::models::pagination::Pagination;
use crate::models::rule::RuleValue;
use crate::models::site::SiteId;

/// Snapshot requests are split so each body stays under the server's id limit.
const SNAPSHOT_CHUNK: usize = 1000;

pub struct GridSession<A: MatrixApi> {
    api: A,
    filters: AdvertiserFilters,
    sort: SortParams,
    pagination: Pagination,
    page: AdvertiserPage,
    state: MatrixState,
}

impl<A: MatrixApi> GridSession<A> {
    /// Query the first view and load it as fresh matrix state.
    pub async fn open(
        api: A,
        filters: AdvertiserFilters,
        sort: SortParams,
        pagination: Pagination,
    ) -> Result<Self, ClientError> {
        let page = api.query(&filters, &sort, &pagination).await?;
        let state = MatrixState::from_snapshot(&MatrixSnapshot::from(&page));
        Ok(Self {
            api,
            filters,
            sort,
            pagination,
            page,
            state,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &MatrixState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MatrixState {
        &mut self.state
    }

    pub fn page(&self) -> &AdvertiserPage {
        &self.page
    }

    pub fn filters(&self) -> &AdvertiserFilters {
        &self.filters
    }

    /// Ids on the rendered page, in display order.
    pub fn page_ids(&self) -> Vec<AdvertiserId> {
        self.page.page.items.iter().map(|row| row.advertiser.id).collect()
    }

    /// Re-query the current view and replace all state with it.
    pub async fn reload(&mut self) -> Result<(), ClientError> {
        self.page = self
            .api
            .query(&self.filters, &self.sort, &self.pagination)
            .await?;
        self.state.load(&MatrixSnapshot::from(&self.page));
        Ok(())
    }

    /// Merge `snapshot` into the state. When it brings new site columns, the
    /// loaded advertisers it does not cover are re-read for those columns.
    async fn absorb(&mut self, snapshot: &MatrixSnapshot) -> Result<(), ClientError> {
        let new_sites = self.state.unseen_sites(snapshot);
        self.state.absorb(snapshot);
        if new_sites.is_empty() {
            return Ok(());
        }

        let covered: BTreeSet<AdvertiserId> =
            snapshot.rows.iter().map(|row| row.advertiser_id).collect();
        let stale: Vec<AdvertiserId> = self
            .state
            .advertiser_ids()
            .filter(|id| !covered.contains(id))
            .collect();
        for chunk in stale.chunks(SNAPSHOT_CHUNK) {
            let refreshed = self.api.snapshot(chunk).await?;
            self.state.merge_columns(&refreshed, &new_sites);
        }
        tracing::debug!(
            new_sites = new_sites.len(),
            refreshed = stale.len(),
            "New site columns loaded"
        );
        Ok(())
    }

    /// Move to another page. Pending edits and selection carry over.
    pub async fn goto_page(&mut self, pagination: Pagination) -> Result<(), ClientError> {
        let page = self.api.query(&self.filters, &self.sort, &pagination).await?;
        self.absorb(&MatrixSnapshot::from(&page)).await?;
        self.page = page;
        self.pagination = pagination;
        Ok(())
    }

    /// Change filter and sort, returning to the first page. Pending edits are
    /// kept; an "all matching" selection is dropped because it was defined by
    /// the previous filter.
    pub async fn set_filters(
        &mut self,
        filters: AdvertiserFilters,
        sort: SortParams,
    ) -> Result<(), ClientError> {
        let pagination = Pagination {
            page: None,
            per_page: self.pagination.per_page,
        };
        let page = self.api.query(&filters, &sort, &pagination).await?;
        self.absorb(&MatrixSnapshot::from(&page)).await?;
        if self.state.selection().is_all_matching() {
            self.state.clear_selection();
        }
        self.filters = filters;
        self.sort = sort;
        self.pagination = pagination;
        self.page = page;
        Ok(())
    }

    /// Concrete ids the next bulk action targets.
    ///
    /// An "all matching" selection is resolved against the server with the
    /// current filter; advertisers outside the loaded pages are fetched and
    /// absorbed so they can be edited. Ids the server no longer knows are dropped.
    pub async fn resolve_selection(&mut self) -> Result<Vec<AdvertiserId>, ClientError> {
        let ids = match self.state.selection() {
            Selection::Explicit(ids) => ids.iter().copied().collect::<Vec<_>>(),
            Selection::AllMatching { .. } => {
                let matching = self.api.resolve_ids(&self.filters).await?;
                self.state.selection().resolve(&matching)
            }
        };

        let unknown: Vec<AdvertiserId> = ids
            .iter()
            .copied()
            .filter(|id| !self.state.contains(*id))
            .collect();
        for chunk in unknown.chunks(SNAPSHOT_CHUNK) {
            let snapshot = self.api.snapshot(chunk).await?;
            self.absorb(&snapshot).await?;
        }

        let resolved: Vec<AdvertiserId> =
            ids.into_iter().filter(|id| self.state.contains(*id)).collect();
        tracing::debug!(
            selected = resolved.len(),
            fetched = unknown.len(),
            "Selection resolved"
        );
        Ok(resolved)
    }

    /// Stage `weight` for every selected advertiser.
    pub async fn apply_bulk_weight(
        &mut self,
        weight: Option<Weight>,
    ) -> Result<usize, ClientError> {
        let ids = self.resolve_selection().await?;
        Ok(self.state.apply_bulk_weight(&ids, weight)?)
    }

    /// Stage `rule` on `site_id` for every selected advertiser.
    pub async fn apply_bulk_rule(
        &mut self,
        site_id: SiteId,
        rule: RuleValue,
    ) -> Result<usize, ClientError> {
        let ids = self.resolve_selection().await?;
        Ok(self.state.apply_bulk_rule(site_id, &ids, rule)?)
    }

    /// The batches a commit would issue right now.
    pub fn plan(&self, reason: Option<&str>) -> CommitPlan {
        commit::plan(&self.state, reason)
    }

    /// Send all pending edits, then reload the current view.
    ///
    /// On failure the pending edits are left exactly as they were, so calling
    /// `commit` again retries every batch; batches that already landed are
    /// rewritten with the same values. Once every batch has landed the edits
    /// are marked as stored before the reload, so a failed reload is reported
    /// in [`CommitReport::refresh_error`] and does not turn the commit into an error.
    pub async fn commit(&mut self, reason: Option<&str>) -> Result<CommitReport, ClientError> {
        let plan = self.plan(reason);
        let mut report = commit::execute(&self.api, &plan).await?;
        self.state.mark_synced();

        if let Err(e) = self.reload().await {
            tracing::warn!(
                commit_id = %report.commit_id,
                error = %e,
                "Commit applied but the view could not be reloaded"
            );
            report.refresh_error = Some(e.to_string());
        }
        Ok(report)
    }

    pub fn discard(&mut self) {
        self.state.discard();
    }
}
