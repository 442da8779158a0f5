//! Diff-batch commit: turn scattered cell edits into the fewest bulk requests.
//!
//! Dirty weights are grouped by target value and dirty cells by (site, rule),
//! so the number of requests is bounded by the distinct values touched, not
//! by the number of edits. Every batch is an idempotent bulk write, which is
//! what makes retrying a partially failed commit safe.

use std::collections::BTreeMap;

use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use uuid::Uuid;

use crate::matrix::api::MatrixApi;
use crate::matrix::error::{ClientError, CommitError};
use crate::matrix::state::MatrixState;
use crate::models::advertiser::{AdvertiserId, Weight};
use crate::models::bulk::{BulkCount, BulkRuleRequest, BulkWeightRequest};
use crate::models::rule::RuleValue;
use crate::models::site::SiteId;

/// Advertisers whose weight becomes `weight` (`None` clears it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeightBatch {
    pub weight: Option<Weight>,
    pub ids: Vec<AdvertiserId>,
}

/// Advertisers whose cell on `site_id` becomes `rule`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleBatch {
    pub site_id: SiteId,
    pub rule: RuleValue,
    pub ids: Vec<AdvertiserId>,
}

/// The requests a commit will issue. Groups and ids are in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitPlan {
    pub weights: Vec<WeightBatch>,
    pub rules: Vec<RuleBatch>,
    /// Shared by every rule batch.
    pub reason: Option<String>,
}

impl CommitPlan {
    pub fn request_count(&self) -> usize {
        self.weights.len() + self.rules.len()
    }

    pub fn edit_count(&self) -> usize {
        self.weights.iter().map(|b| b.ids.len()).sum::<usize>()
            + self.rules.iter().map(|b| b.ids.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.request_count() == 0
    }

    fn weight_requests(&self) -> impl Iterator<Item = BulkWeightRequest> + '_ {
        self.weights.iter().map(|batch| BulkWeightRequest {
            ids: Some(batch.ids.clone()),
            filter: None,
            weight: batch.weight,
        })
    }

    fn rule_requests(&self) -> impl Iterator<Item = BulkRuleRequest> + '_ {
        self.rules.iter().map(|batch| BulkRuleRequest {
            ids: Some(batch.ids.clone()),
            filter: None,
            site_id: batch.site_id,
            rule: batch.rule,
            reason: self.reason.clone(),
        })
    }
}

/// Group the dirty sets of `state` into batches. Pure; issues nothing.
pub fn plan(state: &MatrixState, reason: Option<&str>) -> CommitPlan {
    let mut weights: BTreeMap<Option<Weight>, Vec<AdvertiserId>> = BTreeMap::new();
    for (id, weight) in state.dirty_weights() {
        weights.entry(weight).or_default().push(id);
    }

    let mut rules: BTreeMap<(SiteId, RuleValue), Vec<AdvertiserId>> = BTreeMap::new();
    for (key, cell) in state.dirty_rules() {
        // A dirty cell is never Absent: Absent is only reachable by reverting to it.
        if let Some(rule) = cell.rule() {
            rules
                .entry((key.site_id, rule))
                .or_default()
                .push(key.advertiser_id);
        }
    }

    CommitPlan {
        weights: weights
            .into_iter()
            .map(|(weight, ids)| WeightBatch { weight, ids })
            .collect(),
        rules: rules
            .into_iter()
            .map(|((site_id, rule), ids)| RuleBatch { site_id, rule, ids })
            .collect(),
        reason: reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    }
}

/// Outcome of a fully successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub commit_id: Uuid,
    pub requests: usize,
    pub edits: usize,
    /// Sum of the per-batch target counts reported by the server.
    pub written: usize,
    /// Set when every batch landed but re-reading the view afterwards failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

/// Issue every batch in `plan` concurrently and reduce the results.
///
/// Succeeds only if every request succeeds. Batches that did succeed are not
/// rolled back when another fails.
pub async fn execute<A>(api: &A, plan: &CommitPlan) -> Result<CommitReport, ClientError>
where
    A: MatrixApi + ?Sized,
{
    let commit_id = Uuid::now_v7();
    let requests = plan.request_count();
    let edits = plan.edit_count();

    if plan.is_empty() {
        tracing::debug!(%commit_id, "Nothing to commit");
        return Ok(CommitReport {
            commit_id,
            requests: 0,
            edits: 0,
            written: 0,
            refresh_error: None,
        });
    }

    tracing::info!(%commit_id, requests, edits, "Committing matrix edits");

    let mut calls: Vec<BoxFuture<'_, Result<BulkCount, ClientError>>> =
        Vec::with_capacity(requests);
    for req in plan.weight_requests() {
        calls.push(Box::pin(async move { api.bulk_set_weight(&req).await }));
    }
    for req in plan.rule_requests() {
        calls.push(Box::pin(async move { api.bulk_set_rules(&req).await }));
    }

    let mut written = 0;
    let mut messages = Vec::new();
    for result in join_all(calls).await {
        match result {
            Ok(count) => written += count.count,
            Err(e) => messages.push(e.to_string()),
        }
    }

    if !messages.is_empty() {
        tracing::warn!(
            %commit_id,
            failed = messages.len(),
            total = requests,
            "Commit failed; pending edits kept for retry"
        );
        return Err(CommitError::PartialBatchFailure {
            failed: messages.len(),
            total: requests,
            messages,
        }
        .into());
    }

    tracing::info!(%commit_id, written, "Commit applied");
    Ok(CommitReport {
        commit_id,
        requests,
        edits,
        written,
        refresh_error: None,
    })
}
