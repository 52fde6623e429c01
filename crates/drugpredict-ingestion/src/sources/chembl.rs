//! ChEMBL API client.
//!
//! ChEMBL is a database of bioactive molecules with drug-like properties.
//! Only three resources are used here:
//!   - `target/search.json`  free-text target lookup
//!   - `target/{id}.json`    preferred name for an explicit target ID
//!   - `activity.json`       bioactivity rows, paged by `limit`/`offset`
//!
//! API docs: https://chembl.gitbook.io/chembl-interface-documentation/web-resources/chembl-api

use async_trait::async_trait;
use drugpredict_common::sandbox::SandboxClient as Client;
use drugpredict_common::ChemblConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::ActivitySource;
use crate::error::{IngestionError, Result};
use crate::models::{RawActivity, RecordLimit, ResolvedTarget, TargetSuggestion};

/// Prefix that marks a query as an explicit target identifier.
const CHEMBL_ID_PREFIX: &str = "CHEMBL";

/// One page of `activity.json`.
#[derive(Debug, Deserialize)]
struct ActivityPage {
    #[serde(default)]
    activities: Vec<ChemblActivity>,
    #[serde(default)]
    page_meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next: Option<String>,
    total_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChemblActivity {
    molecule_chembl_id: Option<String>,
    canonical_smiles: Option<String>,
    /// Usually a string, occasionally a bare number on mirrors.
    standard_value: Option<serde_json::Value>,
    standard_units: Option<String>,
    standard_type: Option<String>,
}

impl ChemblActivity {
    fn into_raw(self) -> Option<RawActivity> {
        let standard_value = match self.standard_value {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Some(RawActivity {
            molecule_chembl_id: self.molecule_chembl_id?,
            canonical_smiles: self.canonical_smiles,
            standard_value,
            standard_units: self.standard_units,
            standard_type: self.standard_type,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TargetSearchPage {
    #[serde(default)]
    targets: Vec<ChemblTarget>,
}

#[derive(Debug, Deserialize)]
struct ChemblTarget {
    target_chembl_id: Option<String>,
    pref_name: Option<String>,
    organism: Option<String>,
    target_type: Option<String>,
}

impl ChemblTarget {
    fn into_suggestion(self) -> Option<TargetSuggestion> {
        let name = self.pref_name.unwrap_or_default();
        Some(TargetSuggestion {
            id: self.target_chembl_id?,
            description: name.clone(),
            name,
            organism: self.organism.unwrap_or_default(),
            target_type: self.target_type.unwrap_or_default(),
        })
    }
}

/// ChEMBL client for target lookup and bioactivity retrieval.
pub struct ChemblClient {
    client: Client,
    base_url: String,
    page_size: usize,
    activity_type: String,
}

impl ChemblClient {
    pub fn new(config: &ChemblConfig) -> Result<Self> {
        let mut client = Client::with_timeout(Duration::from_secs(config.timeout_secs))?;
        client.allow_url_host(&config.base_url)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.clamp(1, 1000),
            activity_type: config.activity_type.clone(),
        })
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let resp = self.client.get(url)?.query(params).send().await?;
        if !resp.status().is_success() {
            return Err(IngestionError::Upstream {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.json().await?)
    }

    /// Preferred name of a target, if ChEMBL knows it.
    #[instrument(skip(self))]
    pub async fn fetch_target_name(&self, chembl_id: &str) -> Result<Option<String>> {
        let url = format!("{}/target/{}.json", self.base_url, chembl_id);
        debug!(chembl_id = chembl_id, "Fetching ChEMBL target");
        let json = self.get_json(&url, &[]).await?;
        Ok(json["pref_name"].as_str().map(String::from))
    }

    /// Raw target search, in ChEMBL's relevance order.
    #[instrument(skip(self))]
    pub async fn search_target_records(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<TargetSuggestion>> {
        let url = format!("{}/target/search.json", self.base_url);
        let json = self
            .get_json(
                &url,
                &[("q", query.to_string()), ("limit", max_results.to_string())],
            )
            .await?;
        let mut targets = parse_target_search(json)?;
        targets.truncate(max_results);
        Ok(targets)
    }
}

#[async_trait]
impl ActivitySource for ChemblClient {
    #[instrument(skip(self))]
    async fn resolve_target(&self, query: &str) -> Result<ResolvedTarget> {
        let query = query.trim();
        if query.is_empty() {
            return Err(IngestionError::InvalidRequest("target query is empty".into()));
        }

        if let Some(chembl_id) = explicit_target_id(query) {
            info!(target = %chembl_id, "Using provided ChEMBL ID");
            // The name is cosmetic; the ID stays usable without it.
            let display_name = match self.fetch_target_name(&chembl_id).await {
                Ok(Some(name)) if !name.is_empty() => name,
                Ok(_) => chembl_id.clone(),
                Err(e) => {
                    warn!(target = %chembl_id, error = %e, "Could not fetch target name");
                    chembl_id.clone()
                }
            };
            return Ok(ResolvedTarget { chembl_id, display_name });
        }

        let hits = self.search_target_records(query, 1).await?;
        let first = hits
            .into_iter()
            .next()
            .ok_or_else(|| IngestionError::TargetNotFound(query.to_string()))?;
        info!(target = %first.id, query = query, "Found target by name search");
        Ok(ResolvedTarget {
            chembl_id: first.id,
            display_name: query.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_activities(
        &self,
        target_id: &str,
        limit: RecordLimit,
    ) -> Result<Vec<RawActivity>> {
        let url = format!("{}/activity.json", self.base_url);
        let mut rows: Vec<RawActivity> = Vec::new();
        let mut offset = 0usize;

        // `offset` counts raw rows, so the limit covers the first `n` rows
        // served even when some of them are dropped for lacking an id.
        while let Some(page_size) = next_page_size(limit, offset, self.page_size) {

            debug!(target = target_id, offset = offset, page_size = page_size, "Fetching activity page");
            let json = self
                .get_json(
                    &url,
                    &[
                        ("target_chembl_id", target_id.to_string()),
                        ("standard_type", self.activity_type.clone()),
                        ("limit", page_size.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;

            let page = parse_activity_page(json)?;
            let fetched = page.count;
            rows.extend(page.rows);
            offset += fetched;

            if fetched == 0 || !page.has_next {
                break;
            }
        }

        info!(target = target_id, records = rows.len(), "Retrieved activity records");
        Ok(rows)
    }

    async fn search_targets(&self, query: &str, max_results: usize) -> Vec<TargetSuggestion> {
        match self.search_target_records(query, max_results).await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(query = query, error = %e, "Target search failed");
                Vec::new()
            }
        }
    }

    fn activity_type(&self) -> &str {
        &self.activity_type
    }
}

/// Upper-cased identifier when `query` names a target directly.
pub fn explicit_target_id(query: &str) -> Option<String> {
    let upper = query.trim().to_uppercase();
    upper.starts_with(CHEMBL_ID_PREFIX).then_some(upper)
}

/// Size of the next activity page once `fetched` raw rows have been served,
/// or `None` when the limit is reached.
pub(crate) fn next_page_size(limit: RecordLimit, fetched: usize, page_size: usize) -> Option<usize> {
    match limit.remaining(fetched) {
        Some(0) => None,
        Some(n) => Some(n.min(page_size)),
        None => Some(page_size),
    }
}

/// Parsed activity page: the rows plus what paging needs.
#[derive(Debug)]
pub(crate) struct ParsedPage {
    pub rows: Vec<RawActivity>,
    /// Rows on the page before dropping ID-less entries.
    pub count: usize,
    pub has_next: bool,
    pub total_count: Option<usize>,
}

pub(crate) fn parse_activity_page(json: serde_json::Value) -> Result<ParsedPage> {
    let page: ActivityPage = serde_json::from_value(json)?;
    let count = page.activities.len();
    let (has_next, total_count) = match page.page_meta {
        Some(meta) => (meta.next.is_some(), meta.total_count),
        None => (false, None),
    };
    let rows = page
        .activities
        .into_iter()
        .filter_map(ChemblActivity::into_raw)
        .collect();
    Ok(ParsedPage { rows, count, has_next, total_count })
}

pub(crate) fn parse_target_search(json: serde_json::Value) -> Result<Vec<TargetSuggestion>> {
    let page: TargetSearchPage = serde_json::from_value(json)?;
    Ok(page
        .targets
        .into_iter()
        .filter_map(ChemblTarget::into_suggestion)
        .collect())
}
