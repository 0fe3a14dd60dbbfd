//! Candidate discovery of vulnerable software for a component.
//!
//! Two independent candidate sets are computed against the VulnerableSoftware
//! index:
//!
//! - a structural set from CPE regex patterns over `cpe23`, built from
//!   (vendor, product) search terms taken from the component's CPE, its
//!   package URL, and its group and name;
//! - an approximate set from a Levenshtein query on `product`, restricted to
//!   the component's CPE part, or to any part when the component has none.
//!
//! Strict matching keeps candidates present in both sets, lenient matching
//! keeps either. Candidates are plausible matches only; confirming that a
//! component is affected is left to the caller.

use crate::cpe::{is_wildcard, quote_component, CpeName, CpePatternCompiler, ANY};
use crate::metrics::FUZZY_MATCH_CANDIDATES_TOTAL;
use crate::models::{Component, PackageUrl, VulnerableSoftware};
use crate::search::config::FuzzyConfig;
use crate::search::document::{IndexType, UUID_FIELD};
use crate::search::error::{IndexResult, SearchError};
use crate::search::query::{SearchResult, SearchRow};
use crate::search::registry::IndexRegistry;
use crate::search::service::SearchManager;
use crate::state::EntityStore;
use std::collections::HashSet;
use std::sync::Arc;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, RegexQuery};
use tantivy::Term;
use uuid::Uuid;

/// Levenshtein automata are only built up to this distance
const MAX_EDIT_DISTANCE: u8 = 2;

/// Names this short are never fuzzed
const MIN_FUZZ_LENGTH: usize = 3;

/// A (vendor, product) pair in CPE 2.3 quoted form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SearchTerm {
    vendor: String,
    product: String,
}

impl SearchTerm {
    fn new(vendor: Option<String>, product: String) -> Option<Self> {
        if is_wildcard(&product) {
            return None;
        }
        let vendor = vendor
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| ANY.to_string());
        Some(Self { vendor, product })
    }
}

pub struct FuzzyVulnerableSoftwareSearchManager {
    search: SearchManager,
    store: Arc<dyn EntityStore>,
    config: FuzzyConfig,
}

impl FuzzyVulnerableSoftwareSearchManager {
    pub fn new(
        registry: Arc<IndexRegistry>,
        store: Arc<dyn EntityStore>,
        config: FuzzyConfig,
    ) -> Self {
        Self {
            search: SearchManager::new(registry),
            store,
            config,
        }
    }

    pub fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    /// `fuzzy_match` with the configured strictness
    pub async fn fuzzy_match_default(
        &self,
        component: &Component,
    ) -> IndexResult<Vec<VulnerableSoftware>> {
        self.fuzzy_match(component, self.config.strict).await
    }

    /// Find vulnerable software plausibly describing `component`.
    ///
    /// A CPE that does not parse is logged and ignored; matching then relies
    /// on the package URL and the component name.
    pub async fn fuzzy_match(
        &self,
        component: &Component,
        strict: bool,
    ) -> IndexResult<Vec<VulnerableSoftware>> {
        let purl = component.purl.as_deref().and_then(|raw| {
            PackageUrl::parse(raw)
                .map_err(|e| {
                    tracing::warn!(component = %component.uuid, purl = raw, error = %e, "Ignoring unparsable package URL")
                })
                .ok()
        });

        if self.config.exclude_components_with_purl {
            if let Some(purl) = purl.as_ref().filter(|p| p.package_type != "deb") {
                tracing::debug!(
                    component = %component.uuid,
                    purl_type = %purl.package_type,
                    "Component has a package URL, skipping fuzzy match"
                );
                return Ok(Vec::new());
            }
        }

        let cpe = component
            .cpe
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| match CpeName::parse(raw) {
                Ok(cpe) => Some(cpe),
                Err(e) => {
                    tracing::warn!(
                        component = %component.uuid,
                        cpe = raw,
                        error = %e,
                        "CPE does not parse, falling back to name matching"
                    );
                    None
                }
            });

        let part = cpe
            .as_ref()
            .map(|c| c.part.as_str())
            .filter(|p| !is_wildcard(p))
            .unwrap_or(ANY)
            .to_string();

        let terms = search_terms(component, cpe.as_ref(), purl.as_ref());
        let structural = self.structural_candidates(&part, &terms).await?;

        let fuzzy_name = name_to_fuzz(component, cpe.as_ref(), purl.as_ref());
        let fuzzy = if self.should_fuzz(&fuzzy_name, purl.as_ref()) {
            Some(self.fuzzy_candidates(&part, &fuzzy_name).await?)
        } else {
            None
        };

        let uuids = combine(structural, fuzzy.unwrap_or_default(), strict);
        let candidates = self.dereference(uuids).await?;

        let mode = if strict { "strict" } else { "lenient" };
        FUZZY_MATCH_CANDIDATES_TOTAL
            .with_label_values(&[mode])
            .inc_by(candidates.len() as f64);
        tracing::debug!(
            component = %component.uuid,
            mode,
            terms = terms.len(),
            candidates = candidates.len(),
            "Fuzzy match complete"
        );

        Ok(candidates)
    }

    /// Run a prepared query against the VulnerableSoftware index
    pub async fn search_vulnerable_software(
        &self,
        query: Box<dyn Query>,
        limit: usize,
    ) -> IndexResult<SearchResult> {
        let rows = self
            .search
            .search_with_query(IndexType::VulnerableSoftware, query, limit)
            .await?;

        let mut result = SearchResult::new();
        result.add_result_set(IndexType::VulnerableSoftware, rows);
        Ok(result)
    }

    fn should_fuzz(&self, name: &str, purl: Option<&PackageUrl>) -> bool {
        if name.chars().count() < MIN_FUZZ_LENGTH {
            return false;
        }
        if self.config.do_not_fuzz.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return false;
        }
        if let Some(purl) = purl {
            if self
                .config
                .skip_fuzzing_for_purl_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&purl.package_type))
            {
                return false;
            }
        }
        true
    }

    /// First search term with hits wins; a concrete vendor is retried as `*`
    async fn structural_candidates(&self, part: &str, terms: &[SearchTerm]) -> IndexResult<Vec<Uuid>> {
        for term in terms {
            let mut hits = self.structural_search(part, &term.vendor, &term.product).await?;
            if hits.is_empty() && !is_wildcard(&term.vendor) {
                hits = self.structural_search(part, ANY, &term.product).await?;
            }
            if !hits.is_empty() {
                return Ok(hits);
            }
        }
        Ok(Vec::new())
    }

    async fn structural_search(&self, part: &str, vendor: &str, product: &str) -> IndexResult<Vec<Uuid>> {
        let cpe = format!("cpe:2.3:{}:{}:{}", part, vendor, product);
        let compiled = CpePatternCompiler::compile(&cpe)
            .map_err(SearchError::from)
            .and_then(|p| p.require_selective());
        let pattern = match compiled {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::debug!(cpe = %cpe, error = %e, "Skipping search term");
                return Ok(Vec::new());
            }
        };

        let manager = self.search.registry().get(IndexType::VulnerableSoftware)?;
        let field = manager.schema().get_field(pattern.field().as_str())?;
        let query = RegexQuery::from_pattern(pattern.body(), field)?;

        let rows = self
            .search
            .search_with_query(IndexType::VulnerableSoftware, Box::new(query), self.config.max_candidates)
            .await?;
        Ok(row_uuids(&rows))
    }

    async fn fuzzy_candidates(&self, part: &str, name: &str) -> IndexResult<Vec<Uuid>> {
        let manager = self.search.registry().get(IndexType::VulnerableSoftware)?;
        let schema = manager.schema();
        let product_field = schema.get_field("product")?;

        let distance = edit_distance(name, self.config.min_similarity);
        let fuzzy = FuzzyTermQuery::new(Term::from_field_text(product_field, name), distance, true);

        let part_pattern = CpePatternCompiler::part_only(part)?;
        let cpe_field = schema.get_field(part_pattern.field().as_str())?;
        let part_query = RegexQuery::from_pattern(part_pattern.body(), cpe_field)?;

        let query = BooleanQuery::new(vec![
            (Occur::Must, Box::new(fuzzy) as Box<dyn Query>),
            (Occur::Must, Box::new(part_query) as Box<dyn Query>),
        ]);

        tracing::debug!(name, distance, part, "Running fuzzy product query");
        let rows = self
            .search
            .search_with_query(IndexType::VulnerableSoftware, Box::new(query), self.config.max_candidates)
            .await?;
        Ok(row_uuids(&rows))
    }

    /// Resolve hits to live entities, dropping those deleted since indexing
    async fn dereference(&self, uuids: Vec<Uuid>) -> IndexResult<Vec<VulnerableSoftware>> {
        let mut candidates = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            match self
                .store
                .get_by_uuid(IndexType::VulnerableSoftware, &uuid)
                .await?
                .and_then(|entity| entity.into_vulnerable_software())
            {
                Some(vs) => candidates.push(vs),
                None => tracing::debug!(uuid = %uuid, "Dropping index hit without live entity"),
            }
        }
        Ok(candidates)
    }
}

/// Allowed edits for `name`: `floor((1 - min_similarity) * len)`, capped at 2
fn edit_distance(name: &str, min_similarity: f32) -> u8 {
    let len = name.chars().count() as f32;
    let similarity = min_similarity.clamp(0.0, 1.0);
    let distance = ((1.0 - similarity) * len).floor() as u32;
    distance.min(MAX_EDIT_DISTANCE as u32) as u8
}

fn unquote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(quoted) = chars.next() {
                out.push(quoted);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// True when a CPE 2.3 value carries `*` or `?` that is not backslash-quoted
fn has_unquoted_wildcard(value: &str) -> bool {
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

fn name_to_fuzz(component: &Component, cpe: Option<&CpeName>, purl: Option<&PackageUrl>) -> String {
    cpe.map(|c| c.product.as_str())
        .filter(|p| !is_wildcard(p) && *p != "-" && !has_unquoted_wildcard(p))
        .map(unquote)
        .or_else(|| purl.map(|p| p.name.clone()))
        .unwrap_or_else(|| component.name.clone())
        .trim()
        .to_lowercase()
}

/// Ordered, deduplicated (vendor, product) terms: CPE, package URL, then group and name
fn search_terms(component: &Component, cpe: Option<&CpeName>, purl: Option<&PackageUrl>) -> Vec<SearchTerm> {
    let mut terms = Vec::new();

    if let Some(cpe) = cpe {
        terms.extend(SearchTerm::new(Some(cpe.vendor.clone()), cpe.product.clone()));
    }

    if let Some(purl) = purl {
        let vendor = if purl.package_type == "golang" {
            purl.last_namespace_segment().map(str::to_string)
        } else {
            purl.namespace.clone()
        };
        terms.extend(SearchTerm::new(
            vendor.as_deref().map(quote_component),
            quote_component(&purl.name),
        ));
    }

    terms.extend(SearchTerm::new(
        component.group.as_deref().map(quote_component),
        quote_component(&component.name),
    ));

    let mut seen = HashSet::new();
    terms.retain(|term| seen.insert(term.clone()));
    terms
}

fn combine(structural: Vec<Uuid>, fuzzy: Vec<Uuid>, strict: bool) -> Vec<Uuid> {
    if strict {
        let fuzzy: HashSet<Uuid> = fuzzy.into_iter().collect();
        structural.into_iter().filter(|uuid| fuzzy.contains(uuid)).collect()
    } else {
        let mut seen = HashSet::new();
        structural
            .into_iter()
            .chain(fuzzy)
            .filter(|uuid| seen.insert(*uuid))
            .collect()
    }
}

fn row_uuids(rows: &[SearchRow]) -> Vec<Uuid> {
    rows.iter()
        .filter_map(|row| row.get(UUID_FIELD))
        .filter_map(|uuid| Uuid::parse_str(uuid).ok())
        .collect()
}
