//! Free-text query building and type-bucketed results

use crate::search::document::{FieldKind, IndexType, UUID_FIELD};
use crate::search::error::{IndexResult, SearchError};
use crate::search::index::IndexManager;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tantivy::query::{BooleanQuery, BoostQuery, EmptyQuery, Occur, Query, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::Term;
use uuid::Uuid;

/// One stored document: field name to value
pub type SearchRow = HashMap<String, String>;

/// Boost multiplier of an exact term match
pub const EXACT_BOOST: f32 = 100.0;

/// Boost multiplier of a prefix match
pub const PREFIX_BOOST: f32 = 5.0;

/// Builds the multi-field disjunction for one index type.
///
/// For every search field after the identifier, each analyzed token (text
/// fields) or the whole lowercased query (raw fields) contributes an exact
/// term clause, a prefix regex clause and a substring regex clause, boosted
/// by the field's weight. A query that parses as a UUID becomes a single
/// exact term query on the identifier field.
pub struct QueryBuilder<'a> {
    manager: &'a IndexManager,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(manager: &'a IndexManager) -> Self {
        Self { manager }
    }

    pub fn build(&self, text: &str) -> IndexResult<Box<dyn Query>> {
        let query = text.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "search query must not be blank".to_string(),
            ));
        }

        let schema = self.manager.schema();

        // a UUID is answered by the identifier alone; its hex groups would
        // otherwise match unrelated text tokens
        if let Ok(uuid) = Uuid::parse_str(query) {
            let field = schema.get_field(UUID_FIELD)?;
            return Ok(Box::new(TermQuery::new(
                Term::from_field_text(field, &uuid.to_string()),
                IndexRecordOption::Basic,
            )));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for spec in self.manager.descriptor().fields {
            let field = schema.get_field(spec.name)?;

            match spec.kind {
                FieldKind::Identifier => {}
                FieldKind::Text => {
                    for token in self.analyze(field, query)? {
                        self.push_value_clauses(
                            &mut clauses,
                            field,
                            &token,
                            spec.boost,
                            IndexRecordOption::WithFreqs,
                        )?;
                    }
                }
                FieldKind::Raw => {
                    self.push_value_clauses(
                        &mut clauses,
                        field,
                        &query.to_lowercase(),
                        spec.boost,
                        IndexRecordOption::Basic,
                    )?;
                }
            }
        }

        if clauses.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Tokens the field's analyzer produces for `text`, deduplicated, in order
    fn analyze(&self, field: Field, text: &str) -> IndexResult<Vec<String>> {
        let mut analyzer = self.manager.index().tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens: Vec<String> = Vec::new();
        while stream.advance() {
            let token = &stream.token().text;
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
        Ok(tokens)
    }

    fn push_value_clauses(
        &self,
        clauses: &mut Vec<(Occur, Box<dyn Query>)>,
        field: Field,
        value: &str,
        boost: f32,
        record_option: IndexRecordOption,
    ) -> IndexResult<()> {
        let escaped = regex::escape(value);

        let exact = TermQuery::new(Term::from_field_text(field, value), record_option);
        let prefix = RegexQuery::from_pattern(&format!("{}.*", escaped), field)?;
        let substring = RegexQuery::from_pattern(&format!(".*{}.*", escaped), field)?;

        clauses.push((
            Occur::Should,
            Box::new(BoostQuery::new(Box::new(exact), boost * EXACT_BOOST)),
        ));
        clauses.push((
            Occur::Should,
            Box::new(BoostQuery::new(Box::new(prefix), boost * PREFIX_BOOST)),
        ));
        clauses.push((
            Occur::Should,
            Box::new(BoostQuery::new(Box::new(substring), boost)),
        ));
        Ok(())
    }
}

/// Type-bucketed search results; bucket keys are lowercased index type names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    results: BTreeMap<String, Vec<SearchRow>>,
}

impl SearchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the rows found for one queried type; an empty list still creates the key
    pub fn add_result_set(&mut self, index_type: IndexType, rows: Vec<SearchRow>) {
        self.results
            .entry(index_type.name())
            .or_default()
            .extend(rows);
    }

    /// Rows for one type, or `None` when that type was not queried
    pub fn get(&self, index_type: IndexType) -> Option<&[SearchRow]> {
        self.results
            .get(&index_type.name())
            .map(|rows| rows.as_slice())
    }

    pub fn contains(&self, index_type: IndexType) -> bool {
        self.results.contains_key(&index_type.name())
    }

    /// UUIDs of the rows for one type, in result order
    pub fn uuids(&self, index_type: IndexType) -> Vec<Uuid> {
        self.get(index_type)
            .unwrap_or_default()
            .iter()
            .filter_map(|row| row.get(UUID_FIELD))
            .filter_map(|uuid| Uuid::parse_str(uuid).ok())
            .collect()
    }

    pub fn merge(&mut self, other: SearchResult) {
        for (name, rows) in other.results {
            self.results.entry(name).or_default().extend(rows);
        }
    }

    /// Total rows across all buckets
    pub fn total_hits(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    pub fn results(&self) -> &BTreeMap<String, Vec<SearchRow>> {
        &self.results
    }

    pub fn into_results(self) -> BTreeMap<String, Vec<SearchRow>> {
        self.results
    }
}
