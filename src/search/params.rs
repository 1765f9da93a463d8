use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Sentinel filter value matching documents that lack the field entirely
pub const MISSING_FIELD_SPECIAL_VALUE: &str = "_MISSING";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Half-open or closed date window; unset ends are left unconstrained
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValues {
    Text(Vec<String>),
    Date(DateRange),
}

/// A single parsed filter_ or reject_ parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field_name: String,
    pub values: FilterValues,
    pub reject: bool,
    pub include_missing: bool,
}

impl FieldFilter {
    /// The raw term values, empty for date filters
    pub fn text_values(&self) -> &[String] {
        match &self.values {
            FilterValues::Text(values) => values,
            FilterValues::Date(_) => &[],
        }
    }
}

/// Which filters apply when counting facet values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetScope {
    /// Count as if the facet's own field had no filter, so other values of a
    /// multi-select stay visible
    ExcludeFieldFilter,
    /// Count only documents in the filtered result set
    AllFilters,
}

impl FacetScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetScope::ExcludeFieldFilter => "exclude_field_filter",
            FacetScope::AllFilters => "all_filters",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleScope {
    /// Examples drawn from documents matching the query and filters
    Query,
    /// Examples drawn from the whole collection
    Global,
}

/// Keys a facet's options can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetSortKey {
    Filtered,
    Count,
    Value,
    Slug,
    Title,
    Link,
}

impl FacetSortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "filtered" => Some(FacetSortKey::Filtered),
            "count" => Some(FacetSortKey::Count),
            "value" => Some(FacetSortKey::Value),
            "value.slug" => Some(FacetSortKey::Slug),
            "value.title" => Some(FacetSortKey::Title),
            "value.link" => Some(FacetSortKey::Link),
            _ => None,
        }
    }
}

/// Options which have filters applied come first, then the most common
/// values, ties broken by slug
pub fn default_facet_sort() -> Vec<(FacetSortKey, i32)> {
    vec![
        (FacetSortKey::Filtered, 1),
        (FacetSortKey::Count, -1),
        (FacetSortKey::Slug, 1),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetParams {
    /// How many options to return
    pub requested: usize,
    pub scope: FacetScope,
    pub order: Vec<(FacetSortKey, i32)>,
    /// Example documents to fetch per option; 0 disables examples
    pub examples: usize,
    pub example_fields: Vec<String>,
    pub example_scope: Option<ExampleScope>,
}

impl Default for FacetParams {
    fn default() -> Self {
        Self {
            requested: 0,
            scope: FacetScope::ExcludeFieldFilter,
            order: default_facet_sort(),
            examples: 0,
            example_fields: Vec::new(),
            example_scope: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOptions {
    pub disable_best_bets: bool,
    pub disable_popularity: bool,
    pub disable_synonyms: bool,
    pub disable_boosting: bool,
    pub explain: bool,
    pub show_query: bool,
}

/// A validated, immutable search request. Construct through
/// [`super::parser::ParameterParser`]; every field named here has already
/// been checked against the index's declared field set.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub start: usize,
    pub count: usize,
    pub query: Option<String>,
    pub order: Option<(String, SortDirection)>,
    pub return_fields: Vec<String>,
    pub filters: Vec<FieldFilter>,
    pub facets: BTreeMap<String, FacetParams>,
    pub debug: DebugOptions,
    pub suggest: Vec<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            start: 0,
            count: 10,
            query: None,
            order: None,
            return_fields: Vec::new(),
            filters: Vec::new(),
            facets: BTreeMap::new(),
            debug: DebugOptions::default(),
            suggest: Vec::new(),
        }
    }
}

impl SearchParams {
    pub fn field_requested(&self, name: &str) -> bool {
        self.return_fields.iter().any(|f| f == name)
    }

    pub fn suggest_spelling(&self) -> bool {
        self.query.is_some() && self.suggest.iter().any(|s| s == "spelling")
    }

    /// The filter applied to `field`, if any
    pub fn filter_for(&self, field: &str) -> Option<&FieldFilter> {
        self.filters
            .iter()
            .find(|f| !f.reject && f.field_name == field)
    }
}
