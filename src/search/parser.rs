use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::schema::{FieldDefinitions, FilterType};

use super::error::{SearchError, SearchResult};
use super::params::{
    default_facet_sort, DateRange, DebugOptions, ExampleScope, FacetParams, FacetScope,
    FacetSortKey, FieldFilter, FilterValues, SearchParams, SortDirection,
    MISSING_FIELD_SPECIAL_VALUE,
};

/// Hard cap on the result set size a single request may ask for
pub const MAX_RESULTS: usize = 1000;

const DEFAULT_COUNT: usize = 10;

/// Fields synthesised at presentation time rather than stored in the index
pub const VIRTUAL_FIELDS: &[&str] = &["title_with_highlighting", "description_with_highlighting"];

const DEFAULT_RETURN_FIELDS: &[&str] = &[
    "description",
    "format",
    "link",
    "organisations",
    "policy_areas",
    "public_timestamp",
    "slug",
    "specialist_sectors",
    "title",
    "world_locations",
];

const DEFAULT_EXAMPLE_FIELDS: &[&str] = &["link", "title"];

/// Facet examples cost one engine query per option, so they are only open
/// on fields where that expense buys something
const ALLOWED_FACET_EXAMPLE_FIELDS: &[&str] = &[
    "document_collections",
    "document_series",
    "format",
    "organisations",
    "people",
    "policy_areas",
    "specialist_sectors",
    "world_locations",
];

/// Shared bookkeeping for reading a flat parameter map: which keys were
/// consumed, and every problem found along the way
struct ParamReader {
    params: BTreeMap<String, Vec<String>>,
    used: BTreeSet<String>,
    errors: Vec<String>,
}

impl ParamReader {
    fn new(params: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            params,
            used: BTreeSet::new(),
            errors: Vec::new(),
        }
    }

    /// A parameter that may occur at most once
    fn single_param(&mut self, name: &str, description: &str) -> Option<String> {
        self.used.insert(name.to_string());
        let values = self.params.get(name).cloned().unwrap_or_default();
        if values.len() > 1 {
            self.errors.push(format!(
                "Too many values ({}) for parameter \"{}\"{} (must occur at most once)",
                values.len(),
                name,
                description
            ));
        }
        values.into_iter().next()
    }

    /// A parameter holding a separated list; repeated occurrences are
    /// joined together
    fn character_separated_param(&mut self, name: &str, separator: char) -> Vec<String> {
        self.used.insert(name.to_string());
        self.params
            .get(name)
            .cloned()
            .unwrap_or_default()
            .iter()
            .flat_map(|value| value.split(separator))
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn parse_positive_integer(&mut self, value: &str, description: &str) -> Option<usize> {
        match value.parse::<i64>() {
            Err(_) => {
                self.errors.push(format!(
                    "Invalid value \"{}\" for {} (expected positive integer)",
                    value, description
                ));
                None
            }
            Ok(parsed) if parsed < 0 => {
                self.errors.push(format!(
                    "Invalid negative value \"{}\" for {} (expected positive integer)",
                    value, description
                ));
                None
            }
            Ok(parsed) => Some(parsed as usize),
        }
    }

    fn single_integer_param(&mut self, name: &str, default: usize, description: &str) -> usize {
        let Some(value) = self.single_param(name, description) else {
            return default;
        };
        let full_description = format!("parameter \"{}\"{}", name, description);
        self.parse_positive_integer(&value, &full_description)
            .unwrap_or(default)
    }

    /// Every matching key, with the prefix stripped, marked as consumed
    fn parameters_starting_with(&mut self, prefix: &str) -> Vec<(String, Vec<String>)> {
        let matched: Vec<(String, Vec<String>)> = self
            .params
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        matched
            .into_iter()
            .map(|(name, values)| {
                self.used.insert(name.clone());
                (name[prefix.len()..].to_string(), values)
            })
            .collect()
    }

    fn unused_params(&self) -> Vec<String> {
        self.params
            .keys()
            .filter(|key| !self.used.contains(*key))
            .cloned()
            .collect()
    }
}

/// Turns the flat key-value grammar (q, start, count, order, fields,
/// filter_*, reject_*, facet_*, debug, suggest) into a validated
/// [`SearchParams`]. All problems are accumulated and reported together;
/// unrecognised keys fail the whole request.
pub struct ParameterParser<'a> {
    definitions: &'a FieldDefinitions,
    reader: ParamReader,
}

impl<'a> ParameterParser<'a> {
    /// Parse raw key-value pairs; repeated keys accumulate into one
    /// parameter. A trailing "[]" on a key is stripped, so filter_format
    /// and filter_format[] name the same parameter.
    pub fn parse(
        raw: &[(String, String)],
        definitions: &'a FieldDefinitions,
    ) -> SearchResult<SearchParams> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in raw {
            let key = key.strip_suffix("[]").unwrap_or(key).to_string();
            grouped.entry(key).or_default().push(value.clone());
        }

        let mut parser = ParameterParser {
            definitions,
            reader: ParamReader::new(grouped),
        };
        let params = parser.process();

        let ParameterParser { reader, .. } = parser;
        if reader.errors.is_empty() {
            Ok(params)
        } else {
            Err(SearchError::Validation(reader.errors))
        }
    }

    fn process(&mut self) -> SearchParams {
        let start = self.reader.single_integer_param("start", 0, "");
        let count = self.capped_count();
        let query = normalize_query(self.reader.single_param("q", ""));
        let order = self.order();
        let return_fields = self.return_fields();
        let filters = self.filters();
        let facets = self.facets();
        let debug = self.debug_options();
        let suggest = self.suggestions();

        let unused = self.reader.unused_params();
        if !unused.is_empty() {
            self.reader
                .errors
                .push(format!("Unexpected parameters: {}", unused.join(", ")));
        }

        SearchParams {
            start,
            count,
            query,
            order,
            return_fields,
            filters,
            facets,
            debug,
            suggest,
        }
    }

    fn capped_count(&mut self) -> usize {
        let count = self.reader.single_integer_param("count", DEFAULT_COUNT, "");
        if count > MAX_RESULTS {
            self.reader.errors.push(format!(
                "Maximum result set size (as specified in 'count') is {}",
                MAX_RESULTS
            ));
            return DEFAULT_COUNT;
        }
        count
    }

    fn order(&mut self) -> Option<(String, SortDirection)> {
        let order = self.reader.single_param("order", "")?;
        let (field, direction) = match order.strip_prefix('-') {
            Some(stripped) => (stripped, SortDirection::Desc),
            None => (order.as_str(), SortDirection::Asc),
        };
        let sortable = self
            .definitions
            .get(field)
            .map(|d| d.sortable)
            .unwrap_or(false);
        if !sortable {
            self.reader
                .errors
                .push(format!("\"{}\" is not a valid sort field", field));
            return None;
        }
        Some((field.to_string(), direction))
    }

    fn return_fields(&mut self) -> Vec<String> {
        let fields = self.reader.character_separated_param("fields", ',');
        if fields.is_empty() {
            return DEFAULT_RETURN_FIELDS.iter().map(|f| f.to_string()).collect();
        }
        let (allowed, disallowed): (Vec<String>, Vec<String>) = fields
            .into_iter()
            .partition(|f| allowed_return_field(self.definitions, f));
        if !disallowed.is_empty() {
            self.reader.errors.push(format!(
                "Some requested fields are not valid return fields: {:?}",
                disallowed
            ));
        }
        allowed
    }

    fn filters(&mut self) -> Vec<FieldFilter> {
        let filter_params = self.reader.parameters_starting_with("filter_");
        let reject_params = self.reader.parameters_starting_with("reject_");

        let mut filters = Vec::new();
        for (field, values) in filter_params {
            if let Some(filter) = self.build_filter(field, values, false, "filter") {
                filters.push(filter);
            }
        }
        for (field, values) in reject_params {
            if let Some(filter) = self.build_filter(field, values, true, "reject") {
                filters.push(filter);
            }
        }
        filters
    }

    fn build_filter(
        &mut self,
        field: String,
        values: Vec<String>,
        reject: bool,
        kind: &str,
    ) -> Option<FieldFilter> {
        let Some(definition) = self.definitions.get(&field) else {
            self.reader
                .errors
                .push(format!("\"{}\" is not a valid {} field", field, kind));
            return None;
        };
        let Some(filter_type) = definition.filter_type else {
            self.reader
                .errors
                .push(format!("\"{}\" has no filter_type defined", field));
            return None;
        };

        let include_missing = values.iter().any(|v| v == MISSING_FIELD_SPECIAL_VALUE);
        let values: Vec<String> = values
            .into_iter()
            .filter(|v| v != MISSING_FIELD_SPECIAL_VALUE)
            .collect();

        let before = self.reader.errors.len();
        let parsed = match filter_type {
            FilterType::Text => FilterValues::Text(values),
            FilterType::Boolean => FilterValues::Text(self.boolean_values(&field, values)),
            FilterType::Date => FilterValues::Date(self.date_range(&field, values)),
        };
        if self.reader.errors.len() > before {
            return None;
        }

        Some(FieldFilter {
            field_name: field,
            values: parsed,
            reject,
            include_missing,
        })
    }

    fn boolean_values(&mut self, field: &str, values: Vec<String>) -> Vec<String> {
        let mut parsed = Vec::new();
        for value in values {
            if value.eq_ignore_ascii_case("true") || value == "1" {
                parsed.push("true".to_string());
            } else if value.eq_ignore_ascii_case("false") || value == "0" {
                parsed.push("false".to_string());
            } else {
                self.reader.errors.push(format!(
                    "Invalid value \"{}\" for boolean property \"{}\"",
                    value, field
                ));
            }
        }
        parsed
    }

    fn date_range(&mut self, field: &str, values: Vec<String>) -> DateRange {
        if values.len() > 1 {
            self.reader.errors.push(format!(
                "Too many values ({}) for parameter \"{}\" (must occur at most once)",
                values.len(),
                field
            ));
        }
        let mut range = DateRange::default();
        if let Some(combined) = values.first() {
            for part in combined.split(',') {
                match part.split_once(':') {
                    Some(("from", raw)) => range.from = self.parse_date("from", raw, field),
                    Some(("to", raw)) => range.to = self.parse_date("to", raw, field),
                    Some((key, _)) => self.reader.errors.push(format!(
                        "Invalid date filter parameter \"{}:\" (expected \"from:\" or \"to:\")",
                        key
                    )),
                    None => self.reader.errors.push(format!(
                        "Invalid date filter parameter \"{}:\" (expected \"from:\" or \"to:\")",
                        part
                    )),
                }
            }
        }
        range
    }

    fn parse_date(&mut self, label: &str, raw: &str, field: &str) -> Option<DateTime<Utc>> {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            // A plain date at the "to" end covers the whole day
            let (hour, minute, second) = if label == "to" { (23, 59, 59) } else { (0, 0, 0) };
            return date
                .and_hms_opt(hour, minute, second)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
        if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
            return Some(datetime.with_timezone(&Utc));
        }
        self.reader.errors.push(format!(
            "Invalid \"{}\" value \"{}\" for parameter \"{}\" (expected ISO8601 date)",
            label, raw, field
        ));
        None
    }

    fn facets(&mut self) -> BTreeMap<String, FacetParams> {
        let mut facets = BTreeMap::new();
        for (field, values) in self.reader.parameters_starting_with("facet_") {
            if values.len() > 1 {
                self.reader.errors.push(format!(
                    "Too many values ({}) for parameter \"facet_{}\" (must occur at most once)",
                    values.len(),
                    field
                ));
                continue;
            }
            if !self.valid_facet_field(&field) {
                self.reader
                    .errors
                    .push(format!("\"{}\" is not a valid facet field", field));
                continue;
            }
            let raw = values.into_iter().next().unwrap_or_default();
            let (params, errors) = FacetOptionParser::parse(&field, &raw, self.definitions);
            self.reader.errors.extend(errors);
            facets.insert(field, params);
        }
        facets
    }

    fn valid_facet_field(&self, field: &str) -> bool {
        self.definitions
            .get(field)
            .map(|d| d.filter_type == Some(FilterType::Text))
            .unwrap_or(false)
    }

    fn debug_options(&mut self) -> DebugOptions {
        let mut options = DebugOptions::default();
        for option in self.reader.character_separated_param("debug", ',') {
            match option.as_str() {
                "disable_best_bets" => options.disable_best_bets = true,
                "disable_popularity" => options.disable_popularity = true,
                "disable_synonyms" => options.disable_synonyms = true,
                "disable_boosting" => options.disable_boosting = true,
                "explain" => options.explain = true,
                "show_query" => options.show_query = true,
                other => self
                    .reader
                    .errors
                    .push(format!("Unknown debug option \"{}\"", other)),
            }
        }
        options
    }

    fn suggestions(&mut self) -> Vec<String> {
        let mut suggestions = Vec::new();
        for option in self.reader.character_separated_param("suggest", ',') {
            if option == "spelling" {
                suggestions.push(option);
            } else {
                self.reader
                    .errors
                    .push(format!("Unknown suggest option \"{}\"", option));
            }
        }
        suggestions
    }
}

/// Parses the option list of a single facet_<field> parameter: a leading
/// option count, then key:value options
struct FacetOptionParser<'a> {
    field: &'a str,
    definitions: &'a FieldDefinitions,
    reader: ParamReader,
}

impl<'a> FacetOptionParser<'a> {
    fn parse(
        field: &'a str,
        raw: &str,
        definitions: &'a FieldDefinitions,
    ) -> (FacetParams, Vec<String>) {
        let mut tokens: Vec<&str> = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split(',').collect()
        };
        let first = if tokens.is_empty() {
            String::new()
        } else {
            tokens.remove(0).to_string()
        };

        let mut parser = Self {
            field,
            definitions,
            reader: ParamReader::new(BTreeMap::new()),
        };

        let description = format!("first parameter for facet \"{}\"", field);
        let requested = parser
            .reader
            .parse_positive_integer(&first, &description)
            .unwrap_or(0);

        for token in tokens {
            match token.split_once(':') {
                Some((key, value)) => parser
                    .reader
                    .params
                    .entry(key.to_string())
                    .or_default()
                    .push(value.to_string()),
                None => parser.reader.errors.push(format!(
                    "Invalid parameter \"{}\" in facet \"{}\"; must be of form \"key:value\"",
                    token, field
                )),
            }
        }

        let scope = parser.scope();
        let order = parser.order();
        let mut examples = parser.examples();
        let example_fields = parser.example_fields();
        let example_scope = parser.example_scope();

        if examples > 0 && example_scope.is_none() {
            // Global examples scan the whole collection, which is surprising
            // enough that callers must ask for a scope explicitly
            parser.reader.errors.push(
                "example_scope parameter must be set to 'query' or 'global' when requesting examples"
                    .to_string(),
            );
            examples = 0;
        }

        let unused = parser.reader.unused_params();
        if !unused.is_empty() {
            parser.reader.errors.push(format!(
                "Unexpected options in facet \"{}\": {}",
                field,
                unused.join(", ")
            ));
        }

        (
            FacetParams {
                requested,
                scope,
                order,
                examples,
                example_fields,
                example_scope,
            },
            parser.reader.errors,
        )
    }

    fn description(&self) -> String {
        format!(" in facet \"{}\"", self.field)
    }

    fn scope(&mut self) -> FacetScope {
        let description = self.description();
        match self.reader.single_param("scope", &description).as_deref() {
            None | Some("exclude_field_filter") => FacetScope::ExcludeFieldFilter,
            Some("all_filters") => FacetScope::AllFilters,
            Some(other) => {
                self.reader.errors.push(format!(
                    "\"{}\" is not a valid scope option in facet \"{}\"",
                    other, self.field
                ));
                FacetScope::ExcludeFieldFilter
            }
        }
    }

    fn order(&mut self) -> Vec<(FacetSortKey, i32)> {
        let raw = self.reader.character_separated_param("order", ':');
        let mut orderings = Vec::new();
        for option in raw {
            let (name, direction) = match option.strip_prefix('-') {
                Some(stripped) => (stripped, -1),
                None => (option.as_str(), 1),
            };
            match FacetSortKey::parse(name) {
                Some(key) => orderings.push((key, direction)),
                None => self.reader.errors.push(format!(
                    "\"{}\" is not a valid sort option in facet \"{}\"",
                    name, self.field
                )),
            }
        }
        if orderings.is_empty() {
            default_facet_sort()
        } else {
            orderings
        }
    }

    fn examples(&mut self) -> usize {
        let description = self.description();
        let value = self.reader.single_integer_param("examples", 0, &description);
        if value != 0 && !ALLOWED_FACET_EXAMPLE_FIELDS.contains(&self.field) {
            self.reader.errors.push(format!(
                "Facet examples are not supported in facet \"{}\"",
                self.field
            ));
            return 0;
        }
        value
    }

    fn example_fields(&mut self) -> Vec<String> {
        let fields = self.reader.character_separated_param("example_fields", ':');
        if fields.is_empty() {
            return DEFAULT_EXAMPLE_FIELDS.iter().map(|f| f.to_string()).collect();
        }
        let (allowed, disallowed): (Vec<String>, Vec<String>) = fields
            .into_iter()
            .partition(|f| allowed_return_field(self.definitions, f));
        if !disallowed.is_empty() {
            self.reader.errors.push(format!(
                "Some requested fields are not valid return fields: {:?} in parameter \"example_fields\" in facet \"{}\"",
                disallowed, self.field
            ));
        }
        allowed
    }

    fn example_scope(&mut self) -> Option<ExampleScope> {
        let description = self.description();
        match self
            .reader
            .single_param("example_scope", &description)
            .as_deref()
        {
            Some("query") => Some(ExampleScope::Query),
            Some("global") => Some(ExampleScope::Global),
            _ => None,
        }
    }
}

fn allowed_return_field(definitions: &FieldDefinitions, name: &str) -> bool {
    definitions.contains(name) || VIRTUAL_FIELDS.contains(&name)
}

fn normalize_query(query: Option<String>) -> Option<String> {
    let trimmed = query?.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> SearchResult<SearchParams> {
        let raw: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let definitions = FieldDefinitions::core();
        ParameterParser::parse(&raw, &definitions)
    }

    fn errors(result: SearchResult<SearchParams>) -> Vec<String> {
        match result {
            Err(SearchError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_params_produce_defaults() {
        let params = parse(&[]).unwrap();
        assert_eq!(params.start, 0);
        assert_eq!(params.count, 10);
        assert!(params.query.is_none());
        assert!(params.order.is_none());
        assert!(params.filters.is_empty());
        assert!(params.facets.is_empty());
        assert!(params.return_fields.contains(&"title".to_string()));
        assert!(params.return_fields.contains(&"link".to_string()));
    }

    #[test]
    fn test_query_is_trimmed_and_blank_becomes_none() {
        let params = parse(&[("q", "  cheese ")]).unwrap();
        assert_eq!(params.query.as_deref(), Some("cheese"));

        let params = parse(&[("q", "   ")]).unwrap();
        assert!(params.query.is_none());
    }

    #[test]
    fn test_start_and_count() {
        let params = parse(&[("start", "5"), ("count", "20")]).unwrap();
        assert_eq!(params.start, 5);
        assert_eq!(params.count, 20);
    }

    #[test]
    fn test_count_above_the_cap_is_rejected() {
        let errors = errors(parse(&[("count", "2000")]));
        assert_eq!(
            errors,
            vec!["Maximum result set size (as specified in 'count') is 1000"]
        );
    }

    #[test]
    fn test_non_integer_and_negative_values() {
        let errors = errors(parse(&[("count", "ten"), ("start", "-1")]));
        assert!(errors.contains(
            &"Invalid value \"ten\" for parameter \"count\" (expected positive integer)"
                .to_string()
        ));
        assert!(errors.contains(
            &"Invalid negative value \"-1\" for parameter \"start\" (expected positive integer)"
                .to_string()
        ));
    }

    #[test]
    fn test_repeated_single_params_are_rejected() {
        let errors = errors(parse(&[("q", "cheese"), ("q", "wine")]));
        assert_eq!(
            errors,
            vec!["Too many values (2) for parameter \"q\" (must occur at most once)"]
        );
    }

    #[test]
    fn test_order_with_direction_prefix() {
        let params = parse(&[("order", "-public_timestamp")]).unwrap();
        assert_eq!(
            params.order,
            Some(("public_timestamp".to_string(), SortDirection::Desc))
        );

        let params = parse(&[("order", "title")]).unwrap();
        assert_eq!(params.order, Some(("title".to_string(), SortDirection::Asc)));
    }

    #[test]
    fn test_unsortable_field_is_not_a_valid_sort_field() {
        let errors = errors(parse(&[("order", "description")]));
        assert_eq!(errors, vec!["\"description\" is not a valid sort field"]);
    }

    #[test]
    fn test_explicit_return_fields() {
        let params = parse(&[("fields", "title,link")]).unwrap();
        assert_eq!(params.return_fields, vec!["title", "link"]);
    }

    #[test]
    fn test_invalid_return_fields_are_reported_together() {
        let errors = errors(parse(&[("fields", "title,beers,wines")]));
        assert_eq!(
            errors,
            vec!["Some requested fields are not valid return fields: [\"beers\", \"wines\"]"]
        );
    }

    #[test]
    fn test_virtual_fields_are_valid_return_fields() {
        let params = parse(&[("fields", "title_with_highlighting,link")]).unwrap();
        assert_eq!(
            params.return_fields,
            vec!["title_with_highlighting", "link"]
        );
    }

    #[test]
    fn test_text_filter() {
        let params = parse(&[("filter_format", "statistics")]).unwrap();
        assert_eq!(params.filters.len(), 1);
        let filter = &params.filters[0];
        assert_eq!(filter.field_name, "format");
        assert_eq!(filter.text_values(), ["statistics"]);
        assert!(!filter.reject);
        assert!(!filter.include_missing);
    }

    #[test]
    fn test_array_suffix_keys_accumulate() {
        let params = parse(&[("filter_format[]", "a"), ("filter_format[]", "b")]).unwrap();
        assert_eq!(params.filters[0].text_values(), ["a", "b"]);
    }

    #[test]
    fn test_reject_filter() {
        let params = parse(&[("reject_format", "edition")]).unwrap();
        assert!(params.filters[0].reject);
    }

    #[test]
    fn test_unknown_filter_and_reject_fields() {
        let errors = errors(parse(&[("filter_beer", "x"), ("reject_wine", "y")]));
        assert!(errors.contains(&"\"beer\" is not a valid filter field".to_string()));
        assert!(errors.contains(&"\"wine\" is not a valid reject field".to_string()));
    }

    #[test]
    fn test_field_without_filter_type_is_rejected() {
        let errors = errors(parse(&[("filter_title", "x")]));
        assert_eq!(errors, vec!["\"title\" has no filter_type defined"]);
    }

    #[test]
    fn test_missing_sentinel_sets_include_missing() {
        let params = parse(&[
            ("filter_specialist_sectors", "_MISSING"),
            ("filter_specialist_sectors", "farming"),
        ])
        .unwrap();
        let filter = &params.filters[0];
        assert!(filter.include_missing);
        assert_eq!(filter.text_values(), ["farming"]);
    }

    #[test]
    fn test_boolean_filter_values_are_normalized() {
        let params = parse(&[("filter_is_historic", "TRUE")]).unwrap();
        assert_eq!(params.filters[0].text_values(), ["true"]);

        let params = parse(&[("filter_is_historic", "0")]).unwrap();
        assert_eq!(params.filters[0].text_values(), ["false"]);
    }

    #[test]
    fn test_malformed_boolean_value_is_rejected() {
        let errors = errors(parse(&[("filter_is_historic", "maybe")]));
        assert_eq!(
            errors,
            vec!["Invalid value \"maybe\" for boolean property \"is_historic\""]
        );
    }

    #[test]
    fn test_date_filter_from_and_to() {
        let params =
            parse(&[("filter_public_timestamp", "from:2014-05-13,to:2014-06-13")]).unwrap();
        let filter = &params.filters[0];
        match &filter.values {
            FilterValues::Date(range) => {
                assert_eq!(
                    range.from,
                    Utc.with_ymd_and_hms(2014, 5, 13, 0, 0, 0).single()
                );
                // plain "to" dates run to the end of the day
                assert_eq!(
                    range.to,
                    Utc.with_ymd_and_hms(2014, 6, 13, 23, 59, 59).single()
                );
            }
            other => panic!("expected a date filter, got {:?}", other),
        }
    }

    #[test]
    fn test_date_filter_rejects_unknown_bound_names() {
        let errors = errors(parse(&[("filter_public_timestamp", "before:2014-05-13")]));
        assert_eq!(
            errors,
            vec!["Invalid date filter parameter \"before:\" (expected \"from:\" or \"to:\")"]
        );
    }

    #[test]
    fn test_date_filter_rejects_unparseable_dates() {
        let errors = errors(parse(&[("filter_public_timestamp", "from:notadate")]));
        assert_eq!(
            errors,
            vec![
                "Invalid \"from\" value \"notadate\" for parameter \"public_timestamp\" (expected ISO8601 date)"
            ]
        );
    }

    #[test]
    fn test_date_filter_rejects_repeated_values() {
        let errors = errors(parse(&[
            ("filter_public_timestamp", "from:2014-01-01"),
            ("filter_public_timestamp", "to:2014-02-01"),
        ]));
        assert_eq!(
            errors,
            vec!["Too many values (2) for parameter \"public_timestamp\" (must occur at most once)"]
        );
    }

    #[test]
    fn test_basic_facet() {
        let params = parse(&[("facet_format", "3")]).unwrap();
        let facet = &params.facets["format"];
        assert_eq!(facet.requested, 3);
        assert_eq!(facet.scope, FacetScope::ExcludeFieldFilter);
        assert_eq!(facet.order, default_facet_sort());
        assert_eq!(facet.examples, 0);
        assert_eq!(facet.example_fields, vec!["link", "title"]);
        assert!(facet.example_scope.is_none());
    }

    #[test]
    fn test_facet_with_all_options() {
        let params = parse(&[(
            "facet_organisations",
            "10,examples:5,example_scope:query,example_fields:link:title:acronym,order:-count,scope:all_filters",
        )])
        .unwrap();
        let facet = &params.facets["organisations"];
        assert_eq!(facet.requested, 10);
        assert_eq!(facet.scope, FacetScope::AllFilters);
        assert_eq!(facet.order, vec![(FacetSortKey::Count, -1)]);
        assert_eq!(facet.examples, 5);
        assert_eq!(facet.example_fields, vec!["link", "title", "acronym"]);
        assert_eq!(facet.example_scope, Some(ExampleScope::Query));
    }

    #[test]
    fn test_facet_on_unknown_or_unfacetable_field() {
        let errors = errors(parse(&[("facet_beer", "3"), ("facet_description", "3")]));
        assert!(errors.contains(&"\"beer\" is not a valid facet field".to_string()));
        assert!(errors.contains(&"\"description\" is not a valid facet field".to_string()));
    }

    #[test]
    fn test_facet_count_must_be_an_integer() {
        let errors = errors(parse(&[("facet_format", "ten")]));
        assert_eq!(
            errors,
            vec![
                "Invalid value \"ten\" for first parameter for facet \"format\" (expected positive integer)"
            ]
        );
    }

    #[test]
    fn test_facet_options_must_be_key_value() {
        let errors = errors(parse(&[("facet_format", "3,beer")]));
        assert_eq!(
            errors,
            vec!["Invalid parameter \"beer\" in facet \"format\"; must be of form \"key:value\""]
        );
    }

    #[test]
    fn test_facet_unknown_options_are_rejected() {
        let errors = errors(parse(&[("facet_format", "3,beer:x")]));
        assert_eq!(
            errors,
            vec!["Unexpected options in facet \"format\": beer"]
        );
    }

    #[test]
    fn test_facet_scope_option_is_validated() {
        let errors = errors(parse(&[("facet_format", "3,scope:everything")]));
        assert_eq!(
            errors,
            vec!["\"everything\" is not a valid scope option in facet \"format\""]
        );
    }

    #[test]
    fn test_facet_sort_option_is_validated() {
        let errors = errors(parse(&[("facet_format", "3,order:bogus")]));
        assert_eq!(
            errors,
            vec!["\"bogus\" is not a valid sort option in facet \"format\""]
        );
    }

    #[test]
    fn test_facet_examples_need_an_explicit_scope() {
        let errors = errors(parse(&[("facet_format", "3,examples:2")]));
        assert_eq!(
            errors,
            vec![
                "example_scope parameter must be set to 'query' or 'global' when requesting examples"
            ]
        );
    }

    #[test]
    fn test_facet_examples_limited_to_supported_fields() {
        let errors = errors(parse(&[(
            "facet_search_format_types",
            "2,examples:1,example_scope:global",
        )]));
        assert_eq!(
            errors,
            vec!["Facet examples are not supported in facet \"search_format_types\""]
        );
    }

    #[test]
    fn test_debug_options() {
        let params = parse(&[("debug", "disable_popularity,explain")]).unwrap();
        assert!(params.debug.disable_popularity);
        assert!(params.debug.explain);
        assert!(!params.debug.disable_best_bets);
    }

    #[test]
    fn test_unknown_debug_option_is_rejected() {
        let errors = errors(parse(&[("debug", "loud")]));
        assert_eq!(errors, vec!["Unknown debug option \"loud\""]);
    }

    #[test]
    fn test_unexpected_parameters_fail_the_request() {
        let errors = errors(parse(&[("boost", "x"), ("fuzz", "y")]));
        assert_eq!(errors, vec!["Unexpected parameters: boost, fuzz"]);
    }

    #[test]
    fn test_suggest_list() {
        let params = parse(&[("q", "cheese"), ("suggest", "spelling")]).unwrap();
        assert!(params.suggest_spelling());
    }

    #[test]
    fn test_unknown_suggest_option_is_rejected() {
        let errors = errors(parse(&[("q", "cheese"), ("suggest", "autocomplete")]));
        assert_eq!(errors, vec!["Unknown suggest option \"autocomplete\""]);
    }
}
