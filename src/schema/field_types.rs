use std::collections::BTreeMap;

/// How a field may be used in filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Text,
    Date,
    Boolean,
}

/// A coded value a field may take, expanded to its label on presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedValue {
    pub label: String,
    pub value: String,
}

impl AllowedValue {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Declared metadata for a single document field
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub filter_type: Option<FilterType>,
    pub multivalued: bool,
    pub sortable: bool,
    /// Empty means the field takes free values
    pub allowed_values: Vec<AllowedValue>,
}

impl FieldDefinition {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filter_type: None,
            multivalued: false,
            sortable: false,
            allowed_values: Vec::new(),
        }
    }

    fn filter(mut self, filter_type: FilterType) -> Self {
        self.filter_type = Some(filter_type);
        self
    }

    fn multivalued(mut self) -> Self {
        self.multivalued = true;
        self
    }

    fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn allowed(mut self, values: Vec<AllowedValue>) -> Self {
        self.allowed_values = values;
        self
    }
}

/// The declared field set for an index. Every filter, sort, facet and return
/// field a query names must exist here, checked before anything reaches the
/// engine.
#[derive(Debug, Clone)]
pub struct FieldDefinitions {
    fields: BTreeMap<String, FieldDefinition>,
}

impl FieldDefinitions {
    pub fn new(definitions: Vec<FieldDefinition>) -> Self {
        let fields = definitions
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Self { fields }
    }

    /// The standard content schema
    pub fn core() -> Self {
        use FilterType::*;

        Self::new(vec![
            FieldDefinition::new("link").filter(Text),
            FieldDefinition::new("title").sortable(),
            FieldDefinition::new("description"),
            FieldDefinition::new("indexable_content"),
            FieldDefinition::new("format").filter(Text),
            FieldDefinition::new("document_type").filter(Text),
            FieldDefinition::new("content_id").filter(Text),
            FieldDefinition::new("slug").filter(Text),
            FieldDefinition::new("acronym"),
            FieldDefinition::new("organisations").filter(Text).multivalued(),
            FieldDefinition::new("organisation_state").filter(Text).allowed(vec![
                AllowedValue::new("Open", "open"),
                AllowedValue::new("Closed", "closed"),
                AllowedValue::new("Devolved", "devolved"),
            ]),
            FieldDefinition::new("organisation_type"),
            FieldDefinition::new("specialist_sectors").filter(Text).multivalued(),
            FieldDefinition::new("policy_areas").filter(Text).multivalued(),
            FieldDefinition::new("document_series").filter(Text).multivalued(),
            FieldDefinition::new("document_collections").filter(Text).multivalued(),
            FieldDefinition::new("world_locations").filter(Text).multivalued(),
            FieldDefinition::new("people").filter(Text).multivalued(),
            FieldDefinition::new("roles").filter(Text).multivalued(),
            FieldDefinition::new("search_format_types").filter(Text).multivalued(),
            FieldDefinition::new("public_timestamp").filter(Date).sortable(),
            FieldDefinition::new("updated_at").filter(Date),
            FieldDefinition::new("popularity").sortable(),
            FieldDefinition::new("is_historic").filter(Boolean),
            FieldDefinition::new("spelling_text"),
        ])
    }

    /// The field set for the best-bet index
    pub fn metasearch() -> Self {
        Self::new(vec![
            FieldDefinition::new("exact_query"),
            FieldDefinition::new("stemmed_query"),
            FieldDefinition::new("stemmed_query_as_term"),
            FieldDefinition::new("details"),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn is_multivalued(&self, name: &str) -> bool {
        self.get(name).map(|d| d.multivalued).unwrap_or(false)
    }

    /// Fields that may appear in filter_/reject_/facet_ parameters
    pub fn filterable_names(&self) -> Vec<&str> {
        self.fields
            .values()
            .filter(|d| d.filter_type.is_some())
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Fields that may appear in the order parameter
    pub fn sortable_names(&self) -> Vec<&str> {
        self.fields
            .values()
            .filter(|d| d.sortable)
            .map(|d| d.name.as_str())
            .collect()
    }
}
