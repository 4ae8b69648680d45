//! Core value types that flow through the connector.
//!
//! A [`SearchContext`] describes one query invocation (free text, paging,
//! filters, sort). The compiler turns it into a wire request, and the
//! normalizer turns the wire reply into [`SearchResults`]: flat
//! [`NormalizedItem`]s plus provider-neutral [`FilterResult`] facets.
//!
//! All of these are transient, single-invocation values with no shared
//! mutable state across invocations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::EntityType;

/// Reserved sentinel for a display slot the normalizer should compute itself.
///
/// Only when a slot's mapped field equals this value does the normalizer
/// calculate it; any other mapping means the caller's own field wins and the
/// item is left untouched.
pub const AUTO_SLOT: &str = "auto";

/// Boolean operator joining filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::And => "and",
            FilterOperator::Or => "or",
        }
    }
}

/// How the service should order aggregation buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketSort {
    #[default]
    Count,
    KeyAsString,
}

/// Rendering template of a filter dimension. Date-interval filters get
/// precomputed relative date ranges attached to their aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterTemplate {
    #[default]
    List,
    DateInterval,
}

/// One facet dimension the caller wants aggregated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Field the aggregation runs over.
    pub field: String,
    pub template: FilterTemplate,
    /// Bucket size cap sent to the service.
    pub max_buckets: u32,
    pub sort_by: BucketSort,
    pub sort_descending: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            field: String::new(),
            template: FilterTemplate::List,
            max_buckets: 10,
            sort_by: BucketSort::Count,
            sort_descending: true,
        }
    }
}

/// Values the user selected on one filter dimension. `values` carries the
/// opaque filter tokens the service handed out with its buckets.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub field: String,
    pub values: Vec<String>,
    /// Operator joining this dimension's own values.
    pub operator: FilterOperator,
}

/// An explicit user sort selection. When present it wins over every
/// default-flagged sort spec.
#[derive(Debug, Clone)]
pub struct SortSelection {
    pub field: String,
    pub descending: bool,
}

/// One query invocation's input.
///
/// Constructed per invocation and discarded after the request is compiled.
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// Free-text query; may contain unresolved placeholder tokens.
    pub input_query_text: Option<String>,
    /// 1-based page number.
    pub page_number: u32,
    pub items_count_per_page: u32,
    /// Facet dimensions to aggregate.
    pub filters: Vec<FilterConfig>,
    /// Active selections, one entry per dimension with chosen values.
    pub selected_filters: Vec<FilterSelection>,
    /// Operator joining expressions across dimensions.
    pub filter_operator: FilterOperator,
    pub sort: Option<SortSelection>,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            input_query_text: None,
            page_number: 1,
            items_count_per_page: 10,
            filters: Vec::new(),
            selected_filters: Vec::new(),
            filter_operator: FilterOperator::And,
            sort: None,
        }
    }
}

impl SearchContext {
    pub fn with_query(text: impl Into<String>) -> Self {
        Self {
            input_query_text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Maps logical display slots to concrete field names.
///
/// The caller decides which of its configured fields plays each role. The
/// preview slots default to the [`AUTO_SLOT`] sentinel so the normalizer
/// computes them; the id slots default to the flat field names the service
/// produces.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlotMapping {
    pub title: String,
    pub path: String,
    pub preview_url: String,
    pub preview_image_url: String,
    pub site_id: String,
    pub web_id: String,
    pub list_id: String,
    pub item_id: String,
    pub drive_id: String,
    pub is_folder: String,
    pub content_class: String,
}

impl Default for SlotMapping {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            path: "path".to_string(),
            preview_url: AUTO_SLOT.to_string(),
            preview_image_url: AUTO_SLOT.to_string(),
            site_id: "siteId".to_string(),
            web_id: "webId".to_string(),
            list_id: "listId".to_string(),
            item_id: "listItemId".to_string(),
            drive_id: "driveId".to_string(),
            is_folder: "isFolder".to_string(),
            content_class: "contentClass".to_string(),
        }
    }
}

impl SlotMapping {
    /// Whether a slot mapping asks the normalizer to compute the value.
    pub fn is_auto(mapped_field: &str) -> bool {
        mapped_field == AUTO_SLOT
    }
}

/// One flattened, display-ready result.
///
/// `fields` merges the hit's entity data to a single level; computed fields
/// are additive and never overwrite an existing field unless they are an
/// explicit alias target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedItem {
    /// Classified kind, when the hit carried a recognizable discriminator.
    #[serde(rename = "entityType", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NormalizedItem {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Insert only when the key is not already present.
    pub fn set_if_absent(&mut self, key: &str, value: Value) {
        if !self.fields.contains_key(key) {
            self.fields.insert(key.to_string(), value);
        }
    }
}

/// Comparison semantics attached to every extracted facet value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterComparison {
    Contains,
}

/// One facet value as returned by the service: display key, count, and the
/// opaque token to send back when the user selects it.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResultValue {
    pub name: String,
    pub value: String,
    pub count: u64,
    pub operator: FilterComparison,
}

/// One facet's extracted buckets, in the exact order the service returned
/// them. No client-side re-sorting.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub filter_name: String,
    pub values: Vec<FilterResultValue>,
}

/// The normalized outcome of one invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub items: Vec<NormalizedItem>,
    pub filters: Vec<FilterResult>,
    /// Accumulated across every hit container in every result set.
    pub total_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_alteration: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_templates: Option<Value>,
}
