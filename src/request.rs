//! Wire shape of the compiled request.
//!
//! Field names here are a hard compatibility surface: they must match the
//! remote service's documented contract exactly, so every struct serializes
//! camelCase and omits optional members rather than sending nulls. Produced
//! once per [`crate::models::SearchContext`] and immutable after
//! construction.

use serde::Serialize;

use crate::entity::EntityType;
use crate::models::BucketSort;

/// Envelope posted to the search endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequestBody {
    pub requests: Vec<SearchRequest>,
}

impl SearchRequestBody {
    pub fn single(request: SearchRequest) -> Self {
        Self {
            requests: vec![request],
        }
    }
}

/// One compiled search request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub entity_types: Vec<EntityType>,
    pub query: SearchQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationRequest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aggregation_filters: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort_properties: Vec<SortProperty>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_point_one_drive_options: Option<SharePointOneDriveOptions>,
    /// Beta endpoint only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_duplicates: Option<bool>,
    /// Beta endpoint only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collapse_properties: Vec<CollapseProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_alteration_options: Option<QueryAlterationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_template_options: Option<ResultTemplateOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_top_results: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_template: Option<String>,
}

/// One facet the service should aggregate server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    pub field: String,
    pub size: u32,
    pub bucket_definition: BucketDefinition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketDefinition {
    pub sort_by: BucketSort,
    pub is_descending: bool,
    pub minimum_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<BucketRange>,
}

/// Half-open date interval boundary pair. An open end is omitted, not null.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortProperty {
    pub name: String,
    pub is_descending: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePointOneDriveOptions {
    pub include_hidden_content: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollapseProperty {
    pub fields: Vec<String>,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAlterationOptions {
    pub enable_suggestion: bool,
    pub enable_modification: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTemplateOptions {
    pub enable_result_template: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_members_omitted() {
        let request = SearchRequest {
            entity_types: vec![EntityType::DriveItem],
            query: SearchQuery {
                query_string: "report".to_string(),
                query_template: None,
            },
            from: Some(0),
            size: Some(10),
            ..Default::default()
        };
        let json = serde_json::to_value(SearchRequestBody::single(request)).unwrap();
        let compiled = &json["requests"][0];

        assert_eq!(compiled["entityTypes"], serde_json::json!(["driveItem"]));
        assert_eq!(compiled["query"]["queryString"], "report");
        assert_eq!(compiled["from"], 0);
        assert_eq!(compiled["size"], 10);
        // Empty and absent members must not appear on the wire at all.
        assert!(compiled.get("queryTemplate").is_none());
        assert!(compiled.get("aggregations").is_none());
        assert!(compiled.get("trimDuplicates").is_none());
        assert!(compiled.get("sharePointOneDriveOptions").is_none());
    }

    #[test]
    fn test_contract_field_names() {
        let request = SearchRequest {
            entity_types: vec![EntityType::ListItem],
            query: SearchQuery {
                query_string: "*".to_string(),
                query_template: Some("{searchTerms}".to_string()),
            },
            aggregations: vec![AggregationRequest {
                field: "filetype".to_string(),
                size: 10,
                bucket_definition: BucketDefinition {
                    sort_by: BucketSort::Count,
                    is_descending: true,
                    minimum_count: 1,
                    ranges: Vec::new(),
                },
            }],
            sort_properties: vec![SortProperty {
                name: "created".to_string(),
                is_descending: false,
            }],
            share_point_one_drive_options: Some(SharePointOneDriveOptions {
                include_hidden_content: true,
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["query"]["queryTemplate"], "{searchTerms}");
        let aggregation = &json["aggregations"][0];
        assert_eq!(aggregation["bucketDefinition"]["sortBy"], "count");
        assert_eq!(aggregation["bucketDefinition"]["isDescending"], true);
        assert_eq!(aggregation["bucketDefinition"]["minimumCount"], 1);
        assert_eq!(json["sortProperties"][0]["isDescending"], false);
        assert_eq!(
            json["sharePointOneDriveOptions"]["includeHiddenContent"],
            true
        );
    }
}
