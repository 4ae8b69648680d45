//! Wire shape of the raw reply.
//!
//! A reply may carry several logical result sets (e.g. multiple entity-type
//! groups answered together); each set has hit containers with hits, a
//! total, and optional aggregation buckets. The hit `resource` is left as
//! dynamic JSON because its shape legitimately varies by entity type; the
//! normalizer is responsible for flattening it.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub value: Vec<SearchResultSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultSet {
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default)]
    pub hits_containers: Vec<HitContainer>,
    #[serde(default)]
    pub query_alteration_response: Option<Value>,
    #[serde(default)]
    pub result_templates: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitContainer {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub more_results_available: bool,
    #[serde(default)]
    pub aggregations: Vec<AggregationResult>,
}

/// One raw result record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(default)]
    pub hit_id: Option<String>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content_source: Option<String>,
    #[serde(default)]
    pub resource: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregationResult {
    pub field: String,
    #[serde(default)]
    pub buckets: Vec<AggregationBucket>,
}

/// One (value, count) pair within an aggregation, with the opaque token the
/// service wants echoed back when the value is selected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationBucket {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub aggregation_filter_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let response: SearchResponse = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(response.value.is_empty());
    }

    #[test]
    fn test_deserialize_full_container() {
        let raw = r##"
        {
          "value": [
            {
              "searchTerms": ["report"],
              "hitsContainers": [
                {
                  "hits": [
                    {
                      "hitId": "abc",
                      "rank": 1,
                      "summary": "Quarterly <c0>report</c0>",
                      "resource": {"@odata.type": "#microsoft.graph.driveItem", "name": "q1.docx"}
                    }
                  ],
                  "total": 124,
                  "moreResultsAvailable": true,
                  "aggregations": [
                    {
                      "field": "filetype",
                      "buckets": [
                        {"key": "docx", "count": 90, "aggregationFilterToken": "\"docx\""}
                      ]
                    }
                  ]
                }
              ]
            }
          ]
        }"##;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let container = &response.value[0].hits_containers[0];
        assert_eq!(container.total, 124);
        assert!(container.more_results_available);
        assert_eq!(container.hits[0].hit_id.as_deref(), Some("abc"));
        assert_eq!(
            container.hits[0].resource["@odata.type"],
            "#microsoft.graph.driveItem"
        );
        assert_eq!(container.aggregations[0].buckets[0].count, 90);
    }

    #[test]
    fn test_unknown_members_tolerated() {
        // The service may add members; deserialization must not reject them.
        let raw = r#"{"value": [{"hitsContainers": [{"hits": [], "total": 0, "futureMember": 1}]}], "@odata.context": "ctx"}"#;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.value[0].hits_containers[0].total, 0);
    }
}
