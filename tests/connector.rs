//! End-to-end connector tests against a stub transport.
//!
//! These drive the full pipeline (context, compiled request, canned
//! reply, normalized results) and assert on both sides of the wire.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use searchwire::config::{CollapseSpec, SourceConfig};
use searchwire::connector::SearchConnector;
use searchwire::entity::EntityType;
use searchwire::models::SearchContext;
use searchwire::request::SearchRequestBody;
use searchwire::response::SearchResponse;
use searchwire::transport::{RequestHeaders, SearchTransport, BETA_ENDPOINT, STABLE_ENDPOINT};

/// Records every post and answers with a canned reply.
struct StubTransport {
    reply: Value,
    captured: Mutex<Vec<CapturedPost>>,
}

struct CapturedPost {
    endpoint: String,
    body: Value,
    locale: Option<String>,
}

impl StubTransport {
    fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            captured: Mutex::new(Vec::new()),
        })
    }

    fn single_request(&self) -> Value {
        let captured = self.captured.lock().unwrap();
        assert_eq!(captured.len(), 1, "expected exactly one post");
        captured[0].body["requests"][0].clone()
    }
}

#[async_trait]
impl SearchTransport for StubTransport {
    async fn post(
        &self,
        endpoint: &str,
        body: &SearchRequestBody,
        headers: &RequestHeaders,
    ) -> Result<SearchResponse> {
        self.captured.lock().unwrap().push(CapturedPost {
            endpoint: endpoint.to_string(),
            body: serde_json::to_value(body)?,
            locale: headers.locale.clone(),
        });
        Ok(serde_json::from_value(self.reply.clone())?)
    }
}

fn drive_item_reply() -> Value {
    json!({
        "value": [{
            "hitsContainers": [{
                "hits": [{
                    "hitId": "hit-1",
                    "rank": 1,
                    "summary": "Quarterly <c0>report</c0> draft",
                    "resource": {
                        "@odata.type": "#microsoft.graph.driveItem",
                        "webUrl": "https://contoso.sharepoint.com/sites/hr/docs/q1.docx",
                        "createdBy": {"user": {
                            "email": "megan@contoso.example",
                            "displayName": "Megan Bowen",
                            "id": "oid-1"
                        }},
                        "listItem": {"fields": {
                            "title": "Q1 report",
                            "filetype": "docx",
                            "path": "https://contoso.sharepoint.com/sites/hr/docs/q1.docx",
                            "listItemId": "41f060c4-0000-1111-2222-333344445555",
                            "siteId": "contoso.sharepoint.com,5a58bb09,9f2e1b00",
                            "listId": "f9d8c7b6",
                            "driveId": "b!drive"
                        }}
                    }
                }],
                "total": 124,
                "moreResultsAvailable": true,
                "aggregations": [{
                    "field": "filetype",
                    "buckets": [
                        {"key": "docx", "count": 90, "aggregationFilterToken": "\"docx\""},
                        {"key": "pdf", "count": 34, "aggregationFilterToken": "\"pdf\""}
                    ]
                }]
            }]
        }]
    })
}

fn drive_item_config() -> SourceConfig {
    SourceConfig {
        entity_types: vec![EntityType::DriveItem],
        fields: vec!["title".to_string(), "path".to_string(), "filetype".to_string()],
        ..SourceConfig::default()
    }
}

#[tokio::test]
async fn test_end_to_end_drive_item_scenario() {
    let transport = StubTransport::new(drive_item_reply());
    let connector = SearchConnector::new(drive_item_config(), transport.clone());

    let context = SearchContext {
        input_query_text: Some("report".to_string()),
        page_number: 1,
        items_count_per_page: 10,
        ..SearchContext::default()
    };
    let results = connector.execute(&context).await.unwrap();

    // Request side of the wire.
    {
        let captured = transport.captured.lock().unwrap();
        assert_eq!(captured[0].endpoint, STABLE_ENDPOINT);
    }
    let request = transport.single_request();
    assert_eq!(request["entityTypes"], json!(["driveItem"]));
    assert_eq!(request["query"]["queryString"], "report");
    assert_eq!(request["from"], 0);
    assert_eq!(request["size"], 10);
    assert_eq!(request["fields"], json!(["title", "path", "filetype"]));
    assert!(request.get("trimDuplicates").is_none());
    assert!(request.get("collapseProperties").is_none());

    // Response side: flattened item with computed enrichment.
    assert_eq!(results.total_count, 124);
    assert_eq!(results.items.len(), 1);
    let item = &results.items[0];
    assert_eq!(item.entity_type, Some(EntityType::DriveItem));
    assert_eq!(item.get_str("title"), Some("Q1 report"));
    assert_eq!(item.get_str("FileType"), Some("docx"));
    assert_eq!(
        item.get_str("AuthorOWSUSER"),
        Some("megan@contoso.example | Megan Bowen | oid-1 | megan@contoso.example")
    );
    assert_eq!(
        item.get_str("previewUrl"),
        Some("https://contoso.sharepoint.com/sites/hr/_layouts/15/Doc.aspx?sourcedoc={41f060c4-0000-1111-2222-333344445555}&action=view")
    );
    let thumbnail = item.get_str("previewImageUrl").unwrap();
    assert!(thumbnail.starts_with("https://contoso.sharepoint.com/_api/v2.1/sites/5a58bb09/"));

    // Facets extracted 1:1, order preserved.
    assert_eq!(results.filters.len(), 1);
    assert_eq!(results.filters[0].values[0].name, "docx");
    assert_eq!(results.filters[0].values[0].count, 90);
    assert_eq!(results.filters[0].values[1].name, "pdf");
}

#[tokio::test]
async fn test_beta_options_reach_the_wire_on_beta_endpoint() {
    let transport = StubTransport::new(json!({"value": []}));
    let config = SourceConfig {
        use_beta_endpoint: true,
        trim_duplicates: true,
        collapse_specs: vec![CollapseSpec {
            fields: vec!["title".to_string()],
            limit: 2,
        }],
        ..drive_item_config()
    };
    let connector = SearchConnector::new(config, transport.clone());

    connector
        .execute(&SearchContext::with_query("report"))
        .await
        .unwrap();

    {
        let captured = transport.captured.lock().unwrap();
        assert_eq!(captured[0].endpoint, BETA_ENDPOINT);
    }
    let request = transport.single_request();
    assert_eq!(request["trimDuplicates"], true);
    assert_eq!(request["collapseProperties"][0]["fields"], json!(["title"]));
    assert_eq!(request["collapseProperties"][0]["limit"], 2);
}

#[tokio::test]
async fn test_paging_offset_reaches_the_wire() {
    let transport = StubTransport::new(json!({"value": []}));
    let connector = SearchConnector::new(drive_item_config(), transport.clone());

    let context = SearchContext {
        input_query_text: Some("report".to_string()),
        page_number: 3,
        items_count_per_page: 20,
        ..SearchContext::default()
    };
    connector.execute(&context).await.unwrap();

    let request = transport.single_request();
    assert_eq!(request["from"], 40);
    assert_eq!(request["size"], 20);
}

#[tokio::test]
async fn test_locale_header_passed_through() {
    let transport = StubTransport::new(json!({"value": []}));
    let connector = SearchConnector::new(drive_item_config(), transport.clone())
        .with_locale(Some("fr-fr".to_string()));

    connector
        .execute(&SearchContext::with_query("rapport"))
        .await
        .unwrap();

    let captured = transport.captured.lock().unwrap();
    assert_eq!(captured[0].locale.as_deref(), Some("fr-fr"));
}

#[tokio::test]
async fn test_lookup_types_request_shape() {
    let transport = StubTransport::new(json!({"value": []}));
    let config = SourceConfig {
        entity_types: vec![EntityType::Bookmark, EntityType::Acronym],
        ..SourceConfig::default()
    };
    let connector = SearchConnector::new(config, transport.clone());

    connector
        .execute(&SearchContext::with_query("vpn"))
        .await
        .unwrap();

    let request = transport.single_request();
    assert_eq!(request["entityTypes"], json!(["bookmark", "acronym"]));
    assert!(request.get("from").is_none());
    assert!(request.get("size").is_none());
    assert!(request.get("fields").is_none());
}

#[tokio::test]
async fn test_multiple_result_sets_accumulate() {
    let reply = json!({
        "value": [
            {"hitsContainers": [{"hits": [], "total": 10}]},
            {"hitsContainers": [{"hits": [], "total": 5}]}
        ]
    });
    let transport = StubTransport::new(reply);
    let connector = SearchConnector::new(drive_item_config(), transport);

    let results = connector
        .execute(&SearchContext::with_query("report"))
        .await
        .unwrap();
    assert_eq!(results.total_count, 15);
}
