//! Result normalizer: wire reply → flat, display-ready items.
//!
//! Hit shapes legitimately vary by entity type: external items nest a
//! "properties" map, SharePoint-backed items nest a "fields" map, people
//! and messages are flat at the resource root. Flattening copies whichever
//! container applies to the top level, then merges list-item metadata over
//! drive metadata, then synthesizes the author and file-type aliases.
//!
//! Every derivation is additive and total: missing nested paths mean the
//! computed field is absent, never a default guess and never an error.

use anyhow::Result;
use serde_json::Value;

use crate::config::SourceConfig;
use crate::entity::EntityType;
use crate::models::{
    FilterComparison, FilterResult, FilterResultValue, NormalizedItem, SearchResults, SlotMapping,
};
use crate::preview::{self, TrustedDomains};
use crate::response::{AggregationResult, SearchHit, SearchResponse};

/// Normalize a full reply into items, facets and a total count.
///
/// The count accumulates across every hit container in every result set;
/// query-alteration suggestions and result-template metadata are passed
/// through from whichever result set carries them.
pub fn normalize_response(
    response: &SearchResponse,
    slots: &SlotMapping,
    config: &SourceConfig,
) -> Result<SearchResults> {
    let trusted = TrustedDomains::new(&config.trusted_thumbnail_domains)?;
    let mut results = SearchResults::default();

    for result_set in &response.value {
        for container in &result_set.hits_containers {
            results.total_count += container.total;
            for hit in &container.hits {
                results.items.push(normalize_hit(hit, slots, config, &trusted));
            }
            results
                .filters
                .extend(extract_filters(&container.aggregations));
        }
        if results.query_alteration.is_none() {
            results.query_alteration = result_set.query_alteration_response.clone();
        }
        if results.result_templates.is_none() {
            results.result_templates = result_set.result_templates.clone();
        }
    }

    Ok(results)
}

/// Flatten one hit and run the enrichment chain.
pub fn normalize_hit(
    hit: &SearchHit,
    slots: &SlotMapping,
    config: &SourceConfig,
    trusted: &TrustedDomains,
) -> NormalizedItem {
    let mut item = NormalizedItem::default();

    if let Some(hit_id) = &hit.hit_id {
        item.fields
            .insert("hitId".to_string(), Value::String(hit_id.clone()));
    }
    if let Some(rank) = hit.rank {
        item.fields.insert("rank".to_string(), Value::from(rank));
    }
    if let Some(summary) = &hit.summary {
        item.fields
            .insert("summary".to_string(), Value::String(summary.clone()));
    }
    if let Some(content_source) = &hit.content_source {
        item.fields.insert(
            "contentSource".to_string(),
            Value::String(content_source.clone()),
        );
    }

    item.entity_type = hit
        .resource
        .get("@odata.type")
        .and_then(Value::as_str)
        .and_then(EntityType::from_odata_type);

    flatten_resource(&mut item, &hit.resource);
    merge_list_item_fields(&mut item, &hit.resource);
    derive_author_alias(&mut item, &hit.resource);
    derive_file_type_alias(&mut item);

    // Type-specific enrichment requires a classification; an indeterminate
    // hit keeps its flattened fields and nothing else.
    if let Some(entity) = item.entity_type {
        if SlotMapping::is_auto(&slots.preview_url) {
            if let Some(url) = preview::resolve_preview_url(entity, &item, slots) {
                item.set_if_absent("previewUrl", Value::String(url));
            }
        }
        if SlotMapping::is_auto(&slots.preview_image_url) {
            if let Some(url) = preview::resolve_preview_image_url(
                entity,
                &item,
                slots,
                &config.thumbnail_file_types,
                trusted,
            ) {
                item.set_if_absent("previewImageUrl", Value::String(url));
            }
        }
    }

    item
}

/// Copy the hit's entity data to the top level.
///
/// A "properties" container takes precedence, then a "fields" container;
/// with neither, the resource root itself is the flat shape and its keys
/// are copied minus the type discriminator and anything already present.
fn flatten_resource(item: &mut NormalizedItem, resource: &Value) {
    if let Some(properties) = resource.get("properties").and_then(Value::as_object) {
        for (key, value) in properties {
            item.fields.insert(key.clone(), value.clone());
        }
        return;
    }

    if let Some(fields) = resource.get("fields").and_then(Value::as_object) {
        for (key, value) in fields {
            item.fields.insert(key.clone(), value.clone());
        }
        return;
    }

    if let Some(root) = resource.as_object() {
        for (key, value) in root {
            if key == "@odata.type" {
                continue;
            }
            item.set_if_absent(key, value.clone());
        }
    }
}

/// Drive items often embed list-item metadata; it wins on key collision.
fn merge_list_item_fields(item: &mut NormalizedItem, resource: &Value) {
    if let Some(fields) = resource
        .pointer("/listItem/fields")
        .and_then(Value::as_object)
    {
        for (key, value) in fields {
            item.fields.insert(key.clone(), value.clone());
        }
    }
}

/// Author alias: `email | displayName | objectId | principalName`.
///
/// Sourced with fallback chains (creator, else message sender) and omitted
/// entirely when no component resolves. Missing nested paths are absent,
/// not errors.
fn derive_author_alias(item: &mut NormalizedItem, resource: &Value) {
    let email = string_at(resource, "/createdBy/user/email")
        .or_else(|| string_at(resource, "/from/emailAddress/address"));
    let display_name = string_at(resource, "/createdBy/user/displayName")
        .or_else(|| string_at(resource, "/from/emailAddress/name"));
    let object_id = string_at(resource, "/createdBy/user/id");
    let principal_name = item
        .get_str("userPrincipalName")
        .filter(|upn| !upn.trim().is_empty())
        .map(str::to_string)
        .or_else(|| email.clone());

    if email.is_none() && display_name.is_none() && object_id.is_none() && principal_name.is_none()
    {
        return;
    }

    let alias = format!(
        "{} | {} | {} | {}",
        email.unwrap_or_default(),
        display_name.unwrap_or_default(),
        object_id.unwrap_or_default(),
        principal_name.unwrap_or_default()
    );
    item.set_if_absent("AuthorOWSUSER", Value::String(alias));
}

/// Bridge to the capitalized naming convention, only when the lowercase
/// field exists.
fn derive_file_type_alias(item: &mut NormalizedItem) {
    if let Some(file_type) = item.fields.get("filetype").cloned() {
        item.set_if_absent("FileType", file_type);
    }
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Map provider aggregations 1:1 into provider-neutral filter results,
/// bucket order preserved.
fn extract_filters(aggregations: &[AggregationResult]) -> Vec<FilterResult> {
    aggregations
        .iter()
        .map(|aggregation| FilterResult {
            filter_name: aggregation.field.clone(),
            values: aggregation
                .buckets
                .iter()
                .map(|bucket| FilterResultValue {
                    name: bucket.key.clone(),
                    value: bucket
                        .aggregation_filter_token
                        .clone()
                        .unwrap_or_else(|| bucket.key.clone()),
                    count: bucket.count,
                    operator: FilterComparison::Contains,
                })
                .collect(),
        })
        .collect()
}
