//! Query compiler: `SourceConfig` × `SearchContext` → wire request.
//!
//! The transformation is deterministic given an explicit `now` (the clock
//! is a parameter, never an ambient read) and pure apart from token
//! resolution, whose failures propagate to the caller without retry.
//!
//! Entity-type eligibility rules are enforced here: sorting is only emitted
//! for kinds that support server-side sort, paging and field projection are
//! withheld from curated-lookup kinds, beta-only options are withheld from
//! the stable endpoint.

use anyhow::Result;
use chrono::{DateTime, Duration, Months, SecondsFormat, Utc};

use crate::config::{SortDirection, SourceConfig};
use crate::entity::EntityType;
use crate::models::{FilterSelection, FilterTemplate, SearchContext};
use crate::request::{
    AggregationRequest, BucketDefinition, BucketRange, CollapseProperty, QueryAlterationOptions,
    ResultTemplateOptions, SearchQuery, SearchRequest, SharePointOneDriveOptions, SortProperty,
};
use crate::tokens::TokenResolver;

/// Query string used when the context supplies no free text.
pub const MATCH_ALL_QUERY: &str = "*";

/// Compile one search context into the request payload.
///
/// Token resolution runs twice (free text, then template) before assembly;
/// everything after that is pure. The caller must not invoke the compiler
/// with an empty entity-type set; the connector layer short-circuits that
/// case to an empty result instead of issuing a request.
pub async fn compile(
    config: &SourceConfig,
    context: &SearchContext,
    resolver: &dyn TokenResolver,
    now: DateTime<Utc>,
) -> Result<SearchRequest> {
    let has_free_text = context
        .input_query_text
        .as_deref()
        .is_some_and(|text| !text.trim().is_empty());

    let mut query_string = resolve_query_text(context, resolver).await?;
    let mut query_template = Some(resolver.resolve(&config.query_template).await?);

    // Lookup kinds answer from a curated list rather than a full-text
    // index: with no free text, a non-empty template substitutes for text
    // input and the template member is cleared from the request.
    let has_lookup = config.entity_types.iter().any(EntityType::is_lookup);
    if has_lookup
        && !has_free_text
        && query_template
            .as_deref()
            .is_some_and(|template| !template.trim().is_empty())
    {
        query_string = query_template.take().unwrap_or_default();
    }

    let (include_hidden_content, query_template) =
        hidden_content_settings(config, query_template);

    let only_lookup =
        config.has_entity_types() && config.entity_types.iter().all(EntityType::is_lookup);

    // Curated-lookup kinds do not page and return a fixed shape.
    let (from, size) = if only_lookup {
        (None, None)
    } else {
        (
            Some(paging_offset(context)),
            Some(u64::from(context.items_count_per_page)),
        )
    };
    let fields = if only_lookup {
        Vec::new()
    } else {
        config
            .fields
            .iter()
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect()
    };

    let beta = config.use_beta_endpoint;

    Ok(SearchRequest {
        entity_types: config.entity_types.clone(),
        query: SearchQuery {
            query_string,
            query_template: query_template.filter(|template| !template.trim().is_empty()),
        },
        from,
        size,
        fields,
        aggregations: build_aggregations(context, now),
        aggregation_filters: build_aggregation_filters(context),
        sort_properties: build_sort_properties(config, context),
        content_sources: build_content_sources(config),
        share_point_one_drive_options: include_hidden_content.then(|| SharePointOneDriveOptions {
            include_hidden_content: true,
        }),
        trim_duplicates: (beta && config.trim_duplicates).then_some(true),
        collapse_properties: if beta {
            config
                .collapse_specs
                .iter()
                .map(|spec| CollapseProperty {
                    fields: spec.fields.clone(),
                    limit: spec.limit,
                })
                .collect()
        } else {
            Vec::new()
        },
        query_alteration_options: (config.enable_suggestion || config.enable_modification).then(
            || QueryAlterationOptions {
                enable_suggestion: config.enable_suggestion,
                enable_modification: config.enable_modification,
            },
        ),
        result_template_options: config.enable_result_types.then(|| ResultTemplateOptions {
            enable_result_template: true,
        }),
        enable_top_results: config.enable_top_results.then_some(true),
    })
}

/// Resolve the free-text query, defaulting to the match-all wildcard.
async fn resolve_query_text(
    context: &SearchContext,
    resolver: &dyn TokenResolver,
) -> Result<String> {
    match context.input_query_text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => resolver.resolve(text).await,
        _ => Ok(MATCH_ALL_QUERY.to_string()),
    }
}

/// Paging offset for a 1-based page number.
pub fn paging_offset(context: &SearchContext) -> u64 {
    if context.page_number > 1 {
        u64::from(context.page_number - 1) * u64::from(context.items_count_per_page)
    } else {
        0
    }
}

/// Hidden-content decision table over the (archived, embedded) flags.
///
/// | archived | embedded | includeHidden | template mutation |
/// |----------|----------|---------------|-------------------|
/// | true     | true     | true          | none              |
/// | true     | false    | true          | ` AND isarchived:true` |
/// | false    | true     | true          | ` AND NOT isarchived:true` |
/// | false    | false    | false         | none              |
fn hidden_content_settings(
    config: &SourceConfig,
    template: Option<String>,
) -> (bool, Option<String>) {
    fn append(template: Option<String>, clause: &str) -> Option<String> {
        template.map(|t| format!("{}{}", t, clause))
    }

    match (config.show_archived_content, config.show_embedded_content) {
        (true, true) => (true, template),
        (true, false) => (true, append(template, " AND isarchived:true")),
        (false, true) => (true, append(template, " AND NOT isarchived:true")),
        (false, false) => (false, template),
    }
}

/// One aggregation descriptor per configured filter dimension.
///
/// Date-interval dimensions additionally carry seven fixed relative ranges
/// anchored to `now`.
pub fn build_aggregations(context: &SearchContext, now: DateTime<Utc>) -> Vec<AggregationRequest> {
    context
        .filters
        .iter()
        .filter(|filter| !filter.field.trim().is_empty())
        .map(|filter| AggregationRequest {
            field: filter.field.clone(),
            size: filter.max_buckets,
            bucket_definition: BucketDefinition {
                sort_by: filter.sort_by,
                is_descending: filter.sort_descending,
                minimum_count: 1,
                ranges: match filter.template {
                    FilterTemplate::DateInterval => relative_date_ranges(now),
                    FilterTemplate::List => Vec::new(),
                },
            },
        })
        .collect()
}

/// Seven contiguous half-open date intervals anchored to `now`.
///
/// Each named anchor is backed off by one minute so a boundary item never
/// lands in two buckets: a range's `to` equals the next range's `from`.
fn relative_date_ranges(now: DateTime<Utc>) -> Vec<BucketRange> {
    let backoff = Duration::minutes(1);
    let one_year = now - Months::new(12) - backoff;
    let three_months = now - Months::new(3) - backoff;
    let one_month = now - Months::new(1) - backoff;
    let one_week = now - Duration::weeks(1) - backoff;
    let one_day = now - Duration::hours(24) - backoff;
    let today = now - backoff;

    fn iso(date: DateTime<Utc>) -> Option<String> {
        Some(date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    vec![
        BucketRange {
            from: None,
            to: iso(one_year),
        },
        BucketRange {
            from: iso(one_year),
            to: iso(three_months),
        },
        BucketRange {
            from: iso(three_months),
            to: iso(one_month),
        },
        BucketRange {
            from: iso(one_month),
            to: iso(one_week),
        },
        BucketRange {
            from: iso(one_week),
            to: iso(one_day),
        },
        BucketRange {
            from: iso(one_day),
            to: iso(today),
        },
        BucketRange {
            from: iso(today),
            to: None,
        },
    ]
}

/// Translate active filter selections into provider filter expressions.
///
/// Two or more dimensions with selections collapse into one combined
/// expression joined by the context operator; a single dimension's
/// expression is emitted on its own.
pub fn build_aggregation_filters(context: &SearchContext) -> Vec<String> {
    let expressions: Vec<String> = context
        .selected_filters
        .iter()
        .filter(|selection| !selection.values.is_empty())
        .map(dimension_expression)
        .collect();

    if expressions.len() > 1 {
        vec![format!(
            "{}({})",
            context.filter_operator.as_str(),
            expressions.join(",")
        )]
    } else {
        expressions
    }
}

fn dimension_expression(selection: &FilterSelection) -> String {
    if selection.values.len() == 1 {
        format!("{}:\"{}\"", selection.field, selection.values[0])
    } else {
        let quoted: Vec<String> = selection
            .values
            .iter()
            .map(|value| format!("\"{}\"", value))
            .collect();
        format!(
            "{}:{}({})",
            selection.field,
            selection.operator.as_str(),
            quoted.join(",")
        )
    }
}

/// Content-source scope paths; meaningful for externalItem only.
pub fn build_content_sources(config: &SourceConfig) -> Vec<String> {
    if !config.entity_types.contains(&EntityType::ExternalItem) {
        return Vec::new();
    }
    config
        .content_source_connection_ids
        .iter()
        .filter(|id| !id.trim().is_empty())
        .map(|id| format!("/external/connections/{}", id))
        .collect()
}

/// Sort properties, gated on kinds that support server-side sort.
///
/// An explicit user selection wins as the single property; otherwise every
/// default-flagged spec is emitted in declared order.
pub fn build_sort_properties(config: &SourceConfig, context: &SearchContext) -> Vec<SortProperty> {
    if !config.entity_types.iter().any(EntityType::supports_sort) {
        return Vec::new();
    }

    if let Some(sort) = &context.sort {
        return vec![SortProperty {
            name: sort.field.clone(),
            is_descending: sort.descending,
        }];
    }

    config
        .sort_fields
        .iter()
        .filter(|spec| spec.is_default_sort)
        .map(|spec| SortProperty {
            name: spec.field.clone(),
            is_descending: spec.direction == SortDirection::Descending,
        })
        .collect()
}
