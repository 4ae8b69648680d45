use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::entity::EntityType;
use crate::models::{FilterConfig, SlotMapping};

/// Persisted connector configuration. Owned by the configuration layer and
/// read-only to the core; fully populated at deserialization time.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub entity_types: Vec<EntityType>,
    pub fields: Vec<String>,
    pub sort_fields: Vec<SortFieldSpec>,
    pub enable_top_results: bool,
    pub content_source_connection_ids: Vec<String>,
    pub enable_suggestion: bool,
    pub enable_modification: bool,
    pub query_template: String,
    pub use_beta_endpoint: bool,
    pub enable_result_types: bool,
    pub trim_duplicates: bool,
    pub collapse_specs: Vec<CollapseSpec>,
    pub show_archived_content: bool,
    pub show_embedded_content: bool,
    pub trusted_thumbnail_domains: Vec<String>,
    pub thumbnail_file_types: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            entity_types: Vec::new(),
            fields: default_fields(),
            sort_fields: Vec::new(),
            enable_top_results: false,
            content_source_connection_ids: Vec::new(),
            enable_suggestion: false,
            enable_modification: false,
            query_template: default_query_template(),
            use_beta_endpoint: false,
            enable_result_types: false,
            trim_duplicates: false,
            collapse_specs: Vec::new(),
            show_archived_content: false,
            show_embedded_content: false,
            trusted_thumbnail_domains: default_trusted_domains(),
            thumbnail_file_types: default_thumbnail_file_types(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One sortable field, admin- or user-defined.
#[derive(Debug, Deserialize, Clone)]
pub struct SortFieldSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
    /// Default-flagged specs supply the request's implicit sort when no
    /// explicit user sort is active.
    #[serde(default)]
    pub is_default_sort: bool,
    #[serde(default)]
    pub is_user_sortable: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Result collapse rule. Only serialized when the beta endpoint is selected.
#[derive(Debug, Deserialize, Clone)]
pub struct CollapseSpec {
    pub fields: Vec<String>,
    #[serde(default = "default_collapse_limit")]
    pub limit: u32,
}

fn default_collapse_limit() -> u32 {
    1
}

fn default_query_template() -> String {
    "{searchTerms}".to_string()
}

fn default_fields() -> Vec<String> {
    [
        "title",
        "name",
        "summary",
        "created",
        "createdBy",
        "lastModifiedDateTime",
        "webUrl",
        "filetype",
        "siteId",
        "webId",
        "listId",
        "listItemId",
        "driveId",
        "path",
        "contentClass",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_trusted_domains() -> Vec<String> {
    vec![
        "*.sharepoint.com".to_string(),
        "*.sharepoint.us".to_string(),
        "graph.microsoft.com".to_string(),
    ]
}

fn default_thumbnail_file_types() -> Vec<String> {
    [
        "doc", "docx", "xls", "xlsx", "ppt", "pptx", "pdf", "odt", "ods", "odp", "jpg", "jpeg",
        "png", "gif", "bmp", "tiff", "mp4",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl SourceConfig {
    /// Whether the entity set permits issuing a request at all.
    pub fn has_entity_types(&self) -> bool {
        !self.entity_types.is_empty()
    }
}

/// Top-level CLI configuration file.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ConnectorFile {
    pub source: SourceConfig,
    pub slots: SlotMapping,
    pub locale: Option<String>,
    pub filters: Vec<FilterConfig>,
}

pub fn load_config(path: &Path) -> Result<ConnectorFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ConnectorFile =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !config.source.has_entity_types() {
        log::warn!("no entity types configured; searches will return zero items");
    }

    if config.source.query_template.trim().is_empty() {
        anyhow::bail!("source.query_template must not be blank (omit it for the default)");
    }

    for spec in &config.source.sort_fields {
        if spec.field.trim().is_empty() {
            anyhow::bail!("source.sort_fields entries must name a field");
        }
    }

    for spec in &config.source.collapse_specs {
        if spec.fields.is_empty() {
            anyhow::bail!("source.collapse_specs entries must name at least one field");
        }
        if spec.limit == 0 {
            anyhow::bail!("source.collapse_specs limit must be >= 1");
        }
    }

    for filter in &config.filters {
        if filter.field.trim().is_empty() {
            anyhow::bail!("filters entries must name a field");
        }
        if filter.max_buckets == 0 {
            anyhow::bail!("filters max_buckets must be >= 1");
        }
    }

    Ok(config)
}
