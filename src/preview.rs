//! Preview and thumbnail URL resolution.
//!
//! Each entity kind has one closed strategy for its preview link and (for
//! the SharePoint-backed group only) a fallback chain for its thumbnail.
//! Every computed thumbnail URL passes through the trusted-domain validator
//! before it is stored; an untrusted URL is discarded, never surfaced.
//!
//! All derivations here are total: a missing field means "no URL", not an
//! error.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use reqwest::Url;
use serde_json::Value;

use crate::entity::EntityType;
use crate::models::{NormalizedItem, SlotMapping};

/// File types the document-viewer endpoint can render inline.
const DOC_VIEW_TYPES: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "pdf", "vsd", "vsdx", "odt", "ods", "odp",
];

/// Host whitelist for computed thumbnail URLs.
///
/// Patterns are glob-matched against the lowercased host of a candidate URL
/// (`*.sharepoint.com`, `graph.microsoft.com`, ...). A URL with no parseable
/// host never passes.
pub struct TrustedDomains {
    set: GlobSet,
}

impl TrustedDomains {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(&pattern.to_ascii_lowercase())?);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    pub fn allows(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .host_str()
                    .map(|host| self.set.is_match(host.to_ascii_lowercase()))
            })
            .unwrap_or(false)
    }
}

/// Resolve the preview link for one classified hit.
pub fn resolve_preview_url(
    entity: EntityType,
    item: &NormalizedItem,
    slots: &SlotMapping,
) -> Option<String> {
    match entity {
        EntityType::Message | EntityType::TeamsMessage | EntityType::Event => {
            item.get_str("webLink").map(str::to_string)
        }
        EntityType::Person => person_preview_url(item),
        EntityType::Bookmark | EntityType::Acronym => item.get_str("webUrl").map(str::to_string),
        EntityType::DriveItem
        | EntityType::ListItem
        | EntityType::Drive
        | EntityType::List
        | EntityType::Site
        | EntityType::ExternalItem => sharepoint_preview_url(entity, item, slots),
    }
}

/// People resolve to a `mailto:` URI when an address is known, else to the
/// instant-message address verbatim.
fn person_preview_url(item: &NormalizedItem) -> Option<String> {
    let address = item
        .get_str("userPrincipalName")
        .or_else(|| item.get_str("mail"))
        .or_else(|| {
            item.fields
                .get("emailAddresses")
                .and_then(|addresses| addresses.pointer("/0/address"))
                .and_then(Value::as_str)
        })
        .filter(|address| !address.trim().is_empty());

    if let Some(address) = address {
        return Some(format!("mailto:{}", address));
    }

    item.get_str("imAddress")
        .filter(|im| !im.trim().is_empty())
        .map(str::to_string)
}

/// SharePoint-style preview link.
///
/// Containers (folders, lists, sites, drives) link straight to their
/// resolved path. Documents the viewer can render get the site's
/// document-viewer endpoint; everything else falls back to the path.
fn sharepoint_preview_url(
    entity: EntityType,
    item: &NormalizedItem,
    slots: &SlotMapping,
) -> Option<String> {
    let path = resolve_path(item, slots);

    if is_container(entity, item, slots) {
        return path;
    }

    let site_url = item
        .get_str("SPWebUrl")
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string)
        .or_else(|| item.get_str("webUrl").and_then(site_web_url));
    let unique_id = item
        .get_str(&slots.item_id)
        .filter(|id| !id.trim().is_empty());
    let file_type = resolved_file_type(item);

    if let (Some(site_url), Some(unique_id), Some(file_type)) = (site_url, unique_id, file_type) {
        if DOC_VIEW_TYPES.contains(&file_type.to_ascii_lowercase().as_str()) {
            return Some(format!(
                "{}/_layouts/15/Doc.aspx?sourcedoc={}&action=view",
                site_url.trim_end_matches('/'),
                braced(unique_id)
            ));
        }
    }

    path
}

/// Site web URL derived from any URL under its site- or team-path segment.
fn site_web_url(web_url: &str) -> Option<String> {
    for marker in ["/sites/", "/teams/"] {
        if let Some(position) = web_url.find(marker) {
            let after = position + marker.len();
            let end = web_url[after..]
                .find('/')
                .map(|slash| after + slash)
                .unwrap_or(web_url.len());
            return Some(web_url[..end].to_string());
        }
    }
    None
}

/// Path fallback chain: caller-declared path slot, then the stored site
/// path, then the default encoding URL.
fn resolve_path(item: &NormalizedItem, slots: &SlotMapping) -> Option<String> {
    item.get_str(&slots.path)
        .or_else(|| item.get_str("SPSiteURL"))
        .or_else(|| item.get_str("DefaultEncodingURL"))
        .filter(|path| !path.trim().is_empty())
        .map(str::to_string)
}

/// Resolve the thumbnail for one classified hit, already validated against
/// the trusted-domain whitelist. Only the SharePoint-backed group ever
/// receives a computed thumbnail.
pub fn resolve_preview_image_url(
    entity: EntityType,
    item: &NormalizedItem,
    slots: &SlotMapping,
    thumbnail_file_types: &[String],
    trusted: &TrustedDomains,
) -> Option<String> {
    if !entity.is_sharepoint() {
        return None;
    }

    let candidate = thumbnail_candidate(entity, item, slots, thumbnail_file_types)?;
    if trusted.allows(&candidate) {
        Some(candidate)
    } else {
        log::debug!("discarding thumbnail from untrusted domain: {}", candidate);
        None
    }
}

fn thumbnail_candidate(
    entity: EntityType,
    item: &NormalizedItem,
    slots: &SlotMapping,
    thumbnail_file_types: &[String],
) -> Option<String> {
    // Sites and webs carry their own logo; never enter the generic chain.
    if item
        .get_str(&slots.content_class)
        .is_some_and(is_site_content_class)
    {
        return item
            .get_str("SiteLogo")
            .filter(|logo| !logo.trim().is_empty())
            .map(str::to_string);
    }

    let web_url = item.get_str("webUrl");

    if let Some(stored) = item
        .get_str("PictureThumbnailURL")
        .filter(|url| !url.trim().is_empty())
    {
        return Some(normalize_stored_thumbnail(stored, web_url));
    }

    let site_id = item.get_str(&slots.site_id).map(site_guid);
    let item_id = item
        .get_str(&slots.item_id)
        .filter(|id| !id.trim().is_empty());

    if !is_container(entity, item, slots) {
        if let (Some(site_id), Some(list_id), Some(item_id)) = (
            site_id.as_deref(),
            item.get_str(&slots.list_id).filter(|id| !id.trim().is_empty()),
            item_id,
        ) {
            let renderable = resolved_file_type(item).is_some_and(|file_type| {
                let file_type = file_type.to_ascii_lowercase();
                thumbnail_file_types
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(&file_type))
            });
            if renderable {
                if let Some(root) = web_url.and_then(tenant_root) {
                    return Some(format!(
                        "{}/_api/v2.1/sites/{}/lists/{}/items/{}/driveItem/thumbnails/0/c400x99999/content?preferNoRedirect=true",
                        root, site_id, list_id, item_id
                    ));
                }
            }
        }
    }

    if let (Some(site_id), Some(drive_id), Some(item_id)) = (
        site_id.as_deref(),
        item.get_str(&slots.drive_id).filter(|id| !id.trim().is_empty()),
        item_id,
    ) {
        return Some(format!(
            "https://graph.microsoft.com/v1.0/sites/{}/drives/{}/items/{}/thumbnails/0/medium/content",
            site_id, drive_id, item_id
        ));
    }

    None
}

fn is_site_content_class(content_class: &str) -> bool {
    content_class.eq_ignore_ascii_case("STS_Site") || content_class.eq_ignore_ascii_case("STS_Web")
}

/// Folders, lists, sites and drives need different URL shaping than
/// documents.
fn is_container(entity: EntityType, item: &NormalizedItem, slots: &SlotMapping) -> bool {
    if matches!(
        entity,
        EntityType::Drive | EntityType::List | EntityType::Site
    ) {
        return true;
    }
    if is_truthy(item.fields.get(&slots.is_folder)) {
        return true;
    }
    item.get_str(&slots.content_class)
        .is_some_and(|class| class.to_ascii_uppercase().starts_with("STS_LIST"))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.eq_ignore_ascii_case("true") || text == "1",
        _ => false,
    }
}

fn resolved_file_type(item: &NormalizedItem) -> Option<&str> {
    item.get_str("filetype")
        .or_else(|| item.get_str("FileType"))
        .filter(|file_type| !file_type.trim().is_empty())
}

/// Flat site ids may be composite (`host,siteGuid,webGuid`); the thumbnail
/// endpoints want the site GUID component.
fn site_guid(site_id: &str) -> String {
    match site_id.split(',').nth(1) {
        Some(guid) if !guid.is_empty() => guid.to_string(),
        _ => site_id.to_string(),
    }
}

/// Tenant root derived by truncating a web URL at its site- or team-path
/// segment. `None` when the URL has neither segment.
fn tenant_root(web_url: &str) -> Option<String> {
    for marker in ["/sites/", "/teams/"] {
        if let Some(position) = web_url.find(marker) {
            return Some(web_url[..position].to_string());
        }
    }
    None
}

/// Normalize a stored thumbnail URL: absolute against the item's web URL
/// when relative, spaces percent-encoded. No resolution rewriting.
fn normalize_stored_thumbnail(stored: &str, web_url: Option<&str>) -> String {
    let stored = stored.trim();
    let absolute = if stored.starts_with("http://") || stored.starts_with("https://") {
        stored.to_string()
    } else if let Some(base) = web_url.and_then(|url| Url::parse(url).ok()) {
        base.join(stored)
            .map(|joined| joined.to_string())
            .unwrap_or_else(|_| stored.to_string())
    } else {
        stored.to_string()
    };
    absolute.replace(' ', "%20")
}

fn braced(unique_id: &str) -> String {
    if unique_id.starts_with('{') {
        unique_id.to_string()
    } else {
        format!("{{{}}}", unique_id)
    }
}
