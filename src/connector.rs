//! Connector orchestration: one invocation end to end.
//!
//! A [`SearchConnector`] owns the read-only [`SourceConfig`], the slot
//! mapping, and the two external capabilities (token resolution and
//! transport). Each invocation is self-contained: compile the context,
//! post once, normalize the reply. There is no internal parallelism, no
//! shared mutable state between invocations, and no retry.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::compiler;
use crate::config::SourceConfig;
use crate::models::{SearchContext, SearchResults, SlotMapping};
use crate::normalizer;
use crate::request::SearchRequestBody;
use crate::tokens::{StaticTokenResolver, TokenResolver};
use crate::transport::{endpoint_for, RequestHeaders, SearchTransport};

pub struct SearchConnector {
    config: SourceConfig,
    slots: SlotMapping,
    locale: Option<String>,
    resolver: Option<Arc<dyn TokenResolver>>,
    transport: Arc<dyn SearchTransport>,
}

impl SearchConnector {
    pub fn new(config: SourceConfig, transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            config,
            slots: SlotMapping::default(),
            locale: None,
            resolver: None,
            transport,
        }
    }

    pub fn with_slots(mut self, slots: SlotMapping) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    /// Plug in an external token resolver. Without one, a per-invocation
    /// resolver substitutes `{searchTerms}` with the context's free text.
    pub fn with_resolver(mut self, resolver: Arc<dyn TokenResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The endpoint this connector posts to, derived from the beta flag.
    pub fn endpoint(&self) -> &'static str {
        endpoint_for(self.config.use_beta_endpoint)
    }

    /// Run one search with the wall clock.
    pub async fn execute(&self, context: &SearchContext) -> Result<SearchResults> {
        self.execute_at(context, Utc::now()).await
    }

    /// Run one search with an explicit clock, for deterministic date-bucket
    /// boundaries.
    pub async fn execute_at(
        &self,
        context: &SearchContext,
        now: DateTime<Utc>,
    ) -> Result<SearchResults> {
        validate_context(context)?;

        // Zero entity types is a configuration state, not an error: report
        // zero items without issuing a request.
        if !self.config.has_entity_types() {
            log::warn!("no entity types selected; returning empty results");
            return Ok(SearchResults::default());
        }

        let request = match &self.resolver {
            Some(resolver) => {
                compiler::compile(&self.config, context, resolver.as_ref(), now).await?
            }
            None => {
                let resolver = StaticTokenResolver::for_query(
                    context.input_query_text.as_deref().unwrap_or(""),
                );
                compiler::compile(&self.config, context, &resolver, now).await?
            }
        };

        let endpoint = self.endpoint();
        log::debug!("posting search request to {}", endpoint);

        let headers = RequestHeaders {
            locale: self.locale.clone(),
        };
        let response = self
            .transport
            .post(endpoint, &SearchRequestBody::single(request), &headers)
            .await?;

        let results = normalizer::normalize_response(&response, &self.slots, &self.config)?;
        log::debug!(
            "normalized {} items of {} total",
            results.items.len(),
            results.total_count
        );
        Ok(results)
    }
}

fn validate_context(context: &SearchContext) -> Result<()> {
    if context.page_number < 1 {
        bail!("page_number must be >= 1");
    }
    if context.items_count_per_page == 0 {
        bail!("items_count_per_page must be > 0");
    }
    Ok(())
}
