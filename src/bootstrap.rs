use crate::config::BootstrapConfig;
use crate::error::Result;
use crate::store::{parse_document_value, upgrade, Store};
use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Where the document in the store came from after a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Remote,
    Stored,
    Default,
    Disabled,
}

/// Seeds the store from a published document at a static URL.
#[derive(Clone)]
pub struct Bootstrap {
    client: Client,
    url: String,
    enabled: bool,
}

impl Bootstrap {
    pub fn new(config: &BootstrapConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build bootstrap HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
            enabled: config.enabled && !config.url.is_empty(),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Fetches the remote document, bypassing caches with `t=<millis>`.
    async fn fetch(&self) -> anyhow::Result<Value> {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}t={}",
            self.url,
            separator,
            chrono::Utc::now().timestamp_millis()
        );

        tracing::debug!("Bootstrap fetch: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach bootstrap URL")?;

        if !response.status().is_success() {
            anyhow::bail!("Bootstrap URL returned {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse bootstrap document")
    }

    /// Replaces the stored document with the remote one merged over the
    /// defaults. On any failure the stored document is kept, or the default
    /// one is written when nothing usable is stored.
    pub async fn run(&self, store: &Store) -> Result<BootstrapOutcome> {
        if !self.enabled {
            return Ok(BootstrapOutcome::Disabled);
        }

        match self.remote_document(store).await {
            Ok(merged) => {
                let doc = parse_document_value(merged)?;
                store.replace(&doc).await?;
                tracing::info!(
                    "Bootstrapped document from {} ({} movies, {} series, {} animes)",
                    self.url,
                    doc.movies.len(),
                    doc.series.len(),
                    doc.animes.len()
                );
                Ok(BootstrapOutcome::Remote)
            }
            Err(e) => {
                tracing::warn!("Bootstrap failed, keeping local document: {:#}", e);
                if store.stored().await?.is_some() {
                    Ok(BootstrapOutcome::Stored)
                } else {
                    store.replace(&store.default_document()).await?;
                    Ok(BootstrapOutcome::Default)
                }
            }
        }
    }

    /// Remote document upgraded to the current schema and laid over the
    /// default document. Fails when the result would not parse.
    async fn remote_document(&self, store: &Store) -> anyhow::Result<Value> {
        let remote = self.fetch().await?;
        let remote = upgrade(remote).map_err(|e| anyhow::anyhow!("{}", e))?;

        let mut merged = serde_json::to_value(store.default_document())?;
        merge(&mut merged, remote);

        parse_document_value(merged.clone()).map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(merged)
    }
}

/// Deep-merges `overlay` into `base`: objects merge key by key, anything
/// else in `overlay` replaces the value in `base`.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
