// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `cfddns_core::DnsProvider`.
//
// ## Behavior
//
// - ✅ One HTTP request per trait call
// - ✅ Errors propagated to the caller (the scheduler retries next cycle)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401, 403, 404, 409, 429, 5xx)
// - ✅ Cloudflare envelope errors (`"success": false`) surfaced with their messages
// - ✅ Dry-run mode for safe testing
// - ✅ Scoped API tokens and legacy global API keys
// - ❌ NO retry or backoff
// - ❌ NO caching between calls
// - ❌ NO record deletion
//
// ## Security Requirements
//
// - API key NEVER appears in logs or `Debug` output
// - Construction fails if the key is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::Credentials;
use cfddns_core::traits::{DnsProvider, NewRecord, RecordType, RemoteRecord};
use cfddns_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// How requests are authenticated
#[derive(Clone, PartialEq, Eq)]
enum Auth {
    /// Scoped API token, sent as a bearer token
    Token(String),
    /// Global API key bound to an account email
    GlobalKey { email: String, key: String },
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended POST/PATCH payload
/// - **NOT** actually modify DNS records, while reporting success
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value
    auth: Auth,

    /// API base URL (overridable for testing)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.auth {
            Auth::Token(_) => "token".to_string(),
            Auth::GlobalKey { email, .. } => format!("global key ({})", email),
        };
        f.debug_struct("CloudflareProvider")
            .field("auth", &auth)
            .field("api_key", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// With an email in `credentials` the key is sent as a global API key
    /// (`X-Auth-Email`/`X-Auth-Key`); otherwise as a bearer token.
    ///
    /// # Errors
    ///
    /// Fails if the key is empty or the HTTP client cannot be built.
    pub fn new(credentials: &Credentials, dry_run: bool) -> Result<Self> {
        let key = credentials.api_key.trim();
        if key.is_empty() {
            return Err(Error::config("Cloudflare API key cannot be empty"));
        }

        let auth = match credentials.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => Auth::GlobalKey {
                email: email.to_string(),
                key: key.to_string(),
            },
            _ => Auth::Token(key.to_string()),
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            auth,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Point the provider at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Content-Type", "application/json");
        match &self.auth {
            Auth::Token(token) => request.bearer_auth(token),
            Auth::GlobalKey { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    /// Send a request and unwrap the Cloudflare envelope
    ///
    /// Returns the `result` member on success.
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Value> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, context));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        unwrap_envelope(json, context)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Resolve a domain to its zone ID
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for domain: {}", domain);

        let url = format!("{}/zones", self.api_base);
        let result = self
            .send(
                self.client.get(&url).query(&[("name", domain)]),
                &format!("Zone lookup for {}", domain),
            )
            .await?;

        let zone_id = parse_zone_id(&result, domain)?;
        tracing::debug!("Found zone ID: {}", zone_id);
        Ok(zone_id)
    }

    /// List records matching a name and type
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com&type=A
    /// ```
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<RemoteRecord>> {
        tracing::debug!("Listing {} records for {}", record_type, name);

        let url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);
        let result = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("name", name), ("type", record_type.as_str())]),
                &format!("Record lookup for {}", name),
            )
            .await?;

        parse_records(&result)
    }

    /// Create a record
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "...", "content": "1.2.3.4", "ttl": 300, "proxied": false }
    /// ```
    async fn create_record(&self, zone_id: &str, record: &NewRecord) -> Result<()> {
        let url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);
        let payload = serde_json::json!({
            "type": record.record_type.as_str(),
            "name": record.name,
            "content": record.content,
            "ttl": record.ttl,
            "proxied": record.proxied,
        });

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send POST request to {} with payload: {}", url, payload);
            return Ok(());
        }

        self.send(
            self.client.post(&url).json(&payload),
            &format!("Creating record {}", record.name),
        )
        .await?;

        tracing::debug!("Created record {} -> {}", record.name, record.content);
        Ok(())
    }

    /// Replace a record's content
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// { "content": "1.2.3.4", "type": "A" }
    /// ```
    async fn update_record(&self, zone_id: &str, record_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/zones/{}/dns_records/{}", self.api_base, zone_id, record_id);
        let payload = serde_json::json!({
            "content": content,
            "type": RecordType::A.as_str(),
        });

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send PATCH request to {} with payload: {}", url, payload);
            return Ok(());
        }

        self.send(
            self.client.patch(&url).json(&payload),
            &format!("Updating record {}", record_id),
        )
        .await?;

        tracing::debug!("Updated record {} -> {}", record_id, content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Map a non-success HTTP status to an error
fn status_error(status: StatusCode, error_text: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API credentials or insufficient permissions. Status: {}",
            context, status
        )),
        404 => Error::not_found(format!("{}: {}", context, status)),
        409 => Error::provider(
            PROVIDER,
            format!("{}: conflict, record changed concurrently. Status: {}", context, status),
        ),
        429 => Error::rate_limited(format!("{}: please retry later. Status: {}", context, status)),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{}: Cloudflare server error (transient): {} - {}", context, status, error_text),
        ),
        _ => Error::provider(
            PROVIDER,
            format!("{} failed: {} - {}", context, status, error_text),
        ),
    }
}

/// Check `success` and return `result`
fn unwrap_envelope(mut json: Value, context: &str) -> Result<Value> {
    if json["success"].as_bool() == Some(false) {
        let messages: Vec<String> = json["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| match (e["code"].as_i64(), e["message"].as_str()) {
                        (Some(code), Some(message)) => format!("{} ({})", message, code),
                        (None, Some(message)) => message.to_string(),
                        _ => e.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        return Err(Error::provider(
            PROVIDER,
            format!("{} rejected: {}", context, messages.join("; ")),
        ));
    }

    Ok(json.get_mut("result").map(Value::take).unwrap_or(Value::Null))
}

fn parse_zone_id(result: &Value, domain: &str) -> Result<String> {
    let zones = result.as_array().ok_or_else(|| {
        Error::provider(PROVIDER, "Invalid response format: result is not an array")
    })?;

    let zone = zones
        .first()
        .ok_or_else(|| Error::not_found(format!("Zone not found: {}", domain)))?;

    let zone_id = zone["id"].as_str().ok_or_else(|| {
        Error::provider(PROVIDER, "Invalid response format: zone.id is not a string")
    })?;

    Ok(zone_id.to_string())
}

fn parse_records(result: &Value) -> Result<Vec<RemoteRecord>> {
    let records = result.as_array().ok_or_else(|| {
        Error::provider(PROVIDER, "Invalid response format: result is not an array")
    })?;

    records
        .iter()
        .map(|record| {
            let field = |name: &str| {
                record[name].as_str().map(str::to_string).ok_or_else(|| {
                    Error::provider(
                        PROVIDER,
                        format!("Invalid response format: record.{} is not a string", name),
                    )
                })
            };
            Ok(RemoteRecord {
                id: field("id")?,
                name: field("name")?,
                content: field("content")?,
            })
        })
        .collect()
}
