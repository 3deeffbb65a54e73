//! Hosted table store: REST reads/writes, storage URLs and RPC calls.
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info, instrument, warn};

use crate::model::{ListRecord, Status, StatusFilter};

pub mod model;

use model::{ApiError, ScanArgs, StatusPatch};

static PATH_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^/\\?#\x00-\x1f]+$").expect("valid path segment pattern"));

/// True when `id` can stand alone as one storage path segment or file stem:
/// no separators, no control characters, and not `.` or `..`.
///
/// Filter values need no such check; they are query-encoded.
pub fn is_path_segment(id: &str) -> bool {
    PATH_SEGMENT.is_match(id) && id != "." && id != ".."
}

/// Remote source of records for one table.
#[async_trait]
pub trait RecordSource<R: ListRecord>: Send + Sync {
    /// All rows, scoped server-side by `filter` when it is not `All`.
    async fn fetch_records(&self, filter: StatusFilter) -> Result<Vec<R>>;

    /// At most one row by identifier.
    async fn fetch_one(&self, id: &str) -> Result<Option<R>>;

    async fn update_status(&self, id: &str, status: Status) -> Result<()>;
}

/// Object storage that can hand out public URLs.
pub trait MediaStore: Send + Sync {
    fn resolve_public_url(&self, record_id: &str, file_name: &str) -> Option<Url>;
}

/// Media store for callers that do not enrich records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMedia;

impl MediaStore for NoMedia {
    fn resolve_public_url(&self, _record_id: &str, _file_name: &str) -> Option<Url> {
        None
    }
}

#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(base_url: Url, api_key: String) -> Self {
        let http = Client::builder()
            .user_agent("artisan-portal/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            api_key,
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.backend.url).context("invalid backend.url")?;
        Ok(Self::new(base_url, cfg.backend.api_key.clone()))
    }

    /// Typed handle on one table.
    pub fn table<R: ListRecord>(&self, name: &str) -> RestTable<R> {
        RestTable {
            client: self.clone(),
            table: name.to_string(),
            _record: PhantomData,
        }
    }

    /// Public storage bucket handle.
    pub fn bucket(&self, name: &str) -> PublicBucket {
        PublicBucket {
            base_url: self.base_url.clone(),
            bucket: name.to_string(),
        }
    }

    fn endpoint(&self, segments: &[&str], query: &[(String, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("backend URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Build an authenticated request against `rest/v1/<segments>`.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Request> {
        let mut path = vec!["rest", "v1"];
        path.extend_from_slice(segments);
        let url = self.endpoint(&path, query)?;
        let mut builder = self
            .http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .header("Prefer", "return=representation")
                .json(body);
        }
        builder.build().context("failed to build backend request")
    }

    async fn execute(&self, request: reqwest::Request) -> Result<Value> {
        debug!(method = %request.method(), url = %request.url(), "sending backend request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach backend")?;

        let status = res.status();
        let body = res.text().await.context("failed to read backend response")?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%status, "rate limited by backend");
            bail!("received 429 from backend: {}", ApiError::describe(&body));
        }
        if !status.is_success() {
            warn!(%status, "backend error");
            bail!("backend error {}: {}", status, ApiError::describe(&body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).context("invalid backend response JSON")
    }

    /// Bump the profile scan counter through the `increment_scan` RPC.
    #[instrument(skip(self))]
    pub async fn record_scan(&self, artisan_id: &str) -> Result<()> {
        if artisan_id.trim().is_empty() {
            bail!("artisan ID is required");
        }
        let request = self.build_request(
            Method::POST,
            &["rpc", "increment_scan"],
            &[],
            Some(&ScanArgs {
                artisanid: artisan_id,
            }),
        )?;
        self.execute(request).await?;
        info!(artisan_id, "scan counted");
        Ok(())
    }
}

/// REST access to one table, decoding rows as `R`.
pub struct RestTable<R> {
    client: RestClient,
    table: String,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RestTable<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            table: self.table.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for RestTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestTable")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<R: ListRecord> RestTable<R> {
    pub fn select_query(filter: StatusFilter) -> Vec<(String, String)> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        if let Some(status) = filter.status() {
            query.push(("status".to_string(), format!("eq.{}", status)));
        }
        query
    }

    fn id_query(id: &str) -> Result<Vec<(String, String)>> {
        if id.is_empty() {
            bail!("record identifier is required");
        }
        Ok(vec![(R::ID_COLUMN.to_string(), format!("eq.{}", id))])
    }

    fn decode_rows(&self, value: Value) -> Result<Vec<R>> {
        serde_json::from_value(value)
            .with_context(|| format!("unexpected row shape in table '{}'", self.table))
    }
}

#[async_trait]
impl<R: ListRecord> RecordSource<R> for RestTable<R> {
    #[instrument(skip(self), fields(table = %self.table))]
    async fn fetch_records(&self, filter: StatusFilter) -> Result<Vec<R>> {
        let request = self.client.build_request::<()>(
            Method::GET,
            &[self.table.as_str()],
            &Self::select_query(filter),
            None,
        )?;
        let rows = self.decode_rows(self.client.execute(request).await?)?;
        debug!(count = rows.len(), "fetched rows");
        Ok(rows)
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn fetch_one(&self, id: &str) -> Result<Option<R>> {
        let mut query = Self::select_query(StatusFilter::All);
        query.extend(Self::id_query(id)?);
        query.push(("limit".to_string(), "1".to_string()));
        let request =
            self.client
                .build_request::<()>(Method::GET, &[self.table.as_str()], &query, None)?;
        let rows = self.decode_rows(self.client.execute(request).await?)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn update_status(&self, id: &str, status: Status) -> Result<()> {
        let request = self.client.build_request(
            Method::PATCH,
            &[self.table.as_str()],
            &Self::id_query(id)?,
            Some(&StatusPatch { status }),
        )?;
        let updated = self.client.execute(request).await?;
        let count = updated.as_array().map(Vec::len).unwrap_or(0);
        if count == 0 {
            bail!("no row in '{}' matched {} = {}", self.table, R::ID_COLUMN, id);
        }
        info!(id, %status, "status updated");
        Ok(())
    }
}

/// Publicly readable storage bucket.
#[derive(Debug, Clone)]
pub struct PublicBucket {
    base_url: Url,
    bucket: String,
}

impl MediaStore for PublicBucket {
    fn resolve_public_url(&self, record_id: &str, file_name: &str) -> Option<Url> {
        if !is_path_segment(record_id) || !is_path_segment(file_name) {
            return None;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().extend([
            "storage",
            "v1",
            "object",
            "public",
            self.bucket.as_str(),
            record_id,
            file_name,
        ]);
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artisan, Craft};

    fn client() -> RestClient {
        RestClient::new(
            Url::parse("https://demo.supabase.co/").unwrap(),
            "anon-key".into(),
        )
    }

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> &'a str {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .unwrap()
    }

    #[test]
    fn select_request_carries_filter_and_auth() {
        let client = client();
        let query =
            RestTable::<Artisan>::select_query(StatusFilter::Only(Status::Approved));
        let request = client
            .build_request::<()>(Method::GET, &["artisans_public"], &query, None)
            .unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().path(), "/rest/v1/artisans_public");
        assert_eq!(request.url().query(), Some("select=*&status=eq.Approved"));
        assert_eq!(header(&request, "apikey"), "anon-key");
        assert_eq!(header(&request, "Authorization"), "Bearer anon-key");
        assert!(request.headers().get("Prefer").is_none());
    }

    #[test]
    fn all_filter_has_no_status_clause() {
        let query = RestTable::<Craft>::select_query(StatusFilter::All);
        assert_eq!(query, vec![("select".to_string(), "*".to_string())]);
    }

    #[test]
    fn patch_request_targets_id_column() {
        let client = client();
        let query = RestTable::<Artisan>::id_query("A-17").unwrap();
        let request = client
            .build_request(
                Method::PATCH,
                &["artisans_public"],
                &query,
                Some(&StatusPatch {
                    status: Status::Rejected,
                }),
            )
            .unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.url().query(), Some("artisan_id=eq.A-17"));
        assert_eq!(header(&request, "Prefer"), "return=representation");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["status"], "Rejected");
    }

    #[test]
    fn filter_values_are_encoded_not_rejected() {
        let client = client();
        for (id, encoded) in [
            ("rita.k", "artisan_id=eq.rita.k"),
            ("ART 01", "artisan_id=eq.ART+01"),
            ("a@b&status=eq.Approved", "artisan_id=eq.a%40b%26status%3Deq.Approved"),
        ] {
            let query = RestTable::<Artisan>::id_query(id).unwrap();
            let request = client
                .build_request(
                    Method::PATCH,
                    &["artisans_public"],
                    &query,
                    Some(&StatusPatch {
                        status: Status::Approved,
                    }),
                )
                .unwrap();
            assert_eq!(request.url().query(), Some(encoded));
        }
        assert!(RestTable::<Artisan>::id_query("").is_err());
    }

    #[test]
    fn path_segments_reject_only_traversal() {
        assert!(is_path_segment("A1_b-2"));
        assert!(is_path_segment("rita.k"));
        assert!(is_path_segment("ART 01"));
        assert!(!is_path_segment(""));
        assert!(!is_path_segment("."));
        assert!(!is_path_segment(".."));
        assert!(!is_path_segment("a/b"));
        assert!(!is_path_segment("a\\b"));
        assert!(!is_path_segment("a?x=1"));
    }

    #[test]
    fn public_url_points_into_bucket() {
        let bucket = client().bucket("artisan_files");
        let url = bucket.resolve_public_url("A1", "photo_A1.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/storage/v1/object/public/artisan_files/A1/photo_A1.jpg"
        );
        let dotted = bucket.resolve_public_url("rita.k", "photo_rita.k.jpg").unwrap();
        assert!(dotted.as_str().ends_with("/artisan_files/rita.k/photo_rita.k.jpg"));
        let spaced = bucket.resolve_public_url("ART 01", "photo_ART 01.jpg").unwrap();
        assert!(spaced.as_str().ends_with("/artisan_files/ART%2001/photo_ART%2001.jpg"));
        assert!(bucket.resolve_public_url("..", "x.jpg").is_none());
        assert!(bucket.resolve_public_url("../etc", "x.jpg").is_none());
        assert!(NoMedia.resolve_public_url("A1", "photo_A1.jpg").is_none());
    }

    #[test]
    fn base_url_with_path_prefix_is_kept() {
        let client = RestClient::new(
            Url::parse("https://proxy.example.com/supabase/").unwrap(),
            "k".into(),
        );
        let request = client
            .build_request::<()>(Method::POST, &["rpc", "increment_scan"], &[], None)
            .unwrap();
        assert_eq!(request.url().path(), "/supabase/rest/v1/rpc/increment_scan");
    }
}
