use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prosody_core::model::{PersistedDocument, RemoteRecord, UserId};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::remote::RemoteBackend;
use crate::config::CloudConfig;
use crate::error::RemoteError;

pub const USER_DATA_TABLE: &str = "user_data";

/// PostgREST client for the `user_data` table.
///
/// Requests carry the anon key as `apikey` and authenticate with the user's
/// access token once one is set, the anon key otherwise.
pub struct RestRemote {
    client: Client,
    config: CloudConfig,
    access_token: Mutex<Option<String>>,
}

impl RestRemote {
    #[must_use]
    pub fn new(config: CloudConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            access_token: Mutex::new(None),
        }
    }

    pub fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn bearer(&self) -> String {
        self.access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }
}

fn table_url(base: &str) -> Result<Url, RemoteError> {
    Ok(Url::parse(&format!("{base}/rest/v1/{USER_DATA_TABLE}"))?)
}

fn upsert_url(base: &str) -> Result<Url, RemoteError> {
    let mut url = table_url(base)?;
    url.query_pairs_mut().append_pair("on_conflict", "user_id");
    Ok(url)
}

/// Row filter for one user; the id is percent-encoded.
fn select_url(base: &str, user_id: &UserId) -> Result<Url, RemoteError> {
    let mut url = table_url(base)?;
    url.query_pairs_mut()
        .append_pair("user_id", &format!("eq.{}", user_id.as_str()))
        .append_pair("select", "*");
    Ok(url)
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::HttpStatus { status, message })
}

/// Row written on upsert; `created_at` is left to the table default.
#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    user_id: &'a UserId,
    data: &'a PersistedDocument,
    last_synced: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl RemoteBackend for RestRemote {
    async fn upsert(&self, record: &RemoteRecord) -> Result<(), RemoteError> {
        let row = UpsertRow {
            user_id: &record.user_id,
            data: &record.data,
            last_synced: record.last_synced,
            updated_at: record.updated_at,
        };
        let response = self
            .authorize(self.client.post(upsert_url(&self.config.url)?))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await?;
        ensure_success(response).await?;
        debug!(user = %record.user_id, "remote record upserted");
        Ok(())
    }

    async fn fetch(&self, user_id: &UserId) -> Result<Option<RemoteRecord>, RemoteError> {
        let response = self
            .authorize(self.client.get(select_url(&self.config.url, user_id)?))
            .send()
            .await?;
        let rows: Vec<RemoteRecord> = ensure_success(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_urls() {
        let base = "https://abc.supabase.co";
        let user = UserId::new("42").unwrap();
        assert_eq!(
            upsert_url(base).unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/user_data?on_conflict=user_id"
        );
        assert_eq!(
            select_url(base, &user).unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/user_data?user_id=eq.42&select=*"
        );
    }

    #[test]
    fn user_id_is_encoded_in_filter() {
        let user = UserId::new("a&b c").unwrap();
        let url = select_url("https://abc.supabase.co", &user).unwrap();
        assert_eq!(url.query(), Some("user_id=eq.a%26b+c&select=*"));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("user_id".to_owned(), "eq.a&b c".to_owned()));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn bearer_falls_back_to_anon_key() {
        let config = CloudConfig::new("https://abc.supabase.co", "anon").unwrap().unwrap();
        let remote = RestRemote::new(config);
        assert_eq!(remote.bearer(), "anon");

        remote.set_access_token(Some("jwt".into()));
        assert_eq!(remote.bearer(), "jwt");
    }

    #[test]
    fn upsert_row_omits_created_at() {
        let user = UserId::new("u1").unwrap();
        let data = PersistedDocument::new();
        let now = prosody_core::time::fixed_now();
        let row = UpsertRow {
            user_id: &user,
            data: &data,
            last_synced: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("created_at").is_none());
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["data"], serde_json::json!({}));
    }
}
