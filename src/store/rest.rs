//! RestStore - the store interface over a PostgREST-style HTTP endpoint.

use reqwest::blocking::{Client, RequestBuilder, Response};
use tracing::debug;

use super::{Filter, Store, StoreError};
use crate::config::ClientConfig;
use crate::thing::{NewThing, Thing, ThingId};

/// Blocking HTTP client for `<url>/rest/v1/<table>`.
pub struct RestStore {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl RestStore {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url().to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    /// Endpoint for a table.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Query pairs selecting every column, narrowed by an optional filter.
    pub fn select_query(filter: Option<&Filter>) -> Vec<(String, String)> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        if let Some(filter) = filter {
            query.push((filter.column().to_string(), format!("eq.{}", filter.value())));
        }
        query
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(&self.anon_key)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl Store for RestStore {
    fn fetch_all(&self, table: &str, filter: Option<&Filter>) -> Result<Vec<Thing>, StoreError> {
        let url = self.table_url(table);
        debug!(%url, filter = ?filter.map(|f| f.to_string()), "fetching rows");
        let response = self.send(self.client.get(url).query(&Self::select_query(filter)))?;
        response
            .json::<Vec<Thing>>()
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn insert(&self, table: &str, thing: &NewThing) -> Result<Thing, StoreError> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&[thing]);
        let mut rows = self
            .send(request)?
            .json::<Vec<Thing>>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".into()))
    }

    fn delete_by_id(&self, table: &str, id: ThingId) -> Result<(), StoreError> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))]);
        self.send(request)?;
        Ok(())
    }
}
