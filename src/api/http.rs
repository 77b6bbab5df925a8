use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{AccountApi, CreatedSpace, ExportRequest, ImportRequest, NewSpace};
use crate::error::{MirrorError, Result};
use crate::model::{Organization, SpaceRecord};

#[derive(Debug, Deserialize)]
struct ItemsPage<T> {
    items: Vec<T>,
}

/// Blocking REST client for one account, authenticated with a bearer token.
pub struct HttpAccountApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpAccountApi {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("spacemirror/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.token).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().unwrap_or_default();
        Err(MirrorError::Api {
            status: status.as_u16(),
            message: api_error_message(&message),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(%url, "GET");
        Ok(self.send(self.client.get(url))?.json()?)
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

impl AccountApi for HttpAccountApi {
    fn list_organizations(&self) -> Result<Vec<Organization>> {
        let page: ItemsPage<Organization> = self.get_json(self.endpoint("orgs"))?;
        Ok(page.items)
    }

    fn list_spaces(&self, org_id: &str, limit: usize) -> Result<Vec<SpaceRecord>> {
        let url = self.endpoint(&format!("orgs/{org_id}/spaces?limit={limit}"));
        let page: ItemsPage<SpaceRecord> = self.get_json(url)?;
        Ok(page.items)
    }

    fn create_space(&self, org_id: &str, space: &NewSpace) -> Result<CreatedSpace> {
        let url = self.endpoint(&format!("orgs/{org_id}/spaces"));
        debug!(%url, title = %space.title, "POST");
        Ok(self.send(self.client.post(url).json(space))?.json()?)
    }

    fn delete_space(&self, space_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("spaces/{space_id}"));
        debug!(%url, "DELETE");
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn export_to_repository(&self, space_id: &str, request: &ExportRequest) -> Result<()> {
        let url = self.endpoint(&format!("spaces/{space_id}/git/export"));
        debug!(%url, directory = %request.repo_project_directory, "POST");
        self.send(self.client.post(url).json(request))?;
        Ok(())
    }

    fn import_content(&self, space_id: &str, request: &ImportRequest) -> Result<()> {
        let url = self.endpoint(&format!("spaces/{space_id}/content/import"));
        debug!(%url, "POST");
        self.send(self.client.post(url).json(request))?;
        Ok(())
    }
}
