//! Capabilities the migration core needs from an authoring-platform account.

pub mod http;

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};
use crate::model::{Organization, SpaceRecord};

/// Page-size ceiling for space enumeration. Nothing beyond it is fetched.
pub const SPACE_LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewSpace {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatedSpace {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GitInfo {
    pub provider: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub url: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub commit_message: String,
    pub repo_project_directory: String,
    pub git_info: GitInfo,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    Markdown,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportRequest {
    pub url: String,
    pub source: ImportSource,
}

/// One account on the authoring platform.
///
/// Every call is a blocking round trip; callers issue them one at a time.
pub trait AccountApi {
    fn list_organizations(&self) -> Result<Vec<Organization>>;
    fn list_spaces(&self, org_id: &str, limit: usize) -> Result<Vec<SpaceRecord>>;
    fn create_space(&self, org_id: &str, space: &NewSpace) -> Result<CreatedSpace>;
    fn delete_space(&self, space_id: &str) -> Result<()>;
    fn export_to_repository(&self, space_id: &str, request: &ExportRequest) -> Result<()>;
    fn import_content(&self, space_id: &str, request: &ImportRequest) -> Result<()>;
}

/// Id of the first organization visible to the account.
pub fn resolve_organization<A: AccountApi + ?Sized>(api: &A) -> Result<String> {
    api.list_organizations()?
        .into_iter()
        .next()
        .map(|org| org.id)
        .ok_or(MirrorError::NoOrganizations)
}
