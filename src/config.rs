use std::path::Path;

use crate::error::{MirrorError, Result};

pub const DEFAULT_API_URL: &str = "https://api.gitbook.com";
pub const DEFAULT_BRANCH: &str = "main";

/// Which operation a credential or requirement check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Export,
    Import,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Export => write!(f, "export"),
            Self::Import => write!(f, "import"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Git mirror the spaces are exported to and imported from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTarget {
    /// Repository locator without scheme, e.g. `github.com/acme/docs`.
    pub locator: String,
    pub token: String,
    pub branch: String,
}

impl MirrorTarget {
    pub fn new(locator: &str, token: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            locator: strip_scheme(locator).trim_end_matches('/').to_string(),
            token: token.into(),
            branch: branch.into(),
        }
    }

    /// Repository URL carrying the git host token as userinfo.
    pub fn authenticated_url(&self) -> String {
        format!("https://{}@{}", self.token, self.locator)
    }

    /// Repository URL safe for logs and reports.
    pub fn display_url(&self) -> String {
        format!("https://{}", self.locator)
    }

    pub fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    /// Markdown source location for one space's mirrored directory.
    pub fn space_url(&self, title: &str) -> String {
        format!("{}/{}", self.authenticated_url(), title)
    }
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiTokens {
    pub export: Option<String>,
    pub import: Option<String>,
    pub delete: Option<String>,
}

/// Process configuration, read once at startup and passed down by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub api_url: String,
    pub tokens: ApiTokens,
    pub git_token: Option<String>,
    pub repository: Option<String>,
    pub branch: String,
}

impl MirrorConfig {
    /// Build a config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let shared = get("GITBOOK_API_TOKEN");
        let import = get("GITBOOK_IMPORT_API_TOKEN");
        let tokens = ApiTokens {
            export: get("GITBOOK_EXPORT_API_TOKEN").or_else(|| shared.clone()),
            delete: get("GITBOOK_DELETE_API_TOKEN")
                .or_else(|| import.clone())
                .or_else(|| shared.clone()),
            import: import.or(shared),
        };

        Self {
            api_url: get("GITBOOK_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            tokens,
            git_token: get("GITHUB_API_TOKEN"),
            repository: get("GITHUB_REPOSITORY"),
            branch: get("GITHUB_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load `.env` from `dir` if present. Variables already set win.
    pub fn load_dotenv(dir: &Path) -> Result<()> {
        let path = dir.join(".env");
        if !path.exists() {
            return Ok(());
        }
        dotenvy::from_path(&path)
            .map_err(|err| MirrorError::MissingConfig(format!("{}: {err}", path.display())))
    }

    pub fn api_token(&self, kind: OperationKind) -> Result<&str> {
        let (token, var) = match kind {
            OperationKind::Export => (&self.tokens.export, "GITBOOK_EXPORT_API_TOKEN"),
            OperationKind::Import => (&self.tokens.import, "GITBOOK_IMPORT_API_TOKEN"),
            OperationKind::Delete => (&self.tokens.delete, "GITBOOK_DELETE_API_TOKEN"),
        };
        token.as_deref().ok_or_else(|| {
            MirrorError::MissingConfig(format!("{var} (or GITBOOK_API_TOKEN) is not set"))
        })
    }

    /// Token for read-only enumeration: the export account first, then any other.
    pub fn inventory_token(&self) -> Result<&str> {
        self.tokens
            .export
            .as_deref()
            .or(self.tokens.import.as_deref())
            .or(self.tokens.delete.as_deref())
            .ok_or_else(|| MirrorError::MissingConfig("no GITBOOK_*_API_TOKEN is set".into()))
    }

    pub fn mirror(&self) -> Result<MirrorTarget> {
        let token = self
            .git_token
            .as_deref()
            .ok_or_else(|| MirrorError::MissingConfig("GITHUB_API_TOKEN is not set".into()))?;
        let repository = self
            .repository
            .as_deref()
            .ok_or_else(|| MirrorError::MissingConfig("GITHUB_REPOSITORY is not set".into()))?;
        let target = MirrorTarget::new(repository, token, self.branch.clone());
        if target.locator.is_empty() {
            return Err(MirrorError::MissingConfig(
                "GITHUB_REPOSITORY is empty after removing the scheme".into(),
            ));
        }
        Ok(target)
    }

    /// Fail fast on anything `kind` needs, before any remote call is made.
    pub fn validate(&self, kind: OperationKind) -> Result<()> {
        self.api_token(kind)?;
        if kind != OperationKind::Delete {
            self.mirror()?;
        }
        Ok(())
    }
}
