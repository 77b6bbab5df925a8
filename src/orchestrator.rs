//! Export, import and delete runs over an account's space inventory.
//!
//! Every run is one sequential pass. A failure on one space is logged and
//! recorded in the [`OperationReport`]; it never stops the remaining spaces and
//! is never returned as an `Err`. Only failures that prevent the run from
//! starting (resolving the organization) propagate.

use clap::ValueEnum;
use tracing::{error, info, warn};

use crate::api::{self, AccountApi, ExportRequest, GitInfo, ImportRequest, ImportSource, NewSpace};
use crate::config::{MirrorTarget, OperationKind};
use crate::error::Result;
use crate::model::{InventorySnapshot, SpaceRecord};
use crate::remap::{self, RemapTable};
use crate::report::{CreatedSpaceRecord, OperationReport, Stage};
use crate::store::cache::InventoryCache;

const GIT_PROVIDER: &str = "github";

/// Order in which import re-creates spaces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum ImportOrder {
    /// Every parent before its children.
    #[default]
    ParentsFirst,
    /// Inventory order as listed. Children listed ahead of their parent are
    /// created without one.
    Snapshot,
}

#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Export(&'a MirrorTarget),
    Import(&'a MirrorTarget),
    Delete,
}

impl Operation<'_> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Export(_) => OperationKind::Export,
            Self::Import(_) => OperationKind::Import,
            Self::Delete => OperationKind::Delete,
        }
    }
}

pub struct Orchestrator<'a, A: AccountApi + ?Sized> {
    api: &'a A,
    cache: &'a InventoryCache,
    refresh: bool,
    import_order: ImportOrder,
}

impl<'a, A: AccountApi + ?Sized> Orchestrator<'a, A> {
    pub fn new(api: &'a A, cache: &'a InventoryCache) -> Self {
        Self {
            api,
            cache,
            refresh: false,
            import_order: ImportOrder::default(),
        }
    }

    /// Skip the cached inventory and enumerate the account again.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn import_order(mut self, order: ImportOrder) -> Self {
        self.import_order = order;
        self
    }

    pub fn run(&self, operation: &Operation<'_>) -> Result<OperationReport> {
        let kind = operation.kind();
        let snapshot = self.cache.load_or_fetch(self.api, self.refresh);
        if snapshot.is_empty() {
            info!(operation = %kind, "No spaces found");
            return Ok(OperationReport::start(kind, 0).finish());
        }

        info!(operation = %kind, spaces = snapshot.len(), "starting run");
        let report = match operation {
            Operation::Export(mirror) => self.export(&snapshot, mirror),
            Operation::Import(mirror) => self.import(&snapshot, mirror)?,
            Operation::Delete => self.delete(&snapshot)?,
        };
        info!(
            operation = %kind,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "run finished"
        );
        Ok(report)
    }

    fn export(&self, snapshot: &InventorySnapshot, mirror: &MirrorTarget) -> OperationReport {
        let mut report = OperationReport::start(OperationKind::Export, snapshot.len());
        let url = mirror.authenticated_url();

        for space in snapshot {
            info!(space = %space.title, "Exporting content for space");
            let request = ExportRequest {
                url: url.clone(),
                git_ref: mirror.branch_ref(),
                commit_message: format!("Update to {}", space.title),
                repo_project_directory: space.title.clone(),
                git_info: GitInfo {
                    provider: GIT_PROVIDER.to_string(),
                    url: url.clone(),
                },
            };

            match self.api.export_to_repository(&space.id, &request) {
                Ok(()) => {
                    info!(
                        space = %space.title,
                        repository = %mirror.display_url(),
                        "exported space to git repository"
                    );
                    report.succeeded += 1;
                }
                Err(err) => {
                    error!(space = %space.title, error = %err, "Error exporting content for space");
                    report.record_failure(&space.id, &space.title, Stage::Export, err.to_string());
                }
            }
        }

        report.finish()
    }

    fn import(
        &self,
        snapshot: &InventorySnapshot,
        mirror: &MirrorTarget,
    ) -> Result<OperationReport> {
        let org_id = api::resolve_organization(self.api)?;
        let spaces = snapshot.spaces();
        let mut report = OperationReport::start(OperationKind::Import, spaces.len());

        let mut table = RemapTable::seed(spaces);
        table.pre_resolve();

        let order: Vec<usize> = match self.import_order {
            ImportOrder::ParentsFirst => remap::creation_order(spaces),
            ImportOrder::Snapshot => (0..spaces.len()).collect(),
        };

        for idx in order {
            self.import_one(&org_id, &spaces[idx], mirror, &mut table, &mut report);
        }

        Ok(report.finish())
    }

    fn import_one(
        &self,
        org_id: &str,
        space: &SpaceRecord,
        mirror: &MirrorTarget,
        table: &mut RemapTable,
        report: &mut OperationReport,
    ) {
        let parent = table.resolve_parent(&space.id);
        if parent.is_none()
            && let Some(old_parent) = space.parent.as_deref()
        {
            warn!(
                space = %space.title,
                parent = %old_parent,
                "parent has no destination id yet; creating space at top level"
            );
        }

        let new_space = NewSpace {
            title: space.title.clone(),
            parent: parent.clone(),
        };
        let created = match self.api.create_space(org_id, &new_space) {
            Ok(created) => created,
            Err(err) => {
                error!(space = %space.title, error = %err, "Error creating space");
                report.record_failure(&space.id, &space.title, Stage::Create, err.to_string());
                return;
            }
        };

        info!(space = %space.title, id = %created.id, "created space");
        table.record_created(&space.id, created.id.clone());
        report.created.push(CreatedSpaceRecord {
            old_id: space.id.clone(),
            new_id: created.id.clone(),
            title: space.title.clone(),
            parent,
        });

        let request = ImportRequest {
            url: mirror.space_url(&space.title),
            source: ImportSource::Markdown,
        };
        match self.api.import_content(&created.id, &request) {
            Ok(()) => {
                info!(space = %space.title, "imported space content");
                report.succeeded += 1;
            }
            Err(err) => {
                error!(space = %space.title, error = %err, "Error importing content for space");
                report.record_failure(
                    &space.id,
                    &space.title,
                    Stage::ImportContent,
                    err.to_string(),
                );
            }
        }
    }

    fn delete(&self, snapshot: &InventorySnapshot) -> Result<OperationReport> {
        let org_id = api::resolve_organization(self.api)?;
        info!(org = %org_id, "deleting spaces");
        let mut report = OperationReport::start(OperationKind::Delete, snapshot.len());

        for space in snapshot {
            match self.api.delete_space(&space.id) {
                Ok(()) => {
                    info!(space = %space.title, id = %space.id, "Deleted space");
                    report.succeeded += 1;
                }
                Err(err) => {
                    error!(
                        space = %space.title,
                        id = %space.id,
                        error = %err,
                        "Error deleting space"
                    );
                    report.record_failure(&space.id, &space.title, Stage::Delete, err.to_string());
                }
            }
        }

        Ok(report.finish())
    }
}
