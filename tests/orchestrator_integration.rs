use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use tempfile::tempdir;

use spacemirror::api::{
    AccountApi, CreatedSpace, ExportRequest, ImportRequest, ImportSource, NewSpace,
    SPACE_LIST_LIMIT,
};
use spacemirror::config::{MirrorTarget, OperationKind};
use spacemirror::error::{MirrorError, Result};
use spacemirror::model::{InventorySnapshot, Organization, SpaceRecord};
use spacemirror::orchestrator::{ImportOrder, Operation, Orchestrator};
use spacemirror::report::Stage;
use spacemirror::store::cache::InventoryCache;

#[derive(Default)]
struct Calls {
    list_spaces: Vec<(String, usize)>,
    created: Vec<(String, NewSpace)>,
    imported: Vec<(String, ImportRequest)>,
    exported: Vec<(String, ExportRequest)>,
    deleted: Vec<String>,
}

/// In-memory account: serves a fixed inventory and records every call.
#[derive(Default)]
struct FakeAccount {
    orgs: Vec<String>,
    spaces: Vec<SpaceRecord>,
    fail_create: HashSet<String>,
    fail_import_content: HashSet<String>,
    fail_export: HashSet<String>,
    fail_delete: HashSet<String>,
    next_id: Cell<usize>,
    titles_by_new_id: RefCell<HashMap<String, String>>,
    calls: RefCell<Calls>,
}

impl FakeAccount {
    fn with_spaces(spaces: Vec<SpaceRecord>) -> Self {
        Self {
            orgs: vec!["org-1".into()],
            spaces,
            ..Default::default()
        }
    }

    fn failing(status: u16) -> MirrorError {
        MirrorError::Api {
            status,
            message: "injected failure".into(),
        }
    }

    fn list_spaces_calls(&self) -> usize {
        self.calls.borrow().list_spaces.len()
    }

    fn created_titles(&self) -> Vec<String> {
        self.calls
            .borrow()
            .created
            .iter()
            .map(|(_, space)| space.title.clone())
            .collect()
    }

    fn created_parent_of(&self, title: &str) -> Option<String> {
        self.calls
            .borrow()
            .created
            .iter()
            .find(|(_, space)| space.title == title)
            .and_then(|(_, space)| space.parent.clone())
    }
}

impl AccountApi for FakeAccount {
    fn list_organizations(&self) -> Result<Vec<Organization>> {
        Ok(self
            .orgs
            .iter()
            .map(|id| Organization { id: id.clone() })
            .collect())
    }

    fn list_spaces(&self, org_id: &str, limit: usize) -> Result<Vec<SpaceRecord>> {
        self.calls
            .borrow_mut()
            .list_spaces
            .push((org_id.to_string(), limit));
        Ok(self.spaces.clone())
    }

    fn create_space(&self, org_id: &str, space: &NewSpace) -> Result<CreatedSpace> {
        if self.fail_create.contains(&space.title) {
            return Err(Self::failing(500));
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let new_id = format!("new-{id}");
        self.titles_by_new_id
            .borrow_mut()
            .insert(new_id.clone(), space.title.clone());
        self.calls
            .borrow_mut()
            .created
            .push((org_id.to_string(), space.clone()));
        Ok(CreatedSpace { id: new_id })
    }

    fn delete_space(&self, space_id: &str) -> Result<()> {
        self.calls.borrow_mut().deleted.push(space_id.to_string());
        if self.fail_delete.contains(space_id) {
            return Err(Self::failing(404));
        }
        Ok(())
    }

    fn export_to_repository(&self, space_id: &str, request: &ExportRequest) -> Result<()> {
        self.calls
            .borrow_mut()
            .exported
            .push((space_id.to_string(), request.clone()));
        if self.fail_export.contains(space_id) {
            return Err(Self::failing(502));
        }
        Ok(())
    }

    fn import_content(&self, space_id: &str, request: &ImportRequest) -> Result<()> {
        self.calls
            .borrow_mut()
            .imported
            .push((space_id.to_string(), request.clone()));
        let title = self
            .titles_by_new_id
            .borrow()
            .get(space_id)
            .cloned()
            .unwrap_or_default();
        if self.fail_import_content.contains(&title) {
            return Err(Self::failing(422));
        }
        Ok(())
    }
}

fn mirror() -> MirrorTarget {
    MirrorTarget::new("https://github.com/acme/docs", "ghp_token", "main")
}

fn three_spaces() -> Vec<SpaceRecord> {
    vec![
        SpaceRecord::new("s1", "Handbook", None),
        SpaceRecord::new("s2", "Runbooks", None),
        SpaceRecord::new("s3", "Guides", None),
    ]
}

#[test]
fn cache_miss_enumerates_once_and_persists_inventory() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path().join("out"));
    let account = FakeAccount::with_spaces(three_spaces());
    let mirror = mirror();

    assert!(cache.load().is_none());

    let orchestrator = Orchestrator::new(&account, &cache);
    let report = orchestrator.run(&Operation::Export(&mirror)).unwrap();
    assert_eq!(report.succeeded, 3);
    assert_eq!(account.list_spaces_calls(), 1);
    assert_eq!(
        account.calls.borrow().list_spaces[0],
        ("org-1".to_string(), 1000)
    );
    assert_eq!(
        cache.load(),
        Some(InventorySnapshot::new(three_spaces()))
    );

    // Second run is served from the cache.
    orchestrator.run(&Operation::Export(&mirror)).unwrap();
    assert_eq!(account.list_spaces_calls(), 1);
}

#[test]
fn cached_inventory_is_used_instead_of_live_listing() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let cached = InventorySnapshot::new(vec![SpaceRecord::new("old", "Archived", None)]);
    cache.save(&cached).unwrap();

    let account = FakeAccount::with_spaces(three_spaces());
    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Delete)
        .unwrap();

    assert_eq!(account.list_spaces_calls(), 0);
    assert_eq!(account.calls.borrow().deleted, vec!["old".to_string()]);
    assert_eq!(report.total, 1);
}

#[test]
fn refresh_replaces_cached_inventory() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    cache
        .save(&InventorySnapshot::new(vec![SpaceRecord::new("old", "Archived", None)]))
        .unwrap();

    let account = FakeAccount::with_spaces(three_spaces());
    let report = Orchestrator::new(&account, &cache)
        .refresh(true)
        .run(&Operation::Delete)
        .unwrap();

    assert_eq!(account.list_spaces_calls(), 1);
    assert_eq!(report.total, 3);
    assert_eq!(cache.load(), Some(InventorySnapshot::new(three_spaces())));
}

#[test]
fn corrupt_cache_falls_back_to_live_listing() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    std::fs::write(cache.path(), "not json").unwrap();

    let account = FakeAccount::with_spaces(three_spaces());
    let mirror = mirror();
    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Export(&mirror))
        .unwrap();

    assert_eq!(account.list_spaces_calls(), 1);
    assert_eq!(report.succeeded, 3);
    assert!(cache.load().is_some());
}

#[test]
fn export_sends_one_directory_per_space_title() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let account = FakeAccount::with_spaces(vec![SpaceRecord::new("s1", "Handbook", None)]);
    let mirror = mirror();

    Orchestrator::new(&account, &cache)
        .run(&Operation::Export(&mirror))
        .unwrap();

    let calls = account.calls.borrow();
    let (space_id, request) = &calls.exported[0];
    assert_eq!(space_id, "s1");
    assert_eq!(request.url, "https://ghp_token@github.com/acme/docs");
    assert_eq!(request.git_ref, "refs/heads/main");
    assert_eq!(request.commit_message, "Update to Handbook");
    assert_eq!(request.repo_project_directory, "Handbook");
    assert_eq!(request.git_info.provider, "github");
    assert_eq!(request.git_info.url, request.url);
}

#[test]
fn export_failure_is_isolated_to_one_space() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let mut account = FakeAccount::with_spaces(three_spaces());
    account.fail_export.insert("s2".into());
    let mirror = mirror();

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Export(&mirror))
        .unwrap();

    let attempted: Vec<String> = account
        .calls
        .borrow()
        .exported
        .iter()
        .map(|(id, _)| id.clone())
        .collect();
    assert_eq!(attempted, vec!["s1", "s2", "s3"]);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].space_id, "s2");
    assert_eq!(report.failures[0].title, "Runbooks");
    assert_eq!(report.failures[0].stage, Stage::Export);
    assert!(report.failures[0].message.contains("502"));
}

#[test]
fn delete_failure_is_isolated_to_one_space() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let mut account = FakeAccount::with_spaces(three_spaces());
    account.fail_delete.insert("s2".into());

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Delete)
        .unwrap();

    assert_eq!(account.calls.borrow().deleted, vec!["s1", "s2", "s3"]);
    assert_eq!(report.operation, OperationKind::Delete);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures[0].stage, Stage::Delete);
}

#[test]
fn import_create_failure_is_isolated_to_one_space() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let mut account = FakeAccount::with_spaces(three_spaces());
    account.fail_create.insert("Runbooks".into());
    let mirror = mirror();

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Import(&mirror))
        .unwrap();

    assert_eq!(account.created_titles(), vec!["Handbook", "Guides"]);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Create);
    assert_eq!(account.calls.borrow().imported.len(), 2);
}

#[test]
fn import_content_points_at_mirrored_directory() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let account = FakeAccount::with_spaces(vec![SpaceRecord::new("s1", "Handbook", None)]);
    let mirror = mirror();

    Orchestrator::new(&account, &cache)
        .run(&Operation::Import(&mirror))
        .unwrap();

    let calls = account.calls.borrow();
    assert_eq!(calls.created[0].0, "org-1");
    let (space_id, request) = &calls.imported[0];
    assert_eq!(space_id, "new-1");
    assert_eq!(request.url, "https://ghp_token@github.com/acme/docs/Handbook");
    assert_eq!(request.source, ImportSource::Markdown);
}

#[test]
fn child_listed_after_parent_gets_new_parent_id() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let account = FakeAccount::with_spaces(vec![
        SpaceRecord::new("a", "Root", None),
        SpaceRecord::new("b", "Child", Some("a")),
    ]);
    let mirror = mirror();

    let report = Orchestrator::new(&account, &cache)
        .import_order(ImportOrder::Snapshot)
        .run(&Operation::Import(&mirror))
        .unwrap();

    assert_eq!(account.created_parent_of("Root"), None);
    assert_eq!(account.created_parent_of("Child").as_deref(), Some("new-1"));
    assert_eq!(report.created[1].old_id, "b");
    assert_eq!(report.created[1].parent.as_deref(), Some("new-1"));
}

#[test]
fn snapshot_order_creates_early_child_without_parent() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let account = FakeAccount::with_spaces(vec![
        SpaceRecord::new("b", "Child", Some("a")),
        SpaceRecord::new("a", "Root", None),
    ]);
    let mirror = mirror();

    let report = Orchestrator::new(&account, &cache)
        .import_order(ImportOrder::Snapshot)
        .run(&Operation::Import(&mirror))
        .unwrap();

    assert_eq!(account.created_titles(), vec!["Child", "Root"]);
    assert_eq!(account.created_parent_of("Child"), None);
    assert_eq!(report.succeeded, 2);
}

#[test]
fn parents_first_order_closes_the_gap() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let account = FakeAccount::with_spaces(vec![
        SpaceRecord::new("c", "Grandchild", Some("b")),
        SpaceRecord::new("b", "Child", Some("a")),
        SpaceRecord::new("a", "Root", None),
    ]);
    let mirror = mirror();

    Orchestrator::new(&account, &cache)
        .run(&Operation::Import(&mirror))
        .unwrap();

    assert_eq!(account.created_titles(), vec!["Root", "Child", "Grandchild"]);
    assert_eq!(account.created_parent_of("Root"), None);
    assert_eq!(account.created_parent_of("Child").as_deref(), Some("new-1"));
    assert_eq!(account.created_parent_of("Grandchild").as_deref(), Some("new-2"));
}

#[test]
fn content_failure_still_lets_children_attach() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let mut account = FakeAccount::with_spaces(vec![
        SpaceRecord::new("a", "Root", None),
        SpaceRecord::new("b", "Child", Some("a")),
    ]);
    account.fail_import_content.insert("Root".into());
    let mirror = mirror();

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Import(&mirror))
        .unwrap();

    assert_eq!(account.created_parent_of("Child").as_deref(), Some("new-1"));
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failures[0].space_id, "a");
    assert_eq!(report.failures[0].stage, Stage::ImportContent);
    assert_eq!(report.created.len(), 2);
}

#[test]
fn failed_parent_leaves_child_at_top_level() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let mut account = FakeAccount::with_spaces(vec![
        SpaceRecord::new("a", "Root", None),
        SpaceRecord::new("b", "Child", Some("a")),
    ]);
    account.fail_create.insert("Root".into());
    let mirror = mirror();

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Import(&mirror))
        .unwrap();

    assert_eq!(account.created_titles(), vec!["Child"]);
    assert_eq!(account.created_parent_of("Child"), None);
    assert_eq!(report.succeeded, 1);
}

#[test]
fn importing_twice_creates_duplicates() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let account = FakeAccount::with_spaces(vec![
        SpaceRecord::new("a", "Root", None),
        SpaceRecord::new("b", "Child", Some("a")),
    ]);
    let mirror = mirror();
    let orchestrator = Orchestrator::new(&account, &cache);

    let first = orchestrator.run(&Operation::Import(&mirror)).unwrap();
    let second = orchestrator.run(&Operation::Import(&mirror)).unwrap();

    assert_eq!(account.created_titles(), vec!["Root", "Child", "Root", "Child"]);
    let first_ids: HashSet<&str> = first.created.iter().map(|c| c.new_id.as_str()).collect();
    let second_ids: HashSet<&str> = second.created.iter().map(|c| c.new_id.as_str()).collect();
    assert!(first_ids.is_disjoint(&second_ids));
    assert_eq!(second.created[1].parent.as_deref(), Some("new-3"));
}

#[test]
fn empty_inventory_makes_no_remote_changes() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path().join("out"));
    let account = FakeAccount::with_spaces(vec![]);
    let mirror = mirror();
    let orchestrator = Orchestrator::new(&account, &cache);

    for operation in [
        Operation::Export(&mirror),
        Operation::Import(&mirror),
        Operation::Delete,
    ] {
        let report = orchestrator.run(&operation).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.operation, operation.kind());
        assert!(!report.has_failures());
    }

    let calls = account.calls.borrow();
    assert!(calls.created.is_empty());
    assert!(calls.exported.is_empty());
    assert!(calls.deleted.is_empty());
    assert!(calls.imported.is_empty());
    // Nothing worth caching, so every run enumerates again.
    assert_eq!(calls.list_spaces.len(), 3);
    assert!(!cache.path().exists());
}

#[test]
fn account_without_organizations_is_an_empty_inventory() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    let account = FakeAccount::default();

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Delete)
        .unwrap();

    assert_eq!(report.total, 0);
    assert_eq!(account.list_spaces_calls(), 0);
}

#[test]
fn import_without_organization_aborts_before_creating() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path());
    cache
        .save(&InventorySnapshot::new(three_spaces()))
        .unwrap();
    let account = FakeAccount::default();
    let mirror = mirror();

    let err = Orchestrator::new(&account, &cache)
        .run(&Operation::Import(&mirror))
        .unwrap_err();

    assert!(matches!(err, MirrorError::NoOrganizations));
    assert!(account.calls.borrow().created.is_empty());
}

#[test]
fn unwritable_cache_still_runs_the_operation() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();
    let cache = InventoryCache::new(blocker.join("out"));
    let account = FakeAccount::with_spaces(three_spaces());

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Delete)
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(account.calls.borrow().deleted, vec!["s1", "s2", "s3"]);
    assert!(!cache.path().exists());
    assert!(cache.load().is_none());
}

#[test]
fn listing_at_the_page_ceiling_is_used_and_cached_as_is() {
    let dir = tempdir().unwrap();
    let cache = InventoryCache::new(dir.path().join("out"));
    let spaces = (0..SPACE_LIST_LIMIT)
        .map(|i| SpaceRecord::new(format!("s{i}"), format!("Space {i}"), None))
        .collect();
    let account = FakeAccount::with_spaces(spaces);
    let mirror = mirror();

    let report = Orchestrator::new(&account, &cache)
        .run(&Operation::Export(&mirror))
        .unwrap();

    assert_eq!(report.total, SPACE_LIST_LIMIT);
    assert_eq!(report.succeeded, SPACE_LIST_LIMIT);
    assert_eq!(
        account.calls.borrow().list_spaces,
        vec![("org-1".to_string(), SPACE_LIST_LIMIT)]
    );
    assert_eq!(cache.load().unwrap().len(), SPACE_LIST_LIMIT);
}
