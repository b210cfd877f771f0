use crate::integration::support::{ScriptedFetcher, CHART, CHART_NODES, CHART_REORGANIZED};
use orgtree::concurrency::SyncLockManager;
use orgtree::config::DeferredConfig;
use orgtree::error::ApiError;
use orgtree::remote::FetchRequest;
use orgtree::store::{NodeRepository, SledNodeRepository};
use orgtree::sync::{DeferredImportQueue, SyncService};
use orgtree::tree::TreeBuilder;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn request() -> FetchRequest {
    FetchRequest::new("1", "9999").unwrap()
}

fn sled_service(
    temp: &TempDir,
    bodies: &[&str],
) -> (Arc<SledNodeRepository>, Arc<ScriptedFetcher>, SyncService) {
    let repo = Arc::new(SledNodeRepository::open(&temp.path().join("store"), "org_section").unwrap());
    let fetcher = Arc::new(ScriptedFetcher::new(bodies));
    let service = SyncService::new(fetcher.clone(), repo.clone());
    (repo, fetcher, service)
}

fn parent_of(repo: &SledNodeRepository, external_id: &str) -> Option<String> {
    let node = repo.find_by_external_id(external_id).unwrap().unwrap();
    let parent_id = node.parent_internal_id?;
    repo.list_all()
        .unwrap()
        .into_iter()
        .find(|n| n.internal_id == parent_id)
        .map(|n| n.external_id)
}

#[tokio::test]
async fn first_sync_creates_and_links_every_node() {
    let temp = TempDir::new().unwrap();
    let (repo, fetcher, service) = sled_service(&temp, &[CHART]);

    let summary = service.sync(&request()).await.unwrap();
    assert_eq!(summary.created, CHART_NODES);
    assert_eq!(summary.failed, 0);
    assert!(summary.orphaned.is_empty());
    assert_eq!(fetcher.requests(), vec!["00001/9999".to_string()]);

    assert_eq!(parent_of(&repo, "1"), None);
    assert_eq!(parent_of(&repo, "2").as_deref(), Some("1"));
    assert_eq!(parent_of(&repo, "21").as_deref(), Some("2"));
    assert_eq!(parent_of(&repo, "3").as_deref(), Some("1"));
    assert_eq!(parent_of(&repo, "32").as_deref(), Some("3"));

    let education = repo.find_by_external_id("3").unwrap().unwrap();
    assert_eq!(education.type_id, "12");
}

#[tokio::test]
async fn resync_is_idempotent_and_keeps_internal_ids() {
    let temp = TempDir::new().unwrap();
    let (repo, _, service) = sled_service(&temp, &[CHART]);

    service.sync(&request()).await.unwrap();
    let before = repo.list_all().unwrap();

    let summary = service.sync(&request()).await.unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, CHART_NODES);
    assert_eq!(summary.linked, 0);

    assert_eq!(repo.list_all().unwrap(), before);
}

#[tokio::test]
async fn reorganization_moves_and_renames_in_place() {
    let temp = TempDir::new().unwrap();
    let (repo, _, service) = sled_service(&temp, &[CHART, CHART_REORGANIZED]);

    service.sync(&request()).await.unwrap();
    let libraries = repo.find_by_external_id("32").unwrap().unwrap();

    let summary = service.sync(&request()).await.unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 2);
    assert_eq!(repo.list_all().unwrap().len(), CHART_NODES);

    let moved = repo.find_by_external_id("32").unwrap().unwrap();
    assert_eq!(moved.internal_id, libraries.internal_id);
    assert_eq!(moved.parent_external_id, "2");
    assert_eq!(parent_of(&repo, "32").as_deref(), Some("2"));

    let schools = repo.find_by_external_id("31").unwrap().unwrap();
    assert_eq!(schools.name, "Schools and Daycare");
}

#[tokio::test]
async fn nodes_survive_reopening_the_store() {
    let temp = TempDir::new().unwrap();
    {
        let (_, _, service) = sled_service(&temp, &[CHART]);
        service.sync(&request()).await.unwrap();
    }

    let repo = Arc::new(SledNodeRepository::open(&temp.path().join("store"), "org_section").unwrap());
    assert_eq!(repo.list_all().unwrap().len(), CHART_NODES);
    assert_eq!(parent_of(&repo, "31").as_deref(), Some("3"));
}

#[tokio::test]
async fn deferred_units_imported_out_of_order_are_linked_on_drain() {
    let temp = TempDir::new().unwrap();
    let (repo, _, service) = sled_service(&temp, &[CHART]);
    let queue = DeferredImportQueue::new(
        service.importer(),
        service.linker(),
        DeferredConfig::default(),
    );

    // One unit per node, children queued before their parents.
    let roots = orgtree::tree::parse_document(CHART).unwrap();
    let mut units: Vec<_> = orgtree::tree::Flatten::new(&roots)
        .map(orgtree::sync::DeferredImportUnit::new)
        .collect();
    units.reverse();
    for unit in units {
        queue.enqueue(unit).await.unwrap();
    }

    let result = queue.drain().await;
    assert_eq!(result.created, CHART_NODES);
    let relink = queue.take_last_relink().unwrap();
    assert!(relink.orphaned.is_empty());

    for (child, parent) in [("2", "1"), ("21", "2"), ("3", "1"), ("31", "3"), ("32", "3")] {
        assert_eq!(parent_of(&repo, child).as_deref(), Some(parent));
    }
}

#[tokio::test]
async fn scopes_sharing_a_lock_manager_do_not_block_each_other() {
    let temp = TempDir::new().unwrap();
    let db = sled::open(temp.path().join("store")).unwrap();
    let sections = Arc::new(SledNodeRepository::from_db(db.clone(), "org_section").unwrap());
    let archive = Arc::new(SledNodeRepository::from_db(db, "archive").unwrap());
    let locks = Arc::new(SyncLockManager::new());

    let held = locks.try_acquire("org_section").unwrap();
    let blocked = SyncService::offline(sections.clone()).with_locks(locks.clone());
    let free = SyncService::offline(archive.clone()).with_locks(locks.clone());

    assert!(matches!(
        blocked.import_raw(CHART),
        Err(ApiError::SyncInProgress(_))
    ));
    assert_eq!(free.import_raw(CHART).unwrap().created, CHART_NODES);
    drop(held);

    assert_eq!(blocked.import_raw(CHART).unwrap().created, CHART_NODES);
    assert_eq!(sections.list_all().unwrap().len(), CHART_NODES);
    assert_eq!(archive.list_all().unwrap().len(), CHART_NODES);
}

#[tokio::test]
async fn tree_view_skips_excluded_board_and_detaches_its_member() {
    let temp = TempDir::new().unwrap();
    let (repo, _, service) = sled_service(&temp, &[CHART]);
    service.sync(&request()).await.unwrap();

    let excluded: HashSet<String> = ["X".to_string()].into_iter().collect();
    let tree = TreeBuilder::new(repo)
        .build_tree(Some("1"), &excluded, 0)
        .unwrap();

    assert_eq!(tree.len(), 2);
    let ids: Vec<String> = tree[0]
        .walk()
        .into_iter()
        .map(|(_, n)| n.node.external_id.clone())
        .collect();
    assert_eq!(ids, vec!["1", "3", "31", "32"]);
    assert_eq!(tree[1].node.external_id, "21");
    assert_eq!(tree[1].node.parent_external_id, "2");
}
