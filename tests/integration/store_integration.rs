//! Repository contract, checked against both implementations.

use orgtree::store::{
    InMemoryNodeRepository, NodeRepository, NodeUpsert, ParentRef, SledNodeRepository, UpsertKind,
};
use orgtree::tree::FlatNode;
use std::sync::Arc;
use tempfile::TempDir;

fn repositories(temp: &TempDir) -> Vec<Arc<dyn NodeRepository>> {
    vec![
        Arc::new(InMemoryNodeRepository::new("contract")),
        Arc::new(SledNodeRepository::open(&temp.path().join("store"), "contract").unwrap()),
    ]
}

fn upsert(repo: &dyn NodeRepository, node: FlatNode, parent: ParentRef) -> UpsertKind {
    repo.upsert(&NodeUpsert::from_flat(&node, parent)).unwrap().kind
}

#[test]
fn upsert_is_keyed_by_external_id() {
    let temp = TempDir::new().unwrap();
    for repo in repositories(&temp) {
        let repo = repo.as_ref();
        assert_eq!(upsert(repo, FlatNode::root("1", "Root"), ParentRef::Root), UpsertKind::Created);
        assert_eq!(upsert(repo, FlatNode::root("1", "Root"), ParentRef::Root), UpsertKind::Unchanged);
        assert_eq!(
            upsert(repo, FlatNode::root("1", "Renamed"), ParentRef::Root),
            UpsertKind::Updated
        );

        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 1, "scope {}", repo.scope());
        assert_eq!(all[0].name, "Renamed");
        assert_eq!(all[0].internal_id, 1);
    }
}

#[test]
fn pending_parent_keeps_link_only_while_parent_is_unchanged() {
    let temp = TempDir::new().unwrap();
    for repo in repositories(&temp) {
        let repo = repo.as_ref();
        upsert(repo, FlatNode::root("1", "Root"), ParentRef::Root);
        upsert(repo, FlatNode::root("5", "Other root"), ParentRef::Root);
        upsert(repo, FlatNode::child("2", "Child", "1"), ParentRef::Linked(1));

        upsert(repo, FlatNode::child("2", "Child v2", "1"), ParentRef::Pending);
        let child = repo.find_by_external_id("2").unwrap().unwrap();
        assert_eq!(child.parent_internal_id, Some(1));

        upsert(repo, FlatNode::child("2", "Child v2", "5"), ParentRef::Pending);
        let child = repo.find_by_external_id("2").unwrap().unwrap();
        assert_eq!(child.parent_internal_id, None);
        assert_eq!(child.parent_external_id, "5");
    }
}

#[test]
fn children_and_tree_listing_agree() {
    let temp = TempDir::new().unwrap();
    for repo in repositories(&temp) {
        let repo = repo.as_ref();
        upsert(repo, FlatNode::root("1", "Root"), ParentRef::Root);
        upsert(repo, FlatNode::child("2", "A", "1"), ParentRef::Linked(1));
        upsert(repo, FlatNode::child("3", "B", "1"), ParentRef::Linked(1));
        upsert(repo, FlatNode::child("4", "A1", "2"), ParentRef::Linked(2));

        let children: Vec<String> = repo
            .find_children_by_parent_external_id("1")
            .unwrap()
            .into_iter()
            .map(|n| n.external_id)
            .collect();
        assert_eq!(children, vec!["2", "3"]);

        let listing: Vec<(String, usize)> = repo
            .list_tree(Some("1"), 0)
            .unwrap()
            .into_iter()
            .map(|e| (e.node.external_id, e.depth))
            .collect();
        assert_eq!(
            listing,
            vec![
                ("1".to_string(), 0),
                ("2".to_string(), 1),
                ("4".to_string(), 2),
                ("3".to_string(), 1)
            ]
        );
    }
}

#[test]
fn delete_all_only_touches_own_scope() {
    let temp = TempDir::new().unwrap();
    let db = sled::open(temp.path().join("store")).unwrap();
    let a = SledNodeRepository::from_db(db.clone(), "a").unwrap();
    let b = SledNodeRepository::from_db(db, "b").unwrap();

    upsert(&a, FlatNode::root("1", "A root"), ParentRef::Root);
    upsert(&b, FlatNode::root("1", "B root"), ParentRef::Root);
    upsert(&b, FlatNode::child("2", "B child", "1"), ParentRef::Linked(1));

    assert_eq!(b.delete_all().unwrap(), 2);
    assert!(b.list_all().unwrap().is_empty());
    assert_eq!(a.list_all().unwrap().len(), 1);
}
