mod common;

use common::{Fixture, PROJECT};
use zone_transfer::driver::run_transfer_job;
use zone_transfer::graph::{NodePatch, NodeRepository};
use zone_transfer::lock::{LockMode, LockRequest};
use zone_transfer::metadata::{MetadataEvent, MetadataStep};
use zone_transfer::walker::TerminalAction;
use zone_transfer::{run_job, JobRequest, NodeKind, ObjectKey, TransferJob};

fn copy(src: &str, dst: &str) -> JobRequest {
    JobRequest::new(TerminalAction::Copy, src, PROJECT, "admin").with_destination(dst)
}

#[test]
fn copies_folder_tree_and_only_tags_sources() {
    let fx = Fixture::new();
    let dest = fx.folder_in(zone_transfer::Zone::Core, &fx.core_home, "dest");
    let (a, x, b, y) = fx.tree_a();
    let before: Vec<_> = [&a, &x, &b, &y].iter().map(|n| fx.node(&n.geid)).collect();

    let summary = run_job(&fx.config, fx.services(), copy(&a.geid, &dest.geid)).unwrap();
    assert_eq!(summary.report.files_copied, 2);
    assert_eq!(summary.report.folders_created, 2);
    assert_eq!(summary.report.bytes_transferred, 4096);

    for (path, kind) in [
        ("admin/dest/A", NodeKind::Folder),
        ("admin/dest/A/x.txt", NodeKind::File),
        ("admin/dest/A/B", NodeKind::Folder),
        ("admin/dest/A/B/y.txt", NodeKind::File),
    ] {
        let n = fx.core_node(path).unwrap_or_else(|| panic!("{path} missing"));
        assert_eq!(n.kind, kind);
    }
    let copied_x = fx.core_node("admin/dest/A/x.txt").unwrap();
    assert_eq!(copied_x.object_key().unwrap(), &ObjectKey::new("core-proj", "admin/dest/A/x.txt"));
    assert_eq!(copied_x.file_size, 2048);
    assert_eq!(fx.graph.parent_of(&copied_x.geid).unwrap().display_path, "admin/dest/A");
    assert!(fx.blobs.contains(&ObjectKey::new("core-proj", "admin/dest/A/B/y.txt")));

    for old in before {
        let mut now = fx.node(&old.geid);
        assert!(now.has_system_tag("copied-to-core"), "{} not tagged", old.display_path);
        now.system_tags = old.system_tags.clone();
        assert_eq!(now, old);
    }
}

#[test]
fn file_metadata_follows_lineage_catalog_index_audit() {
    let fx = Fixture::new();
    let f = fx.file(&fx.gr_home, "a.txt", 10);
    run_job(&fx.config, fx.services(), copy(&f.geid, &fx.core_home.geid)).unwrap();

    let steps: Vec<_> = fx.metadata.events().iter().map(MetadataEvent::step).collect();
    assert_eq!(
        steps,
        vec![
            MetadataStep::Lineage,
            MetadataStep::CatalogEntity,
            MetadataStep::SearchIndex,
            MetadataStep::AuditLog
        ]
    );
    let doc = &fx.metadata.indexed()[0];
    assert!(!doc.atlas_guid.is_empty());
    assert_eq!(doc.process_pipeline, "data_transfer_folder");
    assert_eq!(doc.source_geid, f.geid);
    assert_eq!(doc.source_path, "Greenroom/admin/a.txt");
    assert_eq!(doc.uploader, "admin");
    let audit = fx
        .metadata
        .events()
        .into_iter()
        .find_map(|e| match e {
            MetadataEvent::Audit(a) => Some(a),
            _ => None,
        })
        .unwrap();
    assert_eq!(audit.target, "Greenroom/admin/a.txt");
    assert_eq!(audit.outcome, "Core/admin/a.txt");
}

#[test]
fn single_file_lock_order_is_source_then_destination() {
    let fx = Fixture::new();
    let f = fx.file(&fx.gr_home, "a.txt", 10);
    run_job(&fx.config, fx.services(), copy(&f.geid, &fx.core_home.geid)).unwrap();

    assert_eq!(
        fx.locks.acquired(),
        vec![
            LockRequest::read("gr-proj/admin/a.txt"),
            LockRequest::write("core-proj/admin/a.txt"),
        ]
    );
}

#[test]
fn folder_lock_order_visits_children_by_name() {
    let fx = Fixture::new();
    let dest = fx.folder_in(zone_transfer::Zone::Core, &fx.core_home, "dest");
    let (a, ..) = fx.tree_a();
    run_job(&fx.config, fx.services(), copy(&a.geid, &dest.geid)).unwrap();

    let keys: Vec<_> = fx
        .locks
        .acquired()
        .into_iter()
        .map(|r| format!("{} {}", r.mode, r.key))
        .collect();
    assert_eq!(
        keys,
        vec![
            "read gr-proj/admin/A",
            "write core-proj/admin/dest",
            "write core-proj/admin/dest/A",
            "read gr-proj/admin/A/B",
            "write core-proj/admin/dest/A/B",
            "read gr-proj/admin/A/B/y.txt",
            "write core-proj/admin/dest/A/B/y.txt",
            "read gr-proj/admin/A/x.txt",
            "write core-proj/admin/dest/A/x.txt",
        ]
    );
}

#[test]
fn name_folder_is_never_locked() {
    let fx = Fixture::new();
    let (_a, x, ..) = fx.tree_a();
    // Copy the whole greenroom home into the project root; core `admin` is reused.
    let summary = run_job(&fx.config, fx.services(), copy(&fx.gr_home.geid, &fx.project.geid)).unwrap();
    assert_eq!(summary.report.folders_reused, 1);
    assert_eq!(summary.report.root_geid.as_deref(), Some(fx.core_home.geid.as_str()));

    let acquired = fx.locks.acquired();
    assert!(acquired.iter().all(|r| r.key != "gr-proj/admin" && r.key != "core-proj/admin"));
    assert!(acquired.contains(&LockRequest::read("gr-proj/admin/A")));
    assert!(acquired.contains(&LockRequest::read(x.object_key().unwrap().to_string())));
    assert!(fx.core_node("admin/A/x.txt").is_some());
}

#[test]
fn archived_nodes_are_neither_copied_nor_locked() {
    let fx = Fixture::new();
    let dest = fx.folder_in(zone_transfer::Zone::Core, &fx.core_home, "dest");
    let (a, _x, b, _y) = fx.tree_a();
    let stale = fx.file(&a, "stale.txt", 5);
    fx.graph.update_fields(NodeKind::Folder, &b.geid, &NodePatch::archive()).unwrap();
    fx.graph.update_fields(NodeKind::File, &stale.geid, &NodePatch::archive()).unwrap();

    let summary = run_job(&fx.config, fx.services(), copy(&a.geid, &dest.geid)).unwrap();
    assert_eq!(summary.report.files_copied, 1);
    assert!(fx.core_node("admin/dest/A/B").is_none());
    assert!(fx.core_node("admin/dest/A/B/y.txt").is_none());
    assert!(fx.core_node("admin/dest/A/stale.txt").is_none());
    assert!(fx.locks.acquired().iter().all(|r| !r.key.contains("/B") && !r.key.contains("stale")));
    assert!(!fx.node(&b.geid).has_system_tag("copied-to-core"));
}

#[test]
fn archived_source_is_not_found() {
    let fx = Fixture::new();
    let f = fx.file(&fx.gr_home, "gone.txt", 1);
    fx.graph.update_fields(NodeKind::File, &f.geid, &NodePatch::archive()).unwrap();
    let err = run_job(&fx.config, fx.services(), copy(&f.geid, &fx.core_home.geid)).unwrap_err();
    assert_eq!(err.code(), "not_found");
    assert!(fx.locks.acquired().is_empty());
}

#[test]
fn rerun_renames_every_duplicate_with_one_timestamp() {
    let fx = Fixture::new();
    let dest = fx.folder_in(zone_transfer::Zone::Core, &fx.core_home, "dest");
    let (a, ..) = fx.tree_a();
    run_job(&fx.config, fx.services(), copy(&a.geid, &dest.geid)).unwrap();

    let job = TransferJob::with_timestamp(copy(&a.geid, &dest.geid), 1_700_000_000);
    let summary = run_transfer_job(&fx.config, fx.services(), &job).unwrap();
    assert_eq!(summary.report.folders_reused, 2);
    assert_eq!(summary.report.folders_created, 0);
    let mut renamed: Vec<_> = summary.report.renamed.iter().map(|r| r.destination.clone()).collect();
    renamed.sort();
    assert_eq!(
        renamed,
        vec![
            "admin/dest/A/B/y_1700000000.txt".to_string(),
            "admin/dest/A/x_1700000000.txt".to_string(),
        ]
    );
    assert!(fx.core_node("admin/dest/A/x_1700000000.txt").is_some());
    // The originals are untouched.
    assert!(fx.core_node("admin/dest/A/x.txt").is_some());
}

#[test]
fn root_can_be_renamed_at_destination() {
    let fx = Fixture::new();
    let (a, ..) = fx.tree_a();
    let req = copy(&a.geid, &fx.core_home.geid).with_rename("A-final");
    run_job(&fx.config, fx.services(), req).unwrap();
    assert!(fx.core_node("admin/A-final/x.txt").is_some());
    assert!(fx.core_node("admin/A").is_none());
}

#[test]
fn greenroom_destination_is_rejected() {
    let fx = Fixture::new();
    let f = fx.file(&fx.gr_home, "a.txt", 1);
    let err = run_job(&fx.config, fx.services(), copy(&f.geid, &fx.gr_home.geid)).unwrap_err();
    assert_eq!(err.code(), "configuration_error");
}

#[test]
fn objects_above_threshold_are_staged() {
    let mut fx = Fixture::new();
    fx.config.large_object_threshold = 1024;
    fx.config.staging_dir = fx.dir.path().join("staging");
    let (a, ..) = fx.tree_a();
    let summary = run_job(&fx.config, fx.services(), copy(&a.geid, &fx.core_home.geid)).unwrap();
    assert_eq!(summary.report.staged_transfers, 2);
    assert!(fx.blobs.contains(&ObjectKey::new("core-proj", "admin/A/B/y.txt")));
    let leftovers = std::fs::read_dir(&fx.config.staging_dir).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn plan_only_touches_nothing() {
    let fx = Fixture::new();
    let (a, ..) = fx.tree_a();
    let plan = zone_transfer::plan_job(&fx.config, fx.services(), copy(&a.geid, &fx.core_home.geid)).unwrap();
    assert_eq!(plan.files, 2);
    assert_eq!(plan.folders, 2);
    assert_eq!(plan.locks[0], LockRequest::new("gr-proj/admin/A", LockMode::Read));
    assert!(fx.locks.events().is_empty());
    assert!(fx.core_node("admin/A").is_none());
    assert!(fx.jobs.updates().is_empty());
}
