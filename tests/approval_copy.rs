mod common;

use common::{Fixture, PROJECT};
use zone_transfer::approval::{
    ApprovalEntity, ApprovalRequest, CopyStatus, EntityType, ReviewStatus,
};
use zone_transfer::walker::TerminalAction;
use zone_transfer::{run_job, JobRequest, Node};

fn entity(id: &str, node: &Node, status: ReviewStatus) -> ApprovalEntity {
    ApprovalEntity {
        id: id.to_string(),
        request_id: "req-1".into(),
        entity_geid: node.geid.clone(),
        entity_type: if node.is_folder() { EntityType::Folder } else { EntityType::File },
        review_status: status,
        parent_geid: None,
        copy_status: CopyStatus::Pending,
        name: Some(node.name.clone()),
    }
}

fn request() -> ApprovalRequest {
    ApprovalRequest {
        id: "req-1".into(),
        project_code: PROJECT.into(),
        requested_by: "reviewer".into(),
        destination_geid: None,
    }
}

fn approval_copy(src: &str, dst: &str) -> JobRequest {
    JobRequest::new(TerminalAction::ApprovalCopy, src, PROJECT, "admin")
        .with_destination(dst)
        .with_approval_request("req-1")
}

#[test]
fn only_approved_files_are_copied() {
    let fx = Fixture::new();
    let (a, x, b, y) = fx.tree_a();
    fx.approvals.add_request(
        request(),
        vec![
            entity("e-a", &a, ReviewStatus::Pending),
            entity("e-x", &x, ReviewStatus::Approved),
            entity("e-b", &b, ReviewStatus::Pending),
            entity("e-y", &y, ReviewStatus::Denied),
        ],
    );

    let summary = run_job(&fx.config, fx.services(), approval_copy(&a.geid, &fx.core_home.geid)).unwrap();
    assert_eq!(summary.report.files_copied, 1);
    assert!(fx.core_node("admin/A/x.txt").is_some());
    // B is on the approval path, so it is created even though y.txt was denied.
    assert!(fx.core_node("admin/A/B").is_some());
    assert!(fx.core_node("admin/A/B/y.txt").is_none());

    assert_eq!(fx.approvals.entity("e-x").unwrap().copy_status, CopyStatus::Copied);
    // A and B were only passed through; their review is still pending.
    assert_eq!(fx.approvals.entity("e-a").unwrap().copy_status, CopyStatus::Pending);
    assert_eq!(fx.approvals.entity("e-b").unwrap().copy_status, CopyStatus::Pending);
    assert_eq!(fx.approvals.entity("e-y").unwrap().copy_status, CopyStatus::Pending);
    assert!(!fx.node(&y.geid).has_system_tag("copied-to-core"));
    assert!(fx.node(&x.geid).has_system_tag("copied-to-core"));

    let doc = &fx.metadata.indexed().into_iter().find(|d| d.data_type == "File").unwrap();
    assert_eq!(doc.process_pipeline, "data_transfer_approved");
}

#[test]
fn folders_off_the_approval_path_are_skipped() {
    let fx = Fixture::new();
    let (a, x, b, _y) = fx.tree_a();
    fx.approvals.add_request(
        request(),
        vec![entity("e-a", &a, ReviewStatus::Pending), entity("e-x", &x, ReviewStatus::Approved)],
    );

    run_job(&fx.config, fx.services(), approval_copy(&a.geid, &fx.core_home.geid)).unwrap();
    assert!(fx.core_node("admin/A/B").is_none());
    assert!(fx.locks.acquired().iter().all(|r| !r.key.ends_with("/B")));
    assert!(!fx.node(&b.geid).has_system_tag("copied-to-core"));
}

#[test]
fn unlisted_root_is_a_configuration_error() {
    let fx = Fixture::new();
    let (a, x, ..) = fx.tree_a();
    fx.approvals.add_request(request(), vec![entity("e-x", &x, ReviewStatus::Approved)]);

    let err = run_job(&fx.config, fx.services(), approval_copy(&a.geid, &fx.core_home.geid)).unwrap_err();
    assert_eq!(err.code(), "configuration_error");
    assert!(fx.locks.acquired().is_empty());
    assert!(fx.core_node("admin/A").is_none());
}

#[test]
fn missing_request_is_a_configuration_error() {
    let fx = Fixture::new();
    let f = fx.file(&fx.gr_home, "a.txt", 1);
    let err = run_job(&fx.config, fx.services(), approval_copy(&f.geid, &fx.core_home.geid)).unwrap_err();
    assert_eq!(err.code(), "configuration_error");
    assert!(err.to_string().contains("req-1"));
}

#[test]
fn denied_folder_is_not_traversed_or_marked() {
    let fx = Fixture::new();
    let (a, x, b, y) = fx.tree_a();
    fx.approvals.add_request(
        request(),
        vec![
            entity("e-a", &a, ReviewStatus::Approved),
            entity("e-x", &x, ReviewStatus::Approved),
            entity("e-b", &b, ReviewStatus::Denied),
            entity("e-y", &y, ReviewStatus::Approved),
        ],
    );

    let summary = run_job(&fx.config, fx.services(), approval_copy(&a.geid, &fx.core_home.geid)).unwrap();
    assert_eq!(summary.report.files_copied, 1);
    assert!(fx.core_node("admin/A/B").is_none());
    assert!(fx.core_node("admin/A/B/y.txt").is_none());

    assert_eq!(fx.approvals.entity("e-a").unwrap().copy_status, CopyStatus::Copied);
    assert_eq!(fx.approvals.entity("e-x").unwrap().copy_status, CopyStatus::Copied);
    assert_eq!(fx.approvals.entity("e-b").unwrap().copy_status, CopyStatus::Pending);
    assert_eq!(fx.approvals.entity("e-y").unwrap().copy_status, CopyStatus::Pending);
}
