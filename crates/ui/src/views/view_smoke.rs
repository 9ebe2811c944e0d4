use storage::repository::{InMemoryRecordStore, RecordRepository};

use super::test_harness::{ViewKind, setup_view_harness, test_service};
use crate::vm::{ObservationVm, StepForm};

#[tokio::test(flavor = "current_thread")]
async fn observation_view_smoke_renders_setup_when_idle() {
    let mut harness =
        setup_view_harness(ViewKind::Observe, InMemoryRecordStore::new(), ObservationVm::new());
    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("No run in progress."), "missing idle text in {html}");
    assert!(html.contains("Start run"), "missing start button in {html}");
    assert!(html.contains("Pages per task"), "missing config field in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn observation_view_smoke_renders_current_page() {
    let journal = InMemoryRecordStore::new();
    let service = test_service(&journal);
    let mut vm = ObservationVm::new();
    vm.start(&service, "2, 3", "1-2 : Open the search page")
        .await
        .unwrap();
    vm.record(&service, &StepForm::default()).await.unwrap();

    let mut harness = setup_view_harness(ViewKind::Observe, journal, vm);
    harness.rebuild();
    let html = harness.render();
    for expected in [
        "Task 1 of 2",
        "Page 2 of 2",
        "Step 2 of 5",
        "Open the search page",
        "Next",
        "Restart run",
        "Recorded steps",
    ] {
        assert!(html.contains(expected), "missing {expected} in {html}");
    }
}

#[tokio::test(flavor = "current_thread")]
async fn observation_view_smoke_renders_summary_after_last_page() {
    let journal = InMemoryRecordStore::new();
    let service = test_service(&journal);
    let mut vm = ObservationVm::new();
    vm.start(&service, "1", "").await.unwrap();
    vm.record(&service, &StepForm::default()).await.unwrap();

    let mut harness = setup_view_harness(ViewKind::Observe, journal, vm);
    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("Run complete"), "missing summary in {html}");
    assert!(html.contains("Export CSV"), "missing export button in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn history_view_smoke_lists_journaled_rows() {
    let journal = InMemoryRecordStore::new();
    let service = test_service(&journal);
    let mut vm = ObservationVm::new();
    vm.start(&service, "2", "").await.unwrap();
    vm.record(&service, &StepForm::default()).await.unwrap();

    let mut harness = setup_view_harness(ViewKind::History, journal, ObservationVm::new());
    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();
    assert!(html.contains("Journaled steps: 1"), "missing row count in {html}");
    assert!(html.contains("SUCCESS"), "missing row status in {html}");
    assert_eq!(harness.journal.list_rows(None, 10).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn history_view_smoke_renders_empty_journal() {
    let mut harness =
        setup_view_harness(ViewKind::History, InMemoryRecordStore::new(), ObservationVm::new());
    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();
    assert!(html.contains("No steps recorded yet."), "missing empty text in {html}");
}
