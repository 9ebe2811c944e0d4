use std::path::PathBuf;
use std::sync::Arc;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use services::{Clock, ObservationLoopService};
use storage::repository::InMemoryRecordStore;
use usability_core::time::fixed_now;

use crate::context::{UiApp, build_app_context};
use crate::views::{HistoryView, ObservationView};
use crate::vm::ObservationVm;

#[derive(Clone)]
struct TestApp {
    observation: Arc<ObservationLoopService>,
}

impl UiApp for TestApp {
    fn observation(&self) -> Arc<ObservationLoopService> {
        Arc::clone(&self.observation)
    }

    fn export_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Observe,
    History,
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    view: ViewKind,
    vm: ObservationVm,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    use_context_provider(|| build_app_context(&app));
    use_context_provider(|| props.view);
    let vm = props.vm.clone();
    use_context_provider(move || Signal::new(vm));
    rsx! { Router::<TestRoute> {} }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    let view = use_context::<ViewKind>();
    match view {
        ViewKind::Observe => rsx! { ObservationView {} },
        ViewKind::History => rsx! { HistoryView {} },
    }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub journal: InMemoryRecordStore,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            self.dom.wait_for_work(),
        )
        .await;
        self.dom.render_immediate(&mut NoOpMutations);
        self.dom.process_events();
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

pub fn test_service(journal: &InMemoryRecordStore) -> Arc<ObservationLoopService> {
    Arc::new(ObservationLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(journal.clone()),
    ))
}

/// Build a harness whose shared run state starts as `vm`.
pub fn setup_view_harness(
    view: ViewKind,
    journal: InMemoryRecordStore,
    vm: ObservationVm,
) -> ViewHarness {
    let app = Arc::new(TestApp {
        observation: test_service(&journal),
    });
    let dom = VirtualDom::new_with_props(ViewRouterHarness, ViewHarnessProps { app, view, vm });
    ViewHarness { dom, journal }
}
