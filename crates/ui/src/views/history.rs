use dioxus::prelude::*;

use crate::context::AppContext;
use crate::views::record_table::RecordTable;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::{RecordRowVm, map_record_rows};

const JOURNAL_LIMIT: u32 = 500;

#[derive(Clone, Debug, PartialEq)]
struct JournalData {
    rows: Vec<RecordRowVm>,
}

#[component]
pub fn HistoryView() -> Element {
    let ctx = use_context::<AppContext>();
    let observation = ctx.observation();

    let mut resource = use_resource(move || {
        let observation = observation.clone();
        async move {
            let rows = observation
                .journal_rows(None, JOURNAL_LIMIT)
                .await
                .map_err(|err| ViewError::from(&err))?;
            Ok(JournalData {
                rows: map_record_rows(&rows),
            })
        }
    });

    let state = view_state_from_resource(&resource);

    rsx! {
        div { class: "page",
            h2 { "Journal" }
            button {
                r#type: "button",
                onclick: move |_| resource.restart(),
                "Refresh"
            }

            match state {
                ViewState::Idle => rsx! {
                    p { "Idle" }
                },
                ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
                ViewState::Ready(data) => rsx! {
                    if data.rows.is_empty() {
                        p { "No steps recorded yet." }
                    } else {
                        p { "Journaled steps: {data.rows.len()}" }
                        RecordTable { rows: data.rows }
                    }
                },
                ViewState::Error(err) => rsx! {
                    p { "{err.message()}" }
                },
            }
        }
    }
}
