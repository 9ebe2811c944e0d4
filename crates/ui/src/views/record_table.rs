use dioxus::prelude::*;

use crate::vm::RecordRowVm;

#[component]
pub fn RecordTable(rows: Vec<RecordRowVm>) -> Element {
    let show_session = rows.iter().any(|row| row.session.is_some());
    rsx! {
        table { class: "records",
            thead {
                tr {
                    if show_session {
                        th { "Session" }
                    }
                    th { "Task" }
                    th { "Page" }
                    th { "Status" }
                    th { "Duration" }
                    th { "Clicks" }
                    th { "Wasted" }
                    th { "Errors" }
                    th { "Time" }
                }
            }
            tbody {
                for row in rows {
                    tr { class: if row.is_success { "ok" } else { "failed" },
                        if show_session {
                            td { {row.session.clone().unwrap_or_default()} }
                        }
                        td { "{row.task}" }
                        td { "{row.page}" }
                        td { "{row.status}" }
                        td { "{row.duration}" }
                        td { "{row.total_clicks}" }
                        td { "{row.wasted_clicks}" }
                        td { "{row.error_count}" }
                        td { "{row.timestamp}" }
                    }
                }
            }
        }
    }
}
