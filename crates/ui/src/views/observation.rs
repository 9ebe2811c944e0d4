use dioxus::prelude::*;
use usability_core::model::StepStatus;

use crate::context::AppContext;
use crate::views::ViewError;
use crate::views::record_table::RecordTable;
use crate::vm::{ObservationVm, StepForm, write_export};

const DEFAULT_CONFIG: &str = "3, 3, 4, 3, 5";

#[component]
pub fn ObservationView() -> Element {
    let ctx = use_context::<AppContext>();
    let vm = use_context::<Signal<ObservationVm>>();
    let mut config_text = use_signal(|| DEFAULT_CONFIG.to_string());
    let mut guide_text = use_signal(String::new);
    let mut form = use_signal(StepForm::default);
    let error = use_signal(|| None::<ViewError>);
    let busy = use_signal(|| false);
    let export_note = use_signal(|| None::<String>);

    let on_start = {
        let observation = ctx.observation();
        use_callback(move |()| {
            let observation = observation.clone();
            let mut vm = vm;
            let mut error = error;
            let mut busy = busy;
            let mut form = form;
            let mut export_note = export_note;
            let config = config_text();
            let guide = guide_text();
            spawn(async move {
                busy.set(true);
                let mut local = std::mem::take(&mut *vm.write());
                let result = local.start(&observation, &config, &guide).await;
                // Always put the session back so the UI remains usable even after errors.
                *vm.write() = local;
                busy.set(false);
                match result {
                    Ok(()) => {
                        error.set(None);
                        export_note.set(None);
                        form.set(StepForm::default());
                    }
                    Err(err) => error.set(Some(err)),
                }
            });
        })
    };

    let on_record = {
        let observation = ctx.observation();
        use_callback(move |()| {
            let observation = observation.clone();
            let mut vm = vm;
            let mut error = error;
            let mut busy = busy;
            let mut form = form;
            let current = form();
            spawn(async move {
                busy.set(true);
                let mut local = std::mem::take(&mut *vm.write());
                let result = local.record(&observation, &current).await;
                *vm.write() = local;
                busy.set(false);
                match result {
                    Ok(_) => {
                        error.set(None);
                        form.set(StepForm::default());
                    }
                    Err(err) => error.set(Some(err)),
                }
            });
        })
    };

    let on_retry = {
        let observation = ctx.observation();
        use_callback(move |()| {
            let observation = observation.clone();
            let mut vm = vm;
            let mut error = error;
            let mut busy = busy;
            spawn(async move {
                busy.set(true);
                let mut local = std::mem::take(&mut *vm.write());
                let result = local.retry(&observation).await;
                *vm.write() = local;
                busy.set(false);
                error.set(result.err());
            });
        })
    };

    let on_export = {
        let observation = ctx.observation();
        let export_dir = ctx.export_dir();
        use_callback(move |()| {
            let export = vm.read().export(&observation);
            let export_dir = export_dir.clone();
            let mut error = error;
            let mut export_note = export_note;
            spawn(async move {
                match write_export(&export_dir, &export).await {
                    Ok(path) => {
                        error.set(None);
                        export_note.set(Some(path.display().to_string()));
                    }
                    Err(err) => error.set(Some(err)),
                }
            });
        })
    };

    let vm_guard = vm.read();
    let position = vm_guard.position();
    let rows = vm_guard.rows();
    let summary = vm_guard.summary();
    let notices = vm_guard.notices().to_vec();
    let pending = vm_guard.pending_count();
    let is_active = vm_guard.is_active();
    drop(vm_guard);

    let current_form = form();
    let status_value = current_form.status.as_str();
    let is_busy = busy();
    let start_label = if is_active { "Restart run" } else { "Start run" };

    rsx! {
        div { class: "page observe-page",
            h2 { "Usability Observation" }

            if let Some(err) = error() {
                p { class: "error", role: "alert", "{err.message()}" }
            }
            for notice in notices {
                p { class: "notice", "{notice}" }
            }
            if pending > 0 {
                div { class: "pending",
                    p { "{pending} rows waiting for remote storage." }
                    button {
                        r#type: "button",
                        disabled: is_busy,
                        onclick: move |_| on_retry.call(()),
                        "Retry upload"
                    }
                }
            }

            match position {
                Some(position) => rsx! {
                    section { class: "run",
                        header { class: "run__header",
                            h3 { "{position.task_label}" }
                            p { class: "run__page", "{position.page_label}" }
                            p { class: "run__progress", "{position.progress_label}" }
                        }
                        blockquote { class: "run__instruction", "{position.instruction}" }
                        div { class: "run__form",
                            label { "Status"
                                select {
                                    value: "{status_value}",
                                    onchange: move |evt| {
                                        if let Ok(status) = evt.value().parse::<StepStatus>() {
                                            form.write().status = status;
                                        }
                                    },
                                    option { value: "SUCCESS", "Success" }
                                    option { value: "FAILURE", "Failure" }
                                }
                            }
                            label { "Total clicks"
                                input {
                                    r#type: "number",
                                    min: "0",
                                    value: "{current_form.total_clicks}",
                                    oninput: move |evt| form.write().total_clicks = evt.value(),
                                }
                            }
                            label { "Wasted clicks"
                                input {
                                    r#type: "number",
                                    min: "0",
                                    value: "{current_form.wasted_clicks}",
                                    oninput: move |evt| form.write().wasted_clicks = evt.value(),
                                }
                            }
                            label { "Errors"
                                input {
                                    r#type: "number",
                                    min: "0",
                                    value: "{current_form.error_count}",
                                    oninput: move |evt| form.write().error_count = evt.value(),
                                }
                            }
                            button {
                                class: "primary",
                                r#type: "button",
                                disabled: is_busy,
                                onclick: move |_| on_record.call(()),
                                "Save & Next"
                            }
                        }
                    }
                },
                None => rsx! {
                    p { class: "idle", "No run in progress." }
                },
            }

            section { class: "setup",
                label { "Pages per task"
                    input {
                        r#type: "text",
                        value: "{config_text}",
                        oninput: move |evt| config_text.set(evt.value()),
                    }
                }
                label { "Scenario guide (one \"task-page : instruction\" per line)"
                    textarea {
                        rows: "5",
                        value: "{guide_text}",
                        oninput: move |evt| guide_text.set(evt.value()),
                    }
                }
                button {
                    r#type: "button",
                    disabled: is_busy,
                    onclick: move |_| on_start.call(()),
                    "{start_label}"
                }
            }

            if let Some(summary) = summary {
                section { class: "summary",
                    h3 { "Run complete" }
                    p {
                        "Steps: {summary.steps} | Success: {summary.successes} | Failure: {summary.failures} | Time: {summary.elapsed}"
                    }
                    p {
                        "Clicks: {summary.total_clicks} | Wasted: {summary.wasted_clicks} | Errors: {summary.errors}"
                    }
                }
            }

            if !rows.is_empty() {
                section { class: "records-section",
                    h3 { "Recorded steps" }
                    RecordTable { rows }
                    button {
                        r#type: "button",
                        onclick: move |_| on_export.call(()),
                        "Export CSV"
                    }
                    if let Some(path) = export_note() {
                        p { class: "export-note", "Saved to {path}" }
                    }
                }
            }
        }
    }
}
