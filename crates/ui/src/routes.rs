use dioxus::prelude::*;
use dioxus_router::{Link, Outlet, Routable};

use crate::views::{HistoryView, ObservationView};
use crate::vm::ObservationVm;

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Layout)]
        #[route("/", ObservationView)] Observe {},
        #[route("/history", HistoryView)] History {},
}

#[component]
fn Layout() -> Element {
    // The run outlives route changes, so its state lives above the outlet.
    use_context_provider(|| Signal::new(ObservationVm::new()));
    rsx! {
        div { class: "app",
            Sidebar {}
            main { class: "content",
                Outlet::<Route> {}
            }
        }
    }
}

#[component]
fn Sidebar() -> Element {
    rsx! {
        nav { class: "sidebar",
            h1 { "Usability Logger" }
            ul {
                li { Link { to: Route::Observe {}, "Observe" } }
                li { Link { to: Route::History {}, "Journal" } }
            }
        }
    }
}
