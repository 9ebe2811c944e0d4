mod history;
mod observation;
mod record_table;
mod state;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use history::HistoryView;
pub use observation::ObservationView;
pub use state::{ViewError, ViewState, view_state_from_resource};
