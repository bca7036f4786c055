//! Plain-text rendering of the dashboard state.

use bedboard_core::HospitalRecord;

use crate::mirror::{HospitalMirror, ViewState};

const DETAIL_WIDTH: usize = 46;

/// Renders the full dashboard: hospital tabs plus the detail card for the
/// selected hospital. While the feed is failing, a persistent error panel
/// replaces the detail card; the tabs and their last-known data stay
/// visible until the next successful snapshot.
pub fn render(state: &ViewState) -> String {
    if state.hospitals.is_empty() {
        return match &state.feed_error {
            Some(message) => render_feed_error(message),
            None => "no hospital data available yet\n".to_string(),
        };
    }

    let mut out = String::new();
    out.push_str(&render_tabs(state));
    out.push('\n');
    if let Some(message) = &state.feed_error {
        out.push_str(&render_feed_error(message));
        return out;
    }
    match state.selected_record() {
        Some(record) => {
            let id = state.selected.as_deref().unwrap_or("");
            out.push_str(&render_detail(id, record));
        }
        None => out.push_str("select a hospital to see details\n"),
    }
    out
}

/// Persistent panel shown in place of the detail card while the feed is
/// down. The feed is not re-established automatically.
fn render_feed_error(message: &str) -> String {
    format!(
        "{}\n!  live feed unavailable: {message}\n!  updates paused; hospital list shows last known data\n{}\n",
        "!".repeat(DETAIL_WIDTH),
        "!".repeat(DETAIL_WIDTH)
    )
}

/// One line listing every hospital in feed order, marking the selection.
fn render_tabs(state: &ViewState) -> String {
    let mut tabs = String::new();
    for (id, record) in &state.hospitals {
        let marker = if state.selected.as_deref() == Some(id.as_str()) {
            '*'
        } else {
            ' '
        };
        tabs.push_str(&format!("[{marker}{}] ", record.name));
    }
    tabs.trim_end().to_string()
}

fn render_detail(id: &str, record: &HospitalRecord) -> String {
    let level = record.occupancy();
    let mut out = String::new();
    out.push_str(&"-".repeat(DETAIL_WIDTH));
    out.push('\n');
    out.push_str(&format!("{} ({id})\n", record.name));
    out.push_str(&format!(
        "occupancy: {level} {}\n",
        occupancy_bar(record.occupied_er_beds, record.total_er_beds)
    ));
    out.push_str(&format!(
        "beds: {} available / {} total ({} occupied)\n",
        record.available_er_beds, record.total_er_beds, record.occupied_er_beds
    ));
    if record.specialists.is_empty() {
        out.push_str("specialists on duty: none listed\n");
    } else {
        out.push_str(&format!(
            "specialists on duty: {}\n",
            record.specialists.join(", ")
        ));
    }
    out.push_str(&"-".repeat(DETAIL_WIDTH));
    out.push('\n');
    out
}

/// Ten-slot text gauge, one `#` per 10% occupancy.
fn occupancy_bar(occupied: u32, total: u32) -> String {
    let filled = if total == 0 {
        0
    } else {
        // Round to nearest slot.
        ((u64::from(occupied) * 10 + u64::from(total) / 2) / u64::from(total)) as usize
    };
    let filled = filled.min(10);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(10 - filled))
}

/// Selects `id` on the mirror and renders the resulting view.
pub fn display_hospital_detail(mirror: &HospitalMirror, id: &str) -> String {
    mirror.select(id);
    render(&mirror.load())
}
