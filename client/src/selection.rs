use std::collections::HashSet;

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use fieldmap_shared::{BulkStatusUpdate, Status};

use crate::api;
use crate::app::MapState;
use crate::reload;

/// The set of stable feature keys selected while BulkSelect is active.
/// Lives for one mode activation; full reloads start it empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    ids: HashSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle membership; returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_owned());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

/// Synchronous validation before any request leaves the client.
pub fn validate_bulk(
    project: Option<&str>,
    selection: &SelectionSet,
    status: Option<Status>,
) -> Result<(), &'static str> {
    if project.is_none() {
        return Err("Select a project first");
    }
    if selection.is_empty() {
        return Err("No features selected");
    }
    if status.is_none() {
        return Err("Select a status to apply");
    }
    Ok(())
}

/// Submit one batched status update for the whole selection, report the
/// affected count, clear the set, and refresh from the server.
pub fn apply_bulk_update(state: MapState) {
    let project = state.project_id.get_untracked();
    let status = state.bulk_status.get_untracked();
    let selection = state.selection.get_untracked();

    if let Err(message) = validate_bulk(project.as_deref(), &selection, status) {
        state.bulk_message.set(Some(message.to_owned()));
        return;
    }
    let project = project.unwrap_or_default();
    let status = status.unwrap_or_default();

    let body = BulkStatusUpdate {
        feature_ids: selection.ids(),
        status,
    };

    spawn_local(async move {
        match api::bulk_update_status(&project, &body).await {
            Ok(result) => {
                state.bulk_message.set(Some(format!(
                    "{} feature{} updated",
                    result.updated,
                    if result.updated == 1 { "" } else { "s" }
                )));
                state.selection.update(|selection| selection.clear());
                state.bulk_status.set(None);
                reload::load_project_data(state, false);
            }
            Err(e) => {
                web_sys::console::warn_1(&format!("Bulk update failed: {e}").into());
                state.bulk_message.set(Some(format!("Bulk update failed: {e}")));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_membership() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle("a"));
        assert!(selection.contains("a"));
        assert_eq!(selection.len(), 1);

        assert!(!selection.toggle("a"));
        assert!(selection.is_empty());
    }

    #[test]
    fn clear_empties_the_set() {
        let mut selection = SelectionSet::new();
        selection.toggle("a");
        selection.toggle("b");
        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn validation_rejects_before_any_request() {
        let empty = SelectionSet::new();
        let mut populated = SelectionSet::new();
        populated.toggle("a");

        assert_eq!(
            validate_bulk(None, &populated, Some(Status::Approved)),
            Err("Select a project first")
        );
        assert_eq!(
            validate_bulk(Some("p1"), &empty, Some(Status::Approved)),
            Err("No features selected")
        );
        assert_eq!(
            validate_bulk(Some("p1"), &populated, None),
            Err("Select a status to apply")
        );
        assert_eq!(
            validate_bulk(Some("p1"), &populated, Some(Status::Approved)),
            Ok(())
        );
    }
}
