//! Section tools: create, delete, rename, reorder, list.

use crate::resolve::{
    SectionSelector, checked_index, int_arg, object_schema, out_of_range, resolve_section,
    section_selector_properties, str_arg,
};
use bentofolio_core::{Action, PortfolioStore, Tool, ToolError, ToolResult};
use serde_json::{Map, Value, json};
use tracing::debug;

pub struct CreateSectionTool;

impl Tool for CreateSectionTool {
    fn name(&self) -> &str {
        "create_section"
    }

    fn description(&self) -> &str {
        "Creates a new section in the portfolio with the given title."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        props.insert("title".into(), json!({ "type": "string", "description": "The title for the new section" }));
        object_schema(props, &["title"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let title = str_arg(arguments, "title").unwrap_or_default().trim();
        if title.is_empty() {
            return Ok(ToolResult::fail("Section title must not be empty."));
        }
        store.dispatch(Action::add_section(title));
        debug!(title, "Created section");
        let index = store.read(|s| s.sections.len().saturating_sub(1));
        Ok(ToolResult::ok(format!("Created section \"{title}\"")).with("sectionIndex", index))
    }
}

pub struct DeleteSectionTool;

impl Tool for DeleteSectionTool {
    fn name(&self) -> &str {
        "delete_section"
    }

    fn description(&self) -> &str {
        "Deletes a section and all of its cards. Identify it by title or index (0-based)."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        section_selector_properties(&mut props, "to delete");
        object_schema(props, &[])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let resolved = store.read(|state| {
            resolve_section(state, SectionSelector::from_args(arguments))
                .map(|(_, s)| (s.id.clone(), s.title.clone(), s.cards.len()))
        });
        let (id, title, cards) = match resolved {
            Ok(found) => found,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        debug!(section = %title, cards, "Deleting section");
        store.dispatch(Action::RemoveSection { section_id: id });
        Ok(ToolResult::ok(format!("Deleted section \"{title}\"")).with("removedCards", cards))
    }
}

pub struct RenameSectionTool;

impl Tool for RenameSectionTool {
    fn name(&self) -> &str {
        "rename_section"
    }

    fn description(&self) -> &str {
        "Renames a section. Identify it by current title or index (0-based)."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        section_selector_properties(&mut props, "to rename");
        props.insert("newTitle".into(), json!({ "type": "string", "description": "The new title for the section" }));
        object_schema(props, &["newTitle"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let new_title = str_arg(arguments, "newTitle").unwrap_or_default().trim().to_string();
        if new_title.is_empty() {
            return Ok(ToolResult::fail("New section title must not be empty."));
        }
        let resolved = store.read(|state| {
            resolve_section(state, SectionSelector::from_args(arguments))
                .map(|(_, s)| (s.id.clone(), s.title.clone()))
        });
        let (id, old_title) = match resolved {
            Ok(found) => found,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        store.dispatch(Action::RenameSection { section_id: id, title: new_title.clone() });
        Ok(ToolResult::ok(format!("Renamed section \"{old_title}\" to \"{new_title}\"")))
    }
}

pub struct ReorderSectionTool;

impl Tool for ReorderSectionTool {
    fn name(&self) -> &str {
        "reorder_section"
    }

    fn description(&self) -> &str {
        "Moves a section to a different position. Provide fromIndex and toIndex (0-based)."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        props.insert("fromIndex".into(), json!({ "type": "integer", "description": "Current position index (0-based)" }));
        props.insert("toIndex".into(), json!({ "type": "integer", "description": "Target position index (0-based)" }));
        object_schema(props, &["fromIndex", "toIndex"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let from = int_arg(arguments, "fromIndex").unwrap_or(-1);
        let to = int_arg(arguments, "toIndex").unwrap_or(-1);
        let count = store.read(|s| s.sections.len());

        let Some(from_index) = checked_index(from, count) else {
            return Ok(ToolResult::fail(out_of_range("source", from, "The portfolio", count, "section", count)));
        };
        let Some(to_index) = checked_index(to, count) else {
            return Ok(ToolResult::fail(out_of_range("target", to, "The portfolio", count, "section", count)));
        };

        store.dispatch(Action::ReorderSections { from_index, to_index });
        Ok(ToolResult::ok(format!(
            "Moved section from position {} to position {}",
            from_index + 1,
            to_index + 1
        )))
    }
}

pub struct ListSectionsTool;

impl Tool for ListSectionsTool {
    fn name(&self) -> &str {
        "list_sections"
    }

    fn description(&self) -> &str {
        "Lists all sections in the portfolio with their titles and card counts."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(Map::new(), &[])
    }

    fn execute(&self, _arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let sections: Vec<Value> = store.read(|state| {
            state
                .sections
                .iter()
                .enumerate()
                .map(|(i, s)| json!({ "index": i, "title": s.title, "cardCount": s.cards.len() }))
                .collect()
        });
        Ok(ToolResult::ok(format!("Found {} section(s)", sections.len())).with("sections", sections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bentofolio_core::{PortfolioState, Section};

    fn store_with(titles: &[&str]) -> PortfolioStore {
        let sections = titles
            .iter()
            .enumerate()
            .map(|(i, t)| Section::new(format!("s{i}"), *t))
            .collect();
        PortfolioStore::new(PortfolioState { sections, ..Default::default() })
    }

    #[test]
    fn create_appends_and_reports_index() {
        let store = store_with(&["Work"]);
        let result = CreateSectionTool.execute(&json!({"title": "Play"}), &store).unwrap();
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("Created section \"Play\""));
        assert_eq!(result.data["sectionIndex"], 1);
        assert_eq!(store.read(|s| s.sections[1].title.clone()), "Play");
    }

    #[test]
    fn delete_by_title_removes_section() {
        let store = store_with(&["Work", "Play"]);
        let result = DeleteSectionTool.execute(&json!({"sectionTitle": "WORK"}), &store).unwrap();
        assert!(result.success);
        assert_eq!(store.read(|s| s.sections.len()), 1);
    }

    #[test]
    fn rename_unknown_section_fails_without_mutation() {
        let store = store_with(&["Work"]);
        let before = store.revision();
        let result = RenameSectionTool
            .execute(&json!({"sectionTitle": "Blog", "newTitle": "Writing"}), &store)
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Available sections: \"Work\""));
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn reorder_validates_both_positions() {
        let store = store_with(&["A", "B", "C"]);
        let result = ReorderSectionTool.execute(&json!({"fromIndex": 0, "toIndex": 3}), &store).unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("Invalid target position 4. The portfolio only has 3 sections (valid positions are 1 to 3).")
        );

        let ok = ReorderSectionTool.execute(&json!({"fromIndex": 0, "toIndex": 2}), &store).unwrap();
        assert!(ok.success);
        let titles = store.read(|s| s.sections.iter().map(|s| s.title.clone()).collect::<Vec<_>>());
        assert_eq!(titles, ["B", "C", "A"]);
    }

    #[test]
    fn list_reports_counts() {
        let store = store_with(&["Work"]);
        let result = ListSectionsTool.execute(&json!({}), &store).unwrap();
        assert_eq!(result.data["sections"], json!([{"index": 0, "title": "Work", "cardCount": 0}]));
    }
}
