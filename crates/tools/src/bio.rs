//! Bio tools. All writes go through `SetBio`, which creates an empty bio
//! first when none exists.

use crate::resolve::{checked_index, int_arg, object_schema, out_of_range, str_arg};
use bentofolio_core::{Action, BioBlock, BioUpdate, PortfolioStore, Tool, ToolError, ToolResult};
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

fn current_blocks(store: &PortfolioStore) -> Vec<BioBlock> {
    store.read(|s| s.bio.as_ref().map(|b| b.blocks.clone()).unwrap_or_default())
}

fn block_index_property() -> Value {
    json!({ "type": "integer", "description": "Index of the block (0-based)" })
}

fn block_out_of_range(raw: i64, count: usize) -> ToolResult {
    ToolResult::fail(out_of_range("block", raw, "The bio", count, "block", count))
}

pub struct SetBioInfoTool;

impl Tool for SetBioInfoTool {
    fn name(&self) -> &str {
        "set_bio_info"
    }

    fn description(&self) -> &str {
        "Sets or updates the bio name and/or description. The bio is created if it does not exist."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        props.insert("name".into(), json!({ "type": "string", "description": "Display name" }));
        props.insert("description".into(), json!({ "type": "string", "description": "Short bio description" }));
        object_schema(props, &[])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let update = BioUpdate {
            name: str_arg(arguments, "name").map(str::to_string),
            description: str_arg(arguments, "description").map(str::to_string),
            ..Default::default()
        };
        if update.name.is_none() && update.description.is_none() {
            return Ok(ToolResult::fail("Provide a name, a description, or both."));
        }
        store.dispatch(Action::SetBio { update });
        Ok(ToolResult::ok("Updated bio info"))
    }
}

pub struct AddBioBlockTool;

impl Tool for AddBioBlockTool {
    fn name(&self) -> &str {
        "add_bio_block"
    }

    fn description(&self) -> &str {
        "Adds a new content block (heading and body text) to the bio."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        props.insert("heading".into(), json!({ "type": "string", "description": "Block heading" }));
        props.insert("body".into(), json!({ "type": "string", "description": "Block body text" }));
        object_schema(props, &["heading", "body"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let heading = str_arg(arguments, "heading").unwrap_or_default().to_string();
        let mut blocks = current_blocks(store);
        blocks.push(BioBlock {
            id: Uuid::new_v4().to_string(),
            heading: heading.clone(),
            body: str_arg(arguments, "body").unwrap_or_default().to_string(),
        });
        let index = blocks.len() - 1;
        store.dispatch(Action::SetBio {
            update: BioUpdate { blocks: Some(blocks), ..Default::default() },
        });
        Ok(ToolResult::ok(format!("Added bio block \"{heading}\"")).with("blockIndex", index))
    }
}

pub struct UpdateBioBlockTool;

impl Tool for UpdateBioBlockTool {
    fn name(&self) -> &str {
        "update_bio_block"
    }

    fn description(&self) -> &str {
        "Updates an existing bio block by index. Can update the heading and/or body."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        props.insert("blockIndex".into(), block_index_property());
        props.insert("heading".into(), json!({ "type": "string", "description": "New heading" }));
        props.insert("body".into(), json!({ "type": "string", "description": "New body text" }));
        object_schema(props, &["blockIndex"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let raw = int_arg(arguments, "blockIndex").unwrap_or(-1);
        let mut blocks = current_blocks(store);
        let Some(index) = checked_index(raw, blocks.len()) else {
            return Ok(block_out_of_range(raw, blocks.len()));
        };
        if let Some(heading) = str_arg(arguments, "heading") {
            blocks[index].heading = heading.to_string();
        }
        if let Some(body) = str_arg(arguments, "body") {
            blocks[index].body = body.to_string();
        }
        store.dispatch(Action::SetBio {
            update: BioUpdate { blocks: Some(blocks), ..Default::default() },
        });
        Ok(ToolResult::ok(format!("Updated bio block {}", index + 1)))
    }
}

pub struct RemoveBioBlockTool;

impl Tool for RemoveBioBlockTool {
    fn name(&self) -> &str {
        "remove_bio_block"
    }

    fn description(&self) -> &str {
        "Removes a bio block by index."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        props.insert("blockIndex".into(), block_index_property());
        object_schema(props, &["blockIndex"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let raw = int_arg(arguments, "blockIndex").unwrap_or(-1);
        let mut blocks = current_blocks(store);
        let Some(index) = checked_index(raw, blocks.len()) else {
            return Ok(block_out_of_range(raw, blocks.len()));
        };
        let removed = blocks.remove(index);
        store.dispatch(Action::SetBio {
            update: BioUpdate { blocks: Some(blocks), ..Default::default() },
        });
        Ok(ToolResult::ok(format!("Removed bio block \"{}\"", removed.heading)))
    }
}

pub struct ClearBioTool;

impl Tool for ClearBioTool {
    fn name(&self) -> &str {
        "clear_bio"
    }

    fn description(&self) -> &str {
        "Removes the entire bio from the portfolio."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(Map::new(), &[])
    }

    fn execute(&self, _arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let applied = store.dispatch(Action::ClearBio);
        debug!(applied, "Cleared bio");
        Ok(ToolResult::ok("Cleared bio section"))
    }
}

pub struct GetBioTool;

impl Tool for GetBioTool {
    fn name(&self) -> &str {
        "get_bio"
    }

    fn description(&self) -> &str {
        "Returns the current bio information (name, description, blocks)."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(Map::new(), &[])
    }

    fn execute(&self, _arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let bio = store.read(|s| s.bio.clone());
        let Some(bio) = bio else {
            return Ok(ToolResult::ok("No bio section exists yet.").with("bio", Value::Null));
        };
        let blocks: Vec<Value> = bio
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| json!({ "index": i, "heading": b.heading, "body": b.body }))
            .collect();
        Ok(ToolResult::ok("Bio loaded").with(
            "bio",
            json!({
                "name": bio.name,
                "description": bio.description,
                "hasAvatar": !bio.avatar.is_empty(),
                "blocks": blocks,
            }),
        ))
    }
}
