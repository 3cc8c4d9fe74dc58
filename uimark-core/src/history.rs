use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, UimarkError};
use crate::model::Item;

pub const DEFAULT_HISTORY_LIMIT: usize = 4_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedHistory {
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub history_map: BTreeMap<String, Item>,
}

impl SavedHistory {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| UimarkError::Serialization(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| UimarkError::Serialization(err.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.history_map.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, item: Item) {
        let id = id.into();
        if !self.history.contains(&id) {
            self.history.push(id.clone());
        }
        self.history_map.insert(id, item);
    }

    pub fn remove(&mut self, id: &str) -> Option<Item> {
        self.history.retain(|existing| existing != id);
        self.history_map.remove(id)
    }

    pub fn to_json_capped(&mut self, limit: usize) -> Result<String> {
        loop {
            let json = self.to_json()?;
            if json.len() <= limit {
                return Ok(json);
            }

            let Some(largest) = self.largest_html_id() else {
                warn!(len = json.len(), limit, "history over limit with no html left to drop");
                return Ok(json);
            };
            warn!(id = %largest, len = json.len(), limit, "history too large, removing largest payload");
            self.remove(&largest);
        }
    }

    fn largest_html_id(&self) -> Option<String> {
        self.history_map
            .iter()
            .filter_map(|(id, item)| {
                item.html
                    .as_deref()
                    .filter(|html| !html.is_empty())
                    .map(|html| (html.len(), id))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, id)| id.clone())
    }
}
