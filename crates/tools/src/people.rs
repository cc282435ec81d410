//! Contact tool handlers.

use crate::args;
use async_trait::async_trait;
use chrono::SecondsFormat;
use concierge_core::error::ToolError;
use concierge_core::store::{ContactRecord, ContactStore, NewContact};
use concierge_core::tool::Tool;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const MAX_NAME_LEN: usize = 255;
const MAX_NOTES_LEN: usize = 2000;

fn contact_to_value(contact: &ContactRecord) -> Value {
    json!({
        "id": contact.id,
        "name": contact.name,
        "notes": contact.notes,
        "importantDates": contact.important_dates,
        "createdAt": contact.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

pub struct AddPerson {
    store: Arc<dyn ContactStore>,
}

impl AddPerson {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddPerson {
    fn name(&self) -> &str {
        "add_person"
    }

    fn description(&self) -> &str {
        "Use when the user wants to save a contact, add a person, remember someone, or store \
         details about a person (e.g. 'add contact for my dentist', 'remember John's birthday \
         is in March', 'save Sarah - she's my accountant'). Parameters: userId (required), \
         name (required), notes (optional), importantDates (optional, JSON string for dates \
         like birthdays)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": { "type": "integer" },
                "name": { "type": "string" },
                "notes": { "type": "string" },
                "importantDates": { "type": "string" }
            },
            "required": ["userId", "name"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let name = args::require_str(arguments, "name")?;
        let contact = NewContact {
            name: args::sanitize(&name, MAX_NAME_LEN),
            notes: args::opt_str(arguments, "notes")
                .map(|n| args::sanitize(&n, MAX_NOTES_LEN))
                .filter(|n| !n.is_empty()),
            important_dates: args::opt_str(arguments, "importantDates"),
        };
        let created = self
            .store
            .add(user_id, contact)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "add_person".into(),
                reason: e.to_string(),
            })?;
        Ok(contact_to_value(&created))
    }
}

pub struct RetrievePeople {
    store: Arc<dyn ContactStore>,
}

impl RetrievePeople {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RetrievePeople {
    fn name(&self) -> &str {
        "retrieve_people"
    }

    fn description(&self) -> &str {
        "Use when the user asks to see their contacts, people they've saved, who they have \
         stored, or to look up someone (e.g. 'who are my contacts?', 'show my people', 'do I \
         have John saved?', 'what's Sarah's number or notes?'). Returns all saved people with \
         name, notes, and important dates. Parameters: userId (required)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "userId": { "type": "integer" } },
            "required": ["userId"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let people = self
            .store
            .list(user_id)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "retrieve_people".into(),
                reason: e.to_string(),
            })?;
        let items: Vec<Value> = people.iter().map(contact_to_value).collect();
        Ok(json!({ "people": items, "count": items.len() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_store::InMemoryContactStore;

    fn margs(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn add_person_requires_a_name() {
        let tool = AddPerson::new(Arc::new(InMemoryContactStore::new()));
        let err = tool.execute(&margs(json!({ "userId": 1 }))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(m) if m.contains("name")));
    }

    #[tokio::test]
    async fn add_then_retrieve_round_trips_fields() {
        let store = Arc::new(InMemoryContactStore::new());
        let add = AddPerson::new(store.clone());
        add.execute(&margs(json!({
            "userId": 1,
            "name": "Sarah",
            "notes": "accountant",
            "importantDates": "{\"birthday\":\"03-14\"}"
        })))
        .await
        .unwrap();

        let retrieve = RetrievePeople::new(store);
        let result = retrieve.execute(&margs(json!({ "userId": 1 }))).await.unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["people"][0]["name"], "Sarah");
        assert_eq!(result["people"][0]["notes"], "accountant");
    }

    #[tokio::test]
    async fn retrieve_people_is_scoped_to_the_user() {
        let store = Arc::new(InMemoryContactStore::new());
        let add = AddPerson::new(store.clone());
        add.execute(&margs(json!({ "userId": 1, "name": "Mine" }))).await.unwrap();
        add.execute(&margs(json!({ "userId": 2, "name": "Theirs" }))).await.unwrap();

        let retrieve = RetrievePeople::new(store);
        let result = retrieve.execute(&margs(json!({ "userId": 1 }))).await.unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["people"][0]["name"], "Mine");
    }
}
