//! Lenient decoding of persisted condition and action payloads
//!
//! Stored payloads come in several generations of shapes: JSON-encoded strings
//! (sometimes encoded twice), bare booleans, bare strings, `{type, data}`
//! objects, `{type, args}` objects and the canonical tagged form. Every shape
//! is decoded here; anything unrecognized is collected as dropped instead of
//! failing the whole step.

use serde_json::{Map, Value};

use super::action::{Action, AgentAction};
use super::condition::{Condition, JudgedByAgent, UiEvent};
use super::ids::{AgentId, StepId, WorkflowId};

/// Upper bound on nested string encodings that are unwrapped
const MAX_ENCODING_DEPTH: usize = 4;

/// Decoded entries plus the raw fragments that could not be understood
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub dropped: Vec<Value>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

/// Unwraps JSON that was stored as a string, possibly more than once
pub fn unwrap_encoded(value: &Value) -> Value {
    let mut current = value.clone();
    for _ in 0..MAX_ENCODING_DEPTH {
        let Value::String(text) = &current else {
            break;
        };
        match serde_json::from_str::<Value>(text) {
            Ok(inner) => current = inner,
            Err(_) => break,
        }
    }
    current
}

/// Decodes a persisted `conditions` field into a flat (implicit AND) list
pub fn decode_conditions(value: &Value) -> Decoded<Condition> {
    let mut decoded = Decoded::default();

    match unwrap_encoded(value) {
        Value::Null => {}
        Value::Array(entries) => {
            for entry in &entries {
                if let Some(condition) = decode_condition(entry, &mut decoded.dropped) {
                    decoded.items.push(condition);
                }
            }
        }
        single => match decode_condition(&single, &mut decoded.dropped) {
            // a top-level AND group is the same as the flat list
            Some(Condition::And { conditions }) => decoded.items = conditions,
            Some(condition) => decoded.items.push(condition),
            None => {}
        },
    }

    decoded
}

/// Decodes a persisted `action` field into an ordered action list
pub fn decode_actions(value: &Value) -> Decoded<Action> {
    let mut decoded = Decoded::default();

    match unwrap_encoded(value) {
        Value::Null => {}
        Value::Array(entries) => {
            for entry in entries {
                match decode_action(&unwrap_encoded(&entry)) {
                    Some(action) => decoded.items.push(action),
                    None => decoded.dropped.push(entry),
                }
            }
        }
        single => match decode_action(&single) {
            Some(action) => decoded.items.push(action),
            None => decoded.dropped.push(single),
        },
    }

    decoded
}

fn decode_condition(raw: &Value, dropped: &mut Vec<Value>) -> Option<Condition> {
    let value = unwrap_encoded(raw);
    let condition = match &value {
        Value::Bool(true) => Some(Condition::Always),
        Value::Bool(false) => Some(Condition::never()),
        Value::String(name) => condition_from_name(name),
        Value::Object(object) => condition_from_object(object, dropped),
        _ => None,
    };

    if condition.is_none() {
        dropped.push(value);
    }
    condition
}

/// Bare strings name a UI event, a workflow (legacy prefix) or a step
fn condition_from_name(name: &str) -> Option<Condition> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if name.eq_ignore_ascii_case("always") {
        return Some(Condition::Always);
    }
    if let Some(event) = UiEvent::from_name(name) {
        return Some(Condition::ui_event(event));
    }
    if name.starts_with(WorkflowId::LEGACY_PREFIX) {
        return Some(Condition::workflow(name));
    }
    Some(Condition::step(name))
}

fn condition_from_object(object: &Map<String, Value>, dropped: &mut Vec<Value>) -> Option<Condition> {
    let kind = normalized_type(object)?;
    let data = object.get("data");

    match kind.as_str() {
        "always" => Some(Condition::Always),
        "step" => reference(object, &["step_id", "stepId", "id"]).map(Condition::step),
        "workflow" => {
            reference(object, &["workflow_id", "workflowId", "id"]).map(Condition::workflow)
        }
        "uievent" => ui_event_from(object).map(Condition::ui_event),
        "judgedbyagent" => judged_from(object).map(Condition::JudgedByAgent),
        "and" | "or" => {
            let entries = object
                .get("conditions")
                .or(data)
                .map(unwrap_encoded)
                .unwrap_or(Value::Array(Vec::new()));
            let Value::Array(entries) = entries else {
                return None;
            };
            let conditions = entries
                .iter()
                .filter_map(|entry| decode_condition(entry, dropped))
                .collect();
            if kind == "and" {
                Some(Condition::And { conditions })
            } else {
                Some(Condition::Or { conditions })
            }
        }
        other => UiEvent::from_name(other)
            .or_else(|| object.get("type").and_then(Value::as_str).and_then(UiEvent::from_name))
            .map(Condition::ui_event),
    }
}

/// `type` lowercased with separators removed, so `judged_by_agent`,
/// `judgedByAgent` and `JudgedByAgent` compare equal
fn normalized_type(object: &Map<String, Value>) -> Option<String> {
    let kind = object.get("type")?.as_str()?;
    Some(
        kind.chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect(),
    )
}

fn str_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// Reads a referenced id either from the object itself or from its `data`
/// field, which is either the id string or an object carrying it
fn reference(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let own_keys: Vec<&str> = keys.iter().copied().filter(|k| *k != "id").collect();
    if let Some(id) = str_field(object, &own_keys) {
        return Some(id.to_string());
    }

    match object.get("data").map(unwrap_encoded)? {
        Value::String(id) if !id.is_empty() => Some(id),
        Value::Object(data) => str_field(&data, keys).map(str::to_string),
        _ => None,
    }
}

fn ui_event_from(object: &Map<String, Value>) -> Option<UiEvent> {
    if let Some(event) = str_field(object, &["event"]).and_then(UiEvent::from_name) {
        return Some(event);
    }

    match object.get("data").map(unwrap_encoded)? {
        Value::String(name) => UiEvent::from_name(&name),
        Value::Object(data) => str_field(&data, &["event", "type", "name"]).and_then(UiEvent::from_name),
        _ => None,
    }
}

fn judged_from(object: &Map<String, Value>) -> Option<JudgedByAgent> {
    let args = match object.get("args").or(object.get("data")).map(unwrap_encoded) {
        Some(Value::Object(args)) => args,
        _ => object.clone(),
    };

    Some(JudgedByAgent {
        step_id: StepId::from(str_field(&args, &["step_id", "stepId"])?),
        agent_id: AgentId::from(str_field(&args, &["agent_id", "agentId"])?),
        prompt: str_field(&args, &["prompt"])?.to_string(),
    })
}

fn decode_action(value: &Value) -> Option<Action> {
    let object = value.as_object()?;
    let kind = normalized_type(object)?;

    match kind.as_str() {
        "text" => text_from(object).map(Action::text),
        "agent" => agent_from(object).map(Action::Agent),
        _ => None,
    }
}

fn text_from(object: &Map<String, Value>) -> Option<String> {
    if let Some(text) = object.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    for key in ["return", "data", "args"] {
        let Some(field) = object.get(key) else {
            continue;
        };
        match unwrap_encoded(field) {
            Value::Object(inner) => {
                if let Some(text) = inner.get("text").and_then(Value::as_str) {
                    return Some(text.to_string());
                }
            }
            // literal text that merely looks like JSON stays literal
            _ => {
                if let Some(text) = field.as_str() {
                    return Some(text.to_string());
                }
            }
        }
    }

    None
}

fn agent_from(object: &Map<String, Value>) -> Option<AgentAction> {
    let args = match object.get("args").or(object.get("data")).map(unwrap_encoded) {
        Some(Value::Object(args)) => args,
        Some(Value::String(prompt)) if !prompt.is_empty() => {
            let mut args = Map::new();
            args.insert("prompt".to_string(), Value::String(prompt));
            args
        }
        _ => Map::new(),
    };

    let lookup = |keys: &[&str]| str_field(object, keys).or_else(|| str_field(&args, keys));

    Some(AgentAction {
        prompt: lookup(&["prompt"])?.to_string(),
        agent_id: lookup(&["agent_id", "agentId"]).map(AgentId::from),
        model: lookup(&["model"]).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_double_encoded() {
        let inner = json!([{"type": "always"}]).to_string();
        let twice = Value::String(serde_json::to_string(&inner).unwrap());

        assert_eq!(unwrap_encoded(&twice), json!([{"type": "always"}]));
        assert_eq!(unwrap_encoded(&json!("step-1")), json!("step-1"));
    }

    #[test]
    fn test_bare_boolean_conditions() {
        assert_eq!(decode_conditions(&json!(true)).items, vec![Condition::Always]);
        assert_eq!(decode_conditions(&json!(false)).items, vec![Condition::never()]);
        assert_eq!(decode_conditions(&json!("true")).items, vec![Condition::Always]);
    }

    #[test]
    fn test_bare_string_conditions() {
        let decoded = decode_conditions(&json!(["onClicked", "step-1", "workflow-9", "always"]));

        assert_eq!(
            decoded.items,
            vec![
                Condition::ui_event(UiEvent::OnClicked),
                Condition::step("step-1"),
                Condition::workflow("workflow-9"),
                Condition::Always,
            ]
        );
        assert!(decoded.dropped.is_empty());
    }

    #[test]
    fn test_type_data_conditions() {
        let decoded = decode_conditions(&json!([
            {"id": "c1", "type": "step", "data": "s1"},
            {"id": "c2", "type": "workflow", "data": {"id": "wf-1"}},
            {"id": "c3", "type": "uiEvent", "data": "onHovered"},
            {"type": "Always", "data": true}
        ]));

        assert_eq!(
            decoded.items,
            vec![
                Condition::step("s1"),
                Condition::workflow("wf-1"),
                Condition::ui_event(UiEvent::OnHovered),
                Condition::Always,
            ]
        );
    }

    #[test]
    fn test_judged_by_agent_args_shape() {
        let decoded = decode_conditions(&json!([{
            "type": "judgedByAgent",
            "args": {"stepId": "s1", "agentId": "a1", "prompt": "Did they agree?"}
        }]));

        assert_eq!(
            decoded.items,
            vec![Condition::judged_by_agent("s1", "a1", "Did they agree?")]
        );
    }

    #[test]
    fn test_judged_by_agent_missing_prompt_is_dropped() {
        let decoded = decode_conditions(&json!([{
            "type": "judgedByAgent",
            "args": {"stepId": "s1", "agentId": "a1"}
        }]));

        assert!(decoded.items.is_empty());
        assert_eq!(decoded.dropped.len(), 1);
    }

    #[test]
    fn test_top_level_and_group_is_flattened() {
        let decoded = decode_conditions(&json!({
            "type": "and",
            "conditions": ["s1", {"type": "or", "conditions": ["onClicked", "onHovered"]}]
        }));

        assert_eq!(
            decoded.items,
            vec![
                Condition::step("s1"),
                Condition::Or {
                    conditions: vec![
                        Condition::ui_event(UiEvent::OnClicked),
                        Condition::ui_event(UiEvent::OnHovered),
                    ]
                },
            ]
        );
    }

    #[test]
    fn test_unrecognized_conditions_are_dropped_not_fatal() {
        let decoded = decode_conditions(&json!([42, {"type": "teleport"}, "s1", ""]));

        assert_eq!(decoded.items, vec![Condition::step("s1")]);
        assert_eq!(decoded.dropped.len(), 3);
    }

    #[test]
    fn test_canonical_conditions_decode() {
        let canonical = vec![
            Condition::Always,
            Condition::step("s1"),
            Condition::workflow("wf-1"),
            Condition::ui_event(UiEvent::OnPageLoad),
            Condition::judged_by_agent("s1", "a1", "ok?"),
            Condition::Or {
                conditions: vec![Condition::step("s2"), Condition::never()],
            },
        ];
        let value = serde_json::to_value(&canonical).unwrap();

        assert_eq!(decode_conditions(&value).items, canonical);
    }

    #[test]
    fn test_legacy_action_shapes() {
        let decoded = decode_actions(&json!([
            {"type": "text", "return": {"text": "Welcome!"}},
            {"type": "agent", "args": {"prompt": "Summarize", "agentId": "a2", "model": "gpt-4o"}},
            {"type": "text", "text": "Bye"},
            {"type": "confetti"}
        ]));

        assert_eq!(
            decoded.items,
            vec![
                Action::text("Welcome!"),
                Action::Agent(AgentAction {
                    prompt: "Summarize".to_string(),
                    agent_id: Some(AgentId::from("a2")),
                    model: Some("gpt-4o".to_string()),
                }),
                Action::text("Bye"),
            ]
        );
        assert_eq!(decoded.dropped, vec![json!({"type": "confetti"})]);
    }

    #[test]
    fn test_single_action_object_and_encoded_string() {
        let single = decode_actions(&json!({"type": "text", "text": "Hi"}));
        assert_eq!(single.items, vec![Action::text("Hi")]);

        let encoded = Value::String(json!([{"type": "agent", "prompt": "Go"}]).to_string());
        assert_eq!(decode_actions(&encoded).items, vec![Action::agent("Go")]);
    }
}
