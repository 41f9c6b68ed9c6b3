//! Scenario actions
//!
//! An action is written as `verb[: object, object..]` and resolves the named
//! objects against the content ids computed during planning:
//! - `add: name..` fetches and provides the objects (seeding)
//! - `get: name..` (alias `download`) retrieves the objects
//! - `disconnect` drops the node's peer connections

use crate::error::{Error, ParseError, Result};
use crate::models::{ContentId, Task, TaskType};
use crate::query::Labeled;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Add,
    Get,
    Disconnect,
}

impl Verb {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "add" => Some(Verb::Add),
            "get" | "download" => Some(Verb::Get),
            "disconnect" => Some(Verb::Disconnect),
            _ => None,
        }
    }

    fn task_type(self) -> TaskType {
        match self {
            Verb::Add => TaskType::Add,
            Verb::Get => TaskType::Get,
            Verb::Disconnect => TaskType::Disconnect,
        }
    }

    fn takes_objects(self) -> bool {
        !matches!(self, Verb::Disconnect)
    }
}

/// Parsed action bound to resolved content ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    verb: Verb,
    objects: Vec<(String, ContentId)>,
}

impl Action {
    pub fn task_type(&self) -> TaskType {
        self.verb.task_type()
    }

    /// Assign the action's task to every node in `nodes`
    pub fn tasks<N: Labeled>(&self, nodes: &[N]) -> Result<BTreeMap<String, Task>> {
        let subject = self
            .objects
            .iter()
            .map(|(_, cid)| cid.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut seen = HashSet::with_capacity(nodes.len());
        let mut tasks = BTreeMap::new();
        for node in nodes {
            if !seen.insert(node.id()) {
                return Err(Error::InvalidArgument(format!(
                    "node {:?} listed twice for action {}",
                    node.id(),
                    self
                )));
            }
            tasks.insert(
                node.id().to_string(),
                Task::new(self.verb.task_type(), subject.clone()),
            );
        }

        Ok(tasks)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb.task_type())?;
        if !self.objects.is_empty() {
            let names: Vec<&str> = self.objects.iter().map(|(n, _)| n.as_str()).collect();
            write!(f, ": {}", names.join(","))?;
        }
        Ok(())
    }
}

/// Byte offset of `part` inside `whole`, `part` must be a subslice of `whole`
fn offset(whole: &str, part: &str) -> usize {
    part.as_ptr() as usize - whole.as_ptr() as usize
}

/// Parse an action expression against the resolved object table
pub fn parse(
    objects: &BTreeMap<String, ContentId>,
    expr: &str,
) -> std::result::Result<Action, ParseError> {
    let (head, tail) = match expr.split_once(':') {
        Some((head, tail)) => (head, Some(tail)),
        None => (expr, None),
    };

    let word = head.trim();
    if word.is_empty() {
        return Err(ParseError::new(offset(expr, head), "", "missing action verb"));
    }
    let verb = Verb::parse(word)
        .ok_or_else(|| ParseError::new(offset(expr, word), word, "unknown action"))?;

    let mut resolved = Vec::new();
    if let Some(tail) = tail {
        if !verb.takes_objects() {
            return Err(ParseError::new(
                offset(expr, tail) - 1,
                ":",
                format!("{} takes no objects", word),
            ));
        }

        for part in tail.split(',') {
            let name = part.trim();
            if name.is_empty() {
                return Err(ParseError::new(offset(expr, part), "", "empty object name"));
            }
            let cid = objects.get(name).ok_or_else(|| {
                ParseError::new(offset(expr, name), name, "unknown object")
            })?;
            resolved.push((name.to_string(), cid.clone()));
        }
    }

    if verb.takes_objects() && resolved.is_empty() {
        return Err(ParseError::new(
            expr.len(),
            "",
            format!("{} needs at least one object", word),
        ));
    }

    Ok(Action {
        verb,
        objects: resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::labeled;

    fn objects() -> BTreeMap<String, ContentId> {
        let mut objects = BTreeMap::new();
        objects.insert("data".to_string(), ContentId::new("cid-data"));
        objects.insert("golang".to_string(), ContentId::new("cid-golang"));
        objects
    }

    #[test]
    fn test_parse_get_with_objects() {
        let action = parse(&objects(), "get: data, golang").unwrap();
        assert_eq!(action.task_type(), TaskType::Get);
        assert_eq!(action.to_string(), "get: data,golang");

        let download = parse(&objects(), "download:data").unwrap();
        assert_eq!(download.task_type(), TaskType::Get);
    }

    #[test]
    fn test_parse_rejects_unknown_object() {
        let err = parse(&objects(), "add: data, missing").unwrap_err();
        assert_eq!(err.token, "missing");
        assert_eq!(err.position, 11);
        assert!(err.message.contains("unknown object"));
    }

    #[test]
    fn test_parse_rejects_bad_syntax() {
        assert_eq!(parse(&objects(), "fetch: data").unwrap_err().token, "fetch");
        assert!(parse(&objects(), "get").is_err());
        assert!(parse(&objects(), "get:").is_err());
        assert!(parse(&objects(), "get: data,,golang").is_err());
        assert!(parse(&objects(), "disconnect: data").is_err());
        assert!(parse(&objects(), "  ").is_err());
    }

    #[test]
    fn test_tasks_one_per_node() {
        let nodes = vec![labeled("a", ["x"]), labeled("b", ["x"]), labeled("c", ["y"])];
        let action = parse(&objects(), "add: data,golang").unwrap();

        let tasks = action.tasks(&nodes).unwrap();
        assert_eq!(tasks.len(), 3);
        for task in tasks.values() {
            assert_eq!(task.task_type, TaskType::Add);
            assert_eq!(task.subject, "cid-data,cid-golang");
        }
    }

    #[test]
    fn test_tasks_empty_input_is_empty_map() {
        let action = parse(&objects(), "disconnect").unwrap();
        let nodes: Vec<crate::query::LabeledEntity> = Vec::new();
        assert!(action.tasks(&nodes).unwrap().is_empty());
    }

    #[test]
    fn test_tasks_rejects_duplicate_nodes() {
        let nodes = vec![labeled("a", ["x"]), labeled("a", ["y"])];
        let action = parse(&objects(), "get: data").unwrap();
        assert!(matches!(
            action.tasks(&nodes),
            Err(Error::InvalidArgument(_))
        ));
    }
}
