use serde::{Deserialize, Deserializer, Serialize};

use crate::category::normalize_key;
use crate::error::CldError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn sign(self) -> &'static str {
        match self {
            Self::Positive => "+",
            Self::Negative => "\u{2212}",
        }
    }
}

impl TryFrom<String> for Polarity {
    type Error = CldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "+" => return Ok(Self::Positive),
            "-" | "\u{2212}" => return Ok(Self::Negative),
            _ => {}
        }
        match normalize_key(&value).as_str() {
            "POSITIVE" => Ok(Self::Positive),
            "NEGATIVE" => Ok(Self::Negative),
            _ => Err(CldError::UnknownPolarity(value)),
        }
    }
}

impl From<Polarity> for String {
    fn from(value: Polarity) -> Self {
        match value {
            Polarity::Positive => "positive".to_string(),
            Polarity::Negative => "negative".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(alias = "source_id", deserialize_with = "id_string")]
    pub source: String,
    #[serde(alias = "target_id", deserialize_with = "id_string")]
    pub target: String,
    #[serde(alias = "type")]
    pub polarity: Polarity,
}

/// A loop or archetype member: either a bare variable id or an embedded
/// variable object, which may carry its own display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberRef {
    Id(#[serde(deserialize_with = "id_string")] String),
    Variable {
        #[serde(deserialize_with = "id_string")]
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl MemberRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Variable { id, .. } => id,
        }
    }

    /// Embedded name, then the diagram's node name, then the raw id.
    pub fn display_name(&self, diagram: &Diagram) -> String {
        if let Self::Variable {
            name: Some(name), ..
        } = self
            && !name.is_empty()
        {
            return name.clone();
        }
        diagram
            .node(self.id())
            .map(|node| node.name.clone())
            .unwrap_or_else(|| self.id().to_string())
    }
}

impl From<&str> for MemberRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackLoop {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub loop_type: String,
    #[serde(default)]
    pub variables: Vec<MemberRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archetype {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub archetype_type: String,
    #[serde(default)]
    pub variables: Vec<MemberRef>,
}

fn includes(members: &[MemberRef], node_id: &str) -> bool {
    members.iter().any(|member| member.id() == node_id)
}

impl FeedbackLoop {
    pub fn includes(&self, node_id: &str) -> bool {
        includes(&self.variables, node_id)
    }
}

impl Archetype {
    pub fn includes(&self, node_id: &str) -> bool {
        includes(&self.variables, node_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Variable>,
    #[serde(default, alias = "relationships")]
    pub edges: Vec<Relationship>,
    #[serde(default)]
    pub feedback_loops: Vec<FeedbackLoop>,
    #[serde(default)]
    pub archetypes: Vec<Archetype>,
}

impl Diagram {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn node(&self, id: &str) -> Option<&Variable> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn add_node(&mut self, id: &str, name: &str) {
        match self.nodes.iter_mut().find(|node| node.id == id) {
            Some(node) => node.name = name.to_string(),
            None => self.nodes.push(Variable {
                id: id.to_string(),
                name: name.to_string(),
            }),
        }
    }

    pub fn add_edge(&mut self, source: &str, target: &str, polarity: Polarity) {
        let id = format!("e{}", self.edges.len() + 1);
        self.edges.push(Relationship {
            id,
            source: source.to_string(),
            target: target.to_string(),
            polarity,
        });
    }

    pub fn add_loop(&mut self, id: &str, loop_type: &str, variables: &[&str]) {
        self.feedback_loops.push(FeedbackLoop {
            id: id.to_string(),
            loop_type: loop_type.to_string(),
            variables: variables.iter().copied().map(MemberRef::from).collect(),
        });
    }

    pub fn add_archetype(&mut self, id: &str, archetype_type: &str, variables: &[&str]) {
        self.archetypes.push(Archetype {
            id: id.to_string(),
            archetype_type: archetype_type.to_string(),
            variables: variables.iter().copied().map(MemberRef::from).collect(),
        });
    }
}

/// Accepts ids written as JSON strings or integers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Int(value) => value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_accepts_any_casing() {
        for raw in ["positive", "Positive", "POSITIVE", "+"] {
            assert_eq!(Polarity::try_from(raw.to_string()).unwrap(), Polarity::Positive);
        }
        for raw in ["negative", "Negative", "-"] {
            assert_eq!(Polarity::try_from(raw.to_string()).unwrap(), Polarity::Negative);
        }
        assert!(Polarity::try_from("sideways".to_string()).is_err());
    }

    #[test]
    fn members_accept_ids_and_objects() {
        let members: Vec<MemberRef> =
            serde_json::from_str(r#"["a", 7, {"id": "b", "name": "Bee"}, {"id": "c"}]"#).unwrap();
        let ids: Vec<&str> = members.iter().map(MemberRef::id).collect();
        assert_eq!(ids, vec!["a", "7", "b", "c"]);
    }

    #[test]
    fn display_name_prefers_embedded_then_node_then_id() {
        let mut diagram = Diagram::new("d");
        diagram.add_node("c", "Sea");
        let embedded = MemberRef::Variable {
            id: "b".to_string(),
            name: Some("Bee".to_string()),
        };
        let from_node = MemberRef::Variable {
            id: "c".to_string(),
            name: None,
        };
        assert_eq!(embedded.display_name(&diagram), "Bee");
        assert_eq!(from_node.display_name(&diagram), "Sea");
        assert_eq!(MemberRef::from("zz").display_name(&diagram), "zz");
    }

    #[test]
    fn relationships_accept_alternate_field_names() {
        let edge: Relationship = serde_json::from_str(
            r#"{"id": 1, "source_id": "a", "target_id": "b", "type": "NEGATIVE"}"#,
        )
        .unwrap();
        assert_eq!(edge.id, "1");
        assert_eq!(edge.source, "a");
        assert_eq!(edge.polarity, Polarity::Negative);
    }

    #[test]
    fn add_node_updates_existing_name() {
        let mut diagram = Diagram::new("d");
        diagram.add_node("a", "Alpha");
        diagram.add_node("a", "Alpha 2");
        assert_eq!(diagram.nodes.len(), 1);
        assert_eq!(diagram.node("a").unwrap().name, "Alpha 2");
    }
}
