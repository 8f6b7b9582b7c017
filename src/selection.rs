//! Detail view for a selected node: the loops and archetypes it takes part
//! in, with member names resolved and instance colors attached.

use serde::Serialize;

use crate::assemble::DiagramSnapshot;
use crate::category::{archetype_base_color, archetype_icon, humanize, loop_color};
use crate::ir::{Diagram, MemberRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub loop_type: String,
    pub color: String,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchetypeDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub archetype_type: String,
    pub color: String,
    pub label: String,
    pub icon: String,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionDetail {
    pub node_id: String,
    pub node_name: String,
    pub loops: Vec<LoopDetail>,
    pub archetypes: Vec<ArchetypeDetail>,
}

fn names(members: &[MemberRef], diagram: &Diagram) -> Vec<String> {
    members
        .iter()
        .map(|member| member.display_name(diagram))
        .collect()
}

/// Projects a node selection through the snapshot built for `diagram`.
/// Returns `None` when the node is not part of the diagram.
pub fn project_selection(
    snapshot: &DiagramSnapshot,
    diagram: &Diagram,
    node_id: &str,
) -> Option<SelectionDetail> {
    let node = diagram.node(node_id)?;

    let loops = diagram
        .feedback_loops
        .iter()
        .filter(|feedback| feedback.includes(node_id))
        .map(|feedback| LoopDetail {
            id: feedback.id.clone(),
            loop_type: feedback.loop_type.clone(),
            color: loop_color(&feedback.loop_type).to_string(),
            variables: names(&feedback.variables, diagram),
        })
        .collect();

    let archetypes = diagram
        .archetypes
        .iter()
        .filter(|archetype| archetype.includes(node_id))
        .map(|archetype| {
            let instance = snapshot.instance(&archetype.id);
            ArchetypeDetail {
                id: archetype.id.clone(),
                archetype_type: archetype.archetype_type.clone(),
                color: instance.map_or_else(
                    || archetype_base_color(&archetype.archetype_type).to_string(),
                    |instance| instance.color.clone(),
                ),
                label: instance.map_or_else(
                    || humanize(&archetype.archetype_type),
                    |instance| instance.label.clone(),
                ),
                icon: archetype_icon(&archetype.archetype_type).to_string(),
                variables: names(&archetype.variables, diagram),
            }
        })
        .collect();

    Some(SelectionDetail {
        node_id: node.id.clone(),
        node_name: node.name.clone(),
        loops,
        archetypes,
    })
}
