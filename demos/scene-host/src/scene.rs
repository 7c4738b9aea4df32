//! Toy scene graph owned by the host thread.
//!
//! The graph lives in a thread local, so it is only reachable from tool
//! bodies, which always run on the host thread.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

use hostcall::{Describe, ToolInput, tool};
use serde::{Deserialize, Serialize};

/// Frame length used by [`settle`].
const FRAME: Duration = Duration::from_millis(16);

/// Kind of scene node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Describe)]
pub enum NodeKind {
    /// Renderable geometry.
    #[default]
    Mesh,
    /// Light source.
    Light,
    /// Viewpoint.
    Camera,
}

/// Position in scene units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Describe)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Public view of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Describe)]
pub struct NodeInfo {
    pub id: u64,
    pub name: String,
    pub kind: NodeKind,
    pub position: Vec3,
}

/// Input for [`spawn_node`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToolInput)]
#[serde(default)]
pub struct SpawnRequest {
    pub name: String,
    pub kind: NodeKind,
    pub position: Vec3,
}

#[derive(Default)]
struct Scene {
    next_id: u64,
    nodes: BTreeMap<u64, NodeInfo>,
}

thread_local! {
    static SCENE: RefCell<Scene> = RefCell::new(Scene::default());
}

fn with_scene<R>(f: impl FnOnce(&mut Scene) -> R) -> R {
    SCENE.with(|scene| f(&mut scene.borrow_mut()))
}

fn missing(id: u64) -> String {
    format!("no node with id {id}")
}

/// Adds a node to the scene and returns it.
#[tool(tags("scene", "edit"))]
pub fn spawn_node(request: SpawnRequest) -> Result<NodeInfo, String> {
    if request.name.trim().is_empty() {
        return Err("node name must not be empty".into());
    }
    Ok(with_scene(|scene| {
        scene.next_id += 1;
        let node = NodeInfo {
            id: scene.next_id,
            name: request.name,
            kind: request.kind,
            position: request.position,
        };
        scene.nodes.insert(node.id, node.clone());
        node
    }))
}

/// Lists nodes, optionally only those of one kind.
#[tool(method = "GET", tags("scene"))]
pub fn list_nodes(kind: Option<NodeKind>) -> Vec<NodeInfo> {
    with_scene(|scene| {
        scene
            .nodes
            .values()
            .filter(|node| kind.is_none_or(|kind| node.kind == kind))
            .cloned()
            .collect()
    })
}

/// Moves a node. Errors surface on the next result-bearing call.
#[tool(tags("scene", "edit"))]
pub fn move_node(id: u64, x: f64, y: f64, z: f64) -> Result<(), String> {
    with_scene(|scene| {
        let node = scene.nodes.get_mut(&id).ok_or_else(|| missing(id))?;
        node.position = Vec3 { x, y, z };
        Ok(())
    })
}

/// Renames a node.
#[tool(tags("scene", "edit"))]
pub fn rename_node(id: u64, #[arg(default = "node")] name: String) -> Result<NodeInfo, String> {
    with_scene(|scene| {
        let node = scene.nodes.get_mut(&id).ok_or_else(|| missing(id))?;
        node.name = name;
        Ok(node.clone())
    })
}

/// Removes a node.
#[tool(tags("scene", "edit"))]
pub fn delete_node(id: u64) -> Result<(), String> {
    with_scene(|scene| scene.nodes.remove(&id).map(drop).ok_or_else(|| missing(id)))
}

/// Waits `frames` host frames, then reports how many nodes exist.
#[tool(method = "GET", tags("scene"))]
pub async fn settle(#[arg(default = 1)] frames: u32) -> usize {
    tokio::time::sleep(FRAME * frames).await;
    with_scene(|scene| scene.nodes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(name: &str, kind: NodeKind) -> NodeInfo {
        spawn_node(SpawnRequest {
            name: name.into(),
            kind,
            position: Vec3::default(),
        })
        .expect("spawn")
    }

    #[test]
    fn nodes_can_be_edited_and_filtered() {
        let lamp = spawn("lamp", NodeKind::Light);
        let cube = spawn("cube", NodeKind::Mesh);

        move_node(cube.id, 1.0, 2.0, 3.0).expect("move");
        let renamed = rename_node(lamp.id, "sun".into()).expect("rename");
        assert_eq!(renamed.name, "sun");

        let lights = list_nodes(Some(NodeKind::Light));
        assert_eq!(lights, [renamed]);
        let all = list_nodes(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].position, Vec3 { x: 1.0, y: 2.0, z: 3.0 });
    }

    #[test]
    fn missing_nodes_are_errors() {
        assert_eq!(delete_node(404), Err(missing(404)));
        assert!(move_node(404, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(spawn_node(SpawnRequest::default()).is_err());
    }
}
