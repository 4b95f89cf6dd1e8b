use crate::error::{NetreadyError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Role a component plays inside a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    Client,
    PrivacyManager,
    Signer,
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentRole::Client => f.write_str("client"),
            ComponentRole::PrivacyManager => f.write_str("privacy-manager"),
            ComponentRole::Signer => f.write_str("signer"),
        }
    }
}

/// Component identifiers that make up one node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeComponents {
    /// Blockchain client container id
    pub client: String,

    /// Privacy / transaction manager container id
    pub privacy_manager: String,

    /// External signer container id, when the node uses one
    #[serde(default)]
    pub signer: Option<String>,
}

impl NodeComponents {
    pub fn new<S: Into<String>>(client: S, privacy_manager: S) -> Self {
        Self {
            client: client.into(),
            privacy_manager: privacy_manager.into(),
            signer: None,
        }
    }

    pub fn with_signer<S: Into<String>>(mut self, signer: S) -> Self {
        self.signer = Some(signer.into());
        self
    }
}

/// One entry of the flattened topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    pub node: String,
    pub role: ComponentRole,
    pub component_id: String,
}

impl ComponentRef {
    /// Label used when the probe cannot report a name
    pub fn label(&self) -> String {
        format!("{}/{}", self.node, self.role)
    }
}

/// Ordered mapping from node name to its components
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkTopology {
    nodes: Vec<(String, NodeComponents)>,
}

impl NetworkTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, keeping declaration order
    pub fn add_node<S: Into<String>>(&mut self, name: S, components: NodeComponents) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(NetreadyError::topology("node name must not be empty"));
        }
        if self.nodes.iter().any(|(existing, _)| *existing == name) {
            return Err(NetreadyError::topology(format!(
                "node '{}' declared more than once",
                name
            )));
        }

        let ids = std::iter::once(&components.client)
            .chain(std::iter::once(&components.privacy_manager))
            .chain(components.signer.iter());
        for id in ids {
            if id.trim().is_empty() {
                return Err(NetreadyError::topology(format!(
                    "node '{}' has an empty component id",
                    name
                )));
            }
        }

        self.nodes.push((name, components));
        Ok(())
    }

    pub fn with_node<S: Into<String>>(mut self, name: S, components: NodeComponents) -> Result<Self> {
        self.add_node(name, components)?;
        Ok(self)
    }

    pub fn nodes(&self) -> &[(String, NodeComponents)] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every component of every node: client, privacy manager, then signer
    pub fn flatten(&self) -> Vec<ComponentRef> {
        let mut flat = Vec::with_capacity(self.nodes.len() * 3);
        for (node, components) in &self.nodes {
            flat.push(ComponentRef {
                node: node.clone(),
                role: ComponentRole::Client,
                component_id: components.client.clone(),
            });
            flat.push(ComponentRef {
                node: node.clone(),
                role: ComponentRole::PrivacyManager,
                component_id: components.privacy_manager.clone(),
            });
            if let Some(signer) = &components.signer {
                flat.push(ComponentRef {
                    node: node.clone(),
                    role: ComponentRole::Signer,
                    component_id: signer.clone(),
                });
            }
        }
        flat
    }
}

/// Split a name into alternating digit and non-digit runs
fn name_chunks(name: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut prev_digit = None;
    for (idx, c) in name.char_indices() {
        let digit = c.is_ascii_digit();
        if prev_digit.is_some_and(|prev| prev != digit) {
            chunks.push(&name[start..idx]);
            start = idx;
        }
        prev_digit = Some(digit);
    }
    if start < name.len() {
        chunks.push(&name[start..]);
    }
    chunks
}

/// Order node names with embedded numbers compared by value, so `node2`
/// comes before `node10`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = name_chunks(a);
    let right = name_chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let x_digits = x.starts_with(|c: char| c.is_ascii_digit());
        let y_digits = y.starts_with(|c: char| c.is_ascii_digit());
        let ord = if x_digits && y_digits {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        } else {
            x.cmp(y)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}
