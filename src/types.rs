use log::warn;
use serde::{Deserialize, Serialize};

/// One entry (file or folder) in the virtual project tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct FileNode {
    /// Single path segment, never contains a separator
    pub name: String,
    /// Display-only summary shown next to the file in the explorer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Capability set of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    File { content: String },
    Folder { children: Vec<FileNode> },
}

impl FileNode {
    /// Create a file node
    ///
    /// # Arguments
    /// * `name` - Single path segment, e.g. `App.tsx`
    /// * `content` - Full file text, may be empty
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_description: None,
            kind: NodeKind::File {
                content: content.into(),
            },
        }
    }

    /// Create a folder node
    ///
    /// Children sharing a name and kind are collapsed, the last one winning.
    ///
    /// # Arguments
    /// * `name` - Single path segment, e.g. `components`
    /// * `children` - Direct children in display-independent order
    pub fn folder(name: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            name: name.into(),
            short_description: None,
            kind: NodeKind::Folder {
                children: dedupe_siblings(children),
            },
        }
    }

    /// Attach the summary the explorer shows next to the node
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.short_description = Some(description.into());
        self
    }

    /// True for the `File` variant
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// True for the `Folder` variant
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// File text, `None` for folders
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Folder { .. } => None,
        }
    }

    /// Direct children, `None` for files
    pub fn children(&self) -> Option<&[FileNode]> {
        match &self.kind {
            NodeKind::Folder { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }
}

/// Collapse siblings that share a name and kind
///
/// The last duplicate wins and takes the position of the first occurrence.
pub(crate) fn dedupe_siblings(nodes: Vec<FileNode>) -> Vec<FileNode> {
    let mut unique: Vec<FileNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match unique
            .iter_mut()
            .find(|n| n.name == node.name && n.is_folder() == node.is_folder())
        {
            Some(existing) => {
                warn!("duplicate node {} replaced by a later one", node.name);
                *existing = node;
            }
            None => unique.push(node),
        }
    }
    unique
}

/// Wire shape accepted for a node. `type` is optional: hand-written seed data
/// only tags folders implicitly through `children`.
#[derive(Deserialize)]
struct RawNode {
    name: String,
    #[serde(rename = "type", default)]
    node_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    children: Option<Vec<FileNode>>,
    #[serde(default)]
    short_description: Option<String>,
}

impl TryFrom<RawNode> for FileNode {
    type Error = String;

    fn try_from(raw: RawNode) -> std::result::Result<Self, Self::Error> {
        if matches!(raw.name.as_str(), "" | "." | "..") || raw.name.contains('/') {
            return Err(format!("invalid node name {:?}", raw.name));
        }

        let is_folder = match raw.node_type.as_deref() {
            Some("folder") => true,
            Some("file") => false,
            Some(other) => return Err(format!("unknown node type {:?}", other)),
            None => raw.children.is_some(),
        };

        let kind = if is_folder {
            NodeKind::Folder {
                children: dedupe_siblings(raw.children.unwrap_or_default()),
            }
        } else {
            NodeKind::File {
                content: raw.content.unwrap_or_default(),
            }
        };

        Ok(FileNode {
            name: raw.name,
            short_description: raw.short_description,
            kind,
        })
    }
}

/// A file extracted from a model response, not yet merged into the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Slash-separated path relative to the project root
    pub path: String,
    pub content: String,
}

impl FileRecord {
    /// Create a record for `path`; the path is validated only when merged
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Result of parsing one model response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Text shown to the user
    pub message: String,
    /// Files to materialize, in document order
    pub files: Vec<FileRecord>,
}

/// A file ready to be written into an export archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Full slash-joined path from the tree root
    pub path: String,
    pub content: String,
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name as the chat-completions API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Conversation element sent to the completion API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A message as displayed in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    /// Local wall-clock time the entry was added, `HH:MM:SS`
    pub timestamp: String,
}
