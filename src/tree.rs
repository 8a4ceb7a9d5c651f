use std::cmp::Ordering;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AssistantError, Result},
    types::{dedupe_siblings, ArchiveEntry, FileNode, FileRecord, NodeKind},
};

/// The virtual project tree shown in the explorer
///
/// The tree has a single owner. Edits go through `&mut self`, so a subtree
/// that an edit does not touch keeps its allocation; use [`FileTree::with_file`]
/// when the previous value must stay available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FileNode>", into = "Vec<FileNode>")]
pub struct FileTree {
    nodes: Vec<FileNode>,
}

/// Split a slash-separated path into folder segments and the leaf name
///
/// Empty and `.` segments are skipped. A `..` segment makes the whole path
/// invalid, so nothing can climb out of the project root.
fn split_path(path: &str) -> Result<(Vec<&str>, &str)> {
    let invalid = || AssistantError::InvalidPath {
        path: path.to_string(),
    };

    let mut segments = Vec::new();
    for segment in path.split('/').map(str::trim) {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid()),
            name => segments.push(name),
        }
    }

    let leaf = segments.pop().ok_or_else(invalid)?;
    Ok((segments, leaf))
}

/// Children of the folder `name` among `siblings`, appending the folder if missing
fn folder_children<'a>(siblings: &'a mut Vec<FileNode>, name: &str) -> &'a mut Vec<FileNode> {
    let index = siblings
        .iter()
        .position(|n| n.is_folder() && n.name == name)
        .unwrap_or_else(|| {
            debug!("creating folder {}", name);
            siblings.push(FileNode::folder(name, Vec::new()));
            siblings.len() - 1
        });

    match &mut siblings[index].kind {
        NodeKind::Folder { children } => children,
        NodeKind::File { .. } => unreachable!("index always points at a folder"),
    }
}

fn file_content_mut<'a>(siblings: &'a mut [FileNode], name: &str) -> Option<&'a mut String> {
    siblings.iter_mut().find_map(|node| {
        if node.name != name {
            return None;
        }
        match &mut node.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Folder { .. } => None,
        }
    })
}

fn update_first(nodes: &mut [FileNode], name: &str, new_content: &str) -> bool {
    for node in nodes.iter_mut() {
        let is_target = node.name == name;
        match &mut node.kind {
            NodeKind::File { content } if is_target => {
                *content = new_content.to_string();
                return true;
            }
            NodeKind::Folder { children } => {
                if update_first(children, name, new_content) {
                    return true;
                }
            }
            NodeKind::File { .. } => {}
        }
    }
    false
}

fn flatten_into(nodes: &[FileNode], prefix: &str, out: &mut Vec<ArchiveEntry>) {
    for node in nodes {
        let path = if prefix.is_empty() {
            node.name.clone()
        } else {
            format!("{}/{}", prefix, node.name)
        };

        match &node.kind {
            NodeKind::File { content } => out.push(ArchiveEntry {
                path,
                content: content.clone(),
            }),
            NodeKind::Folder { children } => flatten_into(children, &path, out),
        }
    }
}

/// Display order: folders before files, then natural order by name
///
/// Names are compared with accents folded and case ignored first (`Ábaco`
/// sorts with `a`), then case-insensitively as written, then exactly, so the
/// order is total.
fn display_order(a: &FileNode, b: &FileNode) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| {
            let a_folded = deunicode::deunicode(&a.name);
            let b_folded = deunicode::deunicode(&b.name);
            natord::compare_ignore_case(&a_folded, &b_folded)
        })
        .then_with(|| natord::compare_ignore_case(&a.name, &b.name))
        .then_with(|| natord::compare(&a.name, &b.name))
}

/// Recursively sorted copy of `nodes` for presentation
pub fn sort(nodes: &[FileNode]) -> Vec<FileNode> {
    let mut sorted: Vec<FileNode> = nodes
        .iter()
        .map(|node| match &node.kind {
            NodeKind::Folder { children } => FileNode {
                name: node.name.clone(),
                short_description: node.short_description.clone(),
                kind: NodeKind::Folder {
                    children: sort(children),
                },
            },
            NodeKind::File { .. } => node.clone(),
        })
        .collect();
    sorted.sort_by(display_order);
    sorted
}

impl FileTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing root nodes
    ///
    /// Siblings sharing a name and kind are collapsed, the last one winning
    /// at the position of the first. Folders built through
    /// [`FileNode::folder`] or deserialization are already collapsed.
    pub fn from_nodes(nodes: Vec<FileNode>) -> Self {
        Self {
            nodes: dedupe_siblings(nodes),
        }
    }

    /// Root-level nodes in insertion order
    pub fn nodes(&self) -> &[FileNode] {
        &self.nodes
    }

    /// Take the root nodes out of the tree
    pub fn into_nodes(self) -> Vec<FileNode> {
        self.nodes
    }

    /// True when the project has no files or folders at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create or overwrite the file at `path`, creating intermediate folders
    ///
    /// Returns `AssistantError::InvalidPath` if the path has no segments; the
    /// tree is left untouched in that case.
    pub fn insert(&mut self, path: &str, content: impl Into<String>) -> Result<()> {
        let (folders, file_name) = split_path(path)?;

        let mut siblings = &mut self.nodes;
        for folder in folders {
            siblings = folder_children(siblings, folder);
        }

        let content = content.into();
        match file_content_mut(siblings, file_name) {
            Some(existing) => *existing = content,
            None => siblings.push(FileNode::file(file_name, content)),
        }
        Ok(())
    }

    /// Copy of this tree with the file at `path` inserted
    pub fn with_file(&self, path: &str, content: impl Into<String>) -> Result<FileTree> {
        let mut tree = self.clone();
        tree.insert(path, content)?;
        Ok(tree)
    }

    /// Insert every record in order; later records win on identical paths
    ///
    /// Records with unusable paths are skipped. Returns how many were applied.
    pub fn merge(&mut self, records: impl IntoIterator<Item = FileRecord>) -> usize {
        let mut applied = 0;
        for record in records {
            match self.insert(&record.path, record.content) {
                Ok(()) => applied += 1,
                Err(e) => warn!("dropping generated file: {}", e),
            }
        }
        debug!("merged {} files into tree", applied);
        applied
    }

    /// Replace the content of the first file named `name`, searching depth-first
    ///
    /// Returns false if no file has that name.
    pub fn update(&mut self, name: &str, new_content: &str) -> bool {
        update_first(&mut self.nodes, name, new_content)
    }

    /// Replace the content of the file at the exact `path`
    pub fn update_path(&mut self, path: &str, new_content: impl Into<String>) -> Result<()> {
        let (folders, file_name) = split_path(path)?;
        let not_found = || AssistantError::NotFound {
            path: path.to_string(),
        };

        let mut siblings = self.nodes.as_mut_slice();
        for folder in folders {
            siblings = siblings
                .iter_mut()
                .find_map(|node| {
                    if node.name != folder {
                        return None;
                    }
                    match &mut node.kind {
                        NodeKind::Folder { children } => Some(children.as_mut_slice()),
                        NodeKind::File { .. } => None,
                    }
                })
                .ok_or_else(not_found)?;
        }

        let content = file_content_mut(siblings, file_name).ok_or_else(not_found)?;
        *content = new_content.into();
        Ok(())
    }

    /// Node at `path`; a file wins over a folder of the same name
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        let (folders, leaf) = split_path(path).ok()?;

        let mut siblings = self.nodes.as_slice();
        for folder in folders {
            siblings = siblings
                .iter()
                .find(|n| n.is_folder() && n.name == folder)?
                .children()?;
        }

        siblings
            .iter()
            .find(|n| n.is_file() && n.name == leaf)
            .or_else(|| siblings.iter().find(|n| n.name == leaf))
    }

    /// Recursively sorted copy for display
    pub fn sorted(&self) -> FileTree {
        FileTree::from_nodes(sort(&self.nodes))
    }

    /// Every file with its full path, depth-first; empty folders contribute nothing
    pub fn flatten_to_archive(&self) -> Vec<ArchiveEntry> {
        let mut entries = Vec::new();
        flatten_into(&self.nodes, "", &mut entries);
        entries
    }
}

impl From<Vec<FileNode>> for FileTree {
    fn from(nodes: Vec<FileNode>) -> Self {
        Self::from_nodes(nodes)
    }
}

impl From<FileTree> for Vec<FileNode> {
    fn from(tree: FileTree) -> Self {
        tree.nodes
    }
}

/// Project shown before the assistant has generated anything
pub fn sample_tree() -> FileTree {
    FileTree::from_nodes(vec![
        FileNode::folder(
            "src",
            vec![
                FileNode::folder(
                    "components",
                    vec![FileNode::file(
                        "App.tsx",
                        "function App() {\n  return <div>Hello World</div>;\n}",
                    )
                    .with_description("The function that returns the root React component")],
                ),
                FileNode::file(
                    "main.tsx",
                    "import React from 'react';\nimport ReactDOM from 'react-dom';\n\nReactDOM.render(<App />, document.getElementById('root'));",
                )
                .with_description("Entry point that renders the app with ReactDOM"),
            ],
        ),
        FileNode::file("package.json", "{\n  \"name\": \"vscode-web\",\n  \"version\": \"1.0.0\"\n}")
            .with_description("Packages to install with npm install"),
    ])
}
