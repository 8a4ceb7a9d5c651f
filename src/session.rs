use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::{
    archive,
    completion::CompletionSource,
    error::{AssistantError, Result},
    key_store::KeyStore,
    parser,
    tree::FileTree,
    types::{ChatMessage, FileNode, Role, TranscriptEntry},
};

/// First assistant message of every session; never sent to the model
pub const GREETING: &str = "Olá! Como posso ajudar você hoje?";

/// What a chat turn produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Assistant message as displayed
    pub message: String,
    /// Number of generated files merged into the tree
    pub files_applied: usize,
}

fn now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Application state: transcript, project tree and the selected file
///
/// A turn borrows the session mutably until the model replies, so a second
/// turn cannot start while one is pending.
pub struct Session {
    completion: Arc<dyn CompletionSource>,
    keys: Arc<dyn KeyStore>,
    transcript: Vec<TranscriptEntry>,
    conversation: Vec<ChatMessage>,
    tree: FileTree,
    selected: Option<String>,
}

impl Session {
    /// Start a session with an empty project
    pub fn new(completion: Arc<dyn CompletionSource>, keys: Arc<dyn KeyStore>) -> Self {
        Self::with_tree(completion, keys, FileTree::new())
    }

    /// Start a session over an existing project tree
    pub fn with_tree(
        completion: Arc<dyn CompletionSource>,
        keys: Arc<dyn KeyStore>,
        tree: FileTree,
    ) -> Self {
        Self {
            completion,
            keys,
            transcript: vec![TranscriptEntry {
                role: Role::Assistant,
                content: GREETING.to_string(),
                timestamp: now(),
            }],
            conversation: Vec::new(),
            tree,
            selected: None,
        }
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Messages sent to the model on the next turn, oldest first
    pub fn conversation(&self) -> &[ChatMessage] {
        &self.conversation
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    /// Tree in explorer order
    pub fn display_tree(&self) -> FileTree {
        self.tree.sorted()
    }

    /// Configured API key; an unreadable store counts as no key
    pub async fn api_key(&self) -> Option<String> {
        match self.keys.get().await {
            Ok(key) => key,
            Err(e) => {
                warn!("could not read API key: {}", e);
                None
            }
        }
    }

    pub async fn set_api_key(&self, key: &str) -> Result<()> {
        self.keys.set(key).await
    }

    /// Run one chat turn
    ///
    /// Blank input is ignored and returns `None`. Otherwise the model's reply
    /// is parsed, any generated files are merged into the tree, and the
    /// displayed message is appended to the transcript. Model failures show up
    /// as an assistant message, never as an error.
    pub async fn send(&mut self, content: &str) -> Option<TurnOutcome> {
        if content.trim().is_empty() {
            return None;
        }

        self.push_entry(Role::User, content.to_string());
        self.conversation.push(ChatMessage::user(content));

        let api_key = self.api_key().await.unwrap_or_default();
        let raw = self.completion.complete(&self.conversation, &api_key).await;
        let parsed = parser::parse(&raw);

        let files_applied = self.tree.merge(parsed.files);
        info!(
            "turn {} finished with {} generated files",
            self.conversation.len(),
            files_applied
        );

        // The model keeps seeing its raw replies, including the files it wrote
        self.conversation.push(ChatMessage::assistant(raw));
        self.push_entry(Role::Assistant, parsed.message.clone());

        Some(TurnOutcome {
            message: parsed.message,
            files_applied,
        })
    }

    fn push_entry(&mut self, role: Role, content: String) {
        self.transcript.push(TranscriptEntry {
            role,
            content,
            timestamp: now(),
        });
    }

    /// Open the file at `path` in the editor; folders cannot be selected
    pub fn select_file(&mut self, path: &str) -> Option<&FileNode> {
        let node = self.tree.find(path).filter(|n| n.is_file())?;
        self.selected = Some(path.to_string());
        Some(node)
    }

    /// Path and node of the file open in the editor
    pub fn selected(&self) -> Option<(&str, &FileNode)> {
        let path = self.selected.as_deref()?;
        let node = self.tree.find(path).filter(|n| n.is_file())?;
        Some((path, node))
    }

    /// Write editor content back to the selected file
    pub fn save_selected(&mut self, new_content: &str) -> Result<()> {
        let path = self.selected.clone().ok_or_else(|| AssistantError::NotFound {
            path: "<no file selected>".to_string(),
        })?;
        self.save_file(&path, new_content)
    }

    /// Replace the content of the file at `path`
    pub fn save_file(&mut self, path: &str, new_content: &str) -> Result<()> {
        self.tree.update_path(path, new_content)?;
        info!("saved {}", path);
        Ok(())
    }

    /// Write the whole project to `<dir>/project-files.zip`
    pub async fn export_archive(&self, dir: &Path) -> Result<PathBuf> {
        archive::write_archive(&self.tree, dir).await
    }
}
