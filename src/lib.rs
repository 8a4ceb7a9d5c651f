pub mod archive;
pub mod completion;
pub mod error;
pub mod key_store;
pub mod parser;
pub mod session;
pub mod tree;
pub mod types;

pub use archive::{build_zip, write_archive, ARCHIVE_FILE_NAME};
pub use completion::{CompletionConfig, CompletionSource, DeepSeekClient};
pub use error::{AssistantError, Result};
pub use key_store::{FileKeyStore, KeyStore, MemoryKeyStore, KEY_STORE_NAMESPACE};
pub use parser::parse;
pub use session::{Session, TurnOutcome, GREETING};
pub use tree::{sample_tree, sort, FileTree};
pub use types::{
    ArchiveEntry, ChatMessage, FileNode, FileRecord, NodeKind, ParsedResponse, Role,
    TranscriptEntry,
};
