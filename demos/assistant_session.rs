/// Runs one chat turn against the DeepSeek API and exports the resulting project
///
/// Usage: `cargo run --example assistant_session -- "crie um contador em React"`
///
/// The API key is taken from `DEEPSEEK_API_KEY` when set and persisted in
/// `./.assistant/deepseek-storage.json` for later runs. Set `RUST_LOG=debug`
/// to follow the pipeline.

use code_assistant::{
    sample_tree, CompletionConfig, DeepSeekClient, FileKeyStore, FileNode, KeyStore, NodeKind,
    Session,
};
use std::path::PathBuf;
use std::sync::Arc;

fn print_tree(nodes: &[FileNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match &node.kind {
            NodeKind::Folder { children } => {
                println!("{}{}/", indent, node.name);
                print_tree(children, depth + 1);
            }
            NodeKind::File { content } => {
                println!("{}{} ({} bytes)", indent, node.name, content.len());
            }
        }
    }
}

#[tokio::main]
async fn main() -> code_assistant::Result<()> {
    env_logger::init();

    let prompt = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = if prompt.trim().is_empty() {
        "Crie um componente React de contador".to_string()
    } else {
        prompt
    };

    let state_dir = PathBuf::from(".assistant");
    let keys = Arc::new(FileKeyStore::new(state_dir.clone()).await?);
    if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
        keys.set(&key).await?;
    }

    let client = DeepSeekClient::new(CompletionConfig::default())?;
    let mut session = Session::with_tree(Arc::new(client), keys, sample_tree());

    println!("> {}", prompt);
    if let Some(outcome) = session.send(&prompt).await {
        println!("{}\n", outcome.message);
        println!("{} generated files merged\n", outcome.files_applied);
    }

    print_tree(session.display_tree().nodes(), 0);

    let archive = session.export_archive(&state_dir).await?;
    println!("\nExported to {}", archive.display());
    Ok(())
}
