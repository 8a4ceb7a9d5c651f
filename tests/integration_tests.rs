/// Integration tests for the response-to-file-tree pipeline
///
/// These drive a full session against a mock completion endpoint, a key store
/// on disk and an exported archive.

use code_assistant::{
    parse, sample_tree, AssistantError, ChatMessage, CompletionConfig, CompletionSource,
    DeepSeekClient, FileKeyStore, FileNode, FileRecord, FileTree, KeyStore, MemoryKeyStore,
    Session, ARCHIVE_FILE_NAME,
};
use serde_json::json;
use std::io::Read;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

// Completion source that always returns the same text, without network access
struct FixedSource {
    reply: String,
}

#[async_trait::async_trait]
impl CompletionSource for FixedSource {
    async fn request(
        &self,
        _conversation: &[ChatMessage],
        _api_key: &str,
    ) -> code_assistant::Result<String> {
        Ok(self.reply.clone())
    }

    fn identifier(&self) -> String {
        "fixed".to_string()
    }
}

fn completion_body(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

#[test]
fn test_envelope_files_map_one_to_one() {
    let raw = json!({
        "content": "Segue o projeto",
        "files": [
            { "name": "package.json", "content": "{}" },
            { "name": "/src/index.ts", "content": "" },
            { "name": "src/util.ts", "content": "export const x = 1;\n" }
        ]
    })
    .to_string();

    let parsed = parse(&raw);
    assert_eq!(parsed.message, "Segue o projeto");
    assert_eq!(
        parsed.files,
        vec![
            FileRecord::new("package.json", "{}"),
            FileRecord::new("/src/index.ts", ""),
            FileRecord::new("src/util.ts", "export const x = 1;\n"),
        ]
    );
}

#[test]
fn test_fences_become_placeholders() {
    let raw = "Três arquivos:\n\
               ```filepath:a.txt\nAAA\n```\n\
               ```filepath:b/b.txt\nBBB\n```\n\
               ```filepath:c.txt\nCCC\n```";

    let parsed = parse(raw);
    assert_eq!(parsed.files.len(), 3);
    assert_eq!(parsed.message.matches("[generated code for").count(), 3);
    for body in ["AAA", "BBB", "CCC"] {
        assert!(!parsed.message.contains(body));
    }

    let mut tree = FileTree::new();
    assert_eq!(tree.merge(parsed.files), 3);
    assert_eq!(tree.find("b/b.txt").unwrap().content(), Some("BBB"));
}

#[test]
fn test_tree_serializes_for_the_explorer() {
    let mut tree = FileTree::new();
    assert_ok!(tree.insert("src/App.tsx", "function App(){}"));
    assert_err!(tree.insert("/", "nothing"));

    let value = serde_json::to_value(&tree).unwrap();
    assert_eq!(
        value,
        json!([{
            "name": "src",
            "type": "folder",
            "children": [{ "name": "App.tsx", "type": "file", "content": "function App(){}" }]
        }])
    );

    let back: FileTree = serde_json::from_value(value).unwrap();
    assert_eq!(back, tree);
    assert_eq!(
        back.nodes()[0],
        FileNode::folder("src", vec![FileNode::file("App.tsx", "function App(){}")])
    );
}

#[tokio::test]
async fn test_session_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let reply = json!({
        "content": "Pronto! Rode `npm install`.",
        "files": [
            { "name": "src/components/App.tsx", "content": "export default function App() {}" },
            { "name": "src/hooks/useThing.ts", "content": "export {}" }
        ]
    })
    .to_string();
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-live")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(&reply))
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let keys = Arc::new(
        FileKeyStore::new(temp_dir.path().join("keys"))
            .await
            .unwrap(),
    );
    keys.set("sk-live").await.unwrap();

    let client = DeepSeekClient::new(CompletionConfig {
        base_url: server.url(),
        ..CompletionConfig::default()
    })
    .unwrap();

    let mut session = Session::with_tree(Arc::new(client), keys, sample_tree());
    let outcome = session.send("atualize o App").await.unwrap();
    mock.assert_async().await;

    assert_eq!(outcome.message, "Pronto! Rode `npm install`.");
    assert_eq!(outcome.files_applied, 2);

    // Existing file overwritten, new folder created, untouched files kept
    let tree = session.tree();
    assert_eq!(
        tree.find("src/components/App.tsx").unwrap().content(),
        Some("export default function App() {}")
    );
    assert!(tree.find("src/hooks/useThing.ts").is_some());
    assert!(tree.find("src/main.tsx").is_some());
    assert_eq!(tree.flatten_to_archive().len(), 4);

    let path = session.export_archive(temp_dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), ARCHIVE_FILE_NAME);

    let data = std::fs::read(&path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
    assert_eq!(archive.len(), 4);
    let mut content = String::new();
    archive
        .by_name("src/hooks/useThing.ts")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "export {}");
}

#[tokio::test]
async fn test_api_failure_leaves_tree_unchanged() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(json!({ "error": { "message": "Authentication Fails" } }).to_string())
        .create_async()
        .await;

    let client = DeepSeekClient::new(CompletionConfig {
        base_url: server.url(),
        ..CompletionConfig::default()
    })
    .unwrap();
    let keys = Arc::new(MemoryKeyStore::with_key("sk-wrong"));

    let mut session = Session::with_tree(Arc::new(client), keys, sample_tree());
    let outcome = session.send("oi").await.unwrap();

    assert_eq!(outcome.message, "Erro na API: Authentication Fails");
    assert_eq!(outcome.files_applied, 0);
    assert_eq!(session.tree(), &sample_tree());
}

#[tokio::test]
async fn test_plain_text_reply() {
    let source = Arc::new(FixedSource {
        reply: "no code here".to_string(),
    });
    let mut session = Session::new(source, Arc::new(MemoryKeyStore::with_key("k")));

    let outcome = session.send("hello").await.unwrap();
    assert_eq!(outcome.message, "no code here");
    assert!(session.tree().is_empty());
}

#[tokio::test]
async fn test_save_requires_exact_path() {
    let source = Arc::new(FixedSource {
        reply: json!({
            "content": "dois index",
            "files": [
                { "name": "a/index.ts", "content": "a" },
                { "name": "b/index.ts", "content": "b" }
            ]
        })
        .to_string(),
    });
    let mut session = Session::new(source, Arc::new(MemoryKeyStore::with_key("k")));
    session.send("gere").await.unwrap();

    session.select_file("b/index.ts").unwrap();
    session.save_selected("b2").unwrap();

    assert_eq!(session.tree().find("a/index.ts").unwrap().content(), Some("a"));
    assert_eq!(session.tree().find("b/index.ts").unwrap().content(), Some("b2"));
    assert!(matches!(
        session.save_file("c/index.ts", "c"),
        Err(AssistantError::NotFound { .. })
    ));
}
