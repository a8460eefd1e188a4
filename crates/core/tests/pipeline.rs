use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use study_assistant_core::{
    AssistantConfig, CharacterNgramEmbedder, ConfigStore, GenerationOptions, LanguageModelClient,
    MemoryIndex, Message, Result, StudyAssistant, VectorIndex, EMPTY_DATABASE_MESSAGE,
};
use tempfile::tempdir;

#[derive(Default)]
struct EchoModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModelClient for EchoModel {
    async fn generate(
        &self,
        _model: &str,
        messages: &[Message],
        _options: GenerationOptions,
    ) -> Result<String> {
        let prompt = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        self.prompts.lock().expect("lock").push(prompt);
        Ok("echo".to_string())
    }
}

#[tokio::test]
async fn ingest_then_answer_from_persisted_index() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let index_path = dir.path().join("index.json");
    let config_path = dir.path().join("config.json");

    let model = Arc::new(EchoModel::default());
    let config = Arc::new(ConfigStore::load(&config_path));
    let index = Arc::new(MemoryIndex::open("study_documents", &index_path).await?);
    let assistant = StudyAssistant::new(
        Arc::new(CharacterNgramEmbedder::default()),
        index,
        model.clone(),
        config,
    )?;

    assert_eq!(assistant.answer("anything?").await?, EMPTY_DATABASE_MESSAGE);

    let added = assistant
        .ingest_document(
            "chemistry",
            "Acids donate protons.\n\nBases accept protons.\n\n   \n\nSalts form from acids and bases.",
        )
        .await?;
    assert_eq!(added, 3);

    let answer = assistant.answer("What do acids donate?").await?;
    assert_eq!(answer, "echo");
    let prompt = model.prompts.lock().expect("lock").last().cloned().unwrap_or_default();
    assert!(prompt.contains("Source: chemistry\nContent: Acids donate protons."));
    assert!(prompt.ends_with("User's Question: What do acids donate?"));

    let reopened = MemoryIndex::open("study_documents", &index_path).await?;
    assert_eq!(reopened.count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn config_update_changes_retrieval_depth() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let model = Arc::new(EchoModel::default());
    let assistant = StudyAssistant::new(
        Arc::new(CharacterNgramEmbedder::default()),
        Arc::new(MemoryIndex::new("study_documents")),
        model.clone(),
        Arc::new(ConfigStore::load(dir.path().join("config.json"))),
    )?;

    assistant
        .ingest_document("notes", "One.\n\nTwo.\n\nThree.\n\nFour.")
        .await?;

    let mut config = AssistantConfig::default();
    config.rag.top_k = 4;
    assistant.update_config(config)?;
    assert_eq!(assistant.config().rag.top_k, 4);

    assistant.answer("Count them").await?;
    let prompt = model.prompts.lock().expect("lock").last().cloned().unwrap_or_default();
    assert_eq!(prompt.matches("Source: notes").count(), 4);
    Ok(())
}
