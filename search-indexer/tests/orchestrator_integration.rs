//! Integration tests for the search indexer orchestrator.
//!
//! These tests use the real Orchestrator, projector, and loader but mock the
//! event source and the search engine, exercising the full
//! consume-project-load-acknowledge flow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use question_events::{QuestionDocument, QuestionEvent, SearchQuery, SearchResponse};
use search_indexer::consumer::StreamMessage;
use search_indexer::errors::IngestError;
use search_indexer::loader::SearchLoader;
use search_indexer::orchestrator::{Consumer, Orchestrator};
use search_indexer::projector::QuestionProjector;
use search_indexer_repository::{
    DeleteQuestionRequest, EnsureOutcome, IndexStatus, SearchIndexError, SearchIndexProvider,
    UpdateQuestionRequest,
};

/// Mock consumer that delivers one batch, then ends the stream, recording
/// every acknowledgment it receives.
struct MockConsumer {
    events_to_send: Vec<QuestionEvent>,
    error_on_subscribe: bool,
    acks: Arc<Mutex<Vec<bool>>>,
}

impl MockConsumer {
    fn new(events: Vec<QuestionEvent>) -> Self {
        Self {
            events_to_send: events,
            error_on_subscribe: false,
            acks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_subscribe_error(events: Vec<QuestionEvent>) -> Self {
        Self {
            events_to_send: events,
            error_on_subscribe: true,
            acks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn recorded_acks(&self) -> Vec<bool> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Consumer for MockConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        if self.error_on_subscribe {
            Err(IngestError::KafkaError("Mock subscribe error".to_string()))
        } else {
            Ok(())
        }
    }

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        let events = self.events_to_send.clone();
        let offsets = vec![("questions".to_string(), 0, 1i64)];
        let sent_events = !events.is_empty();

        if sent_events {
            let _ = sender.send(StreamMessage::Events { events, offsets }).await;
        }

        let _ = sender.send(StreamMessage::End).await;

        if sent_events {
            tokio::select! {
                _ = shutdown.recv() => {}
                msg = ack_receiver.recv() => {
                    if let Some(StreamMessage::Acknowledgment { success, .. }) = msg {
                        self.acks.lock().unwrap().push(success);
                    }
                }
            }
        }

        Ok(())
    }
}

/// In-memory engine with the production write semantics: put overwrites,
/// partial update requires the document, delete tolerates absence.
struct MockSearchProvider {
    store: Mutex<HashMap<String, QuestionDocument>>,
}

impl MockSearchProvider {
    fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, id: &str) -> Option<QuestionDocument> {
        self.store.lock().unwrap().get(id).cloned()
    }

    fn document_count(&self) -> usize {
        self.store.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn ensure_index_exists(&self) -> Result<EnsureOutcome, SearchIndexError> {
        Ok(EnsureOutcome::Ready)
    }

    async fn index_status(&self) -> Result<IndexStatus, SearchIndexError> {
        Ok(IndexStatus::Ready)
    }

    async fn put_document(&self, document: &QuestionDocument) -> Result<(), SearchIndexError> {
        self.store
            .lock()
            .unwrap()
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        request: &UpdateQuestionRequest,
    ) -> Result<(), SearchIndexError> {
        let mut store = self.store.lock().unwrap();
        let doc = store
            .get_mut(&request.question_id)
            .ok_or_else(|| SearchIndexError::document_not_found(&request.question_id))?;

        if let Some(ref title) = request.title {
            doc.title = title.clone();
        }
        if let Some(ref content) = request.content {
            doc.content = content.clone();
        }
        if let Some(ref tags) = request.tags {
            doc.tags = tags.clone();
        }
        if let Some(count) = request.answer_count {
            doc.answer_count = count;
        }
        if let Some(accepted) = request.has_accepted_answer {
            doc.has_accepted_answer = accepted;
        }
        Ok(())
    }

    async fn delete_document(
        &self,
        request: &DeleteQuestionRequest,
    ) -> Result<(), SearchIndexError> {
        self.store.lock().unwrap().remove(&request.question_id);
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError> {
        Ok(SearchResponse {
            results: vec![],
            total_found: 0,
            page: query.page,
            per_page: query.per_page,
            query: query.query.clone(),
            tag: query.tag.clone(),
        })
    }
}

fn created(id: &str) -> QuestionEvent {
    QuestionEvent::QuestionCreated {
        id: id.to_string(),
        title: "How?".to_string(),
        content: "<p>Why</p>".to_string(),
        tags: vec!["go".to_string()],
        created_at_utc: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

fn create_test_orchestrator(
    events: Vec<QuestionEvent>,
) -> (Orchestrator, Arc<MockConsumer>, Arc<MockSearchProvider>) {
    let projector = QuestionProjector::new();
    let provider = Arc::new(MockSearchProvider::new());
    let loader = SearchLoader::new(provider.clone());
    let consumer = Arc::new(MockConsumer::new(events));

    let orchestrator = Orchestrator::new(consumer.clone(), projector, loader);

    (orchestrator, consumer, provider)
}

#[tokio::test]
async fn test_created_event_projects_full_document() {
    let (mut orchestrator, consumer, provider) = create_test_orchestrator(vec![created("q1")]);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.is_ok());
    assert!(result.unwrap().is_ok());

    let doc = provider.get("q1").expect("document should be indexed");
    assert_eq!(doc.title, "How?");
    assert_eq!(doc.content, "Why");
    assert_eq!(doc.tags, vec!["go".to_string()]);
    assert_eq!(
        doc.created_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap()
            .timestamp()
    );
    assert_eq!(doc.answer_count, 0);
    assert!(!doc.has_accepted_answer);

    assert_eq!(consumer.recorded_acks(), vec![true]);
}

#[tokio::test]
async fn test_replayed_create_yields_one_document() {
    let (mut orchestrator, _, provider) =
        create_test_orchestrator(vec![created("q1"), created("q1")]);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(provider.document_count(), 1);
    assert_eq!(provider.get("q1").unwrap().content, "Why");
}

#[tokio::test]
async fn test_delete_of_absent_document_is_acknowledged() {
    let (mut orchestrator, consumer, provider) = create_test_orchestrator(vec![
        QuestionEvent::QuestionDeleted {
            id: "never-created".to_string(),
        },
    ]);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(provider.document_count(), 0);
    // Tolerant delete: the batch is still positively acknowledged.
    assert_eq!(consumer.recorded_acks(), vec![true]);
}

#[tokio::test]
async fn test_accept_before_create_is_nacked_without_ghost() {
    let (mut orchestrator, consumer, provider) = create_test_orchestrator(vec![
        QuestionEvent::AnswerAccepted {
            parent_id: "q1".to_string(),
        },
    ]);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    // No ghost document was minted and the batch was negatively
    // acknowledged, leaving it eligible for redelivery.
    assert_eq!(provider.document_count(), 0);
    assert_eq!(consumer.recorded_acks(), vec![false]);
}

#[tokio::test]
async fn test_answer_count_is_absolute_not_summed() {
    let (mut orchestrator, _, provider) = create_test_orchestrator(vec![
        created("q1"),
        QuestionEvent::AnswerCountChanged {
            parent_id: "q1".to_string(),
            count: 5,
        },
        QuestionEvent::AnswerCountChanged {
            parent_id: "q1".to_string(),
            count: 3,
        },
    ]);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(provider.get("q1").unwrap().answer_count, 3);
}

#[tokio::test]
async fn test_update_and_accept_after_create() {
    let (mut orchestrator, _, provider) = create_test_orchestrator(vec![
        created("q1"),
        QuestionEvent::QuestionUpdated {
            id: "q1".to_string(),
            title: "Edited".to_string(),
            content: "<b>new</b>".to_string(),
            tags: vec!["rust".to_string()],
        },
        QuestionEvent::AnswerAccepted {
            parent_id: "q1".to_string(),
        },
    ]);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    let doc = provider.get("q1").unwrap();
    assert_eq!(doc.title, "Edited");
    assert_eq!(doc.content, "new");
    assert_eq!(doc.tags, vec!["rust".to_string()]);
    assert!(doc.has_accepted_answer);
    // The partial update left creation time untouched.
    assert_eq!(
        doc.created_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap()
            .timestamp()
    );
}

#[tokio::test]
async fn test_empty_event_batch_processing() {
    let (mut orchestrator, _, provider) = create_test_orchestrator(vec![]);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(provider.document_count(), 0);
}

#[tokio::test]
async fn test_orchestrator_shutdown() {
    let (orchestrator, _, _) = create_test_orchestrator(vec![created("q1")]);
    let orchestrator = Arc::new(tokio::sync::Mutex::new(orchestrator));

    let orchestrator_clone = Arc::clone(&orchestrator);
    let shutdown_handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        orchestrator_clone.lock().await.shutdown();
    });

    let orchestrator_run = Arc::clone(&orchestrator);
    let run_handle = tokio::spawn(async move {
        let mut orchestrator = orchestrator_run.lock().await;
        orchestrator.run().await
    });

    let (shutdown_result, run_result) = tokio::join!(shutdown_handle, run_handle);

    assert!(shutdown_result.is_ok());
    assert!(run_result.unwrap().is_ok());
}

#[tokio::test]
async fn test_orchestrator_subscribe_error() {
    let projector = QuestionProjector::new();
    let provider = Arc::new(MockSearchProvider::new());
    let loader = SearchLoader::new(provider.clone());
    let consumer = Arc::new(MockConsumer::with_subscribe_error(vec![created("q1")]));

    let mut orchestrator = Orchestrator::new(consumer, projector, loader);

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    let run_result = result.unwrap();
    assert!(run_result.is_err());

    match run_result.unwrap_err() {
        IngestError::KafkaError(msg) => assert_eq!(msg, "Mock subscribe error"),
        other => panic!("Expected KafkaError, got {:?}", other),
    }
}
