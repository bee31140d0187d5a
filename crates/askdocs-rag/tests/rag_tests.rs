use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use askdocs_core::config::RagSettings;
use askdocs_core::error::{Error, Result};
use askdocs_core::traits::{Embedder, Generator};
use askdocs_rag::{AnswerOutcome, RagService, NO_ANSWER_MESSAGE, NO_MATCH_MESSAGE, NO_QUERY_EMBEDDING_MESSAGE};
use askdocs_vector::{IndexBuilder, IndexHandle};
use tempfile::TempDir;

/// `[0, 1]` for text mentioning "sideways", nothing for "mute", an error for
/// "offline", `[1, 0]` otherwise.
#[derive(Default)]
struct AxisEmbedder {
    calls: AtomicUsize,
}

impl Embedder for AxisEmbedder {
    fn model_id(&self) -> &str { "axis" }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("offline") {
            return Err(Error::Timeout("embedding call timed out".to_string()));
        }
        if text.contains("mute") {
            return Ok(Vec::new());
        }
        if text.contains("sideways") {
            return Ok(vec![0.0, 1.0]);
        }
        Ok(vec![1.0, 0.0])
    }
}

struct ScriptedGenerator {
    reply: Result<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn replying(reply: &str) -> Self {
        Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    fn failing() -> Self {
        Self { reply: Err(Error::Unavailable("connection refused".to_string())), prompts: Mutex::new(Vec::new()) }
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(Error::Unavailable(e.to_string())),
        }
    }
}

struct Fixture {
    _tmp: TempDir,
    dir: String,
    embedder: Arc<AxisEmbedder>,
    generator: Arc<ScriptedGenerator>,
    service: Arc<RagService>,
}

fn fixture(files: &[(&str, &str)], generator: ScriptedGenerator, top_k: usize) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let kb = tmp.path().join("knowledge_base");
    for (name, body) in files {
        fs::create_dir_all(&kb).unwrap();
        fs::write(kb.join(name), body).unwrap();
    }
    let settings = RagSettings {
        documents_dir: kb.to_string_lossy().into_owned(),
        top_k,
        ..RagSettings::default()
    };
    let embedder = Arc::new(AxisEmbedder::default());
    let generator = Arc::new(generator);
    let handle = IndexHandle::new(IndexBuilder::new(&settings).without_fallback(), embedder.clone());
    let service = Arc::new(RagService::new(&settings, Arc::new(handle), generator.clone()));
    Fixture { _tmp: tmp, dir: settings.documents_dir, embedder, generator, service }
}

fn calls(f: &Fixture) -> usize { f.embedder.calls.load(Ordering::SeqCst) }

#[test]
fn empty_directory_names_the_directory() {
    let f = fixture(&[], ScriptedGenerator::replying("unused"), 3);
    let answer = f.service.answer("what is in here?").unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::EmptyIndex);
    assert!(answer.answer.contains(&f.dir), "{}", answer.answer);
    assert!(answer.answer.starts_with("The knowledge base is empty."));
    assert!(answer.sources.is_empty());
    assert!(f.generator.prompts.lock().unwrap().is_empty());
}

#[test]
fn empty_question_makes_no_embedding_call() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::replying("unused"), 3);
    for query in ["", "   \n\t"] {
        let answer = f.service.answer(query).unwrap();
        assert_eq!(answer.outcome, AnswerOutcome::EmptyQuery);
        assert_eq!(answer.answer, "Please provide a question for the assistant to look up.");
        assert!(answer.sources.is_empty());
    }
    assert_eq!(calls(&f), 0, "neither index build nor query embedding ran");
}

#[test]
fn two_short_paragraphs_form_one_chunk() {
    let f = fixture(
        &[("router.md", "Hold reset for ten seconds.\n\nThe lights blink twice when done.")],
        ScriptedGenerator::replying("Hold the reset button for ten seconds."),
        3,
    );
    let index = f.service.index().get_or_build().unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.chunks()[0].source().ends_with("#chunk-1"));
}

#[test]
fn aligned_chunk_is_answered_with_its_source() {
    let f = fixture(
        &[("router.md", "Hold reset for ten seconds.")],
        ScriptedGenerator::replying("  Hold the reset button for ten seconds.\n"),
        1,
    );
    let answer = f.service.answer("How do I reset the router?").unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert_eq!(answer.answer, "  Hold the reset button for ten seconds.\n", "reply is passed through untouched");
    assert_eq!(answer.sources.len(), 1);
    assert!(answer.sources[0].source.ends_with("router.md#chunk-1"));
    assert_eq!(answer.sources[0].preview, "Hold reset for ten seconds.");

    let prompts = f.generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Context:\nSource: "));
    assert!(prompts[0].contains("router.md#chunk-1\nHold reset for ten seconds."));
    assert!(prompts[0].ends_with("Question: How do I reset the router?\nAnswer:"));
}

#[test]
fn orthogonal_question_finds_nothing() {
    let f = fixture(&[("router.md", "Hold reset for ten seconds.")], ScriptedGenerator::replying("unused"), 3);
    let answer = f.service.answer("sideways question").unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::NoMatch);
    assert_eq!(answer.answer, NO_MATCH_MESSAGE);
    assert!(answer.sources.is_empty());
}

#[test]
fn question_without_embedding_is_soft() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::replying("unused"), 3);
    let answer = f.service.answer("mute question").unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::NoQueryEmbedding);
    assert_eq!(answer.answer, NO_QUERY_EMBEDDING_MESSAGE);
    assert!(answer.sources.is_empty());
}

#[test]
fn preview_is_a_hard_cut_at_280_characters() {
    let body = "x".repeat(500);
    let f = fixture(&[("long.txt", body.as_str())], ScriptedGenerator::replying("ok"), 3);
    let answer = f.service.answer("tell me about x").unwrap();

    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].preview, "x".repeat(280));
}

#[test]
fn blank_generation_falls_back() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::replying("   "), 3);
    let answer = f.service.answer("question").unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::NoAnswer);
    assert_eq!(answer.answer, NO_ANSWER_MESSAGE);
    assert_eq!(answer.sources.len(), 1, "sources are still reported");
}

#[test]
fn runtime_failures_are_errors_and_leave_the_index_usable() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::replying("Fine."), 3);

    let err = f.service.answer("offline question").unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(err.is_transient());

    let answer = f.service.answer("question").unwrap();
    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert_eq!(calls(&f), 3, "one chunk, two questions, built once");
}

#[test]
fn generation_failure_is_an_error() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::failing(), 3);
    let err = f.service.answer("question").unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));
}

#[test]
fn json_shape_hides_the_outcome() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::replying("Answer."), 3);
    let answer = f.service.answer("question").unwrap();
    let json = serde_json::to_value(&answer).unwrap();

    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(json["answer"], "Answer.");
    assert_eq!(json["sources"][0]["preview"], "Some text.");
    assert!(json["sources"][0]["source"].as_str().unwrap().ends_with("a.md#chunk-1"));
}

#[test]
fn rebuild_picks_up_new_documents() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::replying("Answer."), 3);
    assert_eq!(f.service.index().get_or_build().unwrap().len(), 1);

    fs::write(Path::new(&f.dir).join("b.md"), "More text.").unwrap();
    let stats = f.service.rebuild_index().unwrap();
    assert_eq!(stats.indexed, 2);
    assert_eq!(f.service.answer("question").unwrap().sources.len(), 2);
}

#[tokio::test]
async fn answer_async_runs_on_the_blocking_pool() {
    let f = fixture(&[("a.md", "Some text.")], ScriptedGenerator::replying("Async answer."), 3);
    let (first, second) = tokio::join!(
        Arc::clone(&f.service).answer_async("question".to_string()),
        Arc::clone(&f.service).answer_async("another question".to_string()),
    );
    assert_eq!(first.unwrap().answer, "Async answer.");
    assert_eq!(second.unwrap().answer, "Async answer.");
    assert_eq!(calls(&f), 3, "the concurrent first use built the index once");
}
