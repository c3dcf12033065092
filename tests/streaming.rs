use futures::{Stream, StreamExt, stream};
use scriptoria::session::{Outcome, SessionKind, SessionState};
use scriptoria::streaming::{ChunkBuffer, EventFrameParser, StreamEvent};
use scriptoria::{SessionMachine, StreamConsumer};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

type Fragment = Result<Vec<u8>, String>;

const QUERY_STREAM: &str = concat!(
    r#"data: {"status":"processing_question","message":"Analyzing your question..."}"#,
    "\n\n",
    r#"data: {"status":"generating_answer","progress":60}"#,
    "\n\n",
    r#"data: {"status":"complete","answer":"Énergie: $E = \\\\hbar \\\\omega$ ψ"}"#,
    "\n\n",
);

fn fragments_at(bytes: &[u8], cuts: &[usize]) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        fragments.push(Ok(bytes[start..cut].to_vec()));
        start = cut;
    }
    fragments.push(Ok(bytes[start..].to_vec()));
    fragments
}

async fn final_state(kind: SessionKind, fragments: Vec<Fragment>) -> SessionState {
    StreamConsumer::default()
        .open(kind, stream::iter(fragments))
        .run()
        .await
}

fn answer_of(state: &SessionState) -> &str {
    match state {
        SessionState::Complete(Outcome::Answered(text)) => text.as_str(),
        other => panic!("expected an answer, got {:?}", other),
    }
}

/// Source that records how many fragments were pulled and whether it was dropped
struct TrackedSource {
    inner: stream::Iter<std::vec::IntoIter<Fragment>>,
    pulled: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

impl TrackedSource {
    fn new(fragments: Vec<Fragment>) -> (Self, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let pulled = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let source = Self {
            inner: stream::iter(fragments),
            pulled: Arc::clone(&pulled),
            dropped: Arc::clone(&dropped),
        };
        (source, pulled, dropped)
    }
}

impl Stream for TrackedSource {
    type Item = Fragment;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let next = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(Some(_)) = next {
            this.pulled.fetch_add(1, Ordering::SeqCst);
        }
        next
    }
}

impl Drop for TrackedSource {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_end_to_end_query() {
    let wire = concat!(
        r#"data: {"status":"processing_question"}"#,
        "\n",
        r#"data: {"status":"generating_answer","progress":60}"#,
        "\n",
        r#"data: {"status":"complete","answer":"E = \\hbar \\omega"}"#,
        "\n",
    );

    let states: Vec<_> = StreamConsumer::default()
        .open(
            SessionKind::Query,
            stream::iter(vec![Ok::<_, String>(wire.as_bytes().to_vec())]),
        )
        .collect()
        .await;

    assert_eq!(states.len(), 4);
    match &states[2] {
        SessionState::Active(progress) => assert_eq!(progress.progress, 60),
        other => panic!("unexpected state: {:?}", other),
    }
    assert_eq!(answer_of(&states[3]), r"E = \hbar \omega");
}

#[tokio::test]
async fn test_fragmentation_invariance_at_every_split() {
    let bytes = QUERY_STREAM.as_bytes();
    let expected = final_state(SessionKind::Query, fragments_at(bytes, &[])).await;
    assert_eq!(answer_of(&expected), r"Énergie: $E = \hbar \omega$ ψ");

    for cut in 1..bytes.len() {
        let state = final_state(SessionKind::Query, fragments_at(bytes, &[cut])).await;
        assert_eq!(state, expected, "split at byte {}", cut);
    }
}

#[tokio::test]
async fn test_fragmentation_invariance_three_way_splits() {
    let bytes = QUERY_STREAM.as_bytes();
    let expected = final_state(SessionKind::Query, fragments_at(bytes, &[])).await;

    for first in (1..bytes.len()).step_by(7) {
        for second in (first + 1..bytes.len()).step_by(5) {
            let state =
                final_state(SessionKind::Query, fragments_at(bytes, &[first, second])).await;
            assert_eq!(state, expected, "splits at {} and {}", first, second);
        }
    }
}

#[tokio::test]
async fn test_byte_at_a_time() {
    let bytes = QUERY_STREAM.as_bytes();
    let fragments: Vec<Fragment> = bytes.iter().map(|b| Ok(vec![*b])).collect();

    let state = final_state(SessionKind::Query, fragments).await;
    assert_eq!(answer_of(&state), r"Énergie: $E = \hbar \omega$ ψ");
}

#[tokio::test]
async fn test_malformed_frame_does_not_abort() {
    let wire = concat!(
        r#"data: {"status":"retrieving_chunks","progress":30}"#,
        "\n",
        r#"data: {"status":"processing_chunks","progress":"#,
        "\n",
        "data: not json at all\n",
        ": keep-alive\n",
        r#"data: {"status":"complete","answer":"\\\\frac{1}{2}"}"#,
        "\n",
    );

    let state = final_state(SessionKind::Query, vec![Ok(wire.as_bytes().to_vec())]).await;
    assert_eq!(answer_of(&state), r"\frac{1}{2}");
}

#[tokio::test]
async fn test_empty_answer_completes() {
    let wire = "data: {\"status\":\"complete\",\"answer\":\"\"}\n";
    let state = final_state(SessionKind::Query, vec![Ok(wire.as_bytes().to_vec())]).await;
    assert_eq!(answer_of(&state), "");
}

#[tokio::test]
async fn test_non_string_answer_completes_empty() {
    let wire = "data: {\"status\":\"complete\",\"answer\":42}\n";
    let state = final_state(SessionKind::Query, vec![Ok(wire.as_bytes().to_vec())]).await;
    assert_eq!(answer_of(&state), "");
}

#[tokio::test]
async fn test_stream_without_terminal_event_fails() {
    let wire = "data: {\"status\":\"generating_answer\",\"progress\":80}\n";
    let state = final_state(SessionKind::Query, vec![Ok(wire.as_bytes().to_vec())]).await;
    assert!(matches!(state, SessionState::Failed(_)));
}

#[tokio::test]
async fn test_service_error_event() {
    let wire = "data: {\"status\":\"error\",\"message\":\"Only PDF files are allowed\"}\n";
    let state = final_state(SessionKind::Upload, vec![Ok(wire.as_bytes().to_vec())]).await;
    assert_eq!(
        state,
        SessionState::Failed("Only PDF files are allowed".to_string())
    );
}

#[tokio::test]
async fn test_transport_error_mid_stream() {
    let fragments = vec![
        Ok(b"data: {\"status\":\"embedding\",\"progress\":70}\n".to_vec()),
        Err("connection closed".to_string()),
        Ok(b"data: {\"status\":\"complete\"}\n".to_vec()),
    ];

    let state = final_state(SessionKind::Upload, fragments).await;
    match state {
        SessionState::Failed(reason) => assert!(reason.contains("connection closed")),
        other => panic!("unexpected state: {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_flow_reports_every_stage() {
    let stages = [
        ("validating", 5),
        ("uploading", 10),
        ("extracting", 30),
        ("chunking", 50),
        ("embedding", 70),
        ("indexing", 85),
        ("saving", 95),
    ];
    let mut wire = String::new();
    for (status, progress) in stages {
        wire.push_str(&format!(
            "data: {{\"status\":\"{}\",\"progress\":{}}}\n\n",
            status, progress
        ));
    }
    wire.push_str("data: {\"status\":\"complete\",\"message\":\"PDF processed successfully\"}\n\n");

    let states: Vec<_> = StreamConsumer::default()
        .open(
            SessionKind::Upload,
            stream::iter(vec![Ok::<_, String>(wire.into_bytes())]),
        )
        .collect()
        .await;

    let progress: Vec<u8> = states
        .iter()
        .filter_map(|state| match state {
            SessionState::Active(p) => Some(p.progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![0, 5, 10, 30, 50, 70, 85, 95]);
    assert_eq!(
        states.last(),
        Some(&SessionState::Complete(Outcome::Uploaded {
            message: "PDF processed successfully".to_string()
        }))
    );
}

#[tokio::test]
async fn test_snapshots_precede_next_pull() {
    let (source, pulled, _dropped) = TrackedSource::new(vec![
        Ok(b"data: {\"status\":\"uploading\",\"progress\":10}\ndata: {\"status\":\"uploaded\",\"progress\":20}\n".to_vec()),
        Ok(b"data: {\"status\":\"indexing\",\"progress\":85}\n".to_vec()),
    ]);

    let mut session = StreamConsumer::default().open(SessionKind::Upload, source);
    session.next().await;
    assert_eq!(pulled.load(Ordering::SeqCst), 0);

    session.next().await;
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
    session.next().await;
    assert_eq!(pulled.load(Ordering::SeqCst), 1);

    session.next().await;
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancel_releases_source() {
    let (source, _pulled, dropped) = TrackedSource::new(vec![
        Ok(b"data: {\"status\":\"uploading\",\"progress\":10}\n".to_vec()),
        Ok(b"data: {\"status\":\"complete\"}\n".to_vec()),
    ]);

    let mut session = StreamConsumer::default().open(SessionKind::Upload, source);
    session.next().await;
    session.next().await;
    assert!(!dropped.load(Ordering::SeqCst));

    session.cancel();
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(session.next().await, None);
}

#[tokio::test]
async fn test_terminal_state_releases_source() {
    let (source, pulled, dropped) = TrackedSource::new(vec![
        Ok(b"data: {\"status\":\"complete\",\"answer\":\"42\"}\n".to_vec()),
        Ok(b"data: {\"status\":\"error\",\"message\":\"late\"}\n".to_vec()),
    ]);

    let mut session = StreamConsumer::default().open(SessionKind::Query, source);
    session.next().await;
    let done = session.next().await;

    assert!(matches!(done, Some(SessionState::Complete(_))));
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
    assert_eq!(session.next().await, None);
}

#[test]
fn test_drop_of_stream_releases_source() {
    let (source, _pulled, dropped) = TrackedSource::new(vec![]);
    let session = StreamConsumer::default().open(SessionKind::Query, source);
    drop(session);
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn test_monotonic_terminality_with_low_level_api() {
    let mut buffer = ChunkBuffer::new();
    let mut machine = SessionMachine::new(SessionKind::Query);
    machine.start();

    let records = buffer.push(
        concat!(
            "data: {\"status\":\"error\",\"message\":\"No PDF has been processed\"}\n",
            "data: {\"status\":\"complete\",\"answer\":\"too late\"}\n",
            "data: {\"status\":\"generating_answer\",\"progress\":90}\n",
        )
        .as_bytes(),
    );

    let events: Vec<StreamEvent> = records
        .iter()
        .filter_map(|record| EventFrameParser::parse(record))
        .collect();
    assert_eq!(events.len(), 3);

    let mut observed = Vec::new();
    for event in &events {
        observed.push(machine.apply(event).clone());
    }

    let failed = SessionState::Failed("No PDF has been processed".to_string());
    assert!(observed.iter().all(|state| *state == failed));
}
