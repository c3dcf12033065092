//! Drives a session from a fragment stream.
//!
//! [`SessionStream`] pulls fragments on demand: a fragment is only requested
//! once every record split out of the previous one has been parsed and its
//! snapshot handed to the caller. Dropping the stream (or calling
//! [`SessionStream::cancel`]) drops the source immediately.

use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use uuid::Uuid;

use crate::config::StreamConfig;
use crate::metrics::STREAM_METRICS;
use crate::session::{SessionKind, SessionMachine, SessionState};
use crate::streaming::{ChunkBuffer, EventFrameParser};

/// Opens sessions over fragment streams
#[derive(Debug, Clone)]
pub struct StreamConsumer {
    config: StreamConfig,
}

impl StreamConsumer {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Start a `kind` session reading from `source`.
    ///
    /// The returned stream yields the initial `Active` snapshot first, then
    /// one snapshot per valid event, and ends after the first terminal one.
    pub fn open<S>(&self, kind: SessionKind, source: S) -> SessionStream<S> {
        let machine = SessionMachine::new(kind);
        tracing::debug!(session = %machine.id(), %kind, "Opening session stream");

        SessionStream {
            source: Some(source),
            buffer: ChunkBuffer::with_capacity(self.config.initial_capacity),
            records: VecDeque::new(),
            machine,
            started: false,
            drained: false,
            done: false,
        }
    }
}

impl Default for StreamConsumer {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

/// Lazy sequence of [`SessionState`] snapshots for one session
pub struct SessionStream<S> {
    source: Option<S>,
    buffer: ChunkBuffer,
    /// Records of the fragment currently being drained
    records: VecDeque<String>,
    machine: SessionMachine,
    started: bool,
    /// Source exhausted and the buffer tail flushed
    drained: bool,
    done: bool,
}

impl<S> SessionStream<S> {
    pub fn id(&self) -> Uuid {
        self.machine.id()
    }

    pub fn kind(&self) -> SessionKind {
        self.machine.kind()
    }

    /// Latest state, whether or not it has been yielded yet
    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    /// Whether the source is still held
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Stop the session: the source is dropped and no further snapshots
    /// are produced. The current state is left as it is.
    pub fn cancel(&mut self) {
        if !self.done {
            tracing::info!(session = %self.machine.id(), "Session cancelled");
        }
        self.close();
    }

    fn close(&mut self) {
        self.source = None;
        self.records.clear();
        self.done = true;
    }

    /// Parse one record and apply it. Returns the new snapshot when the
    /// record carried a valid event.
    fn apply_record(&mut self, record: &str) -> Option<SessionState> {
        let Some(event) = EventFrameParser::parse(record) else {
            STREAM_METRICS.record_ignored();
            return None;
        };

        if event.is_malformed() {
            STREAM_METRICS.record_malformed();
            return None;
        }

        Some(self.machine.apply(&event).clone())
    }

    fn emit(&mut self, snapshot: SessionState) -> Poll<Option<SessionState>> {
        if snapshot.is_terminal() {
            self.close();
        }
        Poll::Ready(Some(snapshot))
    }
}

impl<S, B, E> SessionStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    /// Drive the session to the end and return its final state.
    pub async fn run(mut self) -> SessionState {
        while self.next().await.is_some() {}
        self.machine.into_state()
    }
}

impl<S, B, E> Stream for SessionStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    type Item = SessionState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        if !this.started {
            this.started = true;
            let snapshot = this.machine.start().clone();
            return Poll::Ready(Some(snapshot));
        }

        loop {
            while let Some(record) = this.records.pop_front() {
                if let Some(snapshot) = this.apply_record(&record) {
                    return this.emit(snapshot);
                }
            }

            if this.drained {
                let snapshot = this.machine.finish().clone();
                return this.emit(snapshot);
            }

            let Some(source) = this.source.as_mut() else {
                this.done = true;
                return Poll::Ready(None);
            };

            match Pin::new(source).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(fragment))) => {
                    let bytes = fragment.as_ref();
                    STREAM_METRICS.record_fragment(bytes.len());

                    let records = this.buffer.push(bytes);
                    STREAM_METRICS.record_records(records.len());
                    this.records.extend(records);
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::error!(session = %this.machine.id(), error = %e, "Transport error");
                    let snapshot = this.machine.fail(format!("transport error: {}", e)).clone();
                    return this.emit(snapshot);
                }
                Poll::Ready(None) => {
                    this.source = None;
                    this.drained = true;
                    if let Some(tail) = this.buffer.flush() {
                        STREAM_METRICS.record_records(1);
                        this.records.push_back(tail);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Outcome;
    use futures::stream;

    type Fragment = Result<&'static [u8], String>;

    fn ok(record: &'static str) -> Fragment {
        Ok(record.as_bytes())
    }

    fn source(fragments: Vec<Fragment>) -> stream::Iter<std::vec::IntoIter<Fragment>> {
        stream::iter(fragments)
    }

    #[tokio::test]
    async fn test_first_snapshot_is_active() {
        let consumer = StreamConsumer::default();
        let mut session = consumer.open(SessionKind::Upload, source(vec![]));

        let first = session.next().await;
        assert!(matches!(first, Some(SessionState::Active(ref p)) if p.progress == 0));
    }

    #[tokio::test]
    async fn test_upload_flow() {
        let fragments: Vec<Fragment> = vec![
            ok("data: {\"status\":\"uploading\",\"progress\":10}\n"),
            ok("data: {\"status\":\"indexing\",\"progress\":85}\ndata: {\"status\":\"comp"),
            ok("lete\",\"message\":\"ready\"}\n"),
        ];

        let consumer = StreamConsumer::default();
        let states: Vec<_> = consumer
            .open(SessionKind::Upload, source(fragments))
            .collect()
            .await;

        assert_eq!(states.len(), 4);
        assert_eq!(
            states.last(),
            Some(&SessionState::Complete(Outcome::Uploaded {
                message: "ready".to_string()
            }))
        );
    }

    #[tokio::test]
    async fn test_stops_after_terminal_state() {
        let fragments: Vec<Fragment> = vec![
            ok("data: {\"status\":\"error\",\"message\":\"boom\"}\n"),
            ok("data: {\"status\":\"complete\",\"answer\":\"late\"}\n"),
        ];

        let consumer = StreamConsumer::default();
        let mut session = consumer.open(SessionKind::Query, source(fragments));
        session.next().await;

        let failed = session.next().await;
        assert_eq!(failed, Some(SessionState::Failed("boom".to_string())));
        assert!(!session.is_open());
        assert_eq!(session.next().await, None);
    }

    #[tokio::test]
    async fn test_transport_error_fails_session() {
        let fragments: Vec<Fragment> = vec![
            ok("data: {\"status\":\"retrieving_chunks\",\"progress\":40}\n"),
            Err("connection reset".to_string()),
        ];

        let consumer = StreamConsumer::default();
        let state = consumer
            .open(SessionKind::Query, source(fragments))
            .run()
            .await;

        assert_eq!(
            state,
            SessionState::Failed("transport error: connection reset".to_string())
        );
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_flushed() {
        let fragments: Vec<Fragment> = vec![ok("data: {\"status\":\"complete\",\"answer\":\"42\"}")];

        let consumer = StreamConsumer::default();
        let state = consumer
            .open(SessionKind::Query, source(fragments))
            .run()
            .await;

        match state {
            SessionState::Complete(outcome) => {
                assert_eq!(outcome.answer().map(|a| a.as_str()), Some("42"));
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_snapshots() {
        let fragments: Vec<Fragment> = vec![
            ok("data: {\"status\":\"uploading\",\"progress\":10}\n"),
            ok("data: {\"status\":\"complete\"}\n"),
        ];

        let consumer = StreamConsumer::default();
        let mut session = consumer.open(SessionKind::Upload, source(fragments));
        session.next().await;
        session.next().await;

        session.cancel();
        assert!(!session.is_open());
        assert_eq!(session.next().await, None);
        assert!(matches!(session.state(), SessionState::Active(_)));
    }
}
