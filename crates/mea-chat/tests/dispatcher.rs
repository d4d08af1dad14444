#![allow(missing_docs, unused_results)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use mea_chat::{MessageDispatcher, SubmitStatus, Transcript, TranscriptEvent};
use mea_core::{
    ClientError, ConnectionState, Message, MessageKind, QueryResponse, Reply, RequestId,
    SendError, Sender,
};
use mea_transport::{PendingReply, QueryChannel, ReplySender};
use parking_lot::Mutex;
use proptest::prelude::*;

/// Channel whose replies are scripted or resolved by hand.
struct FakeChannel {
    state: Mutex<ConnectionState>,
    sent: Mutex<Vec<String>>,
    scripted: Mutex<VecDeque<Result<Reply, ClientError>>>,
    held: Mutex<Vec<ReplySender>>,
}

impl FakeChannel {
    fn open() -> Arc<Self> {
        Self::with_state(ConnectionState::Open)
    }

    fn with_state(state: ConnectionState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            sent: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            held: Mutex::new(Vec::new()),
        })
    }

    fn script(&self, reply: Result<Reply, ClientError>) {
        self.scripted.lock().push_back(reply);
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Resolve the `idx`-th held request.
    fn resolve(&self, idx: usize, reply: Result<Reply, ClientError>) {
        let tx = self.held.lock().remove(idx);
        tx.send(reply).unwrap();
    }
}

impl QueryChannel for FakeChannel {
    fn connection_state(&self) -> ConnectionState {
        self.state.lock().clone()
    }

    fn request(&self, text: &str) -> Result<PendingReply, SendError> {
        let state = self.connection_state();
        if !state.is_open() {
            return Err(SendError::NotReady { state });
        }
        self.sent.lock().push(text.to_string());
        let (tx, pending) = PendingReply::pair(RequestId::new());
        match self.scripted.lock().pop_front() {
            Some(reply) => {
                let _ = tx.send(reply);
            }
            None => self.held.lock().push(tx),
        }
        Ok(pending)
    }
}

fn dispatcher(channel: &Arc<FakeChannel>) -> MessageDispatcher {
    let channel: Arc<dyn QueryChannel> = Arc::clone(channel) as Arc<dyn QueryChannel>;
    MessageDispatcher::new(channel, Transcript::new())
}

fn terminal(messages: &[Message]) -> Vec<&Message> {
    messages
        .iter()
        .filter(|m| m.sender == Sender::System && !m.is_typing())
        .collect()
}

fn responses(lines: &[&str]) -> Reply {
    Reply::Responses(lines.iter().map(|s| (*s).to_string()).collect())
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let channel = FakeChannel::open();
    let dispatcher = dispatcher(&channel);
    let mut events = dispatcher.subscribe();

    for input in ["", "   ", "\n\t "] {
        assert!(matches!(dispatcher.submit(input), SubmitStatus::Ignored));
    }
    assert!(dispatcher.transcript().is_empty());
    assert!(channel.sent().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn submit_while_closed_appends_error_without_sending() {
    let channel = FakeChannel::with_state(ConnectionState::Closed);
    let dispatcher = dispatcher(&channel);

    assert!(matches!(dispatcher.submit("hello"), SubmitStatus::Rejected));

    let transcript = dispatcher.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].sender, Sender::User);
    assert_eq!(transcript[0].text, "hello");
    assert_eq!(transcript[1].kind, MessageKind::Error);
    assert_eq!(
        transcript[1].text,
        "Not connected to the server. Reconnect and try again."
    );
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn empty_results_render_suggestions() {
    let channel = FakeChannel::open();
    channel.script(Ok(Reply::Query(QueryResponse {
        query: "hello".into(),
        suggestions: vec!["Try X".into()],
        ..QueryResponse::default()
    })));
    let dispatcher = dispatcher(&channel);

    dispatcher.submit("hello").settled().await;

    let transcript = dispatcher.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].text, "hello");
    let answer = &transcript[1];
    assert_eq!(answer.sender, Sender::System);
    assert_eq!(answer.kind, MessageKind::Normal);
    assert!(answer.text.contains("No documents found"));
    assert!(answer.text.contains("• Try X"));
    assert_eq!(channel.sent(), ["hello"]);
}

#[tokio::test]
async fn input_is_trimmed_before_sending() {
    let channel = FakeChannel::open();
    channel.script(Ok(responses(&["ok"])));
    let dispatcher = dispatcher(&channel);

    dispatcher.submit("  spaced out \n").settled().await;
    assert_eq!(channel.sent(), ["spaced out"]);
    assert_eq!(dispatcher.transcript()[0].text, "spaced out");
}

#[tokio::test]
async fn assistant_lines_are_joined() {
    let channel = FakeChannel::open();
    channel.script(Ok(responses(&["first line", "second line"])));
    let dispatcher = dispatcher(&channel);

    dispatcher.submit("hola").settled().await;
    let transcript = dispatcher.transcript();
    assert_eq!(transcript[1].text, "first line\nsecond line");
}

#[tokio::test]
async fn every_failure_kind_yields_one_error_message() {
    let cases = [
        (
            ClientError::Network("connection refused".into()),
            "Sorry, I encountered an error while processing your query. Please try again.",
        ),
        (
            ClientError::Http {
                status: 400,
                message: "Missing query 'q'".into(),
            },
            "Error: Missing query 'q'",
        ),
        (
            ClientError::Decode("expected value".into()),
            "Could not process the server response.",
        ),
        (
            ClientError::Backend("index unavailable".into()),
            "Error: index unavailable",
        ),
        (
            ClientError::AuthMissing,
            "You need to log in before sending this request.",
        ),
    ];

    for (err, expected) in cases {
        let channel = FakeChannel::open();
        channel.script(Err(err));
        let dispatcher = dispatcher(&channel);

        dispatcher.submit("q").settled().await;

        let transcript = dispatcher.transcript();
        assert_eq!(transcript.len(), 2, "{expected}");
        assert_eq!(transcript[1].kind, MessageKind::Error);
        assert_eq!(transcript[1].text, expected);
    }
}

#[tokio::test]
async fn dropped_connection_fails_the_interaction() {
    let channel = FakeChannel::open();
    let dispatcher = dispatcher(&channel);

    let status = dispatcher.submit("q");
    channel.held.lock().clear();
    status.settled().await;

    let transcript = dispatcher.transcript();
    assert_eq!(transcript.len(), 2);
    assert!(transcript[1].is_error());
    assert!(transcript[1].text.starts_with("Connection error:"));
}

#[tokio::test]
async fn concurrent_submits_append_in_arrival_order() {
    let channel = FakeChannel::open();
    let dispatcher = dispatcher(&channel);

    let first = dispatcher.submit("first");
    let second = dispatcher.submit("second");

    let in_flight = dispatcher.transcript();
    assert_eq!(in_flight.len(), 4);
    assert_eq!(in_flight.iter().filter(|m| m.is_typing()).count(), 2);

    // second answer arrives first
    channel.resolve(1, Ok(responses(&["answer two"])));
    second.settled().await;
    channel.resolve(0, Ok(responses(&["answer one"])));
    first.settled().await;

    let texts: Vec<String> = dispatcher.transcript().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, ["first", "second", "answer two", "answer one"]);
}

#[tokio::test(start_paused = true)]
async fn placeholder_animates_while_waiting() {
    let channel = FakeChannel::open();
    let dispatcher = dispatcher(&channel).with_typing_interval(Duration::from_millis(500));

    let status = dispatcher.submit("slow");
    assert_eq!(dispatcher.transcript()[1].text, "Thinking");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(dispatcher.transcript()[1].text, "Thinking.");
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(dispatcher.transcript()[1].text, "Thinking");

    channel.resolve(0, Ok(responses(&["done"])));
    status.settled().await;

    let transcript = dispatcher.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].text, "done");
    assert!(!transcript[1].is_typing());
}

#[tokio::test(start_paused = true)]
async fn reply_timeout_ends_the_interaction() {
    let channel = FakeChannel::open();
    let dispatcher = dispatcher(&channel).with_reply_timeout(Duration::from_secs(30));

    dispatcher.submit("never answered").settled().await;

    let transcript = dispatcher.transcript();
    assert_eq!(transcript.len(), 2);
    assert!(transcript[1].is_error());
    assert_eq!(
        transcript[1].text,
        "Sorry, I encountered an error while processing your query. Please try again."
    );
}

#[tokio::test]
async fn events_describe_the_interaction() {
    let channel = FakeChannel::open();
    channel.script(Ok(responses(&["hi"])));
    let dispatcher = dispatcher(&channel);
    let mut events = dispatcher.subscribe();

    dispatcher.submit("hello").settled().await;

    let TranscriptEvent::Appended(user) = events.recv().await.unwrap() else {
        panic!("expected the user message first");
    };
    assert_eq!(user.sender, Sender::User);
    let TranscriptEvent::Appended(placeholder) = events.recv().await.unwrap() else {
        panic!("expected the placeholder");
    };
    assert!(placeholder.is_typing());
    assert_eq!(
        events.recv().await.unwrap(),
        TranscriptEvent::Removed(placeholder.id)
    );
    let TranscriptEvent::Appended(answer) = events.recv().await.unwrap() else {
        panic!("expected the answer");
    };
    assert_eq!(answer.text, "hi");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_user_and_one_terminal_message_per_submit(
        input in "[ a-z]{1,16}",
        succeed in any::<bool>(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let blank = input.trim().is_empty();

        let transcript = rt.block_on(async {
            let channel = FakeChannel::open();
            channel.script(if succeed {
                Ok(responses(&["fine"]))
            } else {
                Err(ClientError::Network("down".into()))
            });
            let dispatcher = dispatcher(&channel);
            dispatcher.submit(&input).settled().await;
            dispatcher.transcript()
        });

        if blank {
            prop_assert!(transcript.is_empty());
        } else {
            let users = transcript.iter().filter(|m| m.sender == Sender::User).count();
            prop_assert_eq!(users, 1);
            prop_assert_eq!(terminal(&transcript).len(), 1);
            prop_assert!(transcript.iter().all(|m| !m.is_typing()));
        }
    }
}
