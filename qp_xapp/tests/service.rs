mod common;

use std::io::{self, Write};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use common::{standard_store, FlakyStore, Fixture};
use pretty_assertions::assert_eq;
use qp_forecast::ForecastError;
use qp_xapp::config::{ConnectionConfig, PredictionConfig};
use qp_xapp::connection::connect_with_backoff;
use qp_xapp::dispatch::{Dispatcher, MessageHandler, MessageSink};
use qp_xapp::handler::{InboundMessage, OutboundMessage, PREDICTION_REQUEST, PREDICTION_RESPONSE};
use qp_xapp::{LineSink, QpContext};
use tempfile::{NamedTempFile, TempDir};

/// Sink that records every message it is asked to send
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MessageSink for RecordingSink {
    fn send(&self, message: &OutboundMessage) -> io::Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct BrokenSink;

impl MessageSink for BrokenSink {
    fn send(&self, _message: &OutboundMessage) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

struct Echo;

impl MessageHandler for Echo {
    fn on_message(&self, message: &InboundMessage) -> Option<OutboundMessage> {
        Some(OutboundMessage {
            msg_type: message.msg_type + 1,
            payload: message.payload.decode().unwrap_or_default().to_string(),
        })
    }
}

fn request(body: &str) -> InboundMessage {
    InboundMessage::new(PREDICTION_REQUEST, body)
}

#[test]
fn unknown_message_types_are_dropped() {
    let fixture = Fixture::standard();
    let sink = RecordingSink::default();

    assert!(!fixture.context.handle(&InboundMessage::new(12345, "{}"), &sink));
    assert!(sink.sent.lock().unwrap().is_empty());
    assert_eq!(fixture.context.stats().predict_requests, 0);
}

#[test]
fn dispatcher_routes_by_type() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(7, Arc::new(Echo));
    let sink = RecordingSink::default();

    assert!(dispatcher.handles(7));
    assert!(!dispatcher.handles(8));
    assert!(dispatcher.dispatch(&InboundMessage::new(7, "ping"), &sink));
    assert!(!dispatcher.dispatch(&InboundMessage::new(8, "ping"), &sink));

    let sent = sink.sent.lock().unwrap();
    assert_eq!(
        *sent,
        vec![OutboundMessage {
            msg_type: 8,
            payload: "ping".to_string()
        }]
    );
}

#[test]
fn failed_send_is_reported_but_still_counted() {
    let fixture = Fixture::standard();

    assert!(!fixture.context.handle(&request(r#"{"UEPredictionSet": []}"#), &BrokenSink));
    assert_eq!(fixture.context.stats().predict_requests, 1);
}

#[test]
fn run_answers_every_request_in_order() {
    let fixture = Fixture::standard();
    let sink = RecordingSink::default();

    let consumed = fixture.context.run(
        vec![
            request(r#"{"UEPredictionSet": ["ueX"]}"#),
            InboundMessage::new(1, "ignored"),
            request("{broken"),
        ],
        &sink,
    );

    assert_eq!(consumed, 3);
    assert!(!fixture.context.is_running());
    let sent = sink.sent.lock().unwrap();
    let payloads: Vec<&str> = sent.iter().map(|m| m.payload.as_str()).collect();
    assert_eq!(payloads, vec![r#"{"ueX": {}}"#, r#"{"error": "Invalid JSON payload"}"#]);
    assert!(sent.iter().all(|m| m.msg_type == PREDICTION_RESPONSE));
    assert_eq!(fixture.context.stats().predict_requests, 2);
}

/// Sink that asks the service to stop after the first reply
struct StopAfterFirst<'a> {
    context: &'a QpContext,
    sent: Mutex<usize>,
}

impl MessageSink for StopAfterFirst<'_> {
    fn send(&self, _message: &OutboundMessage) -> io::Result<()> {
        *self.sent.lock().unwrap() += 1;
        self.context.stop();
        Ok(())
    }
}

#[test]
fn stop_ends_the_loop_between_messages() {
    let fixture = Fixture::standard();
    let sink = StopAfterFirst {
        context: &fixture.context,
        sent: Mutex::new(0),
    };

    let consumed = fixture.context.run(
        vec![
            request(r#"{"UEPredictionSet": []}"#),
            request(r#"{"UEPredictionSet": []}"#),
            request(r#"{"UEPredictionSet": []}"#),
        ],
        &sink,
    );

    assert_eq!(consumed, 1);
    assert_eq!(*sink.sent.lock().unwrap(), 1);
}

#[test]
fn line_sink_writes_one_payload_per_line() {
    let fixture = Fixture::standard();
    let sink = LineSink::new(Vec::new());

    fixture.context.run(
        vec![request(r#"{"UEPredictionSet": []}"#), request(r#"{"UEPredictionSet": ["ueX"]}"#)],
        &sink,
    );

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, "{}\n{\"ueX\": {}}\n");
}

#[test]
fn backoff_retries_until_connected() {
    let store = FlakyStore::new(2);
    let config = ConnectionConfig {
        retry_interval_secs: 0,
        max_attempts: None,
    };

    assert_eq!(connect_with_backoff(&store, &config).unwrap(), 3);
    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn backoff_gives_up_after_max_attempts() {
    let store = FlakyStore::new(10);
    let config = ConnectionConfig {
        retry_interval_secs: 0,
        max_attempts: Some(4),
    };

    let err = connect_with_backoff(&store, &config).unwrap_err();
    assert!(matches!(err, ForecastError::StoreUnavailable(_)));
    assert_eq!(store.attempts.load(Ordering::SeqCst), 4);
}

#[test]
fn context_connects_through_its_store() {
    let dir = TempDir::new().unwrap();
    let mut config = common::config(dir.path(), PredictionConfig::default());
    config.connection.retry_interval_secs = 0;

    let context = QpContext::with_store(config, Arc::new(FlakyStore::new(1))).unwrap();
    assert_eq!(context.connect().unwrap(), 2);
}

#[test]
fn context_seeds_store_from_csv() {
    let mut csv = NamedTempFile::new().unwrap();
    writeln!(csv, "ue-id,nrCellIdentity,pdcpBytesDl,pdcpBytesUl").unwrap();
    for i in 0..12 {
        writeln!(csv, "ue1,c1,{}.0,{}.0", 100 + i, 10 + i).unwrap();
    }

    let dir = TempDir::new().unwrap();
    let mut config = common::config(dir.path(), PredictionConfig::default());
    config.store.seed_csv = Some(csv.path().to_path_buf());
    let context = QpContext::from_config(config).unwrap();

    let sink = RecordingSink::default();
    context.handle(&request(r#"{"UEPredictionSet": ["ue1"]}"#), &sink);

    let sent = sink.sent.lock().unwrap();
    let value: serde_json::Value = serde_json::from_str(&sent[0].payload).unwrap();
    assert_eq!(value["ue1"]["c1"].as_array().map(Vec::len), Some(2));
    assert!(value["ue1"]["c1"][0].is_number());
    assert!(dir.path().join("c1.json").is_file());
}

#[test]
fn context_from_missing_csv_fails() {
    let dir = TempDir::new().unwrap();
    let mut config = common::config(dir.path(), PredictionConfig::default());
    config.store.seed_csv = Some(dir.path().join("missing.csv"));
    assert!(QpContext::from_config(config).is_err());
}

#[test]
fn parallel_context_builds_worker_pool() {
    let dir = TempDir::new().unwrap();
    let prediction = PredictionConfig {
        workers: 3,
        ..PredictionConfig::default()
    };
    let context = QpContext::with_store(common::config(dir.path(), prediction), standard_store()).unwrap();
    assert!(format!("{:?}", context.orchestrator()).contains("Some(3)"));
}
