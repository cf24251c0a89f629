//! In-memory test doubles: a manual clock, a recording connection provider
//! and a channel-backed broker, so the full pipeline can be exercised
//! without a real broker. Used by the crate's own tests and usable from
//! embedding applications' tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use tokio::sync::broadcast;

use crate::streambridge::cache::Clock;
use crate::streambridge::client::{
    ClientDescriptor, ClientError, ConnectionProvider, ConsumerClient, InboundMessage,
    OutboundMessage, ProducerClient,
};

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

/// Connection provider that counts constructions and closures and can be
/// told to fail or stall, for exercising cache construction paths.
#[derive(Clone)]
pub struct RecordingProvider {
    inner: Arc<RecordingInner>,
}

struct RecordingInner {
    constructs: AtomicUsize,
    closes: AtomicUsize,
    fail_message: Mutex<Option<String>>,
    construct_delay: Mutex<Option<Duration>>,
    fail_closes: AtomicBool,
}

impl RecordingProvider {
    pub fn new() -> Self {
        RecordingProvider {
            inner: Arc::new(RecordingInner {
                constructs: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                fail_message: Mutex::new(None),
                construct_delay: Mutex::new(None),
                fail_closes: AtomicBool::new(false),
            }),
        }
    }

    /// Every construction fails with this message until cleared.
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        *self.inner.fail_message.lock().unwrap() = Some(message.into());
        self
    }

    /// Every construction sleeps first, to widen race windows in tests.
    pub fn construct_delay(self, delay: Duration) -> Self {
        *self.inner.construct_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Every close reports a failure (the cache logs and swallows these).
    pub fn fail_closes(self) -> Self {
        self.inner.fail_closes.store(true, Ordering::Release);
        self
    }

    pub fn clear_failure(&self) {
        *self.inner.fail_message.lock().unwrap() = None;
    }

    pub fn construct_count(&self) -> usize {
        self.inner.constructs.load(Ordering::Acquire)
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::Acquire)
    }
}

impl Default for RecordingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionProvider for RecordingProvider {
    type Handle = StubClient;

    async fn construct(&self, descriptor: &ClientDescriptor) -> Result<StubClient, ClientError> {
        let delay = *self.inner.construct_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.constructs.fetch_add(1, Ordering::AcqRel);
        let failure = self.inner.fail_message.lock().unwrap().clone();
        match failure {
            Some(message) => Err(ClientError::ConstructionFailed(message)),
            None => Ok(StubClient::new(descriptor.destination())),
        }
    }

    async fn close(&self, handle: &StubClient) -> Result<(), ClientError> {
        self.inner.closes.fetch_add(1, Ordering::AcqRel);
        handle.closed.store(true, Ordering::Release);
        if self.inner.fail_closes.load(Ordering::Acquire) {
            return Err(ClientError::CloseFailed("injected close failure".to_string()));
        }
        Ok(())
    }
}

/// Producer handle that records what it was asked to send.
#[derive(Debug)]
pub struct StubClient {
    destination: String,
    closed: AtomicBool,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl StubClient {
    fn new(destination: &str) -> Self {
        StubClient {
            destination: destination.to_string(),
            closed: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProducerClient for StubClient {
    async fn send(&self, message: OutboundMessage) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::SendFailed("client is closed".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

const MEMORY_TOPIC_DEPTH: usize = 64;

/// Channel-backed broker: one broadcast channel per destination.
///
/// Messages published before a consumer subscribes are not replayed, so
/// tests subscribe first and send second.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<InboundMessage>>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic(&self, destination: &str) -> broadcast::Sender<InboundMessage> {
        self.topics
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_insert_with(|| broadcast::channel(MEMORY_TOPIC_DEPTH).0)
            .clone()
    }

    /// Provider pair wired to this broker.
    pub fn providers(&self) -> (MemoryProducerProvider, MemoryConsumerProvider) {
        (
            MemoryProducerProvider {
                broker: self.clone(),
            },
            MemoryConsumerProvider {
                broker: self.clone(),
            },
        )
    }
}

#[derive(Clone)]
pub struct MemoryProducerProvider {
    broker: MemoryBroker,
}

#[async_trait]
impl ConnectionProvider for MemoryProducerProvider {
    type Handle = MemoryProducer;

    async fn construct(
        &self,
        descriptor: &ClientDescriptor,
    ) -> Result<MemoryProducer, ClientError> {
        Ok(MemoryProducer {
            destination: descriptor.destination().to_string(),
            topic: self.broker.topic(descriptor.destination()),
            closed: AtomicBool::new(false),
        })
    }

    async fn close(&self, handle: &MemoryProducer) -> Result<(), ClientError> {
        handle.closed.store(true, Ordering::Release);
        Ok(())
    }
}

pub struct MemoryProducer {
    destination: String,
    topic: broadcast::Sender<InboundMessage>,
    closed: AtomicBool,
}

impl MemoryProducer {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ProducerClient for MemoryProducer {
    async fn send(&self, message: OutboundMessage) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::SendFailed("producer is closed".to_string()));
        }
        let inbound = InboundMessage {
            destination: self.destination.clone(),
            payload: message.payload,
            key: message.key,
            properties: message.properties,
            event_time: message.event_time,
        };
        if self.topic.send(inbound).is_err() {
            debug!(
                "No subscribers on destination '{}', message dropped",
                self.destination
            );
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemoryConsumerProvider {
    broker: MemoryBroker,
}

#[async_trait]
impl ConnectionProvider for MemoryConsumerProvider {
    type Handle = MemoryConsumer;

    async fn construct(
        &self,
        descriptor: &ClientDescriptor,
    ) -> Result<MemoryConsumer, ClientError> {
        let receiver = self.broker.topic(descriptor.destination()).subscribe();
        Ok(MemoryConsumer {
            receiver: tokio::sync::Mutex::new(receiver),
            closed: AtomicBool::new(false),
        })
    }

    async fn close(&self, handle: &MemoryConsumer) -> Result<(), ClientError> {
        handle.closed.store(true, Ordering::Release);
        Ok(())
    }
}

pub struct MemoryConsumer {
    receiver: tokio::sync::Mutex<broadcast::Receiver<InboundMessage>>,
    closed: AtomicBool,
}

impl MemoryConsumer {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ConsumerClient for MemoryConsumer {
    async fn receive(&self, timeout: Duration) -> Result<InboundMessage, ClientError> {
        if self.is_closed() {
            return Err(ClientError::ReceiveFailed("consumer is closed".to_string()));
        }
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(err)) => Err(ClientError::ReceiveFailed(err.to_string())),
            Err(_) => Err(ClientError::Timeout),
        }
    }
}
