#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cartlink::frame::{self, cmd};
use cartlink::types::CartType;
use cartlink_host::config::HostConfig;
use cartlink_host::events::{SessionEvent, Status};
use cartlink_host::transport::{
    SerialDevice, Transport, TransportError, TransportErrorKind, TransportNotifier,
};
use tokio::sync::broadcast;

pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct Inner {
    open: bool,
    rx: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    notifier: Option<TransportNotifier>,
    responder: Option<Responder>,
    fail_writes: bool,
    write_attempts: usize,
    opened_with: Option<(SerialDevice, u32)>,
}

impl Inner {
    fn deliver(&mut self, bytes: &[u8], notify: bool) {
        self.rx.extend(bytes.iter().copied());
        if notify {
            if let Some(n) = &self.notifier {
                n.data_ready();
            }
        }
    }
}

/// In-memory transport. Bytes pushed by the test (or produced by the
/// responder in reply to host writes) become readable by the session.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(responder: impl FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static) -> Self {
        let mock = Self::default();
        mock.inner.lock().unwrap().responder = Some(Box::new(responder));
        mock
    }

    /// Replies to the handshake request with `reply`, if any.
    pub fn handshake_reply(reply: Option<u8>) -> Self {
        Self::with_responder(move |bytes| match (bytes, reply) {
            ([cmd::HANDSHAKE_REQUEST], Some(r)) => vec![vec![r]],
            _ => Vec::new(),
        })
    }

    /// Bytes from the device, with a data-ready notification if subscribed.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.inner.lock().unwrap().deliver(bytes, true);
    }

    pub fn push_rx_silent(&self, bytes: &[u8]) {
        self.inner.lock().unwrap().deliver(bytes, false);
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().written.clone()
    }

    pub fn last_written(&self) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().written.last().cloned()
    }

    pub fn clear_written(&self) {
        self.inner.lock().unwrap().written.clear();
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.lock().unwrap().notifier.is_some()
    }

    pub fn opened_with(&self) -> Option<(SerialDevice, u32)> {
        self.inner.lock().unwrap().opened_with.clone()
    }

    /// Every call to `write`, including the ones that failed.
    pub fn write_attempts(&self) -> usize {
        self.inner.lock().unwrap().write_attempts
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    pub fn raise_error(&self, kind: TransportErrorKind, message: &str) {
        if let Some(n) = &self.inner.lock().unwrap().notifier {
            n.error(kind, message);
        }
    }
}

impl Transport for MockTransport {
    fn devices(&self) -> Vec<SerialDevice> {
        vec![SerialDevice::new("Mock Dumper", "mock0")]
    }

    fn open(&mut self, device: &SerialDevice, baud_rate: u32) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.open = true;
        inner.opened_with = Some((device.clone(), baud_rate));
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.open = false;
        inner.rx.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().unwrap().open
    }

    fn bytes_available(&self) -> usize {
        self.inner.lock().unwrap().rx.len()
    }

    fn read(&mut self, count: usize) -> Result<Vec<u8>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        let count = count.min(inner.rx.len());
        Ok(inner.rx.drain(..count).collect())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.inner
            .lock()
            .unwrap()
            .rx
            .pop_front()
            .ok_or_else(|| TransportError::Backend("no data".into()))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_attempts += 1;
        if !inner.open {
            return Err(TransportError::NotOpen);
        }
        if inner.fail_writes {
            return Err(TransportError::Backend("write failed".into()));
        }
        inner.written.push(bytes.to_vec());

        let replies = match inner.responder.as_mut() {
            Some(responder) => responder(bytes),
            None => Vec::new(),
        };
        for reply in replies {
            inner.deliver(&reply, true);
        }
        Ok(())
    }

    fn subscribe(&mut self, notifier: TransportNotifier) {
        self.inner.lock().unwrap().notifier = Some(notifier);
    }

    fn unsubscribe(&mut self) {
        self.inner.lock().unwrap().notifier = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitReadOk,
    AwaitWriteOk,
    Writing,
}

/// Cartridge dumper firmware stand-in, driven by host writes.
pub struct FakeCartridge {
    header: Vec<u8>,
    payload: Vec<u8>,
    save: Arc<Mutex<Vec<u8>>>,
    save_header: Vec<u8>,
    phase: Phase,
    index: Option<usize>,
    /// Number of verify echoes to corrupt before behaving.
    corrupt_echoes: usize,
    pub aborts: Arc<Mutex<Vec<u8>>>,
}

impl FakeCartridge {
    pub fn rom(cart_type: CartType, name: &[u8], payload: Vec<u8>) -> Self {
        let mut header = frame::encode_cart_type(cart_type).to_vec();
        header.extend_from_slice(&frame::encode_name(name));
        header.extend_from_slice(&frame::encode_size(payload.len() as u32));
        Self::new(header, payload, 0)
    }

    /// Save-RAM target of `size` bytes for the write flow.
    pub fn save_target(size: usize) -> Self {
        let mut cart = Self::new(Vec::new(), Vec::new(), size);
        let mut save_header = frame::encode_cart_type(CartType::GbaOnly).to_vec();
        save_header.extend_from_slice(&frame::encode_size(size as u32));
        cart.save_header = save_header;
        cart
    }

    fn new(header: Vec<u8>, payload: Vec<u8>, save_size: usize) -> Self {
        Self {
            header,
            payload,
            save: Arc::new(Mutex::new(vec![0; save_size])),
            save_header: Vec::new(),
            phase: Phase::Idle,
            index: None,
            corrupt_echoes: 0,
            aborts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn corrupt_echoes(mut self, count: usize) -> Self {
        self.corrupt_echoes = count;
        self
    }

    pub fn save(&self) -> Arc<Mutex<Vec<u8>>> {
        self.save.clone()
    }

    pub fn respond(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        match (self.phase, bytes) {
            (_, [cmd::HANDSHAKE_REQUEST]) => vec![vec![cmd::HANDSHAKE_ACCEPT]],
            (_, [cmd::ABORT]) | (_, [cmd::ABORT_CMD]) => {
                self.aborts.lock().unwrap().push(bytes[0]);
                self.phase = Phase::Idle;
                Vec::new()
            }
            (Phase::Idle, b"API_READ_ROM\n") | (Phase::Idle, b"API_READ_RAM\n") => {
                self.phase = Phase::AwaitReadOk;
                vec![self.header.clone()]
            }
            (Phase::Idle, b"API_WRITE_RAM\n") => {
                self.phase = Phase::AwaitWriteOk;
                vec![self.save_header.clone()]
            }
            (Phase::AwaitReadOk, [cmd::OK]) => {
                self.phase = Phase::Idle;
                vec![self.payload.clone()]
            }
            (Phase::AwaitWriteOk, [cmd::OK]) => {
                self.phase = Phase::Writing;
                self.index = None;
                vec![vec![cmd::TASK_START]]
            }
            (Phase::Writing, [cmd::OK, byte]) => {
                let next = self.index.map_or(0, |i| i + 1);
                let len = self.save.lock().unwrap().len();
                if next >= len {
                    self.phase = Phase::Idle;
                    return vec![vec![cmd::TASK_FINISHED]];
                }
                self.index = Some(next);
                self.store(*byte)
            }
            (Phase::Writing, [cmd::NOK, byte]) => self.store(*byte),
            _ => Vec::new(),
        }
    }

    fn store(&mut self, byte: u8) -> Vec<Vec<u8>> {
        let index = self.index.unwrap_or(0);
        let written = if self.corrupt_echoes > 0 {
            self.corrupt_echoes -= 1;
            byte ^ 0xFF
        } else {
            byte
        };
        self.save.lock().unwrap()[index] = written;
        vec![vec![cmd::VERIFY, written]]
    }

    pub fn into_transport(self) -> MockTransport {
        let mut cart = self;
        MockTransport::with_responder(move |bytes| cart.respond(bytes))
    }
}

pub fn device() -> SerialDevice {
    SerialDevice::new("Mock Dumper", "mock0")
}

pub fn test_config(output_dir: &Path) -> HostConfig {
    HostConfig {
        handshake_interval_ms: 1,
        header_wait_ms: 20,
        write_settle_ms: 2,
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn warnings(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Warning { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn header_bytes(cart_type: CartType, name: &[u8], size: u32) -> Vec<u8> {
    let mut buf = frame::encode_cart_type(cart_type).to_vec();
    buf.extend_from_slice(&frame::encode_name(name));
    buf.extend_from_slice(&frame::encode_size(size));
    buf
}

pub fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

pub fn statuses(events: &[SessionEvent]) -> Vec<Status> {
    events.iter().filter_map(|e| e.status()).collect()
}

/// Collects events until `status` shows up or `timeout` passes.
pub async fn wait_for_status(
    rx: &mut broadcast::Receiver<SessionEvent>,
    status: Status,
    timeout: Duration,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(ev) = rx.recv().await {
            let done = ev.status() == Some(status);
            events.push(ev);
            if done {
                break;
            }
        }
    })
    .await;
    events
}
