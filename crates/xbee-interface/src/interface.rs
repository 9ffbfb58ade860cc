use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info, warn};
use xbee_frame::{Frame, FrameConfig, FrameError, FrameReader, FrameWriter};
use xbee_schema::Field;
use xbee_transport::{TransportError, XBeeStream};

use crate::error::{InterfaceError, Result};
use crate::event::Event;
use crate::frame_id::FrameIdAllocator;

/// Default time to wait for a correlated response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How often the reader thread wakes to check for shutdown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events a request may set aside while waiting for its response.
pub const DEFAULT_MAX_BACKLOG: usize = 1024;

/// Interface behavior.
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    /// API mode, body limit and write timeout. The read timeout is replaced
    /// by `poll_interval`.
    pub frame: FrameConfig,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Cap on events queued behind a pending request.
    pub max_backlog: usize,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_backlog: DEFAULT_MAX_BACKLOG,
        }
    }
}

/// A radio connection with a background reader.
///
/// Inbound frames are decoded on a dedicated thread and handed over through
/// a channel; nothing runs on the reader thread on behalf of the caller.
pub struct XBeeInterface {
    writer: FrameWriter<XBeeStream>,
    control: XBeeStream,
    events: Receiver<Event>,
    /// Events pulled off the channel while waiting for a response.
    backlog: VecDeque<Event>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    frame_ids: FrameIdAllocator,
    config: InterfaceConfig,
    closed: bool,
}

impl XBeeInterface {
    /// Take over an open stream and start the reader thread.
    pub fn from_stream(stream: XBeeStream, config: InterfaceConfig) -> Result<Self> {
        let control = stream.try_clone()?;
        let reader_stream = stream.try_clone()?;

        let reader_config = FrameConfig {
            read_timeout: Some(config.poll_interval),
            ..config.frame.clone()
        };
        let reader = FrameReader::with_config_stream(reader_stream, reader_config)?;
        let writer = FrameWriter::with_config_stream(stream, config.frame.clone())?;

        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("xbee-reader".to_string())
                .spawn(move || reader_loop(reader, tx, stop))
                .map_err(TransportError::Io)?
        };

        info!(
            transport = control.transport_name(),
            api_mode = ?config.frame.api_mode,
            "radio interface started"
        );

        Ok(Self {
            writer,
            control,
            events: rx,
            backlog: VecDeque::new(),
            stop,
            reader: Some(handle),
            frame_ids: FrameIdAllocator::new(),
            config,
            closed: false,
        })
    }

    /// Write one frame as-is.
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        if self.closed {
            return Err(InterfaceError::Disconnected("interface closed".to_string()));
        }
        self.writer.write_frame(frame)?;
        Ok(())
    }

    /// Next inbound event, waiting up to `timeout` (forever when `None`).
    pub fn next_event(&mut self, timeout: Option<Duration>) -> Result<Event> {
        if let Some(event) = self.backlog.pop_front() {
            return Ok(event);
        }
        self.pull(timeout)
    }

    /// Next inbound frame (blocking).
    ///
    /// Frame-scoped stream errors come back as `Err(InterfaceError::Frame)`;
    /// receiving can continue after them.
    pub fn recv(&mut self) -> Result<Frame> {
        let event = self.next_event(None)?;
        event_to_frame(event)
    }

    /// Next inbound frame, waiting at most `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Frame> {
        let event = self.next_event(Some(timeout))?;
        event_to_frame(event)
    }

    /// Next inbound frame if one is already waiting.
    pub fn try_recv(&mut self) -> Result<Option<Frame>> {
        if let Some(event) = self.backlog.pop_front() {
            return event_to_frame(event).map(Some);
        }
        match self.events.try_recv() {
            Ok(event) => event_to_frame(event).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(reader_gone()),
        }
    }

    /// Send `frame` with a fresh frame id and wait for the inbound frame
    /// echoing it.
    ///
    /// Anything else that arrives meanwhile stays queued, in order, for
    /// [`recv`](Self::recv). Once `max_backlog` events are queued the request
    /// fails with [`InterfaceError::BufferFull`] and nothing is dropped.
    pub fn request(&mut self, mut frame: Frame) -> Result<Frame> {
        if frame.frame_type.is_inbound() || !frame.frame_type.schema().has_field(Field::FrameId) {
            return Err(InterfaceError::InvalidRequest(format!(
                "{} frames cannot be correlated",
                frame.frame_type
            )));
        }

        let id = self.next_frame_id();
        frame.frame_id = id;
        self.send(&frame)?;
        debug!(frame_type = %frame.frame_type, frame_id = id, "request sent");

        let timeout = self.config.request_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(InterfaceError::Timeout(timeout));
            }
            if self.backlog.len() >= self.config.max_backlog {
                warn!(
                    queued = self.backlog.len(),
                    frame_id = id,
                    "backlog full while waiting for response"
                );
                return Err(InterfaceError::BufferFull(self.backlog.len()));
            }
            let event = match self.pull(Some(remaining)) {
                Err(InterfaceError::Timeout(_)) => return Err(InterfaceError::Timeout(timeout)),
                other => other?,
            };
            match event {
                Event::Frame(response)
                    if response.frame_type.is_inbound() && response.correlation_id() == Some(id) =>
                {
                    debug!(frame_type = %response.frame_type, frame_id = id, "response matched");
                    return Ok(response);
                }
                Event::Closed { reason } => {
                    let message = reason.clone().unwrap_or_else(|| "stream closed".to_string());
                    self.backlog.push_back(Event::Closed { reason });
                    return Err(InterfaceError::Disconnected(message));
                }
                other => self.backlog.push_back(other),
            }
        }
    }

    /// Run a local AT command and return the radio's response frame.
    pub fn at_command(&mut self, command: [u8; 2], parameter: &[u8]) -> Result<Frame> {
        self.request(Frame::at_command(0, command, Bytes::copy_from_slice(parameter)))
    }

    /// Allocate the next frame id (1..=255).
    pub fn next_frame_id(&self) -> u8 {
        self.frame_ids.next_id()
    }

    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    /// Stop the reader thread and shut the stream down.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stop.store(true, Ordering::Release);
        let shutdown = self.control.shutdown();

        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                warn!("reader thread panicked");
            }
        }
        info!("radio interface closed");
        shutdown.map_err(Into::into)
    }

    fn pull(&mut self, timeout: Option<Duration>) -> Result<Event> {
        match timeout {
            None => self.events.recv().map_err(|_| reader_gone()),
            Some(timeout) => match self.events.recv_timeout(timeout) {
                Ok(event) => Ok(event),
                Err(RecvTimeoutError::Timeout) => Err(InterfaceError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => Err(reader_gone()),
            },
        }
    }
}

impl Drop for XBeeInterface {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "error closing radio interface");
        }
    }
}

impl std::fmt::Debug for XBeeInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XBeeInterface")
            .field("stream", &self.control)
            .field("backlog", &self.backlog.len())
            .field("closed", &self.closed)
            .finish()
    }
}

fn event_to_frame(event: Event) -> Result<Frame> {
    match event {
        Event::Frame(frame) => Ok(frame),
        Event::Error(err) => Err(InterfaceError::Frame(err)),
        Event::Closed { reason } => Err(InterfaceError::Disconnected(
            reason.unwrap_or_else(|| "stream closed".to_string()),
        )),
    }
}

fn reader_gone() -> InterfaceError {
    InterfaceError::Disconnected("reader thread stopped".to_string())
}

fn reader_loop(mut reader: FrameReader<XBeeStream>, events: Sender<Event>, stop: Arc<AtomicBool>) {
    loop {
        if stop.load(Ordering::Acquire) {
            debug!("reader thread stopping");
            return;
        }

        let event = match reader.read_frame() {
            Ok(frame) => {
                debug!(frame_type = %frame.frame_type, "frame received");
                Event::Frame(frame)
            }
            Err(err) if err.is_timeout() => continue,
            Err(err) if err.is_recoverable() => Event::Error(err),
            Err(FrameError::ConnectionClosed) => {
                info!("radio stream closed");
                let _ = events.send(Event::Closed { reason: None });
                return;
            }
            Err(err) => {
                if !stop.load(Ordering::Acquire) {
                    warn!(error = %err, "radio stream failed");
                }
                let _ = events.send(Event::Closed {
                    reason: Some(err.to_string()),
                });
                return;
            }
        };

        if events.send(event).is_err() {
            return;
        }
    }
}
