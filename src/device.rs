//! Device facade and I/O task.
//!
//! [`DeviceBuilder`] configures and opens a connection; [`Device`] exposes one
//! typed operation per protocol command. All transport, queue, and session
//! state is owned by a single spawned I/O task - the facade talks to it over
//! a channel, so shared state is only ever mutated from one context.
//!
//! The task lifecycle:
//! 1. Open the port (or adopt a caller-supplied stream)
//! 2. Emit `Open` and submit the connect handshake frame
//! 3. Read chunks, decode, dispatch, release the command queue
//! 4. On close or error, notify listeners and shut down
//!
//! # Example
//!
//! ```ignore
//! use nixiepipe::Device;
//!
//! #[tokio::main]
//! async fn main() -> nixiepipe::Result<()> {
//!     let device = Device::builder().connect().await?;
//!     device.set_number(42)?;
//!     device.show()?;
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::dispatch::dispatch;
use crate::error::{PipeError, Result};
use crate::event::{Event, Listeners};
use crate::protocol::{value_to_payload, Command, Frame, CONNECT_MAGIC};
use crate::queue::CommandQueue;
use crate::session::{ConnectionState, SessionState};
use crate::transport::{discover_port, open_port, PortConfig};

/// Default time to wait for the connect handshake to complete.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time to wait for the reply to an outstanding command.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Requests the facade sends to the I/O task.
enum Request {
    /// Queue a frame for transmission.
    Submit(Frame),
    /// Queue a get-number query and register a one-shot waiter for the reply.
    GetNumber { reply: oneshot::Sender<u32> },
    /// Register an event listener.
    Subscribe(mpsc::UnboundedSender<Event>),
}

/// Builder for configuring and connecting a [`Device`].
pub struct DeviceBuilder {
    port: Option<String>,
    config: PortConfig,
    connect_timeout: Duration,
    response_timeout: Option<Duration>,
}

impl DeviceBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            port: None,
            config: PortConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        }
    }

    /// Use a specific serial port instead of auto-detecting by USB descriptor.
    pub fn port(mut self, path: impl Into<String>) -> Self {
        self.port = Some(path.into());
        self
    }

    /// Override the baud rate. The stock firmware only speaks the default.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.baud_rate = baud;
        self
    }

    /// Replace the whole port configuration.
    pub fn port_config(mut self, config: PortConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how long [`connect`](Self::connect) waits for the handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the outstanding-command timeout, or disable it with `None`.
    ///
    /// The device protocol has no reply deadline of its own; without this
    /// timeout a lost reply stalls the command queue forever. On expiry the
    /// driver emits an [`Event::Error`] naming the stall and releases the
    /// next pending frame.
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Discover and open the serial port, then perform the handshake.
    ///
    /// Resolves once the device reports its firmware version. Any transport
    /// or handshake failure before that point is returned here rather than
    /// through the event stream, so callers can tell "failed to connect"
    /// from "disconnected later".
    pub async fn connect(self) -> Result<Device> {
        let path = match &self.port {
            Some(path) => path.clone(),
            None => discover_port()?,
        };
        let stream = open_port(&path, &self.config)?;
        self.attach(stream).await
    }

    /// Drive an already-open byte stream instead of a serial port.
    ///
    /// The handshake runs exactly as it does over serial. This is the path
    /// for callers that open the port themselves, and the seam tests use.
    pub async fn attach<T>(self, io: T) -> Result<Device>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (handshake_tx, mut handshake_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(io_task(io, req_rx, handshake_tx, self.response_timeout));

        let deadline = Instant::now() + self.connect_timeout;
        let version = loop {
            let event = tokio::time::timeout_at(deadline, handshake_rx.recv())
                .await
                .map_err(|_| PipeError::ConnectTimeout)?;

            match event {
                Some(Event::Connected { version }) => break version,
                Some(Event::Error { message }) => return Err(PipeError::Handshake(message)),
                Some(Event::Close) | Some(Event::Disconnect) | None => {
                    return Err(PipeError::Disconnected)
                }
                Some(_) => continue,
            }
        };

        Ok(Device {
            req_tx,
            version,
            _task: task,
        })
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected Nixie Pipe array.
///
/// Operations return as soon as the frame is queued; the device's
/// acknowledgment is asynchronous and observed via events. Mutating commands
/// are staged by the firmware and not visible until [`show`](Self::show) is
/// sent.
pub struct Device {
    /// Channel to the I/O task.
    req_tx: mpsc::UnboundedSender<Request>,
    /// Firmware version captured during the handshake.
    version: String,
    /// I/O task handle.
    _task: JoinHandle<()>,
}

impl Device {
    /// Create a new device builder.
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::new()
    }

    /// Firmware version reported by the device, `"<major>.<minor>"`.
    pub fn firmware_version(&self) -> &str {
        &self.version
    }

    /// Whether the connection is still up.
    pub fn is_connected(&self) -> bool {
        !self.req_tx.is_closed()
    }

    /// Register an event listener.
    ///
    /// Delivery starts with the next event; nothing is replayed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.req_tx.send(Request::Subscribe(tx));
        rx
    }

    /// Set the number shown across the whole array.
    pub fn set_number(&self, value: u32) -> Result<()> {
        self.submit(Command::SetNumber, value_to_payload(value).to_vec())
    }

    /// Set a single pipe's digit.
    pub fn set_pipe_number(&self, pipe: u8, value: u8) -> Result<()> {
        self.submit(Command::SetPipeNumber, vec![pipe, value])
    }

    /// Set the RGB colour of the whole array.
    pub fn set_colour(&self, r: u8, g: u8, b: u8) -> Result<()> {
        self.submit(Command::SetColour, vec![r, g, b])
    }

    /// Set a single pipe's RGB colour.
    pub fn set_pipe_colour(&self, pipe: u8, r: u8, g: u8, b: u8) -> Result<()> {
        self.submit(Command::SetPipeColour, vec![pipe, r, g, b])
    }

    /// Set array brightness, 0 off through 255 full.
    pub fn set_brightness(&self, value: u8) -> Result<()> {
        self.submit(Command::Brightness, vec![value])
    }

    /// Clear the whole array (set black).
    pub fn clear(&self) -> Result<()> {
        self.submit(Command::Clear, vec![1])
    }

    /// Clear a single pipe (set black).
    pub fn clear_pipe(&self, pipe: u8) -> Result<()> {
        self.submit(Command::ClearPipe, vec![pipe])
    }

    /// Set the units portion of the displayed number.
    pub fn set_number_units(&self, value: u32) -> Result<()> {
        self.submit(Command::SetNumberUnits, value_to_payload(value).to_vec())
    }

    /// Commit staged changes to the display.
    ///
    /// The firmware disables its serial interrupt while writing LED updates,
    /// so the reply to this command doubles as the "display refreshed"
    /// signal that releases the next queued frame.
    pub fn show(&self) -> Result<()> {
        self.submit(Command::Show, vec![1])
    }

    /// Query the number the array is currently displaying.
    ///
    /// Submits the query and resolves when the device answers. The waiter
    /// fires at most once and is then discarded; if the connection goes down
    /// first, this returns [`PipeError::Disconnected`].
    pub async fn get_number(&self) -> Result<u32> {
        let (tx, rx) = oneshot::channel();
        self.req_tx
            .send(Request::GetNumber { reply: tx })
            .map_err(|_| PipeError::Disconnected)?;
        rx.await.map_err(|_| PipeError::Disconnected)
    }

    fn submit(&self, command: Command, payload: Vec<u8>) -> Result<()> {
        self.req_tx
            .send(Request::Submit(Frame::new(command, payload)))
            .map_err(|_| PipeError::Disconnected)
    }
}

/// The I/O task: sole owner of the transport, queue, and session state.
async fn io_task<T>(
    io: T,
    mut requests: mpsc::UnboundedReceiver<Request>,
    handshake: mpsc::UnboundedSender<Event>,
    response_timeout: Option<Duration>,
) where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(io);

    let mut queue = CommandQueue::new();
    let mut state = SessionState::new();
    let mut listeners = Listeners::new();
    let mut waiters: VecDeque<oneshot::Sender<u32>> = VecDeque::new();
    let mut deadline: Option<Instant> = None;
    let mut buf = vec![0u8; 256];

    listeners.register(handshake);

    // The port is open by the time this task runs; start the handshake.
    listeners.emit(Event::Open);
    state.connection = ConnectionState::Handshaking;
    if let Some(frame) = queue.submit(Frame::new(Command::Connect, CONNECT_MAGIC.to_vec())) {
        if !send(&mut writer, &frame, &mut state, &mut queue, &mut listeners).await {
            return;
        }
        deadline = arm(response_timeout);
    }

    loop {
        tokio::select! {
            request = requests.recv() => {
                let frame = match request {
                    Some(Request::Submit(frame)) => Some(frame),
                    Some(Request::GetNumber { reply }) => {
                        waiters.push_back(reply);
                        Some(Frame::new(Command::GetNumber, vec![1]))
                    }
                    Some(Request::Subscribe(tx)) => {
                        listeners.register(tx);
                        None
                    }
                    // Every facade handle dropped; nothing left to drive.
                    None => return,
                };

                if let Some(frame) = frame {
                    match queue.submit(frame) {
                        Some(frame) => {
                            if !send(&mut writer, &frame, &mut state, &mut queue, &mut listeners).await {
                                return;
                            }
                            deadline = arm(response_timeout);
                        }
                        None => {
                            tracing::debug!(pending = queue.pending_len(), "queueing serial data");
                        }
                    }
                }
            },

            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::debug!("serial port closed");
                    state.reset();
                    queue.clear();
                    listeners.emit(Event::Close);
                    return;
                }
                Ok(n) => {
                    tracing::debug!(data = %hex(&buf[..n]), "data");

                    // Malformed chunks are dropped without dispatching or
                    // releasing the queue.
                    if state.last_frame.absorb(&buf[..n]) {
                        if let Some(event) = dispatch(&mut state) {
                            deliver(event, &mut listeners, &mut waiters);
                        }

                        match queue.response_received() {
                            Some(next) => {
                                if !send(&mut writer, &next, &mut state, &mut queue, &mut listeners).await {
                                    return;
                                }
                                deadline = arm(response_timeout);
                            }
                            None => deadline = None,
                        }
                    }
                }
                Err(e) => {
                    fail(&mut state, &mut queue, &mut listeners, e.to_string());
                    return;
                }
            },

            () = wait_until(deadline) => {
                tracing::warn!("no response to outstanding command, releasing queue");
                listeners.emit(Event::Error {
                    message: "device did not answer the outstanding command".to_string(),
                });

                match queue.response_received() {
                    Some(next) => {
                        if !send(&mut writer, &next, &mut state, &mut queue, &mut listeners).await {
                            return;
                        }
                        deadline = arm(response_timeout);
                    }
                    None => deadline = None,
                }
            }
        }
    }
}

/// Write a frame, tearing the session down on failure.
///
/// Returns `false` when the task must shut down.
async fn send<W>(
    writer: &mut W,
    frame: &Frame,
    state: &mut SessionState,
    queue: &mut CommandQueue,
    listeners: &mut Listeners,
) -> bool
where
    W: AsyncWrite + Unpin,
{
    match write_frame(writer, frame).await {
        Ok(()) => true,
        Err(e) => {
            fail(state, queue, listeners, e.to_string());
            false
        }
    }
}

/// Deliver an event, resolving at most one one-shot waiter first.
fn deliver(event: Event, listeners: &mut Listeners, waiters: &mut VecDeque<oneshot::Sender<u32>>) {
    if let Event::Updated { number } = &event {
        if let Some(waiter) = waiters.pop_front() {
            let _ = waiter.send(*number);
        }
    }
    listeners.emit(event);
}

/// Tear down on a transport failure.
///
/// A failed read or write means the link is gone (an unplugged device shows
/// up as an I/O error, not a clean close), so the error is followed by a
/// disconnect notification.
fn fail(state: &mut SessionState, queue: &mut CommandQueue, listeners: &mut Listeners, message: String) {
    tracing::error!(%message, "transport error");
    state.fail();
    queue.clear();
    listeners.emit(Event::Error { message });
    listeners.emit(Event::Disconnect);
}

/// Write one frame to the transport.
async fn write_frame<W>(writer: &mut W, frame: &Frame) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let wire = frame.encode();
    tracing::debug!(data = %hex(&wire), "writing serial data");
    writer.write_all(&wire).await?;
    writer.flush().await
}

/// Sleep until the deadline, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(instant) => tokio::time::sleep_until(instant).await,
        None => std::future::pending().await,
    }
}

fn arm(timeout: Option<Duration>) -> Option<Instant> {
    timeout.map(|t| Instant::now() + t)
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
