// ==========================================
// MPV PLAYER BACKEND
// ==========================================
// mpv as the external video player, driven over its JSON IPC socket.
//
//   MpvProcess::spawn()        starts `mpv --idle` listening on a socket
//   spawn_probe()              retries the socket every 500ms until it connects,
//         │                    then stops for good
//         ├── writer_task      ← command lines via mpsc → socket
//         └── reader_task      ← JSON lines from socket
//                                 ├── first reply        → PlayerEvent::Ready
//                                 ├── start-file         → readings count again
//                                 ├── property-change    → cached transport readings
//                                 └── end-file (error)   → PlayerEvent::Error
//
// `MpvHandle` is what the playback controller holds. Commands are fire-and-forget
// and transport readings come from the cache the reader task keeps fresh, so
// nothing on the UI loop ever waits on mpv.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::handle::PlaybackHandle;
use crate::error::PlaybackError;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

pub const OBS_TIME_POS: u64 = 1;
pub const OBS_DURATION: u64 = 2;

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

// What the mpv integration reports back to the event loop
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Attached(MpvHandle),
    Ready,
    Error(String),
}

pub type Notify = Arc<dyn Fn(PlayerEvent) + Send + Sync>;

// ==========================================
// TRANSPORT CACHE
// ==========================================

#[derive(Debug)]
struct Transport {
    time_pos: f64,
    duration: f64,
    // loadfile commands mpv has not answered with start-file yet; property
    // changes arriving meanwhile still describe the previous file
    pending_loads: u32,
}

impl Default for Transport {
    fn default() -> Self {
        // NaN until mpv reports something; the controller skips non-finite reads
        Transport {
            time_pos: f64::NAN,
            duration: f64::NAN,
            pending_loads: 0,
        }
    }
}

impl Transport {
    fn begin_load(&mut self) {
        self.time_pos = f64::NAN;
        self.duration = f64::NAN;
        self.pending_loads += 1;
    }

    fn file_started(&mut self) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
    }

    fn is_current(&self) -> bool {
        self.pending_loads == 0
    }
}

// ==========================================
// HANDLE
// ==========================================

#[derive(Debug, Clone)]
pub struct MpvHandle {
    tx: mpsc::UnboundedSender<String>,
    transport: Arc<Mutex<Transport>>,
}

impl MpvHandle {
    fn send_command(&self, command: Value) -> Result<(), PlaybackError> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut line =
            serde_json::to_string(&msg).map_err(|e| PlaybackError::Command(e.to_string()))?;
        line.push('\n');
        self.tx.send(line).map_err(|_| PlaybackError::Disconnected)
    }

    fn observe_transport(&self) -> Result<(), PlaybackError> {
        self.send_command(json!(["observe_property", OBS_TIME_POS, "time-pos"]))?;
        self.send_command(json!(["observe_property", OBS_DURATION, "duration"]))
    }

    fn read<F: Fn(&Transport) -> f64>(&self, f: F) -> Result<f64, PlaybackError> {
        self.transport
            .lock()
            .map(|t| f(&t))
            .map_err(|_| PlaybackError::Disconnected)
    }
}

impl PlaybackHandle for MpvHandle {
    fn load_by_id(&mut self, video_id: &str) -> Result<(), PlaybackError> {
        if let Ok(mut t) = self.transport.lock() {
            t.begin_load();
        }
        let sent = self.send_command(json!(["loadfile", watch_url(video_id), "replace"]));
        if sent.is_err() {
            // no start-file will ever answer this one
            if let Ok(mut t) = self.transport.lock() {
                t.file_started();
            }
        }
        sent
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.send_command(json!(["set_property", "pause", false]))
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.send_command(json!(["set_property", "pause", true]))
    }

    fn current_time(&self) -> Result<f64, PlaybackError> {
        self.read(|t| t.time_pos)
    }

    fn duration(&self) -> Result<f64, PlaybackError> {
        self.read(|t| t.duration)
    }
}

// ==========================================
// PROCESS
// ==========================================

// Owns the mpv child; killed when dropped.
pub struct MpvProcess {
    child: tokio::process::Child,
}

impl MpvProcess {
    pub fn spawn(binary: &str, socket: &Path) -> std::io::Result<Self> {
        // a stale socket from an earlier run would accept nothing
        let _ = std::fs::remove_file(socket);

        info!(binary, socket = %socket.display(), "mpv: spawning");
        let child = tokio::process::Command::new(binary)
            .arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg("--ytdl-format=bestaudio/best")
            .arg(format!("--input-ipc-server={}", socket.display()))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        Ok(MpvProcess { child })
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "mpv: kill failed");
        }
    }
}

// ==========================================
// PROBE
// ==========================================

// Retries the IPC socket on a fixed interval until a handle is constructed,
// then stops. The returned task can be aborted on shutdown.
pub fn spawn_probe(socket: PathBuf, interval: Duration, notify: Notify) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut attempts: u64 = 0;
        loop {
            ticker.tick().await;
            attempts += 1;
            match connect(&socket, notify.clone()).await {
                Ok(handle) => {
                    info!(attempts, "mpv: connected to IPC socket");
                    // Attached goes out before any command, so Ready can't overtake it
                    notify(PlayerEvent::Attached(handle.clone()));
                    if let Err(e) = handle.observe_transport() {
                        warn!(error = %e, "mpv: could not observe transport");
                    }
                    break;
                }
                Err(e) => debug!(attempts, error = %e, "mpv: runtime not available yet"),
            }
        }
    })
}

#[cfg(unix)]
async fn connect(socket: &Path, notify: Notify) -> std::io::Result<MpvHandle> {
    let stream = tokio::net::UnixStream::connect(socket).await?;
    let (read_half, write_half) = stream.into_split();
    Ok(start_io_tasks(BufReader::new(read_half), write_half, notify))
}

#[cfg(not(unix))]
async fn connect(_socket: &Path, _notify: Notify) -> std::io::Result<MpvHandle> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mpv IPC is only wired up for unix sockets",
    ))
}

fn start_io_tasks<R, W>(reader: R, writer: W, notify: Notify) -> MpvHandle
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(Mutex::new(Transport::default()));
    tokio::spawn(writer_task(writer, rx));
    tokio::spawn(reader_task(reader, transport.clone(), notify));
    MpvHandle { tx, transport }
}

async fn writer_task<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!(error = %e, "mpv: write failed, writer exiting");
            break;
        }
    }
}

// ==========================================
// READER
// ==========================================

#[derive(Debug, PartialEq)]
enum Incoming {
    Reply { ok: bool },
    TimePos(f64),
    Duration(f64),
    FileStarted,
    FileError(String),
    Other,
}

fn classify(msg: &Value) -> Incoming {
    if msg.get("request_id").is_some() {
        let ok = msg.get("error").and_then(Value::as_str) == Some("success");
        return Incoming::Reply { ok };
    }

    match msg.get("event").and_then(Value::as_str) {
        Some("property-change") => {
            // null data (nothing loaded) maps to NaN
            let data = msg.get("data").and_then(Value::as_f64).unwrap_or(f64::NAN);
            match msg.get("id").and_then(Value::as_u64) {
                Some(OBS_TIME_POS) => Incoming::TimePos(data),
                Some(OBS_DURATION) => Incoming::Duration(data),
                _ => Incoming::Other,
            }
        }
        Some("start-file") => Incoming::FileStarted,
        Some("end-file") if msg.get("reason").and_then(Value::as_str) == Some("error") => {
            let detail = msg
                .get("file_error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Incoming::FileError(detail)
        }
        _ => Incoming::Other,
    }
}

async fn reader_task<R: AsyncBufRead + Unpin>(
    reader: R,
    transport: Arc<Mutex<Transport>>,
    notify: Notify,
) {
    let mut lines = reader.lines();
    let mut signalled_ready = false;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                warn!("mpv: IPC socket closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "mpv: read failed");
                break;
            }
        };
        let msg: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "mpv: unparseable line");
                continue;
            }
        };

        match classify(&msg) {
            Incoming::Reply { ok } => {
                if !ok {
                    debug!(reply = %msg, "mpv: command rejected");
                }
                if !signalled_ready {
                    signalled_ready = true;
                    notify(PlayerEvent::Ready);
                }
            }
            Incoming::TimePos(t) => {
                if let Ok(mut cache) = transport.lock() {
                    if cache.is_current() {
                        cache.time_pos = t;
                    }
                }
            }
            Incoming::Duration(d) => {
                if let Ok(mut cache) = transport.lock() {
                    if cache.is_current() {
                        cache.duration = d;
                    }
                }
            }
            Incoming::FileStarted => {
                if let Ok(mut cache) = transport.lock() {
                    cache.file_started();
                }
            }
            Incoming::FileError(detail) => notify(PlayerEvent::Error(detail)),
            Incoming::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tokio::io::{duplex, AsyncReadExt};

    fn collecting_notify() -> (Notify, Arc<StdMutex<Vec<String>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let notify: Notify = Arc::new(move |event: PlayerEvent| {
            let label = match event {
                PlayerEvent::Attached(_) => "attached".to_string(),
                PlayerEvent::Ready => "ready".to_string(),
                PlayerEvent::Error(detail) => format!("error:{}", detail),
            };
            sink.lock().unwrap().push(label);
        });
        (notify, seen)
    }

    #[test]
    fn classifies_replies_and_events() {
        assert_eq!(
            classify(&json!({ "request_id": 3, "error": "success", "data": null })),
            Incoming::Reply { ok: true }
        );
        assert_eq!(
            classify(&json!({ "event": "property-change", "id": OBS_TIME_POS, "data": 12.5 })),
            Incoming::TimePos(12.5)
        );
        assert_eq!(
            classify(&json!({ "event": "end-file", "reason": "error", "file_error": "unrecognized file format" })),
            Incoming::FileError("unrecognized file format".to_string())
        );
        assert_eq!(
            classify(&json!({ "event": "start-file", "playlist_entry_id": 4 })),
            Incoming::FileStarted
        );
        assert_eq!(
            classify(&json!({ "event": "end-file", "reason": "eof" })),
            Incoming::Other
        );
    }

    #[test]
    fn null_duration_reads_as_nan() {
        match classify(&json!({ "event": "property-change", "id": OBS_DURATION, "data": null })) {
            Incoming::Duration(d) => assert!(d.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn commands_are_written_as_json_lines() {
        let (client, mut server) = duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let (notify, _) = collecting_notify();
        let mut handle = start_io_tasks(BufReader::new(read_half), write_half, notify);

        handle.load_by_id("abc123").unwrap();
        handle.pause().unwrap();

        let mut buf = vec![0u8; 4096];
        let mut text = String::new();
        while text.lines().count() < 2 {
            let n = server.read(&mut buf).await.unwrap();
            text.push_str(std::str::from_utf8(&buf[..n]).unwrap());
        }
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(
            lines[0]["command"],
            json!(["loadfile", "https://www.youtube.com/watch?v=abc123", "replace"])
        );
        assert_eq!(lines[1]["command"], json!(["set_property", "pause", true]));
        assert!(lines[0]["request_id"].as_u64().is_some());
    }

    #[tokio::test]
    async fn first_reply_signals_ready_and_properties_update_cache() {
        let (client, mut server) = duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let (notify, seen) = collecting_notify();
        let handle = start_io_tasks(BufReader::new(read_half), write_half, notify);

        server
            .write_all(
                concat!(
                    "{\"request_id\":1,\"error\":\"success\"}\n",
                    "{\"request_id\":2,\"error\":\"success\"}\n",
                    "{\"event\":\"property-change\",\"id\":1,\"name\":\"time-pos\",\"data\":3.5}\n",
                    "{\"event\":\"property-change\",\"id\":2,\"name\":\"duration\",\"data\":240.0}\n",
                    "{\"event\":\"end-file\",\"reason\":\"error\",\"file_error\":\"loading failed\"}\n",
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        drop(server);

        // the reader exits once the socket closes
        for _ in 0..50 {
            if seen.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["ready".to_string(), "error:loading failed".to_string()]
        );
        assert_eq!(handle.current_time().unwrap(), 3.5);
        assert_eq!(handle.duration().unwrap(), 240.0);
    }

    async fn wait_for_events(seen: &Arc<StdMutex<Vec<String>>>, count: usize) {
        for _ in 0..200 {
            if seen.lock().unwrap().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn readings_of_the_previous_file_are_ignored_until_the_new_one_starts() {
        let (client, mut server) = duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let (notify, seen) = collecting_notify();
        let mut handle = start_io_tasks(BufReader::new(read_half), write_half, notify);

        handle.load_by_id("next").unwrap();

        // still in flight from the old file, then a reply so we know it was read
        server
            .write_all(
                concat!(
                    "{\"event\":\"property-change\",\"id\":1,\"name\":\"time-pos\",\"data\":99.0}\n",
                    "{\"event\":\"property-change\",\"id\":2,\"name\":\"duration\",\"data\":300.0}\n",
                    "{\"request_id\":1,\"error\":\"success\"}\n",
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        wait_for_events(&seen, 1).await;
        assert!(handle.current_time().unwrap().is_nan());
        assert!(handle.duration().unwrap().is_nan());

        server
            .write_all(
                concat!(
                    "{\"event\":\"start-file\",\"playlist_entry_id\":2}\n",
                    "{\"event\":\"property-change\",\"id\":1,\"name\":\"time-pos\",\"data\":1.5}\n",
                    "{\"event\":\"end-file\",\"reason\":\"error\",\"file_error\":\"sync\"}\n",
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        wait_for_events(&seen, 2).await;
        assert_eq!(handle.current_time().unwrap(), 1.5);
    }

    #[tokio::test]
    async fn dead_writer_reports_disconnected() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut handle = MpvHandle {
            tx,
            transport: Arc::new(Mutex::new(Transport::default())),
        };
        assert!(matches!(handle.play(), Err(PlaybackError::Disconnected)));
        assert!(handle.current_time().unwrap().is_nan());

        // an unsent load must not hold back later readings
        assert!(handle.load_by_id("x").is_err());
        assert!(handle.transport.lock().unwrap().is_current());
    }
}
