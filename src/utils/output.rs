/// Bounded output collection for child processes.
/// Streams are drained to EOF so the child never blocks on a full pipe,
/// but only the first `limit` bytes are kept.

use std::io::Read;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const READ_CHUNK: usize = 8192;

/// Collected bytes of one stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedStream {
    pub data: Vec<u8>,
    pub truncated: bool,
}

impl CollectedStream {
    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Read `reader` to EOF keeping at most `limit` bytes
pub fn collect_stream<R: Read>(mut reader: R, limit: usize) -> CollectedStream {
    let mut collected = CollectedStream::default();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(collected.data.len());
                if n > room {
                    collected.data.extend_from_slice(&buf[..room]);
                    collected.truncated = true;
                } else {
                    collected.data.extend_from_slice(&buf[..n]);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("Output stream read error: {}", e);
                break;
            }
        }
    }

    collected
}

/// Handle to a background collector thread
pub struct StreamCollector {
    rx: Receiver<CollectedStream>,
}

impl StreamCollector {
    /// Spawn a thread draining `reader`
    pub fn spawn<R: Read + Send + 'static>(reader: R, limit: usize) -> Self {
        let (tx, rx) = channel();
        thread::spawn(move || {
            let _ = tx.send(collect_stream(reader, limit));
        });
        Self { rx }
    }

    /// Wait for the collector to finish.
    /// A descendant that escaped the process group can hold the pipe open; after `grace`
    /// whatever is missing is reported as truncated output.
    pub fn finish(self, grace: Duration) -> CollectedStream {
        match self.rx.recv_timeout(grace) {
            Ok(stream) => stream,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Output collector did not reach EOF within {:?}", grace);
                CollectedStream {
                    data: Vec::new(),
                    truncated: true,
                }
            }
            Err(RecvTimeoutError::Disconnected) => CollectedStream::default(),
        }
    }
}
