//! In-memory transport that replays a fixed event script (unit tests only).

use std::sync::atomic::{AtomicUsize, Ordering};

use super::transport::{ResponseStream, Transport, TransportEvent, UploadFile};

pub(crate) struct ScriptedTransport {
    script: Vec<TransportEvent>,
    requests: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<TransportEvent>) -> Self {
        Self {
            script,
            requests: AtomicUsize::new(0),
        }
    }

    /// `200` followed by one chunk per string.
    pub(crate) fn ok(chunks: &[String]) -> Self {
        let mut script = vec![TransportEvent::Status(200)];
        script.extend(chunks.iter().map(|c| TransportEvent::Chunk(c.clone().into_bytes())));
        Self::new(script)
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn post_file(&self, _file: UploadFile) -> ResponseStream {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let (tx, stream) = ResponseStream::channel(self.script.len());
        for event in &self.script {
            let _ = tx.try_send(event.clone());
        }
        stream
    }
}
