//! Transfer progress reported while a request runs.

use tokio::sync::mpsc;

/// One progress report from a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Request body bytes sent so far.
    Upload {
        /// Bytes sent.
        sent: u64,
        /// Size of the request body, if known.
        total: Option<u64>,
    },
    /// Response body bytes received so far.
    Download {
        /// Bytes received.
        received: u64,
        /// `Content-Length` of the response, if known.
        total: Option<u64>,
    },
}

/// Where a transport reports [`Progress`].
///
/// `Send`, so reports can come from the worker pool in threaded mode. The
/// reply drains them into its progress handlers on the `LocalSet`.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender(Option<mpsc::UnboundedSender<Progress>>);

impl ProgressSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(Some(tx)), rx)
    }

    /// A sender that drops every report.
    pub fn disabled() -> Self {
        Self(None)
    }

    /// Report request body bytes sent.
    pub fn upload(&self, sent: u64, total: Option<u64>) {
        self.report(Progress::Upload { sent, total });
    }

    /// Report response body bytes received.
    pub fn download(&self, received: u64, total: Option<u64>) {
        self.report(Progress::Download { received, total });
    }

    fn report(&self, progress: Progress) {
        if let Some(tx) = &self.0 {
            // The receiver is gone once the attempt finished or was aborted.
            let _ = tx.send(progress);
        }
    }
}
