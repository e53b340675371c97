//! Cross-thread close requests for a [`Channel`](super::Channel).

use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use super::CHANNEL_TARGET;

/// Handle that asks a channel to stop.
///
/// Closing wakes any read or dial wait blocked on the channel; a pending read
/// then reports end-of-stream. The handle is cheap to clone and may be moved
/// to a signal-watching thread.
#[derive(Debug, Clone)]
pub struct ChannelCloser {
    inner: Arc<CloseSignal>,
}

#[derive(Debug)]
struct CloseSignal {
    closed: AtomicBool,
    notify: UnixStream,
}

impl ChannelCloser {
    /// Requests the channel to close. Repeated calls are no-ops.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(error) = (&self.inner.notify).write_all(&[1]) {
            warn!(
                target: CHANNEL_TARGET,
                error = %error,
                "failed to wake channel after close request"
            );
        }
    }

    /// Returns `true` once a close has been requested.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// Receiving half of the wake-up pair, polled alongside the channel fd.
#[derive(Debug)]
pub(super) struct WakeReceiver {
    stream: UnixStream,
}

impl WakeReceiver {
    pub(super) fn as_stream(&self) -> &UnixStream {
        &self.stream
    }
}

/// Creates a linked closer and wake receiver.
pub(super) fn wake_pair() -> io::Result<(ChannelCloser, WakeReceiver)> {
    let (notify, stream) = UnixStream::pair()?;
    notify.set_nonblocking(true)?;
    stream.set_nonblocking(true)?;
    let closer = ChannelCloser {
        inner: Arc::new(CloseSignal {
            closed: AtomicBool::new(false),
            notify,
        }),
    };
    Ok((closer, WakeReceiver { stream }))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn close_is_idempotent_and_visible_to_clones() {
        let (closer, wake) = wake_pair().expect("wake pair");
        let clone = closer.clone();
        assert!(!clone.is_closed());
        closer.close();
        closer.close();
        assert!(clone.is_closed());

        let mut buf = [0_u8; 4];
        let read = (wake.as_stream())
            .read(&mut buf)
            .expect("wake byte should be readable");
        assert_eq!(read, 1, "only the first close writes a wake byte");
    }
}
