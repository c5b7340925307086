//! Ctrl+C wiring for a [`CancelToken`].

use crate::error::Result;
use crate::flipper::CancelToken;
use tracing::debug;

/// Cancel `token` when the process receives Ctrl+C (SIGINT on POSIX, a
/// console control event on Windows).
///
/// A process can attach only one handler; a second call fails with
/// [`Error::SignalHandler`](crate::Error::SignalHandler).
pub fn cancel_on_interrupt(token: &CancelToken) -> Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        debug!("interrupt received");
        token.cancel();
    })?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_sigint_cancels_token_once_attached() {
        let token = CancelToken::new();
        cancel_on_interrupt(&token).unwrap();
        assert!(!token.is_cancelled());

        unsafe {
            libc::raise(libc::SIGINT);
        }

        // The handler runs on its own thread.
        let deadline = Instant::now() + Duration::from_secs(5);
        while !token.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(token.is_cancelled());

        let second = cancel_on_interrupt(&CancelToken::new());
        assert!(matches!(second, Err(Error::SignalHandler(_))));
    }
}
