// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interrupt/termination signal handling for the supervisor's run loop: a
//! shutdown signal is forwarded to the child process group and the run is
//! marked interrupted.
//!
//! Deliberately narrow: job-control (SIGTSTP/SIGCONT) and info-query
//! (SIGUSR1/SIGINFO) signals have no analogue here, since the supervisor has
//! no notion of a paused run or an interactive status query.

use crate::errors::SignalHandlerSetupError;

/// The kind of signal handling to set up for a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SignalHandlerKind {
    /// The standard signal handler: interrupt and termination signals,
    /// platform-dependent.
    Standard,
    /// A no-op signal handler. Useful for tests that don't want to install
    /// real OS signal handlers.
    Noop,
}

impl SignalHandlerKind {
    pub(crate) fn build(self) -> Result<SignalHandler, SignalHandlerSetupError> {
        match self {
            Self::Standard => SignalHandler::new(),
            Self::Noop => Ok(SignalHandler::noop()),
        }
    }
}

/// A signal that should cause the run to shut down.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ShutdownEvent {
    #[cfg(unix)]
    Hangup,
    #[cfg(unix)]
    Term,
    #[cfg(unix)]
    Quit,
    Interrupt,
}

/// The signal handler implementation.
#[derive(Debug)]
pub(crate) struct SignalHandler {
    signals: Option<imp::Signals>,
}

impl SignalHandler {
    #[cfg(any(unix, windows))]
    pub(crate) fn new() -> Result<Self, SignalHandlerSetupError> {
        let signals = imp::Signals::new()?;
        Ok(Self {
            signals: Some(signals),
        })
    }

    pub(crate) fn noop() -> Self {
        Self { signals: None }
    }

    pub(crate) async fn recv(&mut self) -> Option<ShutdownEvent> {
        match &mut self.signals {
            Some(signals) => signals.recv().await,
            // Never resolves, rather than resolving to `None` immediately:
            // a `select!` loop polling this branch every iteration would
            // otherwise busy-spin waiting for a real signal source to
            // become ready.
            None => std::future::pending().await,
        }
    }
}

#[cfg(unix)]
mod imp {
    use super::*;
    use std::io;
    use tokio::signal::unix::{signal, SignalKind};
    use tokio_stream::{wrappers::SignalStream, StreamExt, StreamMap};

    #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
    enum SignalId {
        Int,
        Hup,
        Term,
        Quit,
    }

    /// Signals for SIGINT, SIGTERM, SIGHUP and SIGQUIT on Unix.
    #[derive(Debug)]
    pub(super) struct Signals {
        map: StreamMap<SignalId, SignalStream>,
    }

    impl Signals {
        pub(super) fn new() -> io::Result<Self> {
            let mut map = StreamMap::new();
            map.extend([
                (SignalId::Int, signal_stream(SignalKind::interrupt())?),
                (SignalId::Hup, signal_stream(SignalKind::hangup())?),
                (SignalId::Term, signal_stream(SignalKind::terminate())?),
                (SignalId::Quit, signal_stream(SignalKind::quit())?),
            ]);
            Ok(Self { map })
        }

        pub(super) async fn recv(&mut self) -> Option<ShutdownEvent> {
            self.map.next().await.map(|(id, _)| match id {
                SignalId::Int => ShutdownEvent::Interrupt,
                SignalId::Hup => ShutdownEvent::Hangup,
                SignalId::Term => ShutdownEvent::Term,
                SignalId::Quit => ShutdownEvent::Quit,
            })
        }
    }

    fn signal_stream(kind: SignalKind) -> io::Result<SignalStream> {
        Ok(SignalStream::new(signal(kind)?))
    }
}

#[cfg(windows)]
mod imp {
    use super::*;
    use tokio::signal::windows::{ctrl_c, CtrlC};

    #[derive(Debug)]
    pub(super) struct Signals {
        ctrl_c: CtrlC,
        ctrl_c_done: bool,
    }

    impl Signals {
        pub(super) fn new() -> std::io::Result<Self> {
            let ctrl_c = ctrl_c()?;
            Ok(Self {
                ctrl_c,
                ctrl_c_done: false,
            })
        }

        pub(super) async fn recv(&mut self) -> Option<ShutdownEvent> {
            if self.ctrl_c_done {
                return None;
            }
            match self.ctrl_c.recv().await {
                Some(()) => Some(ShutdownEvent::Interrupt),
                None => {
                    self.ctrl_c_done = true;
                    None
                }
            }
        }
    }
}
