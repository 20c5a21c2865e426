// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform glue for spawning the runner in its own process group and
//! delivering termination signals to the whole group. Deliberately narrow:
//! no job-control (SIGTSTP/SIGCONT) or Windows Job Objects, since this
//! single-child-process model has no notion of a paused run.

use std::process::Command;

/// Configures `cmd` to start in its own process group (Unix) prior to
/// spawning, so a single signal can reach the runner and any processes it
/// forks.
pub(crate) fn set_process_group(cmd: &mut Command) {
    imp::set_process_group(cmd);
}

/// The escalating signals sent to terminate the child on a shutdown
/// request, in order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TerminateSignal {
    Graceful,
    Forceful,
}

/// Sends `signal` to the process group rooted at `pid`. Best-effort: a
/// child that has already exited produces no error here (`kill` on such a
/// pid typically reports ESRCH, which we ignore).
pub(crate) fn signal_process_group(pid: u32, signal: TerminateSignal) {
    imp::signal_process_group(pid, signal);
}

#[cfg(unix)]
mod imp {
    use super::*;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    use std::os::unix::process::CommandExt;

    pub(super) fn set_process_group(cmd: &mut Command) {
        cmd.process_group(0);
    }

    pub(super) fn signal_process_group(pid: u32, signal: TerminateSignal) {
        let sig = match signal {
            TerminateSignal::Graceful => Signal::SIGTERM,
            TerminateSignal::Forceful => Signal::SIGKILL,
        };
        // `killpg` targets the whole process group (valid because we called
        // `process_group(0)` before spawning); a group whose leader already
        // exited reports ESRCH, which we ignore.
        let _ = killpg(Pid::from_raw(pid as i32), sig);
    }
}

#[cfg(windows)]
mod imp {
    use super::*;

    pub(super) fn set_process_group(_cmd: &mut Command) {
        // No direct equivalent; ctrl-C handling is best-effort on Windows.
    }

    pub(super) fn signal_process_group(pid: u32, _signal: TerminateSignal) {
        // windows-sys doesn't expose a portable "signal a process tree"
        // primitive without Job Objects; terminate the process directly.
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
            if !handle.is_null() {
                TerminateProcess(handle, 1);
                CloseHandle(handle);
            }
        }
    }
}
