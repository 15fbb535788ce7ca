//! [`CallStack`] backed by a `baresip` child process.
//!
//! baresip is started as `baresip -f <config_dir>` with its stdio UI.
//! Commands are written to its stdin; a reader task scans its stdout and
//! folds recognised lines into a [`LineState`] published over a
//! `tokio::sync::watch` channel.
//!
//! ```text
//! (startup)                  → "No SIP accounts found" … "baresip is ready."
//! /uanew <sip:user@gw>;…     (only when baresip has no account)
//! /dial sip:user@host        → "Call established" | "session closed" …
//! /ausrc aufile,<wav>        → "aufile: end of file"
//! /hangup                    → "Call terminated"
//! /quit
//! ```
//!
//! Termination lines only count while a call is active, and `hang_up` waits
//! (bounded) for the far end to be gone, so a late line from one call never
//! ends the next one.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{watch, Mutex};

use super::{CallStack, CallStatus, PhoneError};

// ---------------------------------------------------------------------------
// Output classification
// ---------------------------------------------------------------------------

/// A baresip stdout line the phone cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Ready,
    NoAccount,
    Established,
    Ended,
    AudioDone,
}

/// Map one line of baresip output to a [`Signal`].
pub fn classify(line: &str) -> Option<Signal> {
    const ENDED: &[&str] = &[
        "session closed",
        "Call terminated",
        "terminated (duration",
        "Call failed",
        "call failed",
        "could not find UA",
        "ua_connect failed",
    ];

    if line.contains("baresip is ready") {
        Some(Signal::Ready)
    } else if line.contains("No SIP accounts found") {
        Some(Signal::NoAccount)
    } else if line.contains("Call established") {
        Some(Signal::Established)
    } else if line.contains("aufile: end of file") {
        Some(Signal::AudioDone)
    } else if ENDED.iter().any(|p| line.contains(p)) {
        Some(Signal::Ended)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// LineState
// ---------------------------------------------------------------------------

/// Flags derived from baresip output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineState {
    pub running: bool,
    pub ready: bool,
    pub no_account: bool,
    /// A call was dialed and has not ended yet.
    pub active: bool,
    pub established: bool,
    pub ended: bool,
    pub audio_done: bool,
}

impl LineState {
    fn begin_call(&mut self) {
        self.active = true;
        self.established = false;
        self.ended = false;
        self.audio_done = false;
    }

    fn end_call(&mut self) {
        self.active = false;
        self.established = false;
        self.ended = true;
    }

    fn apply(&mut self, signal: Signal) {
        match signal {
            Signal::Ready => self.ready = true,
            Signal::NoAccount => {
                self.no_account = true;
                if self.active {
                    self.end_call();
                }
            }
            Signal::Established if self.active => self.established = true,
            Signal::Ended if self.active => self.end_call(),
            Signal::AudioDone => self.audio_done = true,
            // Leftovers of a call that is already over.
            Signal::Established | Signal::Ended => {}
        }
    }

    pub fn status(&self) -> CallStatus {
        if !self.running {
            CallStatus::Offline
        } else if self.ended {
            CallStatus::Ended
        } else if self.established {
            CallStatus::Established
        } else {
            CallStatus::Dialing
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// SIP account registered with `/uanew` when baresip starts without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipAccount {
    pub user: String,
    pub password: String,
    pub gateway: String,
}

impl SipAccount {
    pub fn uanew_command(&self) -> String {
        format!(
            "/uanew <sip:{}@{}>;auth_pass={}",
            self.user, self.gateway, self.password
        )
    }
}

/// Bounds on waiting for baresip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaresipTimings {
    /// Startup until "baresip is ready.".
    pub ready: Duration,
    /// `/hangup` until the call is reported gone.
    pub hang_up: Duration,
    /// `/quit` until the process exits; it is killed afterwards.
    pub quit: Duration,
}

impl Default for BaresipTimings {
    fn default() -> Self {
        Self {
            ready: Duration::from_secs(10),
            hang_up: Duration::from_secs(3),
            quit: Duration::from_secs(5),
        }
    }
}

/// How to start baresip.
#[derive(Debug, Clone)]
pub struct BaresipOptions {
    /// Path or name of the executable.
    pub binary: PathBuf,
    /// Directory passed as `-f`.
    pub config_dir: PathBuf,
    /// Forward every baresip output line to the debug log.
    pub debug: bool,
    pub account: Option<SipAccount>,
    pub timings: BaresipTimings,
}

// ---------------------------------------------------------------------------
// BaresipPhone
// ---------------------------------------------------------------------------

/// A running baresip process.
pub struct BaresipPhone {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    state: Arc<watch::Sender<LineState>>,
    timings: BaresipTimings,
}

impl BaresipPhone {
    /// Start baresip, wait until it is ready and register the account if it
    /// has none.
    pub async fn start(options: &BaresipOptions) -> Result<Self, PhoneError> {
        let phone = Self::spawn(options)?;
        phone.await_ready().await?;
        phone.register(options.account.as_ref()).await?;
        Ok(phone)
    }

    fn spawn(options: &BaresipOptions) -> Result<Self, PhoneError> {
        log::info!(
            "starting {} -f {}",
            options.binary.display(),
            options.config_dir.display()
        );

        let mut child = Command::new(&options.binary)
            .arg("-f")
            .arg(&options.config_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if options.debug {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PhoneError::Spawn(format!("{}: {e}", options.binary.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PhoneError::Spawn("baresip stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PhoneError::Spawn("baresip stdout unavailable".into()))?;

        let (tx, _rx) = watch::channel(LineState {
            running: true,
            ..LineState::default()
        });
        let state = Arc::new(tx);
        tokio::spawn(read_output(stdout, Arc::clone(&state), options.debug));

        Ok(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            state,
            timings: options.timings,
        })
    }

    async fn await_ready(&self) -> Result<(), PhoneError> {
        let mut rx = self.state.subscribe();
        let reported = tokio::time::timeout(
            self.timings.ready,
            rx.wait_for(|s| s.ready || !s.running),
        )
        .await
        .is_ok();

        let state = *self.state.borrow();
        if !state.running {
            return Err(PhoneError::NotRunning);
        }
        if reported {
            log::info!("baresip is ready");
        } else {
            log::warn!(
                "baresip did not report ready within {}s, continuing",
                self.timings.ready.as_secs()
            );
        }
        Ok(())
    }

    async fn register(&self, account: Option<&SipAccount>) -> Result<(), PhoneError> {
        if !self.state.borrow().no_account {
            return Ok(());
        }
        match account {
            Some(account) => {
                log::info!("registering {}@{}", account.user, account.gateway);
                self.command(&account.uanew_command()).await
            }
            None => {
                log::warn!("baresip has no SIP account; calls will fail");
                Ok(())
            }
        }
    }

    async fn command(&self, command: &str) -> Result<(), PhoneError> {
        if !self.state.borrow().running {
            return Err(PhoneError::NotRunning);
        }
        log::debug!("baresip< {command}");
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(command.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }
}

async fn read_output(stdout: ChildStdout, state: Arc<watch::Sender<LineState>>, debug: bool) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if debug {
                    log::debug!("baresip> {line}");
                }
                if let Some(signal) = classify(&line) {
                    log::debug!("baresip signal: {signal:?}");
                    state.send_modify(|s| s.apply(signal));
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("reading baresip output failed: {e}");
                break;
            }
        }
    }
    log::info!("baresip output closed");
    state.send_modify(|s| s.running = false);
}

#[async_trait]
impl CallStack for BaresipPhone {
    async fn dial(&self, address: &str) -> Result<(), PhoneError> {
        self.state.send_modify(LineState::begin_call);
        self.command(&format!("/dial {address}")).await
    }

    fn status(&self) -> CallStatus {
        self.state.borrow().status()
    }

    async fn send_audio(&self, audio: &Path) -> Result<(), PhoneError> {
        if self.status() != CallStatus::Established {
            return Err(PhoneError::NotEstablished);
        }
        self.state.send_modify(|s| s.audio_done = false);
        let mut rx = self.state.subscribe();
        self.command(&format!("/ausrc aufile,{}", audio.display()))
            .await?;

        let state = rx
            .wait_for(|s| s.audio_done || s.ended || !s.running)
            .await
            .map(|s| *s)
            .map_err(|_| PhoneError::NotRunning)?;

        if !state.running {
            Err(PhoneError::NotRunning)
        } else if state.audio_done {
            Ok(())
        } else {
            Err(PhoneError::CallEnded)
        }
    }

    async fn hang_up(&self) -> Result<(), PhoneError> {
        let mut rx = self.state.subscribe();
        let in_call = rx.borrow().active;
        self.command("/hangup").await?;
        if !in_call {
            return Ok(());
        }

        let gone = tokio::time::timeout(
            self.timings.hang_up,
            rx.wait_for(|s| !s.active || !s.running),
        )
        .await
        .is_ok();
        if !gone {
            log::warn!(
                "baresip did not report the call ended within {} ms of /hangup",
                self.timings.hang_up.as_millis()
            );
            self.state.send_modify(|s| s.active = false);
        }
        Ok(())
    }

    async fn quit(&self) -> Result<(), PhoneError> {
        if let Err(e) = self.command("/quit").await {
            log::debug!("baresip /quit not delivered: {e}");
        }

        let mut child = self.child.lock().await;
        match tokio::time::timeout(self.timings.quit, child.wait()).await {
            Ok(Ok(status)) => {
                log::info!("baresip exited with {status}");
                Ok(())
            }
            Ok(Err(e)) => Err(PhoneError::Io(e)),
            Err(_) => {
                log::warn!(
                    "baresip did not exit within {}s, killing it",
                    self.timings.quit.as_secs()
                );
                child.kill().await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_call() -> LineState {
        let mut s = LineState {
            running: true,
            ..LineState::default()
        };
        s.begin_call();
        s
    }

    #[test]
    fn classify_known_lines() {
        assert_eq!(
            classify("call: Call established: sip:line1@10.0.0.5"),
            Some(Signal::Established)
        );
        assert_eq!(
            classify("sip:line1@10.0.0.5: session closed: 486 Busy Here"),
            Some(Signal::Ended)
        );
        assert_eq!(
            classify("sip:line1@10.0.0.5: Call terminated (duration: 12 sec)"),
            Some(Signal::Ended)
        );
        assert_eq!(classify("aufile: end of file"), Some(Signal::AudioDone));
        assert_eq!(classify("baresip is ready."), Some(Signal::Ready));
        assert_eq!(
            classify("No SIP accounts found - check your config"),
            Some(Signal::NoAccount)
        );
        assert_eq!(classify("Local network address: IPv4=lo|127.0.0.1"), None);
    }

    #[test]
    fn line_state_maps_to_status() {
        let mut s = LineState::default();
        assert_eq!(s.status(), CallStatus::Offline);

        s = in_call();
        assert_eq!(s.status(), CallStatus::Dialing);

        s.apply(Signal::Established);
        assert_eq!(s.status(), CallStatus::Established);

        s.apply(Signal::Ended);
        assert_eq!(s.status(), CallStatus::Ended);
        assert!(!s.established);
        assert!(!s.active);
    }

    #[test]
    fn lines_outside_a_call_are_ignored() {
        let mut s = LineState {
            running: true,
            ..LineState::default()
        };
        s.apply(Signal::Ended);
        s.apply(Signal::Established);
        assert_eq!(s.status(), CallStatus::Dialing);
        assert!(!s.ended);
    }

    #[test]
    fn missing_account_ends_the_call() {
        let mut s = in_call();
        s.apply(Signal::NoAccount);
        assert!(s.no_account);
        assert_eq!(s.status(), CallStatus::Ended);
    }

    #[test]
    fn audio_done_does_not_change_call_status() {
        let mut s = in_call();
        s.apply(Signal::Established);
        s.apply(Signal::AudioDone);
        assert!(s.audio_done);
        assert_eq!(s.status(), CallStatus::Established);
    }

    #[test]
    fn uanew_command_format() {
        let account = SipAccount {
            user: "ttstreambot".into(),
            password: "service".into(),
            gateway: "192.168.0.222".into(),
        };
        assert_eq!(
            account.uanew_command(),
            "/uanew <sip:ttstreambot@192.168.0.222>;auth_pass=service"
        );
    }

    #[tokio::test]
    async fn start_missing_binary_fails() {
        let options = BaresipOptions {
            binary: PathBuf::from("/nonexistent/baresip"),
            config_dir: PathBuf::from("/tmp"),
            debug: false,
            account: None,
            timings: BaresipTimings::default(),
        };
        assert!(matches!(
            BaresipPhone::start(&options).await,
            Err(PhoneError::Spawn(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Against a scripted stand-in for baresip
    // -----------------------------------------------------------------------

    #[cfg(unix)]
    mod process {
        use super::*;
        use tempfile::{tempdir, TempDir};

        const ADDRESS: &str = "sip:line1@10.0.0.5";

        /// Writes an `sh` script acting as baresip.  Every command it reads
        /// is appended to `<script>.log`; `cases` is the body of a `case`
        /// on the command.
        fn fake_baresip(dir: &TempDir, startup: &str, cases: &str) -> PathBuf {
            use std::os::unix::fs::PermissionsExt;

            let path = dir.path().join("baresip");
            let script = format!(
                "#!/bin/sh\n\
                 {startup}\n\
                 while read -r line; do\n\
                 echo \"$line\" >> \"$0.log\"\n\
                 case \"$line\" in\n\
                 {cases}\n\
                 /quit*) exit 0 ;;\n\
                 esac\n\
                 done\n"
            );
            std::fs::write(&path, script).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod");
            path
        }

        fn options(binary: PathBuf, dir: &TempDir) -> BaresipOptions {
            BaresipOptions {
                binary,
                config_dir: dir.path().to_path_buf(),
                debug: false,
                account: None,
                timings: BaresipTimings {
                    ready: Duration::from_secs(5),
                    hang_up: Duration::from_secs(2),
                    quit: Duration::from_secs(2),
                },
            }
        }

        fn commands(dir: &TempDir) -> Vec<String> {
            std::fs::read_to_string(dir.path().join("baresip.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        async fn until_status(phone: &BaresipPhone, want: CallStatus) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while phone.status() != want {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .unwrap_or_else(|_| panic!("status stayed {:?}, wanted {want:?}", phone.status()));
        }

        const READY: &str = "echo \"baresip is ready.\"";
        const ANSWER: &str = "/dial*) echo \"sip:a@b: Call established: sip:a@b\" ;;";
        const LATE_TERMINATION: &str =
            "/hangup*) (sleep 0.2; echo \"sip:a@b: Call terminated (duration: 3 sec)\") & ;;";

        #[tokio::test]
        async fn plays_audio_until_end_of_file() {
            let dir = tempdir().expect("temp dir");
            let cases = format!(
                "{ANSWER}\n/ausrc*) echo \"aufile: end of file\" ;;\n{LATE_TERMINATION}"
            );
            let binary = fake_baresip(&dir, READY, &cases);
            let phone = BaresipPhone::start(&options(binary, &dir))
                .await
                .expect("start");

            phone.dial(ADDRESS).await.expect("dial");
            until_status(&phone, CallStatus::Established).await;
            phone
                .send_audio(Path::new("/tmp/a.wav"))
                .await
                .expect("audio");
            phone.hang_up().await.expect("hang up");
            assert_eq!(phone.status(), CallStatus::Ended);
            phone.quit().await.expect("quit");

            assert_eq!(
                commands(&dir),
                vec![
                    format!("/dial {ADDRESS}"),
                    "/ausrc aufile,/tmp/a.wav".to_string(),
                    "/hangup".to_string(),
                    "/quit".to_string(),
                ]
            );
        }

        #[tokio::test]
        async fn late_termination_line_does_not_end_next_call() {
            let dir = tempdir().expect("temp dir");
            let cases = format!("/dial*) echo \"call: connecting\" ;;\n{LATE_TERMINATION}");
            let binary = fake_baresip(&dir, READY, &cases);
            let phone = BaresipPhone::start(&options(binary, &dir))
                .await
                .expect("start");

            phone.dial(ADDRESS).await.expect("first dial");
            phone.hang_up().await.expect("hang up");
            phone.dial(ADDRESS).await.expect("second dial");
            tokio::time::sleep(Duration::from_millis(500)).await;

            assert_eq!(phone.status(), CallStatus::Dialing);
            phone.quit().await.expect("quit");
        }

        #[tokio::test]
        async fn hang_up_gives_up_when_nothing_is_reported() {
            let dir = tempdir().expect("temp dir");
            let binary = fake_baresip(&dir, READY, "/dial*) ;;");
            let mut opts = options(binary, &dir);
            opts.timings.hang_up = Duration::from_millis(200);
            let phone = BaresipPhone::start(&opts).await.expect("start");

            phone.dial(ADDRESS).await.expect("dial");
            phone.hang_up().await.expect("hang up");
            assert!(!phone.state.borrow().active);
            phone.quit().await.expect("quit");
        }

        #[tokio::test]
        async fn call_closed_mid_playback_is_call_ended() {
            let dir = tempdir().expect("temp dir");
            let cases = format!(
                "{ANSWER}\n/ausrc*) echo \"sip:a@b: session closed: 487 Request Terminated\" ;;"
            );
            let binary = fake_baresip(&dir, READY, &cases);
            let phone = BaresipPhone::start(&options(binary, &dir))
                .await
                .expect("start");

            phone.dial(ADDRESS).await.expect("dial");
            until_status(&phone, CallStatus::Established).await;
            let err = phone
                .send_audio(Path::new("/tmp/a.wav"))
                .await
                .unwrap_err();

            assert!(matches!(err, PhoneError::CallEnded), "{err}");
            assert_eq!(phone.status(), CallStatus::Ended);
            phone.quit().await.expect("quit");
        }

        #[tokio::test]
        async fn process_exit_goes_offline() {
            let dir = tempdir().expect("temp dir");
            let cases = format!("{ANSWER}\n/ausrc*) exit 1 ;;");
            let binary = fake_baresip(&dir, READY, &cases);
            let phone = BaresipPhone::start(&options(binary, &dir))
                .await
                .expect("start");

            phone.dial(ADDRESS).await.expect("dial");
            until_status(&phone, CallStatus::Established).await;
            let err = phone
                .send_audio(Path::new("/tmp/a.wav"))
                .await
                .unwrap_err();

            assert!(matches!(err, PhoneError::NotRunning), "{err}");
            assert_eq!(phone.status(), CallStatus::Offline);
            assert!(matches!(
                phone.dial(ADDRESS).await,
                Err(PhoneError::NotRunning)
            ));
        }

        #[tokio::test]
        async fn registers_account_when_baresip_has_none() {
            let dir = tempdir().expect("temp dir");
            let startup = format!("echo \"No SIP accounts found - check your config\"\n{READY}");
            let binary = fake_baresip(&dir, &startup, "/uanew*) ;;");
            let mut opts = options(binary, &dir);
            opts.account = Some(SipAccount {
                user: "ttstreambot".into(),
                password: "service".into(),
                gateway: "192.168.0.222".into(),
            });
            let phone = BaresipPhone::start(&opts).await.expect("start");
            phone.quit().await.expect("quit");

            assert_eq!(
                commands(&dir),
                vec![
                    "/uanew <sip:ttstreambot@192.168.0.222>;auth_pass=service".to_string(),
                    "/quit".to_string(),
                ]
            );
        }

        #[tokio::test]
        async fn existing_account_is_left_alone() {
            let dir = tempdir().expect("temp dir");
            let binary = fake_baresip(&dir, READY, "/uanew*) ;;");
            let mut opts = options(binary, &dir);
            opts.account = Some(SipAccount {
                user: "ttstreambot".into(),
                password: "service".into(),
                gateway: "192.168.0.222".into(),
            });
            let phone = BaresipPhone::start(&opts).await.expect("start");
            phone.quit().await.expect("quit");

            assert_eq!(commands(&dir), vec!["/quit".to_string()]);
        }

        #[tokio::test]
        async fn unresponsive_process_is_killed_on_quit() {
            let dir = tempdir().expect("temp dir");
            let startup = format!("trap '' TERM\n{READY}");
            // `/quit` is swallowed by the catch-all before the exit case.
            let binary = fake_baresip(&dir, &startup, "*) ;;");
            let mut opts = options(binary, &dir);
            opts.timings.quit = Duration::from_millis(200);
            let phone = BaresipPhone::start(&opts).await.expect("start");

            phone.quit().await.expect("quit");
            until_status(&phone, CallStatus::Offline).await;
        }
    }
}
