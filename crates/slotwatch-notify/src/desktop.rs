//! Desktop channels: toast notification, text-to-speech and alert sound.
//!
//! Speech goes through the platform's own helper program (`say`, `espeak`,
//! PowerShell). With the `sound` feature the alert is a sine tone played with
//! `rodio`; without it, or when no audio output opens, the platform sound
//! player is tried and the terminal bell is the last resort.

use crate::error::{NotifyError, Result};
use crate::notifier::Notifier;
use async_trait::async_trait;
use std::io::Write;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const SPEECH_TIMEOUT: Duration = Duration::from_secs(30);
const ALERT_TIMEOUT: Duration = Duration::from_secs(5);
const ALERT_GAP: Duration = Duration::from_millis(600);

/// How an alert was made audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSound {
    /// Sine tones on the default audio output
    Tone,
    /// Platform sound player
    Helper,
    /// Terminal bell on stderr
    Bell,
}

/// Desktop toast, speech and alert sound for the local operator.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    toast: bool,
    speech: bool,
    sound: bool,
    alert_helper: (String, Vec<String>),
}

impl DesktopNotifier {
    /// Create a notifier with the given channels switched on.
    #[must_use]
    pub fn new(toast: bool, speech: bool, sound: bool) -> Self {
        let (program, args) = alert_command();
        Self {
            toast,
            speech,
            sound,
            alert_helper: (program.to_string(), args),
        }
    }

    /// Use another sound player for the alert fallback.
    #[must_use]
    pub fn with_alert_helper(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.alert_helper = (program.into(), args);
        self
    }

    /// Sound the alert `times` times and report what produced it.
    pub async fn play_alert(&self, times: u32) -> AlertSound {
        #[cfg(feature = "sound")]
        {
            match tone::play(times).await {
                Ok(()) => return AlertSound::Tone,
                Err(e) => warn!("Audio output unavailable: {}", e),
            }
        }

        let (program, args) = &self.alert_helper;
        for i in 0..times {
            if let Err(e) = run_helper(program, args, ALERT_TIMEOUT).await {
                warn!("Failed to play sound ({}), using terminal bell", e);
                ring_bell(times - i).await;
                return AlertSound::Bell;
            }
            if i + 1 < times {
                tokio::time::sleep(ALERT_GAP).await;
            }
        }
        AlertSound::Helper
    }

    async fn show_toast(&self, title: &str, body: &str) -> Result<()> {
        let title = sanitize_for_toast(title);
        let body = sanitize_for_toast(body);
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .show()
                .map(|_| ())
                .map_err(|e| NotifyError::Desktop(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError::Desktop(e.to_string()))?
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) {
        if !self.toast {
            return;
        }
        match self.show_toast(title, body).await {
            Ok(()) => debug!("Notification sent: {}", title),
            Err(e) => warn!("Failed to send notification: {}", e),
        }
    }

    async fn speak(&self, text: &str) {
        if !self.speech {
            return;
        }
        let (program, args) = speech_command(text);
        if let Err(e) = run_helper(program, &args, SPEECH_TIMEOUT).await {
            // No audio device is common on servers
            warn!("Speech unavailable: {}", e);
        }
    }

    async fn alert(&self, times: u32) {
        if !self.sound || times == 0 {
            return;
        }
        let source = self.play_alert(times).await;
        debug!(?source, times, "Alert sounded");
    }

    async fn message(&self, _text: &str) {}
}

async fn run_helper(program: &str, args: &[String], timeout: Duration) -> Result<()> {
    let command_error = |reason: String| NotifyError::Command {
        program: program.to_string(),
        reason,
    };

    let status = tokio::time::timeout(
        timeout,
        Command::new(program).args(args).kill_on_drop(true).status(),
    )
    .await
    .map_err(|_| command_error(format!("timed out after {}s", timeout.as_secs())))?
    .map_err(|e| command_error(e.to_string()))?;

    if status.success() {
        Ok(())
    } else {
        Err(command_error(format!("exited with {status}")))
    }
}

async fn ring_bell(times: u32) {
    for i in 0..times {
        let mut stderr = std::io::stderr();
        if stderr.write_all(b"\x07").and_then(|()| stderr.flush()).is_err() {
            return;
        }
        if i + 1 < times {
            tokio::time::sleep(ALERT_GAP).await;
        }
    }
}

#[cfg(feature = "sound")]
mod tone {
    use super::ALERT_GAP;
    use crate::error::{NotifyError, Result};
    use rodio::{OutputStreamBuilder, Sink, Source};
    use std::time::Duration;

    const FREQUENCIES: [f32; 2] = [880.0, 660.0];
    const TONE_LENGTH: Duration = Duration::from_millis(400);

    /// Alternating high and low pitch, so repeats read as an alarm.
    pub(super) fn frequency(index: u32) -> f32 {
        FREQUENCIES[index as usize % FREQUENCIES.len()]
    }

    pub(super) async fn play(times: u32) -> Result<()> {
        tokio::task::spawn_blocking(move || play_blocking(times))
            .await
            .map_err(|e| NotifyError::Sound(e.to_string()))?
    }

    fn play_blocking(times: u32) -> Result<()> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| NotifyError::Sound(e.to_string()))?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        for i in 0..times {
            let source = rodio::source::SineWave::new(frequency(i))
                .take_duration(TONE_LENGTH)
                .amplify(0.25);
            sink.append(source);
            sink.sleep_until_end();
            if i + 1 < times {
                std::thread::sleep(ALERT_GAP);
            }
        }
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn speech_command(text: &str) -> (&'static str, Vec<String>) {
    ("say", vec![text.to_string()])
}

#[cfg(target_os = "windows")]
fn speech_command(text: &str) -> (&'static str, Vec<String>) {
    let escaped = text.replace('\'', "''");
    (
        "powershell",
        vec![
            "-Command".to_string(),
            format!(
                "Add-Type -AssemblyName System.Speech; \
                 (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{escaped}')"
            ),
        ],
    )
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn speech_command(text: &str) -> (&'static str, Vec<String>) {
    ("espeak", vec![text.to_string()])
}

#[cfg(target_os = "macos")]
fn alert_command() -> (&'static str, Vec<String>) {
    ("afplay", vec!["/System/Library/Sounds/Glass.aiff".to_string()])
}

#[cfg(target_os = "windows")]
fn alert_command() -> (&'static str, Vec<String>) {
    (
        "powershell",
        vec![
            "-Command".to_string(),
            "[System.Media.SystemSounds]::Exclamation.Play()".to_string(),
        ],
    )
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn alert_command() -> (&'static str, Vec<String>) {
    (
        "paplay",
        vec!["/usr/share/sounds/freedesktop/stereo/complete.oga".to_string()],
    )
}

/// Strip pictographs and line breaks that some toast backends reject.
#[must_use]
pub fn sanitize_for_toast(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .filter(|c| !is_pictograph(*c))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_pictograph(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F300..=0x1FAFF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0xFE00..=0xFE0F
            | 0x200D
            | 0x20E3
            | 0xE0020..=0xE007F
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_emoji_and_newlines() {
        assert_eq!(
            sanitize_for_toast("🎉 APPOINTMENT AVAILABLE!\n\nDates: 12.05, 13.05 ✅"),
            "APPOINTMENT AVAILABLE! Dates: 12.05, 13.05"
        );
    }

    #[test]
    fn test_sanitize_keeps_polish_letters() {
        assert_eq!(sanitize_for_toast("Odśwież – Dalej"), "Odśwież – Dalej");
    }

    #[tokio::test]
    async fn test_disabled_channels_do_nothing() {
        let notifier = DesktopNotifier::new(false, false, false);
        // Would spawn helpers or touch the desktop if enabled
        notifier.notify("t", "b").await;
        notifier.speak("hello").await;
        notifier.alert(3).await;
    }

    #[tokio::test]
    async fn test_missing_helper_is_reported() {
        let err = run_helper(
            "slotwatch-definitely-missing-binary",
            &[],
            Duration::from_secs(1),
        )
        .await
        .expect_err("missing program");
        assert!(matches!(err, NotifyError::Command { .. }));
    }

    #[cfg(not(feature = "sound"))]
    #[tokio::test(start_paused = true)]
    async fn test_missing_sound_player_falls_back_to_bell() {
        let notifier = DesktopNotifier::new(false, false, true)
            .with_alert_helper("slotwatch-definitely-missing-player", vec![]);

        assert_eq!(notifier.play_alert(3).await, AlertSound::Bell);
    }

    #[cfg(not(feature = "sound"))]
    #[tokio::test]
    async fn test_working_sound_player_is_used() {
        #[cfg(unix)]
        let notifier = DesktopNotifier::new(false, false, true).with_alert_helper("true", vec![]);
        #[cfg(windows)]
        let notifier = DesktopNotifier::new(false, false, true)
            .with_alert_helper("cmd", vec!["/C".to_string(), "exit 0".to_string()]);

        assert_eq!(notifier.play_alert(1).await, AlertSound::Helper);
    }

    #[cfg(feature = "sound")]
    #[test]
    fn test_tones_alternate_pitch() {
        assert!(tone::frequency(0) > tone::frequency(1));
        assert!((tone::frequency(0) - tone::frequency(2)).abs() < f32::EPSILON);
    }
}
