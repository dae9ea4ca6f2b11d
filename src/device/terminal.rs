use parking_lot::Mutex;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};
use crate::capture::{
    Acquisition, CameraDevice, Capability, CaptureError, CapturedImage, GalleryPicker,
    PermissionPrompt, PermissionState,
};
use crate::common::config::CaptureConfig;

/// Print `question` and read one trimmed line from stdin.
///
/// Closed stdin is `ErrorKind::UnexpectedEof`, never an empty answer.
pub async fn ask(question: &str) -> io::Result<String> {
    let question = question.to_string();
    tokio::task::spawn_blocking(move || {
        print!("{}", question);
        io::stdout().flush()?;
        read_answer(&mut io::stdin().lock())
    })
    .await
    .map_err(io::Error::other)?
}

fn read_answer(input: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim().to_string())
}

pub fn is_eof(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::UnexpectedEof
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Device backed by the terminal: y/N permission prompts, a file path as the gallery and an
/// external command as the camera.
pub struct TerminalDevice {
    camera: Mutex<PermissionState>,
    gallery: Mutex<PermissionState>,
    photo: Option<PathBuf>,
    capture: CaptureConfig,
    assume_yes: bool,
}

impl TerminalDevice {
    pub fn new(photo: Option<PathBuf>, capture: CaptureConfig, assume_yes: bool) -> Self {
        Self {
            camera: Mutex::new(PermissionState::Undetermined),
            gallery: Mutex::new(PermissionState::Undetermined),
            photo,
            capture,
            assume_yes,
        }
    }

    fn slot(&self, capability: Capability) -> &Mutex<PermissionState> {
        match capability {
            Capability::Camera => &self.camera,
            Capability::Gallery => &self.gallery,
        }
    }

    /// Expand the configured command line, `{output}` replaced by `output`.
    fn capture_command(&self, output: &str) -> Result<Command, CaptureError> {
        let template = self.capture.command.as_deref().ok_or_else(|| {
            CaptureError::Unavailable("no capture.command configured".to_string())
        })?;
        let mut parts = template
            .split_whitespace()
            .map(|part| part.replace("{output}", output));
        let program = parts
            .next()
            .ok_or_else(|| CaptureError::Unavailable("capture.command is empty".to_string()))?;
        let mut command = Command::new(program);
        command.args(parts);
        Ok(command)
    }
}

impl PermissionPrompt for TerminalDevice {
    async fn status(&self, capability: Capability) -> PermissionState {
        *self.slot(capability).lock()
    }

    async fn request(&self, capability: Capability) -> PermissionState {
        let state = if self.assume_yes {
            PermissionState::Granted
        } else {
            match ask(&format!("Allow access to your {}? [y/N] ", capability)).await {
                Ok(answer) if is_yes(&answer) => PermissionState::Granted,
                Ok(_) => PermissionState::Denied,
                Err(e) => {
                    debug!("Permission prompt failed: {}", e);
                    PermissionState::Denied
                }
            }
        };
        *self.slot(capability).lock() = state;
        state
    }
}

impl CameraDevice for TerminalDevice {
    async fn capture(&self) -> Result<CapturedImage, CaptureError> {
        let dir = self.capture.output_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CaptureError::Unavailable(format!("{}: {}", dir.display(), e)))?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let output = dir.join(format!("capture_{}.jpg", timestamp));
        let output_str = output.to_string_lossy().into_owned();

        let mut command = self.capture_command(&output_str)?;
        info!("Capturing to {}", output.display());
        let status = command
            .status()
            .await
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?;
        if !status.success() {
            return Err(CaptureError::Failed(format!("capture command exited with {}", status)));
        }
        if !output.exists() {
            return Err(CaptureError::Failed(format!(
                "capture command did not write {}", output.display()
            )));
        }
        Ok(CapturedImage::from_path(&output))
    }
}

impl GalleryPicker for TerminalDevice {
    async fn pick(&self) -> Result<Acquisition, CaptureError> {
        let path = match &self.photo {
            Some(path) => path.clone(),
            None => {
                let answer = match ask("Path to photo (empty to cancel): ").await {
                    Ok(answer) => answer,
                    Err(e) if is_eof(&e) => return Ok(Acquisition::Cancelled),
                    Err(e) => return Err(CaptureError::Unavailable(e.to_string())),
                };
                if answer.is_empty() {
                    return Ok(Acquisition::Cancelled);
                }
                PathBuf::from(answer)
            }
        };

        if !path.is_file() {
            return Err(CaptureError::Failed(format!("{} is not a file", path.display())));
        }
        Ok(Acquisition::Captured(CapturedImage::from_path(&path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(photo: Option<PathBuf>, command: Option<&str>) -> TerminalDevice {
        let capture = CaptureConfig {
            command: command.map(str::to_string),
            output_dir: Some(std::env::temp_dir()),
        };
        TerminalDevice::new(photo, capture, true)
    }

    #[test]
    fn closed_input_is_eof_not_empty() {
        let mut closed = io::Cursor::new(Vec::new());
        let e = read_answer(&mut closed).unwrap_err();
        assert!(is_eof(&e));

        let mut input = io::Cursor::new(b"\n  c \n".to_vec());
        assert_eq!(read_answer(&mut input).unwrap(), "");
        assert_eq!(read_answer(&mut input).unwrap(), "c");
        assert!(is_eof(&read_answer(&mut input).unwrap_err()));
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes("y"));
        assert!(is_yes("YES"));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[tokio::test]
    async fn assume_yes_grants_and_remembers() {
        let device = device(None, None);
        assert_eq!(device.status(Capability::Camera).await, PermissionState::Undetermined);
        assert_eq!(device.request(Capability::Camera).await, PermissionState::Granted);
        assert_eq!(device.status(Capability::Camera).await, PermissionState::Granted);
        assert_eq!(device.status(Capability::Gallery).await, PermissionState::Undetermined);
    }

    #[tokio::test]
    async fn preset_photo_is_picked() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let picker = device(Some(file.path().to_path_buf()), None);
        match picker.pick().await.unwrap() {
            Acquisition::Captured(image) => assert_eq!(image.local_path(), file.path()),
            other => panic!("expected a picked image, got {:?}", other),
        }

        let missing = device(Some(PathBuf::from("/no/such/face.jpg")), None);
        assert!(missing.pick().await.is_err());
    }

    #[tokio::test]
    async fn camera_without_command_is_unavailable() {
        let device = device(None, None);
        assert!(matches!(device.capture().await, Err(CaptureError::Unavailable(_))));
    }

    #[test]
    fn command_template_expands_output() {
        let device = device(None, Some("fswebcam --no-banner {output}"));
        let command = device.capture_command("/tmp/x.jpg").unwrap();
        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "fswebcam");
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(args, ["--no-banner", "/tmp/x.jpg"]);
    }
}
