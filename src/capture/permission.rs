use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    Gallery,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Camera => write!(f, "camera"),
            Capability::Gallery => write!(f, "photo gallery"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Undetermined,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }
}

/// OS-level permission query and prompt.
#[allow(async_fn_in_trait)]
pub trait PermissionPrompt {
    /// Current status without prompting.
    async fn status(&self, capability: Capability) -> PermissionState;

    /// Show the prompt and wait for the user's answer.
    async fn request(&self, capability: Capability) -> PermissionState;
}

impl<T: PermissionPrompt> PermissionPrompt for Arc<T> {
    async fn status(&self, capability: Capability) -> PermissionState {
        (**self).status(capability).await
    }

    async fn request(&self, capability: Capability) -> PermissionState {
        (**self).request(capability).await
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Known {
    camera: PermissionState,
    gallery: PermissionState,
}

impl Known {
    fn slot(&mut self, capability: Capability) -> &mut PermissionState {
        match capability {
            Capability::Camera => &mut self.camera,
            Capability::Gallery => &mut self.gallery,
        }
    }
}

/// Per-screen permission tracker.
///
/// Status is re-read from the device on every `ensure`, so a grant or revoke made in the
/// OS settings is picked up on the next gated action. Only `Undetermined` triggers a prompt;
/// after a denial the caller has to ask explicitly through `request_again`.
pub struct PermissionGate<P> {
    prompt: P,
    known: Mutex<Known>,
}

impl<P: PermissionPrompt> PermissionGate<P> {
    pub fn new(prompt: P) -> Self {
        Self {
            prompt,
            known: Mutex::new(Known::default()),
        }
    }

    pub async fn ensure(&self, capability: Capability) -> PermissionState {
        let state = match self.prompt.status(capability).await {
            PermissionState::Undetermined => {
                info!("Requesting {} permission", capability);
                self.prompt.request(capability).await
            }
            settled => {
                debug!("{} permission already {:?}", capability, settled);
                settled
            }
        };
        self.remember(capability, state);
        state
    }

    pub async fn request_again(&self, capability: Capability) -> PermissionState {
        info!("Re-requesting {} permission", capability);
        let state = self.prompt.request(capability).await;
        self.remember(capability, state);
        state
    }

    /// Last answer seen by this gate; `Undetermined` until the first check.
    pub fn last_known(&self, capability: Capability) -> PermissionState {
        *self.known.lock().slot(capability)
    }

    fn remember(&self, capability: Capability, state: PermissionState) {
        *self.known.lock().slot(capability) = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedPrompt {
        status: Mutex<PermissionState>,
        answer: PermissionState,
        prompts: AtomicUsize,
    }

    impl ScriptedPrompt {
        fn new(status: PermissionState, answer: PermissionState) -> Self {
            Self { status: Mutex::new(status), answer, prompts: AtomicUsize::new(0) }
        }
    }

    impl PermissionPrompt for ScriptedPrompt {
        async fn status(&self, _capability: Capability) -> PermissionState {
            *self.status.lock()
        }

        async fn request(&self, _capability: Capability) -> PermissionState {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            *self.status.lock() = self.answer;
            self.answer
        }
    }

    #[tokio::test]
    async fn undetermined_prompts_once() {
        let gate = PermissionGate::new(ScriptedPrompt::new(
            PermissionState::Undetermined,
            PermissionState::Granted,
        ));
        assert_eq!(gate.last_known(Capability::Camera), PermissionState::Undetermined);
        assert_eq!(gate.ensure(Capability::Camera).await, PermissionState::Granted);
        assert_eq!(gate.ensure(Capability::Camera).await, PermissionState::Granted);
        assert_eq!(gate.prompt.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(gate.last_known(Capability::Camera), PermissionState::Granted);
        assert_eq!(gate.last_known(Capability::Gallery), PermissionState::Undetermined);
    }

    #[tokio::test]
    async fn denied_is_not_reprompted_by_ensure() {
        let gate = PermissionGate::new(ScriptedPrompt::new(
            PermissionState::Denied,
            PermissionState::Granted,
        ));
        assert_eq!(gate.ensure(Capability::Gallery).await, PermissionState::Denied);
        assert_eq!(gate.prompt.prompts.load(Ordering::SeqCst), 0);

        assert_eq!(gate.request_again(Capability::Gallery).await, PermissionState::Granted);
        assert_eq!(gate.prompt.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn revocation_is_picked_up() {
        let gate = PermissionGate::new(ScriptedPrompt::new(
            PermissionState::Granted,
            PermissionState::Granted,
        ));
        assert!(gate.ensure(Capability::Camera).await.is_granted());
        *gate.prompt.status.lock() = PermissionState::Denied;
        assert_eq!(gate.ensure(Capability::Camera).await, PermissionState::Denied);
    }
}
