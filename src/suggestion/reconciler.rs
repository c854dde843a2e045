//! Suggestion state for a device form being filled in

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{apply, Suggestion, SuggestionSource, MIN_SUGGESTION_CHARS};
use crate::validation::DeviceForm;

/// Whether the form creates a new device or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    /// Suggestions are never requested while editing
    Edit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionState {
    Idle,
    /// A request for `input` is in flight
    Suggesting { input: String },
    /// `candidate` awaits the user's apply or discard
    Proposed { input: String, candidate: Suggestion },
}

/// Drives `Idle -> Suggesting -> {Proposed, Idle}` from name edits
///
/// Requests are not cancelled, but each carries a generation number and
/// only the response for the newest edit may change the state.
pub struct SuggestionReconciler<S> {
    source: S,
    mode: FormMode,
    min_chars: usize,
    generation: AtomicU64,
    state: Mutex<SuggestionState>,
}

impl<S: SuggestionSource> SuggestionReconciler<S> {
    pub fn new(source: S, mode: FormMode) -> Self {
        Self::with_min_chars(source, mode, MIN_SUGGESTION_CHARS)
    }

    pub fn with_min_chars(source: S, mode: FormMode, min_chars: usize) -> Self {
        Self {
            source,
            mode,
            min_chars,
            generation: AtomicU64::new(0),
            state: Mutex::new(SuggestionState::Idle),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    fn lock(&self) -> MutexGuard<'_, SuggestionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move to `next`, invalidating whatever is in flight
    fn transition(&self, next: SuggestionState) -> u64 {
        let mut state = self.lock();
        *state = next;
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn state(&self) -> SuggestionState {
        self.lock().clone()
    }

    /// The pending candidate, if any
    pub fn candidate(&self) -> Option<Suggestion> {
        match &*self.lock() {
            SuggestionState::Proposed { candidate, .. } => Some(*candidate),
            _ => None,
        }
    }

    /// React to an edit of the name field; returns the resulting state
    ///
    /// Below the threshold the state drops to `Idle`. Otherwise a request
    /// is made, and its outcome is dropped if another edit came in while it
    /// was pending. Failures are logged and end in `Idle`.
    pub async fn name_changed(&self, name: &str) -> SuggestionState {
        if self.mode == FormMode::Edit {
            return self.state();
        }

        let input = name.trim();
        if input.chars().count() < self.min_chars {
            self.transition(SuggestionState::Idle);
            return SuggestionState::Idle;
        }

        let generation = self.transition(SuggestionState::Suggesting {
            input: input.to_string(),
        });

        let outcome = self.source.suggest(input).await;

        let mut state = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Discarding stale suggestion for {:?}", input);
            return state.clone();
        }

        *state = match outcome {
            Ok(Some(candidate)) => SuggestionState::Proposed {
                input: input.to_string(),
                candidate,
            },
            Ok(None) => SuggestionState::Idle,
            Err(e) => {
                log::warn!("Suggestion for {:?} failed: {}", input, e);
                SuggestionState::Idle
            }
        };
        state.clone()
    }

    /// Apply the pending candidate to `form` and return to `Idle`
    ///
    /// `None` when there is nothing to apply.
    pub fn apply(&self, form: &DeviceForm) -> Option<DeviceForm> {
        let candidate = self.candidate()?;
        self.transition(SuggestionState::Idle);
        Some(apply(&candidate, form))
    }

    /// Drop the pending candidate; the form is left alone
    pub fn discard(&self) {
        self.transition(SuggestionState::Idle);
    }

    /// Back to `Idle`, as when the form is closed
    pub fn reset(&self) {
        self.transition(SuggestionState::Idle);
    }
}
