use std::collections::BTreeMap;
use std::fmt;

use crate::error::SimError;
use crate::types::{DialogStep, GameDialog, InputSource, PanelSide};

/// Which input advances an active dialog, chosen from the input mode the
/// level was entered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceListener {
    ActionKey,
    PointerTap,
}

impl AdvanceListener {
    pub fn for_input_source(source: InputSource) -> Self {
        match source {
            InputSource::Joystick => Self::PointerTap,
            InputSource::Keyboard | InputSource::Gamepad => Self::ActionKey,
        }
    }
}

/// What the presentation layer needs for one conversation line.
#[derive(Clone, Debug, PartialEq)]
pub struct DialogStepView {
    pub dialog_id: String,
    pub step_index: usize,
    pub portrait_ref: String,
    pub title: String,
    pub text: String,
    pub panel_side: PanelSide,
}

#[derive(Clone, Debug, PartialEq)]
enum DialogState {
    Idle,
    Active {
        dialog_id: String,
        step_index: usize,
        listener: AdvanceListener,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StartOutcome {
    Started,
    /// A sequence was already active; the request is dropped, not queued.
    IgnoredActive,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AdvanceOutcome {
    Idle,
    Step(DialogStepView),
    Finished {
        dialog_id: String,
        on_finish_trigger_id: Option<String>,
    },
}

pub type StepCallback = Box<dyn FnMut(&DialogStepView)>;

/// Sequences scripted conversations: `Idle -> Active(step) -> Idle`. Input
/// suspension and the finish-trigger fire are wired by the owning
/// simulation; this type only tracks the sequence.
#[derive(Default)]
pub struct DialogOrchestrator {
    dialogs: BTreeMap<String, GameDialog>,
    state: DialogState,
    on_step_changed: Option<StepCallback>,
}

impl Default for DialogState {
    fn default() -> Self {
        Self::Idle
    }
}

impl DialogOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, on_step_changed: StepCallback) {
        self.on_step_changed = Some(on_step_changed);
    }

    pub fn register_dialog(&mut self, dialog: GameDialog) -> Result<(), SimError> {
        if dialog.steps.is_empty() {
            return Err(SimError::Configuration(format!(
                "dialog `{}` has no steps",
                dialog.id
            )));
        }
        if self.dialogs.contains_key(&dialog.id) {
            return Err(SimError::Configuration(format!(
                "duplicate dialog id `{}`",
                dialog.id
            )));
        }
        self.dialogs.insert(dialog.id.clone(), dialog);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DialogState::Active { .. })
    }

    pub fn listener(&self) -> Option<AdvanceListener> {
        match &self.state {
            DialogState::Active { listener, .. } => Some(*listener),
            DialogState::Idle => None,
        }
    }

    pub fn start(
        &mut self,
        dialog_id: &str,
        source: InputSource,
    ) -> Result<StartOutcome, SimError> {
        if self.is_active() {
            return Ok(StartOutcome::IgnoredActive);
        }
        if !self.dialogs.contains_key(dialog_id) {
            return Err(SimError::UnknownDialog(dialog_id.to_string()));
        }
        self.state = DialogState::Active {
            dialog_id: dialog_id.to_string(),
            step_index: 0,
            listener: AdvanceListener::for_input_source(source),
        };
        self.notify_current_step();
        Ok(StartOutcome::Started)
    }

    pub fn advance(&mut self) -> AdvanceOutcome {
        let DialogState::Active {
            dialog_id,
            step_index,
            listener,
        } = self.state.clone()
        else {
            return AdvanceOutcome::Idle;
        };

        let step_count = self
            .dialogs
            .get(&dialog_id)
            .map(|dialog| dialog.steps.len())
            .unwrap_or(0);
        let next_index = step_index + 1;
        if next_index >= step_count {
            let on_finish_trigger_id = self
                .dialogs
                .get(&dialog_id)
                .and_then(|dialog| dialog.on_finish_trigger_id.clone());
            self.state = DialogState::Idle;
            return AdvanceOutcome::Finished {
                dialog_id,
                on_finish_trigger_id,
            };
        }

        self.state = DialogState::Active {
            dialog_id,
            step_index: next_index,
            listener,
        };
        self.notify_current_step();
        match self.current_step() {
            Some(view) => AdvanceOutcome::Step(view),
            None => AdvanceOutcome::Idle,
        }
    }

    pub fn current_step(&self) -> Option<DialogStepView> {
        let DialogState::Active {
            dialog_id,
            step_index,
            ..
        } = &self.state
        else {
            return None;
        };
        let step = self.dialogs.get(dialog_id)?.steps.get(*step_index)?;
        Some(step_view(dialog_id, *step_index, step))
    }

    /// Level teardown: forgets every dialog and drops any active sequence.
    pub fn clear(&mut self) {
        self.dialogs.clear();
        self.state = DialogState::Idle;
    }

    fn notify_current_step(&mut self) {
        let Some(view) = self.current_step() else {
            return;
        };
        if let Some(callback) = self.on_step_changed.as_mut() {
            callback(&view);
        }
    }
}

impl fmt::Debug for DialogOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogOrchestrator")
            .field("dialogs", &self.dialogs.keys().collect::<Vec<_>>())
            .field("state", &self.state)
            .finish()
    }
}

fn step_view(dialog_id: &str, step_index: usize, step: &DialogStep) -> DialogStepView {
    DialogStepView {
        dialog_id: dialog_id.to_string(),
        step_index,
        portrait_ref: step.portrait_ref.clone(),
        title: step.title.clone(),
        text: step.text.clone(),
        panel_side: step.panel_side,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{AdvanceOutcome, DialogOrchestrator, StartOutcome};
    use crate::error::SimError;
    use crate::types::{DialogStep, GameDialog, InputSource, PanelSide};

    fn two_step_dialog(id: &str, on_finish: Option<&str>) -> GameDialog {
        GameDialog {
            id: id.to_string(),
            steps: vec![
                DialogStep {
                    portrait_ref: "elder".to_string(),
                    title: "Elder".to_string(),
                    text: "The veil is thin tonight.".to_string(),
                    panel_side: PanelSide::Left,
                },
                DialogStep {
                    portrait_ref: "hero".to_string(),
                    title: "Hero".to_string(),
                    text: "Then I will cross it.".to_string(),
                    panel_side: PanelSide::Right,
                },
            ],
            on_finish_trigger_id: on_finish.map(str::to_string),
        }
    }

    #[test]
    fn two_step_dialog_finishes_on_second_advance_with_trigger() {
        let mut dialogs = DialogOrchestrator::new();
        dialogs
            .register_dialog(two_step_dialog("intro", Some("open_gate")))
            .expect("registers");

        let outcome = dialogs
            .start("intro", InputSource::Keyboard)
            .expect("starts");
        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(dialogs.current_step().expect("step").step_index, 0);

        match dialogs.advance() {
            AdvanceOutcome::Step(view) => assert_eq!(view.step_index, 1),
            other => panic!("expected second step, got {other:?}"),
        }
        match dialogs.advance() {
            AdvanceOutcome::Finished {
                dialog_id,
                on_finish_trigger_id,
            } => {
                assert_eq!(dialog_id, "intro");
                assert_eq!(on_finish_trigger_id.as_deref(), Some("open_gate"));
            }
            other => panic!("expected finish, got {other:?}"),
        }
        assert!(!dialogs.is_active());
        assert_eq!(dialogs.advance(), AdvanceOutcome::Idle);
    }

    #[test]
    fn starting_while_active_is_a_silent_no_op() {
        let mut dialogs = DialogOrchestrator::new();
        dialogs
            .register_dialog(two_step_dialog("first", None))
            .expect("registers");
        dialogs
            .register_dialog(two_step_dialog("second", None))
            .expect("registers");

        dialogs.start("first", InputSource::Keyboard).expect("starts");
        let outcome = dialogs
            .start("second", InputSource::Keyboard)
            .expect("no-op is not an error");
        assert_eq!(outcome, StartOutcome::IgnoredActive);
        assert_eq!(
            dialogs.current_step().expect("still first").dialog_id,
            "first"
        );
    }

    #[test]
    fn unknown_dialog_id_is_an_error() {
        let mut dialogs = DialogOrchestrator::new();
        let result = dialogs.start("missing", InputSource::Keyboard);
        assert!(matches!(result, Err(SimError::UnknownDialog(_))));
    }

    #[test]
    fn duplicate_dialog_id_is_a_configuration_error() {
        let mut dialogs = DialogOrchestrator::new();
        dialogs
            .register_dialog(two_step_dialog("intro", None))
            .expect("first registers");
        let result = dialogs.register_dialog(two_step_dialog("intro", None));
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn step_callback_sees_every_shown_step() {
        let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut dialogs = DialogOrchestrator::new();
        dialogs.initialize(Box::new(move |view| sink.borrow_mut().push(view.step_index)));
        dialogs
            .register_dialog(two_step_dialog("intro", None))
            .expect("registers");

        dialogs.start("intro", InputSource::Gamepad).expect("starts");
        dialogs.advance();
        dialogs.advance();
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn joystick_input_listens_for_pointer_taps() {
        let mut dialogs = DialogOrchestrator::new();
        dialogs
            .register_dialog(two_step_dialog("intro", None))
            .expect("registers");
        dialogs.start("intro", InputSource::Joystick).expect("starts");
        assert_eq!(dialogs.listener(), Some(super::AdvanceListener::PointerTap));
    }
}
