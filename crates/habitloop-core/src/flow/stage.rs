//! Post-check-in stages and the pure transition table between them.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// One screen in the post-check-in sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Milestone { day: u32 },
    Success,
    NotePrompt,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Milestone { .. } => "milestone",
            Stage::Success => "success",
            Stage::NotePrompt => "note_prompt",
        }
    }
}

/// User input on the stage currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageChoice {
    /// Move on to whatever comes next.
    Continue,
    /// From Success: open the reflection note prompt.
    AddNote,
    /// End the flow.
    Finish,
    /// From NotePrompt: store the note, then close.
    SaveNote(String),
    /// From NotePrompt: close without a note.
    SkipNote,
}

impl StageChoice {
    pub fn name(&self) -> &'static str {
        match self {
            StageChoice::Continue => "continue",
            StageChoice::AddNote => "add_note",
            StageChoice::Finish => "finish",
            StageChoice::SaveNote(_) => "save_note",
            StageChoice::SkipNote => "skip_note",
        }
    }
}

/// What the controller must do in response to a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    /// Present the following stage (or close if none is left).
    Next,
    /// Insert the note prompt after the current stage and present it.
    InsertNotePrompt,
    /// Persist the note, then behave like `Next`.
    SaveNote(String),
    /// Close immediately, skipping anything left.
    Close,
}

/// Stage sequence for a freshly accepted check-in.
///
/// The milestone stage, when present, always comes first. The note prompt is
/// never part of the initial sequence; it is only inserted on request.
pub fn build_stages(milestone_day: Option<u32>) -> Vec<Stage> {
    let mut stages = Vec::with_capacity(3);
    if let Some(day) = milestone_day {
        stages.push(Stage::Milestone { day });
    }
    stages.push(Stage::Success);
    stages
}

/// Decide the action for `choice` on `stage`. Pure; no side effects.
pub fn stage_action(stage: Stage, choice: StageChoice) -> Result<StageAction, FlowError> {
    match (stage, choice) {
        (Stage::Milestone { .. }, StageChoice::Continue) => Ok(StageAction::Next),
        (Stage::Success, StageChoice::AddNote) => Ok(StageAction::InsertNotePrompt),
        (Stage::Success, StageChoice::Finish | StageChoice::Continue) => Ok(StageAction::Close),
        (Stage::NotePrompt, StageChoice::SaveNote(text)) => Ok(StageAction::SaveNote(text)),
        (Stage::NotePrompt, StageChoice::SkipNote | StageChoice::Finish) => Ok(StageAction::Close),
        (stage, choice) => Err(FlowError::ChoiceNotAccepted {
            stage: stage.name().to_string(),
            choice: choice.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_stage_comes_first() {
        assert_eq!(
            build_stages(Some(30)),
            vec![Stage::Milestone { day: 30 }, Stage::Success]
        );
        assert_eq!(build_stages(None), vec![Stage::Success]);
    }

    #[test]
    fn success_choices() {
        assert_eq!(
            stage_action(Stage::Success, StageChoice::AddNote),
            Ok(StageAction::InsertNotePrompt)
        );
        assert_eq!(
            stage_action(Stage::Success, StageChoice::Finish),
            Ok(StageAction::Close)
        );
    }

    #[test]
    fn note_prompt_choices() {
        assert_eq!(
            stage_action(Stage::NotePrompt, StageChoice::SaveNote("felt good".into())),
            Ok(StageAction::SaveNote("felt good".into()))
        );
        assert_eq!(
            stage_action(Stage::NotePrompt, StageChoice::SkipNote),
            Ok(StageAction::Close)
        );
    }

    #[test]
    fn rejects_choices_a_stage_does_not_offer() {
        let err = stage_action(Stage::Milestone { day: 7 }, StageChoice::AddNote).unwrap_err();
        assert_eq!(
            err,
            FlowError::ChoiceNotAccepted {
                stage: "milestone".into(),
                choice: "add_note".into(),
            }
        );
        assert!(stage_action(Stage::Success, StageChoice::SaveNote("x".into())).is_err());
        assert!(stage_action(Stage::NotePrompt, StageChoice::AddNote).is_err());
    }

    #[test]
    fn stage_serializes_with_tag() {
        let json = serde_json::to_value(Stage::Milestone { day: 7 }).unwrap();
        assert_eq!(json["stage"], "milestone");
        assert_eq!(json["day"], 7);
    }
}
