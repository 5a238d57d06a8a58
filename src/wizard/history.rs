use crate::db::models::UserDoc;
use crate::wizard::session::Session;
use crate::wizard::WizardError;

pub const MAX_RECENT_PROMPTS: usize = 5;

/// Move-to-front insert with exact-match dedupe, capped at
/// `MAX_RECENT_PROMPTS`. A resubmitted prompt moves up instead of
/// appearing twice.
pub fn push_recent(prompts: &mut Vec<String>, prompt: &str) {
    prompts.retain(|existing| existing != prompt);
    prompts.insert(0, prompt.to_string());
    prompts.truncate(MAX_RECENT_PROMPTS);
}

/// The saved snapshot, or `NotFound` when the user never saved one.
pub fn require_saved(doc: &UserDoc) -> Result<Session, WizardError> {
    doc.saved_settings.clone().ok_or(WizardError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::session::{AspectRatio, OutputType, Quality, StylePreset};

    fn sample_session() -> Session {
        Session {
            prompt: "a red fox".to_string(),
            negative_prompt: String::new(),
            timeout_seconds: 60,
            num_images: 3,
            quality: Quality::Standard,
            ratio: AspectRatio::Square,
            style: StylePreset::Realistic,
            output_type: OutputType::Images,
        }
    }

    #[test]
    fn recent_prompts_never_exceed_the_cap() {
        let mut prompts = Vec::new();
        for i in 0..10 {
            push_recent(&mut prompts, &format!("prompt {i}"));
        }
        assert_eq!(prompts.len(), MAX_RECENT_PROMPTS);
        assert_eq!(prompts[0], "prompt 9");
    }

    #[test]
    fn resubmitted_prompt_moves_to_front_without_duplicating() {
        let mut prompts = vec![
            "c".to_string(),
            "b".to_string(),
            "a".to_string(),
        ];
        push_recent(&mut prompts, "a");
        assert_eq!(prompts, vec!["a", "c", "b"]);
    }

    #[test]
    fn missing_snapshot_is_not_found() {
        let doc = UserDoc::default();
        assert!(matches!(
            require_saved(&doc),
            Err(WizardError::NotFound)
        ));
    }

    #[test]
    fn snapshot_is_a_deep_copy() {
        let mut doc = UserDoc::default();
        doc.saved_settings = Some(sample_session());

        let mut loaded = require_saved(&doc).unwrap();
        loaded.prompt = "something else".to_string();
        assert_eq!(doc.saved_settings.unwrap().prompt, "a red fox");
    }
}
