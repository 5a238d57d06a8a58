use rand::Rng;

use crate::wizard::session::{
    parse_timeout_seconds, AspectRatio, Draft, OutputType, Quality, Session, StylePreset,
    DEFAULT_TIMEOUT_SECONDS, IMAGE_COUNT_OPTIONS, MAX_TIMEOUT_SECONDS, MIN_TIMEOUT_SECONDS,
};

/// Conversation position. One value per user; every inbound event maps to
/// exactly one transition out of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// Idle and waiting for a prompt. Doubles as the initial state.
    AwaitPrompt,
    AwaitNegativeChoice,
    AwaitNegativeText,
    AwaitTimeoutChoice,
    AwaitTimeoutValue,
    AwaitNumImages,
    AwaitQuality,
    AwaitRatio,
    AwaitStyle,
    AwaitOutputType,
    PostGeneration,
}

/// Inbound event, with store-backed payloads already resolved by the
/// handler so transitions stay pure.
#[derive(Debug, Clone)]
pub enum WizardInput {
    Text(String),
    Button(ButtonInput),
    Cancel,
}

#[derive(Debug, Clone)]
pub enum ButtonInput {
    RecentPrompt(String),
    LoadSaved(Session),
    NegativeAdd,
    NegativeSkip,
    NegativeUseSaved(Option<String>),
    TimeoutCustom,
    TimeoutDefault,
    NumImages(u8),
    Quality(Quality),
    /// `None` means "surprise me"; resolved to a concrete preset on entry.
    Ratio(Option<AspectRatio>),
    Style(Option<StylePreset>),
    Output(OutputType),
    Regenerate,
    StartNew,
    SaveSettings,
    Upscale,
}

/// Which button set accompanies an outbound ask. The handler layer turns
/// these into inline keyboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    PromptIdle,
    NegativeChoice,
    TimeoutChoice,
    NumImages,
    Quality,
    Ratio,
    Style,
    OutputType,
    PostGeneration,
}

/// Side effects a transition requests. Transitions never touch the
/// transport or the store themselves.
#[derive(Debug, Clone)]
pub enum Effect {
    Ask { text: String, keyboard: Keyboard },
    Notify(String),
    RecordPrompt(String),
    SaveSettings(Session),
    Generate(Session),
}

#[derive(Debug, Clone)]
pub struct Wizard {
    state: WizardState,
    draft: Option<Draft>,
    last: Option<Session>,
}

impl Default for Wizard {
    fn default() -> Self {
        Wizard {
            state: WizardState::AwaitPrompt,
            draft: None,
            last: None,
        }
    }
}

impl Wizard {
    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn last_session(&self) -> Option<&Session> {
        self.last.as_ref()
    }

    pub fn handle<R: Rng>(&mut self, input: WizardInput, rng: &mut R) -> Vec<Effect> {
        match input {
            WizardInput::Cancel => self.cancel(),
            WizardInput::Text(text) => self.on_text(text),
            WizardInput::Button(button) => self.on_button(button, rng),
        }
    }

    /// Clears the working set and returns to the prompt state. Recent
    /// prompts and the saved snapshot live in the store and are untouched.
    fn cancel(&mut self) -> Vec<Effect> {
        if self.state == WizardState::AwaitPrompt && self.draft.is_none() {
            return vec![Effect::Notify(
                "Nothing to cancel. Send me a prompt to start.".to_string(),
            )];
        }
        self.reset();
        vec![Effect::Ask {
            text: "Cancelled. Your recent prompts and saved settings are kept.\n\nSend me a new prompt whenever you're ready."
                .to_string(),
            keyboard: Keyboard::PromptIdle,
        }]
    }

    fn reset(&mut self) {
        self.state = WizardState::AwaitPrompt;
        self.draft = None;
        self.last = None;
    }

    fn on_text(&mut self, text: String) -> Vec<Effect> {
        let text = text.trim().to_string();
        match self.state {
            WizardState::AwaitPrompt => {
                if text.is_empty() {
                    return vec![Effect::Notify(
                        "The prompt can't be empty. Describe what you want to see.".to_string(),
                    )];
                }
                self.accept_prompt(text)
            }
            WizardState::AwaitNegativeText => {
                let draft = self.draft_mut();
                draft.negative_prompt = text;
                self.state = WizardState::AwaitTimeoutChoice;
                vec![ask_timeout_choice("Noted.")]
            }
            WizardState::AwaitTimeoutValue => match parse_timeout_seconds(&text) {
                Ok(seconds) => {
                    self.draft_mut().timeout_seconds = seconds;
                    self.state = WizardState::AwaitNumImages;
                    vec![ask_num_images(&format!("Timeout set to {seconds}s."))]
                }
                Err(err) => vec![Effect::Notify(format!(
                    "{err}. Send a number between {MIN_TIMEOUT_SECONDS} and {MAX_TIMEOUT_SECONDS}."
                ))],
            },
            WizardState::PostGeneration => {
                // Plain text after a batch starts a fresh session.
                self.reset();
                self.accept_prompt(text)
            }
            _ => vec![Effect::Notify(
                "Please use the buttons above to continue (or /cancel to start over).".to_string(),
            )],
        }
    }

    fn accept_prompt(&mut self, prompt: String) -> Vec<Effect> {
        self.draft = Some(Draft::new(prompt.clone()));
        self.last = None;
        self.state = WizardState::AwaitNegativeChoice;
        vec![
            Effect::RecordPrompt(prompt),
            Effect::Ask {
                text: "Prompt saved. Anything the image should avoid?".to_string(),
                keyboard: Keyboard::NegativeChoice,
            },
        ]
    }

    fn on_button<R: Rng>(&mut self, button: ButtonInput, rng: &mut R) -> Vec<Effect> {
        match (self.state, button) {
            // The start-screen buttons stay valid after a finished batch.
            (
                WizardState::AwaitPrompt | WizardState::PostGeneration,
                ButtonInput::RecentPrompt(prompt),
            ) => self.accept_prompt(prompt),
            (
                WizardState::AwaitPrompt | WizardState::PostGeneration,
                ButtonInput::LoadSaved(session),
            ) => {
                // Saved settings bypass the wizard entirely.
                self.last = Some(session.clone());
                self.state = WizardState::PostGeneration;
                self.draft = None;
                vec![Effect::Generate(session)]
            }
            (WizardState::AwaitNegativeChoice, ButtonInput::NegativeAdd) => {
                self.state = WizardState::AwaitNegativeText;
                vec![Effect::Notify(
                    "Send the things to exclude (e.g. \"blur, text, watermark\").".to_string(),
                )]
            }
            (WizardState::AwaitNegativeChoice, ButtonInput::NegativeSkip) => {
                self.state = WizardState::AwaitTimeoutChoice;
                vec![ask_timeout_choice("No exclusions.")]
            }
            (WizardState::AwaitNegativeChoice, ButtonInput::NegativeUseSaved(saved)) => {
                self.draft_mut().negative_prompt = saved.unwrap_or_default();
                self.state = WizardState::AwaitTimeoutChoice;
                vec![ask_timeout_choice("Using your saved exclusions.")]
            }
            (WizardState::AwaitTimeoutChoice, ButtonInput::TimeoutCustom) => {
                self.state = WizardState::AwaitTimeoutValue;
                vec![Effect::Notify(format!(
                    "Send a timeout in seconds ({MIN_TIMEOUT_SECONDS}-{MAX_TIMEOUT_SECONDS})."
                ))]
            }
            (WizardState::AwaitTimeoutChoice, ButtonInput::TimeoutDefault) => {
                self.draft_mut().timeout_seconds = DEFAULT_TIMEOUT_SECONDS;
                self.state = WizardState::AwaitNumImages;
                vec![ask_num_images(&format!(
                    "Using the default timeout ({DEFAULT_TIMEOUT_SECONDS}s)."
                ))]
            }
            (WizardState::AwaitNumImages, ButtonInput::NumImages(count))
                if IMAGE_COUNT_OPTIONS.contains(&count) =>
            {
                self.draft_mut().num_images = Some(count);
                self.state = WizardState::AwaitQuality;
                vec![Effect::Ask {
                    text: format!("{count} image(s). Pick a quality."),
                    keyboard: Keyboard::Quality,
                }]
            }
            (WizardState::AwaitQuality, ButtonInput::Quality(quality)) => {
                self.draft_mut().quality = Some(quality);
                self.state = WizardState::AwaitRatio;
                let (width, height) = quality.base_size();
                vec![Effect::Ask {
                    text: format!(
                        "{} quality ({width}\u{d7}{height} base). Pick an aspect ratio.",
                        quality.label()
                    ),
                    keyboard: Keyboard::Ratio,
                }]
            }
            (WizardState::AwaitRatio, ButtonInput::Ratio(choice)) => {
                // Random resolves once, here; the draft only ever holds a
                // concrete preset.
                let ratio = choice.unwrap_or_else(|| AspectRatio::random(rng));
                self.draft_mut().ratio = Some(ratio);
                self.state = WizardState::AwaitStyle;
                vec![Effect::Ask {
                    text: format!("Aspect ratio: {}. Pick a style.", ratio.label()),
                    keyboard: Keyboard::Style,
                }]
            }
            (WizardState::AwaitStyle, ButtonInput::Style(choice)) => {
                let style = choice.unwrap_or_else(|| StylePreset::random(rng));
                self.draft_mut().style = Some(style);
                self.state = WizardState::AwaitOutputType;
                vec![Effect::Ask {
                    text: format!("Style: {}. Deliver as images or links?", style.label()),
                    keyboard: Keyboard::OutputType,
                }]
            }
            (WizardState::AwaitOutputType, ButtonInput::Output(output_type)) => {
                let Some(draft) = self.draft.take() else {
                    self.reset();
                    return vec![Effect::Notify(
                        "This session expired. Send a new prompt to start over.".to_string(),
                    )];
                };
                match draft.complete(output_type) {
                    Some(session) => {
                        self.last = Some(session.clone());
                        self.state = WizardState::PostGeneration;
                        vec![Effect::Generate(session)]
                    }
                    None => {
                        self.reset();
                        vec![Effect::Notify(
                            "This session is missing a step. Send a new prompt to start over."
                                .to_string(),
                        )]
                    }
                }
            }
            (WizardState::PostGeneration, ButtonInput::Regenerate) => match self.last.clone() {
                // Replays the exact resolved session; random picks are not
                // re-rolled.
                Some(session) => vec![Effect::Generate(session)],
                None => vec![Effect::Notify(
                    "Nothing to regenerate. Send a new prompt to start.".to_string(),
                )],
            },
            (WizardState::PostGeneration, ButtonInput::StartNew) => {
                self.reset();
                vec![Effect::Ask {
                    text: "Fresh start. Send me a prompt, or pick a recent one below.".to_string(),
                    keyboard: Keyboard::PromptIdle,
                }]
            }
            (WizardState::PostGeneration, ButtonInput::SaveSettings) => match self.last.clone() {
                Some(session) => vec![
                    Effect::SaveSettings(session),
                    Effect::Notify(
                        "Settings saved. Use \"saved settings\" on the start screen to replay them."
                            .to_string(),
                    ),
                ],
                None => vec![Effect::Notify("There is no session to save.".to_string())],
            },
            (WizardState::PostGeneration, ButtonInput::Upscale) => vec![Effect::Notify(
                "Upscaling isn't available yet.".to_string(),
            )],
            _ => vec![Effect::Notify(
                "That button doesn't apply right now. Use the latest message's buttons or /cancel."
                    .to_string(),
            )],
        }
    }

    /// The draft always exists in the states that mutate it; falling back
    /// to an empty one covers a process restart mid-conversation.
    fn draft_mut(&mut self) -> &mut Draft {
        self.draft.get_or_insert_with(Draft::default)
    }
}

fn ask_timeout_choice(ack: &str) -> Effect {
    Effect::Ask {
        text: format!("{ack} How long may each image take?"),
        keyboard: Keyboard::TimeoutChoice,
    }
}

fn ask_num_images(ack: &str) -> Effect {
    Effect::Ask {
        text: format!("{ack} How many images?"),
        keyboard: Keyboard::NumImages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn drive_to_output_type(wizard: &mut Wizard) {
        let mut rng = rng();
        wizard.handle(WizardInput::Text("a red fox".to_string()), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::NegativeSkip), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::TimeoutDefault), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::NumImages(3)), &mut rng);
        wizard.handle(
            WizardInput::Button(ButtonInput::Quality(Quality::Standard)),
            &mut rng,
        );
        wizard.handle(
            WizardInput::Button(ButtonInput::Ratio(Some(AspectRatio::Square))),
            &mut rng,
        );
        wizard.handle(
            WizardInput::Button(ButtonInput::Style(Some(StylePreset::Realistic))),
            &mut rng,
        );
    }

    fn generated_session(effects: &[Effect]) -> Option<Session> {
        effects.iter().find_map(|effect| match effect {
            Effect::Generate(session) => Some(session.clone()),
            _ => None,
        })
    }

    #[test]
    fn full_walk_produces_a_complete_session() {
        let mut wizard = Wizard::default();
        drive_to_output_type(&mut wizard);
        assert_eq!(wizard.state(), WizardState::AwaitOutputType);

        let effects = wizard.handle(
            WizardInput::Button(ButtonInput::Output(OutputType::Images)),
            &mut rng(),
        );
        let session = generated_session(&effects).expect("generation requested");
        assert_eq!(session.prompt, "a red fox");
        assert_eq!(session.num_images, 3);
        assert_eq!(session.quality, Quality::Standard);
        assert_eq!(session.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(wizard.state(), WizardState::PostGeneration);
    }

    #[test]
    fn prompt_submission_records_history() {
        let mut wizard = Wizard::default();
        let effects = wizard.handle(WizardInput::Text("a red fox".to_string()), &mut rng());
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::RecordPrompt(p) if p == "a red fox")));
    }

    #[test]
    fn invalid_timeout_stays_in_the_same_state() {
        let mut wizard = Wizard::default();
        let mut rng = rng();
        wizard.handle(WizardInput::Text("a red fox".to_string()), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::NegativeSkip), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::TimeoutCustom), &mut rng);
        assert_eq!(wizard.state(), WizardState::AwaitTimeoutValue);

        let effects = wizard.handle(WizardInput::Text("999".to_string()), &mut rng);
        assert_eq!(wizard.state(), WizardState::AwaitTimeoutValue);
        assert!(matches!(effects.as_slice(), [Effect::Notify(_)]));

        wizard.handle(WizardInput::Text("45".to_string()), &mut rng);
        assert_eq!(wizard.state(), WizardState::AwaitNumImages);
    }

    #[test]
    fn cancel_mid_wizard_returns_to_prompt_state() {
        let mut wizard = Wizard::default();
        let mut rng = rng();
        wizard.handle(WizardInput::Text("a red fox".to_string()), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::NegativeAdd), &mut rng);
        wizard.handle(WizardInput::Text("blur".to_string()), &mut rng);

        let effects = wizard.handle(WizardInput::Cancel, &mut rng);
        assert_eq!(wizard.state(), WizardState::AwaitPrompt);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Ask {
                keyboard: Keyboard::PromptIdle,
                ..
            }]
        ));
        // History is store-owned; cancel must not ask to clear it.
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::RecordPrompt(_) | Effect::SaveSettings(_))));
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let mut wizard = Wizard::default();
        let effects = wizard.handle(WizardInput::Cancel, &mut rng());
        assert_eq!(wizard.state(), WizardState::AwaitPrompt);
        assert!(matches!(effects.as_slice(), [Effect::Notify(_)]));
    }

    #[test]
    fn random_ratio_resolves_to_a_concrete_preset() {
        let mut wizard = Wizard::default();
        let mut rng = rng();
        wizard.handle(WizardInput::Text("a red fox".to_string()), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::NegativeSkip), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::TimeoutDefault), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::NumImages(1)), &mut rng);
        wizard.handle(
            WizardInput::Button(ButtonInput::Quality(Quality::High)),
            &mut rng,
        );
        wizard.handle(WizardInput::Button(ButtonInput::Ratio(None)), &mut rng);
        wizard.handle(WizardInput::Button(ButtonInput::Style(None)), &mut rng);
        let effects = wizard.handle(
            WizardInput::Button(ButtonInput::Output(OutputType::Urls)),
            &mut rng,
        );

        let session = generated_session(&effects).expect("generation requested");
        assert!(AspectRatio::ALL.contains(&session.ratio));
        assert!(StylePreset::ALL.contains(&session.style));
    }

    #[test]
    fn regenerate_replays_the_identical_session() {
        let mut wizard = Wizard::default();
        drive_to_output_type(&mut wizard);
        let first = generated_session(&wizard.handle(
            WizardInput::Button(ButtonInput::Output(OutputType::Images)),
            &mut rng(),
        ))
        .unwrap();

        let second = generated_session(
            &wizard.handle(WizardInput::Button(ButtonInput::Regenerate), &mut rng()),
        )
        .unwrap();
        assert_eq!(first, second);
        assert_eq!(wizard.state(), WizardState::PostGeneration);
    }

    #[test]
    fn loading_saved_settings_bypasses_the_wizard() {
        let saved = Session {
            prompt: "a castle".to_string(),
            negative_prompt: "fog".to_string(),
            timeout_seconds: 90,
            num_images: 2,
            quality: Quality::Ultra,
            ratio: AspectRatio::Landscape,
            style: StylePreset::Fantasy,
            output_type: OutputType::Images,
        };
        let mut wizard = Wizard::default();
        let effects = wizard.handle(
            WizardInput::Button(ButtonInput::LoadSaved(saved.clone())),
            &mut rng(),
        );
        assert_eq!(generated_session(&effects), Some(saved));
        assert_eq!(wizard.state(), WizardState::PostGeneration);
    }

    #[test]
    fn save_settings_emits_a_deep_copy_of_the_session() {
        let mut wizard = Wizard::default();
        drive_to_output_type(&mut wizard);
        wizard.handle(
            WizardInput::Button(ButtonInput::Output(OutputType::Images)),
            &mut rng(),
        );

        let effects = wizard.handle(WizardInput::Button(ButtonInput::SaveSettings), &mut rng());
        let saved = effects
            .iter()
            .find_map(|e| match e {
                Effect::SaveSettings(session) => Some(session.clone()),
                _ => None,
            })
            .expect("save requested");

        // Mutating the wizard afterwards must not affect the emitted copy.
        wizard.handle(WizardInput::Text("a different prompt".to_string()), &mut rng());
        assert_eq!(saved.prompt, "a red fox");
    }

    #[test]
    fn button_out_of_order_does_not_transition() {
        let mut wizard = Wizard::default();
        let effects = wizard.handle(
            WizardInput::Button(ButtonInput::Quality(Quality::High)),
            &mut rng(),
        );
        assert_eq!(wizard.state(), WizardState::AwaitPrompt);
        assert!(matches!(effects.as_slice(), [Effect::Notify(_)]));
    }
}
