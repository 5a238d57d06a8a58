use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::wizard::machine::Keyboard;
use crate::wizard::session::{
    AspectRatio, OutputType, Quality, StylePreset, IMAGE_COUNT_OPTIONS,
};

pub const WIZARD_CALLBACK_PREFIX: &str = "wiz_";

const RECENT_PROMPT_CALLBACK_PREFIX: &str = "wiz_prompt:recent:";
const USE_SAVED_CALLBACK: &str = "wiz_prompt:saved";
const NEGATIVE_CALLBACK_PREFIX: &str = "wiz_neg:";
const TIMEOUT_CALLBACK_PREFIX: &str = "wiz_timeout:";
const COUNT_CALLBACK_PREFIX: &str = "wiz_count:";
const QUALITY_CALLBACK_PREFIX: &str = "wiz_quality:";
const RATIO_CALLBACK_PREFIX: &str = "wiz_ratio:";
const STYLE_CALLBACK_PREFIX: &str = "wiz_style:";
const OUTPUT_CALLBACK_PREFIX: &str = "wiz_output:";
const POST_CALLBACK_PREFIX: &str = "wiz_post:";
const CANCEL_CALLBACK: &str = "wiz_cancel";
const RANDOM_TOKEN: &str = "random";

const RECENT_PROMPT_LABEL_LIMIT: usize = 32;

/// Decoded button token. Store-backed payloads (recent prompt text, the
/// saved snapshot) are still indices/markers here; the wizard handler
/// resolves them before the state machine sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCallback {
    Cancel,
    RecentPrompt(usize),
    UseSaved,
    NegativeAdd,
    NegativeSkip,
    NegativeUseSaved,
    TimeoutCustom,
    TimeoutDefault,
    NumImages(u8),
    Quality(Quality),
    Ratio(Option<AspectRatio>),
    Style(Option<StylePreset>),
    Output(OutputType),
    Regenerate,
    StartNew,
    SaveSettings,
    Upscale,
}

pub fn parse_callback(data: &str) -> Option<ParsedCallback> {
    if data == CANCEL_CALLBACK {
        return Some(ParsedCallback::Cancel);
    }
    if data == USE_SAVED_CALLBACK {
        return Some(ParsedCallback::UseSaved);
    }
    if let Some(index) = data.strip_prefix(RECENT_PROMPT_CALLBACK_PREFIX) {
        return index.parse().ok().map(ParsedCallback::RecentPrompt);
    }
    if let Some(choice) = data.strip_prefix(NEGATIVE_CALLBACK_PREFIX) {
        return match choice {
            "add" => Some(ParsedCallback::NegativeAdd),
            "skip" => Some(ParsedCallback::NegativeSkip),
            "saved" => Some(ParsedCallback::NegativeUseSaved),
            _ => None,
        };
    }
    if let Some(choice) = data.strip_prefix(TIMEOUT_CALLBACK_PREFIX) {
        return match choice {
            "custom" => Some(ParsedCallback::TimeoutCustom),
            "default" => Some(ParsedCallback::TimeoutDefault),
            _ => None,
        };
    }
    if let Some(count) = data.strip_prefix(COUNT_CALLBACK_PREFIX) {
        return count
            .parse::<u8>()
            .ok()
            .filter(|c| IMAGE_COUNT_OPTIONS.contains(c))
            .map(ParsedCallback::NumImages);
    }
    if let Some(token) = data.strip_prefix(QUALITY_CALLBACK_PREFIX) {
        return Quality::from_token(token).map(ParsedCallback::Quality);
    }
    if let Some(token) = data.strip_prefix(RATIO_CALLBACK_PREFIX) {
        if token == RANDOM_TOKEN {
            return Some(ParsedCallback::Ratio(None));
        }
        return AspectRatio::from_token(token).map(|r| ParsedCallback::Ratio(Some(r)));
    }
    if let Some(token) = data.strip_prefix(STYLE_CALLBACK_PREFIX) {
        if token == RANDOM_TOKEN {
            return Some(ParsedCallback::Style(None));
        }
        return StylePreset::from_token(token).map(|s| ParsedCallback::Style(Some(s)));
    }
    if let Some(choice) = data.strip_prefix(OUTPUT_CALLBACK_PREFIX) {
        return match choice {
            "images" => Some(ParsedCallback::Output(OutputType::Images)),
            "urls" => Some(ParsedCallback::Output(OutputType::Urls)),
            _ => None,
        };
    }
    if let Some(action) = data.strip_prefix(POST_CALLBACK_PREFIX) {
        return match action {
            "regenerate" => Some(ParsedCallback::Regenerate),
            "new" => Some(ParsedCallback::StartNew),
            "save" => Some(ParsedCallback::SaveSettings),
            "upscale" => Some(ParsedCallback::Upscale),
            _ => None,
        };
    }
    None
}

fn cancel_row() -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback(
        "Cancel",
        CANCEL_CALLBACK.to_string(),
    )]
}

fn truncate_label(text: &str) -> String {
    if text.chars().count() <= RECENT_PROMPT_LABEL_LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(RECENT_PROMPT_LABEL_LIMIT - 1).collect();
    format!("{head}\u{2026}")
}

/// Keyboard for the idle/prompt state: one button per recent prompt plus
/// the saved-settings shortcut. May be empty for a brand-new user.
pub fn build_prompt_idle_keyboard(
    recent_prompts: &[String],
    has_saved: bool,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = recent_prompts
        .iter()
        .enumerate()
        .map(|(index, prompt)| {
            vec![InlineKeyboardButton::callback(
                format!("#{} {}", index + 1, truncate_label(prompt)),
                format!("{RECENT_PROMPT_CALLBACK_PREFIX}{index}"),
            )]
        })
        .collect();
    if has_saved {
        rows.push(vec![InlineKeyboardButton::callback(
            "Use saved settings",
            USE_SAVED_CALLBACK.to_string(),
        )]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Fixed button set for a wizard state. `PromptIdle` is store-dependent
/// and built by `build_prompt_idle_keyboard` instead.
pub fn build_state_keyboard(keyboard: Keyboard) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = match keyboard {
        Keyboard::PromptIdle => Vec::new(),
        Keyboard::NegativeChoice => vec![vec![
            InlineKeyboardButton::callback("Add exclusions", format!("{NEGATIVE_CALLBACK_PREFIX}add")),
            InlineKeyboardButton::callback("Skip", format!("{NEGATIVE_CALLBACK_PREFIX}skip")),
            InlineKeyboardButton::callback("Use saved", format!("{NEGATIVE_CALLBACK_PREFIX}saved")),
        ]],
        Keyboard::TimeoutChoice => vec![vec![
            InlineKeyboardButton::callback("Custom", format!("{TIMEOUT_CALLBACK_PREFIX}custom")),
            InlineKeyboardButton::callback(
                "Default (60s)",
                format!("{TIMEOUT_CALLBACK_PREFIX}default"),
            ),
        ]],
        Keyboard::NumImages => IMAGE_COUNT_OPTIONS
            .iter()
            .map(|count| {
                InlineKeyboardButton::callback(
                    count.to_string(),
                    format!("{COUNT_CALLBACK_PREFIX}{count}"),
                )
            })
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|chunk| chunk.to_vec())
            .collect(),
        Keyboard::Quality => vec![Quality::ALL
            .iter()
            .map(|quality| {
                InlineKeyboardButton::callback(
                    quality.label(),
                    format!("{QUALITY_CALLBACK_PREFIX}{}", quality.token()),
                )
            })
            .collect()],
        Keyboard::Ratio => {
            let mut rows: Vec<Vec<InlineKeyboardButton>> = AspectRatio::ALL
                .iter()
                .map(|ratio| {
                    InlineKeyboardButton::callback(
                        ratio.label(),
                        format!("{RATIO_CALLBACK_PREFIX}{}", ratio.token()),
                    )
                })
                .collect::<Vec<_>>()
                .chunks(2)
                .map(|chunk| chunk.to_vec())
                .collect();
            rows.push(vec![InlineKeyboardButton::callback(
                "Surprise me",
                format!("{RATIO_CALLBACK_PREFIX}{RANDOM_TOKEN}"),
            )]);
            rows
        }
        Keyboard::Style => {
            let mut rows: Vec<Vec<InlineKeyboardButton>> = StylePreset::ALL
                .iter()
                .map(|style| {
                    InlineKeyboardButton::callback(
                        style.label(),
                        format!("{STYLE_CALLBACK_PREFIX}{}", style.token()),
                    )
                })
                .collect::<Vec<_>>()
                .chunks(3)
                .map(|chunk| chunk.to_vec())
                .collect();
            rows.push(vec![InlineKeyboardButton::callback(
                "Surprise me",
                format!("{STYLE_CALLBACK_PREFIX}{RANDOM_TOKEN}"),
            )]);
            rows
        }
        Keyboard::OutputType => vec![vec![
            InlineKeyboardButton::callback("Images", format!("{OUTPUT_CALLBACK_PREFIX}images")),
            InlineKeyboardButton::callback("Links", format!("{OUTPUT_CALLBACK_PREFIX}urls")),
        ]],
        Keyboard::PostGeneration => vec![
            vec![
                InlineKeyboardButton::callback(
                    "Regenerate",
                    format!("{POST_CALLBACK_PREFIX}regenerate"),
                ),
                InlineKeyboardButton::callback("Upscale", format!("{POST_CALLBACK_PREFIX}upscale")),
            ],
            vec![
                InlineKeyboardButton::callback(
                    "Save settings",
                    format!("{POST_CALLBACK_PREFIX}save"),
                ),
                InlineKeyboardButton::callback("Start new", format!("{POST_CALLBACK_PREFIX}new")),
            ],
        ],
    };

    let awaiting = !matches!(keyboard, Keyboard::PromptIdle | Keyboard::PostGeneration);
    if awaiting {
        rows.push(cancel_row());
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn post_generation_keyboard() -> InlineKeyboardMarkup {
    build_state_keyboard(Keyboard::PostGeneration)
}
