use anyhow::Result;
use teloxide::prelude::*;
use tracing::{error, info};

use crate::handlers::generation::run_generation;
use crate::handlers::keyboards::{
    build_prompt_idle_keyboard, build_state_keyboard, parse_callback, ParsedCallback,
};
use crate::state::AppState;
use crate::wizard::history::require_saved;
use crate::wizard::machine::{ButtonInput, Effect, Keyboard, WizardInput};
use crate::wizard::WizardError;

/// Free text in a private chat. What it means depends entirely on the
/// user's current wizard state.
pub async fn text_message(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(user) = message.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = message.text() else {
        return Ok(());
    };
    let user_id = i64::try_from(user.id.0).unwrap_or_default();
    drive(
        &bot,
        &state,
        user_id,
        message.chat.id,
        WizardInput::Text(text.to_string()),
    )
    .await
}

pub async fn callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let _ = bot.answer_callback_query(query.id.clone()).await;
    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let Some(parsed) = parse_callback(data) else {
        return Ok(());
    };
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let user_id = i64::try_from(query.from.id.0).unwrap_or_default();

    let input = match parsed {
        ParsedCallback::Cancel => WizardInput::Cancel,
        ParsedCallback::RecentPrompt(index) => {
            let prompts = state.db.recent_prompts(user_id).await?;
            match prompts.get(index) {
                Some(prompt) => WizardInput::Button(ButtonInput::RecentPrompt(prompt.clone())),
                None => {
                    bot.send_message(chat_id, "That prompt is no longer in your history.")
                        .await?;
                    return Ok(());
                }
            }
        }
        ParsedCallback::UseSaved => {
            let doc = state.db.load_user(user_id).await?;
            match require_saved(&doc) {
                Ok(session) => WizardInput::Button(ButtonInput::LoadSaved(session)),
                Err(WizardError::NotFound) => {
                    info!("user {user_id} asked for saved settings but has none");
                    bot.send_message(
                        chat_id,
                        "You have no saved settings yet. Finish a generation and pick \"Save settings\".",
                    )
                    .await?;
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        }
        ParsedCallback::NegativeUseSaved => {
            let saved = state
                .db
                .load_saved_settings(user_id)
                .await?
                .map(|session| session.negative_prompt);
            WizardInput::Button(ButtonInput::NegativeUseSaved(saved))
        }
        ParsedCallback::NegativeAdd => WizardInput::Button(ButtonInput::NegativeAdd),
        ParsedCallback::NegativeSkip => WizardInput::Button(ButtonInput::NegativeSkip),
        ParsedCallback::TimeoutCustom => WizardInput::Button(ButtonInput::TimeoutCustom),
        ParsedCallback::TimeoutDefault => WizardInput::Button(ButtonInput::TimeoutDefault),
        ParsedCallback::NumImages(count) => WizardInput::Button(ButtonInput::NumImages(count)),
        ParsedCallback::Quality(quality) => WizardInput::Button(ButtonInput::Quality(quality)),
        ParsedCallback::Ratio(choice) => WizardInput::Button(ButtonInput::Ratio(choice)),
        ParsedCallback::Style(choice) => WizardInput::Button(ButtonInput::Style(choice)),
        ParsedCallback::Output(output_type) => WizardInput::Button(ButtonInput::Output(output_type)),
        ParsedCallback::Regenerate => WizardInput::Button(ButtonInput::Regenerate),
        ParsedCallback::StartNew => WizardInput::Button(ButtonInput::StartNew),
        ParsedCallback::SaveSettings => WizardInput::Button(ButtonInput::SaveSettings),
        ParsedCallback::Upscale => WizardInput::Button(ButtonInput::Upscale),
    };

    drive(&bot, &state, user_id, chat_id, input).await
}

/// Feeds one event through the user's state machine and executes the
/// requested effects. The per-user slot lock is held for the whole run,
/// including an entire generation batch, so one user's events are strictly
/// serialized while other users proceed concurrently.
pub async fn drive(
    bot: &Bot,
    state: &AppState,
    user_id: i64,
    chat_id: ChatId,
    input: WizardInput,
) -> Result<()> {
    let slot = state.wizard_slot(user_id);
    let mut wizard = slot.lock().await;
    let effects = wizard.handle(input, &mut rand::thread_rng());

    for effect in effects {
        match effect {
            Effect::Ask { text, keyboard } => {
                let markup = match keyboard {
                    Keyboard::PromptIdle => {
                        let doc = state.db.load_user(user_id).await?;
                        build_prompt_idle_keyboard(
                            &doc.recent_prompts,
                            doc.saved_settings.is_some(),
                        )
                    }
                    other => build_state_keyboard(other),
                };
                if markup.inline_keyboard.is_empty() {
                    bot.send_message(chat_id, text).await?;
                } else {
                    bot.send_message(chat_id, text).reply_markup(markup).await?;
                }
            }
            Effect::Notify(text) => {
                bot.send_message(chat_id, text).await?;
            }
            Effect::RecordPrompt(prompt) => {
                state.db.record_prompt(user_id, &prompt).await?;
            }
            Effect::SaveSettings(session) => {
                state.db.save_settings(user_id, &session).await?;
            }
            Effect::Generate(session) => {
                if let Err(err) = run_generation(bot, chat_id, &session).await {
                    error!("generation batch failed: {err}");
                    let _ = bot
                        .send_message(
                            chat_id,
                            "Something went wrong while generating. Try again in a moment.",
                        )
                        .await;
                }
            }
        }
    }

    Ok(())
}
