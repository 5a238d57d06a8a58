use anyhow::Result;
use teloxide::prelude::*;

use crate::handlers::keyboards::build_prompt_idle_keyboard;
use crate::handlers::wizard::drive;
use crate::state::AppState;
use crate::wizard::machine::WizardInput;
use crate::wizard::session::target_dimensions;

const HELP_TEXT: &str = "I turn prompts into images, step by step:\n\n\
1. Send me a prompt (or pick a recent one).\n\
2. Optionally add things to exclude.\n\
3. Pick timeout, image count, quality, aspect ratio and style.\n\
4. Choose delivery as photos or direct links.\n\n\
Commands:\n\
/start - show the start screen\n\
/help - this message\n\
/cancel - abandon the current wizard (your history is kept)\n\
/settings - show your saved settings\n\n\
After a batch you can regenerate with the exact same parameters, save them \
for one-tap reuse, or start over.";

pub async fn start_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let user_id = message
        .from
        .as_ref()
        .and_then(|user| i64::try_from(user.id.0).ok())
        .unwrap_or_default();
    let doc = state.db.load_user(user_id).await?;

    let greeting = "Hi! Describe the image you want and I'll walk you through the rest.";
    let markup = build_prompt_idle_keyboard(&doc.recent_prompts, doc.saved_settings.is_some());
    if markup.inline_keyboard.is_empty() {
        bot.send_message(message.chat.id, greeting).await?;
    } else {
        bot.send_message(message.chat.id, greeting)
            .reply_markup(markup)
            .await?;
    }
    Ok(())
}

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(message.chat.id, HELP_TEXT).await?;
    Ok(())
}

pub async fn cancel_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let user_id = message
        .from
        .as_ref()
        .and_then(|user| i64::try_from(user.id.0).ok())
        .unwrap_or_default();
    drive(&bot, &state, user_id, message.chat.id, WizardInput::Cancel).await
}

pub async fn settings_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let user_id = message
        .from
        .as_ref()
        .and_then(|user| i64::try_from(user.id.0).ok())
        .unwrap_or_default();

    let doc = state.db.load_user(user_id).await?;
    let Some(session) = doc.saved_settings else {
        bot.send_message(
            message.chat.id,
            "No saved settings yet. Finish a generation and pick \"Save settings\".",
        )
        .await?;
        return Ok(());
    };

    let (width, height) = target_dimensions(session.quality, session.ratio);
    let negative = if session.negative_prompt.is_empty() {
        "(none)".to_string()
    } else {
        session.negative_prompt.clone()
    };
    let summary = format!(
        "Saved settings:\n\
         Prompt: {}\n\
         Exclusions: {}\n\
         Images: {}\n\
         Quality: {} ({width}\u{d7}{height})\n\
         Ratio: {}\n\
         Style: {}\n\
         Timeout: {}s\n\
         Delivery: {}",
        session.prompt,
        negative,
        session.num_images,
        session.quality.label(),
        session.ratio.label(),
        session.style.label(),
        session.timeout_seconds,
        session.output_type.label(),
    );
    let summary = match doc.saved_at {
        Some(saved_at) => format!("{summary}\nSaved: {}", saved_at.format("%Y-%m-%d %H:%M UTC")),
        None => summary,
    };
    bot.send_message(message.chat.id, summary).await?;
    Ok(())
}
