use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, InputMedia, InputMediaPhoto};
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::gen::client::{build_image_url, fetch_image, FetchError};
use crate::gen::runner::{attempt_prompt, collect_batch, progress_text, BatchOutcome, Generated};
use crate::handlers::keyboards::post_generation_keyboard;
use crate::utils::telegram::{edit_message_text_with_retry, start_chat_action_heartbeat};
use crate::wizard::session::{target_dimensions, OutputType, Session};

const CAPTION_LIMIT: usize = 1000;

/// Runs the full batch for a populated session: one sequential attempt per
/// requested image, progress edits on a status message, inline failure
/// notices, then delivery of whatever succeeded. Never aborts early; a
/// fully failed batch still ends in a normal completion message.
pub async fn run_generation(bot: &Bot, chat_id: ChatId, session: &Session) -> Result<()> {
    let (width, height) = target_dimensions(session.quality, session.ratio);
    info!(
        "starting generation batch: {} image(s) at {width}x{height}, timeout {}s",
        session.num_images, session.timeout_seconds
    );

    let status = bot
        .send_message(chat_id, progress_text(1, session.num_images))
        .await?;
    let _heartbeat =
        start_chat_action_heartbeat(bot.clone(), chat_id, ChatAction::UploadPhoto);

    let outcome = collect_batch(session.num_images, |index| {
        let bot = bot.clone();
        let session = session.clone();
        let status_id = status.id;
        async move {
            if index > 1 {
                // Edit failures are transport noise, never batch failures.
                if let Err(err) = edit_message_text_with_retry(
                    &bot,
                    chat_id,
                    status_id,
                    &progress_text(index, session.num_images),
                )
                .await
                {
                    warn!("progress edit failed: {err}");
                }
            }

            let result = fetch_attempt(&session, index, width, height).await;
            if let Err(err) = &result {
                let _ = bot
                    .send_message(chat_id, format!("Image {index} failed: {err}"))
                    .await;
            }
            result
        }
    })
    .await;

    deliver(bot, chat_id, session, &outcome).await;

    let summary = if outcome.all_failed() {
        "No images could be generated. Try again, or start over with a different prompt."
            .to_string()
    } else {
        format!(
            "Done: {}/{} generated. What next?",
            outcome.items.len(),
            outcome.attempts
        )
    };
    let final_message = bot
        .edit_message_text(chat_id, status.id, summary.clone())
        .reply_markup(post_generation_keyboard())
        .await;
    if let Err(err) = final_message {
        warn!("final status edit failed, sending a new message: {err}");
        bot.send_message(chat_id, summary)
            .reply_markup(post_generation_keyboard())
            .await?;
    }

    Ok(())
}

async fn fetch_attempt(
    session: &Session,
    index: u8,
    width: u32,
    height: u32,
) -> Result<Generated, FetchError> {
    let prompt = attempt_prompt(session, index);
    let url = build_image_url(&CONFIG.image_api_base_url, &prompt, width, height)?;
    let url_text = url.to_string();
    let bytes = fetch_image(url, session.timeout_seconds).await?;
    Ok(Generated {
        bytes,
        url: url_text,
    })
}

async fn deliver(bot: &Bot, chat_id: ChatId, session: &Session, outcome: &BatchOutcome) {
    if outcome.all_failed() {
        return;
    }

    match session.output_type {
        OutputType::Images => {
            let media: Vec<InputMedia> = outcome
                .items
                .iter()
                .enumerate()
                .map(|(index, generated)| {
                    let mut photo = InputMediaPhoto::new(InputFile::memory(generated.bytes.clone()));
                    if index == 0 {
                        photo = photo.caption(truncate_caption(&session.prompt));
                    }
                    InputMedia::Photo(photo)
                })
                .collect();
            if let Err(err) = bot.send_media_group(chat_id, media).await {
                warn!("media group delivery failed: {err}");
                let _ = bot
                    .send_message(chat_id, "The images were generated but could not be delivered.")
                    .await;
            }
        }
        OutputType::Urls => {
            let links = outcome
                .items
                .iter()
                .map(|generated| generated.url.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            if let Err(err) = bot.send_message(chat_id, links).await {
                warn!("url list delivery failed: {err}");
            }
        }
    }
}

fn truncate_caption(prompt: &str) -> String {
    if prompt.chars().count() <= CAPTION_LIMIT {
        return prompt.to_string();
    }
    prompt.chars().take(CAPTION_LIMIT).collect()
}
