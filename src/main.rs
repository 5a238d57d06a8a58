use std::error::Error;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

mod config;
mod db;
mod gen;
mod handlers;
mod state;
mod utils;
mod wizard;

use config::CONFIG;
use db::database::Database;
use handlers::keyboards::WIZARD_CALLBACK_PREFIX;
use state::AppState;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
    Help,
    Cancel,
    Settings,
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging();

    let bot = Bot::new(CONFIG.bot_token.clone());
    info!("Starting TelegramImageWizardBot");

    let db = Database::init(&CONFIG.database_url).await?;
    db.health_check().await?;
    let state = AppState::new(db);

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_wizard_text),
        )
        .endpoint(ignore_message);

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback_query);

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    let result = match command {
        Command::Start => handlers::commands::start_handler(bot, state, message).await,
        Command::Help => handlers::commands::help_handler(bot, message).await,
        Command::Cancel => handlers::commands::cancel_handler(bot, state, message).await,
        Command::Settings => handlers::commands::settings_handler(bot, state, message).await,
    };
    if let Err(err) = result {
        error!("command handler failed: {err}");
    }
    Ok(())
}

async fn handle_wizard_text(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    if let Some(text) = message.text() {
        // Unknown slash commands fall through to here; they are not prompts.
        if text.trim_start().starts_with('/') {
            return Ok(());
        }
    }
    if let Err(err) = handlers::wizard::text_message(bot, state, message).await {
        error!("wizard text handler failed: {err}");
    }
    Ok(())
}

async fn handle_callback_query(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    if !data.starts_with(WIZARD_CALLBACK_PREFIX) {
        return Ok(());
    }
    if let Err(err) = handlers::wizard::callback(bot, state, query).await {
        error!("wizard callback handler failed: {err}");
    }
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}
