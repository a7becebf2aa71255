use std::sync::Arc;

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    prelude::*,
    types::BotCommand,
};

use avio_core::{
    audit::AuditLogger,
    broadcast::BroadcastDialogues,
    config::Config,
    delivery::DeliveryService,
    directory::UserDirectory,
    locale::LocaleStore,
    messaging::{
        port::Transport,
        throttled::{ThrottleConfig, ThrottledTransport},
    },
    registration::RegistrationFlow,
    tasks::TaskRegistry,
    totals::TotalLibrary,
};

use crate::{handlers, TelegramMessenger};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub directory: Arc<dyn UserDirectory>,
    pub locales: Arc<LocaleStore>,
    pub delivery: Arc<DeliveryService>,
    pub totals: Arc<TotalLibrary>,
    pub dialogues: Arc<BroadcastDialogues>,
    pub registration: Arc<RegistrationFlow>,
    pub tasks: Arc<TaskRegistry>,
    pub transport: Arc<dyn Transport>,
    pub audit: Arc<AuditLogger>,
}

/// Commands shown in the operator chat's autocomplete menu.
fn command_menu() -> Vec<BotCommand> {
    vec![
        BotCommand::new("hello", "Check that the bot is alive"),
        BotCommand::new("help", "List available commands"),
        BotCommand::new("send_total", "Send a total to one user (id or @handle)"),
        BotCommand::new("send_series", "Start a timed series of totals"),
        BotCommand::new("send_error", "Send an error notice to one user"),
        BotCommand::new("get_all_users", "Export the user table"),
        BotCommand::new("broadcast", "Broadcast to a country segment"),
        BotCommand::new("clean", "Clear the pending broadcast dialogue"),
        BotCommand::new("tasks", "List running background tasks"),
        BotCommand::new("cancel", "Cancel a task or the pending dialogue"),
    ]
}

pub async fn run_polling(cfg: Arc<Config>, directory: Arc<dyn UserDirectory>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(bot = me.username(), "starting polling"),
        Err(e) => tracing::warn!("get_me failed (continuing): {e}"),
    }
    if let Err(e) = bot.set_my_commands(command_menu()).await {
        tracing::warn!("set_my_commands failed: {e}");
    }

    // Flood control wraps the raw transport; everything above sees one port.
    let raw: Arc<dyn Transport> = Arc::new(TelegramMessenger::new(bot.clone()));
    let transport: Arc<dyn Transport> = Arc::new(ThrottledTransport::new(
        raw,
        ThrottleConfig {
            global_min_interval: cfg.throttle_global_interval,
            per_chat_min_interval: cfg.throttle_per_chat_interval,
        },
    ));

    let locales = Arc::new(LocaleStore::new(cfg.lang_dir.clone()));
    let delivery = Arc::new(DeliveryService::new(
        transport.clone(),
        directory.clone(),
        locales.clone(),
    ));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        directory,
        locales,
        delivery,
        totals: Arc::new(TotalLibrary::new(cfg.total_dir.clone())),
        dialogues: Arc::new(BroadcastDialogues::new()),
        registration: Arc::new(RegistrationFlow::new(cfg.secret_password.clone())),
        tasks: Arc::new(TaskRegistry::new()),
        transport,
        audit: Arc::new(AuditLogger::new(cfg.audit_log_path.clone())),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
