use std::{future::Future, sync::Arc, time::Duration};

use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
};

use imgbot_core::{
    bot::BotContext,
    config::Config,
    generation::Prompter,
    messaging::port::MessagingPort,
    ports::{ImageFetcher, ImageGenerator},
    settings::SessionSettings,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<BotContext>,
}

fn build_bot(cfg: &Config) -> Bot {
    let bot = Bot::new(cfg.bot_token.clone());
    let Some(url_str) = cfg.telegram_api_url.as_deref() else {
        return bot;
    };
    match reqwest::Url::parse(url_str) {
        Ok(url) => bot.set_api_url(url),
        Err(e) => {
            tracing::error!(error = %e, url = %url_str, "invalid TELEGRAM_API_URL, using default");
            bot
        }
    }
}

fn username_matches(configured: &str, actual: &str) -> bool {
    configured.trim_start_matches('@').eq_ignore_ascii_case(actual)
}

pub fn build_context(
    cfg: &Config,
    messenger: Arc<dyn MessagingPort>,
    generator: Arc<dyn ImageGenerator>,
    fetcher: Arc<dyn ImageFetcher>,
) -> imgbot_core::Result<BotContext> {
    Ok(BotContext {
        bot_username: cfg.bot_username.clone(),
        settings: SessionSettings::new(cfg.initial_settings()),
        prompter: Prompter::new(cfg.trigger_words()?, generator),
        fetcher,
        messenger,
        delivery: cfg.delivery_options(),
    })
}

pub async fn run_polling(
    cfg: Arc<Config>,
    generator: Arc<dyn ImageGenerator>,
    fetcher: Arc<dyn ImageFetcher>,
) -> anyhow::Result<()> {
    let bot = build_bot(&cfg);

    match bot.get_me().await {
        Ok(me) => {
            let actual = me.user.username.clone().unwrap_or_default();
            if !username_matches(&cfg.bot_username, &actual) {
                tracing::warn!(
                    configured = %cfg.bot_username,
                    actual = %actual,
                    "BOT_USERNAME does not match the token's bot; addressed commands may be ignored"
                );
            }
            tracing::info!(username = %actual, "bot started");
        }
        Err(e) => tracing::warn!(error = %e, "get_me failed, continuing"),
    }
    tracing::info!(
        endpoint = %cfg.fal_model_endpoint,
        lora = %cfg.lora_path(),
        size = %cfg.default_image_size,
        count = cfg.default_image_count,
        "generation defaults"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let ctx = build_context(&cfg, messenger, generator, fetcher)?;

    let state = Arc::new(AppState { ctx: Arc::new(ctx) });

    let handler = Update::filter_message().endpoint(handlers::handle_message);

    // SIGINT is handled by teloxide; SIGTERM (container/systemd stop) is wired up here.
    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();
    tokio::spawn(stop_on(terminate_signal(), dispatcher.shutdown_token()));

    dispatcher.dispatch().await;

    tracing::info!("bot stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
            tracing::info!("received SIGTERM, stopping");
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

/// Wait for `signal`, then stop the dispatcher and let in-flight handlers finish.
async fn stop_on(signal: impl Future<Output = ()>, token: ShutdownToken) {
    const STARTUP_RETRIES: usize = 50;

    signal.await;
    // The token refuses to stop a dispatcher that has not started polling yet.
    for _ in 0..STARTUP_RETRIES {
        match token.shutdown() {
            Ok(done) => {
                done.await;
                return;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    tracing::warn!("dispatcher never started, nothing to stop");
}
