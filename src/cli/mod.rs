//! Command-line interface for brewbot.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use crate::adapters::telegram::{TelegramClient, Update, User};
use crate::adapters::ChatApi;
use crate::config;
use crate::core::{Actor, CallbackEvent, OrderFlow, Pricing, TextEvent};
use crate::domain::{ChatId, MessageId, ThreadKey, UpdateId, UserId};
use crate::ledger::{Ledger, SheetsLedger};
use crate::menu::load_menu;

/// How long one getUpdates call may wait for new updates.
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "brewbot", about = "Telegram coffee-order bot", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot: long-poll updates and take orders
    Serve,

    /// Print the resolved menu and exit
    Menu,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Command::Serve => serve().await,
            Command::Menu => show_menu().await,
        }
    }
}

async fn show_menu() -> Result<()> {
    let cfg = config::config()?;
    let menu = load_menu(cfg.menu_url.as_deref(), cfg.request_timeout).await;

    for item in &menu {
        let milk = if item.milk_eligible { " (milk choice)" } else { "" };
        println!("{:<20} {:>6.2}{}", item.name, item.price, milk);
    }

    Ok(())
}

async fn serve() -> Result<()> {
    let cfg = config::config()?;
    if cfg.bot_token.is_empty() {
        anyhow::bail!("No bot token configured (BREWBOT_TOKEN or .brewbot/config.yaml)");
    }

    let client = TelegramClient::new(cfg.bot_token.clone(), cfg.request_timeout)
        .context("Failed to build Telegram client")?;
    let ledger = SheetsLedger::new(
        cfg.ledger_endpoint.clone(),
        cfg.spreadsheet_id.clone(),
        cfg.ledger_tab.clone(),
        cfg.sheet_gid,
        cfg.ledger_token.clone(),
        cfg.request_timeout,
    )
    .map_err(|e| anyhow::anyhow!("Failed to build ledger client: {}", e))?;

    let menu = load_menu(cfg.menu_url.as_deref(), cfg.request_timeout).await;
    info!(items = menu.len(), "menu loaded");

    let pricing = Pricing {
        milk_upcharge: cfg.milk_upcharge,
        cup_discount: cfg.cup_discount,
    };
    let poll_client = TelegramClient::new(cfg.bot_token.clone(), cfg.request_timeout)
        .context("Failed to build Telegram client")?;
    let mut flow = OrderFlow::new(
        client,
        ledger,
        menu,
        pricing,
        cfg.dedup_capacity,
        cfg.gate_capacity,
    );

    info!("brewbot serving");
    let mut offset: i64 = 0;

    loop {
        let updates = match poll_client.get_updates(offset, POLL_TIMEOUT).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed");
                tokio::time::sleep(Duration::from_secs(2)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Err(e) = dispatch(&mut flow, update).await {
                // surfaced to the actor where it matters, never fatal here
                warn!(error = %e, "update handling failed");
            }
        }
    }
}

async fn dispatch<C: ChatApi, L: Ledger>(
    flow: &mut OrderFlow<C, L>,
    update: Update,
) -> Result<()> {
    let update_id = UpdateId(update.update_id);
    if !flow.admit(update_id) {
        return Ok(());
    }

    if let Some(cb) = update.callback_query {
        // A callback without its message has no card to act on.
        let Some(message) = cb.message else {
            debug!("callback without originating message");
            return Ok(());
        };

        let event = CallbackEvent {
            update: update_id,
            callback_id: cb.id,
            thread: ThreadKey {
                chat: ChatId(message.chat.id),
                message: MessageId(message.message_id),
            },
            actor: actor_from(&cb.from),
            data: cb.data.unwrap_or_default(),
        };
        return flow.handle_callback(event).await;
    }

    if let Some(message) = update.message {
        let chat = ChatId(message.chat.id);
        let Some(from) = message.from else {
            return Ok(());
        };
        let Some(text) = message.text else {
            return Ok(());
        };

        match text.trim() {
            "/start" | "/menu" | "/order" => {
                flow.offer_menu(chat).await?;
            }
            "/undo" => {
                flow.handle_undo(chat, UserId(from.id)).await?;
            }
            _ => {
                let event = TextEvent {
                    update: update_id,
                    chat,
                    message: MessageId(message.message_id),
                    actor: actor_from(&from),
                    text,
                };
                if !flow.handle_text(event).await? {
                    debug!("message not part of an order flow");
                }
            }
        }
    }

    Ok(())
}

fn actor_from(user: &User) -> Actor {
    Actor {
        id: UserId(user.id),
        handle: user.username.clone().unwrap_or_default(),
        display_name: user.display_name(),
    }
}
