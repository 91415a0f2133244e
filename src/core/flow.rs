//! The conversational order flow.
//!
//! Per card (one message in one chat) the conversation moves through:
//! item grid -> milk prompt (milk-eligible items only, gated to fire once)
//! -> cup prompt -> quantity entry -> confirm -> saved, with cancel
//! reverting the card to the grid and re-arming the milk gate.
//!
//! The flow talks to the chat surface through [`ChatApi`] and to the order
//! store through [`Ledger`]; both are injected so tests run against mocks.
//! All mutable state is process-local and updated synchronously within one
//! invocation; nothing is held across an external call.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{Button, ChatApi, InlineKeyboard};
use crate::domain::{
    round2, Action, ChatId, MessageId, Order, PendingKey, PromptKey, SessionKey, ThreadKey,
    UpdateId, UserId,
};
use crate::ledger::{Ledger, UndoBook};
use crate::menu::MenuItem;

use super::recency::{OnceGate, RecencySet};
use super::session::{KeyedStore, MemoryStore};

const QTY_MIN: u32 = 1;
const QTY_MAX: u32 = 10;

const GRID_TEXT: &str = "What can I get you?";

/// Price adjustments for the two modifiers.
#[derive(Debug, Clone, Copy)]
pub struct Pricing {
    pub milk_upcharge: f64,
    pub cup_discount: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            milk_upcharge: 0.50,
            cup_discount: 0.50,
        }
    }
}

impl Pricing {
    /// Unit price after modifiers, rounded to two decimals.
    pub fn unit_price(&self, base: f64, milk: bool, cup: bool) -> f64 {
        let milk_part = if milk { self.milk_upcharge } else { 0.0 };
        let cup_part = if cup { self.cup_discount } else { 0.0 };
        round2(base + milk_part - cup_part)
    }
}

/// The actor behind one inbound event.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: UserId,
    /// Username, empty if the actor has none
    pub handle: String,
    pub display_name: String,
}

/// A button press on an order card.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub update: UpdateId,
    pub callback_id: String,
    pub thread: ThreadKey,
    pub actor: Actor,
    /// Raw callback payload, decoded once into an [`Action`]
    pub data: String,
}

/// A free-text message (candidate quantity entry).
#[derive(Debug, Clone)]
pub struct TextEvent {
    pub update: UpdateId,
    pub chat: ChatId,
    pub message: MessageId,
    pub actor: Actor,
    pub text: String,
}

/// A fully-specified order awaiting confirmation, keyed by card.
#[derive(Debug, Clone)]
struct Draft {
    item: usize,
    label: String,
    unit_price: f64,
    quantity: u32,
    total: f64,
    milk: bool,
    cup: bool,
}

/// The order flow state machine.
pub struct OrderFlow<C, L> {
    chat: C,
    ledger: L,
    menu: Vec<MenuItem>,
    pricing: Pricing,
    dedup: RecencySet<UpdateId>,
    prompt_gate: OnceGate<PromptKey>,
    /// Armed quantity prompts, one per actor session
    pending: MemoryStore<SessionKey, PendingKey>,
    /// Confirmed-price drafts, one per card
    drafts: MemoryStore<ThreadKey, Draft>,
    undo: UndoBook,
}

impl<C: ChatApi, L: Ledger> OrderFlow<C, L> {
    pub fn new(
        chat: C,
        ledger: L,
        menu: Vec<MenuItem>,
        pricing: Pricing,
        dedup_capacity: usize,
        gate_capacity: usize,
    ) -> Self {
        Self {
            chat,
            ledger,
            menu,
            pricing,
            dedup: RecencySet::new(dedup_capacity),
            prompt_gate: OnceGate::new(gate_capacity),
            pending: MemoryStore::new(),
            drafts: MemoryStore::new(),
            undo: UndoBook::new(),
        }
    }

    pub fn menu(&self) -> &[MenuItem] {
        &self.menu
    }

    /// Admit one inbound update. Call once per delivery before dispatching;
    /// false means this is a re-delivery and must be dropped.
    pub fn admit(&mut self, update: UpdateId) -> bool {
        let fresh = self.dedup.admit(update);
        if !fresh {
            debug!(%update, "duplicate update dropped");
        }
        fresh
    }

    /// Send a fresh order card with the item grid.
    pub async fn offer_menu(&self, chat: ChatId) -> Result<MessageId> {
        self.chat
            .send_message(chat, GRID_TEXT, Some(&self.grid_keyboard()))
            .await
    }

    /// Handle a button press on an order card.
    #[instrument(skip(self, event), fields(update = %event.update, chat = %event.thread.chat))]
    pub async fn handle_callback(&mut self, event: CallbackEvent) -> Result<()> {
        let Some(action) = Action::parse(&event.data) else {
            debug!(data = %event.data, "unparseable callback payload");
            return self.chat.answer_callback(&event.callback_id, None).await;
        };

        // The card may predate a menu reload; a stale index gets a neutral
        // acknowledgment and no state change.
        let idx = action_item(&action);
        let Some(item) = self.menu.get(idx).cloned() else {
            debug!(idx, "callback references item outside menu bounds");
            return self.chat.answer_callback(&event.callback_id, None).await;
        };

        match action {
            Action::SelectItem { item: idx } => {
                self.on_select(&event, idx, &item).await?;
            }
            Action::MilkChoice { item: idx, milk } => {
                self.show_cup_prompt(event.thread, idx, milk).await?;
            }
            Action::CupChoice {
                item: idx,
                milk,
                cup,
            } => {
                self.arm_quantity(&event, idx, &item, milk, cup).await?;
            }
            Action::Confirm {
                item: idx,
                milk,
                cup,
            } => {
                return self.on_confirm(&event, idx, milk, cup).await;
            }
            Action::Cancel { item: idx } => {
                self.on_cancel(&event, idx).await?;
            }
        }

        self.chat.answer_callback(&event.callback_id, None).await
    }

    /// Handle a free-text message. Returns false when no quantity prompt is
    /// armed for the actor, meaning the message is not part of this flow.
    #[instrument(skip(self, event), fields(update = %event.update, chat = %event.chat))]
    pub async fn handle_text(&mut self, event: TextEvent) -> Result<bool> {
        let session = SessionKey {
            chat: event.chat,
            user: event.actor.id,
        };
        let Some(pending) = self.pending.get(&session).copied() else {
            return Ok(false);
        };

        let Some(qty) = parse_quantity(&event.text) else {
            self.chat
                .send_message(
                    event.chat,
                    &format!(
                        "Please send a whole number between {} and {}.",
                        QTY_MIN, QTY_MAX
                    ),
                    None,
                )
                .await?;
            return Ok(true);
        };

        let Some(item) = self.menu.get(pending.item).cloned() else {
            // the menu shrank under an armed prompt; disarm and drop it
            debug!(idx = pending.item, "armed prompt no longer within menu");
            self.pending.delete(&session);
            return Ok(true);
        };

        let unit = self.pricing.unit_price(item.price, pending.milk, pending.cup);
        let total = round2(unit * qty as f64);
        let label = item_label(&item.name, pending.milk, pending.cup);

        self.pending.delete(&session);
        self.drafts.set(
            pending.thread,
            Draft {
                item: pending.item,
                label: label.clone(),
                unit_price: unit,
                quantity: qty,
                total,
                milk: pending.milk,
                cup: pending.cup,
            },
        );

        let text = format!("{} x {}\nUnit {:.2}, total {:.2}", qty, label, unit, total);
        let keyboard = InlineKeyboard::row(vec![
            Button::new(
                "Confirm",
                Action::Confirm {
                    item: pending.item,
                    milk: pending.milk,
                    cup: pending.cup,
                },
            ),
            Button::new("Cancel", Action::Cancel { item: pending.item }),
        ]);
        self.chat
            .edit_message(
                pending.thread.chat,
                pending.thread.message,
                &text,
                Some(&keyboard),
            )
            .await?;

        Ok(true)
    }

    /// Undo the actor's last committed order, if any.
    #[instrument(skip(self), fields(%chat, %user))]
    pub async fn handle_undo(&mut self, chat: ChatId, user: UserId) -> Result<()> {
        let session = SessionKey { chat, user };

        let Some(entry) = self.undo.peek(&session).cloned() else {
            // a normal outcome, not an error
            self.chat
                .send_message(chat, "Nothing to undo.", None)
                .await?;
            return Ok(());
        };

        match self.ledger.delete_row(entry.row).await {
            Ok(()) => {
                self.undo.clear(&session);
                info!(row = %entry.row, "order removed from ledger");
                let text = match &entry.summary {
                    Some(summary) => format!("Removed: {}", summary),
                    None => "Your last order was removed.".to_string(),
                };
                self.chat.send_message(chat, &text, None).await?;
            }
            Err(e) => {
                // pointer kept, the actor can retry
                warn!(error = %e, row = %entry.row, "ledger undo failed");
                self.chat
                    .send_message(chat, "Couldn't undo your order. Try again.", None)
                    .await?;
            }
        }

        Ok(())
    }

    async fn on_select(&mut self, event: &CallbackEvent, idx: usize, item: &MenuItem) -> Result<()> {
        if !item.milk_eligible {
            return self.show_cup_prompt(event.thread, idx, false).await;
        }

        let key = PromptKey {
            thread: event.thread,
            item: idx,
        };
        if !self.prompt_gate.fire_once(key) {
            // double-tap: the milk keyboard is already up
            debug!(idx, "milk prompt already fired for this card");
            return Ok(());
        }

        let keyboard = InlineKeyboard::row(vec![
            Button::new(
                format!("Oat milk (+{:.2})", self.pricing.milk_upcharge),
                Action::MilkChoice {
                    item: idx,
                    milk: true,
                },
            ),
            Button::new(
                "Regular milk",
                Action::MilkChoice {
                    item: idx,
                    milk: false,
                },
            ),
        ]);
        self.chat
            .edit_keyboard(event.thread.chat, event.thread.message, Some(&keyboard))
            .await
    }

    async fn show_cup_prompt(&self, thread: ThreadKey, idx: usize, milk: bool) -> Result<()> {
        let keyboard = InlineKeyboard::row(vec![
            Button::new(
                format!("Own cup (-{:.2})", self.pricing.cup_discount),
                Action::CupChoice {
                    item: idx,
                    milk,
                    cup: true,
                },
            ),
            Button::new(
                "No own cup",
                Action::CupChoice {
                    item: idx,
                    milk,
                    cup: false,
                },
            ),
        ]);
        self.chat
            .edit_keyboard(thread.chat, thread.message, Some(&keyboard))
            .await
    }

    async fn arm_quantity(
        &mut self,
        event: &CallbackEvent,
        idx: usize,
        item: &MenuItem,
        milk: bool,
        cup: bool,
    ) -> Result<()> {
        let session = SessionKey {
            chat: event.thread.chat,
            user: event.actor.id,
        };
        self.pending.set(
            session,
            PendingKey {
                thread: event.thread,
                item: idx,
                milk,
                cup,
            },
        );

        self.chat
            .edit_message(
                event.thread.chat,
                event.thread.message,
                &format!(
                    "{}: how many? Send a number ({}-{}).",
                    item.name, QTY_MIN, QTY_MAX
                ),
                None,
            )
            .await
    }

    async fn on_confirm(
        &mut self,
        event: &CallbackEvent,
        idx: usize,
        milk: bool,
        cup: bool,
    ) -> Result<()> {
        // No draft means the card was already saved or cancelled, or the
        // token predates a menu reload.
        let draft = match self.drafts.get(&event.thread) {
            Some(d) if d.item == idx && d.milk == milk && d.cup == cup => d.clone(),
            _ => {
                debug!(idx, "confirm without a matching draft");
                return self.chat.answer_callback(&event.callback_id, None).await;
            }
        };

        let order = Order {
            timestamp: Utc::now(),
            chat: event.thread.chat,
            user: event.actor.id,
            handle: event.actor.handle.clone(),
            display_name: event.actor.display_name.clone(),
            item_label: draft.label,
            unit_price: draft.unit_price,
            quantity: draft.quantity,
            total: draft.total,
            milk: draft.milk,
            message: event.thread.message,
            update: event.update,
        };

        // Update-id dedup is the only guard here: a second distinct confirm
        // event for this card before the edit lands appends a second order.
        match self.ledger.append(&order).await {
            Ok(row) => {
                let session = SessionKey {
                    chat: event.thread.chat,
                    user: event.actor.id,
                };
                self.undo.record(session, row, order.summary());
                self.drafts.delete(&event.thread);
                info!(%row, total = order.total, "order saved");

                self.chat
                    .edit_message(
                        event.thread.chat,
                        event.thread.message,
                        &format!("Saved: {}", order.summary()),
                        None,
                    )
                    .await?;
                self.chat
                    .answer_callback(&event.callback_id, Some("Saved"))
                    .await
            }
            Err(e) => {
                // Keyboard untouched, so Confirm stays live for a retry.
                warn!(error = %e, "ledger append failed");
                self.chat
                    .answer_callback(&event.callback_id, Some("Couldn't save, try again"))
                    .await?;
                self.chat
                    .send_message(
                        event.thread.chat,
                        "Couldn't save your order. Tap Confirm to try again.",
                        None,
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn on_cancel(&mut self, event: &CallbackEvent, idx: usize) -> Result<()> {
        self.prompt_gate.reset(&PromptKey {
            thread: event.thread,
            item: idx,
        });
        self.drafts.delete(&event.thread);

        // disarm the quantity prompt if it was for this card
        let session = SessionKey {
            chat: event.thread.chat,
            user: event.actor.id,
        };
        let armed_here = self
            .pending
            .get(&session)
            .map_or(false, |p| p.thread == event.thread);
        if armed_here {
            self.pending.delete(&session);
        }

        self.chat
            .edit_message(
                event.thread.chat,
                event.thread.message,
                GRID_TEXT,
                Some(&self.grid_keyboard()),
            )
            .await
    }

    fn grid_keyboard(&self) -> InlineKeyboard {
        InlineKeyboard::rows(
            self.menu
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    Button::new(
                        format!("{} — {:.2}", item.name, item.price),
                        Action::SelectItem { item: i },
                    )
                })
                .collect(),
        )
    }
}

fn action_item(action: &Action) -> usize {
    match *action {
        Action::SelectItem { item }
        | Action::MilkChoice { item, .. }
        | Action::CupChoice { item, .. }
        | Action::Confirm { item, .. }
        | Action::Cancel { item } => item,
    }
}

/// A quantity must be a plain string of decimal digits in [QTY_MIN, QTY_MAX].
fn parse_quantity(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let qty: u32 = text.parse().ok()?;
    (QTY_MIN..=QTY_MAX).contains(&qty).then_some(qty)
}

fn item_label(name: &str, milk: bool, cup: bool) -> String {
    let mut label = name.to_string();
    if milk {
        label.push_str(", oat milk");
    }
    if cup {
        label.push_str(", own cup");
    }
    label
}
