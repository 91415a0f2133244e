//! Ledger Append & Undo Integration Tests
//!
//! Covers pointer capture on append, pointer overwrite, undo row deletion,
//! and the failure paths around both.

mod common;

use brewbot::core::{Actor, CallbackEvent, OrderFlow, Pricing, TextEvent};
use brewbot::domain::{ChatId, MessageId, ThreadKey, UpdateId, UserId};
use brewbot::{MenuItem, RowPointer};

use common::{ChatCall, MockChat, MockLedger};

fn menu() -> Vec<MenuItem> {
    vec![MenuItem {
        name: "Latte".to_string(),
        price: 3.00,
        milk_eligible: true,
    }]
}

fn build_flow() -> (OrderFlow<MockChat, MockLedger>, MockChat, MockLedger) {
    let chat = MockChat::new();
    let ledger = MockLedger::new();
    let flow = OrderFlow::new(
        chat.clone(),
        ledger.clone(),
        menu(),
        Pricing::default(),
        1000,
        1000,
    );
    (flow, chat, ledger)
}

fn actor() -> Actor {
    Actor {
        id: UserId(7),
        handle: "ada".to_string(),
        display_name: "Ada".to_string(),
    }
}

fn callback(update: i64, card: i64, data: &str) -> CallbackEvent {
    CallbackEvent {
        update: UpdateId(update),
        callback_id: format!("cb{}", update),
        thread: ThreadKey {
            chat: ChatId(100),
            message: MessageId(card),
        },
        actor: actor(),
        data: data.to_string(),
    }
}

/// Walk one card through select -> milk -> cup -> quantity, leaving it on the
/// confirm prompt. Updates are allocated from `base`.
async fn reach_confirm(flow: &mut OrderFlow<MockChat, MockLedger>, base: i64, card: i64, qty: &str) {
    flow.handle_callback(callback(base, card, "D|0")).await.unwrap();
    flow.handle_callback(callback(base + 1, card, "C|0|1"))
        .await
        .unwrap();
    flow.handle_callback(callback(base + 2, card, "B|0|1|0"))
        .await
        .unwrap();
    let handled = flow
        .handle_text(TextEvent {
            update: UpdateId(base + 3),
            chat: ChatId(100),
            message: MessageId(card + 1),
            actor: actor(),
            text: qty.to_string(),
        })
        .await
        .unwrap();
    assert!(handled);
}

#[tokio::test]
async fn test_undo_with_no_prior_order() {
    let (mut flow, chat, ledger) = build_flow();

    flow.handle_undo(ChatId(100), UserId(7)).await.unwrap();

    // a normal outcome with its own message, and no store mutation
    assert_eq!(chat.sent_texts(), vec!["Nothing to undo.".to_string()]);
    assert!(ledger.deletes().is_empty());
}

#[tokio::test]
async fn test_append_then_undo_then_nothing() {
    let (mut flow, chat, ledger) = build_flow();

    reach_confirm(&mut flow, 1, 10, "2").await;
    flow.handle_callback(callback(5, 10, "Y|0|1|0")).await.unwrap();
    assert_eq!(ledger.rows().len(), 1);

    chat.clear();
    flow.handle_undo(ChatId(100), UserId(7)).await.unwrap();

    assert_eq!(ledger.deletes(), vec![RowPointer(1)]);
    assert!(ledger.rows().is_empty());
    let texts = chat.sent_texts();
    assert_eq!(texts.len(), 1);
    // human-readable description of what was removed
    assert!(texts[0].starts_with("Removed:"), "got: {}", texts[0]);
    assert!(texts[0].contains("Latte, oat milk"), "got: {}", texts[0]);

    // the pointer was consumed
    chat.clear();
    flow.handle_undo(ChatId(100), UserId(7)).await.unwrap();
    assert_eq!(chat.sent_texts(), vec!["Nothing to undo.".to_string()]);
    assert_eq!(ledger.deletes().len(), 1);
}

#[tokio::test]
async fn test_new_order_overwrites_undo_pointer() {
    let (mut flow, chat, ledger) = build_flow();

    // two committed orders for the same actor, on separate cards
    reach_confirm(&mut flow, 1, 10, "1").await;
    flow.handle_callback(callback(5, 10, "Y|0|1|0")).await.unwrap();
    reach_confirm(&mut flow, 11, 20, "3").await;
    flow.handle_callback(callback(15, 20, "Y|0|1|0")).await.unwrap();
    assert_eq!(ledger.rows().len(), 2);

    chat.clear();
    flow.handle_undo(ChatId(100), UserId(7)).await.unwrap();

    // only the later order is undoable; the earlier one keeps its row
    assert_eq!(ledger.deletes(), vec![RowPointer(2)]);
    let rows = ledger.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 1);

    chat.clear();
    flow.handle_undo(ChatId(100), UserId(7)).await.unwrap();
    assert_eq!(chat.sent_texts(), vec!["Nothing to undo.".to_string()]);
}

#[tokio::test]
async fn test_append_failure_leaves_confirm_retryable() {
    let (mut flow, chat, ledger) = build_flow();

    reach_confirm(&mut flow, 1, 10, "2").await;

    ledger.fail_appends(true);
    chat.clear();
    flow.handle_callback(callback(5, 10, "Y|0|1|0")).await.unwrap();

    assert!(ledger.rows().is_empty());
    // error ack plus a fallback chat message; no keyboard edit, so the
    // confirm button stays live
    let calls = chat.calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        ChatCall::Ack { text: Some(t), .. } if t.contains("try again")
    )));
    assert!(chat.sent_texts().iter().any(|t| t.contains("Confirm")));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, ChatCall::Edit { .. } | ChatCall::EditKeyboard { .. })));

    // re-confirming after the store recovers appends exactly once
    ledger.fail_appends(false);
    flow.handle_callback(callback(6, 10, "Y|0|1|0")).await.unwrap();
    assert_eq!(ledger.rows().len(), 1);
    assert_eq!(ledger.rows()[0].quantity, 2);
}

#[tokio::test]
async fn test_saved_card_does_not_confirm_again() {
    let (mut flow, chat, ledger) = build_flow();

    reach_confirm(&mut flow, 1, 10, "2").await;
    flow.handle_callback(callback(5, 10, "Y|0|1|0")).await.unwrap();
    assert_eq!(ledger.rows().len(), 1);

    // the draft was consumed on save; a later confirm on the same card is
    // stale and only gets a neutral ack
    chat.clear();
    flow.handle_callback(callback(6, 10, "Y|0|1|0")).await.unwrap();
    assert_eq!(ledger.rows().len(), 1);
    assert!(matches!(
        chat.last_call(),
        Some(ChatCall::Ack { text: None, .. })
    ));
}

#[tokio::test]
async fn test_undo_failure_keeps_pointer() {
    let (mut flow, chat, ledger) = build_flow();

    reach_confirm(&mut flow, 1, 10, "2").await;
    flow.handle_callback(callback(5, 10, "Y|0|1|0")).await.unwrap();

    ledger.fail_deletes(true);
    chat.clear();
    flow.handle_undo(ChatId(100), UserId(7)).await.unwrap();
    assert!(chat.sent_texts()[0].contains("Couldn't undo"));
    assert_eq!(ledger.rows().len(), 1);

    // the pointer survives a failed delete, so the actor can retry
    ledger.fail_deletes(false);
    chat.clear();
    flow.handle_undo(ChatId(100), UserId(7)).await.unwrap();
    assert!(ledger.rows().is_empty());
    assert!(chat.sent_texts()[0].starts_with("Removed:"));
}
