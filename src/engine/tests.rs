use crate::{Engine, INITIAL_STATE, RuleModel};
use std::thread;

const SUPPORT_RULES: &str = r#"
metadata:
  bot_name: Ava
intent_detection:
  regex_patterns:
    - intent: greeting
      patterns: ["hello"]
    - intent: help
      patterns: ["help", "support"]
    - intent: email
      patterns: ["@"]
    - intent: bye
      patterns: ["\\bbye\\b"]
dialogue_flow:
  states:
    - name: welcome
      transitions:
        - intent: greeting
          next_state: welcome
          actions:
            - type: response
              content: "hi there"
        - intent: help
          next_state: support
          actions:
            - type: set_context
              key: topic
              value: support
            - type: response
              content: "What is your email?"
    - name: support
      transitions:
        - intent: email
          next_state: welcome
          actions:
            - type: set_context
              key: contact
              params:
                value: provided
            - type: response
              content: "Thanks, ${bot_name} will reach out about ${topic}."
        - intent: bye
          next_state: closed
          actions:
            - type: response
              content: "Bye"
error_handling:
  default_fallback: "Sorry, I am still learning."
"#;

fn engine() -> Engine {
    Engine::new(RuleModel::from_yaml_str(SUPPORT_RULES).unwrap())
}

#[test]
fn first_turn_starts_in_welcome_with_empty_slots() {
    let engine = engine();
    let res = engine.process_message_verbose("new-user", "asdf");

    assert_eq!(res.outcome.from_state, INITIAL_STATE);
    assert!(engine.context("new-user").unwrap().slots.is_empty());
}

#[test]
fn greeting_scenario() {
    let engine = engine();

    assert_eq!(engine.process_message("u1", "Hello!"), "hi there");
    assert_eq!(engine.context("u1").unwrap().current_state, "welcome");
}

#[test]
fn unmatched_text_returns_fallback_and_keeps_state() {
    let engine = engine();
    engine.process_message("u1", "I need help");

    assert_eq!(engine.process_message("u1", "asdf"), "Sorry, I am still learning.");
    assert_eq!(engine.context("u1").unwrap().current_state, "support");
}

#[test]
fn transition_into_undeclared_state_keeps_prior_state() {
    let engine = engine();
    engine.process_message("u1", "help");

    assert_eq!(engine.process_message("u1", "ok bye"), "Bye");
    assert_eq!(engine.context("u1").unwrap().current_state, "support");
}

#[test]
fn slots_persist_across_turns_and_stay_per_user() {
    let engine = engine();
    engine.process_message("alice", "help please");

    let reply = engine.process_message("alice", "alice@example.com");
    assert_eq!(reply, "Thanks, Ava will reach out about support.");

    let alice = engine.context("alice").unwrap();
    assert_eq!(alice.slot("topic"), Some("support"));
    assert_eq!(alice.slot("contact"), Some("provided"));
    assert_eq!(alice.current_state, "welcome");

    engine.process_message("bob", "hello");
    assert!(engine.context("bob").unwrap().slots.is_empty());
}

#[test]
fn reload_that_removes_current_state_recovers_to_welcome() {
    let engine = engine();
    engine.process_message("u1", "help");
    assert_eq!(engine.context("u1").unwrap().current_state, "support");

    let trimmed = SUPPORT_RULES.replace("    - name: support", "    - name: retired");
    engine.reload(RuleModel::from_yaml_str(&trimmed).unwrap());

    let res = engine.process_message_verbose("u1", "hello");
    assert_eq!(res.reply, "hi there");
    assert!(res.outcome.recovered);
    assert_eq!(engine.context("u1").unwrap().current_state, "welcome");
}

#[test]
fn concurrent_users_do_not_corrupt_each_other() {
    let engine = engine();
    let users: Vec<String> = (0..16).map(|i| format!("user-{i}")).collect();

    thread::scope(|s| {
        for user in &users {
            let engine = &engine;
            s.spawn(move || {
                for _ in 0..50 {
                    assert_eq!(engine.process_message(user, "help"), "What is your email?");
                    assert_eq!(
                        engine.process_message(user, "me@example.com"),
                        "Thanks, Ava will reach out about support."
                    );
                }
            });
        }
    });

    for user in &users {
        let ctx = engine.context(user).unwrap();
        assert_eq!(ctx.current_state, "welcome");
        assert_eq!(ctx.slot("contact"), Some("provided"));
    }
    assert_eq!(engine.store().len(), users.len());
}

#[test]
fn concurrent_turns_for_one_user_keep_every_slot_write() {
    // Eight intents, each writing its own slot, all driven against one user.
    let mut intents = String::new();
    let mut transitions = String::new();
    for i in 0..8 {
        intents.push_str(&format!("    - intent: mark{i}\n      patterns: [\"^mark {i}$\"]\n"));
        transitions.push_str(&format!(
            "        - intent: mark{i}\n          actions:\n            - type: set_context\n              key: slot{i}\n              value: set\n            - type: response\n              content: ok\n"
        ));
    }
    let source = format!(
        "intent_detection:\n  regex_patterns:\n{intents}dialogue_flow:\n  states:\n    - name: welcome\n      transitions:\n{transitions}error_handling:\n  default_fallback: \"?\"\n"
    );
    let engine = Engine::new(RuleModel::from_yaml_str(&source).unwrap());

    thread::scope(|s| {
        for i in 0..8 {
            let engine = &engine;
            s.spawn(move || {
                for _ in 0..25 {
                    assert_eq!(engine.process_message("shared", &format!("mark {i}")), "ok");
                }
            });
        }
    });

    let ctx = engine.context("shared").unwrap();
    for i in 0..8 {
        assert_eq!(ctx.slot(&format!("slot{i}")), Some("set"), "slot{i} was lost");
    }
}

#[test]
fn demo_rules_hold_a_full_conversation() {
    let engine = Engine::from_path(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/support_bot.yaml")).unwrap();

    assert_eq!(engine.process_message("c1", "Hi"), "Hello, I am Ava. How can I help you?");
    assert_eq!(
        engine.process_message("c1", "Where is my order?"),
        "Sure, I can help with your order status. What is your order number?"
    );
    assert_eq!(engine.process_message("c1", "It's 1234567"), "Thanks! I opened a ticket about your order status.");
    assert_eq!(engine.process_message("c1", "thank you"), "You're welcome!");

    let ctx = engine.context("c1").unwrap();
    assert_eq!(ctx.current_state, "welcome");
    assert_eq!(ctx.slot("order_received"), Some("yes"));
    assert_eq!(engine.process_message("c1", "what's the weather"), engine.rules().fallback());
}
