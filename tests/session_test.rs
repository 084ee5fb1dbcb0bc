mod helpers;

use helpers::{harness, onboarded, test_profile, DEFAULT_REPLY};
use rebirth::conversation::types::Sender;
use rebirth::session::{SessionError, FALLBACK_REPLY};
use rebirth::store::{CacheKey, LocalCache};

#[tokio::test]
async fn send_before_onboarding_is_rejected() {
    let mut h = harness().await;
    let err = h.session.send_message("hello").await.unwrap_err();
    assert!(matches!(err, SessionError::NotOnboarded));
    assert!(h.completion.requests().is_empty());
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let mut h = onboarded().await;
    let err = h.session.send_message("   ").await.unwrap_err();
    assert!(matches!(err, SessionError::EmptyMessage));
    assert!(h.session.history().is_empty());
}

#[tokio::test]
async fn first_exchange_uses_empty_digest() {
    let mut h = onboarded().await;
    h.completion.push_reply("H-hi Sam! I missed you 🥺");

    let outcome = h.session.send_message("hello").await.unwrap();
    assert!(!outcome.fallback);
    assert_eq!(outcome.reply.content, "H-hi Sam! I missed you 🥺");

    let request = h.completion.last_request();
    assert!(request.system.contains("Recent Important Memories:\n\n"));
    assert!(request.system.contains("You are Sam's inner child"));
    assert!(request.system.contains("since March 5, 2024"));
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].content, "hello");

    let history = h.session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, Sender::User);
    assert_eq!(history[1].sender, Sender::Agent);
}

#[tokio::test]
async fn digest_covers_prior_user_messages_only() {
    let mut h = onboarded().await;
    h.session.send_message("I remember the lake").await.unwrap();
    h.session.send_message("we went fishing every summer").await.unwrap();

    let request = h.completion.last_request();
    assert!(request.system.contains("Memory: I remember the lake"));
    assert!(!request.system.contains("They told me: we went fishing"));
    // prior exchange plus the new message
    assert_eq!(request.messages.len(), 3);
}

#[tokio::test]
async fn long_message_awards_deep_reflection() {
    let mut h = onboarded().await;
    let outcome = h.session.send_message(&"a".repeat(250)).await.unwrap();

    assert_eq!(outcome.awards.len(), 1);
    assert_eq!(outcome.awards[0].milestone.reason, "Deep Reflection");
    assert_eq!(outcome.awards[0].milestone.experience_awarded, 10);
    assert_eq!(h.session.progress().experience, 10);
    assert_eq!(h.session.progress().level, 1);
}

#[tokio::test]
async fn tenth_exchange_earns_consistency_bonus() {
    let mut h = onboarded().await;
    for i in 1..=9 {
        let outcome = h.session.send_message(&format!("hi {i}")).await.unwrap();
        assert_eq!(outcome.awards.len(), 1);
    }

    let outcome = h.session.send_message("hi 10").await.unwrap();
    let reasons: Vec<_> = outcome
        .awards
        .iter()
        .map(|a| a.milestone.reason.as_str())
        .collect();
    assert_eq!(reasons, ["Engagement", "Consistent Reflection"]);
    assert_eq!(h.session.exchange_count(), 10);
    // 10 x Engagement(1) + Consistent Reflection(5)
    assert_eq!(h.session.progress().experience, 15);
}

#[tokio::test]
async fn failed_completion_records_fallback_without_experience() {
    let mut h = onboarded().await;
    h.completion.push_failure();

    let outcome = h.session.send_message("are you there?").await.unwrap();
    assert!(outcome.fallback);
    assert_eq!(outcome.reply.content, FALLBACK_REPLY);
    assert!(outcome.awards.is_empty());
    assert_eq!(h.session.progress().experience, 0);
    assert_eq!(h.session.exchange_count(), 0);

    let history = h.session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, FALLBACK_REPLY);
}

#[tokio::test]
async fn level_up_is_reported() {
    let mut h = onboarded().await;
    let long = "x".repeat(201);
    let mut level_up = None;
    for _ in 0..10 {
        let outcome = h.session.send_message(&long).await.unwrap();
        level_up = level_up.or(outcome.level_up());
    }
    // 10 x 10 + bonus 5
    assert_eq!(h.session.progress().experience, 105);
    assert_eq!(h.session.progress().level, 2);
    assert_eq!(level_up, Some(2));
}

#[tokio::test]
async fn signup_prompt_fires_once_while_anonymous() {
    let mut h = onboarded().await;
    let long = "y".repeat(250);

    let first = h.session.send_message(&long).await.unwrap();
    assert!(!first.signup_prompt());

    // 20% into level 1
    let second = h.session.send_message(&long).await.unwrap();
    assert!(second.signup_prompt());

    let third = h.session.send_message(&long).await.unwrap();
    assert!(!third.signup_prompt());
}

#[tokio::test]
async fn signup_prompt_never_fires_when_signed_in() {
    let mut h = onboarded().await;
    helpers::sign_up(&mut h, "sam@example.com").await;

    let long = "z".repeat(250);
    for _ in 0..3 {
        let outcome = h.session.send_message(&long).await.unwrap();
        assert!(!outcome.signup_prompt());
    }
}

#[tokio::test]
async fn clear_chat_keeps_progress() {
    let mut h = onboarded().await;
    h.session.send_message(&"a".repeat(150)).await.unwrap();
    assert_eq!(h.session.progress().experience, 5);

    assert!(h.session.clear_chat().await);
    assert!(h.session.history().is_empty());
    assert!(h.session.profile().is_none());
    assert_eq!(h.session.progress().experience, 5);
}

#[tokio::test]
async fn reset_returns_to_defaults() {
    let mut h = onboarded().await;
    h.session.send_message(&"a".repeat(250)).await.unwrap();

    assert!(h.session.reset_session().await);
    assert!(h.session.history().is_empty());
    assert!(h.session.profile().is_none());
    assert_eq!(h.session.progress().level, 1);
    assert_eq!(h.session.progress().experience, 0);
    assert!(h.session.progress().milestones.is_empty());
    assert_eq!(h.session.exchange_count(), 0);
}

#[tokio::test]
async fn reset_rearms_signup_prompt() {
    let mut h = onboarded().await;
    let long = "y".repeat(250);
    h.session.send_message(&long).await.unwrap();
    assert!(h.session.send_message(&long).await.unwrap().signup_prompt());

    assert!(h.session.reset_session().await);
    h.session
        .complete_onboarding(test_profile("Sam"))
        .await
        .unwrap();
    h.session.send_message(&long).await.unwrap();
    assert!(h.session.send_message(&long).await.unwrap().signup_prompt());
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");
    let remote_db = helpers::shared_db();

    let mut h = helpers::harness_with(LocalCache::open(&path).unwrap(), remote_db.clone()).await;
    h.session
        .complete_onboarding(test_profile("Robin"))
        .await
        .unwrap();
    h.session.send_message("I feel calmer today").await.unwrap();
    h.session.close().unwrap();

    let h = helpers::harness_with(LocalCache::open(&path).unwrap(), remote_db).await;
    let profile = h.session.profile().unwrap();
    assert_eq!(profile.name, "Robin");
    assert!(profile.last_interaction_at > profile.first_interaction_at);
    assert_eq!(h.session.history().len(), 2);
    assert_eq!(h.session.history()[1].content, DEFAULT_REPLY);
    assert_eq!(h.session.progress().experience, 3);
}

#[tokio::test]
async fn exchange_is_written_to_local_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");
    let mut h = helpers::harness_with(LocalCache::open(&path).unwrap(), helpers::shared_db()).await;
    h.session
        .complete_onboarding(test_profile("Sam"))
        .await
        .unwrap();

    let outcome = h.session.send_message("hello").await.unwrap();
    assert!(outcome.durable);

    // read through a second handle without closing the session
    let cache = LocalCache::open(&path).unwrap();
    let history: Vec<rebirth::conversation::types::Message> =
        cache.load(CacheKey::ConversationHistory).unwrap().unwrap();
    assert_eq!(history.len(), 2);
    let progress: rebirth::progress::ProgressState = cache.load(CacheKey::Progress).unwrap().unwrap();
    assert_eq!(progress.experience, 1);
}

/// A session over a file cache whose table is dropped after the session opened.
async fn broken_cache_harness(dir: &tempfile::TempDir) -> helpers::Harness {
    let path = dir.path().join("local.db");
    let h = helpers::harness_with(LocalCache::open(&path).unwrap(), helpers::shared_db()).await;
    LocalCache::open(&path)
        .unwrap()
        .connection()
        .execute_batch("DROP TABLE kv_cache")
        .unwrap();
    h
}

#[tokio::test]
async fn cache_failure_keeps_state_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = broken_cache_harness(&dir).await;

    let err = h
        .session
        .complete_onboarding(test_profile("Sam"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Cache(_)));
    assert_eq!(h.session.profile().unwrap().name, "Sam");

    let outcome = h.session.send_message("I feel lost").await.unwrap();
    assert!(!outcome.durable);
    assert!(!outcome.fallback);
    assert_eq!(h.session.history().len(), 2);
    assert_eq!(h.session.progress().experience, 3);

    let outcome = h.session.send_message("hello").await.unwrap();
    assert!(!outcome.durable);
    assert_eq!(h.session.history().len(), 4);
    assert_eq!(h.session.progress().experience, 4);
}

#[tokio::test]
async fn clear_and_reset_finish_when_cache_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = broken_cache_harness(&dir).await;
    let _ = h.session.complete_onboarding(test_profile("Sam")).await;
    h.session.send_message(&"a".repeat(150)).await.unwrap();

    assert!(!h.session.clear_chat().await);
    assert!(h.session.history().is_empty());
    assert!(h.session.profile().is_none());
    assert_eq!(h.session.progress().experience, 5);

    assert!(!h.session.reset_session().await);
    assert_eq!(h.session.progress().experience, 0);
    assert_eq!(h.session.exchange_count(), 0);
}
