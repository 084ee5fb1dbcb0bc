mod helpers;

use chrono::{Duration, Utc};
use rebirth::auth::{AuthProvider, SqliteAuth};
use rebirth::conversation::types::{Message, Sender};
use rebirth::progress::{Milestone, ProgressState};
use rebirth::store::{RemoteStore, SqliteRemoteStore, UserData};

async fn store_with_user() -> (SqliteRemoteStore, String) {
    let db = helpers::shared_db();
    let auth = SqliteAuth::new(db.clone());
    let user = auth.sign_up("sam@example.com", "hunter22").await.unwrap();
    (SqliteRemoteStore::new(db), user.user_id)
}

#[tokio::test]
async fn profile_upsert_replaces_previous() {
    let (store, user) = store_with_user().await;
    assert!(store.load_profile(&user).await.unwrap().is_none());

    let mut profile = helpers::test_profile("Sam");
    store.save_profile(&user, &profile).await.unwrap();
    profile.stated_need = "A hug".into();
    store.save_profile(&user, &profile).await.unwrap();

    assert_eq!(store.load_profile(&user).await.unwrap(), Some(profile));
}

#[tokio::test]
async fn progress_loads_with_milestones_in_order() {
    let (store, user) = store_with_user().await;
    assert!(store.load_progress(&user).await.unwrap().is_none());

    let now = Utc::now();
    let milestones = [
        ("Deep Reflection", 10, now - Duration::seconds(5)),
        ("Engagement", 1, now),
    ];
    for (reason, xp, at) in milestones {
        store
            .add_milestone(
                &user,
                &Milestone {
                    reason: reason.into(),
                    experience_awarded: xp,
                    timestamp: at,
                },
            )
            .await
            .unwrap();
    }
    let mut state = ProgressState::default();
    state.experience = 11;
    store.save_progress(&user, &state).await.unwrap();

    let loaded = store.load_progress(&user).await.unwrap().unwrap();
    assert_eq!(loaded.experience, 11);
    assert_eq!(loaded.level, 1);
    let reasons: Vec<_> = loaded.milestones.iter().map(|m| m.reason.as_str()).collect();
    assert_eq!(reasons, ["Deep Reflection", "Engagement"]);
}

#[tokio::test]
async fn messages_round_trip_oldest_first() {
    let (store, user) = store_with_user().await;
    let start = Utc::now();
    store
        .append_message(&user, &Message::new("hi", Sender::User, start))
        .await
        .unwrap();
    store
        .append_message(
            &user,
            &Message::new("H-hi!", Sender::Agent, start + Duration::seconds(1)),
        )
        .await
        .unwrap();

    let messages = store.load_messages(&user).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[1].content, "H-hi!");
}

#[tokio::test]
async fn delete_user_data_is_scoped_to_user() {
    let db = helpers::shared_db();
    let auth = SqliteAuth::new(db.clone());
    let sam = auth.sign_up("sam@example.com", "hunter22").await.unwrap().user_id;
    let kim = auth.sign_up("kim@example.com", "hunter22").await.unwrap().user_id;
    let store = SqliteRemoteStore::new(db);

    for user in [&sam, &kim] {
        store
            .save_profile(user, &helpers::test_profile("x"))
            .await
            .unwrap();
        store.append_message(user, &Message::user("hi")).await.unwrap();
    }

    store.delete_user_data(&sam).await.unwrap();
    assert!(store.load_profile(&sam).await.unwrap().is_none());
    assert!(store.load_messages(&sam).await.unwrap().is_empty());
    assert!(store.load_profile(&kim).await.unwrap().is_some());
    assert_eq!(store.load_messages(&kim).await.unwrap().len(), 1);
}

#[tokio::test]
async fn writes_for_unknown_user_fail() {
    let store = SqliteRemoteStore::new(helpers::shared_db());
    let err = store
        .save_profile("nobody", &helpers::test_profile("x"))
        .await;
    assert!(err.is_err());
}

fn snapshot(name: &str, messages: &[&str]) -> UserData {
    let mut progress = ProgressState::default();
    progress.experience = 4;
    progress.milestones.push(Milestone {
        reason: "Engagement".into(),
        experience_awarded: 4,
        timestamp: Utc::now(),
    });
    UserData {
        profile: Some(helpers::test_profile(name)),
        progress: Some(progress),
        messages: messages.iter().map(|m| Message::user(*m)).collect(),
    }
}

#[tokio::test]
async fn seed_fills_an_empty_account() {
    let (store, user) = store_with_user().await;
    assert!(store.load_user_data(&user).await.unwrap().is_empty());

    let seeded = store
        .seed_user_data(&user, &snapshot("Sam", &["hi", "again"]))
        .await
        .unwrap();
    assert!(seeded);

    let data = store.load_user_data(&user).await.unwrap();
    assert_eq!(data.profile.unwrap().name, "Sam");
    let progress = data.progress.unwrap();
    assert_eq!(progress.experience, 4);
    assert_eq!(progress.milestones.len(), 1);
    assert_eq!(data.messages.len(), 2);
}

#[tokio::test]
async fn seed_leaves_existing_data_untouched() {
    let (store, user) = store_with_user().await;
    for text in ["one", "two", "three"] {
        store.append_message(&user, &Message::user(text)).await.unwrap();
    }

    let seeded = store
        .seed_user_data(&user, &snapshot("Other", &["hi"]))
        .await
        .unwrap();
    assert!(!seeded);

    let data = store.load_user_data(&user).await.unwrap();
    assert!(data.profile.is_none());
    assert!(data.progress.is_none());
    let texts: Vec<_> = data.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, ["one", "two", "three"]);
}

#[tokio::test]
async fn failed_seed_writes_nothing() {
    let db = helpers::shared_db();
    let auth = SqliteAuth::new(db.clone());
    let user = auth.sign_up("sam@example.com", "hunter22").await.unwrap().user_id;
    db.lock()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_messages BEFORE INSERT ON messages \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
    let store = SqliteRemoteStore::new(db);

    // Profile and progress are written before the first message is rejected.
    assert!(store
        .seed_user_data(&user, &snapshot("Sam", &["hi"]))
        .await
        .is_err());
    assert!(store.load_user_data(&user).await.unwrap().is_empty());
}
