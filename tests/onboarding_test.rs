mod helpers;

use chrono::Utc;
use helpers::ScriptedCompletion;
use rebirth::conversation::onboarding::{Onboarding, OnboardingError, OnboardingStep};
use rebirth::conversation::prompt::ECHO_FALLBACK;

async fn walk(wizard: &mut Onboarding, completion: &ScriptedCompletion, answers: &[&str]) {
    for answer in answers {
        wizard.answer(answer, completion, 0.7).await.unwrap();
    }
}

#[tokio::test]
async fn full_wizard_builds_profile() {
    let completion = ScriptedCompletion::new();
    completion.push_reply("H-hi Sam... I remember the treehouse!");

    let mut wizard = Onboarding::new();
    walk(
        &mut wizard,
        &completion,
        &["", "Sam", "Building a treehouse with grandpa", ""],
    )
    .await;
    assert_eq!(wizard.step(), OnboardingStep::Feelings);
    assert_eq!(wizard.echo(), Some("H-hi Sam... I remember the treehouse!"));

    walk(&mut wizard, &completion, &["4", "Patience"]).await;
    assert_eq!(wizard.step(), OnboardingStep::Begin);
    assert_eq!(wizard.percent_complete(), 100);

    let profile = wizard.finish(Utc::now()).unwrap();
    assert_eq!(profile.name, "Sam");
    assert_eq!(profile.feeling_tag, "😊");
    assert_eq!(profile.stated_need, "Patience");
    assert_eq!(profile.first_interaction_at, profile.last_interaction_at);

    let request = completion.last_request();
    assert!(request.system.contains("H-hi Sam..."));
    assert_eq!(
        request.messages[0].content,
        "My name is Sam. Here's my memory: Building a treehouse with grandpa"
    );
}

#[tokio::test]
async fn echo_failure_uses_fallback_and_advances() {
    let completion = ScriptedCompletion::new();
    completion.push_failure();

    let mut wizard = Onboarding::new();
    walk(&mut wizard, &completion, &["", "Sam", "A rainy afternoon"]).await;
    assert_eq!(wizard.step(), OnboardingStep::Connection);
    assert_eq!(wizard.echo(), Some(ECHO_FALLBACK));
}

#[tokio::test]
async fn blank_answer_keeps_step() {
    let completion = ScriptedCompletion::new();
    let mut wizard = Onboarding::new();
    walk(&mut wizard, &completion, &[""]).await;

    let err = wizard.answer("   ", &completion, 0.7).await.unwrap_err();
    assert_eq!(err, OnboardingError::EmptyAnswer(OnboardingStep::Name));
    assert_eq!(wizard.step(), OnboardingStep::Name);
}

#[tokio::test]
async fn finish_before_begin_fails() {
    let completion = ScriptedCompletion::new();
    let mut wizard = Onboarding::new();
    walk(&mut wizard, &completion, &["", "Sam"]).await;

    let err = wizard.finish(Utc::now()).unwrap_err();
    assert_eq!(err, OnboardingError::Incomplete(OnboardingStep::Story));
}
