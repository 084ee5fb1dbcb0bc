//! CLI `chat` command — onboarding on first launch, then the conversation loop.

use anyhow::Result;
use chrono::Utc;

use rebirth::auth::AuthProvider;
use rebirth::config::RebirthConfig;
use rebirth::conversation::onboarding::{Onboarding, OnboardingStep, FEELING_SCALE};
use rebirth::progress::guide::level_title;
use rebirth::session::{ExchangeOutcome, Session, SessionError};

use super::status::print_growth_guide;
use super::{open_runtime, progress_bar, read_line, read_password, Runtime};

const HELP: &str = "Commands: /status  /signup  /signin  /signout  /clear  /reset  /help  /quit";

pub async fn chat(config: &RebirthConfig) -> Result<()> {
    let mut rt = open_runtime(config).await?;

    if rt.session.profile().is_none() && !onboard(&mut rt.session).await? {
        return rt.session.close();
    }
    greet(&rt.session);

    loop {
        let Some(line) = read_line("\nyou> ")? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/status" => print_status(&rt.session),
            "/signup" => account_prompt(&mut rt, true).await?,
            "/signin" => account_prompt(&mut rt, false).await?,
            "/signout" => sign_out(&mut rt).await?,
            "/clear" => {
                if !rt.session.clear_chat().await {
                    eprintln!("Warning: the local cache could not be updated.");
                }
                println!("Conversation cleared. Your progress is kept.");
                if !onboard(&mut rt.session).await? {
                    break;
                }
                greet(&rt.session);
            }
            "/reset" => {
                if read_line("This erases your conversation, profile, and progress. Type YES to confirm: ")?
                    .as_deref()
                    != Some("YES")
                {
                    println!("Reset cancelled.");
                    continue;
                }
                if !rt.session.reset_session().await {
                    eprintln!("Warning: the local cache could not be updated.");
                }
                println!("Everything has been reset.");
                if !onboard(&mut rt.session).await? {
                    break;
                }
                greet(&rt.session);
            }
            cmd if cmd.starts_with('/') => println!("Unknown command. {HELP}"),
            text => {
                let outcome = match rt.session.send_message(text).await {
                    Ok(outcome) => outcome,
                    Err(SessionError::EmptyMessage) => continue,
                    Err(e) => return Err(e.into()),
                };
                show_outcome(&rt.session, &outcome);
                if outcome.signup_prompt() {
                    offer_signup(&mut rt).await?;
                }
            }
        }
    }

    rt.session.close()
}

/// Walk the wizard. Returns `false` if input ended before it finished.
async fn onboard(session: &mut Session) -> Result<bool> {
    let mut wizard = Onboarding::new();

    loop {
        let step = wizard.step();
        println!(
            "\n[{}/{}] {} {}",
            step.position(),
            OnboardingStep::ALL.len(),
            step,
            progress_bar(wizard.percent_complete() as f64)
        );

        if step == OnboardingStep::Connection {
            if let Some(echo) = wizard.echo() {
                println!("\nYour younger self: {echo}");
            }
        }
        if step == OnboardingStep::Feelings {
            for (i, face) in FEELING_SCALE.iter().enumerate() {
                print!("{}={face}  ", i + 1);
            }
            println!();
        }
        println!("{}", step.prompt());

        if step == OnboardingStep::Begin {
            if read_line("Press Enter to begin. ")?.is_none() {
                return Ok(false);
            }
            break;
        }

        let label = match step {
            OnboardingStep::Welcome | OnboardingStep::Connection => "Press Enter to continue. ",
            _ => "> ",
        };
        let Some(input) = read_line(label)? else {
            return Ok(false);
        };
        if step == OnboardingStep::Story {
            println!("Your younger self is listening...");
        }
        if let Err(e) = wizard
            .answer(&input, session.completion(), session.temperature())
            .await
        {
            println!("{e}");
        }
    }

    let profile = wizard.finish(Utc::now())?;
    if let Err(e) = session.complete_onboarding(profile).await {
        eprintln!("Warning: {e}. Your profile will be saved on exit.");
    }
    Ok(true)
}

fn greet(session: &Session) {
    if let Some(profile) = session.profile() {
        println!(
            "\nHi {}. Your younger self is here. Type a message, or /help.",
            profile.name
        );
    }
}

fn show_outcome(session: &Session, outcome: &ExchangeOutcome) {
    println!("\nyounger self> {}", outcome.reply.content);

    if !outcome.durable {
        eprintln!("Warning: this exchange could not be saved locally.");
    }
    for award in &outcome.awards {
        println!(
            "  +{} XP ({})",
            award.milestone.experience_awarded, award.milestone.reason
        );
    }
    if let Some(level) = outcome.level_up() {
        println!("  Level up! You reached level {level}: {}", level_title(level));
    }
    if !outcome.awards.is_empty() {
        println!("  {}", progress_bar(session.progress().percent_into_level()));
    }
}

fn print_status(session: &Session) {
    let progress = session.progress();
    println!(
        "Level {} ({}), {} XP",
        progress.level,
        level_title(progress.level),
        progress.experience
    );
    println!("{}", progress_bar(progress.percent_into_level()));
    println!("Milestones: {}", progress.milestones.len());
    match session.user() {
        Some(user) => println!("Signed in as {}", user.email),
        None => println!("Not signed in. Progress is only saved on this device."),
    }
    println!();
    print_growth_guide();
}

async fn offer_signup(rt: &mut Runtime) -> Result<()> {
    println!("\nYou're making real progress. Create an account to save it?");
    let answer = read_line("Sign up now? [y/N] ")?;
    if matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")) {
        account_prompt(rt, true).await?;
    }
    Ok(())
}

async fn account_prompt(rt: &mut Runtime, create: bool) -> Result<()> {
    let Some(auth) = rt.auth.clone() else {
        println!("Accounts are disabled (remote.enabled = false).");
        return Ok(());
    };
    let Some(email) = read_line("Email: ")? else {
        return Ok(());
    };
    let Some(password) = read_password("Password: ")? else {
        return Ok(());
    };

    let result = if create {
        auth.sign_up(&email, &password).await
    } else {
        auth.sign_in(&email, &password).await
    };
    match result {
        Ok(user) => {
            rt.session.sync_auth().await;
            println!("Signed in as {}. Your progress will be saved.", user.email);
        }
        Err(e) => println!("{e}"),
    }
    Ok(())
}

async fn sign_out(rt: &mut Runtime) -> Result<()> {
    if let Some(auth) = rt.auth.clone() {
        auth.sign_out().await?;
        rt.session.sync_auth().await;
    }
    println!("Signed out. Local progress is kept.");
    Ok(())
}
