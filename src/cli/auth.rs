//! CLI `auth` commands — sign up, sign in, sign out.

use anyhow::{bail, Result};

use rebirth::auth::{AuthProvider, SqliteAuth};
use rebirth::config::RebirthConfig;

use super::{open_runtime, read_password, Runtime};

pub async fn signup(config: &RebirthConfig, email: &str) -> Result<()> {
    let (mut rt, auth) = runtime_with_auth(config).await?;
    let password = password()?;
    let user = auth.sign_up(email, &password).await?;
    rt.session.sync_auth().await;
    rt.session.close()?;
    println!("Account created for {}. Local progress uploaded.", user.email);
    Ok(())
}

pub async fn signin(config: &RebirthConfig, email: &str) -> Result<()> {
    let (mut rt, auth) = runtime_with_auth(config).await?;
    let password = password()?;
    let user = auth.sign_in(email, &password).await?;
    rt.session.sync_auth().await;
    let level = rt.session.progress().level;
    rt.session.close()?;
    println!("Signed in as {}. Level {level}.", user.email);
    Ok(())
}

pub async fn signout(config: &RebirthConfig) -> Result<()> {
    let (mut rt, auth) = runtime_with_auth(config).await?;
    if auth.current().is_none() {
        println!("Not signed in.");
        return rt.session.close();
    }
    auth.sign_out().await?;
    rt.session.sync_auth().await;
    rt.session.close()?;
    println!("Signed out. Local progress is kept.");
    Ok(())
}

async fn runtime_with_auth(config: &RebirthConfig) -> Result<(Runtime, std::sync::Arc<SqliteAuth>)> {
    let rt = open_runtime(config).await?;
    let Some(auth) = rt.auth.clone() else {
        bail!("accounts are disabled (set remote.enabled = true in config.toml)");
    };
    Ok((rt, auth))
}

fn password() -> Result<String> {
    match read_password("Password: ")? {
        Some(p) => Ok(p),
        None => bail!("no password given"),
    }
}
