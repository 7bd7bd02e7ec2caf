//! Sign-in, sign-up and order history.

use secrecy::SecretString;

use shopfront_storefront::session::SessionError;
use shopfront_storefront::{Result, Storefront};

use crate::output;

/// Sign in when credentials were given. Without them the command runs
/// signed out, and anything that needs a shopper says so.
pub async fn sign_in(store: &Storefront, credentials: Option<&(String, SecretString)>) -> Result<()> {
    if let Some((email, password)) = credentials {
        store.session().sign_in(email, password).await?;
    }
    Ok(())
}

pub async fn signup(store: &Storefront, credentials: Option<&(String, SecretString)>) -> Result<()> {
    let (email, password) = credentials.ok_or(SessionError::MissingPassword)?;
    let user = store.session().sign_up(email, password).await?;
    if store.session().is_signed_in() {
        output::line(&format!("Signed up and signed in as {}", user.email));
    } else {
        output::line(&format!(
            "Signed up as {}. Check your email to confirm the account.",
            user.email
        ));
    }
    Ok(())
}

pub async fn orders(store: &Storefront) -> Result<()> {
    let orders = store.checkout().order_history().await?;
    output::orders(&orders);
    Ok(())
}
