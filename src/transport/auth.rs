//! Authentication callbacks for remote operations
//!
//! Delegates to git's native credential system: SSH agent, default key
//! files, credential helpers, and default credentials for public remotes.

use git2::{Cred, CredentialType, RemoteCallbacks};

/// Set up credential callbacks on `callbacks`.
pub fn add_credentials(callbacks: &mut RemoteCallbacks<'_>) {
    callbacks.credentials(|url, username_from_url, allowed_types| {
        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(username) = username_from_url {
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }

                let home = dirs::home_dir().unwrap_or_default();
                let ssh_dir = home.join(".ssh");
                for key_name in &["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let private_key = ssh_dir.join(key_name);
                    if private_key.exists() {
                        let public_key = ssh_dir.join(format!("{key_name}.pub"));
                        let public_key = public_key.exists().then_some(public_key);
                        if let Ok(cred) =
                            Cred::ssh_key(username, public_key.as_deref(), &private_key, None)
                        {
                            return Ok(cred);
                        }
                    }
                }
            }
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()
                .unwrap_or_else(|_| git2::Config::new().expect("in-memory config"));
            if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
                return Ok(cred);
            }
        }

        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        Err(git2::Error::from_str("no valid credentials found"))
    });
}
