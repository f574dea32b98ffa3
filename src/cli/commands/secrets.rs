use crate::config::Config;
use crate::services::PasswordHasher;

use super::read_password;

pub async fn cmd_hash_password(config: &Config, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let hasher = PasswordHasher::new(&config.security)?;
    println!("{}", hasher.hash(&password).await?);
    Ok(())
}

pub fn cmd_generate_secret() {
    println!("{}", generate_secret());
}

/// 32 random bytes, hex encoded.
#[must_use]
pub fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
