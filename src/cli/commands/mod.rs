mod admin;
mod secrets;

pub use admin::{cmd_create_admin, cmd_set_active, cmd_set_role};
pub use secrets::{cmd_generate_secret, cmd_hash_password, generate_secret};

fn read_password() -> anyhow::Result<String> {
    println!("Password:");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("No password given");
    }
    Ok(password)
}
