use std::{env, env::VarError};

/// The server has no real CLI. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are deliberately absent from this list
    const DISPLAY_ENVS: [&str; 19] = [
        "RUST_LOG",
        "STORE_HOST",
        "STORE_PORT",
        "STORE_DATABASE_URL",
        "STORE_DB_MAX_CONNECTIONS",
        "STORE_SIGNATURE_HEADER",
        "STORE_SIGNATURE_TOLERANCE_SECS",
        "STORE_WEBHOOK_TIMEOUT_SECS",
        "STORE_GATEWAY_IP_WHITELIST",
        "STORE_USE_X_FORWARDED_FOR",
        "STORE_USE_FORWARDED",
        "STORE_POD_API_URL",
        "STORE_POD_STORE_ID",
        "STORE_PROVIDER_TIMEOUT_SECS",
        "STORE_PRODUCT_CATALOG",
        "STORE_EMAIL_API_URL",
        "STORE_EMAIL_FROM",
        "STORE_OPERATOR_EMAIL",
        "STORE_NOTIFICATION_TIMEOUT_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
