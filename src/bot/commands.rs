#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(Option<String>),
    Help,
    Sync,
    Stats,
    Security,
    Revoke,
    ConfirmRevoke,
    Unknown(String),
    /// Not a command at all.
    Text(String),
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let Some(body) = text.strip_prefix('/') else {
            return Command::Text(text.to_string());
        };

        let (head, argument) = match body.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (body, None),
        };
        // "/start@my_bot code"
        let name = head.split('@').next().unwrap_or_default().to_lowercase();

        match name.as_str() {
            "start" => Command::Start(argument.map(str::to_string)),
            "help" => Command::Help,
            "sync" => Command::Sync,
            "stats" => Command::Stats,
            "security" => Command::Security,
            "revoke" => Command::Revoke,
            "confirm_revoke" => Command::ConfirmRevoke,
            _ => Command::Unknown(name),
        }
    }

    /// The code carried by `/start <code>`, if any.
    pub fn auth_code(&self) -> Option<&str> {
        match self {
            Command::Start(code) => code.as_deref(),
            _ => None,
        }
    }
}
