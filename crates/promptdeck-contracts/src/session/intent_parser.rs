use super::command_registry::{CommandSpec, NO_ARG_COMMANDS, PROMPT_COMMANDS, SETTING_COMMANDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentAction {
    Noop,
    Ask,
    Explain,
    GenerateImage,
    SetMaxTokens,
    SetTemperature,
    SetTextModel,
    SetImageModel,
    ShowSettings,
    Help,
    Quit,
    Unknown,
}

/// One parsed line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: IntentAction,
    pub raw: String,
    /// Prompt text for the three generation actions.
    pub prompt: Option<String>,
    /// Value for setting commands; the command name for `Unknown`.
    pub argument: Option<String>,
}

impl Intent {
    fn new(action: IntentAction, raw: &str) -> Self {
        Self {
            action,
            raw: raw.to_string(),
            prompt: None,
            argument: None,
        }
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<IntentAction> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_arg(arg: &str) -> Option<String> {
    let value = match shell_words::split(arg) {
        Ok(parts) => parts.join(" "),
        Err(_) => arg.trim().to_string(),
    };
    Some(value).filter(|value| !value.is_empty())
}

pub fn parse_intent(text: &str) -> Intent {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Intent::new(IntentAction::Noop, text);
    }

    if let Some(slash_tail) = trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, PROMPT_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.prompt = Some(arg.to_string()).filter(|value| !value.is_empty());
                return intent;
            }

            if let Some(action) = find_action(&command, SETTING_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.argument = parse_single_arg(arg);
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            let mut intent = Intent::new(IntentAction::Unknown, text);
            intent.argument = Some(command);
            return intent;
        }
    }

    let mut intent = Intent::new(IntentAction::Ask, text);
    intent.prompt = Some(trimmed.to_string());
    intent
}

#[cfg(test)]
mod tests {
    use super::{parse_intent, IntentAction};

    #[test]
    fn bare_text_is_a_question() {
        let intent = parse_intent("  what is a borrow checker?  ");
        assert_eq!(intent.action, IntentAction::Ask);
        assert_eq!(intent.prompt.as_deref(), Some("what is a borrow checker?"));
    }

    #[test]
    fn blank_line_is_noop() {
        assert_eq!(parse_intent("   ").action, IntentAction::Noop);
        assert_eq!(parse_intent("").action, IntentAction::Noop);
    }

    #[test]
    fn prompt_commands_keep_full_remainder() {
        let explain = parse_intent("/explain  how \"lifetimes\" work ");
        assert_eq!(explain.action, IntentAction::Explain);
        assert_eq!(explain.prompt.as_deref(), Some("how \"lifetimes\" work"));

        let image = parse_intent("/IMAGE a red fox in snow");
        assert_eq!(image.action, IntentAction::GenerateImage);
        assert_eq!(image.prompt.as_deref(), Some("a red fox in snow"));

        let empty = parse_intent("/ask");
        assert_eq!(empty.action, IntentAction::Ask);
        assert!(empty.prompt.is_none());
    }

    #[test]
    fn setting_commands_unquote_their_value() {
        let tokens = parse_intent("/max_tokens 100");
        assert_eq!(tokens.action, IntentAction::SetMaxTokens);
        assert_eq!(tokens.argument.as_deref(), Some("100"));

        let model = parse_intent("/text_model \"gemini-2.5-flash\"");
        assert_eq!(model.action, IntentAction::SetTextModel);
        assert_eq!(model.argument.as_deref(), Some("gemini-2.5-flash"));

        let bare = parse_intent("/temperature");
        assert_eq!(bare.action, IntentAction::SetTemperature);
        assert!(bare.argument.is_none());
    }

    #[test]
    fn no_arg_commands_and_aliases() {
        assert_eq!(parse_intent("/help").action, IntentAction::Help);
        assert_eq!(parse_intent("/settings").action, IntentAction::ShowSettings);
        assert_eq!(parse_intent("/quit").action, IntentAction::Quit);
        assert_eq!(parse_intent("/exit").action, IntentAction::Quit);
    }

    #[test]
    fn unknown_command_reports_its_name() {
        let intent = parse_intent("/magic foo bar");
        assert_eq!(intent.action, IntentAction::Unknown);
        assert_eq!(intent.argument.as_deref(), Some("magic"));
    }

    #[test]
    fn lone_slash_is_treated_as_text() {
        let intent = parse_intent("/ what now");
        assert_eq!(intent.action, IntentAction::Ask);
        assert_eq!(intent.prompt.as_deref(), Some("/ what now"));
    }
}
