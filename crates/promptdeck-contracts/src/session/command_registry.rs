use super::intent_parser::IntentAction;

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: IntentAction,
}

/// Commands whose whole remainder is the prompt text.
pub(crate) const PROMPT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "ask",
        action: IntentAction::Ask,
    },
    CommandSpec {
        command: "explain",
        action: IntentAction::Explain,
    },
    CommandSpec {
        command: "image",
        action: IntentAction::GenerateImage,
    },
];

/// Commands taking a single (optionally quoted) value.
pub(crate) const SETTING_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "max_tokens",
        action: IntentAction::SetMaxTokens,
    },
    CommandSpec {
        command: "temperature",
        action: IntentAction::SetTemperature,
    },
    CommandSpec {
        command: "text_model",
        action: IntentAction::SetTextModel,
    },
    CommandSpec {
        command: "image_model",
        action: IntentAction::SetImageModel,
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "settings",
        action: IntentAction::ShowSettings,
    },
    CommandSpec {
        command: "help",
        action: IntentAction::Help,
    },
    CommandSpec {
        command: "quit",
        action: IntentAction::Quit,
    },
    CommandSpec {
        command: "exit",
        action: IntentAction::Quit,
    },
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/ask <question>",
    "/explain <topic>",
    "/image <description>",
    "/max_tokens <n>",
    "/temperature <0-2>",
    "/text_model <name>",
    "/image_model <name>",
    "/settings",
    "/help",
    "/quit",
];
