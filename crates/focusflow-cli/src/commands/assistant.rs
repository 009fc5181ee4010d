use clap::Subcommand;
use focusflow_core::assistant::{keyring_store, API_KEY_ENTRY};
use focusflow_core::{ChatAssistant, Config, OpenAiAssistant};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum AssistantAction {
    /// Ask the study assistant a question
    Ask {
        message: String,
    },
    /// Store the API key in the OS keyring
    SetKey {
        key: String,
    },
    /// Remove the stored API key from the OS keyring
    ClearKey,
}

pub fn run(action: AssistantAction) -> CliResult {
    match action {
        AssistantAction::Ask { message } => {
            let config = Config::load()?;
            let assistant = OpenAiAssistant::from_config(&config.assistant)?;
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let response = rt.block_on(assistant.ask(&message))?;
            print_json(&serde_json::json!({ "response": response }))?;
        }
        AssistantAction::SetKey { key } => {
            keyring_store::set(API_KEY_ENTRY, key.trim())?;
            println!("API key saved to keyring");
        }
        AssistantAction::ClearKey => {
            keyring_store::delete(API_KEY_ENTRY)?;
            println!("API key removed from keyring");
        }
    }
    Ok(())
}
