use agentdock_core::domain::chat::{ChatRole, HistoryTurn};

const TASK_HEADER: &str = "You are an advanced AI assistant. Please perform the following task based on the conversation history and the latest user request.";

/// Everything the engine sees for one turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInvocation {
    pub history: Vec<HistoryTurn>,
    pub instruction: String,
    pub system_text: String,
}

impl TaskInvocation {
    pub fn compose(&self) -> String {
        let mut task = format!("{TASK_HEADER}\n\n--- Conversation History ---\n");
        for turn in &self.history {
            task.push_str(&format!("[{}]: {}\n", role_tag(turn.role), turn.text));
        }
        task.push_str(&format!(
            "\n--- Latest User Request ---\n{}\n\n--- System Instructions ---\n{}\n",
            self.instruction, self.system_text
        ));
        task
    }
}

fn role_tag(role: ChatRole) -> String {
    role.as_str().to_uppercase()
}
