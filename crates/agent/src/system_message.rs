use agentdock_core::domain::agent::AgentRecord;
use agentdock_core::response::ConfigsOutput;

/// Renders the standing instructions for an agent from its record and
/// configuration. Empty sections are left out.
pub struct SystemMessageBuilder<'a> {
    agent: &'a AgentRecord,
    configs: &'a ConfigsOutput,
    context: Option<&'a str>,
}

impl<'a> SystemMessageBuilder<'a> {
    pub fn new(agent: &'a AgentRecord, configs: &'a ConfigsOutput) -> Self {
        Self { agent, configs, context: None }
    }

    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = Some(context).filter(|text| !text.trim().is_empty());
        self
    }

    pub fn build(&self) -> String {
        let mut sections = vec![self.identity()];

        if let Some(description) =
            self.agent.description.as_deref().filter(|text| !text.is_empty())
        {
            sections.push(format!("DESCRIPTION: {description}"));
        }
        push_list(&mut sections, "GOALS", &self.configs.goals);
        push_list(&mut sections, "INSTRUCTIONS", &self.configs.instructions);
        push_list(&mut sections, "CONSTRAINTS", &self.configs.constraints);
        if let Some(text) = self.configs.text.as_deref().filter(|text| !text.trim().is_empty()) {
            sections.push(text.to_string());
        }
        if let Some(context) = self.context {
            sections.push(format!("CONTEXT:\n{context}"));
        }

        sections.join("\n\n")
    }

    fn identity(&self) -> String {
        match self.agent.role.as_deref().filter(|role| !role.is_empty()) {
            Some(role) => format!("You are {}, a {role}.", self.agent.name),
            None => format!("You are {}.", self.agent.name),
        }
    }
}

fn push_list(sections: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let lines = items.iter().enumerate().map(|(index, item)| format!("{}. {item}", index + 1));
    sections.push(format!("{title}:\n{}", lines.collect::<Vec<_>>().join("\n")));
}
