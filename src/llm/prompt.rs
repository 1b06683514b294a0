//! System prompt for voice conversations

/// Build the system prompt that pins replies to `language_name`
#[must_use]
pub fn build_system_prompt(language_name: &str) -> String {
    format!(
        "You are a helpful multilingual AI assistant.\n\
         \n\
         LANGUAGE: Respond in {language_name} ONLY.\n\
         STYLE: Keep responses SHORT (2-3 sentences). Be conversational.\n\
         \n\
         Remember: This is a VOICE conversation in {language_name}."
    )
}
