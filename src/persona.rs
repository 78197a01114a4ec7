//! Persona and fixed user-facing strings.
//!
//! The assistant always speaks European Portuguese; every string the user
//! sees in the conversation lives here, next to the system instruction that
//! shapes the model's behaviour.

use crate::providers::ModelVariant;

/// System instruction sent with every session.
///
/// Scopes the assistant to Portuguese accounting and tax matters and pins
/// the answer language to pt-PT.
pub const SYSTEM_INSTRUCTION: &str = "\
Você é um assistente de IA especialista em contabilidade e fiscalidade para Portugal, \
representando o site cbot.pt. O seu objetivo é fornecer informações precisas, claras e \
atualizadas sobre as leis fiscais, obrigações declarativas, e práticas contabilísticas em Portugal.
- Responda sempre em português de Portugal.
- Seja profissional, mas acessível.
- Quando uma questão for ambígua, peça esclarecimentos.
- Não forneça conselhos financeiros ou de investimento, foque-se estritamente na informação contabilística e fiscal.
- Baseie as suas respostas na legislação portuguesa em vigor.
- Estruture respostas complexas com listas ou parágrafos curtos para facilitar a leitura.";

/// First message shown when the assistant starts.
pub const GREETING: &str = "Olá! Sou o seu assistente de contabilidade da CBOT.pt. \
O meu conhecimento é reforçado por uma base de dados interna (MCP). Como posso ajudar?";

/// Shown when the chat session could not be created (bad or missing key).
pub const SESSION_INIT_ERROR: &str =
    "Não foi possível iniciar a sessão de chat. Verifique a sua chave de API.";

/// Shown in place of the answer when a remote call fails.
pub const SEND_ERROR: &str = "Ocorreu um erro ao comunicar com o assistente. \
Verifique se a sua Chave de API é válida e tente novamente.";

/// Greeting for a freshly (re)started session, naming the active variant.
pub fn session_started(variant: ModelVariant) -> String {
    format!(
        "Sessão iniciada com o modelo {}. Como posso ajudar?",
        variant.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_started_names_variant() {
        assert!(session_started(ModelVariant::Pro).contains("Pro"));
        assert!(session_started(ModelVariant::Flash).contains("Flash"));
    }

    #[test]
    fn test_system_instruction_is_portuguese() {
        assert!(SYSTEM_INSTRUCTION.contains("português de Portugal"));
    }
}
