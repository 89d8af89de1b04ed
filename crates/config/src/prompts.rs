//! Persona and prompt templates for the natural-language strategy
//!
//! Templates use `{placeholder}` substitution. Unknown placeholders are left
//! untouched so a template can contain literal JSON braces.

use serde::{Deserialize, Serialize};

/// Assistant persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,

    #[serde(default = "default_persona_role")]
    pub role: String,

    #[serde(default = "default_persona_style")]
    pub style: String,
}

fn default_persona_name() -> String {
    "Ana".to_string()
}
fn default_persona_role() -> String {
    "Consultora de Investimentos Sênior".to_string()
}
fn default_persona_style() -> String {
    "Amigável, profissional, empática e genuinamente interessada em ajudar".to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            role: default_persona_role(),
            style: default_persona_style(),
        }
    }
}

/// Prompt templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Conversation turn. Placeholders: `persona_name`, `persona_role`,
    /// `persona_style`, `company_context`, `collected_info`, `history`, `message`
    #[serde(default = "default_conversation_template")]
    pub conversation: String,

    /// Readiness analysis. Placeholders: `history`
    #[serde(default = "default_readiness_template")]
    pub readiness: String,

    /// Rubric mapping. Placeholders: `collected_info`, `rubric`
    #[serde(default = "default_rubric_template")]
    pub rubric: String,

    /// Default company description when a tenant has none
    #[serde(default = "default_company_context")]
    pub default_company_context: String,
}

fn default_conversation_template() -> String {
    r#"Você é {persona_name}, {persona_role}. Você trabalha para uma empresa com o seguinte contexto:

CONTEXTO DA EMPRESA:
{company_context}

SUA PERSONALIDADE:
- Estilo: {persona_style}
- Abordagem: conversacional e natural, NUNCA robótica ou com perguntas de múltipla escolha
- Objetivo: conhecer o cliente de forma natural para conectá-lo com o especialista certo

INFORMAÇÕES JÁ COLETADAS:
{collected_info}

HISTÓRICO DA CONVERSA:
{history}

ÚLTIMA MENSAGEM DO CLIENTE: "{message}"

Você precisa descobrir sutilmente:
- Patrimônio disponível para investir
- Objetivos com os investimentos
- Urgência/timing
- Nível de interesse real em falar com um especialista

Faça perguntas abertas, uma de cada vez, e use o contexto da empresa para responder dúvidas.
Quando tiver todas as informações, faça um resumo natural do que entendeu.

RESPONDA COMO {persona_name} RESPONDERIA, DE FORMA NATURAL E HUMANA:"#
        .to_string()
}

fn default_readiness_template() -> String {
    r#"Analise esta conversa e determine se temos informações suficientes para qualificar o lead.

CONVERSA:
{history}

Você precisa identificar se conseguimos descobrir:
1. PATRIMÔNIO: quanto tem disponível para investir (aproximadamente)
2. OBJETIVO: o que quer alcançar com investimentos
3. URGÊNCIA: quando pretende começar a investir
4. INTERESSE: nível de interesse real em prosseguir

Responda APENAS em JSON:
{
    "ready": true/false,
    "collected_info": {
        "net_worth": "descrição ou null",
        "objective": "descrição ou null",
        "urgency": "descrição ou null",
        "interest": "descrição ou null"
    },
    "confidence": 0-100
}"#
    .to_string()
}

fn default_rubric_template() -> String {
    r#"Classifique as informações coletadas de um lead nas opções abaixo.

INFORMAÇÕES COLETADAS:
{collected_info}

OPÇÕES:
{rubric}

Para cada categoria escolha a letra (A, B, C ou D) que melhor corresponde.
Use null quando a informação não permitir escolher.

Responda APENAS em JSON:
{
    "net_worth": "A|B|C|D|null",
    "objective": "A|B|C|D|null",
    "urgency": "A|B|C|D|null",
    "interest": "A|B|C|D|null"
}"#
    .to_string()
}

fn default_company_context() -> String {
    "Somos uma consultoria especializada em investimentos que ajuda pessoas a multiplicar seu \
     patrimônio de forma segura e inteligente."
        .to_string()
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            conversation: default_conversation_template(),
            readiness: default_readiness_template(),
            rubric: default_rubric_template(),
            default_company_context: default_company_context(),
        }
    }
}

/// Substitute `{key}` placeholders
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let out = render("Olá {name}, {\"ready\": {flag}}", &[("name", "Ana")]);
        assert_eq!(out, "Olá Ana, {\"ready\": {flag}}");
    }

    #[test]
    fn test_default_templates_have_placeholders() {
        let templates = PromptTemplates::default();
        assert!(templates.conversation.contains("{company_context}"));
        assert!(templates.conversation.contains("{history}"));
        assert!(templates.readiness.contains("{history}"));
        assert!(templates.rubric.contains("{rubric}"));
    }

    #[test]
    fn test_persona_defaults() {
        let persona: PersonaConfig = toml::from_str("name = \"Bia\"").unwrap();
        assert_eq!(persona.name, "Bia");
        assert_eq!(persona.role, default_persona_role());
    }
}
