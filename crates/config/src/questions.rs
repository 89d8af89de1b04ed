//! Question catalog and fixed message copy for the deterministic flow

use lead_qualifier_core::{completion_marker, AnswerMap, CanonicalAnswer, Category};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// One multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Lead-in used when this question follows an accepted answer
    pub intro: String,
    pub text: String,
    /// Labels for A, B, C, D
    pub options: [String; 4],
    /// Prefix used when the reply was not understood
    pub reprompt: String,
    /// Label used in answer summaries
    pub label: String,
}

impl Question {
    fn new(intro: &str, text: &str, options: [&str; 4], reprompt: &str, label: &str) -> Self {
        Self {
            intro: intro.to_string(),
            text: text.to_string(),
            options: options.map(str::to_string),
            reprompt: reprompt.to_string(),
            label: label.to_string(),
        }
    }

    pub fn option_label(&self, answer: CanonicalAnswer) -> &str {
        &self.options[answer.index()]
    }

    /// Question text followed by the lettered options
    pub fn body(&self) -> String {
        let options = CanonicalAnswer::ALL
            .iter()
            .map(|a| format!("{}) {}", a, self.option_label(*a)))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\n{}", self.text, options)
    }
}

/// All user-facing copy of the deterministic flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCatalog {
    pub greeting: String,
    pub net_worth: Question,
    pub objective: Question,
    pub urgency: Question,
    pub interest: Question,
    pub closing_qualified: String,
    pub closing_not_qualified: String,
}

impl Default for QuestionCatalog {
    fn default() -> Self {
        Self {
            greeting: "Olá! 👋\n\nVi que você tem interesse em investimentos. Para te conectar com o \
                       melhor especialista, preciso fazer algumas perguntas rápidas. Tudo bem?"
                .to_string(),
            net_worth: Question::new(
                "Primeira pergunta:",
                "Quanto você tem disponível para investir hoje?",
                [
                    "Até R$ 50 mil",
                    "R$ 50 mil a R$ 200 mil",
                    "R$ 200 mil a R$ 500 mil",
                    "Mais de R$ 500 mil",
                ],
                "Não entendi sua resposta sobre patrimônio. Por favor, escolha uma das opções \
                 (A, B, C ou D) ou descreva o valor.",
                "Patrimônio",
            ),
            objective: Question::new(
                "Ótimo, obrigado pela resposta!\n\nAgora, vamos para a segunda pergunta:",
                "Qual seu principal objetivo com os investimentos?",
                ["Aposentadoria", "Crescimento", "Reserva", "Especulação"],
                "Não entendi seu objetivo. Por favor, escolha uma das opções (A, B, C ou D).",
                "Objetivo",
            ),
            urgency: Question::new(
                "Perfeito! Agora, a terceira pergunta:",
                "Quando pretende começar a investir?",
                ["Esta semana", "Este mês", "Em 3 meses", "Sem pressa"],
                "Não entendi sua urgência. Por favor, escolha uma das opções (A, B, C ou D).",
                "Urgência",
            ),
            interest: Question::new(
                "Excelente! Por último, gostaria de saber:",
                "Você gostaria de falar com um de nossos especialistas?",
                ["Sim, urgente", "Sim, quando possível", "Talvez", "Não"],
                "Não entendi seu interesse. Por favor, escolha uma das opções (A, B, C ou D).",
                "Interesse",
            ),
            closing_qualified: "Parabéns! Você está qualificado para falar com um de nossos \
                                especialistas. Em breve entraremos em contato para agendar sua reunião."
                .to_string(),
            closing_not_qualified: "Agradecemos suas respostas. No momento, nossos serviços são \
                                    mais adequados para outro perfil de investidor. Mas fique à \
                                    vontade para nos procurar no futuro!"
                .to_string(),
        }
    }
}

impl QuestionCatalog {
    /// Load from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|_| ConfigError::FileNotFound(path.as_ref().display().to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn question(&self, category: Category) -> &Question {
        match category {
            Category::NetWorth => &self.net_worth,
            Category::Objective => &self.objective,
            Category::Urgency => &self.urgency,
            Category::Interest => &self.interest,
        }
    }

    /// Greeting followed by the first question
    pub fn opening(&self) -> String {
        format!("{}\n\n{}", self.greeting, self.ask(Category::NetWorth))
    }

    /// Question asked after the previous step was accepted
    pub fn ask(&self, category: Category) -> String {
        let q = self.question(category);
        format!("{} {}", q.intro, q.body())
    }

    /// Same question again, with a clarifying prefix
    pub fn reprompt(&self, category: Category) -> String {
        let q = self.question(category);
        format!("{}\n\n{}", q.reprompt, q.body())
    }

    /// Closing message carrying the completion marker
    pub fn closing(&self, score: u8, qualified: bool) -> String {
        let text = if qualified {
            &self.closing_qualified
        } else {
            &self.closing_not_qualified
        };
        format!("{} {}", completion_marker(score), text)
    }

    /// `Patrimônio: Mais de R$ 500 mil | Objetivo: Crescimento | ...`
    pub fn summarize(&self, answers: &AnswerMap) -> String {
        answers
            .iter()
            .map(|(category, answer)| {
                let q = self.question(*category);
                format!("{}: {}", q.label, q.option_label(*answer))
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
