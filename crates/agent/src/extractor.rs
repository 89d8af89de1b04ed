//! Answer extraction
//!
//! Normalizes a free-text reply into one of the four canonical options for
//! the category being asked. Priority:
//! 1. the whole reply is a single letter A-D
//! 2. a standalone option letter inside the reply
//! 3. category keyword and amount heuristics (Portuguese)
//!
//! Failure is silent: `None` means "not understood" and the caller re-prompts.

use once_cell::sync::Lazy;
use regex::Regex;

use lead_qualifier_core::{CanonicalAnswer, Category};

static LETTER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[abcd]\b").expect("valid letter regex"));

static OPTION_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:opcao|letra|alternativa|resposta|item)\s*:?\s*$").expect("valid keyword regex")
});

/// Number followed by an optional magnitude word
static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)*)\s*(milhoes|milhao|mi\b|mil\b|k\b)?").expect("valid amount regex")
});

static NET_WORTH_ABOVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:mais de|acima|superior)\b").expect("valid regex"));

/// Word numbers, checked when no digits are present
const NET_WORTH_WORDS: &[(&str, CanonicalAnswer)] = &[
    ("milhao", CanonicalAnswer::D),
    ("milhoes", CanonicalAnswer::D),
    ("quinhentos", CanonicalAnswer::D),
    ("quatrocentos", CanonicalAnswer::C),
    ("trezentos", CanonicalAnswer::C),
    ("duzentos", CanonicalAnswer::B),
    ("cem", CanonicalAnswer::B),
    ("cinquenta", CanonicalAnswer::A),
    ("vinte", CanonicalAnswer::A),
    ("dez", CanonicalAnswer::A),
];

static OBJECTIVE_RULES: Lazy<Vec<(Regex, CanonicalAnswer)>> = Lazy::new(|| {
    rules(&[
        (r"\baposentad", CanonicalAnswer::A),
        (r"\b(?:cresc|multiplic|rentabilidade|aumentar)", CanonicalAnswer::B),
        (r"\b(?:reserva|emergencia|protec|proteger|seguranca)", CanonicalAnswer::C),
        (r"\bespecula", CanonicalAnswer::D),
    ])
});

static URGENCY_RULES: Lazy<Vec<(Regex, CanonicalAnswer)>> = Lazy::new(|| {
    rules(&[
        (r"\b(?:esta|essa|nesta|nessa) semana\b|\bhoje\b|\bimediat|\bagora\b|\bja\b", CanonicalAnswer::A),
        (r"\bsem pressa\b|\bnao tenho pressa\b|\bsem urgencia\b|\bsem previsao\b", CanonicalAnswer::D),
        (r"\b(?:3|tres) meses\b|\btrimestre\b|\bproximos meses\b", CanonicalAnswer::C),
        (r"\b(?:este|esse|neste|nesse) mes\b|\bmes que vem\b|\bproximo mes\b", CanonicalAnswer::B),
    ])
});

static INTEREST_MAYBE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btalvez\b|\bquem sabe\b|\bvou pensar\b").expect("valid regex"));
static INTEREST_NO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bnao\b|\bnunca\b").expect("valid regex"));
static INTEREST_URGENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\burgente\b|\bo quanto antes\b|\bagora\b|\blogo\b").expect("valid regex"));
static INTEREST_YES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bsim\b|\bclaro\b|\bquero\b|\bcom certeza\b|\bpossivel\b|\bpode ser\b")
        .expect("valid regex")
});

fn rules(specs: &[(&str, CanonicalAnswer)]) -> Vec<(Regex, CanonicalAnswer)> {
    specs
        .iter()
        .map(|(pattern, answer)| (Regex::new(pattern).expect("valid rule regex"), *answer))
        .collect()
}

/// Stateless answer extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerExtractor;

impl AnswerExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Map a reply onto a canonical option for `category`
    pub fn extract(&self, category: Category, text: &str) -> Option<CanonicalAnswer> {
        let folded = fold(text);
        if folded.is_empty() {
            return None;
        }

        single_letter(&folded)
            .or_else(|| letter_token(&folded))
            .or_else(|| match category {
                Category::NetWorth => net_worth(&folded),
                Category::Objective => first_rule(&OBJECTIVE_RULES, &folded),
                Category::Urgency => first_rule(&URGENCY_RULES, &folded),
                Category::Interest => interest(&folded),
            })
    }
}

/// Lowercase, strip Portuguese diacritics and surrounding whitespace
fn fold(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn single_letter(folded: &str) -> Option<CanonicalAnswer> {
    let stripped = folded.trim_matches(|c: char| c.is_whitespace() || ".,;:!?)(".contains(c));
    let mut chars = stripped.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => CanonicalAnswer::from_letter(c),
        _ => None,
    }
}

/// A standalone option letter. A bare "a" followed by another word is the
/// Portuguese article or preposition and is only accepted after an option
/// keyword ("opção a", "letra a").
fn letter_token(folded: &str) -> Option<CanonicalAnswer> {
    for m in LETTER_TOKEN.find_iter(folded) {
        let letter = m.as_str().chars().next()?;
        let after = &folded[m.end()..];

        let article = letter == 'a'
            && after.starts_with(char::is_whitespace)
            && after
                .trim_start()
                .starts_with(|c: char| c.is_alphanumeric() || c == '$')
            && !OPTION_KEYWORD.is_match(&folded[..m.start()]);
        if article {
            continue;
        }
        return CanonicalAnswer::from_letter(letter);
    }
    None
}

fn first_rule(rules: &[(Regex, CanonicalAnswer)], folded: &str) -> Option<CanonicalAnswer> {
    rules
        .iter()
        .find(|(pattern, _)| pattern.is_match(folded))
        .map(|(_, answer)| *answer)
}

fn net_worth(folded: &str) -> Option<CanonicalAnswer> {
    if NET_WORTH_ABOVE.is_match(folded) {
        return Some(CanonicalAnswer::D);
    }

    if let Some(amount) = parse_amount(folded) {
        return Some(bracket(amount));
    }

    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    NET_WORTH_WORDS
        .iter()
        .find(|(word, _)| words.contains(word))
        .map(|(_, answer)| *answer)
}

fn bracket(amount: f64) -> CanonicalAnswer {
    if amount <= 50_000.0 {
        CanonicalAnswer::A
    } else if amount <= 200_000.0 {
        CanonicalAnswer::B
    } else if amount < 500_000.0 {
        CanonicalAnswer::C
    } else {
        CanonicalAnswer::D
    }
}

/// First amount in the text, in reais. Bare numbers below 1000 are read as
/// thousands ("500" means R$ 500 mil).
fn parse_amount(folded: &str) -> Option<f64> {
    let caps = AMOUNT.captures(folded)?;
    let value = parse_number(caps.get(1)?.as_str())?;

    let amount = match caps.get(2).map(|m| m.as_str()) {
        Some("milhao") | Some("milhoes") | Some("mi") => value * 1_000_000.0,
        Some("mil") | Some("k") => value * 1_000.0,
        _ if value < 1_000.0 => value * 1_000.0,
        _ => value,
    };
    Some(amount)
}

/// Parse `80.000`, `80,000`, `1,5`, `1.5` or `1.234.567,89`
fn parse_number(raw: &str) -> Option<f64> {
    let normalized = match (raw.contains('.'), raw.contains(',')) {
        (true, true) => raw.replace('.', "").replace(',', "."),
        (false, true) => separator_as(raw, ','),
        (true, false) => separator_as(raw, '.'),
        (false, false) => raw.to_string(),
    };
    normalized.parse().ok()
}

/// A lone separator followed by exactly three digits groups thousands;
/// otherwise it is the decimal point
fn separator_as(raw: &str, sep: char) -> String {
    let groups: Vec<&str> = raw.split(sep).collect();
    let thousands = groups.len() > 1 && groups[1..].iter().all(|g| g.len() == 3);
    if thousands {
        groups.concat()
    } else {
        raw.replacen(sep, ".", 1).replace(sep, "")
    }
}

fn interest(folded: &str) -> Option<CanonicalAnswer> {
    if INTEREST_MAYBE.is_match(folded) {
        return Some(CanonicalAnswer::C);
    }
    if INTEREST_NO.is_match(folded) {
        return Some(CanonicalAnswer::D);
    }
    if INTEREST_URGENT.is_match(folded) {
        return Some(CanonicalAnswer::A);
    }
    if INTEREST_YES.is_match(folded) {
        return Some(CanonicalAnswer::B);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalAnswer::*;

    fn extract(category: Category, text: &str) -> Option<CanonicalAnswer> {
        AnswerExtractor::new().extract(category, text)
    }

    #[test]
    fn test_single_letter() {
        for category in Category::ALL {
            assert_eq!(extract(category, "a"), Some(A));
            assert_eq!(extract(category, " B. "), Some(B));
            assert_eq!(extract(category, "c)"), Some(C));
            assert_eq!(extract(category, "D!"), Some(D));
        }
        assert_eq!(extract(Category::NetWorth, "e"), None);
    }

    #[test]
    fn test_letter_inside_text() {
        assert_eq!(extract(Category::Objective, "Acho que B"), Some(B));
        assert_eq!(extract(Category::Urgency, "opção a, por favor"), Some(A));
        assert_eq!(extract(Category::Interest, "letra D"), Some(D));
        assert_eq!(extract(Category::Objective, "a) aposentadoria"), Some(A));
    }

    #[test]
    fn test_article_a_is_not_an_option() {
        assert_eq!(extract(Category::Objective, "A reserva de emergência"), Some(C));
        assert_eq!(extract(Category::NetWorth, "entre R$ 50 mil a R$ 200 mil"), Some(A));
    }

    #[test]
    fn test_net_worth_amounts() {
        assert_eq!(extract(Category::NetWorth, "tenho 500 mil"), Some(D));
        assert_eq!(extract(Category::NetWorth, "uns 30 mil"), Some(A));
        assert_eq!(extract(Category::NetWorth, "R$ 80.000"), Some(B));
        assert_eq!(extract(Category::NetWorth, "200"), Some(B));
        assert_eq!(extract(Category::NetWorth, "300 mil reais"), Some(C));
        assert_eq!(extract(Category::NetWorth, "1,5 milhão"), Some(D));
        assert_eq!(extract(Category::NetWorth, "mais de meio milhão"), Some(D));
        assert_eq!(extract(Category::NetWorth, "acima disso"), Some(D));
        assert_eq!(extract(Category::NetWorth, "cinquenta mil"), Some(A));
        assert_eq!(extract(Category::NetWorth, "quinhentos mil"), Some(D));
        assert_eq!(extract(Category::NetWorth, "não sei dizer"), None);
    }

    #[test]
    fn test_number_formats() {
        assert_eq!(parse_number("80.000"), Some(80_000.0));
        assert_eq!(parse_number("80,000"), Some(80_000.0));
        assert_eq!(parse_number("1,5"), Some(1.5));
        assert_eq!(parse_number("1.5"), Some(1.5));
        assert_eq!(parse_number("1.234.567,89"), Some(1_234_567.89));
    }

    #[test]
    fn test_objective_keywords() {
        assert_eq!(extract(Category::Objective, "pensando na aposentadoria"), Some(A));
        assert_eq!(extract(Category::Objective, "quero multiplicar meu dinheiro"), Some(B));
        assert_eq!(extract(Category::Objective, "uma reserva de emergência"), Some(C));
        assert_eq!(extract(Category::Objective, "proteção do patrimônio"), Some(C));
        assert_eq!(extract(Category::Objective, "especulação"), Some(D));
        assert_eq!(extract(Category::Objective, "não sei"), None);
    }

    #[test]
    fn test_urgency_keywords() {
        assert_eq!(extract(Category::Urgency, "ainda esta semana"), Some(A));
        assert_eq!(extract(Category::Urgency, "hoje mesmo"), Some(A));
        assert_eq!(extract(Category::Urgency, "sem pressa"), Some(D));
        assert_eq!(extract(Category::Urgency, "daqui a 3 meses"), Some(C));
        assert_eq!(extract(Category::Urgency, "no próximo trimestre"), Some(C));
        assert_eq!(extract(Category::Urgency, "este mês"), Some(B));
    }

    #[test]
    fn test_interest_keywords() {
        assert_eq!(extract(Category::Interest, "Sim, urgente"), Some(A));
        assert_eq!(extract(Category::Interest, "sim, quando possível"), Some(B));
        assert_eq!(extract(Category::Interest, "talvez"), Some(C));
        assert_eq!(extract(Category::Interest, "não, obrigado"), Some(D));
        assert_eq!(extract(Category::Interest, "hmm"), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract(Category::Urgency, "   "), None);
    }
}
