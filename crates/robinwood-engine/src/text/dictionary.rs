//! Phrase and word substitution dictionaries.
//!
//! Each language compiles two matchers, one for multi-word phrases and one
//! for single words. Phrases run first so a phrase is never broken up by a
//! word it contains being shortened beforehand.

use std::collections::HashMap;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use robinwood_core::{Result, StealError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Pt,
}

const EN_PHRASES: &[(&str, &str)] = &[
    ("in order to", "to"),
    ("due to the fact that", "because"),
    ("at this point in time", "now"),
    ("at the present time", "now"),
    ("in the event that", "if"),
    ("for the purpose of", "for"),
    ("with regard to", "about"),
    ("in spite of the fact that", "although"),
    ("a large number of", "many"),
    ("the majority of", "most"),
    ("is able to", "can"),
    ("has the ability to", "can"),
    ("in the near future", "soon"),
    ("prior to", "before"),
    ("as a matter of fact", "in fact"),
    ("it is important to note that", "note:"),
    ("please note that", "note:"),
    ("in addition to", "besides"),
    ("on a daily basis", "daily"),
    ("in close proximity to", "near"),
];

const EN_WORDS: &[(&str, &str)] = &[
    ("because", "bc"),
    ("without", "w/o"),
    ("with", "w/"),
    ("information", "info"),
    ("application", "app"),
    ("approximately", "approx"),
    ("configuration", "config"),
    ("documentation", "docs"),
    ("example", "ex"),
    ("function", "fn"),
    ("maximum", "max"),
    ("minimum", "min"),
    ("message", "msg"),
    ("number", "num"),
    ("please", "pls"),
    ("regarding", "re"),
    ("reference", "ref"),
    ("something", "sth"),
    ("through", "thru"),
    ("environment", "env"),
    ("database", "db"),
    ("development", "dev"),
    ("production", "prod"),
    ("repository", "repo"),
    ("parameters", "params"),
    ("parameter", "param"),
    ("thanks", "thx"),
];

const PT_PHRASES: &[(&str, &str)] = &[
    ("a fim de", "para"),
    ("com o objetivo de", "para"),
    ("devido ao fato de que", "porque"),
    ("por causa de", "por"),
    ("em virtude de", "por"),
    ("no momento atual", "agora"),
    ("neste momento", "agora"),
    ("em relação a", "sobre"),
    ("uma grande quantidade de", "muitos"),
    ("é capaz de", "pode"),
    ("tendo em vista que", "como"),
    ("no caso de", "se"),
    ("antes de mais nada", "primeiro"),
    ("de acordo com", "conforme"),
    ("banco de dados", "bd"),
];

const PT_WORDS: &[(&str, &str)] = &[
    ("você", "vc"),
    ("vocês", "vcs"),
    ("porque", "pq"),
    ("também", "tb"),
    ("para", "p/"),
    ("quando", "qdo"),
    ("quanto", "qto"),
    ("mensagem", "msg"),
    ("informação", "info"),
    ("informações", "infos"),
    ("aplicação", "app"),
    ("configuração", "config"),
    ("documentação", "docs"),
    ("exemplo", "ex"),
    ("função", "fn"),
    ("máximo", "max"),
    ("mínimo", "min"),
    ("número", "num"),
    ("obrigado", "obg"),
    ("beleza", "blz"),
    ("hoje", "hj"),
    ("muito", "mt"),
    ("tudo", "td"),
    ("nada", "nd"),
];

/// One compiled alternation plus its lookup table.
struct Substitution {
    pattern: Regex,
    table: HashMap<String, &'static str>,
}

impl Substitution {
    fn compile(entries: &[(&'static str, &'static str)]) -> Result<Self> {
        let mut keys: Vec<&str> = entries.iter().map(|(from, _)| *from).collect();
        // Longest first so "without" wins over "with".
        keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .map_err(|e| StealError::Processing(format!("dictionary pattern: {e}")))?;
        let table = entries
            .iter()
            .map(|(from, to)| (from.to_lowercase(), *to))
            .collect();
        Ok(Self { pattern, table })
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let matched = &caps[0];
                match self.table.get(&matched.to_lowercase()) {
                    Some(replacement) => match_case(matched, replacement),
                    None => matched.to_string(),
                }
            })
            .into_owned()
    }
}

/// Carry an initial capital over to the replacement.
fn match_case(original: &str, replacement: &str) -> String {
    let starts_upper = original.chars().next().is_some_and(char::is_uppercase);
    if !starts_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct Dictionary {
    phrases: Substitution,
    words: Substitution,
}

impl Dictionary {
    fn compile(phrases: &[(&'static str, &'static str)], words: &[(&'static str, &'static str)]) -> Result<Self> {
        Ok(Self {
            phrases: Substitution::compile(phrases)?,
            words: Substitution::compile(words)?,
        })
    }

    pub fn shorten(&self, text: &str) -> String {
        let reduced = self.phrases.apply(text);
        self.words.apply(&reduced)
    }
}

/// Every language's compiled dictionary. Build once and share.
pub struct Dictionaries {
    en: Dictionary,
    pt: Dictionary,
}

impl Dictionaries {
    pub fn new() -> Result<Self> {
        Ok(Self {
            en: Dictionary::compile(EN_PHRASES, EN_WORDS)?,
            pt: Dictionary::compile(PT_PHRASES, PT_WORDS)?,
        })
    }

    pub fn get(&self, language: Language) -> &Dictionary {
        match language {
            Language::En => &self.en,
            Language::Pt => &self.pt,
        }
    }

    pub fn shorten(&self, text: &str, language: Language) -> String {
        self.get(language).shorten(text)
    }
}
