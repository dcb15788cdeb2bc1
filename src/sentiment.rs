//! Lexicon-based news sentiment scoring.
//!
//! Each article gets a compound polarity in [-1, 1] from a fixed valence
//! lexicon (VADER-style: signed word valences, negation flips, booster
//! words, `x / sqrt(x^2 + 15)` normalization). A ticker-day score is the
//! arithmetic mean over the most recent articles. Pure functions of their
//! input text.

/// Cap on articles contributing to one ticker-day score.
pub const MAX_ARTICLES: usize = 10;

const NORMALIZATION_ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const NEGATION_WINDOW: usize = 3;
const BOOSTER_INCREMENT: f64 = 0.293;

/// Valences roughly on the [-4, 4] scale, weighted toward the vocabulary
/// of financial news headlines and summaries.
const LEXICON: &[(&str, f64)] = &[
    ("acclaimed", 2.0),
    ("accusation", -1.5),
    ("accused", -1.7),
    ("achieve", 1.6),
    ("advance", 1.4),
    ("advances", 1.4),
    ("alarm", -1.4),
    ("alert", -0.8),
    ("appeal", 0.6),
    ("approval", 1.7),
    ("approved", 1.8),
    ("bankrupt", -3.2),
    ("bankruptcy", -3.2),
    ("bearish", -1.9),
    ("beat", 1.9),
    ("beats", 1.9),
    ("benefit", 1.6),
    ("best", 3.2),
    ("blame", -1.6),
    ("bonus", 1.8),
    ("boom", 2.1),
    ("boost", 1.8),
    ("boosted", 1.8),
    ("breach", -2.0),
    ("breakthrough", 2.4),
    ("bullish", 1.9),
    ("buyback", 1.3),
    ("collapse", -2.8),
    ("concern", -1.2),
    ("concerns", -1.2),
    ("confidence", 1.7),
    ("confident", 1.8),
    ("crash", -2.9),
    ("crisis", -2.5),
    ("cut", -1.0),
    ("cuts", -1.0),
    ("damage", -1.9),
    ("danger", -2.0),
    ("deal", 1.0),
    ("debt", -1.0),
    ("decline", -1.5),
    ("declined", -1.5),
    ("default", -2.4),
    ("delay", -1.2),
    ("delayed", -1.2),
    ("demand", 0.8),
    ("disappointing", -2.1),
    ("disaster", -3.1),
    ("dividend", 1.2),
    ("doubt", -1.3),
    ("downgrade", -2.1),
    ("downgraded", -2.1),
    ("downturn", -1.9),
    ("drop", -1.4),
    ("dropped", -1.4),
    ("efficient", 1.5),
    ("exceed", 1.8),
    ("exceeded", 1.8),
    ("excellent", 2.7),
    ("expand", 1.4),
    ("expansion", 1.5),
    ("fail", -2.3),
    ("failed", -2.3),
    ("failure", -2.4),
    ("fall", -1.3),
    ("falls", -1.3),
    ("fear", -1.9),
    ("fears", -1.9),
    ("fine", 0.8),
    ("fined", -1.8),
    ("fraud", -3.0),
    ("gain", 1.6),
    ("gains", 1.6),
    ("good", 1.9),
    ("great", 3.1),
    ("grow", 1.5),
    ("growth", 1.7),
    ("improve", 1.6),
    ("improved", 1.7),
    ("improvement", 1.6),
    ("innovative", 1.9),
    ("investigation", -1.6),
    ("jump", 1.4),
    ("jumped", 1.4),
    ("launch", 1.1),
    ("lawsuit", -1.9),
    ("layoff", -2.0),
    ("layoffs", -2.0),
    ("leader", 1.5),
    ("loss", -1.8),
    ("losses", -1.8),
    ("lower", -1.0),
    ("miss", -1.6),
    ("missed", -1.6),
    ("momentum", 1.2),
    ("negative", -1.8),
    ("opportunity", 1.5),
    ("optimism", 1.9),
    ("optimistic", 1.9),
    ("outperform", 2.0),
    ("partnership", 1.4),
    ("penalty", -1.8),
    ("plunge", -2.4),
    ("plunged", -2.4),
    ("positive", 1.8),
    ("probe", -1.5),
    ("profit", 1.8),
    ("profitable", 2.0),
    ("profits", 1.8),
    ("progress", 1.5),
    ("promising", 1.8),
    ("rallied", 1.7),
    ("rally", 1.7),
    ("rebound", 1.5),
    ("recall", -1.7),
    ("recession", -2.4),
    ("record", 1.3),
    ("recovery", 1.6),
    ("rise", 1.3),
    ("rises", 1.3),
    ("risk", -1.1),
    ("risks", -1.1),
    ("robust", 1.7),
    ("sanction", -1.8),
    ("scandal", -2.6),
    ("selloff", -2.0),
    ("shortfall", -1.8),
    ("shrink", -1.3),
    ("slump", -2.0),
    ("soar", 2.2),
    ("soared", 2.2),
    ("solid", 1.5),
    ("strength", 1.6),
    ("strong", 1.9),
    ("struggle", -1.7),
    ("success", 2.2),
    ("successful", 2.2),
    ("sue", -1.8),
    ("sued", -1.8),
    ("surge", 1.9),
    ("surged", 1.9),
    ("threat", -1.9),
    ("tumble", -1.9),
    ("tumbled", -1.9),
    ("uncertain", -1.3),
    ("uncertainty", -1.4),
    ("underperform", -2.0),
    ("upbeat", 1.8),
    ("upgrade", 2.0),
    ("upgraded", 2.0),
    ("volatile", -1.1),
    ("warn", -1.6),
    ("warning", -1.7),
    ("weak", -1.7),
    ("weakness", -1.7),
    ("win", 2.4),
    ("wins", 2.4),
    ("worst", -3.1),
];

const NEGATIONS: &[&str] = &[
    "aint", "cannot", "cant", "couldnt", "didnt", "doesnt", "dont", "hardly", "isnt", "neither",
    "never", "no", "none", "nor", "not", "nothing", "wasnt", "werent", "without", "wont",
    "wouldnt",
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOSTER_INCREMENT),
    ("barely", -BOOSTER_INCREMENT),
    ("extremely", BOOSTER_INCREMENT),
    ("highly", BOOSTER_INCREMENT),
    ("marginally", -BOOSTER_INCREMENT),
    ("particularly", BOOSTER_INCREMENT),
    ("really", BOOSTER_INCREMENT),
    ("sharply", BOOSTER_INCREMENT),
    ("significantly", BOOSTER_INCREMENT),
    ("slightly", -BOOSTER_INCREMENT),
    ("somewhat", -BOOSTER_INCREMENT),
    ("strongly", BOOSTER_INCREMENT),
    ("very", BOOSTER_INCREMENT),
];

fn lexicon_valence(word: &str) -> Option<f64> {
    LEXICON
        .binary_search_by(|(entry, _)| entry.cmp(&word))
        .ok()
        .map(|idx| LEXICON[idx].1)
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word)
}

fn booster_increment(word: &str) -> Option<f64> {
    BOOSTERS
        .iter()
        .find(|(entry, _)| *entry == word)
        .map(|(_, increment)| *increment)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .map(|token| token.replace('\'', "").to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Compound polarity of one text in [-1, 1]. A text with no lexicon hits
/// scores exactly 0.0.
pub fn score_text(text: &str) -> f64 {
    let tokens = tokenize(text);
    let mut total = 0.0;

    for (idx, token) in tokens.iter().enumerate() {
        let Some(mut valence) = lexicon_valence(token) else {
            continue;
        };

        let window_start = idx.saturating_sub(NEGATION_WINDOW);
        for prior in &tokens[window_start..idx] {
            if is_negation(prior) {
                valence *= NEGATION_SCALAR;
            } else if let Some(increment) = booster_increment(prior) {
                valence += increment.copysign(valence);
            }
        }

        total += valence;
    }

    let compound = total / (total * total + NORMALIZATION_ALPHA).sqrt();
    compound.clamp(-1.0, 1.0)
}

/// Mean compound score over the first `MAX_ARTICLES` texts. Returns `None`
/// for an empty batch: "no news" must never read as a neutral score.
pub fn score_texts<S: AsRef<str>>(texts: &[S]) -> Option<f64> {
    let scores: Vec<f64> = texts
        .iter()
        .take(MAX_ARTICLES)
        .map(|text| score_text(text.as_ref()))
        .collect();

    if scores.is_empty() {
        return None;
    }

    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}
