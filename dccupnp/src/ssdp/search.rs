//! Analyse des requêtes M-SEARCH

use super::MAX_MX_SECS;
use rand::Rng;
use std::time::Duration;

/// Requête de découverte reçue en multicast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Valeur du header `ST`
    pub search_target: String,
    /// Valeur du header `MX` (secondes)
    pub max_wait: Option<u64>,
}

impl SearchRequest {
    /// Analyse un datagramme. Retourne `None` si ce n'est pas un M-SEARCH
    /// ou s'il ne porte pas de `ST`.
    pub fn parse(data: &str) -> Option<Self> {
        let mut lines = data.lines();
        let request_line = lines.next()?;
        if !request_line
            .trim_start()
            .to_ascii_uppercase()
            .starts_with("M-SEARCH")
        {
            return None;
        }

        let mut search_target = None;
        let mut max_wait = None;
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            match name.trim().to_ascii_uppercase().as_str() {
                "ST" => search_target = Some(value.trim().to_string()),
                "MX" => max_wait = value.trim().parse().ok(),
                _ => {}
            }
        }

        Some(Self {
            search_target: search_target.filter(|st| !st.is_empty())?,
            max_wait,
        })
    }

    /// MX effectif, borné à `MAX_MX_SECS` (1 s si absent)
    pub fn effective_mx(&self) -> u64 {
        self.max_wait.unwrap_or(1).min(MAX_MX_SECS)
    }

    /// Délai aléatoire avant de répondre, dans `[0, MX]`
    pub fn response_delay(&self) -> Duration {
        let max_ms = self.effective_mx() * 1000;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}
