//! Local search helpers for the admin lists

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Records that are searched and sorted by a display name
pub trait Named {
    fn name(&self) -> &str;
}

/// Alphabetical order of a name-sorted list, in the backend's `ordering`
/// notation (`nome` / `-nome`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameOrder {
    #[default]
    Ascending,
    Descending,
}

impl NameOrder {
    /// The backend ordering parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Ascending => "nome",
            Self::Descending => "-nome",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl FromStr for NameOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nome" => Ok(Self::Ascending),
            "-nome" => Ok(Self::Descending),
            other => Err(Error::general(format!("unknown name ordering {:?}", other))),
        }
    }
}

/// Case-insensitive comparison with a stable tie break on the raw text
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Rank `items` against `term`.
///
/// An empty term returns every item sorted by name. Otherwise only items
/// whose name contains the term (case-insensitively) are kept, exact matches
/// first, then prefix matches, then the rest; each group is sorted by name in
/// `order`.
pub fn rank_by_name<T: Named + Clone>(items: &[T], term: &str, order: NameOrder) -> Vec<T> {
    rank_by(items, term, order, |item| item.name().to_string(), |_| Vec::new())
}

/// General form of [`rank_by_name`]: `name` produces the ranked text and
/// `extra` produces additional fields that only count as substring matches
pub fn rank_by<T, N, E>(items: &[T], term: &str, order: NameOrder, name: N, extra: E) -> Vec<T>
where
    T: Clone,
    N: Fn(&T) -> String,
    E: Fn(&T) -> Vec<String>,
{
    let sort = |group: &mut Vec<(String, T)>| {
        group.sort_by(|(a, _), (b, _)| order.apply(compare_names(a, b)));
    };

    if term.trim().is_empty() {
        let mut all: Vec<(String, T)> = items.iter().map(|i| (name(i), i.clone())).collect();
        sort(&mut all);
        return all.into_iter().map(|(_, item)| item).collect();
    }

    let term = term.to_lowercase();
    let mut exact = Vec::new();
    let mut prefix = Vec::new();
    let mut substring = Vec::new();

    for item in items {
        let display = name(item);
        let lowered = display.to_lowercase();
        if lowered == term {
            exact.push((display, item.clone()));
        } else if lowered.starts_with(&term) {
            prefix.push((display, item.clone()));
        } else if lowered.contains(&term)
            || extra(item).iter().any(|field| field.to_lowercase().contains(&term))
        {
            substring.push((display, item.clone()));
        }
    }

    sort(&mut exact);
    sort(&mut prefix);
    sort(&mut substring);

    exact
        .into_iter()
        .chain(prefix)
        .chain(substring)
        .map(|(_, item)| item)
        .collect()
}

/// Delivers only the last value submitted within the quiet period.
///
/// Every [`Debouncer::submit`] call waits for the delay and then returns
/// `Some(value)` if no newer value arrived meanwhile, `None` otherwise.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn submit<T>(&self, value: T) -> Option<T> {
        let ticket = self.generation.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if self.generation.load(AtomicOrdering::SeqCst) == ticket {
            Some(value)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Cat(&'static str);

    impl Named for Cat {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn names(items: Vec<Cat>) -> Vec<&'static str> {
        items.into_iter().map(|c| c.0).collect()
    }

    fn categories() -> Vec<Cat> {
        vec![
            Cat("Romance Policial"),
            Cat("Poesia"),
            Cat("Romance"),
            Cat("Ficção Romanceada"),
            Cat("Romances Históricos"),
            Cat("Biografia"),
        ]
    }

    #[test]
    fn test_exact_then_prefix_then_substring() {
        let ranked = rank_by_name(&categories(), "romance", NameOrder::Ascending);
        assert_eq!(
            names(ranked),
            vec!["Romance", "Romance Policial", "Romances Históricos", "Ficção Romanceada"]
        );
    }

    #[test]
    fn test_groups_follow_descending_order() {
        let ranked = rank_by_name(&categories(), "ROMANCE", NameOrder::Descending);
        assert_eq!(
            names(ranked),
            vec!["Romance", "Romances Históricos", "Romance Policial", "Ficção Romanceada"]
        );
    }

    #[test]
    fn test_empty_term_sorts_everything() {
        let ranked = rank_by_name(&categories(), "  ", NameOrder::Ascending);
        assert_eq!(ranked.len(), 6);
        assert_eq!(ranked[0], Cat("Biografia"));
        let ranked = rank_by_name(&categories(), "", NameOrder::Descending);
        assert_eq!(ranked[0], Cat("Romances Históricos"));
    }

    #[test]
    fn test_term_spaces_are_matched() {
        // "romance " only appears inside "Romance Policial"
        let ranked = rank_by_name(&categories(), "romance ", NameOrder::Ascending);
        assert_eq!(names(ranked), vec!["Romance Policial"]);
    }

    #[test]
    fn test_extra_fields_only_substring() {
        let items = vec![("Ana Souza", "ana@x.com"), ("Bruno", "souza.b@x.com"), ("Carla", "c@x.com")];
        let ranked = rank_by(
            &items,
            "souza",
            NameOrder::Ascending,
            |(name, _)| name.to_string(),
            |(_, email)| vec![email.to_string()],
        );
        assert_eq!(ranked.iter().map(|i| i.0).collect::<Vec<_>>(), vec!["Ana Souza", "Bruno"]);
    }

    #[test]
    fn test_name_order_param() {
        assert_eq!("-nome".parse::<NameOrder>().unwrap(), NameOrder::Descending);
        assert_eq!(NameOrder::Ascending.as_param(), "nome");
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_keeps_last_value() {
        let debouncer = Debouncer::new(Duration::from_millis(300));

        let first = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.submit("rom").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.submit("romance").await })
        };

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(second.await.unwrap(), Some("romance"));
    }
}
