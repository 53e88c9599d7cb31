//! FILENAME: core/engine/src/search.rs
//! PURPOSE: Search filter and debounce state for selector dropdowns.
//! CONTEXT: Each search box owns its own `SearchDebounce`. The caller drives it
//! with its clock, so nothing here sleeps or spawns timers.

use std::time::{Duration, Instant};

/// Delay between the last keystroke and propagating the search text.
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(500);

/// An option as listed by a dimension/measure selector.
pub trait SearchableOption {
    fn name(&self) -> &str;
    fn title(&self) -> &str;
}

/// Case-insensitive substring match on the option's name or title.
/// An empty search matches every option.
pub fn option_matches_search<O: SearchableOption + ?Sized>(search: &str, option: &O) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    option.name().to_lowercase().contains(&needle) || option.title().to_lowercase().contains(&needle)
}

/// Options matching `search`, in their original order.
pub fn filter_options<'a, O: SearchableOption>(search: &str, options: &'a [O]) -> Vec<&'a O> {
    options
        .iter()
        .filter(|o| option_matches_search(search, *o))
        .collect()
}

/// Pending search text for one input.
#[derive(Debug, Clone)]
pub struct SearchDebounce {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebounce {
    fn default() -> Self {
        SearchDebounce::new(DEFAULT_SEARCH_DELAY)
    }
}

impl SearchDebounce {
    pub fn new(delay: Duration) -> Self {
        SearchDebounce { delay, pending: None }
    }

    /// Records new text and restarts the wait.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now));
    }

    /// Takes the pending text once `delay` has passed since the last input.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let ready = matches!(
            &self.pending,
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay
        );
        if ready {
            self.pending.take().map(|(text, _)| text)
        } else {
            None
        }
    }

    /// Drops the pending text, e.g. when an option is picked.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
